use crate::core::domain::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The virtualization backend a guest runs on.
///
/// The textual form is the value the control plane expects in the
/// `type` attribute of a domain description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HypervisorKind {
    Kvm,
    Qemu,
    Xen,
}

impl HypervisorKind {
    /// Returns the control-plane name of this backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            HypervisorKind::Kvm => "kvm",
            HypervisorKind::Qemu => "qemu",
            HypervisorKind::Xen => "xen",
        }
    }
}

impl fmt::Display for HypervisorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HypervisorKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "kvm" => Ok(HypervisorKind::Kvm),
            "qemu" => Ok(HypervisorKind::Qemu),
            "xen" => Ok(HypervisorKind::Xen),
            "" => Err(ValidationError::Field {
                field: "vmm".to_string(),
                message: "Hypervisor kind cannot be empty".to_string(),
            }),
            other => Err(ValidationError::ConstraintViolation(format!(
                "Unsupported hypervisor kind '{}'. Supported kinds are: kvm, qemu, xen",
                other
            ))),
        }
    }
}
