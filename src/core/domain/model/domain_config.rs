//! Resolved configuration of one hypervisor domain.

use crate::core::domain::{
    error::{CunikError, CunikResult, ValidationError},
    model::domain_description::{DomainDescription, OS_TYPE_HVM, OsDescriptor, VolumeAttachment},
    value_object::{HypervisorKind, MemorySize},
};
use std::path::{Path, PathBuf};

/// Description of a guest in resolved terms (filesystem paths, MiB).
///
/// A `DomainConfig` starts from defaults and is filled in field by field.
/// Setters perform no validation; completeness is checked once, by
/// [`DomainConfig::serialize`].
///
/// # Examples
///
/// ```
/// use cunik::{DomainConfig, HypervisorKind, MemorySize};
///
/// let mut config = DomainConfig::new();
/// config.set_name("g1");
/// config.set_image_path("/images/alpine.img");
/// config.set_hypervisor_kind(HypervisorKind::Kvm);
/// config.set_memory_size(MemorySize::from_mib(256).unwrap());
///
/// let xml = config.serialize().unwrap().to_xml();
/// assert!(xml.starts_with("<domain type='kvm'>"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainConfig {
    name: Option<String>,
    image_path: Option<PathBuf>,
    command_line: String,
    memory_size: MemorySize,
    hypervisor_kind: Option<HypervisorKind>,
    data_volume_path: Option<PathBuf>,
    data_volume_mount_point: Option<String>,
    network_config: Option<String>,
}

impl DomainConfig {
    /// Creates a configuration with defaults: empty command line, 1024 MiB,
    /// and every required field unset.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn set_image_path(&mut self, path: impl Into<PathBuf>) {
        self.image_path = Some(path.into());
    }

    pub fn set_command_line(&mut self, command_line: impl Into<String>) {
        self.command_line = command_line.into();
    }

    pub fn set_memory_size(&mut self, memory_size: MemorySize) {
        self.memory_size = memory_size;
    }

    pub fn set_hypervisor_kind(&mut self, kind: HypervisorKind) {
        self.hypervisor_kind = Some(kind);
    }

    pub fn set_data_volume_path(&mut self, path: impl Into<PathBuf>) {
        self.data_volume_path = Some(path.into());
    }

    pub fn set_data_volume_mount_point(&mut self, mount_point: impl Into<String>) {
        self.data_volume_mount_point = Some(mount_point.into());
    }

    pub fn set_network_config(&mut self, network: impl Into<String>) {
        self.network_config = Some(network.into());
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn memory_size(&self) -> MemorySize {
        self.memory_size
    }

    pub fn hypervisor_kind(&self) -> Option<HypervisorKind> {
        self.hypervisor_kind
    }

    pub fn data_volume_path(&self) -> Option<&Path> {
        self.data_volume_path.as_deref()
    }

    pub fn data_volume_mount_point(&self) -> Option<&str> {
        self.data_volume_mount_point.as_deref()
    }

    pub fn network_config(&self) -> Option<&str> {
        self.network_config.as_deref()
    }

    /// Checks completeness and produces the domain description.
    ///
    /// # Errors
    ///
    /// * `CunikError::IncompleteConfig` when `name`, `image_path` or
    ///   `hypervisor_kind` is unset or empty, or when a data volume is set
    ///   without a mount point
    /// * `CunikError::Validation` when a mount point is set without a volume
    pub fn serialize(&self) -> CunikResult<DomainDescription> {
        let name = self.name.as_deref().filter(|n| !n.is_empty());
        let image_path = self
            .image_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty());
        let volume_path = self
            .data_volume_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty());
        let mount_point = self
            .data_volume_mount_point
            .as_deref()
            .filter(|m| !m.is_empty());

        let mut missing = Vec::new();
        if name.is_none() {
            missing.push("name");
        }
        if image_path.is_none() {
            missing.push("image_path");
        }
        if self.hypervisor_kind.is_none() {
            missing.push("hypervisor_kind");
        }
        if volume_path.is_some() && mount_point.is_none() {
            missing.push("data_volume_mount_point");
        }

        let (Some(name), Some(image_path), Some(domain_type)) =
            (name, image_path, self.hypervisor_kind)
        else {
            return Err(CunikError::IncompleteConfig { missing });
        };
        if !missing.is_empty() {
            return Err(CunikError::IncompleteConfig { missing });
        }

        let data_volume = match (volume_path, mount_point) {
            (Some(path), Some(mount_point)) => Some(VolumeAttachment {
                path: path.to_path_buf(),
                mount_point: mount_point.to_string(),
            }),
            (None, Some(_)) => {
                return Err(ValidationError::ConstraintViolation(
                    "Data volume mount point is set but no data volume is attached".to_string(),
                )
                .into());
            }
            _ => None,
        };

        Ok(DomainDescription {
            domain_type,
            name: name.to_string(),
            os: OsDescriptor {
                os_type: OS_TYPE_HVM,
                kernel: image_path.to_path_buf(),
                cmdline: self.command_line.clone(),
            },
            memory: self.memory_size,
            data_volume,
            network: self.network_config.clone().filter(|n| !n.is_empty()),
        })
    }
}
