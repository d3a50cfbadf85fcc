//! Structured domain description handed to the hypervisor control plane.
//!
//! A [`DomainDescription`] is produced by [`DomainConfig::serialize`] and
//! rendered with [`DomainDescription::to_xml`] into the document the control
//! plane's `define` call accepts. Rendering is deterministic: the same
//! description always yields byte-identical XML.
//!
//! [`DomainConfig::serialize`]: crate::DomainConfig::serialize

use crate::core::domain::value_object::{HypervisorKind, MemorySize};
use serde::Serialize;
use std::path::PathBuf;

/// OS type every unikernel guest boots as.
pub const OS_TYPE_HVM: &str = "hvm";

/// Namespace of the metadata element that records the volume mount point.
pub const VOLUME_METADATA_NAMESPACE: &str = "urn:cunik:volume:1";

/// Guest device the data volume is exposed as.
const DATA_VOLUME_TARGET: &str = "vda";

/// A complete, validated domain definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainDescription {
    /// Hypervisor kind, rendered as the root `type` attribute.
    pub domain_type: HypervisorKind,
    /// Domain name.
    pub name: String,
    /// Direct kernel boot descriptor.
    pub os: OsDescriptor,
    /// Memory allocation.
    pub memory: MemorySize,
    /// Data volume attachment, only when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_volume: Option<VolumeAttachment>,
    /// Name of the control-plane network to attach to, only when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

/// The `<os>` block of a domain description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OsDescriptor {
    pub os_type: &'static str,
    pub kernel: PathBuf,
    pub cmdline: String,
}

/// A secondary disk image and where the guest mounts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeAttachment {
    pub path: PathBuf,
    pub mount_point: String,
}

impl DomainDescription {
    /// Renders the description as the control plane's domain XML.
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();

        xml.push_str(&format!(
            "<domain type='{}'>\n",
            escape(self.domain_type.as_str())
        ));
        xml.push_str(&format!("  <name>{}</name>\n", escape(&self.name)));

        if let Some(volume) = &self.data_volume {
            xml.push_str("  <metadata>\n");
            xml.push_str(&format!(
                "    <cunik:volume xmlns:cunik='{}' target='{}' mount='{}'/>\n",
                VOLUME_METADATA_NAMESPACE,
                DATA_VOLUME_TARGET,
                escape(&volume.mount_point)
            ));
            xml.push_str("  </metadata>\n");
        }

        xml.push_str("  <os>\n");
        xml.push_str(&format!("    <type>{}</type>\n", self.os.os_type));
        xml.push_str(&format!(
            "    <kernel>{}</kernel>\n",
            escape(&self.os.kernel.to_string_lossy())
        ));
        xml.push_str(&format!(
            "    <cmdline>{}</cmdline>\n",
            escape(&self.os.cmdline)
        ));
        xml.push_str("  </os>\n");

        xml.push_str(&format!(
            "  <memory unit='MiB'>{}</memory>\n",
            self.memory.as_mib()
        ));

        if self.data_volume.is_some() || self.network.is_some() {
            xml.push_str("  <devices>\n");
            if let Some(volume) = &self.data_volume {
                xml.push_str("    <disk type='file' device='disk'>\n");
                xml.push_str(&format!(
                    "      <source file='{}'/>\n",
                    escape(&volume.path.to_string_lossy())
                ));
                xml.push_str(&format!(
                    "      <target dev='{}' bus='virtio'/>\n",
                    DATA_VOLUME_TARGET
                ));
                xml.push_str("    </disk>\n");
            }
            if let Some(network) = &self.network {
                xml.push_str("    <interface type='network'>\n");
                xml.push_str(&format!("      <source network='{}'/>\n", escape(network)));
                xml.push_str("      <model type='virtio'/>\n");
                xml.push_str("    </interface>\n");
            }
            xml.push_str("  </devices>\n");
        }

        xml.push_str("</domain>\n");
        xml
    }
}

/// Escapes the five XML special characters for text and attribute values.
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
