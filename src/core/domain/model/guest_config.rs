//! User-facing guest configuration, expressed with logical names.

use crate::core::domain::{
    error::{CunikError, CunikResult, ValidationError},
    value_object::{HypervisorKind, MemorySize, validate_guest_name},
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Keys every guest configuration map must carry.
pub const REQUIRED_KEYS: [&str; 8] = [
    "name",
    "img",
    "cmd",
    "vmm",
    "mem",
    "data_volume",
    "data_volume_mount_point",
    "network_config",
];

/// Configuration of a guest as a user writes it.
///
/// Images and data volumes are referenced by logical name and resolved
/// through the registries when the guest is created. Memory is given in KiB.
/// Empty `data_volume`, `data_volume_mount_point` and `network_config`
/// values mean "not configured".
///
/// # Examples
///
/// ```
/// use cunik::GuestConfig;
/// use serde_json::json;
///
/// let config = GuestConfig::from_value(json!({
///     "name": "g1",
///     "img": "alpine",
///     "cmd": "-v",
///     "vmm": "kvm",
///     "mem": 524288,
///     "data_volume": "",
///     "data_volume_mount_point": "",
///     "network_config": ""
/// }))
/// .unwrap();
///
/// assert_eq!(config.name(), "g1");
/// assert!(config.data_volume().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestConfig {
    name: String,
    image_name: String,
    command_line: String,
    hypervisor_kind: HypervisorKind,
    memory_kib: u64,
    data_volume: Option<String>,
    data_volume_mount_point: Option<String>,
    network_config: Option<String>,
}

impl GuestConfig {
    /// Builds a configuration from a JSON object.
    ///
    /// # Errors
    ///
    /// * `CunikError::Validation` if `value` is not an object
    /// * see [`GuestConfig::from_map`]
    pub fn from_value(value: Value) -> CunikResult<Self> {
        match value {
            Value::Object(map) => Self::from_map(&map),
            other => Err(ValidationError::Format(format!(
                "Guest configuration must be an object, got {}",
                json_type(&other)
            ))
            .into()),
        }
    }

    /// Builds a configuration from a key/value map.
    ///
    /// Every key in [`REQUIRED_KEYS`] must be present. `mem` accepts an
    /// unsigned integer or a decimal string; every other key takes a string.
    ///
    /// # Errors
    ///
    /// * `CunikError::MissingField` for the first absent key
    /// * `CunikError::Validation` for wrongly typed values, an invalid name,
    ///   an unknown hypervisor kind, zero memory, or a data volume and mount
    ///   point that are not configured together
    pub fn from_map(map: &Map<String, Value>) -> CunikResult<Self> {
        if let Some(field) = REQUIRED_KEYS.iter().find(|key| !map.contains_key(**key)) {
            return Err(CunikError::MissingField {
                field: field.to_string(),
            });
        }

        let name = required_str(map, "name")?;
        validate_guest_name(&name)?;

        let image_name = required_str(map, "img")?;
        if image_name.is_empty() {
            return Err(ValidationError::Field {
                field: "img".to_string(),
                message: "Image name cannot be empty".to_string(),
            }
            .into());
        }

        let hypervisor_kind: HypervisorKind = required_str(map, "vmm")?.parse()?;
        let memory_kib = required_kib(map, "mem")?;

        let data_volume = optional_str(map, "data_volume")?;
        let data_volume_mount_point = optional_str(map, "data_volume_mount_point")?;
        match (&data_volume, &data_volume_mount_point) {
            (Some(_), None) => {
                return Err(ValidationError::Field {
                    field: "data_volume_mount_point".to_string(),
                    message: "Mount point is required when a data volume is set".to_string(),
                }
                .into());
            }
            (None, Some(_)) => {
                return Err(ValidationError::ConstraintViolation(
                    "Mount point is set but no data volume is named".to_string(),
                )
                .into());
            }
            _ => {}
        }

        Ok(Self {
            name,
            image_name,
            command_line: required_str(map, "cmd")?,
            hypervisor_kind,
            memory_kib,
            data_volume,
            data_volume_mount_point,
            network_config: optional_str(map, "network_config")?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn hypervisor_kind(&self) -> HypervisorKind {
        self.hypervisor_kind
    }

    /// Memory as given by the user, in KiB.
    pub fn memory_kib(&self) -> u64 {
        self.memory_kib
    }

    /// Memory converted to the control plane's unit, rounded up to whole MiB.
    pub fn memory_size(&self) -> MemorySize {
        // memory_kib is validated non-zero at construction
        MemorySize::from_kib(self.memory_kib).unwrap_or_default()
    }

    pub fn data_volume(&self) -> Option<&str> {
        self.data_volume.as_deref()
    }

    pub fn data_volume_mount_point(&self) -> Option<&str> {
        self.data_volume_mount_point.as_deref()
    }

    pub fn network_config(&self) -> Option<&str> {
        self.network_config.as_deref()
    }
}

fn required_str(map: &Map<String, Value>, key: &str) -> CunikResult<String> {
    match map.get(key) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(ValidationError::Field {
            field: key.to_string(),
            message: format!("Expected a string, got {}", json_type(other)),
        }
        .into()),
        None => Err(CunikError::MissingField {
            field: key.to_string(),
        }),
    }
}

fn optional_str(map: &Map<String, Value>, key: &str) -> CunikResult<Option<String>> {
    let value = required_str(map, key)?;
    Ok(Some(value).filter(|v| !v.is_empty()))
}

fn required_kib(map: &Map<String, Value>, key: &str) -> CunikResult<u64> {
    let kib = match map.get(key) {
        Some(Value::Number(number)) => number.as_u64().ok_or_else(|| ValidationError::Field {
            field: key.to_string(),
            message: format!("Expected an unsigned integer, got {}", number),
        })?,
        Some(Value::String(text)) => {
            text.trim()
                .parse::<u64>()
                .map_err(|e| ValidationError::Field {
                    field: key.to_string(),
                    message: format!("Invalid memory size '{}': {}", text, e),
                })?
        }
        Some(other) => {
            return Err(ValidationError::Field {
                field: key.to_string(),
                message: format!("Expected an unsigned integer, got {}", json_type(other)),
            }
            .into());
        }
        None => {
            return Err(CunikError::MissingField {
                field: key.to_string(),
            });
        }
    };

    MemorySize::from_kib(kib)?;
    Ok(kib)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
