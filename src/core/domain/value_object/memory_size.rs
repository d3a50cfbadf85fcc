use crate::core::domain::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

const KIB_PER_MIB: u64 = 1024;

/// A validated guest memory allocation, held in MiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemorySize(u64);

impl MemorySize {
    /// Allocation used when the owner never sets one.
    pub const DEFAULT: MemorySize = MemorySize(1024);

    /// Creates a size from a MiB count.
    pub fn from_mib(mib: u64) -> Result<Self, ValidationError> {
        validate_memory_mib(mib)?;
        Ok(Self(mib))
    }

    /// Creates a size from a KiB count, rounding up to the next whole MiB.
    pub fn from_kib(kib: u64) -> Result<Self, ValidationError> {
        if kib == 0 {
            return Err(ValidationError::Field {
                field: "mem".to_string(),
                message: "Memory size must be positive".to_string(),
            });
        }
        Ok(Self(kib.div_ceil(KIB_PER_MIB)))
    }

    /// Returns the allocation in MiB.
    pub fn as_mib(&self) -> u64 {
        self.0
    }
}

impl Default for MemorySize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MiB", self.0)
    }
}

/// Validates a memory size expressed in MiB.
fn validate_memory_mib(mib: u64) -> Result<(), ValidationError> {
    if mib == 0 {
        return Err(ValidationError::Field {
            field: "memory_size".to_string(),
            message: "Memory size must be positive".to_string(),
        });
    }
    Ok(())
}
