mod guest_name;
mod hypervisor_kind;
mod memory_size;

pub use hypervisor_kind::HypervisorKind;
pub use memory_size::MemorySize;

// Re-export validation functions for internal use
pub(crate) use guest_name::validate_guest_name;
