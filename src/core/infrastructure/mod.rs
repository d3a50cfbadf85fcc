pub mod control_plane;
pub mod fleet_registry;
pub mod hypervisor;
pub mod registry;
