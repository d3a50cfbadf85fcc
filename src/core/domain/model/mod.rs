pub mod control_plane_config;
pub mod domain_config;
pub mod domain_description;
pub mod fleet_record;
pub mod guest_config;
pub mod guest_status;
