//! Turning a [`GuestConfig`] into a [`DomainConfig`].

use crate::core::domain::{
    error::CunikResult,
    model::{domain_config::DomainConfig, guest_config::GuestConfig},
};
use crate::core::infrastructure::registry::{DataVolumeRegistry, ImageRegistry};
use tracing::debug;

impl GuestConfig {
    /// Resolves logical names through the registries and assembles the
    /// domain configuration.
    ///
    /// The volume registry is only consulted when a data volume is named.
    /// Memory is converted from KiB to MiB, rounding up.
    ///
    /// # Errors
    /// `CunikError::UnresolvedReference` if the image or volume is unknown.
    pub async fn resolve(
        &self,
        images: &dyn ImageRegistry,
        volumes: &dyn DataVolumeRegistry,
    ) -> CunikResult<DomainConfig> {
        let mut domain = DomainConfig::new();
        domain.set_name(self.name());
        domain.set_image_path(images.image_path(self.image_name()).await?);
        domain.set_command_line(self.command_line());
        domain.set_hypervisor_kind(self.hypervisor_kind());
        domain.set_memory_size(self.memory_size());

        if let Some(volume) = self.data_volume() {
            domain.set_data_volume_path(volumes.volume_path(volume).await?);
            if let Some(mount_point) = self.data_volume_mount_point() {
                domain.set_data_volume_mount_point(mount_point);
            }
        }

        if let Some(network) = self.network_config() {
            domain.set_network_config(network);
        }

        debug!(
            "Resolved guest '{}' to image {:?} with {}",
            self.name(),
            domain.image_path(),
            domain.memory_size()
        );
        Ok(domain)
    }
}
