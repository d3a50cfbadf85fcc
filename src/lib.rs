//! Lifecycle management for unikernel guests on a hypervisor control plane.
//!
//! A [`GuestConfig`] names an image, an optional data volume and a network
//! in user terms. A [`GuestManager`] resolves those names, defines the
//! matching hypervisor domain and hands back a [`Guest`] whose status only
//! ever reflects what the control plane confirmed.

mod core;
mod lifecycle;

#[cfg(test)]
mod tests;

pub use crate::core::domain::{
    error::{
        ControlPlaneError, CunikError, CunikResult, Operation, ResolveError, ValidationError,
    },
    model::{
        control_plane_config::{ControlPlaneConfig, RateLimitConfig},
        domain_config::DomainConfig,
        domain_description::{DomainDescription, OsDescriptor, VolumeAttachment},
        fleet_record::FleetRecord,
        guest_config::{GuestConfig, REQUIRED_KEYS},
        guest_status::GuestStatus,
    },
    value_object::{HypervisorKind, MemorySize},
};
pub use crate::core::infrastructure::{
    control_plane::ControlPlane,
    fleet_registry::{FleetRegistry, InMemoryFleetRegistry},
    hypervisor::{Connection, DomainHandle, HypervisorClient},
    registry::{DataVolumeRegistry, DirectoryRegistry, ImageRegistry, StaticRegistry},
};
pub use crate::lifecycle::{guest::Guest, virtual_machine::VirtualMachine};

use crate::lifecycle::guest::GuestContext;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Future returned by the body passed to [`GuestManager::with_guest`].
pub type GuestFuture<'g, T> = Pin<Box<dyn Future<Output = CunikResult<T>> + Send + 'g>>;

/// Creates guests against one set of collaborators.
///
/// # Examples
///
/// ```no_run
/// use cunik::{GuestConfig, GuestManager, CunikResult, HypervisorClient, StaticRegistry};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// async fn run(hypervisor: Arc<dyn HypervisorClient>) -> CunikResult<()> {
///     let manager = GuestManager::builder()
///         .hypervisor(hypervisor)
///         .image_registry(Arc::new(
///             StaticRegistry::new().with_entry("nginx", "/images/nginx.img"),
///         ))
///         .volume_registry(Arc::new(StaticRegistry::new()))
///         .build()?;
///
///     let config = GuestConfig::from_value(json!({
///         "name": "web", "img": "nginx", "cmd": "", "vmm": "kvm", "mem": 262144,
///         "data_volume": "", "data_volume_mount_point": "", "network_config": "default"
///     }))?;
///
///     let mut guest = manager.create_guest(&config).await?;
///     guest.start().await?;
///     guest.stop().await?;
///     guest.destroy().await
/// }
/// ```
pub struct GuestManager {
    context: GuestContext,
}

/// Builder for GuestManager configuration
#[derive(Default)]
pub struct GuestManagerBuilder {
    hypervisor: Option<Arc<dyn HypervisorClient>>,
    images: Option<Arc<dyn ImageRegistry>>,
    volumes: Option<Arc<dyn DataVolumeRegistry>>,
    fleet: Option<Arc<dyn FleetRegistry>>,
    config: ControlPlaneConfig,
}

impl GuestManagerBuilder {
    /// Sets the client used to reach the hypervisor control plane.
    pub fn hypervisor(mut self, client: Arc<dyn HypervisorClient>) -> Self {
        self.hypervisor = Some(client);
        self
    }

    /// Sets the registry that resolves image names to kernel paths.
    pub fn image_registry(mut self, registry: Arc<dyn ImageRegistry>) -> Self {
        self.images = Some(registry);
        self
    }

    /// Sets the registry that resolves data volume names to disk paths.
    pub fn volume_registry(mut self, registry: Arc<dyn DataVolumeRegistry>) -> Self {
        self.volumes = Some(registry);
        self
    }

    /// Sets the fleet registry. Defaults to an [`InMemoryFleetRegistry`].
    pub fn fleet_registry(mut self, registry: Arc<dyn FleetRegistry>) -> Self {
        self.fleet = Some(registry);
        self
    }

    /// Deadline for each control-plane call; `None` waits indefinitely.
    pub fn call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    /// Enables client-side rate limiting of control-plane calls.
    pub fn rate_limit(mut self, requests_per_second: u32, burst_size: u32) -> Self {
        self.config.rate_limit = Some(RateLimitConfig {
            requests_per_second,
            burst_size,
        });
        self
    }

    /// Builds the manager.
    ///
    /// # Errors
    /// `CunikError::Validation` if the hypervisor client or a name registry
    /// is missing, or a rate limit value is zero.
    pub fn build(self) -> CunikResult<GuestManager> {
        let hypervisor = self.hypervisor.ok_or_else(|| required("hypervisor"))?;
        let images = self.images.ok_or_else(|| required("image_registry"))?;
        let volumes = self.volumes.ok_or_else(|| required("volume_registry"))?;
        let fleet = self
            .fleet
            .unwrap_or_else(|| Arc::new(InMemoryFleetRegistry::new()));
        let plane = ControlPlane::new(hypervisor, self.config)?;

        Ok(GuestManager {
            context: GuestContext {
                plane: Arc::new(plane),
                images,
                volumes,
                fleet,
            },
        })
    }
}

fn required(field: &str) -> ValidationError {
    ValidationError::Field {
        field: field.to_string(),
        message: format!("{} is required", field),
    }
}

impl GuestManager {
    /// Creates a new builder for GuestManager configuration
    pub fn builder() -> GuestManagerBuilder {
        GuestManagerBuilder::default()
    }

    /// Resolves `config`, defines its domain and registers a new guest in
    /// status `NotStarted`.
    ///
    /// # Errors
    /// * `CunikError::UnresolvedReference` for an unknown image or volume;
    ///   nothing is defined or registered
    /// * `CunikError::Connection`, `CunikError::Definition` or
    ///   `CunikError::Timeout` from the control plane
    /// * `CunikError::Registry` if the guest cannot be registered; its
    ///   domain is torn down first
    pub async fn create_guest(&self, config: &GuestConfig) -> CunikResult<Guest> {
        Guest::create(config, &self.context).await
    }

    /// Creates a guest, runs `body` with it, then destroys it.
    ///
    /// Teardown runs whether `body` succeeds or fails. When both fail, the
    /// body's error is returned and the teardown error is logged.
    ///
    /// ```no_run
    /// # use cunik::{CunikResult, GuestConfig, GuestManager, GuestStatus};
    /// # async fn run(manager: GuestManager, config: GuestConfig) -> CunikResult<()> {
    /// let status = manager
    ///     .with_guest(&config, |guest| {
    ///         Box::pin(async move {
    ///             guest.start().await?;
    ///             CunikResult::Ok(guest.status())
    ///         })
    ///     })
    ///     .await?;
    /// assert_eq!(status, GuestStatus::Running);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_guest<T, F>(&self, config: &GuestConfig, body: F) -> CunikResult<T>
    where
        F: for<'g> FnOnce(&'g mut Guest) -> GuestFuture<'g, T>,
    {
        let mut guest = self.create_guest(config).await?;
        let outcome = body(&mut guest).await;
        let teardown = if guest.has_domain() {
            guest.destroy().await
        } else {
            Ok(())
        };

        match (outcome, teardown) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(teardown_error)) => {
                warn!(
                    "Teardown of guest '{}' failed after its body failed: {}",
                    guest.name(),
                    teardown_error
                );
                Err(e)
            }
        }
    }

    /// The fleet registry guests report to.
    pub fn fleet(&self) -> &Arc<dyn FleetRegistry> {
        &self.context.fleet
    }

    /// Settings applied to control-plane calls.
    pub fn control_plane_config(&self) -> &ControlPlaneConfig {
        self.context.plane.config()
    }
}
