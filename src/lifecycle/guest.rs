//! A managed unikernel instance.

use crate::core::domain::{
    error::{CunikError, CunikResult},
    model::{fleet_record::FleetRecord, guest_config::GuestConfig, guest_status::GuestStatus},
};
use crate::core::infrastructure::{
    control_plane::ControlPlane,
    fleet_registry::FleetRegistry,
    registry::{DataVolumeRegistry, ImageRegistry},
};
use crate::lifecycle::virtual_machine::VirtualMachine;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The collaborators a guest is created against.
#[derive(Clone)]
pub(crate) struct GuestContext {
    pub(crate) plane: Arc<ControlPlane>,
    pub(crate) images: Arc<dyn ImageRegistry>,
    pub(crate) volumes: Arc<dyn DataVolumeRegistry>,
    pub(crate) fleet: Arc<dyn FleetRegistry>,
}

/// A unikernel guest: one virtual machine plus its tracked status.
///
/// `status` only ever reflects a lifecycle operation the control plane
/// confirmed; a failed operation leaves it untouched. All operations take
/// `&mut self`, so a guest has a single writer; share it behind a
/// `tokio::sync::Mutex` when several tasks drive it.
///
/// A guest must be torn down with [`Guest::destroy`] (or created through
/// [`GuestManager::with_guest`]). Dropping a guest that still owns its
/// domain leaves the domain defined and logs a warning.
///
/// [`GuestManager::with_guest`]: crate::GuestManager::with_guest
pub struct Guest {
    id: Uuid,
    name: String,
    status: GuestStatus,
    vm: Option<VirtualMachine>,
    fleet: Arc<dyn FleetRegistry>,
}

impl Guest {
    /// Resolves `config`, defines its domain and registers the new guest.
    ///
    /// When registration fails the freshly defined domain is torn down
    /// before the error is returned.
    pub(crate) async fn create(config: &GuestConfig, context: &GuestContext) -> CunikResult<Self> {
        let domain_config = config
            .resolve(context.images.as_ref(), context.volumes.as_ref())
            .await?;
        let vm = VirtualMachine::define(Arc::clone(&context.plane), &domain_config).await?;

        let id = Uuid::new_v4();
        let record = FleetRecord {
            id,
            name: config.name().to_string(),
            status: GuestStatus::NotStarted,
        };
        if let Err(e) = context.fleet.register(record).await {
            warn!("Registration of guest '{}' failed, tearing down its domain", config.name());
            if let Err(cleanup) = vm.destroy().await {
                warn!(
                    "Teardown of unregistered guest '{}' failed: {}",
                    config.name(),
                    cleanup
                );
            }
            return Err(e);
        }

        info!("Created guest '{}' ({})", config.name(), id);
        Ok(Self {
            id,
            name: config.name().to_string(),
            status: GuestStatus::NotStarted,
            vm: Some(vm),
            fleet: Arc::clone(&context.fleet),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> GuestStatus {
        self.status
    }

    /// Whether the guest still owns its virtual machine.
    pub fn has_domain(&self) -> bool {
        self.vm.is_some()
    }

    /// Starts (or resumes) the guest and records `Running`.
    ///
    /// # Errors
    /// * `CunikError::InvalidState` if the guest no longer owns a domain
    /// * errors from [`VirtualMachine::start`]; status is left unchanged
    /// * `CunikError::Registry` if the new status cannot be recorded
    pub async fn start(&mut self) -> CunikResult<()> {
        self.vm_mut("start")?.start().await?;
        self.transition(GuestStatus::Running).await
    }

    /// Suspends the guest and records `Stopped`.
    ///
    /// # Errors
    /// * `CunikError::InvalidState` if the guest no longer owns a domain
    /// * errors from [`VirtualMachine::stop`]; status is left unchanged
    /// * `CunikError::Registry` if the new status cannot be recorded
    pub async fn stop(&mut self) -> CunikResult<()> {
        self.vm_mut("stop")?.stop().await?;
        self.transition(GuestStatus::Stopped).await
    }

    /// Destroys the guest's domain and removes it from the fleet registry.
    ///
    /// The virtual machine is released whatever the outcome. Status becomes
    /// `Destroyed` only if the teardown succeeded; otherwise the guest keeps
    /// its previous status, accepts no further operations, and the error is
    /// returned.
    pub async fn destroy(&mut self) -> CunikResult<()> {
        let vm = self
            .vm
            .take()
            .ok_or_else(|| self.invalid_state("destroy"))?;

        if let Err(e) = vm.destroy().await {
            error!(
                "Teardown of guest '{}' ({}) failed, its domain may still exist: {}",
                self.name, self.id, e
            );
            return Err(e);
        }

        self.status = GuestStatus::Destroyed;
        info!("Guest '{}' ({}) destroyed", self.name, self.id);
        self.fleet.remove(self.id).await
    }

    fn vm_mut(&mut self, operation: &'static str) -> CunikResult<&mut VirtualMachine> {
        match self.vm {
            Some(ref mut vm) => Ok(vm),
            None => Err(self.invalid_state(operation)),
        }
    }

    fn invalid_state(&self, operation: &'static str) -> CunikError {
        let status = if self.status.is_terminal() {
            self.status.to_string()
        } else {
            format!("{} after a failed destroy", self.status)
        };
        CunikError::InvalidState {
            guest: self.id.to_string(),
            operation,
            status,
        }
    }

    async fn transition(&mut self, status: GuestStatus) -> CunikResult<()> {
        self.status = status;
        info!("Guest '{}' ({}) is now {}", self.name, self.id, status);
        self.fleet.update(self.id, status).await
    }
}

impl std::fmt::Debug for Guest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guest")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("vm", &self.vm)
            .finish()
    }
}

impl Drop for Guest {
    fn drop(&mut self) {
        if let Some(vm) = &self.vm {
            warn!(
                "Guest '{}' ({}) dropped without destroy; domain '{}' is still defined",
                self.name,
                self.id,
                vm.name()
            );
        }
    }
}
