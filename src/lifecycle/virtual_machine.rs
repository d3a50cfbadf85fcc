//! One hypervisor domain and the control-plane calls that drive it.

use crate::core::domain::{
    error::{ControlPlaneError, CunikError, CunikResult, Operation},
    model::domain_config::DomainConfig,
};
use crate::core::infrastructure::{control_plane::ControlPlane, hypervisor::DomainHandle};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Exclusive owner of a defined domain.
///
/// Activity is always read from the control plane, never cached. The
/// handle is released by [`VirtualMachine::destroy`], which consumes the
/// machine so the handle cannot be used afterwards.
pub struct VirtualMachine {
    name: String,
    domain: Box<dyn DomainHandle>,
    plane: Arc<ControlPlane>,
}

impl VirtualMachine {
    /// Defines a domain from `config`.
    ///
    /// Opens a connection, defines the domain, and closes the connection
    /// again; the handle outlives the connection. A failure to close is
    /// logged and does not fail the definition.
    ///
    /// # Errors
    /// * `CunikError::IncompleteConfig` / `CunikError::Validation` if the
    ///   configuration does not serialize
    /// * `CunikError::Connection` if the control plane cannot be reached
    /// * `CunikError::Definition` if the description is rejected
    /// * `CunikError::Timeout` if a call exceeds the configured deadline
    ///
    /// A define that times out may still have been stored by the control
    /// plane. No handle is returned for it, so defining the same name again
    /// fails with `CunikError::Definition` until that domain is undefined
    /// out of band. The connection is closed in either case.
    pub async fn define(plane: Arc<ControlPlane>, config: &DomainConfig) -> CunikResult<Self> {
        let description = config.serialize()?;
        let name = description.name.clone();
        let xml = description.to_xml();
        debug!(domain = %name, "Defining domain:\n{}", xml);

        let mut connection = plane
            .call(Operation::Connect, &name, plane.client().connect())
            .await?;
        let defined = plane
            .call(Operation::Define, &name, connection.define(&xml))
            .await;
        if let Err(e) = plane
            .call(Operation::Close, &name, connection.close())
            .await
        {
            warn!("Failed to close control-plane connection after defining '{}': {}", name, e);
        }

        let domain = defined?;
        info!("Defined domain '{}'", name);
        Ok(Self {
            name,
            domain,
            plane,
        })
    }

    /// The domain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Asks the control plane whether the domain is running or suspended.
    pub async fn is_active(&self) -> CunikResult<bool> {
        self.plane
            .call(Operation::IsActive, &self.name, self.domain.is_active())
            .await
    }

    /// Runs the domain: resumes it when it is active (suspended), boots it
    /// otherwise.
    ///
    /// # Errors
    /// `CunikError::Lifecycle` or `CunikError::Timeout` if the activity query
    /// or the dispatched command fails.
    pub async fn start(&mut self) -> CunikResult<()> {
        if self.is_active().await? {
            debug!("Domain '{}' is active, resuming", self.name);
            self.plane
                .call(Operation::Resume, &self.name, self.domain.resume())
                .await?;
        } else {
            debug!("Domain '{}' is inactive, booting", self.name);
            self.plane
                .call(Operation::Create, &self.name, self.domain.create())
                .await?;
        }
        info!("Started domain '{}'", self.name);
        Ok(())
    }

    /// Suspends the domain in place, keeping its memory.
    ///
    /// # Errors
    /// `CunikError::Lifecycle` if the domain is not active or the control
    /// plane rejects the suspend.
    pub async fn stop(&mut self) -> CunikResult<()> {
        if !self.is_active().await? {
            return Err(CunikError::Lifecycle {
                operation: Operation::Suspend,
                source: ControlPlaneError::new(format!("domain '{}' is not active", self.name)),
            });
        }
        self.plane
            .call(Operation::Suspend, &self.name, self.domain.suspend())
            .await?;
        info!("Suspended domain '{}'", self.name);
        Ok(())
    }

    /// Hard-stops the domain and removes its definition.
    ///
    /// The forceful destroy is only issued when the domain is active (or
    /// its activity cannot be determined). Undefine is attempted in every
    /// case. When the destroy fails its error is returned after the undefine
    /// attempt; an undefine failure in that situation is only logged.
    pub async fn destroy(self) -> CunikResult<()> {
        let active = match self.is_active().await {
            Ok(active) => active,
            Err(e) => {
                warn!(
                    "Could not query activity of '{}' before destroy, destroying anyway: {}",
                    self.name, e
                );
                true
            }
        };

        let destroyed = if active {
            self.plane
                .call(Operation::Destroy, &self.name, self.domain.destroy())
                .await
        } else {
            Ok(())
        };

        let undefined = self
            .plane
            .call(Operation::Undefine, &self.name, self.domain.undefine())
            .await;

        match (destroyed, undefined) {
            (Ok(()), Ok(())) => {
                info!("Destroyed and undefined domain '{}'", self.name);
                Ok(())
            }
            (Ok(()), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(undefine_error)) => {
                warn!(
                    "Undefine of '{}' failed after a failed destroy: {}",
                    self.name, undefine_error
                );
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for VirtualMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualMachine")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
