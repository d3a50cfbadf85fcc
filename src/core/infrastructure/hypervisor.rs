//! Seams to the hypervisor control plane.
//!
//! The transport behind these traits (a libvirt socket, a REST gateway, an
//! in-process fake) is the implementor's concern. A [`DomainHandle`] must stay
//! usable after the [`Connection`] that defined it is closed.

use crate::core::domain::error::ControlPlaneError;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Opens connections to the control plane.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HypervisorClient: Send + Sync {
    /// Opens a fresh connection.
    async fn connect(&self) -> Result<Box<dyn Connection>, ControlPlaneError>;
}

/// A live control-plane connection.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Connection: Send + Sync {
    /// Defines a persistent domain from its XML description.
    async fn define(&self, description: &str) -> Result<Box<dyn DomainHandle>, ControlPlaneError>;

    /// Closes the connection. Handles obtained from it remain valid.
    async fn close(&mut self) -> Result<(), ControlPlaneError>;
}

/// A defined domain.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DomainHandle: Send + Sync {
    /// Whether the domain is running or suspended.
    async fn is_active(&self) -> Result<bool, ControlPlaneError>;

    /// Boots an inactive domain.
    async fn create(&self) -> Result<(), ControlPlaneError>;

    /// Resumes a suspended domain.
    async fn resume(&self) -> Result<(), ControlPlaneError>;

    /// Pauses an active domain, keeping its memory.
    async fn suspend(&self) -> Result<(), ControlPlaneError>;

    /// Hard-stops an active domain.
    async fn destroy(&self) -> Result<(), ControlPlaneError>;

    /// Removes the persistent definition.
    async fn undefine(&self) -> Result<(), ControlPlaneError>;
}
