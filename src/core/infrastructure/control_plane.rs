//! Wrapper that every control-plane round trip goes through.

use crate::core::domain::{
    error::{ControlPlaneError, CunikError, CunikResult, Operation, ValidationError},
    model::control_plane_config::ControlPlaneConfig,
};
use crate::core::infrastructure::hypervisor::HypervisorClient;
use governor::{DefaultDirectRateLimiter, Quota};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Shared access to the hypervisor control plane.
///
/// Applies the optional rate limit and call timeout from
/// [`ControlPlaneConfig`] and maps control-plane diagnostics onto
/// [`CunikError`] according to the operation that produced them.
pub struct ControlPlane {
    client: Arc<dyn HypervisorClient>,
    config: ControlPlaneConfig,
    rate_limiter: Option<DefaultDirectRateLimiter>,
}

impl ControlPlane {
    /// Creates a new `ControlPlane`.
    ///
    /// # Errors
    /// Returns `CunikError::Validation` if a rate limit value is zero.
    pub fn new(client: Arc<dyn HypervisorClient>, config: ControlPlaneConfig) -> CunikResult<Self> {
        let rate_limiter = match config.rate_limit {
            Some(rl) => {
                let per_second = non_zero(rl.requests_per_second, "requests_per_second")?;
                let burst = non_zero(rl.burst_size, "burst_size")?;
                let quota = Quota::per_second(per_second).allow_burst(burst);
                Some(DefaultDirectRateLimiter::direct(quota))
            }
            None => None,
        };

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    pub fn config(&self) -> &ControlPlaneConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<dyn HypervisorClient> {
        &self.client
    }

    /// Runs one control-plane call.
    ///
    /// `domain` names the domain the call concerns; it is carried into
    /// `CunikError::Definition` when a define is rejected.
    ///
    /// # Errors
    /// * `CunikError::Timeout` if the call exceeds the configured deadline
    /// * `CunikError::Connection` for a rejected connect
    /// * `CunikError::Definition` for a rejected define
    /// * `CunikError::Lifecycle` for any other rejected call
    pub async fn call<T, F>(&self, operation: Operation, domain: &str, call: F) -> CunikResult<T>
    where
        F: Future<Output = Result<T, ControlPlaneError>> + Send,
    {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let result = match self.config.call_timeout {
            Some(after) => tokio::time::timeout(after, call)
                .await
                .map_err(|_| CunikError::Timeout { operation, after })?,
            None => call.await,
        };

        result.map_err(|source| match operation {
            Operation::Connect => CunikError::Connection(source),
            Operation::Define => CunikError::Definition {
                domain: domain.to_string(),
                source,
            },
            _ => CunikError::Lifecycle { operation, source },
        })
    }
}

impl std::fmt::Debug for ControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPlane")
            .field("config", &self.config)
            .field("rate_limited", &self.rate_limiter.is_some())
            .finish()
    }
}

fn non_zero(value: u32, field: &str) -> Result<NonZeroU32, ValidationError> {
    NonZeroU32::new(value).ok_or_else(|| ValidationError::Field {
        field: field.to_string(),
        message: "Rate limit values must be positive".to_string(),
    })
}
