use super::{
    builder, guest_config, hypervisor_defining, manager, refusing_hypervisor,
    unreachable_hypervisor,
};
use crate::core::domain::error::ControlPlaneError;
use crate::core::infrastructure::hypervisor::{
    Connection, DomainHandle, HypervisorClient, MockDomainHandle,
};
use crate::{
    CunikError, CunikResult, FleetRecord, FleetRegistry, GuestStatus, Operation, ResolveError,
};
use async_trait::async_trait;
use mockall::Sequence;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

fn captured() -> Arc<Mutex<Option<String>>> {
    Arc::new(Mutex::new(None))
}

#[tokio::test]
async fn test_new_guest_is_registered_not_started() {
    let manager = manager(hypervisor_defining(MockDomainHandle::new(), captured()));

    let guest = manager.create_guest(&guest_config("g1")).await.unwrap();
    assert_eq!(guest.status(), GuestStatus::NotStarted);
    assert_eq!(guest.name(), "g1");
    assert!(guest.has_domain());

    let record = manager.fleet().get(guest.id()).await.unwrap().unwrap();
    assert_eq!(record.name, "g1");
    assert_eq!(record.status, GuestStatus::NotStarted);
}

#[tokio::test]
async fn test_stop_before_start_fails_and_keeps_status() {
    let mut handle = MockDomainHandle::new();
    handle.expect_is_active().returning(|| Ok(false));
    handle.expect_suspend().never();
    let manager = manager(hypervisor_defining(handle, captured()));

    let mut guest = manager.create_guest(&guest_config("g1")).await.unwrap();
    let err = guest.stop().await.unwrap_err();

    assert!(matches!(
        err,
        CunikError::Lifecycle {
            operation: Operation::Suspend,
            ..
        }
    ));
    assert_eq!(guest.status(), GuestStatus::NotStarted);
    let record = manager.fleet().get(guest.id()).await.unwrap().unwrap();
    assert_eq!(record.status, GuestStatus::NotStarted);
}

#[tokio::test]
async fn test_start_stop_start_transitions() {
    let mut seq = Sequence::new();
    let mut handle = MockDomainHandle::new();
    handle
        .expect_is_active()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(false));
    handle
        .expect_create()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    handle
        .expect_is_active()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(true));
    handle
        .expect_suspend()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    handle
        .expect_is_active()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(true));
    handle
        .expect_resume()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    let manager = manager(hypervisor_defining(handle, captured()));

    let mut guest = manager.create_guest(&guest_config("g1")).await.unwrap();
    let mut observed = vec![guest.status()];

    guest.start().await.unwrap();
    observed.push(guest.status());
    guest.stop().await.unwrap();
    observed.push(guest.status());
    guest.start().await.unwrap();
    observed.push(guest.status());

    assert_eq!(
        observed,
        vec![
            GuestStatus::NotStarted,
            GuestStatus::Running,
            GuestStatus::Stopped,
            GuestStatus::Running
        ]
    );
    let record = manager.fleet().get(guest.id()).await.unwrap().unwrap();
    assert_eq!(record.status, GuestStatus::Running);
}

#[tokio::test]
async fn test_failed_create_leaves_not_started() {
    let mut handle = MockDomainHandle::new();
    handle.expect_is_active().returning(|| Ok(false));
    handle
        .expect_create()
        .times(1)
        .returning(|| Err(ControlPlaneError::new("not enough free memory")));
    let manager = manager(hypervisor_defining(handle, captured()));

    let mut guest = manager.create_guest(&guest_config("g1")).await.unwrap();
    let err = guest.start().await.unwrap_err();

    assert!(matches!(
        err,
        CunikError::Lifecycle {
            operation: Operation::Create,
            ..
        }
    ));
    assert_eq!(guest.status(), GuestStatus::NotStarted);
}

#[tokio::test]
async fn test_destroy_removes_guest() {
    let mut handle = MockDomainHandle::new();
    let mut seq = Sequence::new();
    handle
        .expect_is_active()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(false));
    handle
        .expect_create()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    handle
        .expect_is_active()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(true));
    handle
        .expect_destroy()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    handle
        .expect_undefine()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    let manager = manager(hypervisor_defining(handle, captured()));

    let mut guest = manager.create_guest(&guest_config("g1")).await.unwrap();
    guest.start().await.unwrap();
    guest.destroy().await.unwrap();

    assert_eq!(guest.status(), GuestStatus::Destroyed);
    assert!(!guest.has_domain());
    assert!(manager.fleet().get(guest.id()).await.unwrap().is_none());

    for result in [guest.start().await, guest.stop().await, guest.destroy().await] {
        assert!(matches!(result, Err(CunikError::InvalidState { .. })));
    }
    assert_eq!(guest.status(), GuestStatus::Destroyed);
}

#[tokio::test]
async fn test_failed_destroy_still_undefines_and_surfaces_error() {
    let mut handle = MockDomainHandle::new();
    handle.expect_is_active().returning(|| Ok(true));
    handle
        .expect_destroy()
        .times(1)
        .returning(|| Err(ControlPlaneError::new("failed to terminate process")));
    handle.expect_undefine().times(1).returning(|| Ok(()));
    let manager = manager(hypervisor_defining(handle, captured()));

    let mut guest = manager.create_guest(&guest_config("g1")).await.unwrap();
    let err = guest.destroy().await.unwrap_err();

    assert!(matches!(
        err,
        CunikError::Lifecycle {
            operation: Operation::Destroy,
            ..
        }
    ));
    assert_eq!(guest.status(), GuestStatus::NotStarted);
    assert!(!guest.has_domain());
    assert!(matches!(
        guest.start().await,
        Err(CunikError::InvalidState { .. })
    ));
    assert!(manager.fleet().get(guest.id()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_unknown_image_aborts_before_definition() {
    let manager = manager(unreachable_hypervisor());
    let mut config = serde_json::Map::new();
    for (key, value) in [
        ("name", "g1"),
        ("img", "ubuntu"),
        ("cmd", ""),
        ("vmm", "kvm"),
        ("mem", "1024"),
        ("data_volume", ""),
        ("data_volume_mount_point", ""),
        ("network_config", ""),
    ] {
        config.insert(key.to_string(), serde_json::Value::from(value));
    }
    let config = crate::GuestConfig::from_map(&config).unwrap();

    let err = manager.create_guest(&config).await.unwrap_err();
    assert!(matches!(
        err,
        CunikError::UnresolvedReference(ResolveError::UnknownImage(ref name)) if name == "ubuntu"
    ));
    assert!(manager.fleet().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_connection_refused_registers_nothing() {
    let manager = manager(refusing_hypervisor());

    let err = manager
        .create_guest(&guest_config("g1"))
        .await
        .unwrap_err();
    assert!(matches!(err, CunikError::Connection(_)));
    assert!(manager.fleet().list().await.unwrap().is_empty());
}

struct RejectingFleet;

#[async_trait]
impl FleetRegistry for RejectingFleet {
    async fn register(&self, _record: FleetRecord) -> CunikResult<()> {
        Err(CunikError::Registry("catalogue is read-only".to_string()))
    }

    async fn update(&self, _id: Uuid, _status: GuestStatus) -> CunikResult<()> {
        Ok(())
    }

    async fn remove(&self, _id: Uuid) -> CunikResult<()> {
        Ok(())
    }

    async fn get(&self, _id: Uuid) -> CunikResult<Option<FleetRecord>> {
        Ok(None)
    }

    async fn list(&self) -> CunikResult<Vec<FleetRecord>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_registration_failure_tears_down_domain() {
    let mut handle = MockDomainHandle::new();
    handle.expect_is_active().returning(|| Ok(false));
    handle.expect_destroy().never();
    handle.expect_undefine().times(1).returning(|| Ok(()));
    let manager = builder(hypervisor_defining(handle, captured()))
        .fleet_registry(Arc::new(RejectingFleet))
        .build()
        .unwrap();

    let err = manager
        .create_guest(&guest_config("g1"))
        .await
        .unwrap_err();
    assert!(matches!(err, CunikError::Registry(_)));
}

/// Accepts registrations, then loses every later write.
struct StaleFleet;

#[async_trait]
impl FleetRegistry for StaleFleet {
    async fn register(&self, _record: FleetRecord) -> CunikResult<()> {
        Ok(())
    }

    async fn update(&self, _id: Uuid, _status: GuestStatus) -> CunikResult<()> {
        Err(CunikError::Registry("catalogue unavailable".to_string()))
    }

    async fn remove(&self, _id: Uuid) -> CunikResult<()> {
        Err(CunikError::Registry("catalogue unavailable".to_string()))
    }

    async fn get(&self, _id: Uuid) -> CunikResult<Option<FleetRecord>> {
        Ok(None)
    }

    async fn list(&self) -> CunikResult<Vec<FleetRecord>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_fleet_failure_after_transition_still_advances_status() {
    let mut handle = MockDomainHandle::new();
    let mut seq = Sequence::new();
    handle
        .expect_is_active()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(false));
    handle
        .expect_create()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    handle
        .expect_is_active()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(true));
    handle
        .expect_destroy()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    handle
        .expect_undefine()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    let manager = builder(hypervisor_defining(handle, captured()))
        .fleet_registry(Arc::new(StaleFleet))
        .build()
        .unwrap();

    let mut guest = manager.create_guest(&guest_config("g1")).await.unwrap();

    let err = guest.start().await.unwrap_err();
    assert!(matches!(err, CunikError::Registry(_)));
    assert_eq!(guest.status(), GuestStatus::Running);

    let err = guest.destroy().await.unwrap_err();
    assert!(matches!(err, CunikError::Registry(_)));
    assert_eq!(guest.status(), GuestStatus::Destroyed);
    assert!(!guest.has_domain());
}

#[tokio::test]
async fn test_with_guest_tears_down_after_success() {
    let mut handle = MockDomainHandle::new();
    let mut seq = Sequence::new();
    handle
        .expect_is_active()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(false));
    handle
        .expect_create()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    handle
        .expect_is_active()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(true));
    handle
        .expect_destroy()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    handle
        .expect_undefine()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    let manager = manager(hypervisor_defining(handle, captured()));

    let (id, status) = manager
        .with_guest(&guest_config("g1"), |guest| {
            Box::pin(async move {
                guest.start().await?;
                CunikResult::Ok((guest.id(), guest.status()))
            })
        })
        .await
        .unwrap();

    assert_eq!(status, GuestStatus::Running);
    assert!(manager.fleet().get(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_with_guest_tears_down_after_error() {
    let mut handle = MockDomainHandle::new();
    handle.expect_is_active().returning(|| Ok(false));
    handle.expect_undefine().times(1).returning(|| Ok(()));
    let manager = manager(hypervisor_defining(handle, captured()));

    let result: CunikResult<()> = manager
        .with_guest(&guest_config("g1"), |guest| {
            Box::pin(async move {
                guest.stop().await?;
                Ok(())
            })
        })
        .await;

    assert!(matches!(
        result,
        Err(CunikError::Lifecycle {
            operation: Operation::Suspend,
            ..
        })
    ));
    assert!(manager.fleet().list().await.unwrap().is_empty());
}

/// Domain whose boot never completes.
struct StalledDomain;

#[async_trait]
impl DomainHandle for StalledDomain {
    async fn is_active(&self) -> Result<bool, ControlPlaneError> {
        Ok(false)
    }

    async fn create(&self) -> Result<(), ControlPlaneError> {
        std::future::pending().await
    }

    async fn resume(&self) -> Result<(), ControlPlaneError> {
        Ok(())
    }

    async fn suspend(&self) -> Result<(), ControlPlaneError> {
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ControlPlaneError> {
        Ok(())
    }

    async fn undefine(&self) -> Result<(), ControlPlaneError> {
        Ok(())
    }
}

struct StalledConnection;

#[async_trait]
impl Connection for StalledConnection {
    async fn define(&self, _description: &str) -> Result<Box<dyn DomainHandle>, ControlPlaneError> {
        Ok(Box::new(StalledDomain))
    }

    async fn close(&mut self) -> Result<(), ControlPlaneError> {
        Ok(())
    }
}

struct StalledHypervisor;

#[async_trait]
impl HypervisorClient for StalledHypervisor {
    async fn connect(&self) -> Result<Box<dyn Connection>, ControlPlaneError> {
        Ok(Box::new(StalledConnection))
    }
}

#[tokio::test]
async fn test_hung_start_times_out_without_advancing() {
    let manager = builder(Arc::new(StalledHypervisor))
        .call_timeout(Some(Duration::from_millis(50)))
        .build()
        .unwrap();

    let mut guest = manager.create_guest(&guest_config("g1")).await.unwrap();
    let err = guest.start().await.unwrap_err();

    assert!(matches!(
        err,
        CunikError::Timeout {
            operation: Operation::Create,
            ..
        }
    ));
    assert_eq!(guest.status(), GuestStatus::NotStarted);
    guest.destroy().await.unwrap();
}

#[tokio::test]
async fn test_guest_ids_are_unique() {
    let manager = builder(Arc::new(StalledHypervisor)).build().unwrap();

    let mut first = manager.create_guest(&guest_config("g1")).await.unwrap();
    let mut second = manager.create_guest(&guest_config("g2")).await.unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(manager.fleet().list().await.unwrap().len(), 2);

    first.destroy().await.unwrap();
    second.destroy().await.unwrap();
    assert!(manager.fleet().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_builder_requires_collaborators() {
    let result = crate::GuestManager::builder()
        .hypervisor(unreachable_hypervisor())
        .build();
    assert!(matches!(result, Err(CunikError::Validation(_))));

    let result = builder(unreachable_hypervisor()).rate_limit(0, 1).build();
    assert!(matches!(result, Err(CunikError::Validation(_))));
}
