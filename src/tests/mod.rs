mod guest_lifecycle;

use crate::core::domain::error::ControlPlaneError;
use crate::core::infrastructure::hypervisor::{
    Connection, DomainHandle, HypervisorClient, MockConnection, MockDomainHandle,
    MockHypervisorClient,
};
use crate::{GuestConfig, GuestManager, GuestManagerBuilder, StaticRegistry};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Hypervisor that accepts exactly one definition and hands out `handle`.
///
/// The XML it received is stored in `captured`.
pub(super) fn hypervisor_defining(
    handle: MockDomainHandle,
    captured: Arc<Mutex<Option<String>>>,
) -> Arc<dyn HypervisorClient> {
    let mut connection = MockConnection::new();
    connection
        .expect_define()
        .times(1)
        .return_once(move |xml: &str| {
            *captured.lock().unwrap() = Some(xml.to_string());
            Ok(Box::new(handle) as Box<dyn DomainHandle>)
        });
    connection.expect_close().returning(|| Ok(()));

    let mut client = MockHypervisorClient::new();
    client
        .expect_connect()
        .times(1)
        .return_once(move || Ok(Box::new(connection) as Box<dyn Connection>));
    Arc::new(client)
}

/// Hypervisor that must never be contacted.
pub(super) fn unreachable_hypervisor() -> Arc<dyn HypervisorClient> {
    let mut client = MockHypervisorClient::new();
    client.expect_connect().never();
    Arc::new(client)
}

/// Hypervisor whose connections are refused.
pub(super) fn refusing_hypervisor() -> Arc<dyn HypervisorClient> {
    let mut client = MockHypervisorClient::new();
    client
        .expect_connect()
        .returning(|| Err(ControlPlaneError::new("failed to connect to the hypervisor")));
    Arc::new(client)
}

pub(super) fn builder(hypervisor: Arc<dyn HypervisorClient>) -> GuestManagerBuilder {
    GuestManager::builder()
        .hypervisor(hypervisor)
        .image_registry(Arc::new(
            StaticRegistry::new().with_entry("alpine", "/images/alpine.img"),
        ))
        .volume_registry(Arc::new(
            StaticRegistry::new().with_entry("db", "/volumes/db.img"),
        ))
}

pub(super) fn manager(hypervisor: Arc<dyn HypervisorClient>) -> GuestManager {
    builder(hypervisor).build().unwrap()
}

pub(super) fn guest_config(name: &str) -> GuestConfig {
    GuestConfig::from_value(json!({
        "name": name,
        "img": "alpine",
        "cmd": "-v",
        "vmm": "kvm",
        "mem": 524288,
        "data_volume": "",
        "data_volume_mount_point": "",
        "network_config": ""
    }))
    .unwrap()
}
