//! Catalogue of known guests.

use crate::core::domain::{
    error::{CunikError, CunikResult},
    model::{fleet_record::FleetRecord, guest_status::GuestStatus},
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Bookkeeping of every guest a manager has created.
///
/// Guests call into the registry after each successful transition.
#[async_trait]
pub trait FleetRegistry: Send + Sync {
    /// Records a newly created guest.
    async fn register(&self, record: FleetRecord) -> CunikResult<()>;

    /// Records a new status for a known guest.
    async fn update(&self, id: Uuid, status: GuestStatus) -> CunikResult<()>;

    /// Forgets a guest.
    async fn remove(&self, id: Uuid) -> CunikResult<()>;

    /// Returns the record for `id`, if any.
    async fn get(&self, id: Uuid) -> CunikResult<Option<FleetRecord>>;

    /// Returns every record, ordered by name.
    async fn list(&self) -> CunikResult<Vec<FleetRecord>>;
}

/// Process-local fleet registry.
#[derive(Debug, Default)]
pub struct InMemoryFleetRegistry {
    records: RwLock<HashMap<Uuid, FleetRecord>>,
}

impl InMemoryFleetRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FleetRegistry for InMemoryFleetRegistry {
    async fn register(&self, record: FleetRecord) -> CunikResult<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(CunikError::Registry(format!(
                "guest {} is already registered",
                record.id
            )));
        }
        records.insert(record.id, record);
        Ok(())
    }

    async fn update(&self, id: Uuid, status: GuestStatus) -> CunikResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| CunikError::Registry(format!("guest {} is not registered", id)))?;
        record.status = status;
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> CunikResult<()> {
        self.records
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CunikError::Registry(format!("guest {} is not registered", id)))
    }

    async fn get(&self, id: Uuid) -> CunikResult<Option<FleetRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list(&self) -> CunikResult<Vec<FleetRecord>> {
        let mut records: Vec<FleetRecord> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(records)
    }
}
