//! Catalogue entry describing one known guest.

use crate::core::domain::model::guest_status::GuestStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A guest as seen by the fleet registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FleetRecord {
    /// The guest identifier, unique across the fleet.
    pub id: Uuid,
    /// The guest (and domain) name.
    pub name: String,
    /// Last status reported by the guest.
    pub status: GuestStatus,
}
