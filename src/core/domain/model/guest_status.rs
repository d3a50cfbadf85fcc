//! Locally tracked status of a guest.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The last lifecycle operation a guest completed successfully.
///
/// `Destroyed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuestStatus {
    #[default]
    NotStarted,
    Running,
    Stopped,
    Destroyed,
}

impl GuestStatus {
    /// Returns true once no further lifecycle operation is valid.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GuestStatus::Destroyed)
    }
}

impl fmt::Display for GuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GuestStatus::NotStarted => "Not started",
            GuestStatus::Running => "Running",
            GuestStatus::Stopped => "Stopped",
            GuestStatus::Destroyed => "Destroyed",
        };
        f.write_str(label)
    }
}
