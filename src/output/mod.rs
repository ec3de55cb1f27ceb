pub mod json;
pub mod table;

use serde::{Deserialize, Serialize};

/// Which audience projection to print.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViewSelection {
    Traveler,
    Approver,
    Compliance,
    All,
}
