//! Trading accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account belongs to exactly one user. Its balance is never stored: it is
/// derived on read from the transfer and closed-trade event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub broker: Option<String>,
    pub kind: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
