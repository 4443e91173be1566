use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a called ticket as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Called,
    Serving,
    Done,
    NoShow,
}

/// One called ticket. Immutable once created; the backend resends the full
/// list on every refresh, most recently called first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalledTicket {
    pub id: Uuid,
    pub display_number: String,
    pub queue_name: String,
    pub queue_id: Uuid,
    pub status: TicketStatus,
    pub called_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
}
