use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::display::DisplayConfig;
use crate::entities::ticket::CalledTicket;

/// Maximum number of tickets a display renders at once.
pub const DISPLAY_WINDOW: usize = 8;

/// The full state needed to render one screen at one instant. Replaced
/// wholesale on every successful refresh; the one in-place mutation is
/// [`DisplaySnapshot::merge_pushed_ticket`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    pub display: DisplayConfig,
    #[serde(default)]
    pub tickets: Vec<CalledTicket>,
    /// Waiting count per queue id.
    #[serde(default)]
    pub waiting_stats: HashMap<Uuid, u32>,
    /// Generation time of the snapshot, shown as "last updated".
    pub timestamp: DateTime<Utc>,
}

impl DisplaySnapshot {
    /// The tickets actually rendered: the most recent [`DISPLAY_WINDOW`]
    /// entries, most recently called first.
    pub fn window(&self) -> &[CalledTicket] {
        &self.tickets[..self.tickets.len().min(DISPLAY_WINDOW)]
    }

    /// Optimistic merge of a single pushed ticket ahead of the next poll:
    /// prepend, drop any older entry with the same id, re-cap. The next
    /// full refresh overwrites the list entirely.
    pub fn merge_pushed_ticket(&mut self, ticket: CalledTicket) {
        self.tickets.retain(|t| t.id != ticket.id);
        self.tickets.insert(0, ticket);
        self.tickets.truncate(DISPLAY_WINDOW);
    }

    /// Total number of people waiting across all queues.
    pub fn total_waiting(&self) -> u32 {
        self.waiting_stats.values().sum()
    }
}
