//! Shared builders for unit tests.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::models::{CalledTicket, DisplayConfig, DisplaySnapshot, TicketStatus};

pub fn ticket(n: u128, number: &str) -> CalledTicket {
    CalledTicket {
        id: Uuid::from_u128(n),
        display_number: number.to_string(),
        queue_name: "Caisse".to_string(),
        queue_id: Uuid::from_u128(900),
        status: TicketStatus::Called,
        called_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, (n % 60) as u32).unwrap(),
        counter_number: Some(2),
        agent_name: None,
    }
}

pub fn display_config() -> DisplayConfig {
    serde_json::from_str(
        r#"{"id":"00000000-0000-0000-0000-000000000001","name":"Accueil"}"#,
    )
    .unwrap()
}

pub fn snapshot(tickets: Vec<CalledTicket>) -> DisplaySnapshot {
    DisplaySnapshot {
        display: display_config(),
        tickets,
        waiting_stats: HashMap::new(),
        timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    }
}
