use serde::{Deserialize, Serialize};

use crate::entities::ticket::CalledTicket;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.to_string()),
        }
    }
}

/// Push-channel messages for one display topic. Message kinds the client
/// does not know are dropped at the decode boundary, never fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayEvent {
    /// A ticket was just called to a counter.
    TicketCalled { ticket: CalledTicket },
    /// The backend asks the display to refetch its snapshot now.
    Refresh,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn decodes_the_tagged_wire_format() {
        let raw = r#"{
            "type": "ticket_called",
            "ticket": {
                "id": "00000000-0000-0000-0000-00000000002a",
                "display_number": "A042",
                "queue_name": "Caisse",
                "queue_id": "00000000-0000-0000-0000-000000000384",
                "status": "called",
                "called_at": "2026-03-01T09:15:00Z",
                "counter_number": 3
            }
        }"#;

        match serde_json::from_str::<DisplayEvent>(raw).unwrap() {
            DisplayEvent::TicketCalled { ticket } => {
                assert_eq!(ticket.display_number, "A042");
                assert_eq!(ticket.counter_number, Some(3));
                assert_eq!(ticket.agent_name, None);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        assert!(matches!(
            serde_json::from_str::<DisplayEvent>(r#"{"type":"refresh"}"#).unwrap(),
            DisplayEvent::Refresh
        ));
    }

    #[test]
    fn unknown_message_kinds_do_not_decode() {
        assert!(serde_json::from_str::<DisplayEvent>(r#"{"type":"queue_paused"}"#).is_err());
    }
}
