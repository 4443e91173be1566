// Re-export core entities
pub use guichet_core::entities::display::{DisplayConfig, LayoutVariant};
pub use guichet_core::entities::response::{ApiResponse, DisplayEvent};
pub use guichet_core::entities::snapshot::{DISPLAY_WINDOW, DisplaySnapshot};
pub use guichet_core::entities::ticket::{CalledTicket, TicketStatus};

/// Extension trait for TicketStatus with display helpers
pub trait TicketStatusExt {
    fn as_str(&self) -> &'static str;
}

impl TicketStatusExt for TicketStatus {
    fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Called => "Appelé",
            TicketStatus::Serving => "En cours",
            TicketStatus::Done => "Terminé",
            TicketStatus::NoShow => "Absent",
        }
    }
}
