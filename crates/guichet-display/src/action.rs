use serde::{Deserialize, Serialize};
use strum::Display;

use crate::api::FetchError;
use crate::models::{CalledTicket, DisplaySnapshot};

/// Everything that can happen to the display. The poller, the push channel
/// and the tick timer all funnel through one channel of these, so there is
/// a single logical writer of display state.
#[derive(Debug, Clone, PartialEq, Display, Serialize, Deserialize)]
pub enum Action {
    // Tick and Render
    Tick,
    Render,
    Resize(u16, u16),

    // Terminal actions
    Suspend,
    Resume,
    Quit,
    ClearScreen,
    Error(String),
    Help,

    // Display state
    Refresh,
    ToggleMute,
    SnapshotLoaded(Box<DisplaySnapshot>),
    SnapshotFailed(FetchError),
    PushTicket(Box<CalledTicket>),

    // Push channel lifecycle
    ChannelConnected,
    ChannelDisconnected { attempt: u32 },
    ChannelGaveUp,
}
