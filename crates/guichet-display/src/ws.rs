use std::time::Duration;

use futures_util::stream::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::action::Action;
use crate::models::DisplayEvent;

/// Channel status as shown in the header. Written only by channel events
/// flowing through the app's action path; read-only everywhere else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionState {
    pub connected: bool,
    pub reconnect_attempt: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Delay between reconnect attempts.
    pub retry_delay: Duration,
    /// Consecutive failures before the channel gives up. The display keeps
    /// operating on polling alone afterwards.
    pub max_attempts: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(3),
            max_attempts: 10,
        }
    }
}

/// Push-channel client for one display topic. A background task owns the
/// socket and the reconnect timer; decoded events flow back through the
/// app's action channel, so nothing here ever throws past the boundary.
pub struct ChannelClient {
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

impl ChannelClient {
    pub fn spawn(
        url: String,
        config: ChannelConfig,
        action_tx: UnboundedSender<Action>,
        cancel: CancellationToken,
    ) -> Self {
        let task = tokio::spawn(run(url, config, action_tx, cancel.clone()));
        Self {
            cancel,
            _task: task,
        }
    }

    /// Tears the connection and any pending reconnect timer down.
    /// Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Connection loop: `Disconnected → Connecting → Connected` with a bounded
/// retry counter. At most one live connection or one pending reconnect
/// timer exists at any time, because this task is the only owner of both.
async fn run(
    url: String,
    config: ChannelConfig,
    action_tx: UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;
    loop {
        let stream = tokio::select! {
            _ = cancel.cancelled() => return,
            result = connect_async(url.as_str()) => match result {
                Ok((stream, _)) => stream,
                Err(err) => {
                    warn!("push channel connect failed: {err}");
                    if !retry_or_give_up(&mut attempt, &config, &action_tx, &cancel).await {
                        return;
                    }
                    continue;
                }
            },
        };

        info!("push channel connected to {url}");
        attempt = 0;
        let _ = action_tx.send(Action::ChannelConnected);

        let (_write, mut read) = stream.split();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => dispatch(&text, &action_tx),
                    Some(Ok(Message::Close(_))) | None => {
                        info!("push channel closed by server");
                        break;
                    }
                    Some(Ok(_)) => {} // ping/pong/binary
                    Some(Err(err)) => {
                        error!("push channel error: {err}");
                        break;
                    }
                },
            }
        }

        if !retry_or_give_up(&mut attempt, &config, &action_tx, &cancel).await {
            return;
        }
    }
}

/// Books one failed attempt and waits out the retry delay. Returns false
/// once the attempt budget is exhausted or the channel is shut down.
async fn retry_or_give_up(
    attempt: &mut u32,
    config: &ChannelConfig,
    action_tx: &UnboundedSender<Action>,
    cancel: &CancellationToken,
) -> bool {
    *attempt += 1;
    let _ = action_tx.send(Action::ChannelDisconnected { attempt: *attempt });
    if *attempt >= config.max_attempts {
        warn!("push channel giving up after {attempt} attempts; polling only");
        let _ = action_tx.send(Action::ChannelGaveUp);
        return false;
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(config.retry_delay) => true,
    }
}

fn dispatch(text: &str, action_tx: &UnboundedSender<Action>) {
    match serde_json::from_str::<DisplayEvent>(text) {
        Ok(DisplayEvent::TicketCalled { ticket }) => {
            let _ = action_tx.send(Action::PushTicket(Box::new(ticket)));
        }
        Ok(DisplayEvent::Refresh) => {
            let _ = action_tx.send(Action::Refresh);
        }
        // Unknown message kinds are not a protocol error.
        Err(err) => debug!("ignoring unknown push message: {err}"),
    }
}
