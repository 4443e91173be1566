use std::time::Duration;

use chrono::{DateTime, Local};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use crossterm::event::KeyEvent;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::announce::Announcer;
use crate::api::{ApiClient, FetchError};
use crate::config::Config;
use crate::diff::AnnounceTracker;
use crate::models::{CalledTicket, DisplaySnapshot};
use crate::poll::{self, Poller};
use crate::tui::{Event, Tui};
use crate::ui;
use crate::ws::{ChannelClient, ChannelConfig, ConnectionState};

/// Display state and the loop that owns it. The poller, the push channel
/// and the tick timer are independent producers, but every mutation goes
/// through [`App::handle_action`] on this single task, one action at a
/// time, so there is never a concurrent write.
pub struct App {
    pub config: Config,
    pub api: ApiClient,
    pub tick_rate: f64,
    pub frame_rate: f64,

    // What the screen shows
    pub snapshot: Option<DisplaySnapshot>,
    pub last_error: Option<FetchError>,
    pub status_message: Option<String>,
    pub connection: ConnectionState,
    pub now: DateTime<Local>,
    pub show_help: bool,

    // Announcement pipeline
    pub tracker: AnnounceTracker,
    pub announcer: Announcer,
    primed: bool,

    // Plumbing
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    interval_tx: watch::Sender<Duration>,
    refresh_tx: mpsc::UnboundedSender<()>,
    refresh_rx: Option<mpsc::UnboundedReceiver<()>>,
    cancel: CancellationToken,
    should_quit: bool,
    should_suspend: bool,
    key_buffer: Vec<KeyEvent>,
}

impl App {
    pub fn new(
        tick_rate: f64,
        frame_rate: f64,
        server: &str,
        tenant: &str,
        display: &str,
        config: Config,
    ) -> Result<Self> {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        let (interval_tx, _) = watch::channel(Duration::from_secs(
            guichet_core::entities::display::DEFAULT_REFRESH_SECONDS,
        ));
        Ok(Self {
            config,
            api: ApiClient::new(server, tenant, display),
            tick_rate,
            frame_rate,
            snapshot: None,
            last_error: None,
            status_message: None,
            connection: ConnectionState::default(),
            now: Local::now(),
            show_help: false,
            tracker: AnnounceTracker::new(),
            announcer: Announcer::from_environment(),
            primed: false,
            action_tx,
            action_rx,
            interval_tx,
            refresh_tx,
            refresh_rx: Some(refresh_rx),
            cancel: CancellationToken::new(),
            should_quit: false,
            should_suspend: false,
            key_buffer: Vec::new(),
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?
            .tick_rate(self.tick_rate)
            .frame_rate(self.frame_rate);
        tui.enter()?;

        let refresh_rx = self
            .refresh_rx
            .take()
            .ok_or_else(|| eyre!("app is already running"))?;
        let poller = Poller::new(
            self.api.clone(),
            self.action_tx.clone(),
            self.interval_tx.subscribe(),
            refresh_rx,
        )
        .spawn(self.cancel.child_token());
        let heartbeat = poll::spawn_heartbeat(self.api.clone(), self.cancel.child_token());
        let channel = ChannelClient::spawn(
            self.api.stream_ws_url().map_err(|e| eyre!(e))?.to_string(),
            ChannelConfig::default(),
            self.action_tx.clone(),
            self.cancel.child_token(),
        );

        loop {
            if let Some(event) = tui.next().await {
                match event {
                    Event::Tick => {
                        self.key_buffer.clear();
                        self.action_tx.send(Action::Tick)?;
                    }
                    Event::Render => self.action_tx.send(Action::Render)?,
                    Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                    Event::Key(key) => self.handle_key(key)?,
                    Event::Error(message) => self.action_tx.send(Action::Error(message))?,
                    Event::Init => {}
                }
            }

            while let Ok(action) = self.action_rx.try_recv() {
                if action != Action::Tick && action != Action::Render {
                    debug!("{action:?}");
                }
                match action {
                    Action::Render => self.render(&mut tui)?,
                    // draw() autoresizes the fullscreen viewport.
                    Action::Resize(_, _) => self.render(&mut tui)?,
                    Action::ClearScreen => tui.terminal.clear()?,
                    action => self.handle_action(action),
                }
            }

            if self.should_suspend {
                self.should_suspend = false;
                tui.suspend()?;
                self.action_tx.send(Action::Resume)?;
                self.action_tx.send(Action::ClearScreen)?;
                tui = Tui::new()?
                    .tick_rate(self.tick_rate)
                    .frame_rate(self.frame_rate);
                tui.enter()?;
            } else if self.should_quit {
                tui.stop()?;
                break;
            }
        }

        self.shutdown();
        channel.shutdown();
        poller.abort();
        heartbeat.abort();
        tui.exit()?;
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if let Some(action) = self.config.keybindings.get(&[key]) {
            self.action_tx.send(action.clone())?;
            return Ok(());
        }
        self.key_buffer.push(key);
        if let Some(action) = self.config.keybindings.get(&self.key_buffer) {
            self.action_tx.send(action.clone())?;
            self.key_buffer.clear();
        }
        Ok(())
    }

    /// Single entry point for every state mutation.
    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Tick => self.now = Local::now(),
            Action::Quit => self.should_quit = true,
            Action::Suspend => self.should_suspend = true,
            Action::Resume => self.should_suspend = false,
            Action::Help => self.show_help = !self.show_help,
            Action::Error(message) => self.status_message = Some(message),
            Action::Refresh => {
                self.status_message = None;
                let _ = self.refresh_tx.send(());
            }
            Action::ToggleMute => {
                let muted = self.announcer.toggle_mute();
                self.status_message = Some(
                    if muted {
                        "Annonces coupées"
                    } else {
                        "Annonces activées"
                    }
                    .to_string(),
                );
            }
            Action::SnapshotLoaded(snapshot) => self.apply_snapshot(*snapshot),
            Action::SnapshotFailed(err) => {
                warn!("snapshot refresh failed: {err}");
                self.last_error = Some(err);
            }
            Action::PushTicket(ticket) => self.apply_pushed_ticket(*ticket),
            Action::ChannelConnected => {
                self.connection = ConnectionState {
                    connected: true,
                    reconnect_attempt: 0,
                    last_error: None,
                };
            }
            Action::ChannelDisconnected { attempt } => {
                self.connection.connected = false;
                self.connection.reconnect_attempt = attempt;
            }
            Action::ChannelGaveUp => {
                self.connection.connected = false;
                self.connection.last_error =
                    Some("reconnexion abandonnée, mode sondage seul".to_string());
            }
            // Terminal-bound actions are handled in the run loop.
            Action::Render | Action::Resize(_, _) | Action::ClearScreen => {}
        }
    }

    /// A fresh snapshot is authoritative: it replaces the previous one
    /// wholesale and clears any fetch error.
    fn apply_snapshot(&mut self, snapshot: DisplaySnapshot) {
        self.last_error = None;

        let period = snapshot.display.refresh_interval();
        if *self.interval_tx.borrow() != period {
            info!("refresh interval is now {period:?}");
            let _ = self.interval_tx.send(period);
        }

        if self.primed {
            if let Some(ticket) = self.tracker.next_announcement(snapshot.window()) {
                self.announcer.announce(ticket);
            }
        } else {
            // First snapshot after mount: absorb whatever is already on
            // screen without replaying announcements for it.
            self.tracker.diff(snapshot.window());
            self.primed = true;
        }

        self.snapshot = Some(snapshot);
    }

    /// Optimistic path for a single pushed ticket, ahead of the next poll.
    fn apply_pushed_ticket(&mut self, ticket: CalledTicket) {
        if let Some(announced) = self.tracker.next_announcement(std::slice::from_ref(&ticket)) {
            self.announcer.announce(announced);
        }
        if let Some(snapshot) = &mut self.snapshot {
            snapshot.merge_pushed_ticket(ticket);
        }
    }

    fn render(&self, tui: &mut Tui) -> Result<()> {
        tui.draw(|frame| ui::draw(frame, self))?;
        Ok(())
    }

    /// Idempotent: cancels every producer and silences any utterance.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        self.announcer.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::announce::SpeechEngine;
    use crate::fixtures;

    #[derive(Default)]
    struct RecordingSpeech {
        spoken: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SpeechEngine for RecordingSpeech {
        async fn speak(&self, text: &str) -> anyhow::Result<()> {
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn cancel(&self) {}
    }

    fn test_app() -> (App, Arc<RecordingSpeech>) {
        let engine = Arc::new(RecordingSpeech::default());
        let mut app = App::new(
            1.0,
            4.0,
            "http://127.0.0.1:9",
            "demo",
            "lobby",
            Config::default(),
        )
        .unwrap();
        app.announcer = Announcer::new(engine.clone());
        (app, engine)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(700)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn a_failed_fetch_keeps_the_last_good_snapshot() {
        let (mut app, _engine) = test_app();

        let snapshot = fixtures::snapshot(vec![fixtures::ticket(1, "A001")]);
        app.handle_action(Action::SnapshotLoaded(Box::new(snapshot.clone())));
        app.handle_action(Action::SnapshotFailed(FetchError::NetworkError(
            "down".to_string(),
        )));

        assert_eq!(app.snapshot, Some(snapshot));
        assert_eq!(
            app.last_error,
            Some(FetchError::NetworkError("down".to_string()))
        );

        // The next good snapshot clears the error.
        app.handle_action(Action::SnapshotLoaded(Box::new(fixtures::snapshot(vec![]))));
        assert_eq!(app.last_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshots_announce_new_heads_exactly_once() {
        let (mut app, engine) = test_app();

        // Mount: what is already on screen is not replayed.
        app.handle_action(Action::SnapshotLoaded(Box::new(fixtures::snapshot(vec![
            fixtures::ticket(1, "A001"),
        ]))));
        settle().await;
        assert!(engine.spoken.lock().unwrap().is_empty());

        app.handle_action(Action::SnapshotLoaded(Box::new(fixtures::snapshot(vec![
            fixtures::ticket(2, "A002"),
            fixtures::ticket(1, "A001"),
        ]))));
        settle().await;

        app.handle_action(Action::SnapshotLoaded(Box::new(fixtures::snapshot(vec![
            fixtures::ticket(3, "A003"),
            fixtures::ticket(2, "A002"),
            fixtures::ticket(1, "A001"),
        ]))));
        settle().await;

        assert_eq!(
            engine.spoken.lock().unwrap().clone(),
            vec![
                "Ticket A 0 0 2, guichet 2".to_string(),
                "Ticket A 0 0 3, guichet 2".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn a_pushed_ticket_is_not_reannounced_by_the_next_poll() {
        let (mut app, engine) = test_app();

        app.handle_action(Action::SnapshotLoaded(Box::new(fixtures::snapshot(vec![
            fixtures::ticket(1, "A001"),
        ]))));
        settle().await;

        app.handle_action(Action::PushTicket(Box::new(fixtures::ticket(2, "A002"))));
        settle().await;

        // The board merged the pushed ticket optimistically.
        let numbers: Vec<_> = app
            .snapshot
            .as_ref()
            .unwrap()
            .tickets
            .iter()
            .map(|t| t.display_number.clone())
            .collect();
        assert_eq!(numbers, vec!["A002", "A001"]);

        // The poll catches up and reports the same ticket; even a stale
        // poll that predates the push changes nothing.
        app.handle_action(Action::SnapshotLoaded(Box::new(fixtures::snapshot(vec![
            fixtures::ticket(2, "A002"),
            fixtures::ticket(1, "A001"),
        ]))));
        app.handle_action(Action::SnapshotLoaded(Box::new(fixtures::snapshot(vec![
            fixtures::ticket(1, "A001"),
        ]))));
        settle().await;

        assert_eq!(
            engine.spoken.lock().unwrap().clone(),
            vec!["Ticket A 0 0 2, guichet 2".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn interval_changes_propagate_to_the_poller() {
        let (mut app, _engine) = test_app();
        let interval_rx = app.interval_tx.subscribe();

        let mut snapshot = fixtures::snapshot(vec![]);
        snapshot.display.auto_refresh_seconds = 5;
        app.handle_action(Action::SnapshotLoaded(Box::new(snapshot)));

        assert_eq!(*interval_rx.borrow(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn channel_actions_drive_the_connection_state() {
        let (mut app, _engine) = test_app();

        app.handle_action(Action::ChannelConnected);
        assert!(app.connection.connected);

        app.handle_action(Action::ChannelDisconnected { attempt: 4 });
        assert!(!app.connection.connected);
        assert_eq!(app.connection.reconnect_attempt, 4);

        app.handle_action(Action::ChannelGaveUp);
        assert!(app.connection.last_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_is_idempotent() {
        let (mut app, _engine) = test_app();
        app.shutdown();
        app.shutdown();
    }
}
