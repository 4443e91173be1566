use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::models::CalledTicket;

/// How long an announcement waits before speaking, so the board update is
/// already visible when the voice starts.
pub const SPEAK_DELAY: Duration = Duration::from_millis(500);

/// TTS binaries probed on PATH, in order of preference.
const SPEECH_PROGRAMS: [&str; 3] = ["espeak-ng", "espeak", "say"];

/// Text spoken for a called ticket: the last four characters of the display
/// number spelled out one by one, then the counter to walk to.
pub fn spoken_text(ticket: &CalledTicket) -> String {
    let tail: Vec<char> = ticket.display_number.chars().rev().take(4).collect();
    let spelled = tail
        .iter()
        .rev()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    match ticket.counter_number {
        Some(counter) => format!("Ticket {spelled}, guichet {counter}"),
        None => format!("Ticket {spelled}, veuillez vous présenter"),
    }
}

/// Seam over the platform speech capability. `speak` starts an utterance
/// and returns once it is underway; starting a new one must silence the
/// previous one.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn speak(&self, text: &str) -> anyhow::Result<()>;
    async fn cancel(&self);
}

/// Speaks through a system TTS binary, one child process per utterance.
/// Replacing or cancelling an utterance kills the child.
pub struct CommandSpeech {
    program: PathBuf,
    current: Mutex<Option<Child>>,
}

impl CommandSpeech {
    /// Probes PATH for a usable TTS binary.
    pub fn detect() -> Option<Self> {
        SPEECH_PROGRAMS.into_iter().find_map(|name| {
            find_in_path(name).map(|program| Self {
                program,
                current: Mutex::new(None),
            })
        })
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[async_trait]
impl SpeechEngine for CommandSpeech {
    async fn speak(&self, text: &str) -> anyhow::Result<()> {
        let mut current = self.current.lock().await;
        if let Some(mut child) = current.take() {
            let _ = child.start_kill();
        }
        let child = Command::new(&self.program)
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        *current = Some(child);
        Ok(())
    }

    async fn cancel(&self) {
        if let Some(mut child) = self.current.lock().await.take() {
            let _ = child.start_kill();
        }
    }
}

/// Used when no TTS binary exists: announcements degrade to visual only.
pub struct NullSpeech;

#[async_trait]
impl SpeechEngine for NullSpeech {
    async fn speak(&self, _text: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn cancel(&self) {}
}

/// Serializes announcements: at most one utterance is ever active, a new
/// ticket cancels the in-flight one, and speech starts [`SPEAK_DELAY`]
/// after the visual update.
pub struct Announcer {
    engine: Arc<dyn SpeechEngine>,
    pending: Option<(CancellationToken, JoinHandle<()>)>,
    muted: bool,
}

impl Announcer {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            pending: None,
            muted: false,
        }
    }

    /// Picks the platform TTS binary, or the silent engine when none exists.
    pub fn from_environment() -> Self {
        match CommandSpeech::detect() {
            Some(engine) => Self::new(Arc::new(engine)),
            None => {
                warn!("no speech binary found on PATH; announcements will be visual only");
                Self::new(Arc::new(NullSpeech))
            }
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        if self.muted {
            self.stop();
        }
        self.muted
    }

    /// Queues `ticket` as the one announcement in flight, replacing
    /// whatever was pending or speaking.
    pub fn announce(&mut self, ticket: &CalledTicket) {
        self.stop();
        if self.muted {
            return;
        }
        let text = spoken_text(ticket);
        let engine = Arc::clone(&self.engine);
        let cancel = CancellationToken::new();
        let guard = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = guard.cancelled() => {}
                _ = tokio::time::sleep(SPEAK_DELAY) => {
                    if let Err(err) = engine.speak(&text).await {
                        warn!("speech failed: {err}");
                    }
                }
            }
        });
        self.pending = Some((cancel, handle));
    }

    /// Cancels the pending delay and whatever is currently being spoken.
    /// Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some((cancel, handle)) = self.pending.take() {
            cancel.cancel();
            handle.abort();
        }
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move { engine.cancel().await });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fixtures;

    #[derive(Default)]
    struct RecordingSpeech {
        events: StdMutex<Vec<String>>,
    }

    impl RecordingSpeech {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SpeechEngine for RecordingSpeech {
        async fn speak(&self, text: &str) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(format!("speak:{text}"));
            Ok(())
        }

        async fn cancel(&self) {
            self.events.lock().unwrap().push("cancel".to_string());
        }
    }

    #[test]
    fn spells_out_the_last_four_characters() {
        let ticket = fixtures::ticket(1, "A0421");
        assert_eq!(spoken_text(&ticket), "Ticket 0 4 2 1, guichet 2");
    }

    #[test]
    fn short_numbers_are_spelled_in_full() {
        let mut ticket = fixtures::ticket(1, "B7");
        ticket.counter_number = None;
        assert_eq!(spoken_text(&ticket), "Ticket B 7, veuillez vous présenter");
    }

    #[tokio::test(start_paused = true)]
    async fn a_new_ticket_cancels_the_pending_utterance() {
        let engine = Arc::new(RecordingSpeech::default());
        let mut announcer = Announcer::new(engine.clone());

        announcer.announce(&fixtures::ticket(1, "A001"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        // B arrives while A is still inside its lead delay: A never speaks.
        announcer.announce(&fixtures::ticket(2, "A002"));
        tokio::time::sleep(Duration::from_millis(700)).await;

        let speaks: Vec<_> = engine
            .events()
            .into_iter()
            .filter(|e| e.starts_with("speak:"))
            .collect();
        assert_eq!(speaks, vec!["speak:Ticket A 0 0 2, guichet 2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn an_active_utterance_is_cancelled_before_the_next_one() {
        let engine = Arc::new(RecordingSpeech::default());
        let mut announcer = Announcer::new(engine.clone());

        announcer.announce(&fixtures::ticket(1, "A001"));
        tokio::time::sleep(Duration::from_millis(700)).await;
        announcer.announce(&fixtures::ticket(2, "A002"));
        tokio::time::sleep(Duration::from_millis(700)).await;

        let events = engine.events();
        let first_speak = events
            .iter()
            .position(|e| e == "speak:Ticket A 0 0 1, guichet 2")
            .expect("first utterance missing");
        let second_speak = events
            .iter()
            .position(|e| e == "speak:Ticket A 0 0 2, guichet 2")
            .expect("second utterance missing");
        let cancel_between = events
            .iter()
            .enumerate()
            .any(|(i, e)| e == "cancel" && i > first_speak && i < second_speak);
        assert!(cancel_between, "expected a cancel between the two utterances: {events:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn muting_silences_and_unmuting_restores() {
        let engine = Arc::new(RecordingSpeech::default());
        let mut announcer = Announcer::new(engine.clone());

        assert!(announcer.toggle_mute());
        announcer.announce(&fixtures::ticket(1, "A001"));
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(engine.events().iter().all(|e| e == "cancel"));

        assert!(!announcer.toggle_mute());
        announcer.announce(&fixtures::ticket(2, "A002"));
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(engine.events().iter().any(|e| e.starts_with("speak:")));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let engine = Arc::new(RecordingSpeech::default());
        let mut announcer = Announcer::new(engine);

        announcer.announce(&fixtures::ticket(1, "A001"));
        announcer.stop();
        announcer.stop();
    }
}
