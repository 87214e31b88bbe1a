//! In-memory chat sessions.
//!
//! One [`Session`] per browser tab: the ordered turns, the sidebar settings
//! and the attached document. Nothing here is persisted; sessions vanish
//! with the process, or earlier once [`spawn_sweeper`] finds them idle.
//!
//! # Submission
//!
//! A session is either [`Phase::Idle`] or [`Phase::AwaitingResponse`].
//! [`SessionStore::submit`] moves it to `AwaitingResponse`, releases the
//! lock while the document is extracted and the model answers, then appends
//! exactly one [`Turn`] and returns to `Idle`. A second submission for the
//! same session while the first is in flight is refused with
//! [`SessionError::Busy`].

pub mod settings;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chat::{Assistant, thinking};
use crate::documents::UploadedDocument;
use settings::{Settings, SettingsError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(Uuid),
    #[error("message is empty")]
    EmptyMessage,
    #[error("a reply is still being generated for this session")]
    Busy,
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// One question and its answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub user: String,
    pub bot: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AwaitingResponse,
}

/// Name and type of the attached document, without its bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentInfo {
    pub name: String,
    pub media_type: String,
    pub size: usize,
}

/// What the page needs to draw a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub settings: Settings,
    pub phase: Phase,
    /// Turns with bot text filtered through the current thinking toggle.
    pub turns: Vec<Turn>,
    pub document: Option<DocumentInfo>,
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    turns: Vec<Turn>,
    settings: Settings,
    document: Option<UploadedDocument>,
    phase: Phase,
    last_active: Instant,
}

/// Snapshot taken when a submission starts; the session lock is not held
/// while it is being answered.
#[derive(Debug)]
struct Pending {
    question: String,
    settings: Settings,
    document: Option<UploadedDocument>,
}

impl Session {
    pub fn new(id: Uuid, settings: Settings) -> Self {
        Self {
            id,
            turns: Vec::new(),
            settings,
            document: None,
            phase: Phase::Idle,
            last_active: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn document(&self) -> Option<&UploadedDocument> {
        self.document.as_ref()
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    /// Attach `doc`, replacing any previous document.
    pub fn attach_document(&mut self, doc: UploadedDocument) {
        self.document = Some(doc);
    }

    pub fn detach_document(&mut self) -> Option<UploadedDocument> {
        self.document.take()
    }

    pub fn clear_turns(&mut self) {
        self.turns.clear();
    }

    /// Mark the session as used now.
    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    /// Unused for at least `max_idle` and not waiting on a reply.
    fn is_idle_for(&self, max_idle: Duration, now: Instant) -> bool {
        self.phase == Phase::Idle && now.duration_since(self.last_active) >= max_idle
    }

    fn begin_submission(&mut self, text: &str) -> Result<Pending, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        if self.phase == Phase::AwaitingResponse {
            return Err(SessionError::Busy);
        }
        self.phase = Phase::AwaitingResponse;
        Ok(Pending {
            question: text.to_string(),
            settings: self.settings,
            document: self.document.clone(),
        })
    }

    fn finish_submission(&mut self, user: String, bot: String) -> Turn {
        let turn = Turn { user, bot, timestamp: Utc::now() };
        self.turns.push(turn.clone());
        self.phase = Phase::Idle;
        self.touch();
        turn
    }

    pub fn view(&self) -> SessionView {
        let show_thinking = self.settings.show_thinking;
        SessionView {
            session_id: self.id,
            settings: self.settings,
            phase: self.phase,
            turns: self
                .turns
                .iter()
                .map(|t| Turn {
                    bot: thinking::visible(&t.bot, show_thinking).to_string(),
                    ..t.clone()
                })
                .collect(),
            document: self.document.as_ref().map(|d| DocumentInfo {
                name: d.name.clone(),
                media_type: d.media_type.clone(),
                size: d.bytes.len(),
            }),
        }
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

/// Lock a session, recovering the data if a previous holder panicked.
pub fn lock(session: &SharedSession) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// All live sessions, keyed by id.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
    defaults: Settings,
}

impl SessionStore {
    pub fn new(defaults: Settings) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), defaults }
    }

    /// Start a session with the configured default settings.
    pub fn create(&self) -> SessionView {
        let id = Uuid::new_v4();
        let session = Session::new(id, self.defaults);
        let view = session.view();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(Mutex::new(session)));
        info!(session_id = %id, "session created");
        view
    }

    /// Look up a session. Every lookup counts as activity.
    pub fn get(&self, id: Uuid) -> Result<SharedSession, SessionError> {
        let session = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))?;
        lock(&session).touch();
        Ok(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against the session under its lock.
    pub fn with<T>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> T) -> Result<T, SessionError> {
        let session = self.get(id)?;
        let mut guard = lock(&session);
        Ok(f(&mut guard))
    }

    pub fn update_settings(
        &self,
        id: Uuid,
        temperature: f32,
        max_tokens: u32,
        show_thinking: bool,
    ) -> Result<Settings, SessionError> {
        let settings = Settings::new(temperature, max_tokens, show_thinking)?;
        self.with(id, |s| s.set_settings(settings))?;
        debug!(session_id = %id, ?settings, "settings updated");
        Ok(settings)
    }

    /// Drop sessions unused for at least `max_idle`. Sessions awaiting a
    /// reply, or locked by a request right now, are kept. Returns how many
    /// were dropped.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|id, session| {
            let idle = match session.try_lock() {
                Ok(s) => s.is_idle_for(max_idle, now),
                Err(TryLockError::Poisoned(p)) => p.into_inner().is_idle_for(max_idle, now),
                Err(TryLockError::WouldBlock) => false,
            };
            if idle {
                debug!(session_id = %id, "idle session evicted");
            }
            !idle
        });
        before - sessions.len()
    }

    pub fn clear(&self, id: Uuid) -> Result<(), SessionError> {
        self.with(id, Session::clear_turns)?;
        info!(session_id = %id, "history cleared");
        Ok(())
    }

    /// Answer `text` in session `id` and append the resulting turn.
    ///
    /// The attached document, if any, is extracted afresh on a blocking
    /// thread and used as context. Inference problems end up in the turn's
    /// bot text; only session-level problems are errors.
    pub async fn submit(&self, id: Uuid, text: &str, assistant: &Assistant) -> Result<Turn, SessionError> {
        let session = self.get(id)?;
        let pending = lock(&session).begin_submission(text)?;

        let context = match pending.document {
            Some(doc) => {
                debug!(session_id = %id, document = %doc.name, "extracting context");
                tokio::task::spawn_blocking(move || doc.extract_text())
                    .await
                    .unwrap_or_else(|e| {
                        warn!(session_id = %id, error = %e, "extraction task failed");
                        format!("Error extracting text: {e}")
                    })
            }
            None => String::new(),
        };

        let bot = assistant.answer(&pending.question, &context, &pending.settings).await;
        let turn = lock(&session).finish_submission(pending.question, bot);
        info!(session_id = %id, reply_len = turn.bot.len(), "turn appended");
        Ok(turn)
    }
}

// ── Idle sweeper ──────────────────────────────────────────────────────────────

/// Every `every`, drop sessions idle for `max_idle`, until `shutdown` is
/// cancelled.
pub fn spawn_sweeper(
    store: Arc<SessionStore>,
    max_idle: Duration,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    // `interval` panics on a zero period.
    let every = every.max(Duration::from_millis(1));
    tokio::spawn(async move {
        info!(idle_secs = max_idle.as_secs(), every_secs = every.as_secs(), "session sweeper started");

        let mut interval = tokio::time::interval(every);
        interval.tick().await; // skip the first immediate tick

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("session sweeper stopping");
                    break;
                }

                _ = interval.tick() => {
                    let evicted = store.evict_idle(max_idle);
                    if evicted > 0 {
                        info!(evicted, remaining = store.len(), "idle sessions evicted");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmProvider;
    use crate::llm::providers::dummy::DummyProvider;

    fn assistant() -> Assistant {
        Assistant::new(LlmProvider::Dummy(DummyProvider))
    }

    fn store_with_session() -> (SessionStore, Uuid) {
        let store = SessionStore::new(Settings::default());
        let id = store.create().session_id;
        (store, id)
    }

    fn turn_count(store: &SessionStore, id: Uuid) -> usize {
        store.with(id, |s| s.turns().len()).unwrap()
    }

    #[tokio::test]
    async fn submit_appends_exactly_one_turn() {
        let (store, id) = store_with_session();
        let turn = store.submit(id, "What is 2+2?", &assistant()).await.unwrap();
        assert_eq!(turn.user, "What is 2+2?");
        assert!(turn.bot.contains("Question: What is 2+2?"));
        assert_eq!(turn_count(&store, id), 1);
        assert_eq!(store.with(id, |s| s.phase()).unwrap(), Phase::Idle);
    }

    #[tokio::test]
    async fn blank_submissions_append_nothing() {
        let (store, id) = store_with_session();
        for text in ["", "   ", "\n\t "] {
            let err = store.submit(id, text, &assistant()).await.unwrap_err();
            assert!(matches!(err, SessionError::EmptyMessage));
        }
        assert_eq!(turn_count(&store, id), 0);
    }

    #[tokio::test]
    async fn turns_keep_submission_order() {
        let (store, id) = store_with_session();
        let a = assistant();
        for q in ["first", "second", "third"] {
            store.submit(id, q, &a).await.unwrap();
        }
        let users: Vec<String> = store.with(id, |s| s.turns().iter().map(|t| t.user.clone()).collect()).unwrap();
        assert_eq!(users, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn attached_document_becomes_context() {
        let (store, id) = store_with_session();
        store
            .with(id, |s| {
                s.attach_document(UploadedDocument {
                    name: "notes.txt".into(),
                    media_type: "text/plain".into(),
                    bytes: b"The vault code is 7421.".to_vec(),
                })
            })
            .unwrap();

        let turn = store.submit(id, "What is the code?", &assistant()).await.unwrap();
        assert!(turn.bot.contains("Context: The vault code is 7421."));
        assert!(turn.bot.contains("cannot be found in the context"));
    }

    #[test]
    fn busy_session_refuses_second_submission() {
        let mut session = Session::new(Uuid::new_v4(), Settings::default());
        let _pending = session.begin_submission("one").unwrap();
        assert!(matches!(session.begin_submission("two"), Err(SessionError::Busy)));
        session.finish_submission("one".into(), "reply".into());
        assert!(session.begin_submission("two").is_ok());
    }

    #[tokio::test]
    async fn clear_empties_history() {
        let (store, id) = store_with_session();
        store.submit(id, "hello", &assistant()).await.unwrap();
        store.clear(id).unwrap();
        assert_eq!(turn_count(&store, id), 0);
        // clearing an empty history is fine too
        store.clear(id).unwrap();
    }

    #[test]
    fn view_applies_current_thinking_toggle() {
        let mut session = Session::new(Uuid::new_v4(), Settings::default());
        session.begin_submission("q").unwrap();
        session.finish_submission("q".into(), "<think>hmm</think> 42".into());

        assert_eq!(session.view().turns[0].bot, "<think>hmm</think> 42");

        session.set_settings(Settings { show_thinking: false, ..Settings::default() });
        assert_eq!(session.view().turns[0].bot, "42");
        // stored text is untouched
        assert_eq!(session.turns()[0].bot, "<think>hmm</think> 42");
    }

    #[test]
    fn update_settings_validates_bounds() {
        let (store, id) = store_with_session();
        let err = store.update_settings(id, 1.5, 500, true).unwrap_err();
        assert!(matches!(err, SessionError::Settings(SettingsError::Temperature(_))));
        assert_eq!(store.with(id, |s| s.settings()).unwrap(), Settings::default());

        let s = store.update_settings(id, 0.2, 1500, false).unwrap();
        assert_eq!(s.max_tokens.get(), 1500);
        assert_eq!(store.with(id, |s| s.settings()).unwrap(), s);
    }

    #[test]
    fn unknown_session_is_not_found() {
        let store = SessionStore::new(Settings::default());
        let id = Uuid::new_v4();
        assert!(matches!(store.clear(id), Err(SessionError::NotFound(missing)) if missing == id));
        assert!(store.is_empty());
    }

    #[test]
    fn view_reports_document_without_bytes() {
        let mut session = Session::new(Uuid::new_v4(), Settings::default());
        session.attach_document(UploadedDocument {
            name: "data.csv".into(),
            media_type: "text/csv".into(),
            bytes: b"a,b\n1,2\n".to_vec(),
        });
        let info = session.view().document.unwrap();
        assert_eq!(info.name, "data.csv");
        assert_eq!(info.size, 8);
        assert!(session.detach_document().is_some());
        assert!(session.view().document.is_none());
    }

    const HOUR: Duration = Duration::from_secs(60 * 60);

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_evicted_and_fresh_ones_kept() {
        let (store, stale) = store_with_session();
        tokio::time::advance(Duration::from_secs(70 * 60)).await;
        let fresh = store.create().session_id;

        assert_eq!(store.evict_idle(HOUR), 1);
        assert!(matches!(store.get(stale), Err(SessionError::NotFound(_))));
        assert!(store.get(fresh).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn activity_resets_the_idle_clock() {
        let (store, id) = store_with_session();
        tokio::time::advance(Duration::from_secs(50 * 60)).await;
        store.with(id, |s| s.settings()).unwrap();

        tokio::time::advance(Duration::from_secs(20 * 60)).await;
        assert_eq!(store.evict_idle(HOUR), 0);

        tokio::time::advance(Duration::from_secs(45 * 60)).await;
        assert_eq!(store.evict_idle(HOUR), 1);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn session_awaiting_reply_is_kept() {
        let (store, id) = store_with_session();
        store.with(id, |s| s.begin_submission("slow one").map(|_| ())).unwrap().unwrap();
        tokio::time::advance(2 * HOUR).await;

        assert_eq!(store.evict_idle(HOUR), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_then_stops_on_shutdown() {
        let store = Arc::new(SessionStore::new(Settings::default()));
        store.create();
        let shutdown = CancellationToken::new();
        let sweeper = spawn_sweeper(store.clone(), Duration::from_secs(30 * 60), Duration::from_secs(60), shutdown.clone());

        tokio::time::sleep(Duration::from_secs(20 * 60)).await;
        assert_eq!(store.len(), 1);

        tokio::time::sleep(Duration::from_secs(12 * 60)).await;
        assert!(store.is_empty());

        shutdown.cancel();
        sweeper.await.unwrap();
    }
}
