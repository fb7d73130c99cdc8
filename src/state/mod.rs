pub mod generation;
pub mod match_state;
pub mod model;
pub mod serve_rotation;
pub mod session;
pub mod settings;
mod sse;

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};

use crate::{
    config::AppConfig,
    dao::tournament_store::TournamentStore,
    error::ServiceError,
    services::{announcer::Announcer, input_dispatcher::InputDispatcher, sse_events},
};

pub use self::session::ScoringSession;
pub use self::settings::Settings;
pub use self::sse::SseHub;

/// Shared handle passed to every handler and background task.
pub type SharedState = Arc<AppState>;

/// Capacity of the public SSE broadcast channel.
const PUBLIC_SSE_CAPACITY: usize = 64;

/// Central application state: storage handle, scoring session and broadcast hub.
pub struct AppState {
    store: RwLock<Option<Arc<dyn TournamentStore>>>,
    sse: SseHub,
    session: RwLock<Option<ScoringSession>>,
    settings: RwLock<Settings>,
    dispatcher: InputDispatcher,
    announcer: Announcer,
    degraded: watch::Sender<bool>,
    write_tickets: AtomicU64,
    match_writes: DashMap<model::MatchId, Arc<Mutex<u64>>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            sse: SseHub::new(PUBLIC_SSE_CAPACITY),
            session: RwLock::new(None),
            settings: RwLock::new(config.default_settings().clone()),
            dispatcher: InputDispatcher::new(config.voice().clone()),
            announcer: Announcer::new(config.phrases().clone()),
            degraded: degraded_tx,
            write_tickets: AtomicU64::new(0),
            match_writes: DashMap::new(),
        })
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn TournamentStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] when none is usable.
    pub async fn require_store(&self) -> Result<Arc<dyn TournamentStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn set_store(&self, store: Arc<dyn TournamentStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        let previous = self.degraded.send_replace(value);
        if previous != value {
            sse_events::broadcast_system_status(self, value);
        }
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.sse
    }

    /// Scoring session holding the open tournament.
    pub fn session(&self) -> &RwLock<Option<ScoringSession>> {
        &self.session
    }

    /// Live UI preferences.
    pub fn settings(&self) -> &RwLock<Settings> {
        &self.settings
    }

    /// Copy of the current preferences.
    pub async fn settings_snapshot(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Input translator configured with the voice vocabulary.
    pub fn dispatcher(&self) -> &InputDispatcher {
        &self.dispatcher
    }

    /// Announcement builder configured with the phrase lists.
    pub fn announcer(&self) -> &Announcer {
        &self.announcer
    }

    /// Next match write ticket. Must be taken while the session lock is held
    /// so that ticket order follows mutation order.
    pub fn next_write_ticket(&self) -> u64 {
        self.write_tickets.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Per-match lock guarding the ticket of the last snapshot saved to the store.
    pub fn match_write_slot(&self, match_id: model::MatchId) -> Arc<Mutex<u64>> {
        self.match_writes.entry(match_id).or_default().clone()
    }
}
