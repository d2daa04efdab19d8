pub mod game;
pub mod lobby;
pub mod presence;
pub mod scoring;
mod sse;
pub mod state_machine;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{config::AppConfig, dao::lobby_store::LobbyStore, error::ServiceError};

pub use self::sse::{SessionHubs, SseHub};
use self::{presence::PresenceRegistry, state_machine::GameState};

pub type SharedState = Arc<AppState>;

/// A game whose phase timer is (or was) running.
pub struct RunningGame {
    state: RwLock<GameState>,
    cancel: CancellationToken,
}

impl RunningGame {
    /// Wrap a freshly built game; `cancel` stops its timer task.
    pub fn new(state: GameState, cancel: CancellationToken) -> Self {
        Self {
            state: RwLock::new(state),
            cancel,
        }
    }

    /// Lock guarding the engine state.
    pub fn state(&self) -> &RwLock<GameState> {
        &self.state
    }

    /// Token observed by the timer task.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Central application state: the injected store plus live games, watchers and streams.
pub struct AppState {
    config: Arc<AppConfig>,
    store: Arc<dyn LobbyStore>,
    hubs: SessionHubs,
    presence: PresenceRegistry,
    games: DashMap<Uuid, Arc<RunningGame>>,
    watchers: DashMap<Uuid, CancellationToken>,
    shutdown: CancellationToken,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, store: Arc<dyn LobbyStore>) -> SharedState {
        let hubs = SessionHubs::new(config.event_capacity);
        Arc::new(Self {
            config: Arc::new(config),
            store,
            hubs,
            presence: PresenceRegistry::new(),
            games: DashMap::new(),
            watchers: DashMap::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Source of truth for lobby rows.
    pub fn store(&self) -> Arc<dyn LobbyStore> {
        self.store.clone()
    }

    /// Broadcast hub of one session's event stream.
    pub fn session_hub(&self, session_id: Uuid) -> Arc<SseHub> {
        self.hubs.hub(session_id)
    }

    /// Hub of a session only if a subscriber already opened one.
    pub fn existing_session_hub(&self, session_id: Uuid) -> Option<Arc<SseHub>> {
        self.hubs.existing(session_id)
    }

    /// Forget a session's hub once nothing will publish to it again.
    pub fn drop_session_hub(&self, session_id: Uuid) {
        self.hubs.remove(session_id);
    }

    /// Registry of presence sockets.
    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Games keyed by session id.
    pub fn games(&self) -> &DashMap<Uuid, Arc<RunningGame>> {
        &self.games
    }

    /// Running game of a session or a not-found error.
    pub fn running_game(&self, session_id: Uuid) -> Result<Arc<RunningGame>, ServiceError> {
        self.games
            .get(&session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceError::NotFound(format!("no game for session `{session_id}`")))
    }

    /// Cancellation tokens of active lobby watchers keyed by session id.
    pub fn watchers(&self) -> &DashMap<Uuid, CancellationToken> {
        &self.watchers
    }

    /// Child token that fires when the server shuts down.
    pub fn child_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Cancel every background task (timers and watchers).
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
