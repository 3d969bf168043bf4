//! Game document store.
//!
//! Games are addressed by id. Readers either fetch a snapshot or subscribe to
//! a watch channel that always holds the latest full document (`None` once the
//! game is deleted). Writers submit a batch of [`GameUpdate`]s which is applied
//! atomically: every step lands or none does.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use squares::update::apply_updates;
use squares::{GameDoc, GameUpdate};

// =============================================================================
// STORE TRAIT
// =============================================================================

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, game_id: &str) -> Result<Option<GameDoc>>;

    /// Insert a new game. Fails if the id is taken.
    async fn create(&self, doc: GameDoc) -> Result<()>;

    /// Latest snapshot for `game_id`, pushed on every change. Subscribing to a
    /// game that does not exist yet yields `None` until it is created.
    fn subscribe(&self, game_id: &str) -> watch::Receiver<Option<GameDoc>>;

    /// Apply `updates` atomically and return the resulting document.
    async fn update(&self, game_id: &str, updates: Vec<GameUpdate>) -> Result<GameDoc>;

    /// Remove a game. Returns false if it did not exist.
    async fn delete(&self, game_id: &str) -> Result<bool>;

    /// Every game hosted by `host_uid`, oldest first.
    async fn query_by_host(&self, host_uid: &str) -> Result<Vec<GameDoc>>;
}

// =============================================================================
// LOCAL STORE
// =============================================================================

#[derive(Default)]
struct StoreState {
    games: HashMap<String, GameDoc>,
    watchers: HashMap<String, watch::Sender<Option<GameDoc>>>,
}

impl StoreState {
    /// No-op until someone subscribes to `game_id`.
    fn publish(&self, game_id: &str, doc: Option<GameDoc>) {
        if let Some(tx) = self.watchers.get(game_id) {
            tx.send_replace(doc);
        }
    }
}

/// In-process store, optionally mirrored to a JSON file after every write.
pub struct LocalStore {
    state: RwLock<StoreState>,
    path: Option<PathBuf>,
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl LocalStore {
    /// Store with no backing file.
    pub fn in_memory() -> Self {
        Self { state: RwLock::new(StoreState::default()), path: None }
    }

    /// Load games from `path` if it exists and persist to it from now on.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let games: HashMap<String, GameDoc> = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse game store {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("[STORE] No store at {}, starting fresh", path.display());
                HashMap::new()
            }
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        info!("[STORE] Loaded {} games from {}", games.len(), path.display());

        let state = StoreState { games, watchers: HashMap::new() };
        Ok(Self { state: RwLock::new(state), path: Some(path) })
    }

    pub fn len(&self) -> usize {
        self.state.read().games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write all games to the backing file. Called with the state lock held so
    /// file contents follow write order.
    fn persist(&self, games: &HashMap<String, GameDoc>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(games)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn get(&self, game_id: &str) -> Result<Option<GameDoc>> {
        Ok(self.state.read().games.get(game_id).cloned())
    }

    async fn create(&self, doc: GameDoc) -> Result<()> {
        let mut state = self.state.write();
        if state.games.contains_key(&doc.id) {
            return Err(anyhow!("game {} already exists", doc.id));
        }
        let id = doc.id.clone();
        state.games.insert(id.clone(), doc.clone());
        if let Err(e) = self.persist(&state.games) {
            state.games.remove(&id);
            return Err(e);
        }
        state.publish(&id, Some(doc));
        debug!("[STORE] Created game {}", id);
        Ok(())
    }

    fn subscribe(&self, game_id: &str) -> watch::Receiver<Option<GameDoc>> {
        let mut state = self.state.write();
        if let Some(tx) = state.watchers.get(game_id) {
            return tx.subscribe();
        }
        let (tx, rx) = watch::channel(state.games.get(game_id).cloned());
        state.watchers.insert(game_id.to_string(), tx);
        rx
    }

    async fn update(&self, game_id: &str, updates: Vec<GameUpdate>) -> Result<GameDoc> {
        let mut state = self.state.write();
        let current = state
            .games
            .get(game_id)
            .ok_or_else(|| anyhow!("game {} not found", game_id))?;

        let next = match apply_updates(current, &updates) {
            Ok(Some(next)) => next,
            Ok(None) => return Ok(current.clone()),
            Err(e) => {
                let ops: Vec<&str> = updates.iter().map(GameUpdate::name).collect();
                return Err(anyhow!(e).context(format!("update {:?} on game {} rejected", ops, game_id)));
            }
        };

        let previous = state.games.insert(game_id.to_string(), next.clone());
        if let Err(e) = self.persist(&state.games) {
            if let Some(prev) = previous {
                state.games.insert(game_id.to_string(), prev);
            }
            error!("[STORE] Persist failed for game {}: {}", game_id, e);
            return Err(e);
        }
        state.publish(game_id, Some(next.clone()));
        Ok(next)
    }

    async fn delete(&self, game_id: &str) -> Result<bool> {
        let mut state = self.state.write();
        let Some(removed) = state.games.remove(game_id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&state.games) {
            state.games.insert(game_id.to_string(), removed);
            return Err(e);
        }
        // Subscribers see the final `None`, then a closed channel
        if let Some(tx) = state.watchers.remove(game_id) {
            tx.send_replace(None);
        }
        info!("[STORE] Deleted game {}", game_id);
        Ok(true)
    }

    async fn query_by_host(&self, host_uid: &str) -> Result<Vec<GameDoc>> {
        let mut games: Vec<GameDoc> = self
            .state
            .read()
            .games
            .values()
            .filter(|g| g.host_uid == host_uid)
            .cloned()
            .collect();
        games.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(games)
    }
}

// =============================================================================
// MOCK STORE (FOR TESTING)
// =============================================================================

/// Store wrappers for exercising write-failure paths.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// A [`LocalStore`] whose `update` can be switched to fail. Counts every
    /// `update` call, failed or not.
    pub struct FlakyStore {
        inner: LocalStore,
        failing: AtomicBool,
        update_calls: AtomicUsize,
    }

    impl Default for FlakyStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FlakyStore {
        pub fn new() -> Self {
            Self {
                inner: LocalStore::in_memory(),
                failing: AtomicBool::new(false),
                update_calls: AtomicUsize::new(0),
            }
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn update_calls(&self) -> usize {
            self.update_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn get(&self, game_id: &str) -> Result<Option<GameDoc>> {
            self.inner.get(game_id).await
        }

        async fn create(&self, doc: GameDoc) -> Result<()> {
            self.inner.create(doc).await
        }

        fn subscribe(&self, game_id: &str) -> watch::Receiver<Option<GameDoc>> {
            self.inner.subscribe(game_id)
        }

        async fn update(&self, game_id: &str, updates: Vec<GameUpdate>) -> Result<GameDoc> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                warn!("[STORE] Injected write failure for game {}", game_id);
                return Err(anyhow!("store unavailable"));
            }
            self.inner.update(game_id, updates).await
        }

        async fn delete(&self, game_id: &str) -> Result<bool> {
            self.inner.delete(game_id).await
        }

        async fn query_by_host(&self, host_uid: &str) -> Result<Vec<GameDoc>> {
            self.inner.query_by_host(host_uid).await
        }
    }
}
