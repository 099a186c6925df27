//! services/api/src/web/state.rs
//!
//! Defines the application's shared state: the single active store and the
//! channels that fan its changes out to subscribers and the persistence task.

use crate::config::Config;
use chrono::Utc;
use hearth_core::ports::{PortResult, RemoteHouseSource, SnapshotStore};
use hearth_core::{reduce, Action, Env, Store};
use rand::rngs::StdRng;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::debug;

/// How many unread state changes a slow WebSocket client may fall behind by.
const CHANGE_BUFFER: usize = 64;

//=========================================================================================
// Engine (the store plus the randomness it draws on)
//=========================================================================================

struct Engine {
    store: Arc<Store>,
    rng: StdRng,
}

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub remote: Option<Arc<dyn RemoteHouseSource>>,
    engine: Mutex<Engine>,
    changes: broadcast::Sender<Arc<Store>>,
    latest: watch::Sender<Arc<Store>>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Store,
        rng: StdRng,
        snapshots: Arc<dyn SnapshotStore>,
        remote: Option<Arc<dyn RemoteHouseSource>>,
    ) -> Self {
        let store = Arc::new(store);
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        let (latest, _) = watch::channel(store.clone());
        Self {
            config,
            snapshots,
            remote,
            engine: Mutex::new(Engine { store, rng }),
            changes,
            latest,
        }
    }

    /// Applies one action and publishes the result if anything changed.
    ///
    /// The lock is held while publishing so subscribers see changes in the
    /// order they were applied.
    pub async fn dispatch(&self, action: Action) -> Arc<Store> {
        let kind = action.kind();
        let mut engine = self.engine.lock().await;
        let Engine { store, rng } = &mut *engine;

        let mut env = Env::new(Utc::now(), rng);
        let next = reduce(store.as_ref(), action, &mut env);
        if next == **store {
            debug!(action = kind, "action left the store unchanged");
            return store.clone();
        }

        let next = Arc::new(next);
        *store = next.clone();
        // No receivers just means no client is connected.
        let _ = self.changes.send(next.clone());
        if store.snapshot() != self.latest.borrow().snapshot() {
            self.latest.send_replace(next.clone());
        }
        next
    }

    pub async fn current(&self) -> Arc<Store> {
        self.engine.lock().await.store.clone()
    }

    /// Every store change, for live clients.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Store>> {
        self.changes.subscribe()
    }

    /// The latest persistable state; toast-only changes are skipped.
    pub fn watch_persistable(&self) -> watch::Receiver<Arc<Store>> {
        self.latest.subscribe()
    }

    /// Writes the current store immediately.
    pub async fn flush(&self) -> PortResult<()> {
        let store = self.current().await;
        self.snapshots.save(&store.snapshot()).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::adapters::FileSnapshotStore;
    use crate::config::Config;
    use rand::SeedableRng;
    use serde_json::json;
    use std::time::Duration;

    pub(crate) fn test_config(dir: &std::path::Path) -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            log_level: tracing::Level::INFO,
            snapshot_path: dir.join("store.json"),
            persist_debounce: Duration::from_millis(20),
            dnd_sweep_every: Duration::from_secs(60),
            remote: None,
            seed_demo: false,
            cors_origin: "http://localhost:5173".into(),
        }
    }

    pub(crate) fn test_state(dir: &std::path::Path) -> Arc<AppState> {
        let config = test_config(dir);
        let snapshots = Arc::new(FileSnapshotStore::new(config.snapshot_path.clone()));
        Arc::new(AppState::new(
            Arc::new(config),
            Store::default(),
            StdRng::seed_from_u64(11),
            snapshots,
            None,
        ))
    }

    fn action(value: serde_json::Value) -> Action {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn dispatch_publishes_changes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let mut changes = state.subscribe();

        state
            .dispatch(action(json!({ "type": "SIGNUP",
                "payload": { "name": "Ada", "email": "ada@x.com" } })))
            .await;
        state
            .dispatch(action(json!({ "type": "SET_THEME", "payload": { "theme": "dark" } })))
            .await;

        let first = changes.recv().await.unwrap();
        assert_eq!(first.db.users.len(), 1);
        let second = changes.recv().await.unwrap();
        assert_eq!(second.theme, hearth_core::domain::Theme::Dark);
        assert_eq!(state.current().await, second);
    }

    #[tokio::test]
    async fn unchanged_stores_are_not_republished() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let mut changes = state.subscribe();
        let mut persistable = state.watch_persistable();

        state.dispatch(action(json!({ "type": "CHECK_DND_EXPIRY" }))).await;
        assert!(changes.try_recv().is_err());

        // A rejection only sets the toast: live clients hear it, disk does not.
        state
            .dispatch(action(json!({ "type": "LOGIN", "payload": { "email": "who@x.com" } })))
            .await;
        assert!(changes.try_recv().unwrap().toast.is_some());
        assert!(!persistable.has_changed().unwrap());
    }
}
