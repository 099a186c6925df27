//! services/api/src/web/tasks.rs
//!
//! Background tasks that keep the store moving without a client: debounced
//! persistence, the DND expiry sweep and the remote household refresh. Each
//! one runs until the shared cancellation token fires.

use crate::web::state::AppState;
use hearth_core::Action;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Writes the store once it has been quiet for the configured debounce period.
pub async fn persist_snapshots(app_state: Arc<AppState>, token: CancellationToken) {
    let mut latest = app_state.watch_persistable();
    let quiet = app_state.config.persist_debounce;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            changed = latest.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        // Every further change restarts the quiet period.
        loop {
            tokio::select! {
                _ = sleep(quiet) => break,
                _ = token.cancelled() => break,
                changed = latest.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        let store = latest.borrow_and_update().clone();
        if let Err(e) = app_state.snapshots.save(&store.snapshot()).await {
            error!("Failed to persist snapshot: {}", e);
        }
    }
    info!("Persistence task stopped.");
}

/// Dispatches `CHECK_DND_EXPIRY` on a fixed cadence.
pub async fn sweep_dnd(app_state: Arc<AppState>, token: CancellationToken) {
    let mut ticks = interval(app_state.config.dnd_sweep_every);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticks.tick() => {
                app_state.dispatch(Action::CheckDndExpiry).await;
            }
        }
    }
    info!("DND sweep stopped.");
}

/// Pulls the remote household view and folds it in with `SYNC_REMOTE_HOUSES`.
///
/// A failed fetch leaves the store alone; the next tick tries again.
pub async fn refresh_remote(
    app_state: Arc<AppState>,
    room_key: String,
    every: Duration,
    token: CancellationToken,
) {
    let Some(source) = app_state.remote.clone() else {
        warn!("Remote refresh requested without a remote source.");
        return;
    };
    let mut ticks = interval(every);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticks.tick() => {}
        }
        let fetched = tokio::select! {
            _ = token.cancelled() => break,
            fetched = source.fetch_houses(&room_key) => fetched,
        };
        match fetched {
            Ok(houses) => {
                let count = houses.len();
                app_state.dispatch(Action::SyncRemoteHouses { houses }).await;
                info!("Synced {} remote house(s).", count);
            }
            Err(e) => error!("Remote house refresh failed: {}", e),
        }
    }
    info!("Remote refresh stopped.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::state::tests::test_state;
    use hearth_core::ports::{PortResult, RemoteHouseSource};
    use hearth_core::RemoteHouse;
    use serde_json::json;

    #[tokio::test]
    async fn bursts_of_changes_are_written_once_settled() {
        let dir = tempfile::tempdir().unwrap();
        let app_state = test_state(dir.path());
        let token = CancellationToken::new();
        let task = tokio::spawn(persist_snapshots(app_state.clone(), token.clone()));

        for name in ["Ada", "Bo", "Cy"] {
            let action = serde_json::from_value(json!({ "type": "SIGNUP",
                "payload": { "name": name, "email": format!("{name}@x.com") } }))
            .unwrap();
            app_state.dispatch(action).await;
        }
        sleep(Duration::from_millis(300)).await;
        token.cancel();
        task.await.unwrap();

        let raw = app_state.snapshots.load().await.unwrap().expect("snapshot written");
        assert_eq!(raw["db"]["users"].as_array().unwrap().len(), 3);
        assert!(raw.get("toast").is_none());
    }

    struct OneHouse;

    #[async_trait::async_trait]
    impl RemoteHouseSource for OneHouse {
        async fn fetch_houses(&self, room_key: &str) -> PortResult<Vec<RemoteHouse>> {
            Ok(vec![serde_json::from_value(json!({
                "id": room_key,
                "members": [{ "wp_user_id": 5, "email": "eve@x.com", "name": "Eve" }]
            }))
            .unwrap()])
        }
    }

    #[tokio::test]
    async fn remote_refresh_syncs_on_the_first_tick() {
        let dir = tempfile::tempdir().unwrap();
        let base = test_state(dir.path());
        let app_state = Arc::new(AppState::new(
            base.config.clone(),
            hearth_core::Store::default(),
            rand::SeedableRng::seed_from_u64(1),
            base.snapshots.clone(),
            Some(Arc::new(OneHouse)),
        ));
        let mut changes = app_state.subscribe();
        let token = CancellationToken::new();
        let task = tokio::spawn(refresh_remote(
            app_state.clone(),
            "h9".into(),
            Duration::from_secs(3600),
            token.clone(),
        ));

        let synced = tokio::time::timeout(Duration::from_secs(5), changes.recv())
            .await
            .unwrap()
            .unwrap();
        token.cancel();
        task.await.unwrap();

        let house = synced.db.house("h9").unwrap();
        assert_eq!(synced.db.user(&house.admin_id).unwrap().name, "Eve");
    }
}
