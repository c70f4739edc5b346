//! Mirror of the shared player roster plus team membership operations.

use std::sync::Arc;

use serde_json::Value;
use tokio::{sync::watch, task::JoinHandle};
use tracing::warn;

use crate::{
    state::game::{PLAYERS_PATH, PlayerEntry, Roster, Team, player_id, player_path},
    store::{ConnectionId, LiveStore, StoreResult},
};

/// Owns the local mirror of the shared roster.
///
/// Sessions watch the mirror to render the team lists and to detect their own
/// entry vanishing (disconnect-triggered cleanup or a full game restart).
pub struct RosterSync {
    store: Arc<dyn LiveStore>,
    mirror: watch::Receiver<Roster>,
    forwarder: JoinHandle<()>,
}

impl RosterSync {
    /// Subscribe to the roster path and start mirroring it.
    pub fn new(store: Arc<dyn LiveStore>) -> Self {
        let mut updates = store.subscribe(PLAYERS_PATH);
        let initial = parse_roster(&updates.borrow());
        let (mirror_tx, mirror) = watch::channel(initial);

        let forwarder = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let roster = parse_roster(&updates.borrow_and_update());
                mirror_tx.send_if_modified(|slot| {
                    if *slot == roster {
                        false
                    } else {
                        *slot = roster;
                        true
                    }
                });
            }
        });

        Self {
            store,
            mirror,
            forwarder,
        }
    }

    /// Last store-confirmed roster.
    pub fn current(&self) -> Roster {
        self.mirror.borrow().clone()
    }

    /// Watch the mirror for changes.
    pub fn watch(&self) -> watch::Receiver<Roster> {
        self.mirror.clone()
    }

    /// Join a team: writes the roster entry and arms its removal for when the
    /// connection drops. Returns the generated player id.
    pub async fn select(
        &self,
        connection: ConnectionId,
        nickname: &str,
        team: Team,
    ) -> StoreResult<String> {
        let id = player_id(nickname);
        let path = player_path(&id);
        let entry = PlayerEntry {
            nickname: nickname.to_owned(),
            team,
        };
        self.store.set(&path, entry.to_stored()).await?;
        self.store.arm_remove_on_disconnect(connection, &path).await?;
        Ok(id)
    }

    /// Leave the team gracefully: disarms the disconnect obligation first so
    /// the entry cannot be removed twice, then deletes it.
    pub async fn leave(&self, connection: ConnectionId, player_id: &str) -> StoreResult<()> {
        let path = player_path(player_id);
        self.store.cancel_on_disconnect(connection, &path).await?;
        self.store.remove(&path).await
    }
}

impl Drop for RosterSync {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Interpret the stored roster value, skipping anything malformed.
///
/// Only this crate writes entries, so a malformed one is a bug worth a log
/// line, not a reason to drop the whole roster.
fn parse_roster(value: &Value) -> Roster {
    let Some(map) = value.as_object() else {
        return Roster::new();
    };
    map.iter()
        .filter_map(|(id, raw)| match serde_json::from_value::<PlayerEntry>(raw.clone()) {
            Ok(entry) => Some((id.clone(), entry)),
            Err(err) => {
                warn!(%id, error = %err, "skipping malformed roster entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::store::memory::MemoryStore;

    fn sync() -> (Arc<dyn LiveStore>, RosterSync) {
        let store: Arc<dyn LiveStore> = Arc::new(MemoryStore::new());
        let sync = RosterSync::new(store.clone());
        (store, sync)
    }

    #[tokio::test]
    async fn starts_with_an_empty_roster() {
        let (_store, sync) = sync();
        assert!(sync.current().is_empty());
    }

    #[tokio::test]
    async fn select_inserts_the_entry_and_mirrors_it() {
        let (store, sync) = sync();
        let mut watcher = sync.watch();
        let connection = Uuid::new_v4();

        let id = sync.select(connection, "ada", Team::Left).await.unwrap();
        assert!(id.starts_with("ada-"));

        let stored = store.read(&player_path(&id)).await.unwrap();
        assert_eq!(stored, Some(json!({"nickname": "ada", "team": "left"})));

        watcher.changed().await.unwrap();
        let roster = watcher.borrow_and_update().clone();
        assert_eq!(roster.len(), 1);
        assert_eq!(
            roster.get(&id),
            Some(&PlayerEntry {
                nickname: "ada".into(),
                team: Team::Left,
            })
        );
    }

    #[tokio::test]
    async fn two_selects_get_distinct_ids() {
        let (_store, sync) = sync();
        let mut watcher = sync.watch();
        let connection = Uuid::new_v4();
        let first = sync.select(connection, "ada", Team::Left).await.unwrap();
        let second = sync.select(connection, "ada", Team::Right).await.unwrap();
        assert_ne!(first, second);

        let roster = watcher.wait_for(|roster| roster.len() == 2).await.unwrap();
        assert!(roster.contains_key(&first));
        assert!(roster.contains_key(&second));
    }

    #[tokio::test]
    async fn leave_removes_the_entry() {
        let (store, sync) = sync();
        let mut watcher = sync.watch();
        let connection = Uuid::new_v4();
        let id = sync.select(connection, "bob", Team::Right).await.unwrap();
        watcher.wait_for(|roster| roster.len() == 1).await.unwrap();

        sync.leave(connection, &id).await.unwrap();
        watcher.wait_for(|roster| roster.is_empty()).await.unwrap();
        assert_eq!(store.read(&player_path(&id)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn disconnect_removes_the_entry_without_a_leave() {
        let (store, sync) = sync();
        let mut watcher = sync.watch();
        let connection = Uuid::new_v4();
        sync.select(connection, "eve", Team::Left).await.unwrap();
        watcher.wait_for(|roster| roster.len() == 1).await.unwrap();

        store.connection_lost(connection).await.unwrap();
        watcher.wait_for(|roster| roster.is_empty()).await.unwrap();
    }

    #[tokio::test]
    async fn disconnect_after_leave_changes_nothing() {
        let (store, sync) = sync();
        let connection = Uuid::new_v4();
        let id = sync.select(connection, "eve", Team::Left).await.unwrap();
        sync.leave(connection, &id).await.unwrap();

        store.connection_lost(connection).await.unwrap();
        assert!(sync.current().is_empty());
        assert_eq!(store.read(&player_path(&id)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_entries_are_skipped() {
        let (store, sync) = sync();
        let connection = Uuid::new_v4();
        let id = sync.select(connection, "ada", Team::Left).await.unwrap();

        let mut watcher = sync.watch();
        store
            .set(&format!("{PLAYERS_PATH}/bogus"), json!(17))
            .await
            .unwrap();
        // A valid write afterwards proves the forwarder kept running and the
        // bogus entry stayed filtered out.
        store
            .set(
                &format!("{PLAYERS_PATH}/zoe-0a1b2c3d"),
                json!({"nickname": "zoe", "team": "right"}),
            )
            .await
            .unwrap();

        let roster = watcher.wait_for(|roster| roster.len() == 2).await.unwrap();
        assert!(roster.contains_key(&id));
        assert!(roster.contains_key("zoe-0a1b2c3d"));
        assert!(!roster.contains_key("bogus"));
    }
}
