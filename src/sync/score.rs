//! Mirror of the shared score with atomic delta submission.

use std::sync::Arc;

use serde_json::json;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    state::game::{SCORE_PATH, score_of},
    store::{LiveStore, StoreResult},
};

/// Owns the local mirror of the shared score.
///
/// One instance serves the whole process; the mirror is written exclusively
/// by the subscription forwarder, so readers only ever see store-confirmed
/// values.
pub struct ScoreSync {
    store: Arc<dyn LiveStore>,
    mirror: watch::Receiver<i64>,
    forwarder: JoinHandle<()>,
}

impl ScoreSync {
    /// Subscribe to the score path and start mirroring it.
    pub fn new(store: Arc<dyn LiveStore>) -> Self {
        let mut updates = store.subscribe(SCORE_PATH);
        let initial = score_of(&updates.borrow());
        let (mirror_tx, mirror) = watch::channel(initial);

        let forwarder = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let score = score_of(&updates.borrow_and_update());
                mirror_tx.send_if_modified(|slot| {
                    if *slot == score {
                        false
                    } else {
                        *slot = score;
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

    /// Last store-confirmed score.
    pub fn current(&self) -> i64 {
        *self.mirror.borrow()
    }

    /// Watch the mirror for changes.
    pub fn watch(&self) -> watch::Receiver<i64> {
        self.mirror.clone()
    }

    /// Atomically shift the score by `delta`, returning the committed value.
    ///
    /// The update runs inside a store transaction, so concurrent submissions
    /// from any number of sessions sum exactly. A missing or non-numeric
    /// stored value counts as zero.
    pub async fn apply_delta(&self, delta: i64) -> StoreResult<i64> {
        let outcome = self
            .store
            .transaction(
                SCORE_PATH,
                Box::new(move |current| {
                    let current = current.map(score_of).unwrap_or(0);
                    Some(json!(current + delta))
                }),
            )
            .await?;
        Ok(score_of(&outcome.value))
    }

    /// Set the score straight back to zero.
    ///
    /// Deliberately a plain write, not a transaction: reset is an infrequent
    /// admin action and last-writer-wins is the intended outcome.
    pub async fn reset(&self) -> StoreResult<()> {
        self.store.set(SCORE_PATH, json!(0)).await
    }
}

impl Drop for ScoreSync {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::store::memory::MemoryStore;

    fn sync() -> (Arc<dyn LiveStore>, ScoreSync) {
        let store: Arc<dyn LiveStore> = Arc::new(MemoryStore::new());
        let sync = ScoreSync::new(store.clone());
        (store, sync)
    }

    #[tokio::test]
    async fn mirror_follows_store_writes() {
        let (store, sync) = sync();
        let mut watcher = sync.watch();
        assert_eq!(sync.current(), 0);

        store.set(SCORE_PATH, json!(9)).await.unwrap();
        watcher.changed().await.unwrap();
        assert_eq!(*watcher.borrow_and_update(), 9);
        assert_eq!(sync.current(), 9);
    }

    #[tokio::test]
    async fn apply_delta_commits_and_returns_the_new_score() {
        let (store, sync) = sync();
        assert_eq!(sync.apply_delta(1).await.unwrap(), 1);
        assert_eq!(sync.apply_delta(1).await.unwrap(), 2);
        assert_eq!(sync.apply_delta(-1).await.unwrap(), 1);
        assert_eq!(store.read(SCORE_PATH).await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn missing_score_counts_as_zero() {
        let (_store, sync) = sync();
        assert_eq!(sync.apply_delta(-1).await.unwrap(), -1);
    }

    #[tokio::test]
    async fn non_numeric_scores_mirror_as_zero() {
        let (store, sync) = sync();
        store.set(SCORE_PATH, json!(3)).await.unwrap();
        let mut watcher = sync.watch();
        watcher.changed().await.unwrap();

        store.set(SCORE_PATH, Value::String("junk".into())).await.unwrap();
        watcher.changed().await.unwrap();
        assert_eq!(*watcher.borrow_and_update(), 0);
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let (store, sync) = sync();
        sync.apply_delta(5).await.unwrap();
        sync.reset().await.unwrap();
        assert_eq!(store.read(SCORE_PATH).await.unwrap(), Some(json!(0)));
        sync.reset().await.unwrap();
        assert_eq!(store.read(SCORE_PATH).await.unwrap(), Some(json!(0)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn opposing_pulls_cancel_out_exactly() {
        let store: Arc<dyn LiveStore> = Arc::new(MemoryStore::new());
        let right = Arc::new(ScoreSync::new(store.clone()));
        let left = Arc::new(ScoreSync::new(store.clone()));

        let mut handles = Vec::new();
        for (sync, delta) in [(right.clone(), 1i64), (left.clone(), -1)] {
            handles.push(tokio::spawn(async move {
                for _ in 0..5 {
                    sync.apply_delta(delta).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.read(SCORE_PATH).await.unwrap(), Some(json!(0)));
    }
}
