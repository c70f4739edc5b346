//! In-memory live store backend: a single JSON tree guarded by a lock, with
//! optimistic compare-and-retry transactions and watch-channel fan-out.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::info;

use super::{ConnectionId, LiveStore, StoreError, StoreResult, TransactionOutcome, UpdateFn};

/// Internal retry budget for conflicting transactions, matching the limit of
/// the reference realtime store.
const MAX_TRANSACTION_ATTEMPTS: u32 = 25;

/// In-process authority for the shared game tree.
///
/// All clients of one server process share a single `MemoryStore`; cloning is
/// cheap and yields another handle onto the same tree.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    tree: RwLock<Value>,
    watchers: DashMap<String, watch::Sender<Value>>,
    obligations: DashMap<ConnectionId, Vec<String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                tree: RwLock::new(Value::Object(Map::new())),
                watchers: DashMap::new(),
                obligations: DashMap::new(),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreInner {
    // The tree lock is only ever held for short, non-async critical sections;
    // a poisoned lock just means a panic elsewhere, so keep serving the data.
    fn read_tree(&self) -> RwLockReadGuard<'_, Value> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_tree(&self) -> RwLockWriteGuard<'_, Value> {
        self.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push the post-mutation value to every watcher overlapping `mutated`.
    ///
    /// Callers must still hold the write guard the mutation was made under so
    /// watchers observe states in commit order.
    fn notify_locked(&self, tree: &Value, mutated: &[&str]) {
        for entry in self.watchers.iter() {
            let watched = split_segments(entry.key());
            if !paths_overlap(&watched, mutated) {
                continue;
            }
            let next = value_at(tree, &watched).cloned().unwrap_or(Value::Null);
            entry.value().send_if_modified(|slot| {
                if *slot == next {
                    false
                } else {
                    *slot = next;
                    true
                }
            });
        }
    }
}

impl LiveStore for MemoryStore {
    fn read(&self, path: &str) -> BoxFuture<'static, StoreResult<Option<Value>>> {
        let inner = self.inner.clone();
        let path = path.to_owned();
        Box::pin(async move {
            let segments = split_segments(&path);
            let guard = inner.read_tree();
            Ok(value_at(&guard, &segments).cloned())
        })
    }

    fn set(&self, path: &str, value: Value) -> BoxFuture<'static, StoreResult<()>> {
        let inner = self.inner.clone();
        let path = path.to_owned();
        Box::pin(async move {
            let segments = mutation_segments(&path)?;
            let mut guard = inner.write_tree();
            write_value(&mut guard, &segments, value);
            inner.notify_locked(&guard, &segments);
            Ok(())
        })
    }

    fn remove(&self, path: &str) -> BoxFuture<'static, StoreResult<()>> {
        let inner = self.inner.clone();
        let path = path.to_owned();
        Box::pin(async move {
            let segments = mutation_segments(&path)?;
            let mut guard = inner.write_tree();
            remove_at(&mut guard, &segments);
            inner.notify_locked(&guard, &segments);
            Ok(())
        })
    }

    fn transaction(
        &self,
        path: &str,
        update: UpdateFn,
    ) -> BoxFuture<'static, StoreResult<TransactionOutcome>> {
        let inner = self.inner.clone();
        let path = path.to_owned();
        let mut update = update;
        Box::pin(async move {
            let segments = mutation_segments(&path)?;
            for _ in 0..MAX_TRANSACTION_ATTEMPTS {
                // Snapshot outside the write lock so the update closure never
                // runs while holding it.
                let seen = {
                    let guard = inner.read_tree();
                    value_at(&guard, &segments).cloned()
                };

                let Some(next) = update(seen.as_ref()) else {
                    return Ok(TransactionOutcome {
                        committed: false,
                        value: seen.unwrap_or(Value::Null),
                    });
                };

                let mut guard = inner.write_tree();
                if value_at(&guard, &segments) == seen.as_ref() {
                    write_value(&mut guard, &segments, next.clone());
                    inner.notify_locked(&guard, &segments);
                    return Ok(TransactionOutcome {
                        committed: true,
                        value: next,
                    });
                }
                // A concurrent writer got in between; retry on a fresh snapshot.
            }

            Err(StoreError::TransactionAbandoned {
                path: path.clone(),
                attempts: MAX_TRANSACTION_ATTEMPTS,
            })
        })
    }

    fn subscribe(&self, path: &str) -> watch::Receiver<Value> {
        let segments = split_segments(path);
        let key = segments.join("/");
        // Registering under the tree read lock means no mutation can slip in
        // between the snapshot and the watcher becoming visible to writers.
        let guard = self.inner.read_tree();
        let snapshot = value_at(&guard, &segments).cloned().unwrap_or(Value::Null);
        let entry = self
            .inner
            .watchers
            .entry(key)
            .or_insert_with(|| watch::channel(snapshot).0);
        let receiver = entry.subscribe();
        drop(entry);
        drop(guard);
        receiver
    }

    fn arm_remove_on_disconnect(
        &self,
        connection: ConnectionId,
        path: &str,
    ) -> BoxFuture<'static, StoreResult<()>> {
        let inner = self.inner.clone();
        let path = path.to_owned();
        Box::pin(async move {
            let key = mutation_segments(&path)?.join("/");
            let mut armed = inner.obligations.entry(connection).or_default();
            if !armed.contains(&key) {
                armed.push(key);
            }
            Ok(())
        })
    }

    fn cancel_on_disconnect(
        &self,
        connection: ConnectionId,
        path: &str,
    ) -> BoxFuture<'static, StoreResult<()>> {
        let inner = self.inner.clone();
        let path = path.to_owned();
        Box::pin(async move {
            let key = mutation_segments(&path)?.join("/");
            if let Some(mut armed) = inner.obligations.get_mut(&connection) {
                armed.retain(|candidate| candidate != &key);
            }
            Ok(())
        })
    }

    fn connection_lost(&self, connection: ConnectionId) -> BoxFuture<'static, StoreResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let Some((_, paths)) = inner.obligations.remove(&connection) else {
                return Ok(());
            };
            let mut guard = inner.write_tree();
            for path in paths {
                info!(%connection, %path, "executing disconnect removal");
                let segments = split_segments(&path);
                remove_at(&mut guard, &segments);
                inner.notify_locked(&guard, &segments);
            }
            Ok(())
        })
    }
}

/// Split a slash-separated path into its non-empty segments.
fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Split a path for a mutation, which must address at least one segment.
fn mutation_segments(path: &str) -> StoreResult<Vec<&str>> {
    let segments = split_segments(path);
    if segments.is_empty() {
        return Err(StoreError::InvalidPath {
            path: path.to_owned(),
        });
    }
    Ok(segments)
}

/// Two paths overlap when one addresses an ancestor (or the same node) of the
/// other; both watchers are affected by a mutation at either.
fn paths_overlap(a: &[&str], b: &[&str]) -> bool {
    a.iter().zip(b.iter()).all(|(left, right)| left == right)
}

fn value_at<'t>(tree: &'t Value, segments: &[&str]) -> Option<&'t Value> {
    segments.iter().try_fold(tree, |node, segment| {
        node.as_object().and_then(|map| map.get(*segment))
    })
}

/// Write `value` at the path, creating intermediate objects and replacing any
/// leaf standing in the way. A `null` value removes the path instead, so
/// absent and null stay indistinguishable to readers.
fn write_value(tree: &mut Value, segments: &[&str], value: Value) {
    if value.is_null() {
        remove_at(tree, segments);
    } else {
        set_at(tree, segments, value);
    }
}

fn set_at(tree: &mut Value, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *tree = value;
        return;
    };
    let mut node = tree;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert((*last).to_string(), value);
    }
}

fn remove_at(tree: &mut Value, segments: &[&str]) {
    let Some((last, parents)) = segments.split_last() else {
        *tree = Value::Object(Map::new());
        return;
    };
    let mut node = tree;
    for segment in parents {
        match node {
            Value::Object(map) => match map.get_mut(*segment) {
                Some(child) => node = child,
                None => return,
            },
            _ => return,
        }
    }
    if let Value::Object(map) = node {
        map.remove(*last);
    }
}
