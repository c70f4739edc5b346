//! Live store layer: the shared, path-addressed value tree every game client
//! synchronises against. One in-memory backend ships with the binary; anything
//! offering atomic compare-and-set plus push subscriptions satisfies the trait.

pub mod memory;

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Identifier of a client connection, used to key disconnect obligations.
pub type ConnectionId = Uuid;

/// Update closure passed to [`LiveStore::transaction`]. Receives the current
/// value at the path (`None` when absent) and returns the desired new value,
/// or `None` to abandon the transaction without writing.
pub type UpdateFn = Box<dyn FnMut(Option<&Value>) -> Option<Value> + Send>;

/// Error raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The transaction kept colliding with concurrent writers and gave up.
    #[error("transaction on `{path}` abandoned after {attempts} conflicting attempts")]
    TransactionAbandoned {
        /// Path the transaction was targeting.
        path: String,
        /// Number of attempts made before giving up.
        attempts: u32,
    },
    /// The supplied path cannot address a value (e.g. empty on a mutation).
    #[error("invalid store path `{path}`")]
    InvalidPath {
        /// The offending path.
        path: String,
    },
}

/// Result of a [`LiveStore::transaction`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionOutcome {
    /// Whether the update closure's value was committed.
    pub committed: bool,
    /// The value at the path after the transaction concluded.
    pub value: Value,
}

/// Abstraction over the shared realtime store.
///
/// Paths are slash-separated (`game/score`, `game/players/<id>`); values are
/// JSON. Mutating a path notifies every subscriber whose path is an ancestor
/// or descendant of it. Setting `null` removes the path, and reading an
/// absent path yields `null`, so subscribers can treat `null` uniformly as
/// "not there".
pub trait LiveStore: Send + Sync {
    /// Read the current value at `path`, or `None` when absent.
    fn read(&self, path: &str) -> BoxFuture<'static, StoreResult<Option<Value>>>;

    /// Unconditionally replace the value at `path` (last writer wins).
    fn set(&self, path: &str, value: Value) -> BoxFuture<'static, StoreResult<()>>;

    /// Remove the value at `path`; removing an absent path is not an error.
    fn remove(&self, path: &str) -> BoxFuture<'static, StoreResult<()>>;

    /// Atomically read-modify-write the value at `path`.
    ///
    /// The store serialises all transactions against the same path: `update`
    /// is re-invoked with a fresh snapshot whenever a concurrent writer got
    /// in between, until the write commits or the retry budget is exhausted.
    fn transaction(
        &self,
        path: &str,
        update: UpdateFn,
    ) -> BoxFuture<'static, StoreResult<TransactionOutcome>>;

    /// Subscribe to the value at `path`.
    ///
    /// The returned receiver holds the current value immediately and observes
    /// every subsequent change. Dropping the receiver is the unsubscribe.
    fn subscribe(&self, path: &str) -> watch::Receiver<Value>;

    /// Arm a store-side obligation removing `path` when `connection` is lost.
    fn arm_remove_on_disconnect(
        &self,
        connection: ConnectionId,
        path: &str,
    ) -> BoxFuture<'static, StoreResult<()>>;

    /// Disarm a previously armed disconnect removal (graceful leave).
    fn cancel_on_disconnect(
        &self,
        connection: ConnectionId,
        path: &str,
    ) -> BoxFuture<'static, StoreResult<()>>;

    /// Signal that `connection` terminated, executing its armed removals.
    fn connection_lost(&self, connection: ConnectionId) -> BoxFuture<'static, StoreResult<()>>;
}
