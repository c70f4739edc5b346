//! Local mirrors of the shared game tree.
//!
//! Each component subscribes to one store path, keeps a watch-channel mirror
//! that sessions and the SSE feed observe, and funnels every mutation through
//! the store so the store stays the single authority. Mirrors are only ever
//! written by their forwarder task, never optimistically by a caller.

pub mod roster;
pub mod score;
