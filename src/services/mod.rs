/// Admin service for manual score operations.
pub mod admin_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Relay task feeding store changes to the SSE stream.
pub mod live_feed;
/// WebSocket connection and game session handling.
pub mod player_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
