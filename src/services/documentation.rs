use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Ropewar Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::websocket::ws_handler,
        crate::routes::admin::adjust_score,
        crate::routes::admin::reset_score,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::PlayerInboundMessage,
            crate::dto::ws::PlayerOutboundMessage,
            crate::dto::admin::ScoreMutationRequest,
            crate::dto::admin::ScoreMutationResponse,
            crate::dto::admin::ResetResponse,
            crate::dto::sse::Handshake,
            crate::dto::common::ScoreSnapshot,
            crate::dto::common::RosterSnapshot,
            crate::dto::common::PlayerSnapshot,
            crate::dto::common::TeamSide,
            crate::dto::ws::InputStateDto,
            crate::dto::ws::LockStateDto,
            crate::dto::ws::LockClassDto,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "players", description = "WebSocket operations for player sessions"),
        (name = "admin", description = "Manual score administration"),
    )
)]
pub struct ApiDoc;
