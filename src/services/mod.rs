/// OpenAPI documentation generation.
pub mod documentation;
/// Per-session phase timer and answer routing.
pub mod game_runner;
/// Health check service.
pub mod health_service;
/// Session hosting, joining, readiness and start/leave operations.
pub mod lobby_service;
/// Change-feed driven lobby refresh.
pub mod lobby_watcher;
/// Presence WebSocket handling.
pub mod presence_service;
/// Profile upserts.
pub mod profile_service;
/// Quiz authoring and lookup.
pub mod quiz_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
