/// Spoken feedback texts.
pub mod announcer;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Raw input to match command translation.
pub mod input_dispatcher;
/// Input handling against the active match.
pub mod input_service;
/// Match scoring on the open session.
pub mod match_service;
/// Player roster management.
pub mod player_service;
/// UI preferences.
pub mod settings_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage reconnection supervisor.
pub mod storage_supervisor;
/// Tournament lifecycle and schedule generation.
pub mod tournament_service;
/// WebSocket input stream handling.
pub mod websocket_service;
