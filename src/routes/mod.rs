use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod input;
pub mod matches;
pub mod players;
pub mod settings;
pub mod sse;
pub mod tournaments;
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(websocket::router())
        .merge(players::router())
        .merge(tournaments::router())
        .merge(matches::router())
        .merge(input::router())
        .merge(settings::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
