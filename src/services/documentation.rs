use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the scoring backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::websocket::ws_handler,
        crate::routes::input::submit_input,
        crate::routes::players::list_players,
        crate::routes::players::create_player,
        crate::routes::players::update_player,
        crate::routes::players::delete_player,
        crate::routes::tournaments::list_tournaments,
        crate::routes::tournaments::create_tournament,
        crate::routes::tournaments::get_tournament,
        crate::routes::tournaments::update_tournament,
        crate::routes::tournaments::delete_tournament,
        crate::routes::tournaments::toggle_lock,
        crate::routes::tournaments::copy_tournament,
        crate::routes::tournaments::open_tournament,
        crate::routes::tournaments::reorder_matches,
        crate::routes::matches::play_match,
        crate::routes::matches::serve_selection,
        crate::routes::matches::set_first_server,
        crate::routes::matches::add_point,
        crate::routes::matches::subtract_point,
        crate::routes::matches::undo,
        crate::routes::matches::swap_sides,
        crate::routes::matches::finalize,
        crate::routes::matches::override_score,
        crate::routes::matches::session,
        crate::routes::matches::suspend,
        crate::routes::settings::get_settings,
        crate::routes::settings::update_setting,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::player::PlayerView,
            crate::dto::player::PlayerInput,
            crate::dto::tournament::TournamentListItem,
            crate::dto::tournament::TournamentDetail,
            crate::dto::tournament::TeamView,
            crate::dto::tournament::CreateTournamentRequest,
            crate::dto::tournament::UpdateTournamentRequest,
            crate::dto::tournament::ReorderMatchesRequest,
            crate::dto::matches::MatchView,
            crate::dto::matches::RotationView,
            crate::dto::matches::RotationSlotView,
            crate::dto::matches::PlayerRef,
            crate::dto::matches::ServeOptionView,
            crate::dto::matches::FirstServerRequest,
            crate::dto::matches::PointRequest,
            crate::dto::matches::ScoreOverrideRequest,
            crate::dto::matches::FinalizeResponse,
            crate::dto::matches::SessionView,
            crate::dto::matches::SuspendResponse,
            crate::dto::input::InputEventDto,
            crate::dto::input::InputResponse,
            crate::dto::input::InputError,
            crate::dto::settings::SettingsView,
            crate::dto::settings::UpdateSettingRequest,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::PointScoredEvent,
            crate::dto::sse::MatchCompletedEvent,
            crate::dto::sse::MatchUpdatedEvent,
            crate::dto::sse::TournamentUpdatedEvent,
            crate::dto::sse::TournamentDeletedEvent,
            crate::dto::sse::PersistenceFailedEvent,
            crate::services::announcer::Announcement,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "players", description = "Player roster"),
        (name = "tournaments", description = "Tournament management and schedule generation"),
        (name = "matches", description = "Match scoring and the scoring session"),
        (name = "input", description = "Pointer, keyboard and voice input"),
        (name = "settings", description = "UI preferences"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_scoring_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/matches/{id}/points"));
        assert!(doc.paths.paths.contains_key("/ws/input"));
        assert!(doc.paths.paths.contains_key("/tournaments/{id}/match-order"));
    }
}
