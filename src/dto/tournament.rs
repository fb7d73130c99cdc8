//! DTO definitions for tournaments.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dao::models::TournamentListItemEntity,
    dto::{
        format_system_time,
        matches::MatchView,
        validation::{validate_display_name, validate_unique_ids},
    },
    state::model::{MatchId, PlayerId, PointsToWin, Team, TeamId, Tournament, TournamentId, TournamentType},
};

/// Minimal projection of a tournament when listed.
#[derive(Debug, Serialize, ToSchema)]
pub struct TournamentListItem {
    pub id: TournamentId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_locked: bool,
    pub created_at: String,
    pub player_count: usize,
    pub completed_matches: usize,
    pub total_matches: usize,
}

impl From<TournamentListItemEntity> for TournamentListItem {
    fn from(entity: TournamentListItemEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            kind: entity.kind.as_str().to_string(),
            is_locked: entity.is_locked,
            created_at: format_system_time(entity.created_at),
            player_count: entity.player_count,
            completed_matches: entity.completed_matches,
            total_matches: entity.total_matches,
        }
    }
}

/// Doubles team projection.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamView {
    pub id: TeamId,
    pub player_ids: Vec<PlayerId>,
    pub order: u32,
}

impl From<&Team> for TeamView {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id,
            player_ids: team.player_ids.to_vec(),
            order: team.order,
        }
    }
}

/// Full tournament with its schedule.
#[derive(Debug, Serialize, ToSchema)]
pub struct TournamentDetail {
    pub id: TournamentId,
    pub name: String,
    pub points_to_win: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_locked: bool,
    pub created_at: String,
    pub player_ids: Vec<PlayerId>,
    pub teams: Vec<TeamView>,
    pub matches: Vec<MatchView>,
}

impl From<&Tournament> for TournamentDetail {
    fn from(tournament: &Tournament) -> Self {
        Self {
            id: tournament.id,
            name: tournament.name.clone(),
            points_to_win: tournament.points_to_win.value(),
            kind: tournament.kind.as_str().to_string(),
            is_locked: tournament.is_locked,
            created_at: format_system_time(tournament.created_at),
            player_ids: tournament.player_ids.clone(),
            teams: tournament.teams.iter().map(TeamView::from).collect(),
            matches: tournament
                .matches
                .iter()
                .map(|current| MatchView::new(current, tournament.points_to_win))
                .collect(),
        }
    }
}

/// Payload used to create a tournament and generate its schedule.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateTournamentRequest {
    #[validate(length(min = 1, max = 100), custom(function = "validate_display_name"))]
    pub name: String,
    /// 11 or 21.
    #[serde(default)]
    #[schema(value_type = u32)]
    pub points_to_win: PointsToWin,
    /// `single` or `double`; anything else is treated as `single`.
    #[serde(rename = "type", default)]
    #[schema(value_type = String)]
    pub kind: TournamentType,
    #[validate(custom(function = "validate_unique_ids"))]
    pub player_ids: Vec<PlayerId>,
}

/// Partial tournament update. Omitted fields keep their value.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateTournamentRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100), custom(function = "validate_display_name"))]
    pub name: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<u32>)]
    pub points_to_win: Option<PointsToWin>,
    #[serde(rename = "type", default)]
    #[schema(value_type = Option<String>)]
    pub kind: Option<TournamentType>,
    #[serde(default)]
    #[validate(custom(function = "validate_unique_ids"))]
    pub player_ids: Option<Vec<PlayerId>>,
}

/// New order of the upcoming matches.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ReorderMatchesRequest {
    #[validate(length(min = 1), custom(function = "validate_unique_ids"))]
    pub match_ids: Vec<MatchId>,
}

/// Listing filters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTournamentsQuery {
    /// Include locked tournaments; defaults to the `show_locked_tournaments` setting.
    pub include_locked: Option<bool>,
}
