//! DTO definitions for the player roster.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::validation::validate_display_name,
    state::model::{Player, PlayerId},
};

/// Public projection of a player.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub nickname: Option<String>,
    pub photo_url: Option<String>,
    pub strengths: String,
    pub weaknesses: String,
}

impl From<Player> for PlayerView {
    fn from(player: Player) -> Self {
        Self {
            id: player.id,
            name: player.name,
            nickname: player.nickname,
            photo_url: Some(player.photo_url).filter(|url| !url.is_empty()),
            strengths: player.strengths,
            weaknesses: player.weaknesses,
        }
    }
}

/// Payload used to create or replace a player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PlayerInput {
    #[validate(length(min = 1, max = 100), custom(function = "validate_display_name"))]
    pub name: String,
    /// Extra spoken keyword for voice scoring.
    #[serde(default)]
    #[validate(length(max = 50))]
    pub nickname: Option<String>,
    #[serde(default)]
    #[validate(url)]
    pub photo_url: Option<String>,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub strengths: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub weaknesses: String,
}

impl PlayerInput {
    /// Build the domain record for `id`.
    pub fn into_player(self, id: PlayerId) -> Player {
        Player {
            id,
            name: self.name.trim().to_string(),
            nickname: self
                .nickname
                .map(|nick| nick.trim().to_string())
                .filter(|nick| !nick.is_empty()),
            photo_url: self.photo_url.unwrap_or_default(),
            strengths: self.strengths,
            weaknesses: self.weaknesses,
        }
    }
}
