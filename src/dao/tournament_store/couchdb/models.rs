use std::{collections::HashMap, time::SystemTime};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    dao::{
        models::{MatchEntity, PlayerEntity, TeamEntity, TournamentEntity},
        tournament_store::couchdb::error::CouchDaoError,
    },
    state::model::{MatchId, PlayerId, PointsToWin, TournamentId, TournamentType},
};

pub const TOURNAMENT_PREFIX: &str = "tournament::";
pub const MATCH_PREFIX: &str = "match::";
pub const PLAYER_PREFIX: &str = "player::";
pub const COUNTER_PREFIX: &str = "counter::";
pub const SETTINGS_DOC_ID: &str = "settings";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Minimal projection used to read the revision of any document.
#[derive(Debug, Deserialize)]
pub struct RevisionOnly {
    #[serde(rename = "_rev")]
    pub rev: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchTournamentDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub tournament: TournamentBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentBody {
    pub tournament_id: TournamentId,
    pub name: String,
    pub points_to_win: PointsToWin,
    #[serde(rename = "type")]
    pub kind: TournamentType,
    pub is_locked: bool,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub player_ids: Vec<PlayerId>,
    pub teams: Vec<TeamEntity>,
    pub match_ids: Vec<MatchId>, // Current generation only, in schedule order
}

impl From<(&TournamentEntity, Option<String>)> for CouchTournamentDocument {
    fn from((tournament, rev): (&TournamentEntity, Option<String>)) -> Self {
        Self {
            id: tournament_doc_id(tournament.id),
            rev,
            tournament: TournamentBody {
                tournament_id: tournament.id,
                name: tournament.name.clone(),
                points_to_win: tournament.points_to_win,
                kind: tournament.kind,
                is_locked: tournament.is_locked,
                created_at: tournament.created_at,
                updated_at: tournament.updated_at,
                player_ids: tournament.player_ids.clone(),
                teams: tournament.teams.clone(),
                match_ids: tournament.matches.iter().map(|m| m.id).collect(),
            },
        }
    }
}

impl CouchTournamentDocument {
    /// Join the tournament row with its current match documents.
    ///
    /// Match documents of earlier generations share the prefix and are skipped.
    pub fn try_into_entity(
        self,
        match_docs: Vec<CouchMatchDocument>,
    ) -> Result<TournamentEntity, CouchDaoError> {
        let mut by_id = match_docs
            .into_iter()
            .map(|doc| (doc.record.id, doc.record))
            .collect::<HashMap<_, _>>();

        let missing = self
            .tournament
            .match_ids
            .iter()
            .filter(|id| !by_id.contains_key(id))
            .copied()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(CouchDaoError::MissingMatches {
                doc_id: self.id,
                match_ids: missing,
            });
        }

        let matches = self
            .tournament
            .match_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect::<Vec<_>>();

        let body = self.tournament;
        Ok(TournamentEntity {
            id: body.tournament_id,
            name: body.name,
            points_to_win: body.points_to_win,
            kind: body.kind,
            is_locked: body.is_locked,
            created_at: body.created_at,
            updated_at: body.updated_at,
            player_ids: body.player_ids,
            teams: body.teams,
            matches,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchMatchDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub record: MatchEntity,
}

impl From<(MatchEntity, Option<String>)> for CouchMatchDocument {
    fn from((record, rev): (MatchEntity, Option<String>)) -> Self {
        Self {
            id: match_doc_id(record.tournament_id, record.id),
            rev,
            record,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchPlayerDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub player: PlayerEntity,
}

impl From<(PlayerEntity, Option<String>)> for CouchPlayerDocument {
    fn from((player, rev): (PlayerEntity, Option<String>)) -> Self {
        Self {
            id: player_doc_id(player.id),
            rev,
            player,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouchSettingsDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(default)]
    pub values: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchCounterDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub last: i64,
}

pub fn tournament_doc_id(id: TournamentId) -> String {
    format!("{}{}", TOURNAMENT_PREFIX, id)
}

/// Prefix shared by every match document of a tournament, across generations.
pub fn tournament_matches_prefix(tournament_id: TournamentId) -> String {
    format!("{}{}::", MATCH_PREFIX, tournament_id)
}

pub fn match_doc_id(tournament_id: TournamentId, match_id: MatchId) -> String {
    format!("{}{}", tournament_matches_prefix(tournament_id), match_id)
}

pub fn player_doc_id(id: PlayerId) -> String {
    format!("{}{}", PLAYER_PREFIX, id)
}

pub fn counter_doc_id(kind: &str) -> String {
    format!("{}{}", COUNTER_PREFIX, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn match_entity(id: MatchId) -> MatchEntity {
        MatchEntity {
            id,
            tournament_id: 3,
            side1_ref: 1,
            side2_ref: 2,
            score1: 0,
            score2: 0,
            completed: false,
            first_server: None,
            serving_player: None,
            sides_swapped: false,
            match_order: id as u32,
            double_rotation_state: None,
            updated_at: SystemTime::UNIX_EPOCH,
        }
    }

    fn tournament_doc(match_ids: Vec<MatchId>) -> CouchTournamentDocument {
        CouchTournamentDocument {
            id: tournament_doc_id(3),
            rev: Some("1-a".into()),
            tournament: TournamentBody {
                tournament_id: 3,
                name: "Cup".into(),
                points_to_win: PointsToWin::Eleven,
                kind: TournamentType::Single,
                is_locked: false,
                created_at: SystemTime::UNIX_EPOCH,
                updated_at: SystemTime::UNIX_EPOCH,
                player_ids: vec![1, 2],
                teams: Vec::new(),
                match_ids,
            },
        }
    }

    #[test]
    fn match_doc_ids_do_not_collide_across_tournaments() {
        assert_eq!(match_doc_id(1, 20), "match::1::20");
        assert!(!match_doc_id(12, 1).starts_with(&tournament_matches_prefix(1)));
    }

    #[test]
    fn join_skips_superseded_generations() {
        let docs = vec![
            CouchMatchDocument::from((match_entity(1), None)),
            CouchMatchDocument::from((match_entity(2), None)),
            CouchMatchDocument::from((match_entity(3), None)),
        ];
        let entity = tournament_doc(vec![3, 2]).try_into_entity(docs).unwrap();
        let ids: Vec<_> = entity.matches.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn join_reports_missing_matches() {
        let docs = vec![CouchMatchDocument::from((match_entity(1), None))];
        match tournament_doc(vec![1, 4]).try_into_entity(docs) {
            Err(CouchDaoError::MissingMatches { match_ids, .. }) => assert_eq!(match_ids, vec![4]),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
