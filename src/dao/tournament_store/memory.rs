//! Process-local store used when no database is configured and by the test-suite.

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::{
    dao::{
        models::{IdKind, MatchEntity, PlayerEntity, TournamentEntity, TournamentListItemEntity},
        storage::{StorageError, StorageResult},
        tournament_store::TournamentStore,
    },
    state::model::{MatchId, PlayerId, TournamentId},
};

/// Returned by every call while the store is switched offline.
#[derive(Debug, Error)]
#[error("in-memory store is offline")]
pub struct OfflineError;

#[derive(Default)]
struct MemoryData {
    tournaments: DashMap<TournamentId, TournamentEntity>,
    superseded_matches: DashMap<TournamentId, Vec<MatchEntity>>,
    players: DashMap<PlayerId, PlayerEntity>,
    settings: DashMap<String, Value>,
    sequences: DashMap<IdKind, i64>,
    offline: AtomicBool,
}

/// [`TournamentStore`] keeping every record in concurrent maps.
#[derive(Clone, Default)]
pub struct MemoryTournamentStore {
    data: Arc<MemoryData>,
}

impl MemoryTournamentStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while offline every call fails with [`StorageError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.data.offline.store(offline, Ordering::SeqCst);
    }

    /// Matches that were invalidated by a regeneration of `tournament_id`.
    pub fn superseded_matches(&self, tournament_id: TournamentId) -> Vec<MatchEntity> {
        self.data
            .superseded_matches
            .get(&tournament_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn ensure_online(&self, operation: &str) -> StorageResult<()> {
        if self.data.offline.load(Ordering::SeqCst) {
            Err(StorageError::unavailable(
                format!("{operation} failed"),
                OfflineError,
            ))
        } else {
            Ok(())
        }
    }
}

impl TournamentStore for MemoryTournamentStore {
    fn load_tournament(
        &self,
        id: TournamentId,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online("load_tournament")?;
            Ok(store
                .data
                .tournaments
                .get(&id)
                .map(|entry| entry.value().clone()))
        })
    }

    fn list_tournaments(&self) -> BoxFuture<'static, StorageResult<Vec<TournamentListItemEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online("list_tournaments")?;
            let mut items: Vec<TournamentListItemEntity> = store
                .data
                .tournaments
                .iter()
                .map(|entry| TournamentListItemEntity::from(entry.value()))
                .collect();
            items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(items)
        })
    }

    fn save_tournament(&self, tournament: TournamentEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online("save_tournament")?;
            let current_ids: HashSet<MatchId> = tournament.matches.iter().map(|m| m.id).collect();
            if let Some(previous) = store.data.tournaments.get(&tournament.id) {
                let invalidated: Vec<MatchEntity> = previous
                    .matches
                    .iter()
                    .filter(|m| !current_ids.contains(&m.id))
                    .cloned()
                    .collect();
                drop(previous);
                if !invalidated.is_empty() {
                    debug!(
                        tournament_id = tournament.id,
                        count = invalidated.len(),
                        "invalidating superseded matches"
                    );
                    store
                        .data
                        .superseded_matches
                        .entry(tournament.id)
                        .or_default()
                        .extend(invalidated);
                }
            }
            store.data.tournaments.insert(tournament.id, tournament);
            Ok(())
        })
    }

    fn delete_tournament(&self, id: TournamentId) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online("delete_tournament")?;
            store.data.superseded_matches.remove(&id);
            Ok(store.data.tournaments.remove(&id).is_some())
        })
    }

    fn save_match(
        &self,
        match_id: MatchId,
        snapshot: MatchEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online("save_match")?;
            let mut tournament = store
                .data
                .tournaments
                .get_mut(&snapshot.tournament_id)
                .ok_or_else(|| {
                    StorageError::Missing(format!("tournament {}", snapshot.tournament_id))
                })?;
            let slot = tournament
                .matches
                .iter_mut()
                .find(|candidate| candidate.id == match_id)
                .ok_or_else(|| StorageError::Missing(format!("match {match_id}")))?;
            *slot = snapshot;
            Ok(())
        })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online("list_players")?;
            let mut players: Vec<PlayerEntity> = store
                .data
                .players
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            players.sort_by_key(|player| player.id);
            Ok(players)
        })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online("save_player")?;
            store.data.players.insert(player.id, player);
            Ok(())
        })
    }

    fn delete_player(&self, id: PlayerId) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online("delete_player")?;
            Ok(store.data.players.remove(&id).is_some())
        })
    }

    fn load_settings(&self) -> BoxFuture<'static, StorageResult<Vec<(String, Value)>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online("load_settings")?;
            Ok(store
                .data
                .settings
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect())
        })
    }

    fn save_settings(&self, key: String, value: Value) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online("save_settings")?;
            store.data.settings.insert(key, value);
            Ok(())
        })
    }

    fn allocate_ids(&self, kind: IdKind, count: usize) -> BoxFuture<'static, StorageResult<i64>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online("allocate_ids")?;
            let mut last = store.data.sequences.entry(kind).or_insert(0);
            let first = *last + 1;
            *last += count as i64;
            Ok(first)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online("health_check") })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online("reconnect") })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::state::model::{PointsToWin, TournamentType};

    fn match_entity(id: MatchId, tournament_id: TournamentId) -> MatchEntity {
        MatchEntity {
            id,
            tournament_id,
            side1_ref: 1,
            side2_ref: 2,
            score1: 0,
            score2: 0,
            completed: false,
            first_server: None,
            serving_player: None,
            sides_swapped: false,
            match_order: 0,
            double_rotation_state: None,
            updated_at: SystemTime::now(),
        }
    }

    fn tournament(id: TournamentId, matches: Vec<MatchEntity>) -> TournamentEntity {
        TournamentEntity {
            id,
            name: "Friday".into(),
            points_to_win: PointsToWin::Eleven,
            kind: TournamentType::Single,
            is_locked: false,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
            player_ids: vec![1, 2],
            teams: Vec::new(),
            matches,
        }
    }

    #[tokio::test]
    async fn allocates_consecutive_blocks() {
        let store = MemoryTournamentStore::new();
        assert_eq!(store.allocate_ids(IdKind::Match, 3).await.unwrap(), 1);
        assert_eq!(store.allocate_ids(IdKind::Match, 2).await.unwrap(), 4);
        assert_eq!(store.allocate_ids(IdKind::Team, 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn regeneration_keeps_superseded_matches() {
        let store = MemoryTournamentStore::new();
        store
            .save_tournament(tournament(1, vec![match_entity(1, 1)]))
            .await
            .unwrap();
        store
            .save_tournament(tournament(1, vec![match_entity(2, 1)]))
            .await
            .unwrap();

        let superseded = store.superseded_matches(1);
        assert_eq!(superseded.len(), 1);
        assert_eq!(superseded[0].id, 1);
        let current = store.load_tournament(1).await.unwrap().unwrap();
        assert_eq!(current.matches[0].id, 2);
    }

    #[tokio::test]
    async fn save_match_replaces_the_whole_row() {
        let store = MemoryTournamentStore::new();
        store
            .save_tournament(tournament(1, vec![match_entity(5, 1)]))
            .await
            .unwrap();
        let mut updated = match_entity(5, 1);
        updated.score1 = 4;
        store.save_match(5, updated).await.unwrap();

        let loaded = store.load_tournament(1).await.unwrap().unwrap();
        assert_eq!(loaded.matches[0].score1, 4);

        let missing = store.save_match(9, match_entity(9, 1)).await;
        assert!(matches!(missing, Err(StorageError::Missing(_))));
    }

    #[tokio::test]
    async fn offline_store_rejects_calls() {
        let store = MemoryTournamentStore::new();
        store.set_offline(true);
        assert!(store.health_check().await.is_err());
        store.set_offline(false);
        assert!(store.health_check().await.is_ok());
    }
}
