#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::dao::models::{
    IdKind, MatchEntity, PlayerEntity, TournamentEntity, TournamentListItemEntity,
};
use crate::dao::storage::StorageResult;
use crate::state::model::{MatchId, PlayerId, TournamentId};

/// Contract between the scoring core and whatever persists its records.
///
/// Writes always carry the full record; backends supersede the previous row
/// instead of merging fields.
pub trait TournamentStore: Send + Sync {
    /// Load a tournament with its current players, teams and matches.
    fn load_tournament(
        &self,
        id: TournamentId,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>>;
    /// List every tournament with summary counters.
    fn list_tournaments(&self) -> BoxFuture<'static, StorageResult<Vec<TournamentListItemEntity>>>;
    /// Supersede a tournament row together with its current teams and matches.
    ///
    /// Matches that are no longer listed become invalid but are kept by the backend.
    fn save_tournament(&self, tournament: TournamentEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete a tournament and its matches. Returns `false` when it did not exist.
    fn delete_tournament(&self, id: TournamentId) -> BoxFuture<'static, StorageResult<bool>>;
    /// Supersede a single match row.
    fn save_match(
        &self,
        match_id: MatchId,
        snapshot: MatchEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// List every player.
    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Create or supersede a player.
    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete a player. Returns `false` when it did not exist.
    fn delete_player(&self, id: PlayerId) -> BoxFuture<'static, StorageResult<bool>>;
    /// Load every stored preference.
    fn load_settings(&self) -> BoxFuture<'static, StorageResult<Vec<(String, Value)>>>;
    /// Store a single preference.
    fn save_settings(&self, key: String, value: Value) -> BoxFuture<'static, StorageResult<()>>;
    /// Reserve `count` consecutive identifiers and return the first one.
    fn allocate_ids(&self, kind: IdKind, count: usize) -> BoxFuture<'static, StorageResult<i64>>;
    /// Cheap connectivity probe.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
