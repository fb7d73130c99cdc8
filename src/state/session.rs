use std::collections::HashMap;

use tracing::warn;
use uuid::Uuid;

use crate::state::{
    match_state::{MatchError, UndoHistory},
    model::{Match, MatchContext, MatchId, Player, PlayerId, Tournament},
};

/// Explicit scoring context owned by the UI layer: the open tournament, the
/// match being played and the undo stack.
#[derive(Debug, Clone)]
pub struct ScoringSession {
    id: Uuid,
    tournament: Tournament,
    players: HashMap<PlayerId, Player>,
    active_match: Option<MatchId>,
    history: UndoHistory,
}

impl ScoringSession {
    /// Open a tournament with the roster needed to name its players.
    pub fn new(tournament: Tournament, players: impl IntoIterator<Item = Player>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament,
            players: players
                .into_iter()
                .map(|player| (player.id, player))
                .collect(),
            active_match: None,
            history: UndoHistory::default(),
        }
    }

    /// Identifier of the session, regenerated whenever a tournament is opened.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Tournament currently open.
    pub fn tournament(&self) -> &Tournament {
        &self.tournament
    }

    /// Player by id, when it is part of the roster.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Replace the open tournament after it was edited elsewhere.
    ///
    /// The active match survives only if it still exists; the undo stack is
    /// dropped when the match set changed.
    pub fn replace_tournament(
        &mut self,
        tournament: Tournament,
        players: impl IntoIterator<Item = Player>,
    ) {
        let same_matches = self
            .tournament
            .matches
            .iter()
            .map(|m| m.id)
            .eq(tournament.matches.iter().map(|m| m.id));
        if !same_matches {
            self.history.clear();
        }
        if let Some(active) = self.active_match {
            if tournament.find_match(active).is_none() {
                self.active_match = None;
            }
        }
        self.tournament = tournament;
        self.players = players
            .into_iter()
            .map(|player| (player.id, player))
            .collect();
    }

    /// Replace or add one roster entry.
    pub fn upsert_player(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    /// Id of the match being played.
    pub fn active_match_id(&self) -> Option<MatchId> {
        self.active_match
    }

    /// Match being played.
    pub fn active_match(&self) -> Option<&Match> {
        self.active_match
            .and_then(|id| self.tournament.find_match(id))
    }

    /// Number of points that can be undone.
    pub fn undo_depth(&self) -> usize {
        self.history.len()
    }

    /// Enter a match. Any undo history from the previous match is discarded.
    pub fn play(&mut self, match_id: MatchId) -> Result<&Match, MatchError> {
        if self.tournament.find_match(match_id).is_none() {
            warn!(
                match_id,
                tournament_id = self.tournament.id,
                "cannot play unknown match"
            );
            return Err(MatchError::NotFound(match_id));
        }
        if self.active_match != Some(match_id) {
            self.history.clear();
        }
        self.active_match = Some(match_id);
        self.tournament
            .find_match(match_id)
            .ok_or(MatchError::NotFound(match_id))
    }

    /// Park the active match. Its score stays as is; playing it again resumes it.
    pub fn suspend(&mut self) -> Option<MatchId> {
        self.history.clear();
        self.active_match.take()
    }

    /// Run a match operation with the tournament rules and the undo stack.
    ///
    /// Returns the operation output together with a copy of the mutated match,
    /// ready to be persisted.
    pub fn with_match<T>(
        &mut self,
        match_id: MatchId,
        operation: impl FnOnce(&mut Match, &MatchContext<'_>, &mut UndoHistory) -> Result<T, MatchError>,
    ) -> Result<(T, Match), MatchError> {
        let tournament_id = self.tournament.id;
        let Some((current, ctx)) = self.tournament.match_with_context_mut(match_id) else {
            warn!(match_id, tournament_id, "match operation on unknown match");
            return Err(MatchError::NotFound(match_id));
        };
        let output = operation(current, &ctx, &mut self.history)?;
        Ok((output, current.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::state::model::{PointsToWin, Side, TournamentType};

    fn tournament() -> Tournament {
        Tournament {
            id: 1,
            name: "Club night".into(),
            points_to_win: PointsToWin::Eleven,
            kind: TournamentType::Single,
            is_locked: false,
            created_at: SystemTime::now(),
            player_ids: vec![10, 20, 30],
            teams: Vec::new(),
            matches: vec![
                Match::new(1, 1, 10, 20, 0),
                Match::new(2, 1, 10, 30, 1),
                Match::new(3, 1, 20, 30, 2),
            ],
        }
    }

    #[test]
    fn operations_on_unknown_match_are_rejected_without_mutation() {
        let mut session = ScoringSession::new(tournament(), Vec::new());
        let before = session.tournament().clone();
        let result = session.with_match(42, |m, _, _| Ok(m.swap_sides()));
        assert_eq!(result.unwrap_err(), MatchError::NotFound(42));
        assert!(session.play(42).is_err());
        assert_eq!(session.tournament(), &before);
    }

    #[test]
    fn suspend_keeps_score_and_clears_history() {
        let mut session = ScoringSession::new(tournament(), Vec::new());
        session.play(1).unwrap();
        session
            .with_match(1, |m, ctx, history| {
                m.set_first_server(ctx, Side::One)?;
                m.add_point(ctx, Side::Two, history)
            })
            .unwrap();
        assert_eq!(session.undo_depth(), 1);

        assert_eq!(session.suspend(), Some(1));
        assert!(session.active_match().is_none());
        assert_eq!(session.undo_depth(), 0);

        let resumed = session.play(1).unwrap();
        assert_eq!(resumed.score2, 1);
    }

    #[test]
    fn switching_matches_drops_undo_history() {
        let mut session = ScoringSession::new(tournament(), Vec::new());
        session.play(1).unwrap();
        session
            .with_match(1, |m, ctx, history| {
                m.set_first_server(ctx, Side::One)?;
                m.add_point(ctx, Side::One, history)
            })
            .unwrap();
        session.play(1).unwrap();
        assert_eq!(session.undo_depth(), 1);
        session.play(2).unwrap();
        assert_eq!(session.undo_depth(), 0);
    }

    #[test]
    fn replacing_tournament_clears_vanished_active_match() {
        let mut session = ScoringSession::new(tournament(), Vec::new());
        session.play(3).unwrap();
        let mut regenerated = tournament();
        regenerated.matches.truncate(1);
        session.replace_tournament(regenerated, Vec::new());
        assert_eq!(session.active_match_id(), None);
    }
}
