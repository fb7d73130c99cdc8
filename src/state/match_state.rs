use thiserror::Error;

use crate::state::{
    model::{
        Match, MatchContext, MatchId, PlayerId, PointsToWin, RotationState, Side, TournamentType,
    },
    serve_rotation::{recompute_rotation, rotation_order, singles_server},
};

/// Lifecycle phases of a match, derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// No first server selected yet; scoring is not permitted.
    NotStarted,
    /// Points are being played and the serve rotates.
    InProgress,
    /// Result saved; the match is frozen.
    Completed,
}

/// Operations that can be attempted on a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchAction {
    /// Choose which side serves first.
    SelectFirstServer,
    /// Award a point.
    AddPoint,
    /// Take a point back without touching the undo history.
    SubtractPoint,
    /// Restore the snapshot taken before the last awarded point.
    Undo,
    /// Flip the displayed left/right sides.
    SwapSides,
    /// Save the result and freeze the match.
    Finalize,
}

/// Error returned when an action is not valid in the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {action:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the match was in when the action was received.
    pub from: MatchPhase,
    /// The rejected action.
    pub action: MatchAction,
}

/// Failures of match operations. None of them mutate the match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// Action not allowed in the current phase.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// Action allowed by phase but not by the current score.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The referenced match is not part of the session.
    #[error("match {0} not found")]
    NotFound(MatchId),
}

/// Check whether `action` may be applied while the match is in `from`.
pub fn ensure_allowed(from: MatchPhase, action: MatchAction) -> Result<(), InvalidTransition> {
    use MatchAction::*;
    use MatchPhase::*;

    let allowed = match (from, action) {
        (_, SwapSides) => true,
        (NotStarted, SelectFirstServer | Undo) => true,
        (NotStarted, _) => false,
        (InProgress, _) => true,
        (Completed, _) => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(InvalidTransition { from, action })
    }
}

/// Winning side, if any: at least `points_to_win` points and a lead of two.
pub fn check_win_condition(score1: u32, score2: u32, points_to_win: PointsToWin) -> Option<Side> {
    let target = points_to_win.value();
    if score1 >= target && score1 >= score2 + 2 {
        Some(Side::One)
    } else if score2 >= target && score2 >= score1 + 2 {
        Some(Side::Two)
    } else {
        None
    }
}

/// Pre-mutation copy of the serve-relevant fields, pushed before every awarded point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSnapshot {
    /// Match the snapshot belongs to.
    pub match_id: MatchId,
    /// Side 1 points before the change.
    pub score1: u32,
    /// Side 2 points before the change.
    pub score2: u32,
    /// Serving player before the change.
    pub serving_player: Option<PlayerId>,
    /// First server before the change.
    pub first_server: Option<Side>,
    /// Doubles rotation before the change.
    pub double_rotation_state: Option<RotationState>,
}

/// Undo stack of the scoring session.
#[derive(Debug, Clone, Default)]
pub struct UndoHistory {
    entries: Vec<ScoreSnapshot>,
}

impl UndoHistory {
    /// Record a snapshot.
    pub fn push(&mut self, snapshot: ScoreSnapshot) {
        self.entries.push(snapshot);
    }

    /// Pop the latest snapshot only if it belongs to `match_id`.
    pub fn pop_for(&mut self, match_id: MatchId) -> Option<ScoreSnapshot> {
        match self.entries.last() {
            Some(last) if last.match_id == match_id => self.entries.pop(),
            _ => None,
        }
    }

    /// Forget every snapshot.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing can be undone.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hook payload emitted after every awarded point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointScored {
    /// Match that changed.
    pub match_id: MatchId,
    /// Side that won the rally.
    pub side: Side,
    /// Side 1 points after the change.
    pub score1: u32,
    /// Side 2 points after the change.
    pub score2: u32,
    /// Player serving the next rally.
    pub serving_player: Option<PlayerId>,
    /// Winner once the win condition holds.
    pub winner: Option<Side>,
}

/// One selectable option when choosing the first server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOption {
    /// Side the option selects.
    pub side: Side,
    /// Players of that side.
    pub player_ids: Vec<PlayerId>,
}

impl Match {
    /// Current lifecycle phase.
    pub fn phase(&self) -> MatchPhase {
        if self.completed {
            MatchPhase::Completed
        } else if self.first_server.is_none() {
            MatchPhase::NotStarted
        } else {
            MatchPhase::InProgress
        }
    }

    /// Winning side under `points_to_win`, if any.
    pub fn winner(&self, points_to_win: PointsToWin) -> Option<Side> {
        check_win_condition(self.score1, self.score2, points_to_win)
    }

    fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            match_id: self.id,
            score1: self.score1,
            score2: self.score2,
            serving_player: self.serving_player,
            first_server: self.first_server,
            double_rotation_state: self.double_rotation_state.clone(),
        }
    }

    /// Sides that can be picked as first server. Only valid before the match starts.
    pub fn serve_selection(&self, ctx: &MatchContext<'_>) -> Result<Vec<ServeOption>, MatchError> {
        if self.first_server.is_some() {
            return Err(MatchError::InvalidState(
                "first server has already been selected".into(),
            ));
        }
        ensure_allowed(self.phase(), MatchAction::SelectFirstServer)?;

        Ok([Side::One, Side::Two]
            .into_iter()
            .map(|side| ServeOption {
                side,
                player_ids: ctx.side_players(self, side),
            })
            .collect())
    }

    /// Choose the side serving first and derive the initial serving player.
    ///
    /// Re-selection is accepted until the first point is played.
    pub fn set_first_server(&mut self, ctx: &MatchContext<'_>, side: Side) -> Result<(), MatchError> {
        ensure_allowed(self.phase(), MatchAction::SelectFirstServer)?;
        if self.total_score() > 0 {
            return Err(MatchError::InvalidState(
                "first server cannot change once scoring has started".into(),
            ));
        }

        self.first_server = Some(side);
        self.double_rotation_state = None;
        self.recalculate_service_state(ctx);
        Ok(())
    }

    /// Award a point to `side`, recording the previous state in `history`.
    pub fn add_point(
        &mut self,
        ctx: &MatchContext<'_>,
        side: Side,
        history: &mut UndoHistory,
    ) -> Result<PointScored, MatchError> {
        ensure_allowed(self.phase(), MatchAction::AddPoint)?;
        if let Some(winner) = self.winner(ctx.points_to_win) {
            return Err(MatchError::InvalidState(format!(
                "side {winner} has already won this match"
            )));
        }

        history.push(self.snapshot());
        *self.score_mut(side) += 1;
        self.recalculate_service_state(ctx);

        Ok(PointScored {
            match_id: self.id,
            side,
            score1: self.score1,
            score2: self.score2,
            serving_player: self.serving_player,
            winner: self.winner(ctx.points_to_win),
        })
    }

    /// Take a point away from `side`. Returns `false` when the score is already zero.
    pub fn subtract_point(&mut self, ctx: &MatchContext<'_>, side: Side) -> Result<bool, MatchError> {
        ensure_allowed(self.phase(), MatchAction::SubtractPoint)?;
        let score = self.score_mut(side);
        if *score == 0 {
            return Ok(false);
        }
        *score -= 1;
        self.recalculate_service_state(ctx);
        Ok(true)
    }

    /// Restore the snapshot taken before the last awarded point of this match.
    ///
    /// Returns `false` when there is nothing to undo for this match.
    pub fn undo(&mut self, ctx: &MatchContext<'_>, history: &mut UndoHistory) -> Result<bool, MatchError> {
        ensure_allowed(self.phase(), MatchAction::Undo)?;
        let Some(snapshot) = history.pop_for(self.id) else {
            return Ok(false);
        };

        self.score1 = snapshot.score1;
        self.score2 = snapshot.score2;
        self.serving_player = snapshot.serving_player;
        self.first_server = snapshot.first_server;
        self.double_rotation_state = snapshot.double_rotation_state;
        if self.first_server.is_some() {
            self.recalculate_service_state(ctx);
        }
        Ok(true)
    }

    /// Flip the displayed sides. Returns the new flag.
    pub fn swap_sides(&mut self) -> bool {
        self.sides_swapped = !self.sides_swapped;
        self.sides_swapped
    }

    /// Save the result. Finalizing an already completed match is a no-op.
    pub fn finalize(&mut self, ctx: &MatchContext<'_>) -> Result<Side, MatchError> {
        if self.completed {
            return self.winner(ctx.points_to_win).ok_or_else(|| {
                MatchError::InvalidState("completed match has no winner".into())
            });
        }
        ensure_allowed(self.phase(), MatchAction::Finalize)?;
        let winner = self
            .winner(ctx.points_to_win)
            .ok_or_else(|| MatchError::InvalidState("no side has won yet".into()))?;
        self.completed = true;
        Ok(winner)
    }

    /// Administrative edit: set both scores directly and reopen the match.
    pub fn override_score(&mut self, ctx: &MatchContext<'_>, score1: u32, score2: u32) {
        self.score1 = score1;
        self.score2 = score2;
        self.completed = false;
        self.recalculate_service_state(ctx);
    }

    /// Derive `serving_player` (and the doubles rotation) from the score.
    ///
    /// Idempotent; the doubles order is kept once built.
    pub fn recalculate_service_state(&mut self, ctx: &MatchContext<'_>) {
        let Some(first_server) = self.first_server else {
            self.serving_player = None;
            self.double_rotation_state = None;
            return;
        };

        match ctx.kind {
            TournamentType::Single => {
                let side = singles_server(self.score1, self.score2, first_server, ctx.points_to_win);
                self.serving_player = ctx.side_players(self, side).first().copied();
                self.double_rotation_state = None;
            }
            TournamentType::Double => {
                let order = match self.double_rotation_state.take() {
                    Some(state) if !state.order.is_empty() => state.order,
                    _ => rotation_order(
                        &ctx.side_players(self, Side::One),
                        &ctx.side_players(self, Side::Two),
                        first_server,
                    ),
                };
                let rotation = recompute_rotation(order, self.score1, self.score2, ctx.points_to_win);
                self.serving_player = rotation.serving_player();
                self.double_rotation_state = Some(rotation);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::model::Team;

    fn singles() -> (Match, Vec<Team>) {
        (Match::new(1, 1, 10, 20, 0), Vec::new())
    }

    fn doubles() -> (Match, Vec<Team>) {
        let teams = vec![
            Team {
                id: 100,
                player_ids: [1, 2],
                order: 0,
            },
            Team {
                id: 200,
                player_ids: [3, 4],
                order: 1,
            },
        ];
        (Match::new(2, 1, 100, 200, 0), teams)
    }

    fn ctx(kind: TournamentType, points_to_win: PointsToWin, teams: &[Team]) -> MatchContext<'_> {
        MatchContext {
            kind,
            points_to_win,
            teams,
        }
    }

    #[test]
    fn win_condition_requires_target_and_two_point_lead() {
        let ptw = PointsToWin::Eleven;
        assert_eq!(check_win_condition(11, 9, ptw), Some(Side::One));
        assert_eq!(check_win_condition(11, 10, ptw), None);
        assert_eq!(check_win_condition(12, 10, ptw), Some(Side::One));
        assert_eq!(check_win_condition(10, 10, ptw), None);
        assert_eq!(check_win_condition(3, 11, ptw), Some(Side::Two));
        assert_eq!(check_win_condition(10, 8, ptw), None);
        assert_eq!(check_win_condition(21, 19, PointsToWin::TwentyOne), Some(Side::One));
        assert_eq!(check_win_condition(11, 0, PointsToWin::TwentyOne), None);
    }

    #[test]
    fn win_condition_exhaustive() {
        for ptw in [PointsToWin::Eleven, PointsToWin::TwentyOne] {
            let target = ptw.value();
            for s1 in 0..30 {
                for s2 in 0..30 {
                    let expected = if s1 >= target && s1 >= s2 + 2 {
                        Some(Side::One)
                    } else if s2 >= target && s2 >= s1 + 2 {
                        Some(Side::Two)
                    } else {
                        None
                    };
                    assert_eq!(check_win_condition(s1, s2, ptw), expected);
                }
            }
        }
    }

    #[test]
    fn transitions_follow_phase_table() {
        assert!(ensure_allowed(MatchPhase::NotStarted, MatchAction::SelectFirstServer).is_ok());
        assert!(ensure_allowed(MatchPhase::NotStarted, MatchAction::SwapSides).is_ok());
        assert!(ensure_allowed(MatchPhase::InProgress, MatchAction::AddPoint).is_ok());
        assert!(ensure_allowed(MatchPhase::Completed, MatchAction::SwapSides).is_ok());

        let err = ensure_allowed(MatchPhase::NotStarted, MatchAction::AddPoint).unwrap_err();
        assert_eq!(err.from, MatchPhase::NotStarted);
        assert_eq!(err.action, MatchAction::AddPoint);
        assert!(ensure_allowed(MatchPhase::Completed, MatchAction::Undo).is_err());
        assert!(ensure_allowed(MatchPhase::Completed, MatchAction::AddPoint).is_err());
    }

    #[test]
    fn scoring_requires_first_server() {
        let (mut m, teams) = singles();
        let ctx = ctx(TournamentType::Single, PointsToWin::Eleven, &teams);
        let mut history = UndoHistory::default();

        match m.add_point(&ctx, Side::One, &mut history) {
            Err(MatchError::InvalidTransition(InvalidTransition { from, .. })) => {
                assert_eq!(from, MatchPhase::NotStarted)
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(m.score1, 0);
        assert!(history.is_empty());
    }

    #[test]
    fn serve_selection_lists_both_sides() {
        let (m, teams) = doubles();
        let ctx = ctx(TournamentType::Double, PointsToWin::Eleven, &teams);
        let options = m.serve_selection(&ctx).unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].player_ids, vec![1, 2]);
        assert_eq!(options[1].side, Side::Two);
    }

    #[test]
    fn singles_first_server_sets_serving_player() {
        let (mut m, teams) = singles();
        let ctx = ctx(TournamentType::Single, PointsToWin::Eleven, &teams);
        m.set_first_server(&ctx, Side::Two).unwrap();
        assert_eq!(m.first_server, Some(Side::Two));
        assert_eq!(m.serving_player, Some(20));
        assert!(m.double_rotation_state.is_none());
        assert!(m.serve_selection(&ctx).is_err());
    }

    #[test]
    fn first_server_cannot_change_after_scoring() {
        let (mut m, teams) = singles();
        let ctx = ctx(TournamentType::Single, PointsToWin::Eleven, &teams);
        let mut history = UndoHistory::default();
        m.set_first_server(&ctx, Side::One).unwrap();
        m.set_first_server(&ctx, Side::Two).unwrap();
        m.add_point(&ctx, Side::One, &mut history).unwrap();

        let before = m.clone();
        assert!(matches!(
            m.set_first_server(&ctx, Side::One),
            Err(MatchError::InvalidState(_))
        ));
        assert_eq!(m, before);
    }

    #[test]
    fn doubles_first_server_builds_rotation() {
        let (mut m, teams) = doubles();
        let ctx = ctx(TournamentType::Double, PointsToWin::Eleven, &teams);
        m.set_first_server(&ctx, Side::One).unwrap();
        let rotation = m.double_rotation_state.clone().unwrap();
        let order: Vec<_> = rotation.order.iter().map(|e| e.player_id).collect();
        assert_eq!(order, vec![1, 3, 2, 4]);
        assert_eq!(m.serving_player, Some(1));
    }

    #[test]
    fn doubles_serve_rotates_every_two_points() {
        let (mut m, teams) = doubles();
        let ctx = ctx(TournamentType::Double, PointsToWin::Eleven, &teams);
        let mut history = UndoHistory::default();
        m.set_first_server(&ctx, Side::One).unwrap();

        let mut servers = Vec::new();
        for point in 0..8 {
            let side = if point % 2 == 0 { Side::One } else { Side::Two };
            servers.push(m.add_point(&ctx, side, &mut history).unwrap().serving_player);
        }
        assert_eq!(
            servers,
            vec![
                Some(1),
                Some(3),
                Some(3),
                Some(2),
                Some(2),
                Some(4),
                Some(4),
                Some(1)
            ]
        );
    }

    #[test]
    fn doubles_rotation_initialized_on_first_point_when_missing() {
        let (mut m, teams) = doubles();
        let ctx = ctx(TournamentType::Double, PointsToWin::Eleven, &teams);
        let mut history = UndoHistory::default();
        m.first_server = Some(Side::Two);
        m.add_point(&ctx, Side::One, &mut history).unwrap();
        let rotation = m.double_rotation_state.clone().unwrap();
        assert_eq!(rotation.order[0].player_id, 3);
        assert_eq!(rotation.order.len(), 4);
    }

    #[test]
    fn undo_restores_previous_state_for_singles() {
        let (mut m, teams) = singles();
        let ctx = ctx(TournamentType::Single, PointsToWin::Eleven, &teams);
        let mut history = UndoHistory::default();
        m.set_first_server(&ctx, Side::One).unwrap();

        for point in 0..25u32 {
            if m.winner(ctx.points_to_win).is_some() {
                break;
            }
            let side = if point % 3 == 0 { Side::Two } else { Side::One };
            let before = m.clone();
            m.add_point(&ctx, side, &mut history).unwrap();
            let mut undone = m.clone();
            assert!(undone.undo(&ctx, &mut history.clone()).unwrap());
            assert_eq!(undone, before);
        }
    }

    #[test]
    fn undo_restores_previous_state_for_doubles_across_deuce() {
        let (mut m, teams) = doubles();
        let ctx = ctx(TournamentType::Double, PointsToWin::TwentyOne, &teams);
        let mut history = UndoHistory::default();
        m.set_first_server(&ctx, Side::Two).unwrap();

        for point in 0..60u32 {
            if m.winner(ctx.points_to_win).is_some() {
                break;
            }
            let side = if point % 2 == 0 { Side::One } else { Side::Two };
            let before = m.clone();
            m.add_point(&ctx, side, &mut history).unwrap();
            assert!(m.undo(&ctx, &mut history).unwrap());
            assert_eq!(m, before);
            m.add_point(&ctx, side, &mut history).unwrap();
        }
        assert_eq!(m.score1, 30);
        assert_eq!(m.score2, 30);
    }

    #[test]
    fn undo_ignores_snapshots_of_other_matches() {
        let (mut m, teams) = singles();
        let ctx = ctx(TournamentType::Single, PointsToWin::Eleven, &teams);
        let mut history = UndoHistory::default();
        m.set_first_server(&ctx, Side::One).unwrap();
        let mut other = Match::new(99, 1, 10, 20, 1);
        other.set_first_server(&ctx, Side::One).unwrap();
        other.add_point(&ctx, Side::One, &mut history).unwrap();

        assert!(!m.undo(&ctx, &mut history).unwrap());
        assert_eq!(history.len(), 1);
        assert!(!m.undo(&ctx, &mut UndoHistory::default()).unwrap());
    }

    #[test]
    fn subtract_point_stops_at_zero_and_skips_history() {
        let (mut m, teams) = singles();
        let ctx = ctx(TournamentType::Single, PointsToWin::Eleven, &teams);
        let mut history = UndoHistory::default();
        m.set_first_server(&ctx, Side::One).unwrap();
        assert!(!m.subtract_point(&ctx, Side::Two).unwrap());

        m.add_point(&ctx, Side::Two, &mut history).unwrap();
        m.add_point(&ctx, Side::Two, &mut history).unwrap();
        assert_eq!(m.serving_player, Some(20));
        assert!(m.subtract_point(&ctx, Side::Two).unwrap());
        assert_eq!(m.score2, 1);
        assert_eq!(m.serving_player, Some(10));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn recalculation_is_idempotent() {
        let (mut m, teams) = doubles();
        let ctx = ctx(TournamentType::Double, PointsToWin::TwentyOne, &teams);
        m.set_first_server(&ctx, Side::One).unwrap();
        for (score1, score2) in [(0, 0), (3, 4), (19, 20), (20, 20), (24, 23)] {
            m.score1 = score1;
            m.score2 = score2;
            m.recalculate_service_state(&ctx);
            let first = m.clone();
            m.recalculate_service_state(&ctx);
            assert_eq!(m, first);
        }
    }

    #[test]
    fn singles_match_to_eleven_end_to_end() {
        let (mut m, teams) = singles();
        let ctx = ctx(TournamentType::Single, PointsToWin::Eleven, &teams);
        let mut history = UndoHistory::default();
        m.set_first_server(&ctx, Side::One).unwrap();

        for _ in 0..9 {
            let scored = m.add_point(&ctx, Side::One, &mut history).unwrap();
            assert_eq!(scored.winner, None);
            let scored = m.add_point(&ctx, Side::Two, &mut history).unwrap();
            assert_eq!(scored.winner, None);
        }
        let scored = m.add_point(&ctx, Side::One, &mut history).unwrap();
        assert_eq!((scored.score1, scored.score2, scored.winner), (10, 9, None));
        let scored = m.add_point(&ctx, Side::One, &mut history).unwrap();
        assert_eq!((scored.score1, scored.score2), (11, 9));
        assert_eq!(scored.winner, Some(Side::One));

        assert!(matches!(
            m.add_point(&ctx, Side::Two, &mut history),
            Err(MatchError::InvalidState(_))
        ));
        assert_eq!(m.finalize(&ctx).unwrap(), Side::One);
        assert!(m.completed);
        assert_eq!(m.phase(), MatchPhase::Completed);
        assert!(m.add_point(&ctx, Side::Two, &mut history).is_err());
        assert!(m.undo(&ctx, &mut history).is_err());
        assert_eq!((m.score1, m.score2), (11, 9));
        assert_eq!(m.finalize(&ctx).unwrap(), Side::One);
    }

    #[test]
    fn finalize_requires_a_winner() {
        let (mut m, teams) = singles();
        let ctx = ctx(TournamentType::Single, PointsToWin::Eleven, &teams);
        m.set_first_server(&ctx, Side::One).unwrap();
        m.score1 = 11;
        m.score2 = 10;
        assert!(matches!(m.finalize(&ctx), Err(MatchError::InvalidState(_))));
        assert!(!m.completed);
    }

    #[test]
    fn override_score_reopens_match() {
        let (mut m, teams) = singles();
        let ctx = ctx(TournamentType::Single, PointsToWin::Eleven, &teams);
        m.set_first_server(&ctx, Side::One).unwrap();
        m.score1 = 11;
        m.finalize(&ctx).unwrap();

        m.override_score(&ctx, 9, 11);
        assert!(!m.completed);
        assert_eq!(m.phase(), MatchPhase::InProgress);
        assert_eq!(m.winner(ctx.points_to_win), Some(Side::Two));
        assert_eq!(m.serving_player, Some(10));
    }

    #[test]
    fn swap_sides_is_cosmetic() {
        let (mut m, teams) = singles();
        let ctx = ctx(TournamentType::Single, PointsToWin::Eleven, &teams);
        m.set_first_server(&ctx, Side::One).unwrap();
        let serving = m.serving_player;
        assert!(m.swap_sides());
        assert_eq!(m.serving_player, serving);
        assert_eq!(m.side1_ref, 10);
        assert!(!m.swap_sides());
    }
}
