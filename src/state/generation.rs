//! Tournament composition rules and round-robin match generation.

use std::{collections::HashSet, ops::RangeInclusive};

use thiserror::Error;

use crate::state::model::{
    Match, MatchId, PlayerId, Team, TeamId, Tournament, TournamentId, TournamentType,
};

/// Allowed number of players in a singles tournament.
pub const SINGLES_PLAYERS: RangeInclusive<usize> = 2..=8;
/// Allowed number of players in a doubles tournament.
pub const DOUBLES_PLAYERS: RangeInclusive<usize> = 4..=16;

/// Malformed tournament composition. Lists every violation found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tournament composition: {}", violations.join("; "))]
pub struct ValidationError {
    /// Human readable violations, in detection order.
    pub violations: Vec<String>,
}

/// Reasons a tournament update is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    /// Player count, parity or duplicates are wrong.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// Players or type changed on a locked tournament.
    #[error("tournament is locked; players and type cannot change")]
    Locked,
    /// Type changed after scores were recorded.
    #[error("tournament type cannot change once a match has points or is completed")]
    TypeChangeAfterProgress,
}

/// Validate the player list for `kind`.
pub fn validate_composition(
    kind: TournamentType,
    player_ids: &[PlayerId],
) -> Result<(), ValidationError> {
    let mut violations = Vec::new();
    let count = player_ids.len();

    match kind {
        TournamentType::Single => {
            if !SINGLES_PLAYERS.contains(&count) {
                violations.push(format!(
                    "singles require {} to {} players (got {count})",
                    SINGLES_PLAYERS.start(),
                    SINGLES_PLAYERS.end()
                ));
            }
        }
        TournamentType::Double => {
            if !DOUBLES_PLAYERS.contains(&count) {
                violations.push(format!(
                    "doubles require {} to {} players (got {count})",
                    DOUBLES_PLAYERS.start(),
                    DOUBLES_PLAYERS.end()
                ));
            }
            if count % 2 != 0 {
                violations.push(format!("doubles require an even number of players (got {count})"));
            }
        }
    }

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for id in player_ids {
        if !seen.insert(*id) && reported.insert(*id) {
            violations.push(format!("player {id} is listed more than once"));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}

/// Pair consecutive players into teams. An odd trailing player is dropped.
pub fn split_into_teams(player_ids: &[PlayerId]) -> Vec<[PlayerId; 2]> {
    player_ids
        .chunks_exact(2)
        .map(|pair| [pair[0], pair[1]])
        .collect()
}

/// Round-robin pairings before identifiers are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairings {
    kind: TournamentType,
    player_ids: Vec<PlayerId>,
    teams: Vec<[PlayerId; 2]>,
    pairs: Vec<(usize, usize)>,
}

/// Every unordered pair `(i, j)` with `i < j`, outer index ascending.
fn round_robin(count: usize) -> Vec<(usize, usize)> {
    (0..count)
        .flat_map(|i| ((i + 1)..count).map(move |j| (i, j)))
        .collect()
}

/// Build the schedule: players against players for singles, teams against teams for doubles.
pub fn generate_pairings(kind: TournamentType, player_ids: &[PlayerId]) -> Pairings {
    let teams = match kind {
        TournamentType::Single => Vec::new(),
        TournamentType::Double => split_into_teams(player_ids),
    };
    let competitors = match kind {
        TournamentType::Single => player_ids.len(),
        TournamentType::Double => teams.len(),
    };

    Pairings {
        kind,
        player_ids: player_ids.to_vec(),
        teams,
        pairs: round_robin(competitors),
    }
}

impl Pairings {
    /// Number of team identifiers needed by [`Pairings::materialize`].
    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    /// Number of match identifiers needed by [`Pairings::materialize`].
    pub fn match_count(&self) -> usize {
        self.pairs.len()
    }

    /// Assign consecutive identifiers starting at `first_team_id` / `first_match_id`.
    pub fn materialize(
        &self,
        tournament_id: TournamentId,
        first_team_id: TeamId,
        first_match_id: MatchId,
    ) -> (Vec<Team>, Vec<Match>) {
        let teams: Vec<Team> = self
            .teams
            .iter()
            .enumerate()
            .map(|(index, player_ids)| Team {
                id: first_team_id + index as i64,
                player_ids: *player_ids,
                order: index as u32,
            })
            .collect();

        let reference = |index: usize| match self.kind {
            TournamentType::Single => self.player_ids[index],
            TournamentType::Double => teams[index].id,
        };

        let matches = self
            .pairs
            .iter()
            .enumerate()
            .map(|(order, &(left, right))| {
                Match::new(
                    first_match_id + order as i64,
                    tournament_id,
                    reference(left),
                    reference(right),
                    order as u32,
                )
            })
            .collect();

        (teams, matches)
    }
}

/// Decide whether an update of type or players needs a new schedule.
///
/// Returns `Ok(true)` when the matches must be regenerated, `Ok(false)` when
/// composition is unchanged.
pub fn plan_composition_change(
    current: &Tournament,
    kind: TournamentType,
    player_ids: &[PlayerId],
) -> Result<bool, CompositionError> {
    let type_changed = current.kind != kind;
    let players_changed = current.player_ids != player_ids;
    if !type_changed && !players_changed {
        return Ok(false);
    }
    if current.is_locked {
        return Err(CompositionError::Locked);
    }
    validate_composition(kind, player_ids)?;
    if type_changed && current.has_progress() {
        return Err(CompositionError::TypeChangeAfterProgress);
    }
    Ok(true)
}

/// Strip a trailing ` (n)` suffix, then return the first name not present in `existing`.
pub fn unique_tournament_name<'a>(
    name: &str,
    existing: impl IntoIterator<Item = &'a str>,
) -> String {
    let base = strip_copy_suffix(name.trim());
    let taken: HashSet<&str> = existing.into_iter().collect();
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base} ({n})"))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}

fn strip_copy_suffix(name: &str) -> &str {
    let Some(open) = name.rfind(" (") else {
        return name;
    };
    let suffix = &name[open + 2..];
    match suffix.strip_suffix(')') {
        Some(digits) if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => {
            &name[..open]
        }
        _ => name,
    }
}

/// Reorder the upcoming (not completed) matches to follow `ordered_ids`.
///
/// Completed matches keep their slot; upcoming ones reuse the remaining slots.
pub fn reorder_upcoming(
    matches: &mut [Match],
    ordered_ids: &[MatchId],
) -> Result<(), ValidationError> {
    let upcoming: HashSet<MatchId> = matches
        .iter()
        .filter(|m| !m.completed)
        .map(|m| m.id)
        .collect();
    let requested: HashSet<MatchId> = ordered_ids.iter().copied().collect();

    let mut violations = Vec::new();
    if requested.len() != ordered_ids.len() {
        violations.push("match order lists a match more than once".to_string());
    }
    let mut unknown: Vec<MatchId> = requested.difference(&upcoming).copied().collect();
    unknown.sort_unstable();
    for id in unknown {
        violations.push(format!("match {id} is not an upcoming match of this tournament"));
    }
    let mut missing: Vec<MatchId> = upcoming.difference(&requested).copied().collect();
    missing.sort_unstable();
    for id in missing {
        violations.push(format!("upcoming match {id} is missing from the new order"));
    }
    if !violations.is_empty() {
        return Err(ValidationError { violations });
    }

    let mut slots: Vec<u32> = matches
        .iter()
        .filter(|m| !m.completed)
        .map(|m| m.match_order)
        .collect();
    slots.sort_unstable();

    for (slot, id) in slots.into_iter().zip(ordered_ids) {
        if let Some(target) = matches.iter_mut().find(|m| m.id == *id) {
            target.match_order = slot;
        }
    }
    matches.sort_by_key(|m| m.match_order);
    Ok(())
}

/// Player order used when a tournament is copied.
///
/// Doubles reverse each half of the list so the copy pairs players into new teams.
pub fn copy_player_order(kind: TournamentType, player_ids: &[PlayerId]) -> Vec<PlayerId> {
    let mut ids = player_ids.to_vec();
    if kind == TournamentType::Double && ids.len() >= 4 {
        let half = ids.len() / 2;
        let (first, second) = ids.split_at_mut(half);
        first.reverse();
        second.reverse();
    }
    ids
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::state::model::PointsToWin;

    fn tournament(kind: TournamentType, player_ids: Vec<PlayerId>) -> Tournament {
        let pairings = generate_pairings(kind, &player_ids);
        let (teams, matches) = pairings.materialize(1, 1, 1);
        Tournament {
            id: 1,
            name: "League".into(),
            points_to_win: PointsToWin::Eleven,
            kind,
            is_locked: false,
            created_at: SystemTime::now(),
            player_ids,
            teams,
            matches,
        }
    }

    #[test]
    fn singles_round_robin_follows_player_order() {
        let pairings = generate_pairings(TournamentType::Single, &[10, 20, 30, 40]);
        let (teams, matches) = pairings.materialize(5, 1, 100);
        assert!(teams.is_empty());
        let refs: Vec<_> = matches.iter().map(|m| (m.side1_ref, m.side2_ref)).collect();
        assert_eq!(
            refs,
            vec![(10, 20), (10, 30), (10, 40), (20, 30), (20, 40), (30, 40)]
        );
        assert_eq!(matches[0].id, 100);
        assert_eq!(matches[5].match_order, 5);
        assert!(matches.iter().all(|m| m.tournament_id == 5));
    }

    #[test]
    fn doubles_pairs_teams_and_drops_odd_player() {
        let pairings = generate_pairings(TournamentType::Double, &[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(pairings.team_count(), 3);
        assert_eq!(pairings.match_count(), 3);
        let (teams, matches) = pairings.materialize(1, 50, 1);
        assert_eq!(teams[0].player_ids, [1, 2]);
        assert_eq!(teams[2].player_ids, [5, 6]);
        let refs: Vec<_> = matches.iter().map(|m| (m.side1_ref, m.side2_ref)).collect();
        assert_eq!(refs, vec![(50, 51), (50, 52), (51, 52)]);
    }

    #[test]
    fn validation_lists_every_violation() {
        let err = validate_composition(TournamentType::Double, &[1, 2, 2]).unwrap_err();
        assert_eq!(err.violations.len(), 3);
        assert!(err.to_string().contains("even number"));

        let err = validate_composition(TournamentType::Single, &[1; 9]).unwrap_err();
        assert_eq!(err.violations.len(), 2);

        assert!(validate_composition(TournamentType::Single, &[1, 2]).is_ok());
        assert!(validate_composition(TournamentType::Double, &[1, 2, 3, 4]).is_ok());
        assert!(validate_composition(TournamentType::Single, &[1]).is_err());
    }

    #[test]
    fn composition_change_triggers() {
        let current = tournament(TournamentType::Single, vec![1, 2, 3, 4]);
        assert_eq!(
            plan_composition_change(&current, TournamentType::Single, &[1, 2, 3, 4]),
            Ok(false)
        );
        assert_eq!(
            plan_composition_change(&current, TournamentType::Single, &[2, 1, 3, 4]),
            Ok(true)
        );
        assert_eq!(
            plan_composition_change(&current, TournamentType::Double, &[1, 2, 3, 4]),
            Ok(true)
        );
    }

    #[test]
    fn type_change_after_progress_is_rejected() {
        let mut current = tournament(TournamentType::Single, vec![1, 2, 3, 4]);
        current.matches[2].score2 = 1;
        assert_eq!(
            plan_composition_change(&current, TournamentType::Double, &[1, 2, 3, 4]),
            Err(CompositionError::TypeChangeAfterProgress)
        );
        assert_eq!(
            plan_composition_change(&current, TournamentType::Single, &[1, 2, 3]),
            Ok(true)
        );
    }

    #[test]
    fn locked_tournament_rejects_composition_changes() {
        let mut current = tournament(TournamentType::Single, vec![1, 2]);
        current.is_locked = true;
        assert_eq!(
            plan_composition_change(&current, TournamentType::Single, &[1, 2, 3]),
            Err(CompositionError::Locked)
        );
        assert_eq!(
            plan_composition_change(&current, TournamentType::Single, &[1, 2]),
            Ok(false)
        );
    }

    #[test]
    fn invalid_composition_wins_over_progress_check() {
        let current = tournament(TournamentType::Single, vec![1, 2]);
        assert!(matches!(
            plan_composition_change(&current, TournamentType::Double, &[1, 2, 3]),
            Err(CompositionError::Invalid(_))
        ));
    }

    #[test]
    fn unique_names_pick_smallest_free_suffix() {
        let existing = ["Spring Cup", "Spring Cup (2)", "Spring Cup (4)"];
        assert_eq!(unique_tournament_name("Autumn", existing), "Autumn");
        assert_eq!(unique_tournament_name("Spring Cup", existing), "Spring Cup (3)");
        assert_eq!(unique_tournament_name("Spring Cup (2)", existing), "Spring Cup (3)");
        assert_eq!(unique_tournament_name("Cup (final)", ["Cup (final)"]), "Cup (final) (2)");
    }

    #[test]
    fn reorder_moves_only_upcoming_matches() {
        let mut current = tournament(TournamentType::Single, vec![1, 2, 3]);
        current.matches[0].completed = true;
        reorder_upcoming(&mut current.matches, &[3, 2]).unwrap();
        let order: Vec<_> = current.matches.iter().map(|m| (m.id, m.match_order)).collect();
        assert_eq!(order, vec![(1, 0), (3, 1), (2, 2)]);
    }

    #[test]
    fn reorder_rejects_incomplete_lists() {
        let mut current = tournament(TournamentType::Single, vec![1, 2, 3]);
        current.matches[0].completed = true;
        let err = reorder_upcoming(&mut current.matches, &[1, 3]).unwrap_err();
        assert_eq!(err.violations.len(), 2);
    }

    #[test]
    fn copy_reshuffles_doubles_teams_only() {
        assert_eq!(
            copy_player_order(TournamentType::Double, &[1, 2, 3, 4, 5, 6]),
            vec![3, 2, 1, 6, 5, 4]
        );
        assert_eq!(
            copy_player_order(TournamentType::Single, &[1, 2, 3]),
            vec![1, 2, 3]
        );
    }
}
