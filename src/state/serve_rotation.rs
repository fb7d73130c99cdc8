//! Who serves next, derived purely from the score.
//!
//! Every function here is deterministic and side-effect free so the serving
//! state can be recomputed after any mutation, including undo and
//! administrative score edits.

use crate::state::model::{PlayerId, PointsToWin, RotationEntry, RotationState, Side};

/// Both sides reached `points_to_win - 1`: a two point lead is required and serve changes every point.
pub fn is_deuce(score1: u32, score2: u32, points_to_win: PointsToWin) -> bool {
    let threshold = points_to_win.deuce_threshold();
    score1 >= threshold && score2 >= threshold
}

/// Serving side of a singles match.
///
/// Outside deuce the serve changes every two points. At deuce it changes
/// every point, anchored on the side that would have served when deuce was
/// reached.
pub fn singles_server(
    score1: u32,
    score2: u32,
    first_server: Side,
    points_to_win: PointsToWin,
) -> Side {
    let threshold = points_to_win.deuce_threshold();
    if is_deuce(score1, score2, points_to_win) {
        let points_into_deuce = (score1 - threshold) + (score2 - threshold);
        let server_at_deuce = if threshold % 2 == 0 {
            first_server
        } else {
            first_server.other()
        };
        return if points_into_deuce % 2 == 0 {
            server_at_deuce
        } else {
            server_at_deuce.other()
        };
    }

    let service_block = (score1 + score2) / 2;
    if service_block % 2 == 0 {
        first_server
    } else {
        first_server.other()
    }
}

/// Number of consecutive points served by one player in doubles.
pub fn doubles_block_size(score1: u32, score2: u32, points_to_win: PointsToWin) -> u32 {
    if is_deuce(score1, score2, points_to_win) {
        1
    } else {
        match points_to_win {
            PointsToWin::TwentyOne => 5,
            PointsToWin::Eleven => 2,
        }
    }
}

/// Fixed serving sequence `[team1[0], team2[0], team1[1], team2[1]]`, rotated so
/// that the first entry belongs to `first_server`.
///
/// Missing players are skipped so incomplete teams still produce a usable order.
pub fn rotation_order(
    team1: &[PlayerId],
    team2: &[PlayerId],
    first_server: Side,
) -> Vec<RotationEntry> {
    let slots = [
        (team1.first(), Side::One),
        (team2.first(), Side::Two),
        (team1.get(1), Side::One),
        (team2.get(1), Side::Two),
    ];
    let mut order: Vec<RotationEntry> = slots
        .into_iter()
        .filter_map(|(player, side)| {
            player.map(|&player_id| RotationEntry { player_id, side })
        })
        .collect();

    if let Some(start) = order.iter().position(|entry| entry.side == first_server) {
        order.rotate_left(start);
    }
    order
}

/// Position in `order` for the absolute score.
///
/// The block size shrinks to one at deuce, so the index is always derived
/// from the total instead of being advanced point by point.
pub fn recompute_rotation(
    order: Vec<RotationEntry>,
    score1: u32,
    score2: u32,
    points_to_win: PointsToWin,
) -> RotationState {
    let total = score1 + score2;
    if total == 0 || order.is_empty() {
        return RotationState {
            order,
            current_index: 0,
            points_served_this_turn: 0,
        };
    }

    let block_size = doubles_block_size(score1, score2, points_to_win);
    let block_index = (total / block_size) as usize;
    let points_served_this_turn = match total % block_size {
        0 => block_size,
        remainder => remainder,
    };

    RotationState {
        current_index: block_index % order.len(),
        order,
        points_served_this_turn,
    }
}
