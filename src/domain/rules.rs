use crate::domain::color::Color;
use crate::domain::game::GameAggregate;
use crate::domain::piece::Piece;
use crate::domain::square::{SquareId, SquareKind};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Classification of a validated roll or candidate move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveResult {
    Ok,
    /// Destination already holds two of the mover's own pieces.
    BlockedByOwn,
    Capture,
    /// Overshoot from the goal square; reaching heaven needs an exact roll.
    ExactRollNeeded,
    OutOfBounds,
    JailExitSuccess,
    JailExitFailNoPairs,
    PieceWins,
    InvalidPiece,
    InvalidRoll,
    NotYourTurn,
    ThreePairsBurn,
}

/// One enumerated option for a piece: where it would land, how the landing
/// classifies, and how many steps it consumes.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct CandidateMove {
    pub target: SquareId,
    pub result: MoveResult,
    pub steps: u8,
}

/// The rules engine: pair-streak bookkeeping plus enumeration and
/// classification of candidate moves. Jail exits are deliberately absent from
/// the enumeration; the service performs them in bulk when pairs are rolled,
/// which changes turn-continuation semantics and must stay that way.
#[derive(Debug, Default)]
pub struct MoveValidator;

impl MoveValidator {
    pub fn new() -> Self {
        Self
    }

    /// Updates the player's consecutive-pairs streak for a fresh roll. The
    /// third pair in a row reports the burn penalty; the counter is left for
    /// the penalty handler to reset after the burn resolves.
    pub fn validate_roll(
        &self,
        game: &mut GameAggregate,
        color: Color,
        d1: u8,
        d2: u8,
    ) -> MoveResult {
        let Some(player) = game.player_mut(color) else {
            return MoveResult::InvalidPiece;
        };

        if d1 == d2 {
            player.increment_consecutive_pairs();
            let streak = player.consecutive_pairs;
            game.doubles_count = streak;
            if streak == 3 {
                MoveResult::ThreePairsBurn
            } else {
                MoveResult::Ok
            }
        } else {
            player.reset_consecutive_pairs();
            MoveResult::Ok
        }
    }

    /// Enumerates every candidate move for each of `color`'s pieces on the
    /// board. Jailed and home pieces are skipped. Illegal-but-informative
    /// overshoots (`ExactRollNeeded`) are included so clients can explain
    /// why the piece cannot finish.
    pub fn possible_moves(
        &self,
        game: &GameAggregate,
        color: Color,
        d1: u8,
        d2: u8,
    ) -> HashMap<Uuid, Vec<CandidateMove>> {
        let mut moves = HashMap::new();
        if game.current_turn != Some(color) {
            return moves;
        }
        let Some(player) = game.player(color) else {
            return moves;
        };

        let is_pair = d1 == d2;
        let steps_to_try = Self::step_candidates(d1, d2);

        for piece in player.pieces_in_play() {
            let mut options = Vec::new();
            for &steps in &steps_to_try {
                let (result, target) = self.evaluate_move(game, piece, steps, is_pair);
                if matches!(result, MoveResult::InvalidPiece | MoveResult::InvalidRoll) {
                    continue;
                }
                if let Some(target) = target {
                    options.push(CandidateMove {
                        target,
                        result,
                        steps,
                    });
                }
            }
            if !options.is_empty() {
                moves.insert(piece.id, options);
            }
        }
        moves
    }

    /// Distinct step counts a roll offers, largest first. A pair must be
    /// played as its combined value; otherwise either die or both together.
    pub fn step_candidates(d1: u8, d2: u8) -> Vec<u8> {
        let mut steps = if d1 == d2 {
            vec![d1 + d2]
        } else {
            vec![d1, d2, d1 + d2]
        };
        steps.sort_unstable_by(|a, b| b.cmp(a));
        steps.dedup();
        steps
    }

    /// Classifies moving `piece` by `steps`. Returns the result kind and the
    /// destination, when one exists. No state is mutated here; the service
    /// executes side effects only after full validation.
    pub fn evaluate_move(
        &self,
        game: &GameAggregate,
        piece: &Piece,
        steps: u8,
        is_pair: bool,
    ) -> (MoveResult, Option<SquareId>) {
        let board = &game.board;

        if piece.in_jail {
            // Jail exit is a teleport to the color's exit square, not a walk.
            if !is_pair {
                return (MoveResult::JailExitFailNoPairs, None);
            }
            return (
                MoveResult::JailExitSuccess,
                Some(board.exit_square_id(piece.color)),
            );
        }

        let Some(current) = piece.position else {
            return (MoveResult::InvalidPiece, None);
        };

        let Some(target) = board.advance(current, steps, piece.color) else {
            // From the goal square an overshoot is worth reporting: the
            // player needs an exact roll to finish.
            let at_goal = board
                .square(current)
                .is_some_and(|sq| sq.kind == SquareKind::Goal);
            if at_goal {
                return (MoveResult::ExactRollNeeded, Some(SquareId::Heaven));
            }
            return (MoveResult::OutOfBounds, None);
        };

        if matches!(target, SquareId::Heaven) {
            return (MoveResult::PieceWins, Some(target));
        }

        // Strict stacking cap: never a third own piece on one square.
        if game.own_occupant_count(target, piece.color) >= 2 {
            return (MoveResult::BlockedByOwn, None);
        }

        if !game.occupants_of_other_colors(target, piece.color).is_empty() {
            if board.is_safe_for(target, piece.color) {
                // Safe squares grant coexistence, never capture.
                return (MoveResult::Ok, Some(target));
            }
            return (MoveResult::Capture, Some(target));
        }

        (MoveResult::Ok, Some(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_rolls_collapse_to_combined_value() {
        assert_eq!(MoveValidator::step_candidates(4, 4), vec![8]);
    }

    #[test]
    fn mixed_rolls_offer_three_distinct_counts() {
        assert_eq!(MoveValidator::step_candidates(2, 5), vec![7, 5, 2]);
        assert_eq!(MoveValidator::step_candidates(1, 2), vec![3, 2, 1]);
    }
}
