use crate::domain::board::{Board, PASSAGE_LEN};
use crate::domain::color::Color;
use crate::domain::square::{SquareId, SquareKind};
use serde::Serialize;
use uuid::Uuid;

/// A single token. Exactly one of `in_jail`, `reached_heaven`, or
/// `position.is_some()` holds at any time; jail and heaven are the two
/// off-board states.
#[derive(Clone, Debug, Serialize)]
pub struct Piece {
    pub id: Uuid,
    /// Player-local index, 0..=3.
    pub index: u8,
    pub color: Color,
    pub position: Option<SquareId>,
    pub in_jail: bool,
    pub reached_heaven: bool,
    /// Progress through the passage: 0 on the main track, `step + 1` on a
    /// passage square, 7 once in heaven.
    pub path_advance: u8,
}

impl Piece {
    pub fn new(index: u8, color: Color) -> Self {
        Self {
            id: Uuid::new_v4(),
            index,
            color,
            position: None,
            in_jail: true,
            reached_heaven: false,
            path_advance: 0,
        }
    }

    /// Places the piece on `target`. Landing on heaven clears the position
    /// and marks the piece home; passage squares track passage progress.
    pub fn move_to(&mut self, target: SquareId, kind: SquareKind) {
        self.in_jail = false;
        match kind {
            SquareKind::Heaven => {
                self.reached_heaven = true;
                self.position = None;
                self.path_advance = PASSAGE_LEN;
            }
            SquareKind::Passage | SquareKind::Goal => {
                self.position = Some(target);
                if let SquareId::Passage { step, .. } = target {
                    self.path_advance = step + 1;
                }
            }
            _ => {
                self.position = Some(target);
                self.path_advance = 0;
            }
        }
    }

    /// Returns the piece to jail, whether captured or burned.
    pub fn send_to_jail(&mut self) {
        self.in_jail = true;
        self.position = None;
        self.reached_heaven = false;
        self.path_advance = 0;
    }

    /// A jailed or home piece cannot be captured; otherwise safety is the
    /// board's classification of its current square.
    pub fn is_currently_safe(&self, board: &Board) -> bool {
        if self.in_jail || self.reached_heaven {
            return true;
        }
        match self.position {
            Some(square) => board.is_safe_for(square, self.color),
            None => false,
        }
    }
}
