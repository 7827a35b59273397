use crate::domain::color::Color;
use crate::domain::piece::Piece;
use uuid::Uuid;

/// Pieces each player controls.
pub const PIECES_PER_PLAYER: usize = 4;

/// A participant in a match: an opaque user id, a color, and four pieces.
#[derive(Clone, Debug)]
pub struct Player {
    pub user_id: String,
    pub color: Color,
    pub pieces: Vec<Piece>,
    pub has_won: bool,
    /// Consecutive pairs rolled this turn; three triggers the burn penalty.
    pub consecutive_pairs: u8,
}

impl Player {
    pub fn new(user_id: impl Into<String>, color: Color) -> Self {
        Self {
            user_id: user_id.into(),
            color,
            pieces: (0..PIECES_PER_PLAYER as u8)
                .map(|i| Piece::new(i, color))
                .collect(),
            has_won: false,
            consecutive_pairs: 0,
        }
    }

    pub fn jailed_pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.iter().filter(|p| p.in_jail)
    }

    pub fn jailed_count(&self) -> usize {
        self.jailed_pieces().count()
    }

    /// Pieces currently on the board (not jailed, not home).
    pub fn pieces_in_play(&self) -> impl Iterator<Item = &Piece> {
        self.pieces
            .iter()
            .filter(|p| !p.in_jail && !p.reached_heaven)
    }

    pub fn pieces_in_heaven(&self) -> usize {
        self.pieces.iter().filter(|p| p.reached_heaven).count()
    }

    /// Marks and reports the win when all four pieces are home. Idempotent.
    pub fn check_win_condition(&mut self) -> bool {
        if self.pieces_in_heaven() == PIECES_PER_PLAYER {
            self.has_won = true;
        }
        self.has_won
    }

    pub fn piece_by_index(&self, index: u8) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.index == index)
    }

    /// Looks a piece up by its UUID string; malformed input is a miss, not
    /// an error.
    pub fn piece_by_uuid(&self, id: &str) -> Option<&Piece> {
        let id = Uuid::parse_str(id).ok()?;
        self.pieces.iter().find(|p| p.id == id)
    }

    pub fn reset_consecutive_pairs(&mut self) {
        self.consecutive_pairs = 0;
    }

    pub fn increment_consecutive_pairs(&mut self) {
        self.consecutive_pairs += 1;
    }
}
