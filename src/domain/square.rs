use crate::domain::color::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one of the 97 squares on the board.
///
/// Main-track indices and passage coordinates never collide, and there is
/// exactly one shared heaven square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SquareId {
    /// Main-track index in `[0, 68)`.
    Track(u8),
    /// Per-color passage square; `step` in `[0, 7)`, step 6 is the goal.
    Passage { color: Color, step: u8 },
    /// Final destination shared by all colors.
    Heaven,
}

impl fmt::Display for SquareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SquareId::Track(i) => write!(f, "track:{i}"),
            SquareId::Passage { color, step } => write!(f, "passage:{color}:{step}"),
            SquareId::Heaven => f.write_str("heaven"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SquareKind {
    Normal,
    /// Where a color's pieces land when leaving jail. Safe for its owner.
    Exit,
    /// Capture-immune for every color.
    Safe,
    /// Last main-track square before a color's passage.
    PassageEntry,
    Passage,
    /// Passage step 6, the square a piece must leave with an exact roll.
    Goal,
    Heaven,
}

/// Static description of a board square. Occupancy is tracked by the game
/// aggregate, not here; the board stays immutable and freely shared.
#[derive(Clone, Copy, Debug)]
pub struct Square {
    pub id: SquareId,
    pub kind: SquareKind,
    pub color: Option<Color>,
}

impl Square {
    pub fn new(id: SquareId, kind: SquareKind, color: Option<Color>) -> Self {
        Self { id, kind, color }
    }

    /// Whether this square grants capture immunity to a piece of `color`,
    /// independent of occupancy.
    pub fn is_safe_for(&self, color: Color) -> bool {
        match self.kind {
            SquareKind::Safe | SquareKind::Heaven => true,
            SquareKind::Exit | SquareKind::PassageEntry | SquareKind::Passage | SquareKind::Goal => {
                self.color == Some(color)
            }
            SquareKind::Normal => false,
        }
    }
}
