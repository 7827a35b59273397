use serde::{Deserialize, Serialize};
use std::fmt;

/// The four player colors, in fixed seating order around the board.
///
/// The ordinal order (RED = 0 .. YELLOW = 3) determines each color's
/// exit square on the main track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
}

pub const ALL_COLORS: [Color; 4] = [Color::Red, Color::Green, Color::Blue, Color::Yellow];

impl Color {
    pub fn ordinal(&self) -> u8 {
        match self {
            Color::Red => 0,
            Color::Green => 1,
            Color::Blue => 2,
            Color::Yellow => 3,
        }
    }

    /// Parses a color from its wire name, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "RED" => Some(Color::Red),
            "GREEN" => Some(Color::Green),
            "BLUE" => Some(Color::Blue),
            "YELLOW" => Some(Color::Yellow),
            _ => None,
        }
    }

    /// Parses a color from its wire ordinal (0..=3).
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        ALL_COLORS.get(ordinal as usize).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Color::Red => "RED",
            Color::Green => "GREEN",
            Color::Blue => "BLUE",
            Color::Yellow => "YELLOW",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
