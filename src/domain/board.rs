use crate::domain::color::{Color, ALL_COLORS};
use crate::domain::square::{Square, SquareId, SquareKind};
use std::collections::HashMap;

/// Number of squares on the shared main track.
pub const MAIN_TRACK_LEN: u8 = 68;
/// Main-track squares per board side (one per color).
pub const SQUARES_PER_SIDE: u8 = 17;
/// Passage squares per color; steps 0..=5 plus the goal at step 6.
pub const PASSAGE_LEN: u8 = 7;

/// Main-track index of a color's exit square.
pub fn exit_index(color: Color) -> u8 {
    SQUARES_PER_SIDE * color.ordinal()
}

/// Main-track index of a color's passage entry, one square before its exit.
pub fn passage_entry_index(color: Color) -> u8 {
    (exit_index(color) + MAIN_TRACK_LEN - 1) % MAIN_TRACK_LEN
}

/// The immutable Parqués board: 68 main-track squares, 4 passages of 7, and
/// one shared heaven square. Constructed once per match and only queried
/// afterwards, so it can be shared across tasks without locking.
#[derive(Debug)]
pub struct Board {
    squares: HashMap<SquareId, Square>,
    paths: HashMap<Color, Vec<SquareId>>,
}

impl Board {
    pub fn new() -> Self {
        let mut squares = HashMap::new();

        for i in 0..MAIN_TRACK_LEN {
            let (kind, color) = Self::classify_track_square(i);
            squares.insert(SquareId::Track(i), Square::new(SquareId::Track(i), kind, color));
        }

        for color in ALL_COLORS {
            for step in 0..PASSAGE_LEN {
                let id = SquareId::Passage { color, step };
                let kind = if step == PASSAGE_LEN - 1 {
                    SquareKind::Goal
                } else {
                    SquareKind::Passage
                };
                squares.insert(id, Square::new(id, kind, Some(color)));
            }
        }

        squares.insert(
            SquareId::Heaven,
            Square::new(SquareId::Heaven, SquareKind::Heaven, None),
        );

        let paths = ALL_COLORS
            .iter()
            .map(|&color| (color, Self::build_path(color)))
            .collect();

        Self { squares, paths }
    }

    fn classify_track_square(index: u8) -> (SquareKind, Option<Color>) {
        for color in ALL_COLORS {
            if index == exit_index(color) {
                return (SquareKind::Exit, Some(color));
            }
            if index == passage_entry_index(color) {
                return (SquareKind::PassageEntry, Some(color));
            }
        }
        // Two extra safe squares per side, at offsets 6 and 12 from each exit.
        if index % SQUARES_PER_SIDE == 6 || index % SQUARES_PER_SIDE == 12 {
            return (SquareKind::Safe, None);
        }
        (SquareKind::Normal, None)
    }

    /// Full traversal for `color`: exit, around the track to its passage
    /// entry, the seven passage squares, then heaven.
    fn build_path(color: Color) -> Vec<SquareId> {
        let mut path = Vec::with_capacity((MAIN_TRACK_LEN + PASSAGE_LEN + 1) as usize);
        let entry = passage_entry_index(color);
        let mut idx = exit_index(color);
        loop {
            path.push(SquareId::Track(idx));
            if idx == entry {
                break;
            }
            idx = (idx + 1) % MAIN_TRACK_LEN;
        }
        for step in 0..PASSAGE_LEN {
            path.push(SquareId::Passage { color, step });
        }
        path.push(SquareId::Heaven);
        path
    }

    pub fn square(&self, id: SquareId) -> Option<&Square> {
        self.squares.get(&id)
    }

    pub fn path_for(&self, color: Color) -> &[SquareId] {
        &self.paths[&color]
    }

    pub fn exit_square_id(&self, color: Color) -> SquareId {
        SquareId::Track(exit_index(color))
    }

    /// Destination after advancing `steps` from `from` along `color`'s path,
    /// or `None` when the move is impossible (overshoot past heaven, moving
    /// from heaven, or a passage square of the wrong color).
    pub fn advance(&self, from: SquareId, steps: u8, color: Color) -> Option<SquareId> {
        if steps == 0 {
            return None;
        }
        match from {
            SquareId::Track(start) => {
                let entry = passage_entry_index(color);
                let mut pos = start;
                for taken in 1..=steps {
                    pos = (pos + 1) % MAIN_TRACK_LEN;
                    if pos == entry {
                        // Divert into the passage with whatever steps remain.
                        // Landing exactly on the entry already counts as the
                        // first passage square.
                        let remaining = steps - taken;
                        if remaining == 0 {
                            return Some(SquareId::Passage { color, step: 0 });
                        }
                        if remaining <= PASSAGE_LEN {
                            return Some(SquareId::Passage {
                                color,
                                step: remaining - 1,
                            });
                        }
                        return None;
                    }
                }
                Some(SquareId::Track(pos))
            }
            SquareId::Passage {
                color: passage_color,
                step,
            } => {
                if passage_color != color {
                    // A piece can never legally sit in another color's passage.
                    return None;
                }
                let target = step + steps;
                if target < PASSAGE_LEN {
                    Some(SquareId::Passage { color, step: target })
                } else if target == PASSAGE_LEN {
                    Some(SquareId::Heaven)
                } else {
                    None
                }
            }
            SquareId::Heaven => None,
        }
    }

    /// Capture-immunity classification for a square, see [`Square::is_safe_for`].
    pub fn is_safe_for(&self, id: SquareId, color: Color) -> bool {
        self.square(id).is_some_and(|sq| sq.is_safe_for(color))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
