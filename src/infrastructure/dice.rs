use rand::Rng;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Source of dice rolls. Injected into the service so tests can script
/// exact sequences.
pub trait DiceRoller: Send + Sync {
    /// Two dice, each in `1..=6`.
    fn roll(&self) -> (u8, u8);
}

/// Production roller backed by the thread-local RNG.
#[derive(Debug, Default)]
pub struct RandomDice;

impl DiceRoller for RandomDice {
    fn roll(&self) -> (u8, u8) {
        let mut rng = rand::thread_rng();
        (rng.gen_range(1..=6), rng.gen_range(1..=6))
    }
}

/// Deterministic roller that replays a fixed sequence, then falls back to
/// (1, 2). Used by the integration tests.
#[derive(Debug, Default)]
pub struct ScriptedDice {
    rolls: Mutex<VecDeque<(u8, u8)>>,
}

impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = (u8, u8)>) -> Self {
        Self {
            rolls: Mutex::new(rolls.into_iter().collect()),
        }
    }

    pub fn push(&self, roll: (u8, u8)) {
        if let Ok(mut rolls) = self.rolls.lock() {
            rolls.push_back(roll);
        }
    }
}

impl DiceRoller for ScriptedDice {
    fn roll(&self) -> (u8, u8) {
        self.rolls
            .lock()
            .ok()
            .and_then(|mut rolls| rolls.pop_front())
            .unwrap_or((1, 2))
    }
}
