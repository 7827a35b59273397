use crate::domain::game::{GameAggregate, GameState};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A stored match. The `RwLock` is the per-match mutual-exclusion primitive:
/// the service holds its write guard for the whole read-modify-write critical
/// section, so at most one mutation per match is ever in flight.
pub type SharedGame = Arc<RwLock<GameAggregate>>;

/// Storage contract for matches. The engine only ever talks to this trait;
/// the in-memory implementation below is what the server composes.
#[allow(async_fn_in_trait)]
pub trait GameRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Option<SharedGame>;
    /// Persists the aggregate under `id`. Callers pass the id separately so
    /// they can save while still holding the aggregate's write guard.
    async fn save(&self, id: Uuid, game: &SharedGame);
    async fn delete(&self, id: Uuid) -> bool;
    /// Every match that is not finished or aborted.
    async fn get_all_active(&self) -> Vec<SharedGame>;
}

/// In-memory store keyed by game id.
#[derive(Debug, Default)]
pub struct InMemoryGameRepository {
    games: DashMap<Uuid, SharedGame>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self {
            games: DashMap::new(),
        }
    }
}

impl GameRepository for InMemoryGameRepository {
    async fn get_by_id(&self, id: Uuid) -> Option<SharedGame> {
        self.games.get(&id).map(|entry| entry.clone())
    }

    async fn save(&self, id: Uuid, game: &SharedGame) {
        self.games.insert(id, game.clone());
    }

    async fn delete(&self, id: Uuid) -> bool {
        self.games.remove(&id).is_some()
    }

    async fn get_all_active(&self) -> Vec<SharedGame> {
        let mut active = Vec::new();
        let all: Vec<SharedGame> = self
            .games
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for game in all {
            let state = game.read().await.state;
            if !matches!(state, GameState::Finished | GameState::Aborted) {
                active.push(game);
            }
        }
        active
    }
}
