use crate::application::game_service::GameService;
use crate::config::AppConfig;
use crate::infrastructure::repository::InMemoryGameRepository;
use std::sync::Arc;

/// Shared handler state. The service owns the repository and dice; handlers
/// only ever clone the Arc.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GameService<InMemoryGameRepository>>,
    pub config: AppConfig,
}
