pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;

use std::sync::Arc;

use crate::application::game_service::GameService;
use crate::config::AppConfig;
use crate::domain::rules::MoveValidator;
use crate::infrastructure::dice::RandomDice;
use crate::infrastructure::repository::InMemoryGameRepository;
use tracing::info;

pub async fn start_server() {
    let config = AppConfig::load();

    let service = GameService::new(
        InMemoryGameRepository::new(),
        MoveValidator::new(),
        Box::new(RandomDice),
    );
    let app_state = state::AppState {
        service: Arc::new(service),
        config: config.clone(),
    };

    let app = routes::app_router(app_state);

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .unwrap();
    info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}
