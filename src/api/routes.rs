use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::{
    burn_piece, create_game, get_game, join_game, list_games, move_piece, pass_turn, roll_dice,
    start_game,
};
use crate::api::state::AppState;

pub fn app_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/games", post(create_game).get(list_games))
        .route("/games/:game_id", get(get_game))
        .route("/games/:game_id/join", post(join_game))
        .route("/games/:game_id/start", post(start_game))
        .route("/games/:game_id/roll", post(roll_dice))
        .route("/games/:game_id/move", post(move_piece))
        .route("/games/:game_id/burn", post(burn_piece))
        .route("/games/:game_id/pass", post(pass_turn));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
