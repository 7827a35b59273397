use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::error;
use uuid::Uuid;

use crate::api::models::{
    BurnPieceRequest, ColorParam, CreateGameRequest, GameInfo, GameSnapshot, JoinGameRequest,
    MovePieceRequest, RollResponse,
};
use crate::api::state::AppState;
use crate::application::error::GameServiceError;
use crate::domain::color::Color;

/// Actions on an existing match identify the actor through this header;
/// lobby actions carry the user id in the body instead.
const USER_ID_HEADER: &str = "x-user-id";

fn user_id_from(headers: &HeaderMap) -> Result<&str, Response> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            (StatusCode::BAD_REQUEST, "missing X-User-ID header").into_response()
        })
}

fn resolve_color(param: &ColorParam) -> Result<Color, Response> {
    param
        .resolve()
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "unknown color").into_response())
}

fn error_response(err: GameServiceError) -> Response {
    let status = match &err {
        GameServiceError::GameNotFound(_) => StatusCode::NOT_FOUND,
        GameServiceError::PlayerNotInGame { .. } => StatusCode::FORBIDDEN,
        GameServiceError::NotYourTurn { .. } => StatusCode::FORBIDDEN,
        GameServiceError::PreconditionFailed(_) => StatusCode::CONFLICT,
        GameServiceError::InvalidMove { .. } => StatusCode::BAD_REQUEST,
        GameServiceError::Internal(_) => {
            error!(%err, "engine invariant violated");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
        .into_response()
}

pub async fn create_game(
    State(state): State<AppState>,
    Json(payload): Json<CreateGameRequest>,
) -> Response {
    let color = match resolve_color(&payload.color) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let max_players = payload
        .max_players
        .unwrap_or(state.config.game.default_max_players);
    match state
        .service
        .create_new_game(&payload.user_id, color, max_players)
        .await
    {
        Ok(shared) => {
            let game = shared.read().await;
            (StatusCode::CREATED, Json(GameInfo::from_aggregate(&game))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub async fn join_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Json(payload): Json<JoinGameRequest>,
) -> Response {
    let color = match resolve_color(&payload.color) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match state.service.join_game(game_id, &payload.user_id, color).await {
        Ok(shared) => {
            let game = shared.read().await;
            (StatusCode::OK, Json(GameInfo::from_aggregate(&game))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub async fn start_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    let user_id = match user_id_from(&headers) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    match state.service.start_game(game_id, user_id).await {
        Ok(shared) => {
            let game = shared.read().await;
            (StatusCode::OK, Json(GameInfo::from_aggregate(&game))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub async fn get_game(State(state): State<AppState>, Path(game_id): Path<Uuid>) -> Response {
    match state.service.get_game(game_id).await {
        Ok(shared) => {
            let game = shared.read().await;
            (StatusCode::OK, Json(GameSnapshot::from_aggregate(&game))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub async fn list_games(State(state): State<AppState>) -> Response {
    let games = state.service.list_active_games().await;
    let mut infos = Vec::with_capacity(games.len());
    for shared in games {
        let game = shared.read().await;
        infos.push(GameInfo::from_aggregate(&game));
    }
    (StatusCode::OK, Json(infos)).into_response()
}

pub async fn roll_dice(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    let user_id = match user_id_from(&headers) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    match state.service.roll_dice(game_id, user_id).await {
        Ok((shared, (die1, die2), outcome, possible_moves)) => {
            let game = shared.read().await;
            let body = RollResponse {
                die1,
                die2,
                is_pair: die1 == die2,
                outcome,
                possible_moves,
                game: GameSnapshot::from_aggregate(&game),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub async fn move_piece(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<MovePieceRequest>,
) -> Response {
    let user_id = match user_id_from(&headers) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    match state
        .service
        .move_piece(
            game_id,
            user_id,
            &payload.piece_id,
            payload.target,
            payload.steps,
        )
        .await
    {
        Ok(shared) => {
            let game = shared.read().await;
            (StatusCode::OK, Json(GameSnapshot::from_aggregate(&game))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub async fn burn_piece(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<BurnPieceRequest>,
) -> Response {
    let user_id = match user_id_from(&headers) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    match state
        .service
        .handle_three_pairs_penalty(game_id, user_id, payload.piece_id.as_deref())
        .await
    {
        Ok(shared) => {
            let game = shared.read().await;
            (StatusCode::OK, Json(GameSnapshot::from_aggregate(&game))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub async fn pass_turn(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    let user_id = match user_id_from(&headers) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    match state.service.pass_player_turn(game_id, user_id).await {
        Ok(shared) => {
            let game = shared.read().await;
            (StatusCode::OK, Json(GameSnapshot::from_aggregate(&game))).into_response()
        }
        Err(err) => error_response(err),
    }
}
