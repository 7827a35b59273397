use crate::domain::color::Color;
use crate::domain::game::{GameAggregate, GameEvent, GameState};
use crate::domain::piece::Piece;
use crate::domain::rules::{CandidateMove, MoveResult};
use crate::domain::square::SquareId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A color on the wire: either its name (any casing) or its seat ordinal
/// 0..=3. Normalized to the domain enum here, at the boundary, and nowhere
/// else.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum ColorParam {
    Ordinal(u8),
    Name(String),
}

impl ColorParam {
    pub fn resolve(&self) -> Option<Color> {
        match self {
            ColorParam::Name(name) => Color::from_name(name),
            ColorParam::Ordinal(ordinal) => Color::from_ordinal(*ordinal),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct CreateGameRequest {
    pub user_id: String,
    pub color: ColorParam,
    pub max_players: Option<usize>,
}

#[derive(Deserialize, Debug)]
pub struct JoinGameRequest {
    pub user_id: String,
    pub color: ColorParam,
}

#[derive(Deserialize, Debug)]
pub struct MovePieceRequest {
    pub piece_id: String,
    pub target: SquareId,
    pub steps: u8,
}

#[derive(Deserialize, Debug)]
pub struct BurnPieceRequest {
    pub piece_id: Option<String>,
}

/// Roster-level view of a match, returned by the lobby endpoints and the
/// active-games listing.
#[derive(Serialize, Debug)]
pub struct GameInfo {
    pub game_id: Uuid,
    pub state: GameState,
    pub players: Vec<PlayerInfo>,
    pub current_player_count: usize,
    pub max_players: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
pub struct PlayerInfo {
    pub user_id: String,
    pub color: Color,
}

#[derive(Serialize, Debug)]
pub struct RollResponse {
    pub die1: u8,
    pub die2: u8,
    pub is_pair: bool,
    pub outcome: MoveResult,
    pub possible_moves: HashMap<Uuid, Vec<CandidateMove>>,
    pub game: GameSnapshot,
}

#[derive(Serialize, Debug)]
pub struct ApiPlayer {
    pub user_id: String,
    pub color: Color,
    pub is_current_turn: bool,
    pub has_won: bool,
    pub consecutive_pairs: u8,
    pub pieces: Vec<Piece>,
}

/// Full view of a match, rebuilt from the aggregate on every request.
#[derive(Serialize, Debug)]
pub struct GameSnapshot {
    pub game_id: Uuid,
    pub state: GameState,
    pub turn_order: Vec<Color>,
    pub current_turn: Option<Color>,
    pub last_roll: Option<(u8, u8)>,
    pub dice_roll_count: u8,
    pub doubles_count: u8,
    pub moves_made_this_roll: u8,
    pub winner: Option<Color>,
    pub players: Vec<ApiPlayer>,
    pub occupancy: HashMap<String, Vec<Uuid>>,
    pub events: Vec<GameEvent>,
}

/// Recent history only; the full log stays server-side.
const SNAPSHOT_EVENT_WINDOW: usize = 20;

impl GameSnapshot {
    pub fn from_aggregate(game: &GameAggregate) -> Self {
        let mut players: Vec<ApiPlayer> = game
            .turn_order
            .iter()
            .filter_map(|&color| game.player(color))
            .map(|player| ApiPlayer {
                user_id: player.user_id.clone(),
                color: player.color,
                is_current_turn: game.current_turn == Some(player.color),
                has_won: player.has_won,
                consecutive_pairs: player.consecutive_pairs,
                pieces: player.pieces.clone(),
            })
            .collect();
        // Players not yet in the turn order (lobby phase) still show up.
        for player in game.players.values() {
            if !players.iter().any(|p| p.color == player.color) {
                players.push(ApiPlayer {
                    user_id: player.user_id.clone(),
                    color: player.color,
                    is_current_turn: false,
                    has_won: player.has_won,
                    consecutive_pairs: player.consecutive_pairs,
                    pieces: player.pieces.clone(),
                });
            }
        }

        let mut occupancy: HashMap<String, Vec<Uuid>> = HashMap::new();
        for player in game.players.values() {
            for piece in &player.pieces {
                if let Some(square) = piece.position {
                    occupancy
                        .entry(square.to_string())
                        .or_default()
                        .push(piece.id);
                }
            }
        }

        let skip = game.events.len().saturating_sub(SNAPSHOT_EVENT_WINDOW);
        Self {
            game_id: game.id,
            state: game.state,
            turn_order: game.turn_order.iter().copied().collect(),
            current_turn: game.current_turn,
            last_roll: game.last_roll,
            dice_roll_count: game.dice_roll_count,
            doubles_count: game.doubles_count,
            moves_made_this_roll: game.moves_made_this_roll,
            winner: game.winner,
            players,
            occupancy,
            events: game.events[skip..].to_vec(),
        }
    }
}

impl GameInfo {
    pub fn from_aggregate(game: &GameAggregate) -> Self {
        Self {
            game_id: game.id,
            state: game.state,
            players: game
                .players
                .values()
                .map(|p| PlayerInfo {
                    user_id: p.user_id.clone(),
                    color: p.color,
                })
                .collect(),
            current_player_count: game.players.len(),
            max_players: game.max_players,
            created_at: game.created_at,
        }
    }
}
