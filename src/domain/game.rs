use crate::domain::board::Board;
use crate::domain::color::Color;
use crate::domain::piece::Piece;
use crate::domain::player::Player;
use crate::domain::square::{SquareId, SquareKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    WaitingPlayers,
    ReadyToStart,
    InProgress,
    Finished,
    /// Reserved for external administrative shutdown; nothing in the engine
    /// drives this transition.
    Aborted,
}

/// Entry in the aggregate's audit log. Every mutating operation appends one;
/// a broadcast layer would tap this stream.
#[derive(Clone, Debug, Serialize)]
pub struct GameEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

/// Stable reference to a piece: its owner's color plus the player-local
/// index. The occupancy index stores these instead of aliasing the pieces
/// themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PieceRef {
    pub color: Color,
    pub index: u8,
}

/// The Game Aggregate Root.
/// Owns the roster, turn order, dice bookkeeping, event log, and the single
/// source of truth for which piece stands on which square. All mutation goes
/// through the service's per-match critical section.
#[derive(Debug)]
pub struct GameAggregate {
    pub id: Uuid,
    pub state: GameState,
    pub board: Board,
    pub players: HashMap<Color, Player>,
    pub turn_order: VecDeque<Color>,
    pub current_turn: Option<Color>,
    pub dice_roll_count: u8,
    pub last_roll: Option<(u8, u8)>,
    pub doubles_count: u8,
    /// Moves consumed from the current non-pair roll; two ends the turn.
    pub moves_made_this_roll: u8,
    pub max_players: usize,
    pub winner: Option<Color>,
    pub events: Vec<GameEvent>,
    occupancy: HashMap<SquareId, Vec<PieceRef>>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl GameAggregate {
    pub fn new(id: Uuid, max_players: usize) -> Self {
        let now = Utc::now();
        let mut game = Self {
            id,
            state: GameState::WaitingPlayers,
            board: Board::new(),
            players: HashMap::new(),
            turn_order: VecDeque::new(),
            current_turn: None,
            dice_roll_count: 0,
            last_roll: None,
            doubles_count: 0,
            moves_made_this_roll: 0,
            max_players,
            winner: None,
            events: Vec::new(),
            occupancy: HashMap::new(),
            created_at: now,
            last_activity_at: now,
        };
        game.push_event(
            "game_created",
            json!({ "game_id": id, "max_players": max_players }),
        );
        game
    }

    pub fn push_event(&mut self, kind: &str, payload: Value) {
        self.events.push(GameEvent {
            timestamp: Utc::now(),
            kind: kind.to_string(),
            payload,
        });
        self.last_activity_at = Utc::now();
    }

    // --- roster & lifecycle -------------------------------------------------

    /// Adds a player if the game is still waiting, the color is free, and
    /// there is room. Reaching two players makes the game ready to start.
    pub fn add_player(&mut self, player: Player) -> bool {
        if self.players.len() >= self.max_players
            || self.players.contains_key(&player.color)
            || !matches!(
                self.state,
                GameState::WaitingPlayers | GameState::ReadyToStart
            )
        {
            return false;
        }

        let color = player.color;
        let user_id = player.user_id.clone();
        self.turn_order.push_back(color);
        self.players.insert(color, player);

        if self.players.len() >= MIN_PLAYERS {
            self.state = GameState::ReadyToStart;
        }

        self.push_event(
            "player_joined",
            json!({ "user_id": user_id, "color": color }),
        );
        true
    }

    /// Removes a player before the game starts, downgrading back to
    /// WaitingPlayers when the roster drops below two.
    pub fn remove_player(&mut self, color: Color) -> bool {
        let Some(removed) = self.players.remove(&color) else {
            return false;
        };
        self.turn_order.retain(|&c| c != color);

        if self.state == GameState::ReadyToStart && self.players.len() < MIN_PLAYERS {
            self.state = GameState::WaitingPlayers;
        }
        if self.current_turn == Some(color) && self.state == GameState::InProgress {
            self.current_turn = None;
        }

        self.push_event(
            "player_left",
            json!({ "user_id": removed.user_id, "color": color }),
        );
        true
    }

    /// Moves ReadyToStart into InProgress; the first color in join order
    /// takes the first turn.
    pub fn start(&mut self) -> bool {
        if self.state != GameState::ReadyToStart || self.players.len() < MIN_PLAYERS {
            return false;
        }
        let Some(&first) = self.turn_order.front() else {
            return false;
        };

        self.current_turn = Some(first);
        self.state = GameState::InProgress;
        self.doubles_count = 0;
        if let Some(player) = self.players.get_mut(&first) {
            player.reset_consecutive_pairs();
        }

        let order: Vec<Color> = self.turn_order.iter().copied().collect();
        self.push_event("game_started", json!({ "turn_order": order }));
        true
    }

    /// Rotates the turn order and clears all per-turn dice bookkeeping.
    pub fn next_turn(&mut self) {
        if self.current_turn.is_none() || self.turn_order.is_empty() {
            return;
        }
        self.turn_order.rotate_left(1);
        let Some(&next) = self.turn_order.front() else {
            return;
        };
        self.current_turn = Some(next);
        self.doubles_count = 0;
        self.last_roll = None;
        self.dice_roll_count = 0;
        self.moves_made_this_roll = 0;

        if let Some(player) = self.players.get_mut(&next) {
            player.reset_consecutive_pairs();
        }
        self.push_event("next_turn", json!({ "player_color": next }));
    }

    /// Declares the first player with all four pieces home the winner.
    pub fn check_for_winner(&mut self) -> Option<Color> {
        let winner = self
            .players
            .iter_mut()
            .find_map(|(&c, p)| p.check_win_condition().then_some(c))?;
        self.winner = Some(winner);
        self.state = GameState::Finished;
        self.push_event("game_finished", json!({ "winner": winner }));
        Some(winner)
    }

    // --- lookups ------------------------------------------------------------

    pub fn player(&self, color: Color) -> Option<&Player> {
        self.players.get(&color)
    }

    pub fn player_mut(&mut self, color: Color) -> Option<&mut Player> {
        self.players.get_mut(&color)
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(&self.current_turn?)
    }

    pub fn player_by_user_id(&self, user_id: &str) -> Option<&Player> {
        self.players.values().find(|p| p.user_id == user_id)
    }

    pub fn piece(&self, piece: PieceRef) -> Option<&Piece> {
        self.players
            .get(&piece.color)?
            .pieces
            .iter()
            .find(|p| p.index == piece.index)
    }

    fn piece_mut(&mut self, piece: PieceRef) -> Option<&mut Piece> {
        self.players
            .get_mut(&piece.color)?
            .pieces
            .iter_mut()
            .find(|p| p.index == piece.index)
    }

    // --- occupancy index ----------------------------------------------------
    //
    // Which piece stands on which square is one fact with two views (the
    // index below and each piece's `position`). The helpers here are the only
    // code that writes either, keeping both sides in lock-step.

    pub fn occupants(&self, square: SquareId) -> &[PieceRef] {
        self.occupancy.get(&square).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn occupants_of_other_colors(&self, square: SquareId, color: Color) -> Vec<PieceRef> {
        self.occupants(square)
            .iter()
            .filter(|p| p.color != color)
            .copied()
            .collect()
    }

    pub fn own_occupant_count(&self, square: SquareId, color: Color) -> usize {
        self.occupants(square)
            .iter()
            .filter(|p| p.color == color)
            .count()
    }

    fn lift_piece(&mut self, piece: PieceRef) {
        let position = self.piece(piece).and_then(|p| p.position);
        if let Some(square) = position {
            if let Some(list) = self.occupancy.get_mut(&square) {
                list.retain(|&p| p != piece);
                if list.is_empty() {
                    self.occupancy.remove(&square);
                }
            }
        }
    }

    /// Relocates a piece onto `target`, updating the index and the piece's
    /// own state in one step. Heaven keeps no occupant list.
    pub fn place_piece(&mut self, piece: PieceRef, target: SquareId) -> Option<SquareKind> {
        let kind = self.board.square(target)?.kind;
        self.lift_piece(piece);
        self.piece_mut(piece)?.move_to(target, kind);
        if kind != SquareKind::Heaven {
            self.occupancy.entry(target).or_default().push(piece);
        }
        Some(kind)
    }

    /// Takes a piece off the board and back to jail (capture or burn).
    pub fn jail_piece(&mut self, piece: PieceRef) {
        self.lift_piece(piece);
        if let Some(p) = self.piece_mut(piece) {
            p.send_to_jail();
        }
    }
}
