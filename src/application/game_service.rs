use crate::application::error::GameServiceError;
use crate::domain::color::Color;
use crate::domain::game::{GameAggregate, GameState, PieceRef, MAX_PLAYERS, MIN_PLAYERS};
use crate::domain::piece::Piece;
use crate::domain::player::{Player, PIECES_PER_PLAYER};
use crate::domain::rules::{CandidateMove, MoveResult, MoveValidator};
use crate::domain::square::{SquareId, SquareKind};
use crate::infrastructure::dice::DiceRoller;
use crate::infrastructure::repository::{GameRepository, SharedGame};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Everything a dice roll produces: the updated match, the dice, the roll
/// classification, and the enumerated moves.
pub type RollOutcome = (
    SharedGame,
    (u8, u8),
    MoveResult,
    HashMap<Uuid, Vec<CandidateMove>>,
);

/// Orchestrates matches: validates preconditions, delegates rule questions
/// to the validator, executes side effects, and runs the turn policy.
///
/// Every mutating operation acquires the match's write guard for the whole
/// read-modify-write critical section and saves before releasing it, so
/// concurrent actions against one match serialize in lock order.
pub struct GameService<R: GameRepository> {
    repository: R,
    validator: MoveValidator,
    dice: Box<dyn DiceRoller>,
}

impl<R: GameRepository> GameService<R> {
    pub fn new(repository: R, validator: MoveValidator, dice: Box<dyn DiceRoller>) -> Self {
        Self {
            repository,
            validator,
            dice,
        }
    }

    pub async fn create_new_game(
        &self,
        creator_user_id: &str,
        creator_color: Color,
        max_players: usize,
    ) -> Result<SharedGame, GameServiceError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&max_players) {
            return Err(GameServiceError::precondition(format!(
                "max_players must be between {MIN_PLAYERS} and {MAX_PLAYERS}"
            )));
        }

        let game_id = Uuid::new_v4();
        let mut game = GameAggregate::new(game_id, max_players);
        if !game.add_player(Player::new(creator_user_id, creator_color)) {
            return Err(GameServiceError::internal(
                "creator could not be added to a fresh game",
            ));
        }

        info!(%game_id, creator = creator_user_id, color = %creator_color, "game created");
        let shared = Arc::new(RwLock::new(game));
        self.repository.save(game_id, &shared).await;
        Ok(shared)
    }

    pub async fn join_game(
        &self,
        game_id: Uuid,
        user_id: &str,
        color: Color,
    ) -> Result<SharedGame, GameServiceError> {
        let shared = self.fetch(game_id).await?;
        {
            let mut game = shared.write().await;

            if !matches!(
                game.state,
                GameState::WaitingPlayers | GameState::ReadyToStart
            ) {
                return Err(GameServiceError::precondition(
                    "game is not accepting players",
                ));
            }
            if game.players.len() >= game.max_players {
                return Err(GameServiceError::precondition("game is already full"));
            }
            if game.players.contains_key(&color) {
                return Err(GameServiceError::precondition(format!(
                    "color {color} is already taken"
                )));
            }
            if game.player_by_user_id(user_id).is_some() {
                return Err(GameServiceError::precondition(format!(
                    "user {user_id} already joined this game"
                )));
            }

            if !game.add_player(Player::new(user_id, color)) {
                return Err(GameServiceError::internal("join passed checks but failed"));
            }
            info!(%game_id, user = user_id, color = %color, "player joined");
            self.repository.save(game_id, &shared).await;
        }
        Ok(shared)
    }

    pub async fn start_game(
        &self,
        game_id: Uuid,
        user_id: &str,
    ) -> Result<SharedGame, GameServiceError> {
        let shared = self.fetch(game_id).await?;
        {
            let mut game = shared.write().await;

            if game.player_by_user_id(user_id).is_none() {
                return Err(GameServiceError::PlayerNotInGame {
                    user_id: user_id.to_string(),
                    game_id,
                });
            }
            if game.state != GameState::ReadyToStart {
                return Err(GameServiceError::precondition(
                    "game is not ready to start or has already begun",
                ));
            }
            if game.players.len() < MIN_PLAYERS {
                return Err(GameServiceError::precondition(format!(
                    "at least {MIN_PLAYERS} players are needed to start"
                )));
            }
            if !game.start() {
                return Err(GameServiceError::internal("start transition failed"));
            }
            info!(%game_id, "game started");
            self.repository.save(game_id, &shared).await;
        }
        Ok(shared)
    }

    /// Rolls for the current player. Pairs free every jailed piece at once
    /// (the massive jail exit) and grant an immediate re-roll; a player whose
    /// pieces are all jailed gets three attempts before the turn auto-passes.
    pub async fn roll_dice(
        &self,
        game_id: Uuid,
        user_id: &str,
    ) -> Result<RollOutcome, GameServiceError> {
        let shared = self.fetch(game_id).await?;
        let (dice, outcome, moves) = {
            let mut game = shared.write().await;
            let color = self.player_color(&game, user_id, game_id)?;
            self.check_roll_preconditions(&game, color, user_id)?;

            if game.dice_roll_count == 0 {
                game.moves_made_this_roll = 0;
            }

            let (d1, d2) = self.dice.roll();
            game.last_roll = Some((d1, d2));
            game.dice_roll_count += 1;
            game.push_event(
                "dice_rolled",
                json!({ "player_color": color, "dice": [d1, d2] }),
            );
            debug!(%game_id, %color, d1, d2, "dice rolled");

            let outcome = self.validator.validate_roll(&mut game, color, d1, d2);
            if outcome == MoveResult::ThreePairsBurn {
                self.repository.save(game_id, &shared).await;
                return Ok((shared.clone(), (d1, d2), outcome, HashMap::new()));
            }

            let exited_jail = self.handle_massive_jail_exit(&mut game, color, d1, d2);

            if self.should_auto_pass(&game, color, d1, d2) {
                let attempts = game.dice_roll_count;
                game.push_event(
                    "player_failed_three_jail_attempts",
                    json!({ "player_color": color, "attempts": attempts }),
                );
                if let Some(player) = game.player_mut(color) {
                    player.reset_consecutive_pairs();
                }
                game.next_turn();
                self.repository.save(game_id, &shared).await;
                return Ok((shared.clone(), (d1, d2), MoveResult::Ok, HashMap::new()));
            }

            let moves = self.validator.possible_moves(&game, color, d1, d2);

            if moves.is_empty() && !(exited_jail && game.dice_roll_count == 0) {
                let jailed = game
                    .player(color)
                    .map(|p| p.jailed_count())
                    .unwrap_or_default();
                if jailed < PIECES_PER_PLAYER {
                    game.push_event(
                        "no_valid_moves",
                        json!({ "player_color": color, "dice": [d1, d2] }),
                    );
                }
            }

            self.repository.save(game_id, &shared).await;
            ((d1, d2), outcome, moves)
        };
        Ok((shared, dice, outcome, moves))
    }

    /// Re-validates the client's chosen move against the rules engine and,
    /// on agreement, executes its side effects and the end-of-turn policy.
    pub async fn move_piece(
        &self,
        game_id: Uuid,
        user_id: &str,
        piece_uuid: &str,
        client_target: SquareId,
        steps: u8,
    ) -> Result<SharedGame, GameServiceError> {
        let shared = self.fetch(game_id).await?;
        {
            let mut game = shared.write().await;

            let current = game
                .current_player()
                .filter(|p| p.user_id == user_id)
                .ok_or_else(|| GameServiceError::NotYourTurn {
                    user_id: user_id.to_string(),
                })?;
            let color = current.color;

            if game.state != GameState::InProgress {
                return Err(GameServiceError::precondition("game is not in progress"));
            }
            if game.player(color).is_some_and(|p| p.consecutive_pairs >= 3) {
                return Err(GameServiceError::precondition(
                    "resolve the three-pairs penalty first",
                ));
            }
            let (d1, d2) = game
                .last_roll
                .ok_or_else(|| GameServiceError::precondition("roll the dice before moving"))?;
            let is_pair = d1 == d2;
            if !MoveValidator::step_candidates(d1, d2).contains(&steps) {
                return Err(GameServiceError::InvalidMove {
                    reason: MoveResult::InvalidRoll,
                });
            }

            let piece: Piece = game
                .player(color)
                .and_then(|p| p.piece_by_uuid(piece_uuid))
                .cloned()
                .ok_or_else(|| {
                    GameServiceError::precondition(format!(
                        "piece {piece_uuid} not found for player {user_id}"
                    ))
                })?;

            let (result, validated_target) =
                self.validator.evaluate_move(&game, &piece, steps, is_pair);
            self.check_move_result(&game, &piece, result, validated_target, client_target)?;

            let piece_ref = PieceRef {
                color,
                index: piece.index,
            };
            self.execute_move(&mut game, piece_ref, piece.id, client_target, result)?;
            self.finish_turn(&mut game, color, is_pair, steps, result);

            self.repository.save(game_id, &shared).await;
        }
        Ok(shared)
    }

    /// Resolves the three-consecutive-pairs penalty: one of the player's
    /// in-play pieces goes back to jail, then the turn passes.
    pub async fn handle_three_pairs_penalty(
        &self,
        game_id: Uuid,
        user_id: &str,
        piece_uuid: Option<&str>,
    ) -> Result<SharedGame, GameServiceError> {
        let shared = self.fetch(game_id).await?;
        {
            let mut game = shared.write().await;

            let player = game.player_by_user_id(user_id).ok_or_else(|| {
                GameServiceError::PlayerNotInGame {
                    user_id: user_id.to_string(),
                    game_id,
                }
            })?;
            let color = player.color;

            if game.current_turn != Some(color)
                || game.player(color).is_none_or(|p| p.consecutive_pairs < 3)
            {
                return Err(GameServiceError::precondition(
                    "player is not due a three-pairs penalty",
                ));
            }

            match self.select_piece_to_burn(&game, color, piece_uuid) {
                Some((piece_ref, piece_id)) => {
                    game.jail_piece(piece_ref);
                    game.push_event(
                        "piece_burned_three_pairs",
                        json!({ "player": color, "piece_id": piece_id }),
                    );
                    info!(%game_id, %color, %piece_id, "piece burned for three pairs");
                }
                None => {
                    game.push_event("no_piece_to_burn_three_pairs", json!({ "player": color }));
                }
            }

            if let Some(player) = game.player_mut(color) {
                player.reset_consecutive_pairs();
            }
            game.next_turn();
            self.repository.save(game_id, &shared).await;
        }
        Ok(shared)
    }

    /// Passes the turn when a roll produced no legal moves.
    pub async fn pass_player_turn(
        &self,
        game_id: Uuid,
        user_id: &str,
    ) -> Result<SharedGame, GameServiceError> {
        let shared = self.fetch(game_id).await?;
        {
            let mut game = shared.write().await;

            let current = game
                .current_player()
                .filter(|p| p.user_id == user_id)
                .ok_or_else(|| GameServiceError::NotYourTurn {
                    user_id: user_id.to_string(),
                })?;
            let color = current.color;

            if game.state != GameState::InProgress {
                return Err(GameServiceError::precondition("game is not in progress"));
            }

            game.push_event(
                "player_passed_turn",
                json!({ "player_color": color, "reason": "no_valid_moves" }),
            );
            if let Some(player) = game.player_mut(color) {
                player.reset_consecutive_pairs();
            }
            game.next_turn();
            self.repository.save(game_id, &shared).await;
        }
        Ok(shared)
    }

    pub async fn get_game(&self, game_id: Uuid) -> Result<SharedGame, GameServiceError> {
        self.fetch(game_id).await
    }

    pub async fn list_active_games(&self) -> Vec<SharedGame> {
        self.repository.get_all_active().await
    }

    // --- internals ----------------------------------------------------------

    async fn fetch(&self, game_id: Uuid) -> Result<SharedGame, GameServiceError> {
        self.repository
            .get_by_id(game_id)
            .await
            .ok_or(GameServiceError::GameNotFound(game_id))
    }

    fn player_color(
        &self,
        game: &GameAggregate,
        user_id: &str,
        game_id: Uuid,
    ) -> Result<Color, GameServiceError> {
        game.player_by_user_id(user_id)
            .map(|p| p.color)
            .ok_or_else(|| GameServiceError::PlayerNotInGame {
                user_id: user_id.to_string(),
                game_id,
            })
    }

    fn check_roll_preconditions(
        &self,
        game: &GameAggregate,
        color: Color,
        user_id: &str,
    ) -> Result<(), GameServiceError> {
        if game.state != GameState::InProgress {
            return Err(GameServiceError::precondition("game is not in progress"));
        }
        if game.current_turn != Some(color) {
            return Err(GameServiceError::NotYourTurn {
                user_id: user_id.to_string(),
            });
        }

        let Some(player) = game.player(color) else {
            return Err(GameServiceError::internal("current player missing"));
        };
        let stuck_in_jail = player.jailed_count() == PIECES_PER_PLAYER;
        let mid_pair_streak = (1..3).contains(&player.consecutive_pairs);

        if game.dice_roll_count > 0 && !mid_pair_streak {
            if !stuck_in_jail {
                return Err(GameServiceError::precondition(
                    "already rolled this turn; move a piece first",
                ));
            }
            if game.dice_roll_count >= 3 {
                return Err(GameServiceError::precondition(
                    "all three jail-exit attempts used; pass the turn",
                ));
            }
        }
        Ok(())
    }

    /// On pairs, every jailed piece leaves for the exit square in one atomic
    /// step and the player may roll again immediately. House rule; keep.
    fn handle_massive_jail_exit(
        &self,
        game: &mut GameAggregate,
        color: Color,
        d1: u8,
        d2: u8,
    ) -> bool {
        if d1 != d2 {
            return false;
        }
        let jailed: Vec<(PieceRef, Uuid)> = game
            .player(color)
            .map(|player| {
                player
                    .jailed_pieces()
                    .map(|p| {
                        (
                            PieceRef {
                                color,
                                index: p.index,
                            },
                            p.id,
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        if jailed.is_empty() {
            return false;
        }

        let exit = game.board.exit_square_id(color);
        for (piece_ref, _) in &jailed {
            game.place_piece(*piece_ref, exit);
        }
        let exited_ids: Vec<Uuid> = jailed.iter().map(|(_, id)| *id).collect();
        game.push_event(
            "massive_jail_exit",
            json!({ "player": color, "exited_pieces": exited_ids, "target_square": exit }),
        );
        game.dice_roll_count = 0;
        game.moves_made_this_roll = 0;
        game.push_event(
            "player_rolls_again_after_massive_jail_exit",
            json!({ "player": color }),
        );
        info!(%color, count = exited_ids.len(), "massive jail exit");
        true
    }

    fn should_auto_pass(&self, game: &GameAggregate, color: Color, d1: u8, d2: u8) -> bool {
        let stuck = game
            .player(color)
            .is_some_and(|p| p.jailed_count() == PIECES_PER_PLAYER);
        stuck && d1 != d2 && game.dice_roll_count >= 3
    }

    /// Rejects any disagreement between the client's chosen target and the
    /// engine's own evaluation. The one courtesy: an overshoot from the goal
    /// square is reported as `ExactRollNeeded` rather than a generic error.
    fn check_move_result(
        &self,
        game: &GameAggregate,
        piece: &Piece,
        result: MoveResult,
        validated_target: Option<SquareId>,
        client_target: SquareId,
    ) -> Result<(), GameServiceError> {
        let rejected = matches!(
            result,
            MoveResult::InvalidPiece
                | MoveResult::InvalidRoll
                | MoveResult::OutOfBounds
                | MoveResult::BlockedByOwn
        );
        if validated_target != Some(client_target) || rejected {
            if result == MoveResult::OutOfBounds {
                if let Some(current) = piece.position {
                    let at_goal = game
                        .board
                        .square(current)
                        .is_some_and(|sq| sq.kind == SquareKind::Goal);
                    if at_goal {
                        return Err(GameServiceError::InvalidMove {
                            reason: MoveResult::ExactRollNeeded,
                        });
                    }
                }
            }
            return Err(GameServiceError::InvalidMove { reason: result });
        }
        Ok(())
    }

    fn execute_move(
        &self,
        game: &mut GameAggregate,
        piece_ref: PieceRef,
        piece_id: Uuid,
        target: SquareId,
        result: MoveResult,
    ) -> Result<(), GameServiceError> {
        let color = piece_ref.color;
        let from = game.piece(piece_ref).and_then(|p| p.position);

        match result {
            MoveResult::JailExitSuccess => {
                game.place_piece(piece_ref, target)
                    .ok_or_else(|| GameServiceError::internal("exit square missing"))?;
                game.push_event(
                    "piece_left_jail",
                    json!({ "player": color, "piece_id": piece_id, "target_square": target }),
                );
            }
            MoveResult::Capture => {
                let victims = game.occupants_of_other_colors(target, color);
                let mut captured_ids = Vec::new();
                for victim in victims {
                    if let Some(vp) = game.piece(victim) {
                        captured_ids.push(vp.id);
                    }
                    game.jail_piece(victim);
                }
                game.place_piece(piece_ref, target)
                    .ok_or_else(|| GameServiceError::internal("capture target missing"))?;
                game.push_event(
                    "piece_captured",
                    json!({
                        "player": color,
                        "piece_id": piece_id,
                        "target_square": target,
                        "captured_ids": captured_ids,
                    }),
                );
            }
            MoveResult::PieceWins => {
                game.place_piece(piece_ref, SquareId::Heaven)
                    .ok_or_else(|| GameServiceError::internal("heaven square missing"))?;
                game.push_event(
                    "piece_reached_heaven",
                    json!({ "player": color, "piece_id": piece_id }),
                );
                let won = game
                    .player_mut(color)
                    .is_some_and(|p| p.check_win_condition());
                if won {
                    game.push_event("game_won", json!({ "player": color }));
                    game.check_for_winner();
                    info!(game_id = %game.id, %color, "game won");
                }
            }
            MoveResult::Ok => {
                game.place_piece(piece_ref, target)
                    .ok_or_else(|| GameServiceError::internal("target square missing"))?;
                game.push_event(
                    "piece_moved",
                    json!({ "player": color, "piece_id": piece_id, "from": from, "to": target }),
                );
            }
            other => {
                warn!(?other, "move passed validation with unexecutable result");
                return Err(GameServiceError::InvalidMove { reason: other });
            }
        }
        Ok(())
    }

    /// End-of-turn policy. Pairs grant another roll (always after a jail
    /// exit, otherwise while the streak is below three); a non-pair roll
    /// allows up to two moves, with the combined value consuming both dice.
    fn finish_turn(
        &self,
        game: &mut GameAggregate,
        color: Color,
        is_pair: bool,
        steps: u8,
        result: MoveResult,
    ) {
        if !is_pair {
            game.moves_made_this_roll += 1;
        }
        if game.state == GameState::Finished {
            return;
        }

        let continues = if is_pair {
            self.pairs_continuation(game, color, result)
        } else {
            self.second_die_continuation(game, steps)
        };

        if !continues {
            if let Some(player) = game.player_mut(color) {
                player.reset_consecutive_pairs();
            }
            game.next_turn();
        }
    }

    fn pairs_continuation(
        &self,
        game: &mut GameAggregate,
        color: Color,
        result: MoveResult,
    ) -> bool {
        if result == MoveResult::JailExitSuccess {
            game.dice_roll_count = 0;
            game.moves_made_this_roll = 0;
            game.push_event(
                "player_rolls_again_after_jail_exit",
                json!({ "player": color }),
            );
            return true;
        }
        let streak = game
            .player(color)
            .map(|p| p.consecutive_pairs)
            .unwrap_or_default();
        if streak < 3 {
            game.dice_roll_count = 0;
            game.moves_made_this_roll = 0;
            game.push_event("player_repeats_turn_for_pairs", json!({ "player": color }));
            return true;
        }
        false
    }

    fn second_die_continuation(&self, game: &mut GameAggregate, steps: u8) -> bool {
        let Some((d1, d2)) = game.last_roll else {
            return false;
        };
        if steps == d1 + d2 {
            // The combined value spends both dice at once.
            game.moves_made_this_roll = 2;
        }
        if game.moves_made_this_roll < 2 {
            let color = game.current_turn;
            game.push_event(
                "player_may_use_second_die",
                json!({
                    "player": color,
                    "roll": [d1, d2],
                    "moves_made": game.moves_made_this_roll,
                }),
            );
            return true;
        }
        false
    }

    /// The player's explicit choice when it is valid and in play; otherwise
    /// the first in-play piece by local index.
    fn select_piece_to_burn(
        &self,
        game: &GameAggregate,
        color: Color,
        piece_uuid: Option<&str>,
    ) -> Option<(PieceRef, Uuid)> {
        let player = game.player(color)?;

        if let Some(uuid) = piece_uuid {
            if let Some(piece) = player.piece_by_uuid(uuid) {
                if !piece.in_jail && !piece.reached_heaven {
                    return Some((
                        PieceRef {
                            color,
                            index: piece.index,
                        },
                        piece.id,
                    ));
                }
            }
        }

        player.pieces_in_play().next().map(|piece| {
            (
                PieceRef {
                    color,
                    index: piece.index,
                },
                piece.id,
            )
        })
    }
}
