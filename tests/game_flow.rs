use parques::application::error::GameServiceError;
use parques::application::game_service::GameService;
use parques::domain::board::exit_index;
use parques::domain::color::Color;
use parques::domain::game::{GameState, PieceRef};
use parques::domain::rules::{MoveResult, MoveValidator};
use parques::domain::square::SquareId;
use parques::infrastructure::dice::ScriptedDice;
use parques::infrastructure::repository::{InMemoryGameRepository, SharedGame};
use uuid::Uuid;

fn service_with_rolls(
    rolls: impl IntoIterator<Item = (u8, u8)>,
) -> GameService<InMemoryGameRepository> {
    GameService::new(
        InMemoryGameRepository::new(),
        MoveValidator::new(),
        Box::new(ScriptedDice::new(rolls)),
    )
}

async fn started_two_player_game(
    service: &GameService<InMemoryGameRepository>,
) -> (Uuid, SharedGame) {
    let shared = service
        .create_new_game("alice", Color::Red, 4)
        .await
        .expect("create");
    let game_id = shared.read().await.id;
    service
        .join_game(game_id, "bob", Color::Green)
        .await
        .expect("join");
    service.start_game(game_id, "alice").await.expect("start");
    (game_id, shared)
}

async fn event_kinds(shared: &SharedGame) -> Vec<String> {
    shared
        .read()
        .await
        .events
        .iter()
        .map(|e| e.kind.clone())
        .collect()
}

fn red(index: u8) -> PieceRef {
    PieceRef {
        color: Color::Red,
        index,
    }
}

#[tokio::test]
async fn test_lobby_rejects_taken_colors_and_late_joins() {
    let service = service_with_rolls([]);
    let shared = service
        .create_new_game("alice", Color::Red, 2)
        .await
        .expect("create");
    let game_id = shared.read().await.id;

    let err = service.join_game(game_id, "bob", Color::Red).await;
    assert!(matches!(err, Err(GameServiceError::PreconditionFailed(_))));

    service
        .join_game(game_id, "bob", Color::Green)
        .await
        .expect("join");

    // Two seats, both taken.
    let err = service.join_game(game_id, "carol", Color::Blue).await;
    assert!(matches!(err, Err(GameServiceError::PreconditionFailed(_))));

    service.start_game(game_id, "alice").await.expect("start");
    assert_eq!(shared.read().await.state, GameState::InProgress);

    let err = service.join_game(game_id, "dave", Color::Yellow).await;
    assert!(matches!(err, Err(GameServiceError::PreconditionFailed(_))));
}

#[tokio::test]
async fn test_start_requires_two_players_and_membership() {
    let service = service_with_rolls([]);
    let shared = service
        .create_new_game("alice", Color::Red, 4)
        .await
        .expect("create");
    let game_id = shared.read().await.id;

    // One player: still waiting.
    let err = service.start_game(game_id, "alice").await;
    assert!(matches!(err, Err(GameServiceError::PreconditionFailed(_))));

    service
        .join_game(game_id, "bob", Color::Green)
        .await
        .expect("join");

    // Outsiders cannot start.
    let err = service.start_game(game_id, "mallory").await;
    assert!(matches!(err, Err(GameServiceError::PlayerNotInGame { .. })));

    service.start_game(game_id, "alice").await.expect("start");
    let game = shared.read().await;
    assert_eq!(game.state, GameState::InProgress);
    assert_eq!(game.current_turn, Some(Color::Red));
}

#[tokio::test]
async fn test_pair_roll_frees_every_jailed_piece_at_once() {
    let service = service_with_rolls([(3, 3)]);
    let (game_id, shared) = started_two_player_game(&service).await;

    let (_, dice, outcome, moves) = service.roll_dice(game_id, "alice").await.expect("roll");
    assert_eq!(dice, (3, 3));
    assert_eq!(outcome, MoveResult::Ok);

    let game = shared.read().await;
    let exit = SquareId::Track(exit_index(Color::Red));
    let player = game.player(Color::Red).unwrap();
    assert_eq!(player.jailed_count(), 0);
    assert!(player
        .pieces
        .iter()
        .all(|p| p.position == Some(exit)));
    // All four stand on the exit square together.
    assert_eq!(game.occupants(exit).len(), 4);

    // The exit grants an immediate fresh roll.
    assert_eq!(game.dice_roll_count, 0);
    assert_eq!(game.current_turn, Some(Color::Red));
    drop(game);

    let kinds = event_kinds(&shared).await;
    assert!(kinds.iter().any(|k| k == "massive_jail_exit"));
    assert!(kinds
        .iter()
        .any(|k| k == "player_rolls_again_after_massive_jail_exit"));
    assert!(!moves.is_empty());
}

#[tokio::test]
async fn test_stuck_roll_offers_no_moves_and_passing_hands_over_the_turn() {
    let service = service_with_rolls([(1, 2)]);
    let (game_id, shared) = started_two_player_game(&service).await;

    // Every red piece is jailed and the roll is not a pair: nothing to play.
    let (_, dice, outcome, moves) = service.roll_dice(game_id, "alice").await.expect("roll");
    assert_eq!(dice, (1, 2));
    assert_eq!(outcome, MoveResult::Ok);
    assert!(moves.is_empty());
    assert_eq!(shared.read().await.current_turn, Some(Color::Red));

    service
        .pass_player_turn(game_id, "alice")
        .await
        .expect("pass");

    let game = shared.read().await;
    assert_eq!(game.current_turn, Some(Color::Green));
    assert_eq!(game.last_roll, None);
    drop(game);

    let kinds = event_kinds(&shared).await;
    assert!(kinds.iter().any(|k| k == "player_passed_turn"));
}

#[tokio::test]
async fn test_three_failed_jail_attempts_pass_the_turn() {
    let service = service_with_rolls([(1, 2), (3, 4), (5, 6)]);
    let (game_id, shared) = started_two_player_game(&service).await;

    service.roll_dice(game_id, "alice").await.expect("first");
    service.roll_dice(game_id, "alice").await.expect("second");
    service.roll_dice(game_id, "alice").await.expect("third");

    let game = shared.read().await;
    assert_eq!(game.current_turn, Some(Color::Green));
    assert_eq!(game.player(Color::Red).unwrap().jailed_count(), 4);
    drop(game);

    let kinds = event_kinds(&shared).await;
    assert!(kinds
        .iter()
        .any(|k| k == "player_failed_three_jail_attempts"));
}

#[tokio::test]
async fn test_three_consecutive_pairs_burn_a_piece() {
    let service = service_with_rolls([(3, 3), (5, 5), (1, 1)]);
    let (game_id, shared) = started_two_player_game(&service).await;

    let (_, _, outcome, _) = service.roll_dice(game_id, "alice").await.expect("first");
    assert_eq!(outcome, MoveResult::Ok);
    let (_, _, outcome, _) = service.roll_dice(game_id, "alice").await.expect("second");
    assert_eq!(outcome, MoveResult::Ok);
    let (_, _, outcome, moves) = service.roll_dice(game_id, "alice").await.expect("third");
    assert_eq!(outcome, MoveResult::ThreePairsBurn);
    assert!(moves.is_empty());

    service
        .handle_three_pairs_penalty(game_id, "alice", None)
        .await
        .expect("burn");

    let game = shared.read().await;
    // One piece went back to jail and the turn moved on.
    assert_eq!(game.player(Color::Red).unwrap().jailed_count(), 1);
    assert_eq!(game.current_turn, Some(Color::Green));
    assert_eq!(game.player(Color::Red).unwrap().consecutive_pairs, 0);
    drop(game);

    let kinds = event_kinds(&shared).await;
    assert!(kinds.iter().any(|k| k == "piece_burned_three_pairs"));
}

#[tokio::test]
async fn test_capture_sends_the_victim_to_jail() {
    let service = service_with_rolls([(2, 3)]);
    let (game_id, shared) = started_two_player_game(&service).await;

    // Stage: a red runner two squares behind a green target.
    {
        let mut game = shared.write().await;
        game.place_piece(red(0), SquareId::Track(1));
        game.place_piece(
            PieceRef {
                color: Color::Green,
                index: 0,
            },
            SquareId::Track(3),
        );
    }

    let (_, _, _, moves) = service.roll_dice(game_id, "alice").await.expect("roll");
    let red_id = shared.read().await.piece(red(0)).unwrap().id;
    let capture = moves[&red_id]
        .iter()
        .find(|c| c.result == MoveResult::Capture)
        .copied()
        .expect("capture option");
    assert_eq!(capture.target, SquareId::Track(3));

    service
        .move_piece(
            game_id,
            "alice",
            &red_id.to_string(),
            capture.target,
            capture.steps,
        )
        .await
        .expect("move");

    let game = shared.read().await;
    let victim = game
        .player(Color::Green)
        .unwrap()
        .piece_by_index(0)
        .unwrap();
    assert!(victim.in_jail);
    assert_eq!(
        game.piece(red(0)).unwrap().position,
        Some(SquareId::Track(3))
    );
    drop(game);

    let kinds = event_kinds(&shared).await;
    assert!(kinds.iter().any(|k| k == "piece_captured"));
}

#[tokio::test]
async fn test_capture_evicts_every_color_on_the_square() {
    let service = service_with_rolls([(2, 3)]);
    let shared = service
        .create_new_game("alice", Color::Red, 4)
        .await
        .expect("create");
    let game_id = shared.read().await.id;
    service
        .join_game(game_id, "bob", Color::Green)
        .await
        .expect("join");
    service
        .join_game(game_id, "carol", Color::Blue)
        .await
        .expect("join");
    service.start_game(game_id, "alice").await.expect("start");

    {
        let mut game = shared.write().await;
        game.place_piece(red(0), SquareId::Track(1));
        game.place_piece(
            PieceRef {
                color: Color::Green,
                index: 0,
            },
            SquareId::Track(3),
        );
        game.place_piece(
            PieceRef {
                color: Color::Blue,
                index: 0,
            },
            SquareId::Track(3),
        );
    }

    service.roll_dice(game_id, "alice").await.expect("roll");
    let red_id = shared.read().await.piece(red(0)).unwrap().id;
    service
        .move_piece(game_id, "alice", &red_id.to_string(), SquareId::Track(3), 2)
        .await
        .expect("move");

    let game = shared.read().await;
    assert!(game.player(Color::Green).unwrap().piece_by_index(0).unwrap().in_jail);
    assert!(game.player(Color::Blue).unwrap().piece_by_index(0).unwrap().in_jail);
    assert_eq!(game.occupants(SquareId::Track(3)).len(), 1);
}

#[tokio::test]
async fn test_burn_honors_an_explicit_piece_choice() {
    let service = service_with_rolls([(3, 3), (5, 5), (1, 1)]);
    let (game_id, shared) = started_two_player_game(&service).await;

    // First pair frees everyone; two more complete the streak.
    service.roll_dice(game_id, "alice").await.expect("first");
    service.roll_dice(game_id, "alice").await.expect("second");
    service.roll_dice(game_id, "alice").await.expect("third");

    let chosen = shared.read().await.piece(red(2)).unwrap().id;
    service
        .handle_three_pairs_penalty(game_id, "alice", Some(&chosen.to_string()))
        .await
        .expect("burn");

    let game = shared.read().await;
    let burned = game.piece(red(2)).unwrap();
    assert!(burned.in_jail);
    assert_eq!(game.player(Color::Red).unwrap().jailed_count(), 1);
}

#[tokio::test]
async fn test_non_pair_roll_allows_two_moves_before_the_turn_passes() {
    let service = service_with_rolls([(2, 5)]);
    let (game_id, shared) = started_two_player_game(&service).await;

    {
        let mut game = shared.write().await;
        game.place_piece(red(0), SquareId::Track(1));
        game.place_piece(red(1), SquareId::Track(20));
    }

    service.roll_dice(game_id, "alice").await.expect("roll");
    let (first_id, second_id) = {
        let game = shared.read().await;
        (
            game.piece(red(0)).unwrap().id,
            game.piece(red(1)).unwrap().id,
        )
    };

    service
        .move_piece(game_id, "alice", &first_id.to_string(), SquareId::Track(3), 2)
        .await
        .expect("first move");
    {
        let game = shared.read().await;
        // One die spent; still red's turn.
        assert_eq!(game.current_turn, Some(Color::Red));
        assert_eq!(game.moves_made_this_roll, 1);
    }
    let kinds = event_kinds(&shared).await;
    assert!(kinds.iter().any(|k| k == "player_may_use_second_die"));

    service
        .move_piece(
            game_id,
            "alice",
            &second_id.to_string(),
            SquareId::Track(25),
            5,
        )
        .await
        .expect("second move");
    assert_eq!(shared.read().await.current_turn, Some(Color::Green));
}

#[tokio::test]
async fn test_combined_value_spends_both_dice() {
    let service = service_with_rolls([(2, 5)]);
    let (game_id, shared) = started_two_player_game(&service).await;

    {
        let mut game = shared.write().await;
        game.place_piece(red(0), SquareId::Track(1));
    }

    service.roll_dice(game_id, "alice").await.expect("roll");
    let red_id = shared.read().await.piece(red(0)).unwrap().id;

    service
        .move_piece(game_id, "alice", &red_id.to_string(), SquareId::Track(8), 7)
        .await
        .expect("move");

    assert_eq!(shared.read().await.current_turn, Some(Color::Green));
}

#[tokio::test]
async fn test_rejects_a_move_that_disagrees_with_the_rules() {
    let service = service_with_rolls([(2, 5)]);
    let (game_id, shared) = started_two_player_game(&service).await;

    {
        let mut game = shared.write().await;
        game.place_piece(red(0), SquareId::Track(1));
    }

    service.roll_dice(game_id, "alice").await.expect("roll");
    let red_id = shared.read().await.piece(red(0)).unwrap().id;

    // Claimed target does not match two steps from track 1.
    let err = service
        .move_piece(game_id, "alice", &red_id.to_string(), SquareId::Track(9), 2)
        .await;
    assert!(matches!(err, Err(GameServiceError::InvalidMove { .. })));

    // Steps not offered by the roll.
    let err = service
        .move_piece(game_id, "alice", &red_id.to_string(), SquareId::Track(5), 4)
        .await;
    assert!(matches!(err, Err(GameServiceError::InvalidMove { .. })));
}

#[tokio::test]
async fn test_goal_square_demands_an_exact_roll() {
    let service = service_with_rolls([(2, 5), (1, 4)]);
    let (game_id, shared) = started_two_player_game(&service).await;

    let goal = SquareId::Passage {
        color: Color::Red,
        step: 6,
    };
    {
        let mut game = shared.write().await;
        game.place_piece(red(0), goal);
    }

    service.roll_dice(game_id, "alice").await.expect("roll");
    let red_id = shared.read().await.piece(red(0)).unwrap().id;

    // Neither 2, 5, nor 7 finishes from the goal square.
    let err = service
        .move_piece(game_id, "alice", &red_id.to_string(), SquareId::Heaven, 2)
        .await;
    assert!(matches!(
        err,
        Err(GameServiceError::InvalidMove {
            reason: MoveResult::ExactRollNeeded
        })
    ));

    service
        .pass_player_turn(game_id, "alice")
        .await
        .expect("pass");
    assert_eq!(shared.read().await.current_turn, Some(Color::Green));
}

#[tokio::test]
async fn test_win_detection_finishes_the_game() {
    let service = service_with_rolls([(1, 4)]);
    let (game_id, shared) = started_two_player_game(&service).await;

    {
        let mut game = shared.write().await;
        // Three pieces already home, the last one on the goal square.
        game.place_piece(red(0), SquareId::Heaven);
        game.place_piece(red(1), SquareId::Heaven);
        game.place_piece(red(2), SquareId::Heaven);
        game.place_piece(
            red(3),
            SquareId::Passage {
                color: Color::Red,
                step: 6,
            },
        );
    }

    service.roll_dice(game_id, "alice").await.expect("roll");
    let last_id = shared.read().await.piece(red(3)).unwrap().id;

    service
        .move_piece(game_id, "alice", &last_id.to_string(), SquareId::Heaven, 1)
        .await
        .expect("winning move");

    let game = shared.read().await;
    assert_eq!(game.state, GameState::Finished);
    assert_eq!(game.winner, Some(Color::Red));
    assert!(game.player(Color::Red).unwrap().has_won);
    drop(game);

    let kinds = event_kinds(&shared).await;
    assert!(kinds.iter().any(|k| k == "piece_reached_heaven"));
    assert!(kinds.iter().any(|k| k == "game_won"));
}

#[tokio::test]
async fn test_actions_out_of_turn_are_rejected() {
    let service = service_with_rolls([(1, 2)]);
    let (game_id, _) = started_two_player_game(&service).await;

    let err = service.roll_dice(game_id, "bob").await;
    assert!(matches!(err, Err(GameServiceError::NotYourTurn { .. })));

    let err = service.pass_player_turn(game_id, "bob").await;
    assert!(matches!(err, Err(GameServiceError::NotYourTurn { .. })));

    let err = service.roll_dice(game_id, "mallory").await;
    assert!(matches!(err, Err(GameServiceError::PlayerNotInGame { .. })));
}

#[tokio::test]
async fn test_moving_before_rolling_is_rejected() {
    let service = service_with_rolls([]);
    let (game_id, shared) = started_two_player_game(&service).await;

    {
        let mut game = shared.write().await;
        game.place_piece(red(0), SquareId::Track(1));
    }
    let red_id = shared.read().await.piece(red(0)).unwrap().id;

    let err = service
        .move_piece(game_id, "alice", &red_id.to_string(), SquareId::Track(3), 2)
        .await;
    assert!(matches!(err, Err(GameServiceError::PreconditionFailed(_))));
}

#[tokio::test]
async fn test_unknown_game_id_is_not_found() {
    let service = service_with_rolls([]);
    let err = service.get_game(Uuid::new_v4()).await;
    assert!(matches!(err, Err(GameServiceError::GameNotFound(_))));
}

#[tokio::test]
async fn test_listing_sees_only_live_games() {
    let service = service_with_rolls([]);
    let (game_id, _) = started_two_player_game(&service).await;

    let active = service.list_active_games().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].read().await.id, game_id);
}
