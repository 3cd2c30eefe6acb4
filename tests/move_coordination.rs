mod common;

use caro::application::{GameError, MoveDisposition};
use caro::config::AppConfig;
use caro::domain::models::EndReason;
use common::Harness;
use std::sync::Arc;
use tokio::sync::Barrier;
use uuid::Uuid;

#[tokio::test]
async fn test_precondition_rejections_in_order() {
    let harness = Harness::new(AppConfig::default());
    let (room_id, host, guest) = harness.seed_two_player_room();

    // Unknown room.
    let err = harness
        .service
        .apply_move(Uuid::new_v4(), host, 0, 0)
        .await
        .unwrap_err();
    assert_eq!(err, GameError::RoomNotFound);

    // Known room, game not started.
    let err = harness
        .service
        .apply_move(room_id, host, 0, 0)
        .await
        .unwrap_err();
    assert_eq!(err, GameError::NotPlaying);

    harness.service.start_game(room_id, host).await.unwrap();

    // A stranger cannot move.
    let err = harness
        .service
        .apply_move(room_id, Uuid::new_v4(), 0, 0)
        .await
        .unwrap_err();
    assert_eq!(err, GameError::NotInRoom);

    // The guest is not on turn (host holds X and X starts).
    let err = harness
        .service
        .apply_move(room_id, guest, 0, 0)
        .await
        .unwrap_err();
    assert_eq!(err, GameError::NotYourTurn);

    // Off-board coordinates.
    let err = harness
        .service
        .apply_move(room_id, host, 20, 0)
        .await
        .unwrap_err();
    assert_eq!(err, GameError::OutOfBounds(20, 0));

    // Occupied cell.
    harness.service.apply_move(room_id, host, 5, 5).await.unwrap();
    let err = harness
        .service
        .apply_move(room_id, guest, 5, 5)
        .await
        .unwrap_err();
    assert_eq!(err, GameError::CellOccupied(5, 5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_exactly_one_concurrent_move_succeeds() {
    let harness = Harness::new(AppConfig::default());
    let (room_id, host, _guest) = harness.seed_two_player_room();
    harness.service.start_game(room_id, host).await.unwrap();

    let callers = 8;
    let barrier = Arc::new(Barrier::new(callers));
    let mut handles = Vec::new();
    for i in 0..callers {
        let service = Arc::clone(&harness.service);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            // Every caller is the host aiming at a distinct empty cell.
            service.apply_move(room_id, host, 3, i).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(GameError::Busy) | Err(GameError::NotYourTurn) => {}
            Err(other) => panic!("unexpected rejection: {other:?}"),
        }
    }
    assert_eq!(successes, 1, "exactly one concurrent move may land");

    let board = harness.board_snapshot(room_id).await.unwrap();
    assert_eq!(board.occupied_count(), 1, "exactly one new mark");
    assert_eq!(harness.history_len(room_id).await, 1);
}

#[tokio::test]
async fn test_turns_alternate_and_history_grows() {
    let harness = Harness::new(AppConfig::default());
    let (room_id, host, guest) = harness.seed_two_player_room();
    harness.service.start_game(room_id, host).await.unwrap();

    for (i, (mover, x, y)) in [(host, 0, 0), (guest, 1, 1), (host, 0, 1), (guest, 2, 2)]
        .into_iter()
        .enumerate()
    {
        let disposition = harness.service.apply_move(room_id, mover, x, y).await.unwrap();
        assert_eq!(disposition, MoveDisposition::Continued);
        assert_eq!(harness.history_len(room_id).await, i + 1);
    }

    // Moving twice in a row is rejected.
    let err = harness
        .service
        .apply_move(room_id, guest, 3, 3)
        .await
        .unwrap_err();
    assert_eq!(err, GameError::NotYourTurn);
}

#[tokio::test]
async fn test_winning_move_ends_the_match() {
    let harness = Harness::new(AppConfig::default());
    let (room_id, host, guest) = harness.seed_two_player_room();
    harness.service.start_game(room_id, host).await.unwrap();

    for y in 0..4 {
        harness.service.apply_move(room_id, host, 10, y).await.unwrap();
        harness.service.apply_move(room_id, guest, 15, y).await.unwrap();
    }
    let disposition = harness
        .service
        .apply_move(room_id, host, 10, 4)
        .await
        .unwrap();
    assert_eq!(disposition, MoveDisposition::Ended(EndReason::FiveInRow));

    // The match state is destroyed and the room flipped out of playing.
    assert!(harness.service.registry().get(&room_id).is_none());
    assert_eq!(
        harness.status(room_id).await,
        Some(caro::domain::models::RoomStatus::Ended)
    );

    // The recorded outcome names the winner; recording is detached, so give
    // it a moment.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let outcomes = harness.outcomes(room_id);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].winner, Some(host));
    assert_eq!(outcomes[0].loser, Some(guest));
    assert_eq!(outcomes[0].reason, EndReason::FiveInRow);
    assert_eq!(outcomes[0].winning_line.as_ref().map(|l| l.len()), Some(5));

    // Further moves bounce off the ended room.
    let err = harness
        .service
        .apply_move(room_id, guest, 0, 0)
        .await
        .unwrap_err();
    assert_eq!(err, GameError::NotPlaying);
}
