//! Integration tests: records through sequencing, evaluation and reporting,
//! with a scripted engine standing in for KataGo.

mod common;

use std::path::Path;

use common::{approx, fixture, FakeEngine};
use review_worker::report::{render_json, TextReport};
use review_worker::{
    analyze_with, review_file, review_files, Baseline, MoveClass, ReviewConfig, ReviewError,
    WinratePerspective,
};
use sgf_core::{load_sgf, parse_game, FormatError, Player};

fn offline_config() -> ReviewConfig {
    ReviewConfig {
        katago_path: "/nonexistent/katago-binary".to_string(),
        ..ReviewConfig::default()
    }
}

const SHORT_GAME: &str = "(;SZ[9]KM[6.5]RU[AGA];B[cc];W[gg];B[cg];W[gc])";

#[tokio::test]
async fn test_worst_moves_with_queried_baseline() {
    let game = parse_game(SHORT_GAME).unwrap();
    let mut engine = FakeEngine::new(vec![0.5, 0.45, 0.70, 0.40, 0.52]);

    let review = analyze_with(&mut engine, &game, &ReviewConfig::default())
        .await
        .unwrap();

    // Opening position plus one request per move, in order
    assert_eq!(engine.requests.len(), 5);
    for (turn, request) in engine.requests.iter().enumerate() {
        assert_eq!(request.id, turn.to_string());
        assert_eq!(request.analyze_turns, vec![turn]);
        assert_eq!(request.moves.len(), turn);
        assert_eq!(request.rules, "aga");
        assert_eq!(request.komi, 6.5);
        assert_eq!(request.board_x_size, 9);
    }

    assert_eq!(review.move_count, 4);
    assert_eq!(review.evaluations.len(), 4);
    let worst: Vec<usize> = review.worst.iter().map(|e| e.ply).collect();
    assert_eq!(worst, vec![3, 2, 4]);

    let ply3 = &review.worst[0];
    assert_eq!(ply3.player, Player::Black);
    assert_eq!(ply3.vertex.to_string(), "C3");
    assert!(approx(ply3.win_rate_before, 0.70));
    assert!(approx(ply3.win_rate_after, 0.40));
    assert_eq!(ply3.classification, MoveClass::Blunder);
    assert_eq!(ply3.best_move.as_deref(), Some("Q4"));

    let ply2 = &review.worst[1];
    assert_eq!(ply2.player, Player::White);
    assert!(approx(ply2.win_rate_drop, 0.25));

    assert_eq!(review.summary[0].moves, 2);
    assert_eq!(review.summary[1].moves, 2);
    assert_eq!(review.summary[0].worst.as_ref().map(|e| e.ply), Some(3));
}

#[tokio::test]
async fn test_side_to_move_reporting_gives_same_review() {
    let game = parse_game(SHORT_GAME).unwrap();
    let winrates = vec![0.5, 0.45, 0.70, 0.40, 0.52];

    let mut black_engine = FakeEngine::new(winrates.clone());
    let black = analyze_with(&mut black_engine, &game, &ReviewConfig::default())
        .await
        .unwrap();

    let mut stm_engine = FakeEngine::new(winrates).reporting_side_to_move();
    let config = ReviewConfig {
        perspective: WinratePerspective::SideToMove,
        ..ReviewConfig::default()
    };
    let side_to_move = analyze_with(&mut stm_engine, &game, &config).await.unwrap();

    let plies = |r: &review_worker::GameReview| r.worst.iter().map(|e| e.ply).collect::<Vec<_>>();
    assert_eq!(plies(&black), plies(&side_to_move));
    for (a, b) in black.evaluations.iter().zip(&side_to_move.evaluations) {
        assert!(approx(a.win_rate_drop, b.win_rate_drop));
    }
}

#[tokio::test]
async fn test_fixed_baseline_skips_opening_query() {
    let game = parse_game(SHORT_GAME).unwrap();
    let mut engine = FakeEngine::new(vec![0.0, 0.45, 0.70, 0.40, 0.52]);
    let config = ReviewConfig {
        baseline: Baseline::Fixed(0.5),
        ..ReviewConfig::default()
    };

    let review = analyze_with(&mut engine, &game, &config).await.unwrap();

    assert_eq!(engine.requests.len(), 4);
    assert_eq!(engine.requests[0].id, "0");
    assert_eq!(engine.requests[0].analyze_turns, vec![1]);
    assert!(approx(review.evaluations[0].win_rate_before, 0.5));
    assert_eq!(review.evaluations[0].best_move, None);
}

#[tokio::test]
async fn test_reference_game_review() {
    let text = load_sgf(fixture("reference_game.sgf")).unwrap();
    let game = parse_game(&text).unwrap();

    // Black collapses at ply 37, White gives some of it back at ply 38
    let mut winrates = vec![0.5; 117];
    winrates[37] = 0.1;
    winrates[38] = 0.3;
    let mut engine = FakeEngine::new(winrates);

    let review = analyze_with(&mut engine, &game, &ReviewConfig::default())
        .await
        .unwrap();

    assert_eq!(engine.requests.len(), 117);
    assert_eq!(engine.requests.last().unwrap().moves.len(), 116);
    let worst: Vec<usize> = review.worst.iter().map(|e| e.ply).collect();
    assert_eq!(worst, vec![37, 38, 1]);
    assert_eq!(review.worst[0].vertex.to_string(), "B17");

    let text = TextReport {
        path: Path::new("reference_game.sgf"),
        review: &review,
        show_variations: true,
    }
    .to_string();
    assert!(text.contains("116 moves"));
    assert!(text.contains("ply  37  Black B17"));
    assert!(text.contains("line: Q4 D16"));
    assert!(text.contains("Q4    winrate 0.500  visits 100"));
    assert!(text.contains("pass  winrate 0.000  visits 1"));

    let json: serde_json::Value =
        serde_json::from_str(&render_json(Path::new("reference_game.sgf"), &review).unwrap())
            .unwrap();
    assert_eq!(json["move_count"], 116);
    assert_eq!(json["worst"][0]["move"], "B17");
}

#[tokio::test]
async fn test_empty_record_needs_no_engine() {
    let review = review_file(&fixture("empty_game.sgf"), &offline_config())
        .await
        .unwrap();

    assert_eq!(review.move_count, 0);
    assert_eq!(review.board_size, 9);
    assert_eq!(review.rules, "chinese");
    assert_eq!(review.komi, 7.0);
    assert!(review.worst.is_empty());
}

#[tokio::test]
async fn test_truncated_record_fails_before_engine() {
    let err = review_file(&fixture("truncated.sgf"), &offline_config())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReviewError::Format(FormatError::MissingRootDelimiters)
    ));
}

#[tokio::test]
async fn test_missing_engine_is_reported_per_file() {
    let err = review_file(&fixture("handicap_game.sgf"), &offline_config())
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::Process(_)));
}

#[tokio::test]
async fn test_failed_record_does_not_stop_batch() {
    let paths = vec![
        fixture("truncated.sgf"),
        fixture("empty_game.sgf"),
        fixture("missing.sgf"),
    ];
    let batch = review_files(&paths, &offline_config()).await;

    assert_eq!(batch.failed, 2);
    assert_eq!(batch.reviews.len(), 1);
    let (path, review) = &batch.reviews[0];
    assert_eq!(path, &fixture("empty_game.sgf"));
    assert_eq!(review.board_size, 9);
}
