//! Core review logic: one game record in, evaluated and ranked moves out.
//!
//! The engine is started per game and shut down before the result (or the
//! error) is returned.

use std::path::{Path, PathBuf};

use serde::Serialize;
use sgf_core::{extract_game_with_default, load_sgf, parse_sgf, GameRecord};
use tracing::{error, info, warn};

use crate::analysis::{self, MoveEvaluation, PlayerSummary};
use crate::config::ReviewConfig;
use crate::error::ReviewError;
use crate::katago::EngineSession;
use crate::sequencer::{run_sequence, AnalysisExchange, SequenceSettings};

const DEFAULT_RULES: &str = "tromp-taylor";
const DEFAULT_KOMI: f64 = 7.5;

/// Review output for a single game
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameReview {
    pub board_size: usize,
    pub rules: String,
    pub komi: f64,
    pub move_count: usize,
    pub evaluations: Vec<MoveEvaluation>,
    pub worst: Vec<MoveEvaluation>,
    pub summary: Vec<PlayerSummary>,
}

/// Reviews of a batch of records. A failed record is logged and counted;
/// it never stops the others.
#[derive(Debug, Default)]
pub struct BatchReview {
    pub reviews: Vec<(PathBuf, GameReview)>,
    pub failed: usize,
}

/// Rules and komi come from the config when set, then the record, then the
/// engine defaults.
pub fn resolve_settings(game: &GameRecord, config: &ReviewConfig) -> SequenceSettings {
    SequenceSettings {
        rules: config
            .rules
            .clone()
            .or_else(|| game.rules.clone())
            .unwrap_or_else(|| DEFAULT_RULES.to_string()),
        komi: config.komi.or(game.komi).unwrap_or(DEFAULT_KOMI),
        max_visits: config.max_visits,
        baseline: config.baseline,
        exchange_timeout: config.exchange_timeout,
    }
}

/// Load, parse and review one record file.
pub async fn review_file(path: &Path, config: &ReviewConfig) -> Result<GameReview, ReviewError> {
    let text = load_sgf(path).map_err(|source| ReviewError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let root = parse_sgf(&text)?;
    let game = extract_game_with_default(&root, config.default_board_size)?;
    info!(
        path = %path.display(),
        board_size = game.board_size,
        moves = game.moves.len(),
        handicap = game.initial_stones.len(),
        "Record loaded"
    );
    review_game(&game, config).await
}

/// Review each record in turn with its own engine.
pub async fn review_files(paths: &[PathBuf], config: &ReviewConfig) -> BatchReview {
    let mut batch = BatchReview::default();
    for path in paths {
        match review_file(path, config).await {
            Ok(review) => batch.reviews.push((path.clone(), review)),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Review failed");
                batch.failed += 1;
            }
        }
    }
    batch
}

/// Review a game against a freshly started engine.
pub async fn review_game(game: &GameRecord, config: &ReviewConfig) -> Result<GameReview, ReviewError> {
    if game.moves.is_empty() {
        info!("No moves to review, engine not started");
        return Ok(empty_review(game, config));
    }

    let mut engine = EngineSession::spawn(&config.engine_command())?;
    let outcome = analyze_with(&mut engine, game, config).await;
    engine.shutdown().await;

    if let Err(e) = &outcome {
        warn!(error = %e, "Review aborted");
    }
    outcome
}

/// Review a game against any engine. Empty games send nothing.
pub async fn analyze_with<E: AnalysisExchange>(
    engine: &mut E,
    game: &GameRecord,
    config: &ReviewConfig,
) -> Result<GameReview, ReviewError> {
    if game.moves.is_empty() {
        return Ok(empty_review(game, config));
    }

    let settings = resolve_settings(game, config);
    info!(
        moves = game.moves.len(),
        rules = %settings.rules,
        komi = settings.komi,
        "Starting review"
    );

    let sequenced = run_sequence(engine, game, &settings).await?;
    let evaluations =
        analysis::evaluate_moves(game, &sequenced, config.perspective, &config.thresholds)?;
    let worst = analysis::rank_worst(&evaluations, config.worst_moves);
    let summary = analysis::summarize(&evaluations);

    if let Some(top) = worst.first() {
        info!(
            ply = top.ply,
            player = %top.player,
            vertex = %top.vertex,
            drop = top.win_rate_drop,
            "Review complete"
        );
    }

    Ok(GameReview {
        board_size: game.board_size,
        rules: settings.rules,
        komi: settings.komi,
        move_count: game.moves.len(),
        evaluations,
        worst,
        summary,
    })
}

fn empty_review(game: &GameRecord, config: &ReviewConfig) -> GameReview {
    let settings = resolve_settings(game, config);
    GameReview {
        board_size: game.board_size,
        rules: settings.rules,
        komi: settings.komi,
        move_count: 0,
        evaluations: Vec::new(),
        worst: Vec::new(),
        summary: analysis::summarize(&[]),
    }
}
