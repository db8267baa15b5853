//! Strictly sequenced request/response loop over the analysis engine.
//!
//! One request per move prefix, each answered before the next is built. The
//! `&mut self` receiver of [`AnalysisExchange::exchange`] is what keeps a
//! second request from ever being in flight.

use std::future::Future;
use std::time::Duration;

use sgf_core::GameRecord;
use tracing::{debug, info};

use crate::error::{ProcessError, ReviewError};
use crate::protocol::{AnalysisRequest, AnalysisResponse};

/// Anything that can answer one analysis request at a time.
pub trait AnalysisExchange {
    fn exchange(
        &mut self,
        request: AnalysisRequest,
    ) -> impl Future<Output = Result<AnalysisResponse, ReviewError>> + Send;
}

/// Where the win rate before move 1 comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Baseline {
    /// Ask the engine about the initial position (ply 0).
    Query,
    /// Use a fixed value for the first mover.
    Fixed(f64),
}

/// Per-game request parameters, resolved once from config and record.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceSettings {
    pub rules: String,
    pub komi: f64,
    pub max_visits: Option<u32>,
    pub baseline: Baseline,
    pub exchange_timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BaselineResult {
    Queried(AnalysisResponse),
    Fixed(f64),
}

/// Engine answers in ply order; `plies[k - 1]` describes the position
/// after move `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedAnalysis {
    pub baseline: BaselineResult,
    pub plies: Vec<AnalysisResponse>,
}

/// Build the request for the position reached after `ply` moves.
pub fn build_request(
    id: String,
    game: &GameRecord,
    settings: &SequenceSettings,
    ply: usize,
) -> AnalysisRequest {
    AnalysisRequest {
        id,
        initial_stones: game
            .initial_stones
            .iter()
            .map(|s| (s.player, s.vertex))
            .collect(),
        moves: game.moves[..ply]
            .iter()
            .map(|m| (m.player, m.vertex))
            .collect(),
        initial_player: game.moves.first().map(|m| m.player),
        rules: settings.rules.clone(),
        komi: settings.komi,
        board_x_size: game.board_size,
        board_y_size: game.board_size,
        analyze_turns: vec![ply],
        max_visits: settings.max_visits,
    }
}

/// Analyse every move prefix of `game`, baseline first when requested.
pub async fn run_sequence<E: AnalysisExchange>(
    engine: &mut E,
    game: &GameRecord,
    settings: &SequenceSettings,
) -> Result<SequencedAnalysis, ReviewError> {
    let total = game.moves.len();
    info!(
        moves = total,
        baseline = ?settings.baseline,
        "Sequencing analysis requests"
    );

    let mut next_id: u64 = 0;
    let baseline = match settings.baseline {
        Baseline::Query => {
            BaselineResult::Queried(exchange_one(engine, game, settings, &mut next_id, 0).await?)
        }
        Baseline::Fixed(p) => BaselineResult::Fixed(p),
    };

    let mut plies = Vec::with_capacity(total);
    for ply in 1..=total {
        let response = exchange_one(engine, game, settings, &mut next_id, ply).await?;
        debug!(
            ply,
            total,
            candidates = response.move_infos.len(),
            "Position analysed"
        );
        plies.push(response);
    }

    Ok(SequencedAnalysis { baseline, plies })
}

async fn exchange_one<E: AnalysisExchange>(
    engine: &mut E,
    game: &GameRecord,
    settings: &SequenceSettings,
    next_id: &mut u64,
    ply: usize,
) -> Result<AnalysisResponse, ReviewError> {
    let id = next_id.to_string();
    *next_id += 1;
    let request = build_request(id.clone(), game, settings, ply);

    let response = match settings.exchange_timeout {
        Some(after) => tokio::time::timeout(after, engine.exchange(request))
            .await
            .map_err(|_| ProcessError::Timeout {
                id: id.clone(),
                after,
            })??,
        None => engine.exchange(request).await?,
    };

    Ok(response.check(&id)?)
}
