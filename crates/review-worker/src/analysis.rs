//! Move evaluation and classification, pure functions only
//! (No engine, process or file dependencies)

use std::str::FromStr;

use serde::Serialize;
use sgf_core::{GameRecord, Move, Player, Vertex};

use crate::error::{ProtocolError, ReviewError};
use crate::protocol::{AnalysisResponse, MoveInfo};
use crate::sequencer::{BaselineResult, SequencedAnalysis};

/// How many moves a review reports by default
pub const DEFAULT_WORST_MOVES: usize = 3;

/// Engine candidates kept per position
pub const TOP_CANDIDATES: usize = 3;

/// Classification thresholds (win-rate drop)
const THRESHOLD_BEST: f64 = 0.02;
const THRESHOLD_GOOD: f64 = 0.05;
const THRESHOLD_INACCURACY: f64 = 0.10;
const THRESHOLD_MISTAKE: f64 = 0.20;

/// Whose win rate the engine reports (its `reportAnalysisWinratesAs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WinratePerspective {
    #[default]
    Black,
    White,
    SideToMove,
}

impl WinratePerspective {
    /// Convert an engine win rate for a position where `to_move` is next
    /// into Black's win rate.
    fn for_black(self, winrate: f64, to_move: Player) -> f64 {
        let black_view = match self {
            WinratePerspective::Black => true,
            WinratePerspective::White => false,
            WinratePerspective::SideToMove => to_move == Player::Black,
        };
        if black_view {
            winrate
        } else {
            1.0 - winrate
        }
    }
}

impl FromStr for WinratePerspective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "black" | "b" => Ok(WinratePerspective::Black),
            "white" | "w" => Ok(WinratePerspective::White),
            "side-to-move" | "sidetomove" => Ok(WinratePerspective::SideToMove),
            other => Err(format!(
                "unknown win-rate perspective {other:?} (expected black, white or side-to-move)"
            )),
        }
    }
}

fn from_black(black_winrate: f64, player: Player) -> f64 {
    match player {
        Player::Black => black_winrate,
        Player::White => 1.0 - black_winrate,
    }
}

/// Upper bounds (exclusive) on the drop for each class. Anything at or above
/// `mistake` is a blunder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub best: f64,
    pub good: f64,
    pub inaccuracy: f64,
    pub mistake: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            best: THRESHOLD_BEST,
            good: THRESHOLD_GOOD,
            inaccuracy: THRESHOLD_INACCURACY,
            mistake: THRESHOLD_MISTAKE,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), String> {
        let ordered = [self.best, self.good, self.inaccuracy, self.mistake];
        if ordered.iter().any(|t| !t.is_finite()) {
            return Err("classification thresholds must be finite".to_string());
        }
        if ordered.windows(2).any(|w| w[0] > w[1]) {
            return Err(format!(
                "classification thresholds must not decrease: {ordered:?}"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveClass {
    Best,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
}

impl MoveClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveClass::Best => "best",
            MoveClass::Good => "good",
            MoveClass::Inaccuracy => "inaccuracy",
            MoveClass::Mistake => "mistake",
            MoveClass::Blunder => "blunder",
        }
    }
}

pub fn classify_move(drop: f64, thresholds: &Thresholds) -> MoveClass {
    if drop < thresholds.best {
        MoveClass::Best
    } else if drop < thresholds.good {
        MoveClass::Good
    } else if drop < thresholds.inaccuracy {
        MoveClass::Inaccuracy
    } else if drop < thresholds.mistake {
        MoveClass::Mistake
    } else {
        MoveClass::Blunder
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveEvaluation {
    pub ply: usize,
    pub player: Player,
    #[serde(rename = "move")]
    pub vertex: Vertex,
    /// Win rates are from the mover's point of view.
    pub win_rate_before: f64,
    pub win_rate_after: f64,
    pub win_rate_drop: f64,
    pub classification: MoveClass,
    /// Engine's preferred move in the position before this one, when known.
    pub best_move: Option<String>,
    pub best_line: Vec<String>,
    /// Strongest engine candidates in that position
    pub candidates: Vec<Candidate>,
}

/// A move the engine considered, with its win rate for the side to move.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    #[serde(rename = "move")]
    pub mv: String,
    pub winrate: f64,
    pub visits: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Classifications {
    pub best: u32,
    pub good: u32,
    pub inaccuracy: u32,
    pub mistake: u32,
    pub blunder: u32,
}

impl Classifications {
    fn record(&mut self, class: MoveClass) {
        match class {
            MoveClass::Best => self.best += 1,
            MoveClass::Good => self.good += 1,
            MoveClass::Inaccuracy => self.inaccuracy += 1,
            MoveClass::Mistake => self.mistake += 1,
            MoveClass::Blunder => self.blunder += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.best + self.good + self.inaccuracy + self.mistake + self.blunder
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub player: Player,
    pub moves: u32,
    pub mean_drop: f64,
    pub classifications: Classifications,
    pub worst: Option<MoveEvaluation>,
}

/// Compute the win-rate drop of every move from the sequenced responses.
///
/// `analysis.plies[k - 1]` must describe the position after move `k`.
pub fn evaluate_moves(
    game: &GameRecord,
    analysis: &SequencedAnalysis,
    perspective: WinratePerspective,
    thresholds: &Thresholds,
) -> Result<Vec<MoveEvaluation>, ReviewError> {
    if analysis.plies.len() < game.moves.len() {
        return Err(ProtocolError::MissingResponse {
            ply: analysis.plies.len() + 1,
        }
        .into());
    }
    let Some(first) = game.moves.first() else {
        return Ok(Vec::new());
    };

    // Black's win rate before the current move, plus what the engine
    // suggested there.
    let (mut before_black, mut before_top, mut before_candidates) = match &analysis.baseline {
        BaselineResult::Queried(response) => {
            let top = top_candidate(response)?;
            (
                perspective.for_black(top.winrate, first.player),
                Some(top),
                rank_candidates(response, perspective, first.player),
            )
        }
        BaselineResult::Fixed(p) => (from_black(*p, first.player), None, Vec::new()),
    };

    let mut evaluations = Vec::with_capacity(game.moves.len());
    for (mv, response) in game.moves.iter().zip(&analysis.plies) {
        let to_move = mv.player.opponent();
        let top = top_candidate(response)?;
        let after_black = perspective.for_black(top.winrate, to_move);
        let candidates = rank_candidates(response, perspective, to_move);
        evaluations.push(evaluate_one(
            mv,
            before_black,
            after_black,
            before_top,
            std::mem::replace(&mut before_candidates, candidates),
            thresholds,
        ));
        before_black = after_black;
        before_top = Some(top);
    }

    Ok(evaluations)
}

fn evaluate_one(
    mv: &Move,
    before_black: f64,
    after_black: f64,
    before_top: Option<&MoveInfo>,
    candidates: Vec<Candidate>,
    thresholds: &Thresholds,
) -> MoveEvaluation {
    let win_rate_before = from_black(before_black, mv.player);
    let win_rate_after = from_black(after_black, mv.player);
    let win_rate_drop = win_rate_before - win_rate_after;

    MoveEvaluation {
        ply: mv.ply,
        player: mv.player,
        vertex: mv.vertex,
        win_rate_before,
        win_rate_after,
        win_rate_drop,
        classification: classify_move(win_rate_drop, thresholds),
        best_move: before_top.map(|info| info.mv.clone()),
        best_line: before_top.map(|info| info.pv.clone()).unwrap_or_default(),
        candidates,
    }
}

/// The strongest few candidates for `to_move`, best win rate first.
fn rank_candidates(
    response: &AnalysisResponse,
    perspective: WinratePerspective,
    to_move: Player,
) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = response
        .move_infos
        .iter()
        .map(|info| Candidate {
            mv: info.mv.clone(),
            winrate: from_black(perspective.for_black(info.winrate, to_move), to_move),
            visits: info.visits,
        })
        .collect();
    candidates.sort_by(|a, b| {
        b.winrate
            .total_cmp(&a.winrate)
            .then(b.visits.cmp(&a.visits))
    });
    candidates.truncate(TOP_CANDIDATES);
    candidates
}

fn top_candidate(response: &AnalysisResponse) -> Result<&MoveInfo, ProtocolError> {
    response
        .top_candidate()
        .ok_or_else(|| ProtocolError::NoCandidates {
            id: response.id.clone(),
        })
}

/// The `n` largest drops, largest first; equal drops keep ply order.
pub fn rank_worst(evaluations: &[MoveEvaluation], n: usize) -> Vec<MoveEvaluation> {
    let mut ranked = evaluations.to_vec();
    ranked.sort_by(|a, b| {
        b.win_rate_drop
            .total_cmp(&a.win_rate_drop)
            .then(a.ply.cmp(&b.ply))
    });
    ranked.truncate(n);
    ranked
}

/// Per-player counts, mean drop and worst move. Black first.
pub fn summarize(evaluations: &[MoveEvaluation]) -> Vec<PlayerSummary> {
    [Player::Black, Player::White]
        .into_iter()
        .map(|player| {
            let own: Vec<MoveEvaluation> = evaluations
                .iter()
                .filter(|e| e.player == player)
                .cloned()
                .collect();

            let mut classifications = Classifications::default();
            for e in &own {
                classifications.record(e.classification);
            }
            let total_drop: f64 = own.iter().map(|e| e.win_rate_drop).sum();
            let mean_drop = if own.is_empty() {
                0.0
            } else {
                total_drop / own.len() as f64
            };

            PlayerSummary {
                player,
                moves: own.len() as u32,
                mean_drop,
                classifications,
                worst: rank_worst(&own, 1).into_iter().next(),
            }
        })
        .collect()
}
