#![allow(dead_code)]

use std::path::PathBuf;

use review_worker::protocol::{AnalysisRequest, AnalysisResponse, MoveInfo};
use review_worker::{AnalysisExchange, ReviewError};
use sgf_core::Player;

/// Path of a record under `tests/data`.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

/// Stand-in for KataGo. Answers every request with one candidate whose
/// Black win rate is `black_winrates[turn]` (0.5 past the end).
pub struct FakeEngine {
    pub black_winrates: Vec<f64>,
    /// Report win rates for the side to move instead of for Black
    pub side_to_move: bool,
    pub requests: Vec<AnalysisRequest>,
}

impl FakeEngine {
    pub fn new(black_winrates: Vec<f64>) -> Self {
        Self {
            black_winrates,
            side_to_move: false,
            requests: Vec::new(),
        }
    }

    pub fn reporting_side_to_move(mut self) -> Self {
        self.side_to_move = true;
        self
    }
}

impl AnalysisExchange for FakeEngine {
    async fn exchange(&mut self, request: AnalysisRequest) -> Result<AnalysisResponse, ReviewError> {
        let turn = request.analyze_at().unwrap_or_default();
        let black = self.black_winrates.get(turn).copied().unwrap_or(0.5);

        let to_move = match request.moves.last() {
            Some((player, _)) => player.opponent(),
            None => request.initial_player.unwrap_or(Player::Black),
        };
        let winrate = if self.side_to_move && to_move == Player::White {
            1.0 - black
        } else {
            black
        };

        let response = AnalysisResponse {
            id: request.id.clone(),
            error: None,
            warning: None,
            turn_number: Some(turn),
            move_infos: vec![
                MoveInfo {
                    mv: "pass".to_string(),
                    winrate: 0.0,
                    visits: 1,
                    order: Some(1),
                    pv: vec![],
                },
                MoveInfo {
                    mv: "Q4".to_string(),
                    winrate,
                    visits: 100,
                    order: Some(0),
                    pv: vec!["Q4".to_string(), "D16".to_string()],
                },
            ],
        };
        self.requests.push(request);
        Ok(response)
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
