//! KataGo JSON analysis protocol, one object per line in each direction.

use serde::{Deserialize, Serialize};
use sgf_core::{Player, Vertex};

use crate::error::ProtocolError;

/// A single analysis query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub id: String,
    pub initial_stones: Vec<(Player, Vertex)>,
    pub moves: Vec<(Player, Vertex)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_player: Option<Player>,
    pub rules: String,
    pub komi: f64,
    pub board_x_size: usize,
    pub board_y_size: usize,
    pub analyze_turns: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_visits: Option<u32>,
}

impl AnalysisRequest {
    /// The ply this request asks about.
    pub fn analyze_at(&self) -> Option<usize> {
        self.analyze_turns.first().copied()
    }
}

/// One candidate move reported for a position.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MoveInfo {
    #[serde(rename = "move")]
    pub mv: String,
    pub winrate: f64,
    #[serde(default)]
    pub visits: u64,
    /// Engine ranking, 0 = best. Not every engine build reports it.
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub pv: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub turn_number: Option<usize>,
    #[serde(default)]
    pub move_infos: Vec<MoveInfo>,
}

impl AnalysisResponse {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(line).map_err(|source| ProtocolError::Malformed {
            line: line.to_string(),
            source,
        })
    }

    /// A warning line carries no analysis; the real answer follows it.
    pub fn is_warning_only(&self) -> bool {
        self.warning.is_some() && self.error.is_none() && self.move_infos.is_empty()
    }

    /// Reject engine errors and answers to a different request.
    pub fn check(self, expected_id: &str) -> Result<Self, ProtocolError> {
        if let Some(message) = self.error.as_deref().filter(|m| !m.is_empty()) {
            return Err(ProtocolError::Engine {
                id: self.id.clone(),
                message: message.to_string(),
            });
        }
        if self.id != expected_id {
            return Err(ProtocolError::IdMismatch {
                expected: expected_id.to_string(),
                got: self.id,
            });
        }
        Ok(self)
    }

    /// Highest-ranked candidate: lowest `order`, else the first listed.
    pub fn top_candidate(&self) -> Option<&MoveInfo> {
        self.move_infos
            .iter()
            .min_by_key(|info| info.order.unwrap_or(u32::MAX))
    }
}
