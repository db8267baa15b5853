use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coord::Vertex;

pub const DEFAULT_BOARD_SIZE: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    #[serde(rename = "B")]
    Black,
    #[serde(rename = "W")]
    White,
}

impl Player {
    /// Single-letter form used by both SGF keys and the engine protocol.
    pub fn letter(&self) -> &'static str {
        match self {
            Player::Black => "B",
            Player::White => "W",
        }
    }

    pub fn opponent(&self) -> Player {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Player::Black => "Black",
            Player::White => "White",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Move {
    pub player: Player,
    pub vertex: Vertex,
    pub ply: usize, // 1-based
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InitialStone {
    pub player: Player,
    pub vertex: Vertex,
}

/// Everything the analysis needs from one game record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRecord {
    pub board_size: usize,
    pub komi: Option<f64>,
    pub rules: Option<String>,
    pub initial_stones: Vec<InitialStone>,
    pub moves: Vec<Move>,
}
