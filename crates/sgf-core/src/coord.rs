//! Coordinate conversion between SGF record notation and engine notation.
//!
//! Record notation is two lowercase letters (`pd`): column then row, both
//! 0-based from the top-left corner. Engine notation is a column letter that
//! skips `I` followed by a row number counted from the bottom (`Q16`).

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::ConversionError;

pub const MAX_BOARD_SIZE: usize = 19;

/// Engine column letters (no `I`).
const COLUMN_LETTERS: &[u8; MAX_BOARD_SIZE] = b"ABCDEFGHJKLMNOPQRST";

/// A validated point: column index `0..N` and row number `1..=N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoardCoordinate {
    column: u8,
    row: u8,
}

impl BoardCoordinate {
    pub fn new(column: usize, row: usize, board_size: usize) -> Result<Self, ConversionError> {
        check_board_size(board_size)?;
        if column >= board_size || row == 0 || row > board_size {
            return Err(ConversionError::OutOfBounds {
                coord: format!("({column}, {row})"),
                board_size,
            });
        }
        Ok(Self {
            column: column as u8,
            row: row as u8,
        })
    }

    /// 0-based column index (before the `I` skip).
    pub fn column(&self) -> usize {
        self.column as usize
    }

    /// 1-based row counted from the bottom edge.
    pub fn row(&self) -> usize {
        self.row as usize
    }

    pub fn column_letter(&self) -> char {
        COLUMN_LETTERS[self.column as usize] as char
    }
}

impl fmt::Display for BoardCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letter(), self.row)
    }
}

/// A move target: a point on the board or a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vertex {
    Point(BoardCoordinate),
    Pass,
}

impl Vertex {
    /// Parse engine notation (`Q16`, `q16`, `pass`).
    pub fn parse_engine(text: &str, board_size: usize) -> Result<Self, ConversionError> {
        check_board_size(board_size)?;
        let text = text.trim();
        if text.eq_ignore_ascii_case("pass") {
            return Ok(Vertex::Pass);
        }

        let mut chars = text.chars();
        let letter = chars
            .next()
            .map(|c| c.to_ascii_uppercase())
            .ok_or_else(|| ConversionError::Malformed(text.to_string()))?;
        let column = COLUMN_LETTERS
            .iter()
            .position(|&c| c as char == letter)
            .ok_or_else(|| ConversionError::Malformed(text.to_string()))?;
        let row: usize = chars
            .as_str()
            .parse()
            .map_err(|_| ConversionError::Malformed(text.to_string()))?;

        BoardCoordinate::new(column, row, board_size)
            .map(Vertex::Point)
            .map_err(|_| ConversionError::OutOfBounds {
                coord: text.to_string(),
                board_size,
            })
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Vertex::Pass)
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vertex::Point(coord) => f.pad(&coord.to_string()),
            Vertex::Pass => f.pad("pass"),
        }
    }
}

impl Serialize for Vertex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn check_board_size(board_size: usize) -> Result<(), ConversionError> {
    if (2..=MAX_BOARD_SIZE).contains(&board_size) {
        Ok(())
    } else {
        Err(ConversionError::UnsupportedBoardSize(board_size))
    }
}

/// Convert a record coordinate (`pd`, empty for pass) to engine notation.
pub fn to_engine_coordinate(record: &str, board_size: usize) -> Result<Vertex, ConversionError> {
    check_board_size(board_size)?;
    if record.is_empty() {
        return Ok(Vertex::Pass);
    }

    let bytes = record.as_bytes();
    if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_lowercase) {
        return Err(ConversionError::Malformed(record.to_string()));
    }

    let column = (bytes[0] - b'a') as usize;
    let raw_row = (bytes[1] - b'a') as usize;
    if column >= board_size || raw_row >= board_size {
        return Err(ConversionError::OutOfBounds {
            coord: record.to_string(),
            board_size,
        });
    }

    Ok(Vertex::Point(BoardCoordinate {
        column: column as u8,
        row: (board_size - raw_row) as u8,
    }))
}

/// Inverse of [`to_engine_coordinate`]. A pass becomes the empty string.
pub fn to_record_coordinate(vertex: Vertex, board_size: usize) -> Result<String, ConversionError> {
    check_board_size(board_size)?;
    let coord = match vertex {
        Vertex::Pass => return Ok(String::new()),
        Vertex::Point(coord) => coord,
    };

    if coord.column() >= board_size || coord.row() > board_size {
        return Err(ConversionError::OutOfBounds {
            coord: coord.to_string(),
            board_size,
        });
    }

    let column = (b'a' + coord.column) as char;
    let row = (b'a' + (board_size - coord.row()) as u8) as char;
    Ok(format!("{column}{row}"))
}
