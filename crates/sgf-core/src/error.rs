//! Record and coordinate error types

use thiserror::Error;

/// The game record text could not be read as an SGF tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("missing root delimiters: record must be wrapped in '(' ... ')'")]
    MissingRootDelimiters,

    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated value for property {key} starting at offset {offset}")]
    UnterminatedValue { key: String, offset: usize },

    #[error("property {key} at offset {offset} has no value")]
    MissingValue { key: String, offset: usize },

    #[error("game tree opened at offset {offset} is never closed")]
    UnclosedGameTree { offset: usize },

    #[error("game tree at offset {offset} contains no nodes")]
    EmptyGameTree { offset: usize },

    #[error("unexpected content after the root game tree at offset {offset}")]
    TrailingContent { offset: usize },

    #[error("invalid {key} value {value:?}")]
    InvalidProperty { key: String, value: String },

    #[error("node at ply {ply} carries moves for both players")]
    ConflictingMoves { ply: usize },
}

/// A coordinate could not be mapped between record and engine notation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("malformed coordinate {0:?}")]
    Malformed(String),

    #[error("coordinate {coord:?} is outside a {board_size}x{board_size} board")]
    OutOfBounds { coord: String, board_size: usize },

    #[error("unsupported board size {0} (expected 2..=19)")]
    UnsupportedBoardSize(usize),
}

/// Failure while turning a parsed record into a move list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("conversion error in {key}: {source}")]
    Conversion {
        key: String,
        #[source]
        source: ConversionError,
    },
}
