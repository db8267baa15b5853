//! SGF game records for analysis: parsing, coordinate conversion and move
//! extraction. Everything here is synchronous and free of I/O except
//! [`extract::load_sgf`].

pub mod coord;
pub mod error;
pub mod extract;
pub mod game_data;
pub mod sgf;

pub use coord::{to_engine_coordinate, to_record_coordinate, BoardCoordinate, Vertex};
pub use error::{ConversionError, ExtractError, FormatError};
pub use extract::{extract_game, extract_game_with_default, load_sgf, parse_game};
pub use game_data::{GameRecord, InitialStone, Move, Player, DEFAULT_BOARD_SIZE};
pub use sgf::{parse_sgf, RecordNode};
