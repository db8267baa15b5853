//! Go game review: sequences KataGo analysis over a record's moves and
//! ranks the moves by how much win rate they gave away.

pub mod analysis;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod katago;
pub mod protocol;
pub mod report;
pub mod sequencer;

pub use analysis::{
    Candidate, MoveClass, MoveEvaluation, PlayerSummary, Thresholds, WinratePerspective,
};
pub use analyzer::{analyze_with, review_file, review_files, review_game, BatchReview, GameReview};
pub use config::ReviewConfig;
pub use error::{ProcessError, ProtocolError, ReviewError};
pub use katago::{EngineCommand, EngineSession};
pub use sequencer::{AnalysisExchange, Baseline, SequenceSettings};
