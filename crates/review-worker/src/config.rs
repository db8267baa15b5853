//! Review configuration from environment variables, overridden by CLI flags

use std::env;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, error};

use crate::analysis::{Thresholds, WinratePerspective, DEFAULT_WORST_MOVES};
use crate::error::ReviewError;
use crate::katago::EngineCommand;
use crate::sequencer::Baseline;

const DEFAULT_MAX_VISITS: u32 = 1000;

#[derive(Clone, Debug, PartialEq)]
pub struct ReviewConfig {
    /// Path to the KataGo binary
    pub katago_path: String,

    /// Analysis engine config file passed as `-config`
    pub katago_config: String,

    /// Network file passed as `-model`
    pub katago_model: String,

    /// Extra arguments appended to the engine command line
    pub engine_args: Vec<String>,

    /// Rules override; otherwise the record's `RU`, else tromp-taylor
    pub rules: Option<String>,

    /// Komi override; otherwise the record's `KM`, else 7.5
    pub komi: Option<f64>,

    /// Board size for records without `SZ`
    pub default_board_size: usize,

    /// Visits per position; `None` leaves it to the engine config
    pub max_visits: Option<u32>,

    pub baseline: Baseline,

    pub perspective: WinratePerspective,

    /// Deadline for a single request/response exchange
    pub exchange_timeout: Option<Duration>,

    /// How many of the worst moves to report
    pub worst_moves: usize,

    pub thresholds: Thresholds,

    /// Print the engine's preferred line for each reported move
    pub show_variations: bool,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            katago_path: "katago".to_string(),
            katago_config: "analysis.cfg".to_string(),
            katago_model: "model.bin.gz".to_string(),
            engine_args: Vec::new(),
            rules: None,
            komi: None,
            default_board_size: sgf_core::DEFAULT_BOARD_SIZE,
            max_visits: Some(DEFAULT_MAX_VISITS),
            baseline: Baseline::Query,
            perspective: WinratePerspective::default(),
            exchange_timeout: None,
            worst_moves: DEFAULT_WORST_MOVES,
            thresholds: Thresholds::default(),
            show_variations: false,
        }
    }
}

impl ReviewConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ReviewError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ReviewConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ReviewError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let katago_path = lookup("KATAGO_PATH").unwrap_or(defaults.katago_path);
        let katago_config = lookup("KATAGO_CONFIG").unwrap_or(defaults.katago_config);
        let katago_model = lookup("KATAGO_MODEL").unwrap_or(defaults.katago_model);

        // 0 means "whatever the engine config says"
        let max_visits = lookup("MAX_VISITS")
            .and_then(|v| v.parse::<u32>().ok())
            .map(|v| (v > 0).then_some(v))
            .unwrap_or(defaults.max_visits);

        let worst_moves = lookup("WORST_MOVES")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.worst_moves);

        let exchange_timeout = lookup("EXCHANGE_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let perspective = match lookup("WINRATE_PERSPECTIVE") {
            Some(raw) => raw.parse().map_err(ReviewError::Config)?,
            None => defaults.perspective,
        };

        let config = Self {
            katago_path,
            katago_config,
            katago_model,
            max_visits,
            worst_moves,
            exchange_timeout,
            perspective,
            ..defaults
        };
        debug!(?config, "Configuration loaded from environment");
        Ok(config)
    }

    /// Reject combinations that cannot produce a meaningful review.
    pub fn validate(&self) -> Result<(), ReviewError> {
        if !(2..=sgf_core::coord::MAX_BOARD_SIZE).contains(&self.default_board_size) {
            return Err(ReviewError::Config(format!(
                "board size {} is not supported",
                self.default_board_size
            )));
        }
        if let Baseline::Fixed(p) = self.baseline {
            if !(0.0..=1.0).contains(&p) {
                return Err(ReviewError::Config(format!(
                    "fixed baseline {p} is not a win rate"
                )));
            }
        }
        if let Some(komi) = self.komi {
            if !komi.is_finite() {
                return Err(ReviewError::Config("komi must be finite".to_string()));
            }
        }
        self.thresholds.validate().map_err(ReviewError::Config)
    }

    pub fn engine_command(&self) -> EngineCommand {
        EngineCommand::katago(
            &self.katago_path,
            &self.katago_config,
            &self.katago_model,
            &self.engine_args,
        )
    }
}

/// Record paths found for the command-line inputs.
#[derive(Debug, Default, PartialEq)]
pub struct ExpandedInputs {
    pub paths: Vec<PathBuf>,
    /// Patterns that matched nothing plus entries that could not be read
    pub failed: usize,
}

/// Expand glob patterns into record paths. Plain paths are kept as given.
/// A pattern that matches nothing is logged and counted, like a file that
/// fails to review; only an invalid pattern is an error.
pub fn expand_inputs(patterns: &[String]) -> Result<ExpandedInputs, ReviewError> {
    let mut inputs = ExpandedInputs::default();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            inputs.paths.push(PathBuf::from(pattern));
            continue;
        }

        let entries = glob::glob(pattern)
            .map_err(|e| ReviewError::Config(format!("invalid pattern {pattern:?}: {e}")))?;
        let before = inputs.paths.len();
        for entry in entries {
            match entry {
                Ok(path) => inputs.paths.push(path),
                Err(e) => {
                    let path = e.path().to_path_buf();
                    let source = io::Error::from(e);
                    error!(path = %path.display(), error = %source, "Unreadable input");
                    inputs.failed += 1;
                }
            }
        }
        if inputs.paths.len() == before {
            error!(pattern = %pattern, "No files match pattern");
            inputs.failed += 1;
        }
    }
    Ok(inputs)
}
