//! go-review
//!
//! Reviews SGF game records with the KataGo analysis engine and reports the
//! moves that lost the most win rate.

use std::time::Duration;

use clap::Parser;
use tracing::info;

use review_worker::analysis::{Thresholds, WinratePerspective};
use review_worker::config::{expand_inputs, ReviewConfig};
use review_worker::report::{render_json, TextReport};
use review_worker::review_files;
use review_worker::sequencer::Baseline;

/// Find the worst moves of Go games with KataGo
#[derive(Parser, Debug)]
#[command(name = "go-review")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SGF files or glob patterns
    #[arg(required = true)]
    files: Vec<String>,

    /// Rules sent to the engine (default: the record's RU, else tromp-taylor)
    #[arg(long)]
    rules: Option<String>,

    /// Komi (default: the record's KM, else 7.5)
    #[arg(long, allow_negative_numbers = true)]
    komi: Option<f64>,

    /// Board size for records without SZ
    #[arg(long)]
    board_size: Option<usize>,

    /// Visits per position, 0 to use the engine config [env: MAX_VISITS]
    #[arg(long)]
    max_visits: Option<u32>,

    /// Use this win rate for the first mover instead of querying the opening position
    #[arg(long, value_name = "P")]
    fixed_baseline: Option<f64>,

    /// Whose win rates the engine reports: black, white or side-to-move [env: WINRATE_PERSPECTIVE]
    #[arg(long, value_parser = parse_perspective)]
    winrate_perspective: Option<WinratePerspective>,

    /// Give up on an engine answer after this many seconds [env: EXCHANGE_TIMEOUT_SECS]
    #[arg(long)]
    exchange_timeout_secs: Option<u64>,

    /// Number of worst moves to report [env: WORST_MOVES]
    #[arg(short = 'n', long)]
    worst: Option<usize>,

    /// Drops below this are "best"
    #[arg(long)]
    best_threshold: Option<f64>,

    /// Drops below this are "good"
    #[arg(long)]
    good_threshold: Option<f64>,

    /// Drops below this are "inaccuracy"
    #[arg(long)]
    inaccuracy_threshold: Option<f64>,

    /// Drops below this are "mistake", anything above is "blunder"
    #[arg(long)]
    mistake_threshold: Option<f64>,

    /// Print the engine's preferred line for each reported move
    #[arg(long)]
    show_variations: bool,

    /// Print one JSON object per file instead of text
    #[arg(long)]
    json: bool,

    /// KataGo binary [env: KATAGO_PATH]
    #[arg(long, value_name = "PATH")]
    katago: Option<String>,

    /// Neural network file [env: KATAGO_MODEL]
    #[arg(long, value_name = "PATH")]
    model: Option<String>,

    /// Analysis engine config file [env: KATAGO_CONFIG]
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// Extra argument for the engine command line (repeatable)
    #[arg(long = "engine-arg", value_name = "ARG", allow_hyphen_values = true)]
    engine_args: Vec<String>,
}

fn parse_perspective(s: &str) -> Result<WinratePerspective, String> {
    s.parse()
}

impl Cli {
    /// Flags win over the environment.
    fn apply(self, mut config: ReviewConfig) -> (ReviewConfig, Vec<String>) {
        if let Some(path) = self.katago {
            config.katago_path = path;
        }
        if let Some(model) = self.model {
            config.katago_model = model;
        }
        if let Some(file) = self.config {
            config.katago_config = file;
        }
        if !self.engine_args.is_empty() {
            config.engine_args = self.engine_args;
        }
        config.rules = self.rules.or(config.rules);
        config.komi = self.komi.or(config.komi);
        if let Some(size) = self.board_size {
            config.default_board_size = size;
        }
        if let Some(visits) = self.max_visits {
            config.max_visits = (visits > 0).then_some(visits);
        }
        if let Some(p) = self.fixed_baseline {
            config.baseline = Baseline::Fixed(p);
        }
        if let Some(perspective) = self.winrate_perspective {
            config.perspective = perspective;
        }
        if let Some(secs) = self.exchange_timeout_secs {
            config.exchange_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(n) = self.worst {
            config.worst_moves = n;
        }
        let defaults = config.thresholds;
        config.thresholds = Thresholds {
            best: self.best_threshold.unwrap_or(defaults.best),
            good: self.good_threshold.unwrap_or(defaults.good),
            inaccuracy: self.inaccuracy_threshold.unwrap_or(defaults.inaccuracy),
            mistake: self.mistake_threshold.unwrap_or(defaults.mistake),
        };
        config.show_variations = self.show_variations;
        (config, self.files)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let json = cli.json;

    // Logs go to stderr so reports can be piped
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let (config, patterns) = cli.apply(ReviewConfig::from_env()?);
    config.validate()?;
    info!(
        katago = %config.katago_path,
        model = %config.katago_model,
        max_visits = ?config.max_visits,
        baseline = ?config.baseline,
        "Review config loaded"
    );

    let inputs = expand_inputs(&patterns)?;
    let batch = review_files(&inputs.paths, &config).await;

    for (path, review) in &batch.reviews {
        if json {
            println!("{}", render_json(path, review)?);
        } else {
            print!(
                "{}",
                TextReport {
                    path: path.as_path(),
                    review,
                    show_variations: config.show_variations,
                }
            );
        }
    }

    let failed = inputs.failed + batch.failed;
    let total = inputs.failed + inputs.paths.len();
    info!(files = total, failed, "Done");
    if failed > 0 {
        anyhow::bail!("{failed} of {total} inputs could not be reviewed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "go-review",
            "--komi",
            "-3.5",
            "--max-visits",
            "0",
            "--fixed-baseline",
            "0.5",
            "--winrate-perspective",
            "side-to-move",
            "-n",
            "5",
            "--mistake-threshold",
            "0.3",
            "--engine-arg",
            "-override-config",
            "--engine-arg",
            "numSearchThreads=2",
            "a.sgf",
            "games/*.sgf",
        ]);
        let (config, files) = cli.apply(ReviewConfig::default());

        assert_eq!(files, vec!["a.sgf", "games/*.sgf"]);
        assert_eq!(config.komi, Some(-3.5));
        assert_eq!(config.max_visits, None);
        assert_eq!(config.baseline, Baseline::Fixed(0.5));
        assert_eq!(config.perspective, WinratePerspective::SideToMove);
        assert_eq!(config.worst_moves, 5);
        assert_eq!(config.thresholds.mistake, 0.3);
        assert_eq!(config.thresholds.best, 0.02);
        assert_eq!(
            config.engine_args,
            vec!["-override-config", "numSearchThreads=2"]
        );
    }

    #[test]
    fn test_files_are_required() {
        assert!(Cli::try_parse_from(["go-review"]).is_err());
    }
}
