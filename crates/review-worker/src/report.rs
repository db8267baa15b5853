//! Human-readable and JSON rendering of a game review

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::analysis::MoveEvaluation;
use crate::analyzer::GameReview;
use crate::error::ReviewError;

/// Plain-text report for one file
pub struct TextReport<'a> {
    pub path: &'a Path,
    pub review: &'a GameReview,
    pub show_variations: bool,
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let review = self.review;
        writeln!(f, "== {} ==", self.path.display())?;
        writeln!(
            f,
            "Board {size}x{size}, rules {}, komi {}, {} moves",
            review.rules,
            review.komi,
            review.move_count,
            size = review.board_size,
        )?;

        if review.move_count == 0 {
            return writeln!(f, "No moves to review.");
        }

        writeln!(f, "Worst {} moves:", review.worst.len())?;
        for (rank, e) in review.worst.iter().enumerate() {
            write_evaluation(f, rank + 1, e)?;
            if self.show_variations {
                write_variations(f, e)?;
            }
        }

        for s in &review.summary {
            if s.moves == 0 {
                continue;
            }
            let c = &s.classifications;
            writeln!(
                f,
                "{}: {} moves, mean drop {:.3}, best {} / good {} / inaccuracy {} / mistake {} / blunder {}",
                s.player, s.moves, s.mean_drop, c.best, c.good, c.inaccuracy, c.mistake, c.blunder
            )?;
            if let Some(w) = &s.worst {
                writeln!(
                    f,
                    "  Worst move for {}: {} with winrate drop {:.2}",
                    s.player, w.vertex, w.win_rate_drop
                )?;
            }
        }
        Ok(())
    }
}

fn write_evaluation(f: &mut fmt::Formatter<'_>, rank: usize, e: &MoveEvaluation) -> fmt::Result {
    write!(
        f,
        "  {rank:>2}. ply {:>3}  {:<5} {:<4}  drop {:.3} ({:.3} -> {:.3})  {}",
        e.ply,
        e.player,
        e.vertex,
        e.win_rate_drop,
        e.win_rate_before,
        e.win_rate_after,
        e.classification.as_str(),
    )?;
    match &e.best_move {
        Some(best) => writeln!(f, "  best {best}"),
        None => writeln!(f),
    }
}

fn write_variations(f: &mut fmt::Formatter<'_>, e: &MoveEvaluation) -> fmt::Result {
    if !e.best_line.is_empty() {
        writeln!(f, "       line: {}", e.best_line.join(" "))?;
    }
    for c in &e.candidates {
        writeln!(
            f,
            "       {:<5} winrate {:.3}  visits {}",
            c.mv, c.winrate, c.visits
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    path: String,
    #[serde(flatten)]
    review: &'a GameReview,
}

/// One JSON object per file, on a single line.
pub fn render_json(path: &Path, review: &GameReview) -> Result<String, ReviewError> {
    Ok(serde_json::to_string(&JsonReport {
        path: path.display().to_string(),
        review,
    })?)
}
