//! Move extraction: walks the main line of a parsed record.

use std::fs;
use std::io;
use std::path::Path;

use crate::coord::{to_engine_coordinate, Vertex, MAX_BOARD_SIZE};
use crate::error::{ConversionError, ExtractError, FormatError};
use crate::game_data::{GameRecord, InitialStone, Move, Player, DEFAULT_BOARD_SIZE};
use crate::sgf::{parse_sgf, RecordNode};

const SETUP_KEYS: [(&str, Player); 2] = [("AB", Player::Black), ("AW", Player::White)];

/// Read a record from disk. Records in legacy encodings are decoded lossily;
/// every property the extractor reads is ASCII.
pub fn load_sgf(path: impl AsRef<Path>) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parse record text and extract its game in one step.
pub fn parse_game(text: &str) -> Result<GameRecord, ExtractError> {
    let root = parse_sgf(text)?;
    extract_game(&root)
}

/// Collect settings, setup stones and the main-line moves of a record.
pub fn extract_game(root: &RecordNode) -> Result<GameRecord, ExtractError> {
    extract_game_with_default(root, DEFAULT_BOARD_SIZE)
}

/// Like [`extract_game`], but records without `SZ` get `default_size`.
pub fn extract_game_with_default(
    root: &RecordNode,
    default_size: usize,
) -> Result<GameRecord, ExtractError> {
    let board_size = board_size(root, default_size)?;
    if !(2..=MAX_BOARD_SIZE).contains(&board_size) {
        return Err(ExtractError::Conversion {
            key: "SZ".to_string(),
            source: ConversionError::UnsupportedBoardSize(board_size),
        });
    }

    let komi = root.get("KM").map(parse_komi).transpose()?;
    let rules = root
        .get("RU")
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());

    let mut initial_stones = Vec::new();
    for (key, player) in SETUP_KEYS {
        for value in root.values(key) {
            let vertex = convert(key, value, board_size)?;
            if vertex.is_pass() {
                return Err(ExtractError::Conversion {
                    key: key.to_string(),
                    source: ConversionError::Malformed(value.clone()),
                });
            }
            initial_stones.push(InitialStone { player, vertex });
        }
    }

    let mut moves: Vec<Move> = Vec::new();
    for node in root.main_line() {
        let ply = moves.len() + 1;
        let (player, value) = match (node.get("B"), node.get("W")) {
            (Some(_), Some(_)) => return Err(FormatError::ConflictingMoves { ply }.into()),
            (Some(v), None) => (Player::Black, v),
            (None, Some(v)) => (Player::White, v),
            (None, None) => continue,
        };
        let vertex = convert(player.letter(), value, board_size)?;
        moves.push(Move {
            player,
            vertex,
            ply,
        });
    }

    Ok(GameRecord {
        board_size,
        komi,
        rules,
        initial_stones,
        moves,
    })
}

fn convert(key: &str, value: &str, board_size: usize) -> Result<Vertex, ExtractError> {
    to_engine_coordinate(value.trim(), board_size).map_err(|source| ExtractError::Conversion {
        key: key.to_string(),
        source,
    })
}

/// `SZ[19]` or the square form `SZ[19:19]`.
fn board_size(root: &RecordNode, default_size: usize) -> Result<usize, FormatError> {
    let Some(raw) = root.get("SZ") else {
        return Ok(default_size);
    };
    let invalid = || FormatError::InvalidProperty {
        key: "SZ".to_string(),
        value: raw.to_string(),
    };

    let mut dims = raw.trim().split(':');
    let width: usize = dims
        .next()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(invalid)?;
    if let Some(height) = dims.next() {
        let height: usize = height.trim().parse().map_err(|_| invalid())?;
        if height != width || dims.next().is_some() {
            return Err(invalid());
        }
    }
    Ok(width)
}

fn parse_komi(raw: &str) -> Result<f64, FormatError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|k| k.is_finite())
        .ok_or_else(|| FormatError::InvalidProperty {
            key: "KM".to_string(),
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(moves: &[Move]) -> Vec<(Player, String)> {
        moves
            .iter()
            .map(|m| (m.player, m.vertex.to_string()))
            .collect()
    }

    #[test]
    fn test_extract_settings_and_moves() {
        let game = parse_game("(;SZ[19]KM[6.5]RU[Japanese];B[pd];W[dp];B[])").unwrap();
        assert_eq!(game.board_size, 19);
        assert_eq!(game.komi, Some(6.5));
        assert_eq!(game.rules.as_deref(), Some("japanese"));
        assert_eq!(
            texts(&game.moves),
            vec![
                (Player::Black, "Q16".to_string()),
                (Player::White, "D4".to_string()),
                (Player::Black, "pass".to_string()),
            ]
        );
        let plies: Vec<usize> = game.moves.iter().map(|m| m.ply).collect();
        assert_eq!(plies, vec![1, 2, 3]);
    }

    #[test]
    fn test_defaults_without_root_properties() {
        let game = parse_game("(;B[aa])").unwrap();
        assert_eq!(game.board_size, 19);
        assert_eq!(game.komi, None);
        assert_eq!(game.rules, None);
        assert_eq!(game.moves[0].vertex.to_string(), "A19");
    }

    #[test]
    fn test_handicap_stones() {
        let game = parse_game("(;SZ[9]HA[2]AW[ee]AB[cc][gg];W[cg])").unwrap();
        let stones: Vec<(Player, String)> = game
            .initial_stones
            .iter()
            .map(|s| (s.player, s.vertex.to_string()))
            .collect();
        assert_eq!(
            stones,
            vec![
                (Player::Black, "C7".to_string()),
                (Player::Black, "G3".to_string()),
                (Player::White, "E5".to_string()),
            ]
        );
        assert_eq!(texts(&game.moves), vec![(Player::White, "C3".to_string())]);
    }

    #[test]
    fn test_nodes_without_moves_are_traversed() {
        let game = parse_game("(;SZ[9];C[comment];B[aa];C[another];W[bb])").unwrap();
        assert_eq!(game.moves.len(), 2);
        assert_eq!(game.moves[1].ply, 2);
    }

    #[test]
    fn test_only_first_variation_is_walked() {
        let game = parse_game("(;SZ[9];B[aa](;W[bb];B[cc])(;W[dd];B[ee];W[ff]))").unwrap();
        assert_eq!(
            texts(&game.moves),
            vec![
                (Player::Black, "A9".to_string()),
                (Player::White, "B8".to_string()),
                (Player::Black, "C7".to_string()),
            ]
        );
    }

    #[test]
    fn test_duplicate_moves_are_kept() {
        let game = parse_game("(;B[aa];W[aa];B[aa])").unwrap();
        assert_eq!(game.moves.len(), 3);
    }

    #[test]
    fn test_invalid_setup_stone_aborts() {
        let err = parse_game("(;AB[pd][zz];B[dd])").unwrap_err();
        assert_eq!(
            err,
            ExtractError::Conversion {
                key: "AB".to_string(),
                source: ConversionError::OutOfBounds {
                    coord: "zz".to_string(),
                    board_size: 19
                },
            }
        );
    }

    #[test]
    fn test_pass_is_not_a_setup_stone() {
        let err = parse_game("(;AW[])").unwrap_err();
        assert!(matches!(err, ExtractError::Conversion { ref key, .. } if key == "AW"));
    }

    #[test]
    fn test_invalid_move_aborts() {
        let err = parse_game("(;SZ[9];B[cc];W[jj])").unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Conversion {
                source: ConversionError::OutOfBounds { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_conflicting_moves() {
        let err = parse_game("(;B[aa];B[bb]W[cc])").unwrap_err();
        assert_eq!(
            err,
            ExtractError::Format(FormatError::ConflictingMoves { ply: 2 })
        );
    }

    #[test]
    fn test_board_size_forms() {
        assert_eq!(parse_game("(;SZ[13:13])").unwrap().board_size, 13);
        assert!(matches!(
            parse_game("(;SZ[13:9])"),
            Err(ExtractError::Format(FormatError::InvalidProperty { .. }))
        ));
        assert!(matches!(
            parse_game("(;SZ[big])"),
            Err(ExtractError::Format(FormatError::InvalidProperty { .. }))
        ));
    }

    #[test]
    fn test_default_size_only_applies_without_sz() {
        let root = parse_sgf("(;B[ii])").unwrap();
        let game = extract_game_with_default(&root, 9).unwrap();
        assert_eq!(game.board_size, 9);
        assert_eq!(game.moves[0].vertex.to_string(), "J1");

        let root = parse_sgf("(;SZ[13];B[ii])").unwrap();
        assert_eq!(extract_game_with_default(&root, 9).unwrap().board_size, 13);
    }

    #[test]
    fn test_unsupported_board_size() {
        let err = parse_game("(;SZ[21])").unwrap_err();
        assert_eq!(
            err,
            ExtractError::Conversion {
                key: "SZ".to_string(),
                source: ConversionError::UnsupportedBoardSize(21),
            }
        );
    }

    #[test]
    fn test_invalid_komi() {
        let err = parse_game("(;KM[seven])").unwrap_err();
        assert_eq!(
            err,
            ExtractError::Format(FormatError::InvalidProperty {
                key: "KM".to_string(),
                value: "seven".to_string()
            })
        );
    }

    #[test]
    fn test_missing_parenthesis_fails_before_conversion() {
        // The bad coordinate is never looked at
        let err = parse_game("(;B[zz];W[dp]").unwrap_err();
        assert_eq!(err, ExtractError::Format(FormatError::MissingRootDelimiters));
    }

    #[test]
    fn test_empty_record_has_no_moves() {
        let game = parse_game("(;SZ[19]KM[7.5])").unwrap();
        assert!(game.moves.is_empty());
        assert!(game.initial_stones.is_empty());
    }
}
