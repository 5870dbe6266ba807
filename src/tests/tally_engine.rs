//! A tiny scripted game used to drive the hub without real chess.
//!
//! White plays `w1`, `w2`, `wx` (captures a black pawn) or `wm` (wins);
//! Black mirrors with `b1`, `b2`, `bx`, `bm`. The game is drawn once
//! `game_length` plies have been played.

use std::collections::BTreeMap;

use crate::game::rules::{Material, Outcome, RulesEngine, RulesError, Side, TerminationMethod};

const WHITE_MOVES: [&str; 4] = ["w1", "w2", "wx", "wm"];
const BLACK_MOVES: [&str; 4] = ["b1", "b2", "bx", "bm"];
const PAWNS: u32 = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TallyPosition {
    pub plies: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TallyEngine {
    pub game_length: usize,
}

impl Default for TallyEngine {
    fn default() -> Self {
        Self { game_length: 6 }
    }
}

fn side_of_ply(index: usize) -> Side {
    if index % 2 == 0 {
        Side::White
    } else {
        Side::Black
    }
}

fn counts(pawns: u32) -> BTreeMap<char, u32> {
    [('k', 1), ('p', pawns)].into_iter().collect()
}

impl RulesEngine for TallyEngine {
    type Position = TallyPosition;

    fn starting_position(&self) -> TallyPosition {
        TallyPosition::default()
    }

    fn legal_moves(&self, position: &TallyPosition) -> Vec<String> {
        if self.outcome(position).is_terminal() {
            return Vec::new();
        }
        let moves = match self.side_to_move(position) {
            Side::White => WHITE_MOVES,
            Side::Black => BLACK_MOVES,
        };
        moves.iter().map(|m| m.to_string()).collect()
    }

    fn apply_move(
        &self,
        position: &TallyPosition,
        notation: &str,
    ) -> Result<TallyPosition, RulesError> {
        if !self.legal_moves(position).iter().any(|m| m == notation) {
            return Err(RulesError::IllegalMove {
                notation: notation.to_string(),
            });
        }
        let mut next = position.clone();
        next.plies.push(notation.to_string());
        Ok(next)
    }

    fn side_to_move(&self, position: &TallyPosition) -> Side {
        side_of_ply(position.plies.len())
    }

    fn outcome(&self, position: &TallyPosition) -> Outcome {
        if let Some(last) = position.plies.last() {
            if last.ends_with('m') {
                return Outcome::Decisive {
                    winner: side_of_ply(position.plies.len() - 1),
                    method: Some(TerminationMethod::Checkmate),
                };
            }
        }
        if position.plies.len() >= self.game_length {
            Outcome::Draw { method: None }
        } else {
            Outcome::Ongoing
        }
    }

    fn material(&self, position: &TallyPosition) -> Material {
        let taken = |capture: &str| position.plies.iter().filter(|p| *p == capture).count() as u32;
        Material {
            white: counts(PAWNS.saturating_sub(taken("bx"))),
            black: counts(PAWNS.saturating_sub(taken("wx"))),
        }
    }

    fn starting_material(&self) -> Material {
        Material {
            white: counts(PAWNS),
            black: counts(PAWNS),
        }
    }

    fn board(&self, position: &TallyPosition) -> String {
        format!("tally:{}", position.plies.join(" "))
    }

    fn history(&self, position: &TallyPosition) -> Vec<String> {
        (0..=position.plies.len())
            .map(|n| {
                self.board(&TallyPosition {
                    plies: position.plies[..n].to_vec(),
                })
            })
            .collect()
    }

    fn serialize(&self, position: &TallyPosition) -> String {
        position.plies.join(",")
    }

    fn deserialize(&self, record: &str) -> Result<TallyPosition, RulesError> {
        record
            .split(',')
            .filter(|ply| !ply.is_empty())
            .try_fold(TallyPosition::default(), |position, ply| {
                self.apply_move(&position, ply)
                    .map_err(|e| RulesError::InvalidRecord {
                        reason: e.to_string(),
                    })
            })
    }
}
