//! Capability interface the hub uses to talk to a board-game rules engine.
//!
//! The hub never inspects a position directly: every question about legal
//! moves, whose turn it is, material on the board or the result of the game
//! goes through [`RulesEngine`]. The production adapter lives in
//! [`crate::game::chess`]; tests plug in a small scripted engine.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// Single-letter colour code used on the wire (`w` / `b`).
    pub fn letter(self) -> &'static str {
        match self {
            Side::White => "w",
            Side::Black => "b",
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationMethod {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    FivefoldRepetition,
    SeventyFiveMoveRule,
}

impl TerminationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            TerminationMethod::Checkmate => "Checkmate",
            TerminationMethod::Stalemate => "Stalemate",
            TerminationMethod::InsufficientMaterial => "InsufficientMaterial",
            TerminationMethod::FivefoldRepetition => "FivefoldRepetition",
            TerminationMethod::SeventyFiveMoveRule => "SeventyFiveMoveRule",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ongoing,
    Decisive {
        winner: Side,
        method: Option<TerminationMethod>,
    },
    Draw {
        method: Option<TerminationMethod>,
    },
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Ongoing)
    }

    /// PGN-style result token.
    pub fn result_token(&self) -> &'static str {
        match self {
            Outcome::Ongoing => "*",
            Outcome::Decisive {
                winner: Side::White,
                ..
            } => "1-0",
            Outcome::Decisive {
                winner: Side::Black,
                ..
            } => "0-1",
            Outcome::Draw { .. } => "1/2-1/2",
        }
    }

    pub fn winner(&self) -> Option<Side> {
        match self {
            Outcome::Decisive { winner, .. } => Some(*winner),
            _ => None,
        }
    }

    pub fn method(&self) -> Option<TerminationMethod> {
        match self {
            Outcome::Ongoing => None,
            Outcome::Decisive { method, .. } | Outcome::Draw { method } => *method,
        }
    }
}

/// Piece counts per side, keyed by lower-case piece kind (`p`, `n`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Material {
    pub white: BTreeMap<char, u32>,
    pub black: BTreeMap<char, u32>,
}

impl Material {
    pub fn side(&self, side: Side) -> &BTreeMap<char, u32> {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut BTreeMap<char, u32> {
        match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RulesError {
    #[error("move '{notation}' is not legal in this position")]
    IllegalMove { notation: String },

    #[error("could not decode game record: {reason}")]
    InvalidRecord { reason: String },
}

pub trait RulesEngine: Send + Sync + 'static {
    type Position: Clone + Send + Sync + 'static;

    fn starting_position(&self) -> Self::Position;

    /// Moves available to the side to move, in engine notation.
    fn legal_moves(&self, position: &Self::Position) -> Vec<String>;

    fn apply_move(
        &self,
        position: &Self::Position,
        notation: &str,
    ) -> Result<Self::Position, RulesError>;

    fn side_to_move(&self, position: &Self::Position) -> Side;

    fn outcome(&self, position: &Self::Position) -> Outcome;

    fn material(&self, position: &Self::Position) -> Material;

    fn starting_material(&self) -> Material;

    /// Board-only rendering of the current position (FEN for chess).
    fn board(&self, position: &Self::Position) -> String;

    /// Every board reached so far, oldest first.
    fn history(&self, position: &Self::Position) -> Vec<String>;

    fn serialize(&self, position: &Self::Position) -> String;

    fn deserialize(&self, record: &str) -> Result<Self::Position, RulesError>;
}
