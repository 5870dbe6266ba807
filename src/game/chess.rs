//! Standard chess behind the [`RulesEngine`] capability.
//!
//! Moves travel in long algebraic (UCI) notation such as `e2e4` or `e7e8q`.
//! Game records are stored as PGN so the whole history of a session, not just
//! its latest board, survives a restart.

use pgn_reader::{BufferedReader, RawHeader, SanPlus, Skip, Visitor};
use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Piece, Position, Role};

use crate::game::rules::{Material, Outcome, RulesEngine, RulesError, Side, TerminationMethod};

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const ROLES: [Role; 6] = [
    Role::Pawn,
    Role::Knight,
    Role::Bishop,
    Role::Rook,
    Role::Queen,
    Role::King,
];

/// A chess game: the starting position, every move played and every
/// position reached along the way.
#[derive(Debug, Clone)]
pub struct ChessGame {
    setup_fen: Option<String>,
    previous: Vec<Chess>,
    moves: Vec<Move>,
    current: Chess,
}

impl ChessGame {
    pub fn new() -> Self {
        Self {
            setup_fen: None,
            previous: Vec::new(),
            moves: Vec::new(),
            current: Chess::default(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let setup: Fen = fen.parse().map_err(|e| invalid_record(format!("{e}")))?;
        let position: Chess = setup
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid_record(format!("{e}")))?;

        let setup_fen = (fen.trim() != STANDARD_START_FEN).then(|| fen.trim().to_string());
        Ok(Self {
            setup_fen,
            previous: Vec::new(),
            moves: Vec::new(),
            current: position,
        })
    }

    pub fn position(&self) -> &Chess {
        &self.current
    }

    pub fn ply_count(&self) -> usize {
        self.moves.len()
    }

    fn push(&mut self, m: Move) {
        let mut next = self.current.clone();
        next.play_unchecked(&m);
        let reached = std::mem::replace(&mut self.current, next);
        self.previous.push(reached);
        self.moves.push(m);
    }

    fn positions(&self) -> impl Iterator<Item = &Chess> {
        self.previous.iter().chain(std::iter::once(&self.current))
    }

    /// How many times the current position (board, side, castling, en
    /// passant) has occurred in this game.
    fn repetitions(&self) -> usize {
        let key = repetition_key(&self.current);
        self.positions()
            .filter(|position| repetition_key(position) == key)
            .count()
    }

    fn to_pgn(&self, result: &str) -> String {
        let mut pgn = String::new();
        if let Some(fen) = &self.setup_fen {
            pgn.push_str("[SetUp \"1\"]\n");
            pgn.push_str(&format!("[FEN \"{fen}\"]\n"));
        }
        pgn.push_str(&format!("[Result \"{result}\"]\n\n"));

        let mut tokens = Vec::with_capacity(self.moves.len() + 1);
        for (position, m) in self.previous.iter().zip(&self.moves) {
            let number = position.fullmoves().get();
            match position.turn() {
                Color::White => tokens.push(format!("{number}.")),
                Color::Black if tokens.is_empty() => tokens.push(format!("{number}...")),
                Color::Black => {}
            }
            tokens.push(San::from_move(position, m).to_string());
        }
        tokens.push(result.to_string());
        pgn.push_str(&tokens.join(" "));
        pgn
    }

    /// Rebuilds a game from a PGN record. Only the first game is read;
    /// comments, NAGs and variations are skipped.
    fn from_pgn(record: &str) -> Result<Self, RulesError> {
        let mut reader = BufferedReader::new_cursor(record.as_bytes());
        let mut visitor = RecordVisitor::default();
        match reader.read_game(&mut visitor) {
            Ok(Some(game)) => game,
            Ok(None) => Ok(Self::new()),
            Err(e) => Err(invalid_record(format!("unreadable PGN: {e}"))),
        }
    }
}

/// Replays the mainline of a PGN game, stopping at the first bad move.
#[derive(Default)]
struct RecordVisitor {
    game: ChessGame,
    error: Option<RulesError>,
}

impl Visitor for RecordVisitor {
    type Result = Result<ChessGame, RulesError>;

    fn begin_game(&mut self) {
        self.game = ChessGame::new();
        self.error = None;
    }

    fn header(&mut self, key: &[u8], value: RawHeader<'_>) {
        if key != b"FEN" {
            return;
        }
        let parsed = value
            .decode_utf8()
            .map_err(|e| invalid_record(format!("FEN tag: {e}")))
            .and_then(|fen| ChessGame::from_fen(&fen));
        match parsed {
            Ok(game) => self.game = game,
            Err(e) => self.error = Some(e),
        }
    }

    fn begin_variation(&mut self) -> Skip {
        Skip(true)
    }

    fn san(&mut self, san_plus: SanPlus) {
        if self.error.is_some() {
            return;
        }
        match san_plus.san.to_move(self.game.position()) {
            Ok(m) => self.game.push(m),
            Err(_) => {
                self.error = Some(invalid_record(format!(
                    "move '{san_plus}' is not legal here"
                )))
            }
        }
    }

    fn end_game(&mut self) -> Self::Result {
        let game = std::mem::take(&mut self.game);
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(game),
        }
    }
}

impl Default for ChessGame {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChessEngine;

impl ChessEngine {
    pub fn new() -> Self {
        Self
    }
}

impl RulesEngine for ChessEngine {
    type Position = ChessGame;

    fn starting_position(&self) -> ChessGame {
        ChessGame::new()
    }

    fn legal_moves(&self, game: &ChessGame) -> Vec<String> {
        if self.outcome(game).is_terminal() {
            return Vec::new();
        }
        game.position()
            .legal_moves()
            .iter()
            .map(uci_notation)
            .collect()
    }

    fn apply_move(&self, game: &ChessGame, notation: &str) -> Result<ChessGame, RulesError> {
        if self.outcome(game).is_terminal() {
            return Err(RulesError::IllegalMove {
                notation: notation.to_string(),
            });
        }
        let m = game
            .position()
            .legal_moves()
            .into_iter()
            .find(|m| uci_notation(m) == notation)
            .ok_or_else(|| RulesError::IllegalMove {
                notation: notation.to_string(),
            })?;

        let mut next = game.clone();
        next.push(m);
        Ok(next)
    }

    fn side_to_move(&self, game: &ChessGame) -> Side {
        side_of(game.position().turn())
    }

    fn outcome(&self, game: &ChessGame) -> Outcome {
        let position = game.position();
        if position.is_checkmate() {
            Outcome::Decisive {
                winner: side_of(position.turn().other()),
                method: Some(TerminationMethod::Checkmate),
            }
        } else if position.is_stalemate() {
            draw(TerminationMethod::Stalemate)
        } else if position.is_insufficient_material() {
            draw(TerminationMethod::InsufficientMaterial)
        } else if game.repetitions() >= 5 {
            draw(TerminationMethod::FivefoldRepetition)
        } else if position.halfmoves() >= 150 {
            draw(TerminationMethod::SeventyFiveMoveRule)
        } else {
            Outcome::Ongoing
        }
    }

    fn material(&self, game: &ChessGame) -> Material {
        let board = game.position().board();
        let mut material = Material::default();
        for color in [Color::White, Color::Black] {
            let counts = material.side_mut(side_of(color));
            for role in ROLES {
                let count = board.by_piece(Piece { color, role }).count();
                counts.insert(role_char(role), count as u32);
            }
        }
        material
    }

    fn starting_material(&self) -> Material {
        self.material(&ChessGame::new())
    }

    fn board(&self, game: &ChessGame) -> String {
        fen_of(game.position())
    }

    fn history(&self, game: &ChessGame) -> Vec<String> {
        game.positions().map(fen_of).collect()
    }

    fn serialize(&self, game: &ChessGame) -> String {
        game.to_pgn(self.outcome(game).result_token())
    }

    fn deserialize(&self, record: &str) -> Result<ChessGame, RulesError> {
        ChessGame::from_pgn(record)
    }
}

fn draw(method: TerminationMethod) -> Outcome {
    Outcome::Draw {
        method: Some(method),
    }
}

fn invalid_record(reason: String) -> RulesError {
    RulesError::InvalidRecord { reason }
}

fn side_of(color: Color) -> Side {
    match color {
        Color::White => Side::White,
        Color::Black => Side::Black,
    }
}

fn role_char(role: Role) -> char {
    match role {
        Role::Pawn => 'p',
        Role::Knight => 'n',
        Role::Bishop => 'b',
        Role::Rook => 'r',
        Role::Queen => 'q',
        Role::King => 'k',
    }
}

fn uci_notation(m: &Move) -> String {
    m.to_uci(CastlingMode::Standard).to_string()
}

fn fen_of(position: &Chess) -> String {
    Fen(position.clone().into_setup(EnPassantMode::Legal)).to_string()
}

fn repetition_key(position: &Chess) -> String {
    fen_of(position)
        .split_whitespace()
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
}
