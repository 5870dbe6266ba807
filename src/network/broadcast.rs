//! Who hears about a session event, and what each recipient is shown.

use clap::ValueEnum;

use crate::game::rules::{Material, Outcome, RulesEngine, Side};
use crate::game::session::Session;
use crate::network::connection_manager::ConnectionRegistry;
use crate::network::messages::{CapturedPiecesPayload, OutcomePayload, PossibleMovesPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BroadcastPolicy {
    /// Only the mover and its human opponent hear about a move.
    #[default]
    #[value(name = "opponent")]
    OpponentOnly,
    /// Every connected client hears about every move (spectator feed).
    #[value(name = "all")]
    AllConnected,
}

impl BroadcastPolicy {
    /// Recipients of a move by `mover` in `session`, without duplicates.
    pub fn audience<P>(
        &self,
        session: &Session<P>,
        mover: &str,
        connections: &ConnectionRegistry,
    ) -> Vec<String> {
        match self {
            BroadcastPolicy::OpponentOnly => {
                let mut audience = vec![mover.to_string()];
                if let Some(opponent) = session.human_opponent_of(mover) {
                    audience.push(opponent.to_string());
                }
                audience
            }
            BroadcastPolicy::AllConnected => connections.identities(),
        }
    }
}

/// Moves `recipient` may play now; empty unless it controls the side to move.
pub fn legal_move_view<E: RulesEngine>(
    engine: &E,
    session: &Session<E::Position>,
    recipient: &str,
) -> PossibleMovesPayload {
    let side = engine.side_to_move(&session.position);
    let moves = if session.controls(recipient, side) {
        engine.legal_moves(&session.position)
    } else {
        Vec::new()
    };

    PossibleMovesPayload {
        game_id: session.id.clone(),
        moves,
    }
}

pub fn captured_view<E: RulesEngine>(
    engine: &E,
    session: &Session<E::Position>,
) -> CapturedPiecesPayload {
    let (white, black) =
        captured_pieces(&engine.starting_material(), &engine.material(&session.position));

    CapturedPiecesPayload {
        game_id: session.id.clone(),
        white,
        black,
    }
}

/// Pieces missing from the board relative to the starting complement, per
/// side. White pieces are upper-case, Black pieces lower-case.
pub fn captured_pieces(starting: &Material, current: &Material) -> (Vec<String>, Vec<String>) {
    let missing = |side: Side| -> Vec<String> {
        let on_board = current.side(side);
        starting
            .side(side)
            .iter()
            .flat_map(|(kind, start)| {
                let left = on_board.get(kind).copied().unwrap_or(0);
                let label = match side {
                    Side::White => kind.to_ascii_uppercase(),
                    Side::Black => kind.to_ascii_lowercase(),
                };
                std::iter::repeat(label.to_string()).take(start.saturating_sub(left) as usize)
            })
            .collect()
    };

    (missing(Side::White), missing(Side::Black))
}

pub fn outcome_view<E: RulesEngine>(
    engine: &E,
    session: &Session<E::Position>,
) -> OutcomePayload {
    outcome_payload(&session.id, &engine.outcome(&session.position))
}

pub fn outcome_payload(game_id: &str, outcome: &Outcome) -> OutcomePayload {
    OutcomePayload {
        game_id: game_id.to_string(),
        outcome: outcome.result_token().to_string(),
        method: outcome
            .method()
            .map(|method| method.as_str().to_string())
            .unwrap_or_default(),
        winner: outcome
            .winner()
            .map(|side| side.letter().to_string())
            .unwrap_or_default(),
    }
}
