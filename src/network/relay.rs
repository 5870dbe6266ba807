use std::sync::Arc;

use crate::game::rules::RulesEngine;
use crate::game::session::Session;
use crate::game::session_store::SessionStore;
use crate::network::broadcast::{captured_view, legal_move_view, outcome_view, BroadcastPolicy};
use crate::network::connection_manager::ConnectionRegistry;
use crate::network::messages::{
    deserialize_message, serialize_message, AgainstPayload, ErrorPayload, HelloPayload,
    InboundMessage, JoinRequest, MovePayload, MoveRequest, OutboundMessage,
};
use crate::{HubError, HubResult};

/// What the connection loop does after an envelope has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Routes inbound envelopes to the session store and fans the results out
/// through the connection registry.
pub struct RelayDispatcher<E: RulesEngine> {
    engine: Arc<E>,
    sessions: Arc<SessionStore<E>>,
    connections: ConnectionRegistry,
    policy: BroadcastPolicy,
}

impl<E: RulesEngine> RelayDispatcher<E> {
    pub fn new(
        sessions: Arc<SessionStore<E>>,
        connections: ConnectionRegistry,
        policy: BroadcastPolicy,
    ) -> Self {
        Self {
            engine: sessions.engine().clone(),
            sessions,
            connections,
            policy,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore<E>> {
        &self.sessions
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Greets a freshly registered connection with its identity.
    pub fn greet(&self, identity: &str) -> HubResult<()> {
        self.send(
            identity,
            &OutboundMessage::Hello(HelloPayload {
                id: identity.to_string(),
            }),
        )
    }

    /// Handles one raw frame from `identity`. Bad frames and failed
    /// operations are logged and never end the connection.
    pub async fn handle_text(&self, identity: &str, text: &str) -> Flow {
        let message = match deserialize_message(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "Dropping malformed envelope");
                return Flow::Continue;
            }
        };

        match message {
            InboundMessage::Join(request) => {
                if let Err(e) = self.join(identity, &request).await {
                    log_failure(identity, "join", &e);
                }
                Flow::Continue
            }
            InboundMessage::Move(request) => {
                if let Err(e) = self.relay_move(identity, &request).await {
                    log_failure(identity, "move", &e);
                    self.report_failure(identity, &request.game_id, &e);
                }
                Flow::Continue
            }
            InboundMessage::Leave => Flow::Close,
            InboundMessage::Unknown(kind) => {
                tracing::debug!(identity = %identity, kind = %kind, "Ignoring unknown message type");
                Flow::Continue
            }
        }
    }

    /// Sends the requester its opponent and the current views of the session.
    pub async fn join(&self, identity: &str, request: &JoinRequest) -> HubResult<()> {
        let handle = self.sessions.get(&request.game_id)?;
        let session = handle.lock().await;

        let (opponent, color) =
            session
                .opponent_of(identity)
                .ok_or_else(|| HubError::NotAParticipant {
                    identity: identity.to_string(),
                    session_id: session.id.clone(),
                })?;

        let against = OutboundMessage::Against(AgainstPayload {
            id: opponent.to_string(),
            color: color.letter().to_string(),
        });
        self.send(identity, &against)?;
        self.send_views(identity, &session)?;

        tracing::info!(identity = %identity, session_id = %session.id, "Participant joined session");
        Ok(())
    }

    /// Validates, applies, persists and announces a move.
    pub async fn relay_move(&self, identity: &str, request: &MoveRequest) -> HubResult<()> {
        let handle = self.sessions.get(&request.game_id)?;
        let mut session = handle.lock().await;

        if self.engine.outcome(&session.position).is_terminal() {
            return Err(HubError::GameEnded {
                session_id: session.id.clone(),
            });
        }

        let side = self.engine.side_to_move(&session.position);
        if !session.controls(identity, side) {
            return Err(if session.is_participant(identity) {
                HubError::NotPlayerTurn {
                    identity: identity.to_string(),
                    session_id: session.id.clone(),
                }
            } else {
                HubError::NotAParticipant {
                    identity: identity.to_string(),
                    session_id: session.id.clone(),
                }
            });
        }

        let illegal = || HubError::IllegalMove {
            notation: request.notation.clone(),
            session_id: session.id.clone(),
        };
        if !self
            .engine
            .legal_moves(&session.position)
            .contains(&request.notation)
        {
            return Err(illegal());
        }
        let next = self
            .engine
            .apply_move(&session.position, &request.notation)
            .map_err(|_| illegal())?;

        self.sessions.advance(&mut session, next).await?;

        let outcome = self.engine.outcome(&session.position);
        tracing::info!(
            identity = %identity,
            session_id = %session.id,
            notation = %request.notation,
            outcome = outcome.result_token(),
            "Move committed"
        );

        let moved = OutboundMessage::Move(MovePayload {
            game_id: session.id.clone(),
            notation: request.notation.clone(),
            fen: self.engine.board(&session.position),
        });

        let audience = self.policy.audience(&*session, identity, &self.connections);
        for recipient in &audience {
            self.send(recipient, &moved)?;
            self.send_views(recipient, &session)?;
        }

        if outcome.is_terminal() && !audience.iter().any(|recipient| recipient == identity) {
            self.send(identity, &moved)?;
            let result = outcome_view(&*self.engine, &*session);
            self.send(identity, &OutboundMessage::Outcome(result))?;
        }
        Ok(())
    }

    fn send_views(&self, recipient: &str, session: &Session<E::Position>) -> HubResult<()> {
        let engine = &*self.engine;
        self.send(
            recipient,
            &OutboundMessage::PossibleMoves(legal_move_view(engine, session, recipient)),
        )?;
        self.send(
            recipient,
            &OutboundMessage::CapturedPieces(captured_view(engine, session)),
        )?;
        self.send(
            recipient,
            &OutboundMessage::Outcome(outcome_view(engine, session)),
        )
    }

    fn report_failure(&self, identity: &str, game_id: &str, error: &HubError) {
        let message = OutboundMessage::Error(ErrorPayload::from_hub_error(game_id, error));
        if let Err(e) = self.send(identity, &message) {
            tracing::error!(identity = %identity, error = %e, "Failed to report move failure");
        }
    }

    fn send(&self, identity: &str, message: &OutboundMessage) -> HubResult<()> {
        let text = serialize_message(message).map_err(|e| HubError::Internal {
            message: format!("failed to encode {}: {}", message.kind(), e),
        })?;
        self.connections.send(identity, &text);
        Ok(())
    }
}

fn log_failure(identity: &str, operation: &str, error: &HubError) {
    if error.should_log() {
        tracing::error!(identity = %identity, operation, error = %error, "Request failed");
    } else {
        tracing::warn!(identity = %identity, operation, error = %error, "Request rejected");
    }
}
