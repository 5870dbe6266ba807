//! Wire format between the hub and its clients.
//!
//! Every frame is an [`Envelope`] `{type, payload}` whose `payload` is itself
//! a JSON document encoded into a string. Inbound frames decode into the
//! closed [`InboundMessage`] set; outbound frames are built from
//! [`OutboundMessage`].

use serde::{Deserialize, Serialize};

use crate::{HubError, HubResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: String,
}

impl Envelope {
    pub fn wrap<T: Serialize>(kind: &str, payload: &T) -> HubResult<Self> {
        Ok(Self {
            kind: kind.to_string(),
            payload: serde_json::to_string(payload)?,
        })
    }
}

// Inbound payloads

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub game_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub game_id: String,
    #[serde(rename = "move")]
    pub notation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Join(JoinRequest),
    Move(MoveRequest),
    Leave,
    /// A `type` the hub does not handle. Ignored by the dispatcher.
    Unknown(String),
}

pub fn deserialize_message(text: &str) -> HubResult<InboundMessage> {
    let envelope: Envelope = serde_json::from_str(text)?;
    let message = match envelope.kind.as_str() {
        "join" => InboundMessage::Join(serde_json::from_str(&envelope.payload)?),
        "move" => InboundMessage::Move(serde_json::from_str(&envelope.payload)?),
        "leave" => InboundMessage::Leave,
        _ => InboundMessage::Unknown(envelope.kind),
    };
    Ok(message)
}

// Outbound payloads

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgainstPayload {
    pub id: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    pub game_id: String,
    #[serde(rename = "move")]
    pub notation: String,
    pub fen: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PossibleMovesPayload {
    pub game_id: String,
    pub moves: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedPiecesPayload {
    pub game_id: String,
    pub white: Vec<String>,
    pub black: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomePayload {
    pub game_id: String,
    pub outcome: String,
    pub method: String,
    pub winner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub game_id: String,
    pub kind: String,
    pub message: String,
}

impl ErrorPayload {
    pub fn from_hub_error(game_id: &str, error: &HubError) -> Self {
        Self {
            game_id: game_id.to_string(),
            kind: error.variant_name().to_string(),
            message: error.user_friendly_message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Hello(HelloPayload),
    Against(AgainstPayload),
    Move(MovePayload),
    PossibleMoves(PossibleMovesPayload),
    CapturedPieces(CapturedPiecesPayload),
    Outcome(OutcomePayload),
    Error(ErrorPayload),
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Hello(_) => "hello",
            OutboundMessage::Against(_) => "against",
            OutboundMessage::Move(_) => "move",
            OutboundMessage::PossibleMoves(_) => "possibleMoves",
            OutboundMessage::CapturedPieces(_) => "capturedPieces",
            OutboundMessage::Outcome(_) => "outcome",
            OutboundMessage::Error(_) => "error",
        }
    }

    pub fn to_envelope(&self) -> HubResult<Envelope> {
        let kind = self.kind();
        match self {
            OutboundMessage::Hello(p) => Envelope::wrap(kind, p),
            OutboundMessage::Against(p) => Envelope::wrap(kind, p),
            OutboundMessage::Move(p) => Envelope::wrap(kind, p),
            OutboundMessage::PossibleMoves(p) => Envelope::wrap(kind, p),
            OutboundMessage::CapturedPieces(p) => Envelope::wrap(kind, p),
            OutboundMessage::Outcome(p) => Envelope::wrap(kind, p),
            OutboundMessage::Error(p) => Envelope::wrap(kind, p),
        }
    }
}

pub fn serialize_message(message: &OutboundMessage) -> HubResult<String> {
    let envelope = message.to_envelope()?;
    Ok(serde_json::to_string(&envelope)?)
}
