use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Serialize)]
pub enum HubError {
    // Session-related errors
    #[error("Session '{session_id}' not found")]
    SessionNotFound { session_id: String },

    #[error("'{identity}' is not a participant of session '{session_id}'")]
    NotAParticipant {
        identity: String,
        session_id: String,
    },

    #[error("Not the turn of '{identity}' in session '{session_id}'")]
    NotPlayerTurn {
        identity: String,
        session_id: String,
    },

    #[error("Illegal move '{notation}' in session '{session_id}'")]
    IllegalMove {
        notation: String,
        session_id: String,
    },

    #[error("Session '{session_id}' has already ended")]
    GameEnded { session_id: String },

    #[error("Stored position could not be decoded: {reason}")]
    InvalidPosition { reason: String },

    // Wire errors
    #[error("Malformed envelope: {message}")]
    MalformedEnvelope { message: String },

    #[error("Transport failure: {message}")]
    TransportFailure { message: String },

    // Durability errors
    #[error("Persistence failure: {message}")]
    PersistenceFailure { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

pub type HubResult<T> = Result<T, HubError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ClientError,
    ServerError,
    GameError,
}

impl HubError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HubError::SessionNotFound { .. }
            | HubError::NotAParticipant { .. }
            | HubError::MalformedEnvelope { .. } => ErrorCategory::ClientError,

            HubError::NotPlayerTurn { .. }
            | HubError::IllegalMove { .. }
            | HubError::GameEnded { .. } => ErrorCategory::GameError,

            HubError::InvalidPosition { .. }
            | HubError::TransportFailure { .. }
            | HubError::PersistenceFailure { .. }
            | HubError::Internal { .. } => ErrorCategory::ServerError,
        }
    }

    pub fn should_log(&self) -> bool {
        matches!(self.category(), ErrorCategory::ServerError)
    }

    pub fn status_code(&self) -> u16 {
        match self {
            HubError::SessionNotFound { .. } => 404,
            _ => match self.category() {
                ErrorCategory::GameError => 409,
                ErrorCategory::ClientError => 400,
                ErrorCategory::ServerError => 500,
            },
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            HubError::SessionNotFound { .. } => "NotFound",
            HubError::NotAParticipant { .. } => "NotAParticipant",
            HubError::NotPlayerTurn { .. } => "NotPlayerTurn",
            HubError::IllegalMove { .. } => "IllegalMove",
            HubError::GameEnded { .. } => "GameEnded",
            HubError::InvalidPosition { .. } => "InvalidPosition",
            HubError::MalformedEnvelope { .. } => "MalformedEnvelope",
            HubError::TransportFailure { .. } => "TransportFailure",
            HubError::PersistenceFailure { .. } => "PersistenceFailure",
            HubError::Internal { .. } => "Internal",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            HubError::SessionNotFound { .. } => "Game not found".to_string(),
            HubError::NotPlayerTurn { .. } => "It is not your turn".to_string(),
            HubError::PersistenceFailure { .. } => {
                "The game could not be saved, please retry".to_string()
            }
            HubError::Internal { .. } => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    pub fn persistence(err: impl std::fmt::Display) -> Self {
        HubError::PersistenceFailure {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for HubError {
    fn from(err: std::io::Error) -> Self {
        HubError::persistence(err)
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::MalformedEnvelope {
            message: err.to_string(),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for HubError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        HubError::TransportFailure {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_drive_logging_and_status() {
        let missing = HubError::SessionNotFound {
            session_id: "g1".to_string(),
        };
        assert_eq!(missing.status_code(), 404);
        assert!(!missing.should_log());
        assert_eq!(missing.variant_name(), "NotFound");

        let illegal = HubError::IllegalMove {
            notation: "e2e5".to_string(),
            session_id: "g1".to_string(),
        };
        assert_eq!(illegal.category(), ErrorCategory::GameError);
        assert_eq!(illegal.status_code(), 409);

        let disk = HubError::persistence("disk full");
        assert!(disk.should_log());
        assert_eq!(disk.status_code(), 500);
        assert_eq!(disk.to_string(), "Persistence failure: disk full");
    }

    #[test]
    fn json_errors_are_malformed_envelopes() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let hub: HubError = err.into();
        assert_eq!(hub.variant_name(), "MalformedEnvelope");
    }
}
