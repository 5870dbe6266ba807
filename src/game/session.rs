use serde::{Deserialize, Serialize};

use crate::game::rules::Side;

/// Opponent identity meaning "no human on this seat".
pub const AI_OPPONENT: &str = "ai";

/// True for seats nobody connects to: the AI sentinel or an empty slot.
pub fn is_unattended(identity: &str) -> bool {
    identity.is_empty() || identity == AI_OPPONENT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColorPreference {
    White,
    Black,
    #[default]
    Random,
}

impl TryFrom<String> for ColorPreference {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "w" => Ok(ColorPreference::White),
            "b" => Ok(ColorPreference::Black),
            "" => Ok(ColorPreference::Random),
            other => Err(format!("unknown preferred color '{other}'")),
        }
    }
}

impl From<ColorPreference> for String {
    fn from(preference: ColorPreference) -> Self {
        match preference {
            ColorPreference::White => "w",
            ColorPreference::Black => "b",
            ColorPreference::Random => "",
        }
        .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seats {
    pub white: String,
    pub black: String,
}

impl Seats {
    /// Seats `first` on the preferred side. `coin_flip` is only consulted for
    /// [`ColorPreference::Random`]; `true` puts `first` on White.
    pub fn assign(
        first: String,
        second: String,
        preference: ColorPreference,
        coin_flip: impl FnOnce() -> bool,
    ) -> Self {
        let first_is_white = match preference {
            ColorPreference::White => true,
            ColorPreference::Black => false,
            ColorPreference::Random => coin_flip(),
        };

        if first_is_white {
            Seats {
                white: first,
                black: second,
            }
        } else {
            Seats {
                white: second,
                black: first,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session<P> {
    pub id: String,
    pub white: String,
    pub black: String,
    pub position: P,
}

impl<P> Session<P> {
    pub fn new(id: String, seats: Seats, position: P) -> Self {
        Self {
            id,
            white: seats.white,
            black: seats.black,
            position,
        }
    }

    pub fn occupant(&self, side: Side) -> &str {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    /// The side `identity` sits on, White first if it holds both seats.
    pub fn seat_of(&self, identity: &str) -> Option<Side> {
        if is_unattended(identity) {
            None
        } else if self.white == identity {
            Some(Side::White)
        } else if self.black == identity {
            Some(Side::Black)
        } else {
            None
        }
    }

    pub fn is_participant(&self, identity: &str) -> bool {
        self.seat_of(identity).is_some()
    }

    /// Whether `identity` may move for `side`. A participant also steers the
    /// opposite side when that seat is unattended, so it can relay the moves
    /// of a local engine.
    pub fn controls(&self, identity: &str, side: Side) -> bool {
        if !self.is_participant(identity) {
            return false;
        }
        let occupant = self.occupant(side);
        occupant == identity
            || (is_unattended(occupant) && self.occupant(side.opposite()) == identity)
    }

    /// Identity on the other seat from `identity`, with its colour.
    pub fn opponent_of(&self, identity: &str) -> Option<(&str, Side)> {
        let side = self.seat_of(identity)?.opposite();
        Some((self.occupant(side), side))
    }

    /// The other seat's identity if a human can be reached there.
    pub fn human_opponent_of(&self, identity: &str) -> Option<&str> {
        self.opponent_of(identity)
            .map(|(opponent, _)| opponent)
            .filter(|opponent| !is_unattended(opponent) && *opponent != identity)
    }
}

/// Durable projection of a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(rename = "pgn")]
    pub record: String,
    #[serde(rename = "whitePlayerId")]
    pub white: String,
    #[serde(rename = "blackPlayerId")]
    pub black: String,
}
