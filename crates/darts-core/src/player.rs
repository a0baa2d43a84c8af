use serde::{Deserialize, Serialize};

/// Maximum accepted length of a player name, in bytes.
pub const MAX_NAME_LEN: usize = 32;

/// Server-assigned player identifier (opaque).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A player as listed in the game snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    #[serde(default = "default_connected")]
    pub connected: bool,
}

fn default_connected() -> bool {
    true
}

/// Who this client is in which game. Fixed once the join is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    game_id: String,
    player_id: PlayerId,
}

impl LocalIdentity {
    pub fn new(game_id: impl Into<String>, player_id: PlayerId) -> Self {
        Self {
            game_id: game_id.into(),
            player_id,
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    Empty,
    TooLong(usize),
    ControlCharacter,
}

impl std::fmt::Display for NameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "player name is empty"),
            Self::TooLong(len) => {
                write!(f, "player name is {len} bytes (max {MAX_NAME_LEN})")
            },
            Self::ControlCharacter => write!(f, "player name contains control characters"),
        }
    }
}

impl std::error::Error for NameError {}

/// Trim and validate a display name before it is sent in a join request.
pub fn validate_player_name(name: &str) -> Result<String, NameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(NameError::TooLong(name.len()));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(NameError::ControlCharacter);
    }
    Ok(name.to_string())
}
