use serde::{Deserialize, Serialize};

use crate::game_state::{GameSnapshot, ThrowRecord};
use crate::player::PlayerId;

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    JoinGame = 0x01,
    ThrowDart = 0x02,
    GetGameState = 0x03,
    Heartbeat = 0x04,

    // Server -> Client
    GameJoined = 0x10,
    PlayerJoined = 0x11,
    GameStarted = 0x12,
    DartThrown = 0x13,
    PlayerDisconnected = 0x14,
    GameStateUpdate = 0x15,
    Error = 0x16,
    HeartbeatAck = 0x17,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::JoinGame),
            0x02 => Some(Self::ThrowDart),
            0x03 => Some(Self::GetGameState),
            0x04 => Some(Self::Heartbeat),
            0x10 => Some(Self::GameJoined),
            0x11 => Some(Self::PlayerJoined),
            0x12 => Some(Self::GameStarted),
            0x13 => Some(Self::DartThrown),
            0x14 => Some(Self::PlayerDisconnected),
            0x15 => Some(Self::GameStateUpdate),
            0x16 => Some(Self::Error),
            0x17 => Some(Self::HeartbeatAck),
            _ => None,
        }
    }

    /// Event name used in JSON text frames.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::JoinGame => "join_game",
            Self::ThrowDart => "throw_dart",
            Self::GetGameState => "get_game_state",
            Self::Heartbeat => "heartbeat",
            Self::GameJoined => "game_joined",
            Self::PlayerJoined => "player_joined",
            Self::GameStarted => "game_started",
            Self::DartThrown => "dart_thrown",
            Self::PlayerDisconnected => "player_disconnected",
            Self::GameStateUpdate => "game_state_update",
            Self::Error => "error",
            Self::HeartbeatAck => "heartbeat_ack",
        }
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "join_game" => Some(Self::JoinGame),
            "throw_dart" => Some(Self::ThrowDart),
            "get_game_state" => Some(Self::GetGameState),
            "heartbeat" => Some(Self::Heartbeat),
            "game_joined" => Some(Self::GameJoined),
            "player_joined" => Some(Self::PlayerJoined),
            "game_started" => Some(Self::GameStarted),
            "dart_thrown" => Some(Self::DartThrown),
            "player_disconnected" => Some(Self::PlayerDisconnected),
            "game_state_update" => Some(Self::GameStateUpdate),
            "error" => Some(Self::Error),
            "heartbeat_ack" => Some(Self::HeartbeatAck),
            _ => None,
        }
    }

    pub fn is_client_bound(self) -> bool {
        (self as u8) >= 0x10
    }
}

// ============================================================================
// Client -> Server payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGameMsg {
    pub game_id: String,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrowDartMsg {
    pub game_id: String,
    pub score: u8,
    pub multiplier: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetGameStateMsg {
    pub game_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatMsg {}

// ============================================================================
// Server -> Client payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameJoinedMsg {
    pub player_id: PlayerId,
    pub game_state: GameSnapshot,
    #[serde(default)]
    pub game_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerJoinedMsg {
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    pub player_name: String,
    pub game_state: GameSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStartedMsg {
    pub game_state: GameSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DartThrownMsg {
    pub throw: ThrowRecord,
    pub game_state: GameSnapshot,
    pub game_over: bool,
    #[serde(default)]
    pub winner: Option<PlayerId>,
    #[serde(default)]
    pub turn_over: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDisconnectedMsg {
    pub player_id: PlayerId,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateUpdateMsg {
    pub game_state: GameSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMsg {
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatAckMsg {}

// ============================================================================
// Envelopes
// ============================================================================

/// Every event a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinGame(JoinGameMsg),
    ThrowDart(ThrowDartMsg),
    GetGameState(GetGameStateMsg),
    Heartbeat(HeartbeatMsg),
}

impl ClientMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::JoinGame(_) => MessageType::JoinGame,
            Self::ThrowDart(_) => MessageType::ThrowDart,
            Self::GetGameState(_) => MessageType::GetGameState,
            Self::Heartbeat(_) => MessageType::Heartbeat,
        }
    }
}

/// Every event a server may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    GameJoined(GameJoinedMsg),
    PlayerJoined(PlayerJoinedMsg),
    GameStarted(GameStartedMsg),
    DartThrown(Box<DartThrownMsg>),
    PlayerDisconnected(PlayerDisconnectedMsg),
    GameStateUpdate(GameStateUpdateMsg),
    Error(ErrorMsg),
    HeartbeatAck(HeartbeatAckMsg),
}

impl ServerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::GameJoined(_) => MessageType::GameJoined,
            Self::PlayerJoined(_) => MessageType::PlayerJoined,
            Self::GameStarted(_) => MessageType::GameStarted,
            Self::DartThrown(_) => MessageType::DartThrown,
            Self::PlayerDisconnected(_) => MessageType::PlayerDisconnected,
            Self::GameStateUpdate(_) => MessageType::GameStateUpdate,
            Self::Error(_) => MessageType::Error,
            Self::HeartbeatAck(_) => MessageType::HeartbeatAck,
        }
    }

    /// The authoritative snapshot carried by this event, if any.
    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        match self {
            Self::GameJoined(m) => Some(&m.game_state),
            Self::PlayerJoined(m) => Some(&m.game_state),
            Self::GameStarted(m) => Some(&m.game_state),
            Self::DartThrown(m) => Some(&m.game_state),
            Self::GameStateUpdate(m) => Some(&m.game_state),
            Self::PlayerDisconnected(_) | Self::Error(_) | Self::HeartbeatAck(_) => None,
        }
    }
}
