use serde::{Deserialize, Serialize};

use super::messages::{
    ClientMessage, DartThrownMsg, ErrorMsg, GameJoinedMsg, GameStartedMsg, GameStateUpdateMsg,
    GetGameStateMsg, HeartbeatAckMsg, HeartbeatMsg, JoinGameMsg, MessageType,
    PlayerDisconnectedMsg, PlayerJoinedMsg, ServerMessage, ThrowDartMsg,
};

/// Maximum message payload size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    UnknownEvent(String),
    MissingEvent,
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::UnknownEvent(name) => write!(f, "unknown event: {name:?}"),
            Self::MissingEvent => write!(f, "frame has no event name"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

// ============================================================================
// Binary frames: 1-byte type prefix + MessagePack payload
// ============================================================================

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::JoinGame(m) => encode_message(MessageType::JoinGame, m),
        ClientMessage::ThrowDart(m) => encode_message(MessageType::ThrowDart, m),
        ClientMessage::GetGameState(m) => encode_message(MessageType::GetGameState, m),
        ClientMessage::Heartbeat(m) => encode_message(MessageType::Heartbeat, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::GameJoined(m) => encode_message(MessageType::GameJoined, m),
        ServerMessage::PlayerJoined(m) => encode_message(MessageType::PlayerJoined, m),
        ServerMessage::GameStarted(m) => encode_message(MessageType::GameStarted, m),
        ServerMessage::DartThrown(m) => encode_message(MessageType::DartThrown, m.as_ref()),
        ServerMessage::PlayerDisconnected(m) => {
            encode_message(MessageType::PlayerDisconnected, m)
        },
        ServerMessage::GameStateUpdate(m) => encode_message(MessageType::GameStateUpdate, m),
        ServerMessage::Error(m) => encode_message(MessageType::Error, m),
        ServerMessage::HeartbeatAck(m) => encode_message(MessageType::HeartbeatAck, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    let Some(&first) = data.first() else {
        return Err(ProtocolError::EmptyMessage);
    };
    MessageType::from_byte(first).ok_or(ProtocolError::UnknownMessageType(first))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    let Some(payload) = data.get(1..) else {
        return Err(ProtocolError::EmptyMessage);
    };
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }
    rmp_serde::from_slice(payload).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    match decode_message_type(data)? {
        MessageType::JoinGame => Ok(ClientMessage::JoinGame(decode_payload::<JoinGameMsg>(
            data,
        )?)),
        MessageType::ThrowDart => Ok(ClientMessage::ThrowDart(decode_payload::<ThrowDartMsg>(
            data,
        )?)),
        MessageType::GetGameState => Ok(ClientMessage::GetGameState(decode_payload::<
            GetGameStateMsg,
        >(data)?)),
        MessageType::Heartbeat => Ok(ClientMessage::Heartbeat(decode_payload::<HeartbeatMsg>(
            data,
        )?)),
        other => Err(ProtocolError::UnknownMessageType(other as u8)),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    match decode_message_type(data)? {
        MessageType::GameJoined => Ok(ServerMessage::GameJoined(decode_payload::<GameJoinedMsg>(
            data,
        )?)),
        MessageType::PlayerJoined => Ok(ServerMessage::PlayerJoined(decode_payload::<
            PlayerJoinedMsg,
        >(data)?)),
        MessageType::GameStarted => Ok(ServerMessage::GameStarted(decode_payload::<
            GameStartedMsg,
        >(data)?)),
        MessageType::DartThrown => Ok(ServerMessage::DartThrown(Box::new(decode_payload::<
            DartThrownMsg,
        >(data)?))),
        MessageType::PlayerDisconnected => Ok(ServerMessage::PlayerDisconnected(
            decode_payload::<PlayerDisconnectedMsg>(data)?,
        )),
        MessageType::GameStateUpdate => Ok(ServerMessage::GameStateUpdate(decode_payload::<
            GameStateUpdateMsg,
        >(data)?)),
        MessageType::Error => Ok(ServerMessage::Error(decode_payload::<ErrorMsg>(data)?)),
        MessageType::HeartbeatAck => Ok(ServerMessage::HeartbeatAck(decode_payload::<
            HeartbeatAckMsg,
        >(data)?)),
        other => Err(ProtocolError::UnknownMessageType(other as u8)),
    }
}

// ============================================================================
// Text frames: {"event": "<name>", "data": {...}}
// ============================================================================

pub fn encode_client_json(msg: &ClientMessage) -> Result<String, ProtocolError> {
    encode_json(msg)
}

pub fn encode_server_json(msg: &ServerMessage) -> Result<String, ProtocolError> {
    encode_json(msg)
}

fn encode_json<T: Serialize>(msg: &T) -> Result<String, ProtocolError> {
    let text = serde_json::to_string(msg).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(text.len()));
    }
    Ok(text)
}

/// Decode a JSON text frame into a `ServerMessage`.
///
/// The event name is checked against the closed set before the payload is
/// parsed, so an unrecognized event fails as `UnknownEvent` rather than as
/// a generic schema error.
pub fn decode_server_json(text: &str) -> Result<ServerMessage, ProtocolError> {
    let value = checked_envelope(text, true)?;
    serde_json::from_value(value).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode a JSON text frame into a `ClientMessage`.
pub fn decode_client_json(text: &str) -> Result<ClientMessage, ProtocolError> {
    let value = checked_envelope(text, false)?;
    serde_json::from_value(value).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

fn checked_envelope(text: &str, client_bound: bool) -> Result<serde_json::Value, ProtocolError> {
    if text.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(text.len()));
    }
    let mut value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::DeserializeError(e.to_string()))?;
    let Some(object) = value.as_object_mut() else {
        return Err(ProtocolError::MissingEvent);
    };
    let name = object
        .get("event")
        .and_then(|e| e.as_str())
        .ok_or(ProtocolError::MissingEvent)?;
    match MessageType::from_event_name(name) {
        Some(t) if t.is_client_bound() == client_bound => {},
        _ => return Err(ProtocolError::UnknownEvent(name.to_string())),
    }
    // Payload-less events (heartbeat, heartbeat_ack) may omit `data`.
    if object.get("data").is_none_or(|d| d.is_null()) {
        object.insert(
            "data".to_string(),
            serde_json::Value::Object(serde_json::Map::new()),
        );
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::{GameSnapshot, Multiplier};
    use crate::player::PlayerId;
    use crate::test_helpers::{in_progress_snapshot, throw_record, timeout_record};

    #[test]
    fn roundtrip_join_game() {
        let msg = ClientMessage::JoinGame(JoinGameMsg {
            game_id: "ab12cd34".to_string(),
            player_name: "Alice".to_string(),
        });
        let encoded = encode_client_message(&msg).unwrap();
        assert_eq!(encoded[0], MessageType::JoinGame as u8);
        let decoded = decode_client_message(&encoded).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn roundtrip_throw_dart() {
        let msg = ClientMessage::ThrowDart(ThrowDartMsg {
            game_id: "g".to_string(),
            score: 20,
            multiplier: 3,
        });
        let decoded = decode_client_message(&encode_client_message(&msg).unwrap()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn roundtrip_dart_thrown_with_snapshot() {
        let msg = ServerMessage::DartThrown(Box::new(DartThrownMsg {
            throw: throw_record("Alice", 20, Multiplier::Triple, 441),
            game_state: in_progress_snapshot("B"),
            game_over: false,
            winner: None,
            turn_over: true,
        }));
        let encoded = encode_server_message(&msg).unwrap();
        let decoded = decode_server_message(&encoded).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn decode_empty_message_fails() {
        assert!(matches!(
            decode_message_type(&[]),
            Err(ProtocolError::EmptyMessage)
        ));
        assert!(matches!(
            decode_payload::<HeartbeatMsg>(&[]),
            Err(ProtocolError::EmptyMessage)
        ));
    }

    #[test]
    fn decode_unknown_type_fails() {
        assert!(matches!(
            decode_message_type(&[0xFF]),
            Err(ProtocolError::UnknownMessageType(0xFF))
        ));
    }

    #[test]
    fn decode_client_msg_with_server_type_fails() {
        let msg = ServerMessage::HeartbeatAck(HeartbeatAckMsg {});
        let encoded = encode_server_message(&msg).unwrap();
        assert!(decode_client_message(&encoded).is_err());
    }

    #[test]
    fn decode_server_msg_with_client_type_fails() {
        let msg = ClientMessage::Heartbeat(HeartbeatMsg {});
        let encoded = encode_client_message(&msg).unwrap();
        assert!(decode_server_message(&encoded).is_err());
    }

    #[test]
    fn payload_too_large_rejected() {
        let msg = ServerMessage::Error(ErrorMsg {
            message: "x".repeat(MAX_MESSAGE_SIZE),
        });
        assert!(matches!(
            encode_server_message(&msg),
            Err(ProtocolError::PayloadTooLarge(_))
        ));
        assert!(matches!(
            encode_server_json(&msg),
            Err(ProtocolError::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn protocol_error_display() {
        assert_eq!(format!("{}", ProtocolError::EmptyMessage), "empty message");
        assert_eq!(
            format!("{}", ProtocolError::UnknownMessageType(0xFF)),
            "unknown message type: 0xff"
        );
        assert_eq!(
            format!("{}", ProtocolError::UnknownEvent("game_created".into())),
            "unknown event: \"game_created\""
        );
        assert!(format!("{}", ProtocolError::PayloadTooLarge(99999)).contains("99999"));
    }

    // ================================================================
    // JSON text frames
    // ================================================================

    #[test]
    fn client_json_envelope() {
        let msg = ClientMessage::ThrowDart(ThrowDartMsg {
            game_id: "g1".to_string(),
            score: 25,
            multiplier: 2,
        });
        let text = encode_client_json(&msg).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["event"], "throw_dart");
        assert_eq!(value["data"]["score"], 25);
        assert_eq!(value["data"]["multiplier"], 2);
        assert_eq!(decode_client_json(&text).unwrap(), msg);
    }

    #[test]
    fn server_json_from_wire_text() {
        let text = r#"{
            "event": "player_disconnected",
            "data": {"player_id": "sid-9", "player_name": "Bob"}
        }"#;
        let msg = decode_server_json(text).unwrap();
        assert_eq!(
            msg,
            ServerMessage::PlayerDisconnected(PlayerDisconnectedMsg {
                player_id: PlayerId::from("sid-9"),
                player_name: "Bob".to_string(),
            })
        );
    }

    #[test]
    fn dart_thrown_json_without_optional_fields() {
        let text = r#"{
            "event": "dart_thrown",
            "data": {
                "throw": {"player_name": "Alice", "score": 5, "multiplier": 1, "value": 5},
                "game_state": {"game_started": true, "game_over": false},
                "game_over": false
            }
        }"#;
        let ServerMessage::DartThrown(m) = decode_server_json(text).unwrap() else {
            panic!("expected dart_thrown");
        };
        assert!(m.winner.is_none());
        assert!(!m.turn_over);
        assert_eq!(m.throw.value, Some(5));
        assert_eq!(m.game_state, GameSnapshot {
            game_started: true,
            ..GameSnapshot::default()
        });
    }

    #[test]
    fn heartbeat_ack_without_data() {
        let msg = decode_server_json(r#"{"event": "heartbeat_ack"}"#).unwrap();
        assert_eq!(msg, ServerMessage::HeartbeatAck(HeartbeatAckMsg {}));
    }

    #[test]
    fn unknown_event_rejected() {
        assert!(matches!(
            decode_server_json(r#"{"event": "game_created", "data": {"game_id": "x"}}"#),
            Err(ProtocolError::UnknownEvent(name)) if name == "game_created"
        ));
        // Client-to-server events are not valid inbound.
        assert!(matches!(
            decode_server_json(r#"{"event": "throw_dart", "data": {}}"#),
            Err(ProtocolError::UnknownEvent(_))
        ));
    }

    #[test]
    fn missing_event_rejected() {
        assert!(matches!(
            decode_server_json(r#"{"data": {}}"#),
            Err(ProtocolError::MissingEvent)
        ));
        assert!(matches!(
            decode_server_json("[1, 2]"),
            Err(ProtocolError::MissingEvent)
        ));
        assert!(matches!(
            decode_server_json(""),
            Err(ProtocolError::EmptyMessage)
        ));
    }

    #[test]
    fn schema_violation_is_deserialize_error() {
        let text = r#"{"event": "error", "data": {"msg": "typo"}}"#;
        assert!(matches!(
            decode_server_json(text),
            Err(ProtocolError::DeserializeError(_))
        ));
    }

    #[test]
    fn server_json_roundtrip_keeps_timeout_record() {
        let msg = ServerMessage::GameStateUpdate(GameStateUpdateMsg {
            game_state: GameSnapshot {
                history: vec![timeout_record("Bob")],
                ..in_progress_snapshot("A")
            },
        });
        let text = encode_server_json(&msg).unwrap();
        assert_eq!(decode_server_json(&text).unwrap(), msg);
    }
}
