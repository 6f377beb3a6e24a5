//! Type definitions for messages received from the simulation server.
//!
//! Incoming packets can be parsed by calling [`Message::decode`] on a
//! byte slice obtained from the UDP socket.
//!
//! # Example
//!
//! ```
//! use acsp_sidecar::protocol::Message;
//!
//! // opcode 73 (LapCompleted): car_id=7, laptime_ms=4801, cuts=0
//! let packet = [73u8, 7, 0xC1, 0x12, 0x00, 0x00, 0];
//! let parsed = Message::decode(&packet).unwrap();
//!
//! assert!(matches!(parsed, Message::LapCompleted(_)));
//! ```

use super::parser;
use super::DecodeError;

/// A decoded datagram sent by the simulation server.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    NewSession(NewSession),
    NewConnection(NewConnection),
    ConnectionClosed(ConnectionClosed),
    CarInfo(CarInfo),
    LapCompleted(LapCompleted),
}

impl Message {
    /// Decode an incoming message from a UDP payload.
    ///
    /// Fails with [`DecodeError::UnsupportedMessage`] if the opcode byte is
    /// outside the recognised set, or [`DecodeError::MessageParse`] if the
    /// opcode is recognised but the body can't be fully parsed. Bytes
    /// trailing the last field of a message are always ignored.
    pub fn decode(raw: &[u8]) -> Result<Message, DecodeError> {
        let (&opcode, body) = raw
            .split_first()
            .ok_or_else(|| DecodeError::MessageParse("empty datagram".to_owned()))?;
        parser::parse(opcode, body)
    }
}

/// Sent once at the start of each session, and again whenever the
/// session configuration changes.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub proto_version: u8,
    pub session_index: u8,
    pub current_session_index: u8,
    pub session_count: u8,
    pub server_name: String,
    pub track_name: String,
    pub track_config: String,
    pub name: String,
    pub session_type: u8,
    pub time: u16,
    pub laps: u16,
    pub wait_time: u16,
    pub ambient_temp: u8,
    pub track_temp: u8,
    pub weather_graph: String,
    pub elapsed_ms: u32,
}

/// Sent when a driver's car connects to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct NewConnection {
    pub driver_name: String,
    pub driver_guid: String,
    pub car_id: u8,
    pub car_model: String,
    pub car_skin: String,
}

/// Sent when a driver's car disconnects from the session. Same wire
/// shape as [`NewConnection`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionClosed {
    pub driver_name: String,
    pub driver_guid: String,
    pub car_id: u8,
    pub car_model: String,
    pub car_skin: String,
}

/// Answers a [`GetCarInfo`](super::outbound::encode_get_car_info) request.
#[derive(Debug, Clone, PartialEq)]
pub struct CarInfo {
    pub car_id: u8,
    pub is_connected: bool,
    pub model: String,
    pub skin: String,
    pub driver_name: String,
    pub driver_team: String,
    pub guid: String,
}

/// Sent when a car crosses the finish line.
#[derive(Debug, Clone, PartialEq)]
pub struct LapCompleted {
    pub car_id: u8,
    pub laptime_ms: u32,
    pub cuts: u8,
}
