//! The ACSP wire protocol: decoding datagrams from the simulation server
//! and encoding chat/query datagrams back to it.

pub mod inbound;
pub mod outbound;
mod parser;

pub use inbound::{CarInfo, ConnectionClosed, LapCompleted, Message, NewConnection, NewSession};
pub use outbound::{encode_broadcast, encode_get_car_info, encode_send_chat};

use thiserror::Error;

// Opcodes this codec never decodes into a `Message` variant, named here
// purely so an `UnsupportedMessage` log line can be cross-referenced
// against a known name. Widening the decode table means adding a new
// `Message` variant and parser, never touching this list.
#[allow(dead_code)]
pub const ACSP_CAR_UPDATE: u8 = 53;
#[allow(dead_code)]
pub const ACSP_END_SESSION: u8 = 55;
#[allow(dead_code)]
pub const ACSP_VERSION: u8 = 56;
#[allow(dead_code)]
pub const ACSP_CHAT: u8 = 57;
#[allow(dead_code)]
pub const ACSP_CLIENT_LOADED: u8 = 58;
#[allow(dead_code)]
pub const ACSP_SESSION_INFO: u8 = 59;
#[allow(dead_code)]
pub const ACSP_ERROR: u8 = 60;
#[allow(dead_code)]
pub const ACSP_REALTIMEPOS_INTERVAL: u8 = 200;
#[allow(dead_code)]
pub const ACSP_GET_SESSION_INFO: u8 = 204;
#[allow(dead_code)]
pub const ACSP_SET_SESSION_INFO: u8 = 205;
#[allow(dead_code)]
pub const ACSP_KICK_USER: u8 = 206;
#[allow(dead_code)]
pub const ACSP_NEXT_SESSION: u8 = 207;
#[allow(dead_code)]
pub const ACSP_RESTART_SESSION: u8 = 208;
#[allow(dead_code)]
pub const ACSP_ADMIN_COMMAND: u8 = 209;
#[allow(dead_code)]
pub const ACSP_CLIENT_EVENT: u8 = 130;
#[allow(dead_code)]
pub const ACSP_CE_COLLISION_WITH_CAR: u8 = 10;
#[allow(dead_code)]
pub const ACSP_CE_COLLISION_WITH_ENV: u8 = 11;

/// Errors produced while decoding an incoming datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The opcode byte is outside the set this codec decodes.
    #[error("unsupported message opcode `{0}`")]
    UnsupportedMessage(u8),
    /// The opcode was recognised, but the payload couldn't be parsed.
    #[error("failed to parse message body: {0}")]
    MessageParse(String),
}
