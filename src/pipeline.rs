//! The single-reader event loop: decode a datagram, mutate session
//! state, and apply the lap-record admission rule.
//!
//! [`process_datagram`] is the pure core — it takes a [`PipelineContext`]
//! and the raw bytes of one datagram and returns the encoded reply
//! datagrams to send back to the sender. [`run`] is the thin blocking
//! loop around a real [`UdpSocket`] that calls it.

use std::net::{SocketAddr, UdpSocket};

use log::{debug, error, info, warn};

use crate::format::format_ms;
use crate::protocol::{self, DecodeError, Message};
use crate::session::PipelineContext;

/// Decode one datagram and apply it to `ctx`, returning any reply
/// datagrams to send back to the sender.
///
/// Decode failures are logged and swallowed here rather than
/// propagated: per the admission rule, a malformed or unrecognised
/// datagram never crashes the loop.
pub fn process_datagram(ctx: &mut PipelineContext, raw: &[u8]) -> Vec<Vec<u8>> {
    let message = match Message::decode(raw) {
        Ok(message) => message,
        Err(DecodeError::UnsupportedMessage(opcode)) => {
            debug!("ignoring unsupported opcode {}", opcode);
            return Vec::new();
        }
        Err(DecodeError::MessageParse(reason)) => {
            warn!("failed to parse message body: {}", reason);
            return Vec::new();
        }
    };

    match message {
        Message::NewSession(session) => {
            ctx.session.set_session(&session);
            Vec::new()
        }
        Message::NewConnection(connection) => {
            ctx.connections.insert(connection);
            Vec::new()
        }
        Message::ConnectionClosed(closed) => {
            ctx.connections.remove(&closed);
            Vec::new()
        }
        Message::CarInfo(info) => {
            debug!("received car info for car_id {}", info.car_id);
            Vec::new()
        }
        Message::LapCompleted(lap) => on_lap_completed(ctx, lap),
    }
}

fn on_lap_completed(ctx: &mut PipelineContext, lap: protocol::LapCompleted) -> Vec<Vec<u8>> {
    if lap.cuts > 0 {
        info!("dropping cut lap for car_id {}", lap.car_id);
        return Vec::new();
    }

    let (track_name, track_config) = match ctx.session.current() {
        Some(current) => current,
        None => {
            error!(
                "lap completed for car_id {} before a session was announced",
                lap.car_id
            );
            return Vec::new();
        }
    };
    let (track_name, track_config) = (track_name.to_owned(), track_config.to_owned());

    let connection = match ctx.connections.get(lap.car_id) {
        Some(connection) => connection.clone(),
        None => {
            error!("lap completed for car_id {} with no connection on record", lap.car_id);
            return Vec::new();
        }
    };

    const DEFAULT_GRIP_LEVEL: f32 = 1.0;

    // Snapshot the server record before admitting this lap as a PB, so
    // `sr_diff` reflects the field this driver actually beat rather
    // than the row their own lap may have just replaced.
    let sr_diff = match ctx.store.compare_to_server_record(
        &track_name,
        &track_config,
        &connection.car_model,
        lap.laptime_ms,
    ) {
        Ok(diff) => diff,
        Err(e) => {
            error!("store error comparing server record: {}", e);
            return Vec::new();
        }
    };

    let pb_diff = match ctx.store.record_pb(
        &connection.driver_guid,
        &track_name,
        &track_config,
        &connection.driver_name,
        lap.laptime_ms,
        &connection.car_model,
        DEFAULT_GRIP_LEVEL,
    ) {
        Ok(diff) => diff,
        Err(e) => {
            error!("store error recording PB: {}", e);
            return Vec::new();
        }
    };

    let mut replies = Vec::with_capacity(2);
    replies.push(pb_reply(lap.car_id, lap.laptime_ms, pb_diff));
    replies.push(sr_reply(lap.car_id, lap.laptime_ms, sr_diff));
    replies
}

fn pb_reply(car_id: u8, laptime_ms: u32, pb_diff: i64) -> Vec<u8> {
    if pb_diff == laptime_ms as i64 {
        protocol::encode_send_chat(car_id, &format!("first PB: {}", format_ms(laptime_ms)))
    } else if pb_diff < 0 {
        protocol::encode_broadcast(&format!("new PB, by {}", format_ms(pb_diff.unsigned_abs() as u32)))
    } else {
        protocol::encode_send_chat(
            car_id,
            &format!(
                "lap time {} (PB +{})",
                format_ms(laptime_ms),
                format_ms(pb_diff as u32)
            ),
        )
    }
}

fn sr_reply(car_id: u8, laptime_ms: u32, sr_diff: i64) -> Vec<u8> {
    if sr_diff == laptime_ms as i64 {
        protocol::encode_broadcast(&format!("first server record: {}", format_ms(laptime_ms)))
    } else if sr_diff < 0 {
        protocol::encode_broadcast(&format!(
            "new server record, by {}",
            format_ms(sr_diff.unsigned_abs() as u32)
        ))
    } else {
        protocol::encode_send_chat(
            car_id,
            &format!("server record diff +{}", format_ms(sr_diff as u32)),
        )
    }
}

/// Bind `bind_addr` and run the receive loop forever, applying
/// [`process_datagram`] to each datagram and sending any replies back
/// to its source address.
///
/// If the socket is ever observed closed, it is reopened at the top of
/// the next iteration rather than tearing down the process.
pub fn run(ctx: &mut PipelineContext, bind_addr: SocketAddr) -> std::io::Result<()> {
    let mut socket = UdpSocket::bind(bind_addr)?;
    let mut buf = [0u8; 4096];

    loop {
        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(result) => result,
            Err(e) => {
                warn!("socket error, reopening: {}", e);
                socket = UdpSocket::bind(bind_addr)?;
                continue;
            }
        };

        for reply in process_datagram(ctx, &buf[..len]) {
            if let Err(e) = socket.send_to(&reply, peer) {
                error!("failed to send reply to {}: {}", peer, e);
            }
        }
    }
}
