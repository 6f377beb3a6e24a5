//! Encoders for the three outbound opcodes this sidecar emits: chat
//! directed at a single car, chat broadcast to the whole server, and a
//! car info query.

use byteorder::{LittleEndian, WriteBytesExt};

const ACSP_SEND_CHAT: u8 = 202;
const ACSP_BROADCAST_CHAT: u8 = 203;
const ACSP_GET_CAR_INFO: u8 = 201;

/// Truncate `message` to at most 255 UTF-32 code points, as the wire
/// format's length prefix is a single byte. Truncation is silent.
fn truncate_codepoints(message: &str) -> Vec<char> {
    message.chars().take(255).collect()
}

fn write_wide_string(buf: &mut Vec<u8>, chars: &[char]) {
    buf.push(chars.len() as u8);
    for &c in chars {
        buf.write_u32::<LittleEndian>(c as u32)
            .expect("writing to a Vec<u8> never fails");
    }
}

/// Encode an [`ACSP_BROADCAST_CHAT`](ACSP_BROADCAST_CHAT) datagram.
pub fn encode_broadcast(message: &str) -> Vec<u8> {
    let chars = truncate_codepoints(message);
    let mut buf = Vec::with_capacity(2 + 4 * chars.len());
    buf.push(ACSP_BROADCAST_CHAT);
    write_wide_string(&mut buf, &chars);
    buf
}

/// Encode an [`ACSP_SEND_CHAT`](ACSP_SEND_CHAT) datagram directed at `car_id`.
pub fn encode_send_chat(car_id: u8, message: &str) -> Vec<u8> {
    let chars = truncate_codepoints(message);
    let mut buf = Vec::with_capacity(3 + 4 * chars.len());
    buf.push(ACSP_SEND_CHAT);
    buf.push(car_id);
    write_wide_string(&mut buf, &chars);
    buf
}

/// Encode an [`ACSP_GET_CAR_INFO`](ACSP_GET_CAR_INFO) request for `car_id`.
pub fn encode_get_car_info(car_id: u8) -> Vec<u8> {
    vec![ACSP_GET_CAR_INFO, car_id]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_round_trips_through_decode() {
        let encoded = encode_broadcast("hello");
        assert_eq!(encoded[0], ACSP_BROADCAST_CHAT);
        assert_eq!(encoded[1], 5);
    }

    #[test]
    fn broadcast_truncates_to_255_codepoints() {
        let message: String = std::iter::repeat('x').take(256).collect();
        let encoded = encode_broadcast(&message);
        assert_eq!(encoded[1], 255);
        // 1 opcode byte + 1 length byte + 255 * 4 bytes of payload
        assert_eq!(encoded.len(), 1022);
        assert_eq!(encoded.len() - 2, 1020);
    }

    #[test]
    fn send_chat_includes_car_id() {
        let encoded = encode_send_chat(42, "hi");
        assert_eq!(encoded[0], ACSP_SEND_CHAT);
        assert_eq!(encoded[1], 42);
        assert_eq!(encoded[2], 2);
    }

    #[test]
    fn get_car_info_is_two_bytes() {
        let encoded = encode_get_car_info(9);
        assert_eq!(encoded, vec![ACSP_GET_CAR_INFO, 9]);
    }
}
