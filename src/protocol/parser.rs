//! Field-level combinators shared by every message parser, plus the
//! opcode dispatch table.

use nom::bytes::complete::take;
use nom::combinator::map_res;
use nom::error::context;
use nom::multi::length_data;
use nom::number::complete::{le_u16, le_u32, le_u8};
use nom::sequence::tuple;
use nom::IResult;

use crate::protocol::inbound::{
    CarInfo, ConnectionClosed, LapCompleted, Message, NewConnection, NewSession,
};
use crate::protocol::DecodeError;

type Res<'a, T> = IResult<&'a [u8], T>;

pub(crate) fn parse(opcode: u8, body: &[u8]) -> Result<Message, DecodeError> {
    let result = match opcode {
        50 => new_session(body).map(|(rest, m)| (rest, Message::NewSession(m))),
        51 => new_connection(body).map(|(rest, m)| (rest, Message::NewConnection(m))),
        52 => new_connection(body).map(|(rest, m)| {
            let NewConnection {
                driver_name,
                driver_guid,
                car_id,
                car_model,
                car_skin,
            } = m;
            (
                rest,
                Message::ConnectionClosed(ConnectionClosed {
                    driver_name,
                    driver_guid,
                    car_id,
                    car_model,
                    car_skin,
                }),
            )
        }),
        54 => car_info(body).map(|(rest, m)| (rest, Message::CarInfo(m))),
        73 => lap_completed(body).map(|(rest, m)| (rest, Message::LapCompleted(m))),
        other => return Err(DecodeError::UnsupportedMessage(other)),
    };

    // Underflow anywhere before the last field is a parse error; trailing
    // bytes after the last field are always tolerated (see SPEC_FULL §4.1).
    result
        .map(|(_rest, message)| message)
        .map_err(|e| DecodeError::MessageParse(format!("{:?}", e)))
}

/// `str`: one length byte N, then N bytes of UTF-8.
fn ascii_string(input: &[u8]) -> Res<String> {
    context(
        "str",
        map_res(length_data(le_u8), |bytes: &[u8]| {
            std::str::from_utf8(bytes).map(|s| s.to_owned())
        }),
    )(input)
}

/// `wstr`: one length byte N (code points), then 4*N bytes of UTF-32LE.
fn wide_string(input: &[u8]) -> Res<String> {
    let (input, len) = le_u8(input)?;
    let (input, raw) = take(4usize * len as usize)(input)?;

    let mut out = String::with_capacity(len as usize);
    for chunk in raw.chunks_exact(4) {
        let code = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        match char::from_u32(code) {
            Some(c) => out.push(c),
            None => {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Char,
                )))
            }
        }
    }

    Ok((input, out))
}

fn new_session(input: &[u8]) -> Res<NewSession> {
    context(
        "new_session",
        tuple((
            le_u8,
            le_u8,
            le_u8,
            le_u8,
            wide_string,
            ascii_string,
            ascii_string,
            ascii_string,
            le_u8,
            le_u16,
            le_u16,
            le_u16,
            le_u8,
            le_u8,
            ascii_string,
            le_u32,
        )),
    )(input)
    .map(
        |(
            rest,
            (
                proto_version,
                session_index,
                current_session_index,
                session_count,
                server_name,
                track_name,
                track_config,
                name,
                session_type,
                time,
                laps,
                wait_time,
                ambient_temp,
                track_temp,
                weather_graph,
                elapsed_ms,
            ),
        )| {
            (
                rest,
                NewSession {
                    proto_version,
                    session_index,
                    current_session_index,
                    session_count,
                    server_name,
                    track_name,
                    track_config,
                    name,
                    session_type,
                    time,
                    laps,
                    wait_time,
                    ambient_temp,
                    track_temp,
                    weather_graph,
                    elapsed_ms,
                },
            )
        },
    )
}

fn new_connection(input: &[u8]) -> Res<NewConnection> {
    context(
        "new_connection",
        tuple((wide_string, wide_string, le_u8, ascii_string, ascii_string)),
    )(input)
    .map(
        |(rest, (driver_name, driver_guid, car_id, car_model, car_skin))| {
            (
                rest,
                NewConnection {
                    driver_name,
                    driver_guid,
                    car_id,
                    car_model,
                    car_skin,
                },
            )
        },
    )
}

fn car_info(input: &[u8]) -> Res<CarInfo> {
    context(
        "car_info",
        tuple((
            le_u8,
            le_u8,
            wide_string,
            wide_string,
            wide_string,
            wide_string,
            wide_string,
        )),
    )(input)
    .map(
        |(rest, (car_id, is_connected, model, skin, driver_name, driver_team, guid))| {
            (
                rest,
                CarInfo {
                    car_id,
                    is_connected: is_connected != 0,
                    model,
                    skin,
                    driver_name,
                    driver_team,
                    guid,
                },
            )
        },
    )
}

fn lap_completed(input: &[u8]) -> Res<LapCompleted> {
    context("lap_completed", tuple((le_u8, le_u32, le_u8)))(input).map(
        |(rest, (car_id, laptime_ms, cuts))| {
            (
                rest,
                LapCompleted {
                    car_id,
                    laptime_ms,
                    cuts,
                },
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wide_string() {
        // N=3, "abc" as UTF-32LE code points
        let mut input = vec![3u8];
        for c in "abc".chars() {
            input.extend_from_slice(&(c as u32).to_le_bytes());
        }
        input.push(0xff); // trailing byte should be left unconsumed
        let (rest, s) = wide_string(&input).unwrap();
        assert_eq!(s, "abc");
        assert_eq!(rest, &[0xff]);
    }

    #[test]
    fn empty_ascii_string() {
        let input = [0u8, 1, 2, 3];
        let (rest, s) = ascii_string(&input).unwrap();
        assert_eq!(s, "");
        assert_eq!(rest, &[1, 2, 3]);
    }

    #[test]
    fn lap_completed_underflow_is_parse_error() {
        let err = parse(73, &[]).unwrap_err();
        assert!(matches!(err, DecodeError::MessageParse(_)));
    }

    #[test]
    fn unknown_opcode_is_unsupported() {
        let err = parse(10, &[]).unwrap_err();
        assert_eq!(err, DecodeError::UnsupportedMessage(10));
    }

    #[test]
    fn lap_completed_decodes_little_endian_u32() {
        // 0x000012C1 little-endian -> 4801
        let body = [7u8, 0xC1, 0x12, 0x00, 0x00, 0u8];
        let msg = parse(73, &body).unwrap();
        match msg {
            Message::LapCompleted(lap) => {
                assert_eq!(lap.car_id, 7);
                assert_eq!(lap.laptime_ms, 4801);
                assert_eq!(lap.cuts, 0);
            }
            _ => panic!("expected LapCompleted"),
        }
    }
}
