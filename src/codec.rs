// src/codec.rs
//
// =============================================================================
// DURALOG: RECORD CODEC
// =============================================================================
//
// Pure functions: a user value in, a framed byte sequence out (`encode`), and
// the inverse with integrity checking (`decode`). No I/O concerns live here
// beyond the `Read` the caller hands us.
//
// Frame layout (9-byte header + payload):
//   payload_size: u32 LE
//   type_flag:    u8      (0x01 = JSON map, 0x02 = UTF-8 string)
//   checksum:     u32 LE  (CRC-32/IEEE over payload)
//   payload:      [u8; payload_size]

use std::io::Read;

use crate::error::DecodeError;

pub const HEADER_SIZE: usize = 9;
const TYPE_JSON: u8 = 0x01;
const TYPE_STRING: u8 = 0x02;

/// Sanity cap on a single frame's payload. A payload_size field mangled by
/// corruption can otherwise claim gigabytes before a single byte is read;
/// nothing well-formed this crate ever writes gets close to this.
const MAX_PAYLOAD_SIZE: u32 = 128 * 1024 * 1024;

/// A single logical record: either a structured JSON object or free text.
///
/// This is the tagged union the spec calls for at the API boundary; the
/// on-disk `type_flag` is the discriminant.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Json(serde_json::Map<String, serde_json::Value>),
    Text(String),
}

impl From<String> for Record {
    fn from(s: String) -> Self {
        Record::Text(s)
    }
}

impl From<&str> for Record {
    fn from(s: &str) -> Self {
        Record::Text(s.to_owned())
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Record {
    fn from(m: serde_json::Map<String, serde_json::Value>) -> Self {
        Record::Json(m)
    }
}

/// Serializes `record` into a framed byte sequence ready to be written to disk.
///
/// Encoding a well-formed `Record` cannot fail: the programmer-error case
/// (wrong input shape) is checked before a value becomes a `Record` at all,
/// see `DuraLog::append_value`.
pub fn encode(record: &Record) -> Vec<u8> {
    let (payload, type_flag) = match record {
        Record::Json(map) => (
            serde_json::to_vec(map).expect("Map<String, Value> always serializes"),
            TYPE_JSON,
        ),
        Record::Text(s) => (s.clone().into_bytes(), TYPE_STRING),
    };

    let checksum = crc32(&payload);
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.push(type_flag);
    frame.extend_from_slice(&checksum.to_le_bytes());
    frame.extend_from_slice(&payload);
    frame
}

/// Reads exactly one frame from the current position of `reader` and decodes
/// it into a `Record`.
///
/// On any failure the reader's position is left wherever the failed read(s)
/// advanced it to — callers that want forward progress on corruption (the
/// replay reader) rely on this rather than rewinding.
pub fn decode<R: Read>(reader: &mut R) -> Result<Record, DecodeError> {
    let mut header = [0u8; HEADER_SIZE];
    read_exact_or(reader, &mut header, DecodeError::IncompleteHeader)?;

    let payload_size = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let type_flag = header[4];
    let expected_checksum = u32::from_le_bytes([header[5], header[6], header[7], header[8]]);

    // A corrupted length field can otherwise ask for an absurd allocation
    // before we ever get to read (and reject) a single payload byte.
    if payload_size > MAX_PAYLOAD_SIZE {
        return Err(DecodeError::ImplausibleLength(payload_size));
    }

    let mut payload = vec![0u8; payload_size as usize];
    match reader.read_exact(&mut payload) {
        Ok(()) => {}
        Err(_) => {
            // We don't know exactly how many bytes actually landed once
            // `read_exact` fails partway, so report the request size.
            return Err(DecodeError::ShortPayload {
                expected: payload_size,
                actual: 0,
            });
        }
    }

    let actual_checksum = crc32(&payload);
    if actual_checksum != expected_checksum {
        return Err(DecodeError::ChecksumMismatch);
    }

    match type_flag {
        TYPE_JSON => {
            let value: serde_json::Value = serde_json::from_slice(&payload)?;
            match value {
                serde_json::Value::Object(map) => Ok(Record::Json(map)),
                _ => Err(DecodeError::InvalidJson(
                    <serde_json::Error as serde::de::Error>::custom(
                        "top-level JSON value is not an object",
                    ),
                )),
            }
        }
        TYPE_STRING => {
            let text = std::str::from_utf8(&payload)?.to_owned();
            Ok(Record::Text(text))
        }
        other => Err(DecodeError::UnknownTypeFlag(other)),
    }
}

fn read_exact_or<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    on_fail: DecodeError,
) -> Result<(), DecodeError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(on_fail),
        Err(e) => Err(DecodeError::Io(e)),
    }
}

fn crc32(payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}
