//! Binary codec for the key-value log.
//!
//! Log file layout:
//! ```text
//! [magic: 4 bytes "PVKV"][version: 1 byte]
//! [frame]*
//! ```
//! Frame layout (one committed write batch):
//! ```text
//! [length: 4 bytes LE][payload: N bytes][blake3(payload): 32 bytes]
//! ```
//! Payload layout:
//! ```text
//! [op count: 4 bytes LE] ([key len: 4 bytes LE][key][value len: 4 bytes LE][value])*
//! ```

use std::io::{Error as IoError, ErrorKind, Read, Result as IoResult, Write};

/// Current log format version.
const LOG_VERSION: u8 = 1;

/// Magic bytes to identify a log file.
pub const MAGIC: [u8; 4] = *b"PVKV";

pub const HEADER_LEN: usize = MAGIC.len() + 1;

const CHECKSUM_LEN: usize = blake3::OUT_LEN;

/// Reject frames claiming more than this (64 MB)
const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// One key/value pair written by a batch
pub type Op = (Vec<u8>, Vec<u8>);

/// Write the file header (magic + version).
pub fn write_header(writer: &mut impl Write) -> IoResult<()> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&[LOG_VERSION])?;
    Ok(())
}

/// Read and validate the file header.
pub fn read_header(reader: &mut impl Read) -> IoResult<()> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("invalid magic bytes: expected {:?}, got {:?}", MAGIC, magic),
        ));
    }

    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;
    if version[0] != LOG_VERSION {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("unsupported log version: {} (expected {})", version[0], LOG_VERSION),
        ));
    }
    Ok(())
}

/// Serialize a batch into one checksummed frame.
pub fn encode_frame(ops: &[Op]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(ops.len() as u32).to_le_bytes());
    for (key, value) in ops {
        payload.extend_from_slice(&(key.len() as u32).to_le_bytes());
        payload.extend_from_slice(key);
        payload.extend_from_slice(&(value.len() as u32).to_le_bytes());
        payload.extend_from_slice(value);
    }

    let checksum = blake3::hash(&payload);
    let mut out = Vec::with_capacity(4 + payload.len() + CHECKSUM_LEN);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(checksum.as_bytes());
    out
}

/// Result of scanning the frames of a log body
#[derive(Debug, Default)]
pub struct Replay {
    pub batches: Vec<Vec<Op>>,
    /// Bytes of the body covered by intact frames
    pub valid_len: usize,
    /// The body ended in an incomplete or unverifiable frame
    pub torn: bool,
}

/// Decode every frame in `body` (the log without its header).
///
/// A damaged frame at the very end is a torn write and is reported through
/// `Replay::torn`; a damaged frame followed by more data is corruption.
pub fn read_frames(body: &[u8]) -> IoResult<Replay> {
    let mut replay = Replay::default();
    let mut pos = 0;

    while pos < body.len() {
        let rest = &body[pos..];
        if rest.len() < 4 {
            replay.torn = true;
            break;
        }
        let len = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(IoError::new(
                ErrorKind::InvalidData,
                format!("frame size {} exceeds maximum {}", len, MAX_FRAME_SIZE),
            ));
        }
        let frame_len = 4 + len + CHECKSUM_LEN;
        if rest.len() < frame_len {
            replay.torn = true;
            break;
        }

        let payload = &rest[4..4 + len];
        let stored = &rest[4 + len..frame_len];
        if blake3::hash(payload).as_bytes() != stored {
            if rest.len() == frame_len {
                replay.torn = true;
                break;
            }
            return Err(IoError::new(
                ErrorKind::InvalidData,
                format!("checksum mismatch in frame at offset {} (data corrupted)", pos),
            ));
        }

        replay.batches.push(decode_payload(payload)?);
        pos += frame_len;
        replay.valid_len = pos;
    }

    Ok(replay)
}

fn decode_payload(payload: &[u8]) -> IoResult<Vec<Op>> {
    let mut cursor = payload;
    let count = take_u32(&mut cursor)? as usize;
    let mut ops = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let key = take_bytes(&mut cursor)?;
        let value = take_bytes(&mut cursor)?;
        ops.push((key, value));
    }
    if !cursor.is_empty() {
        return Err(IoError::new(ErrorKind::InvalidData, "trailing bytes in frame payload"));
    }
    Ok(ops)
}

fn take_u32(cursor: &mut &[u8]) -> IoResult<u32> {
    let mut buf = [0u8; 4];
    cursor.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn take_bytes(cursor: &mut &[u8]) -> IoResult<Vec<u8>> {
    let len = take_u32(cursor)? as usize;
    if cursor.len() < len {
        return Err(IoError::new(ErrorKind::UnexpectedEof, "frame payload truncated"));
    }
    let (head, tail) = cursor.split_at(len);
    *cursor = tail;
    Ok(head.to_vec())
}
