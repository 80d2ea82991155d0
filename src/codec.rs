//! Wire Codec - binary tagged messages and snapshot framing.
//!
//! # Layout
//!
//! All integers are big-endian; strings are a `u16` length followed by
//! UTF-8 bytes.
//!
//! | Tag    | Body |
//! |--------|------|
//! | `0x01` | Tick: key, source:u32, bid_px, ask_px, bid_qty, ask_qty (u64) |
//! | `0x02` | Trade: key, source:u32, last_px, last_size (u64) |
//! | `0x10` | SnapshotRequest: key, source:u32, max_levels:u16 |
//! | `0x11` | SnapshotResponse: u16 count + (px, qty) bids, u16 count + (px, qty) asks |
//!
//! Snapshot frames on the TCP channel are `[u32 length][payload]`.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{DecodeError, EncodeError, FramingError};
use crate::message::{DepthLevel, Message, SnapshotRequest, SnapshotResponse, Tick, Trade};

pub const TAG_TICK: u8 = 0x01;
pub const TAG_TRADE: u8 = 0x02;
pub const TAG_SNAPSHOT_REQUEST: u8 = 0x10;
pub const TAG_SNAPSHOT_RESPONSE: u8 = 0x11;

/// Largest snapshot frame accepted from a peer.
pub const MAX_FRAME_LEN: u32 = 1 << 20;

// ============================================================================
// Cursor
// ============================================================================

/// Bounds-checked big-endian reader over one message body.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, field: &'static str, n: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.buf.len() - self.pos;
        if remaining < n {
            return Err(DecodeError::Truncated {
                field,
                need: n,
                got: remaining,
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take(field, 1)?[0])
    }

    fn u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        let b = self.take(field, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(field, 4)?);
        Ok(u32::from_be_bytes(raw))
    }

    fn u64(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(field, 8)?);
        Ok(u64::from_be_bytes(raw))
    }

    fn string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let len = self.u16(field)? as usize;
        let bytes = self.take(field, len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8(field))
    }

    fn levels(&mut self, field: &'static str) -> Result<Vec<DepthLevel>, DecodeError> {
        let count = self.u16(field)? as usize;
        // Checked up front so a bogus count cannot drive a huge allocation.
        let remaining = self.buf.len() - self.pos;
        if remaining < count * 16 {
            return Err(DecodeError::Truncated {
                field,
                need: count * 16,
                got: remaining,
            });
        }
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let price = self.u64(field)?;
            let qty = self.u64(field)?;
            out.push(DepthLevel { price, qty });
        }
        Ok(out)
    }

    fn finish(self) -> Result<(), DecodeError> {
        match self.buf.len() - self.pos {
            0 => Ok(()),
            extra => Err(DecodeError::TrailingBytes(extra)),
        }
    }
}

fn put_string(out: &mut Vec<u8>, field: &'static str, s: &str) -> Result<(), EncodeError> {
    let len = u16::try_from(s.len()).map_err(|_| EncodeError::StringTooLong { field, len: s.len() })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

fn put_levels(out: &mut Vec<u8>, field: &'static str, levels: &[DepthLevel]) -> Result<(), EncodeError> {
    let count = u16::try_from(levels.len()).map_err(|_| EncodeError::TooManyLevels {
        field,
        count: levels.len(),
    })?;
    out.extend_from_slice(&count.to_be_bytes());
    for level in levels {
        out.extend_from_slice(&level.price.to_be_bytes());
        out.extend_from_slice(&level.qty.to_be_bytes());
    }
    Ok(())
}

// ============================================================================
// Stream Messages
// ============================================================================

/// Decode one stream frame.
///
/// Total: any input that is not exactly one well-formed message is an error.
pub fn decode_message(bytes: &[u8]) -> Result<Message, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let mut r = Reader::new(bytes);
    let msg = match r.u8("tag")? {
        TAG_TICK => Message::Tick(Tick {
            key: r.string("key")?,
            source: r.u32("source")?,
            bid_px: r.u64("bid_px")?,
            ask_px: r.u64("ask_px")?,
            bid_qty: r.u64("bid_qty")?,
            ask_qty: r.u64("ask_qty")?,
        }),
        TAG_TRADE => Message::Trade(Trade {
            key: r.string("key")?,
            source: r.u32("source")?,
            last_px: r.u64("last_px")?,
            last_size: r.u64("last_size")?,
        }),
        other => return Err(DecodeError::UnknownTag(other)),
    };
    r.finish()?;
    Ok(msg)
}

/// Encode one stream message. Used by producers and tests.
pub fn encode_message(msg: &Message) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(64);
    match msg {
        Message::Tick(t) => {
            out.push(TAG_TICK);
            put_string(&mut out, "key", &t.key)?;
            out.extend_from_slice(&t.source.to_be_bytes());
            out.extend_from_slice(&t.bid_px.to_be_bytes());
            out.extend_from_slice(&t.ask_px.to_be_bytes());
            out.extend_from_slice(&t.bid_qty.to_be_bytes());
            out.extend_from_slice(&t.ask_qty.to_be_bytes());
        }
        Message::Trade(t) => {
            out.push(TAG_TRADE);
            put_string(&mut out, "key", &t.key)?;
            out.extend_from_slice(&t.source.to_be_bytes());
            out.extend_from_slice(&t.last_px.to_be_bytes());
            out.extend_from_slice(&t.last_size.to_be_bytes());
        }
    }
    Ok(out)
}

// ============================================================================
// Snapshot Payloads
// ============================================================================

pub fn encode_snapshot_request(key: &str, source: u32, max_levels: u16) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(key.len() + 9);
    out.push(TAG_SNAPSHOT_REQUEST);
    put_string(&mut out, "key", key)?;
    out.extend_from_slice(&source.to_be_bytes());
    out.extend_from_slice(&max_levels.to_be_bytes());
    Ok(out)
}

pub fn decode_snapshot_request(bytes: &[u8]) -> Result<SnapshotRequest, DecodeError> {
    let mut r = Reader::new(bytes);
    expect_tag(&mut r, TAG_SNAPSHOT_REQUEST)?;
    let req = SnapshotRequest {
        key: r.string("key")?,
        source: r.u32("source")?,
        max_levels: r.u16("max_levels")?,
    };
    r.finish()?;
    Ok(req)
}

pub fn encode_snapshot_response(resp: &SnapshotResponse) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(5 + 16 * (resp.bids.len() + resp.asks.len()));
    out.push(TAG_SNAPSHOT_RESPONSE);
    put_levels(&mut out, "bids", &resp.bids)?;
    put_levels(&mut out, "asks", &resp.asks)?;
    Ok(out)
}

pub fn decode_snapshot_response(bytes: &[u8]) -> Result<SnapshotResponse, DecodeError> {
    let mut r = Reader::new(bytes);
    expect_tag(&mut r, TAG_SNAPSHOT_RESPONSE)?;
    let bids = r.levels("bids")?;
    let asks = r.levels("asks")?;
    r.finish()?;
    Ok(SnapshotResponse { bids, asks })
}

fn expect_tag(r: &mut Reader<'_>, expected: u8) -> Result<(), DecodeError> {
    if r.buf.is_empty() {
        return Err(DecodeError::Empty);
    }
    match r.u8("tag")? {
        got if got == expected => Ok(()),
        got => Err(DecodeError::UnexpectedTag { expected, got }),
    }
}

// ============================================================================
// Framing
// ============================================================================

/// Write `[u32 length][payload]` and flush.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or(FramingError::Oversized(
            payload.len().min(u32::MAX as usize) as u32,
            MAX_FRAME_LEN,
        ))?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one `[u32 length][payload]` frame.
///
/// A peer that closes before the prefix or payload is complete yields
/// [`FramingError::ShortRead`].
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, FramingError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    fill(reader, &mut prefix).await?;
    let len = u32::from_be_bytes(prefix);
    if len > MAX_FRAME_LEN {
        return Err(FramingError::Oversized(len, MAX_FRAME_LEN));
    }
    let mut payload = vec![0u8; len as usize];
    fill(reader, &mut payload).await?;
    Ok(payload)
}

async fn fill<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), FramingError>
where
    R: AsyncRead + Unpin,
{
    let mut got = 0;
    while got < buf.len() {
        let n = reader.read(&mut buf[got..]).await?;
        if n == 0 {
            return Err(FramingError::ShortRead {
                expected: buf.len(),
                got,
            });
        }
        got += n;
    }
    Ok(())
}
