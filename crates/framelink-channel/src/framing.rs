//! Stream framing for the socket channels.
//!
//! Byte streams need message boundaries back; each encoded record travels
//! inside a length-prefixed frame. The frame layer is deliberately dumb: it
//! moves opaque payloads, the record codec above it owns meaning.

use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{ChannelError, Result};

/// Frame header: magic (2) + payload length (4) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Magic bytes: "FC" (0x46 0x43). Distinct from the record magic so a
/// layering mistake fails loudly instead of half-decoding.
pub const MAGIC: [u8; 2] = [0x46, 0x43];

/// Default maximum frame payload: covers the largest resource reply with
/// headroom.
pub const DEFAULT_MAX_PAYLOAD: usize = 24 * 1024 * 1024;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Encode one frame into `dst`.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(ChannelError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Decode one frame from `src`, consuming its bytes on success.
///
/// Returns `Ok(None)` if the buffer does not yet hold a complete frame.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }
    if src[0..2] != MAGIC {
        return Err(ChannelError::InvalidMagic);
    }
    let payload_len = u32::from_le_bytes([src[2], src[3], src[4], src[5]]) as usize;
    if payload_len > max_payload {
        return Err(ChannelError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }
    if src.len() < HEADER_SIZE + payload_len {
        return Ok(None);
    }
    src.advance(HEADER_SIZE);
    Ok(Some(src.split_to(payload_len).freeze()))
}

/// A nonblocking Unix stream carrying framed messages in both directions.
///
/// `try_recv` never blocks: "no complete frame yet" is `Ok(None)`. Any
/// framing error poisons the stream; callers drop it and (depending on the
/// channel pattern) wait for a reconnect.
pub struct FrameStream {
    stream: UnixStream,
    rd: BytesMut,
    wr: BytesMut,
    max_payload: usize,
    max_pending: usize,
}

impl FrameStream {
    /// Wrap a connected stream, switching it to nonblocking mode.
    pub fn new(stream: UnixStream) -> Result<Self> {
        Self::with_max_payload(stream, DEFAULT_MAX_PAYLOAD)
    }

    pub fn with_max_payload(stream: UnixStream, max_payload: usize) -> Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream,
            rd: BytesMut::with_capacity(READ_CHUNK_SIZE),
            wr: BytesMut::new(),
            max_payload,
            max_pending: max_payload.saturating_mul(2),
        })
    }

    /// Queue one complete frame and push queued bytes to the socket.
    ///
    /// Never blocks: bytes the kernel will not take yet wait in a bounded
    /// outbound buffer and go out on the next `send` or
    /// [`flush_pending`](FrameStream::flush_pending). A peer that stops
    /// draining fills the bound and gets [`ChannelError::Backpressure`];
    /// callers drop the stream.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > self.max_payload {
            return Err(ChannelError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload,
            });
        }
        self.flush_pending()?;
        if self.wr.len() + HEADER_SIZE + payload.len() > self.max_pending {
            return Err(ChannelError::Backpressure {
                pending: self.wr.len(),
            });
        }
        encode_frame(payload, &mut self.wr)?;
        self.flush_pending()?;
        trace!(len = payload.len(), pending = self.wr.len(), "frame queued");
        Ok(())
    }

    /// Push as much of the outbound buffer as the socket will take.
    pub fn flush_pending(&mut self) -> Result<()> {
        while !self.wr.is_empty() {
            match self.stream.write(&self.wr) {
                Ok(0) => return Err(ChannelError::Disconnected),
                Ok(n) => self.wr.advance(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(err) => return Err(ChannelError::Io(err)),
            }
        }
        Ok(())
    }

    /// Bytes queued but not yet accepted by the socket.
    pub fn pending_bytes(&self) -> usize {
        self.wr.len()
    }

    /// Try to receive one complete frame without blocking.
    pub fn try_recv(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(payload) = decode_frame(&mut self.rd, self.max_payload)? {
                trace!(len = payload.len(), "frame received");
                return Ok(Some(payload));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            match self.stream.read(&mut chunk) {
                Ok(0) => return Err(ChannelError::Disconnected),
                Ok(n) => self.rd.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ChannelError::Io(err)),
            }
        }
    }
}
