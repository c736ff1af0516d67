//! Input channel: one-way command pipeline, frontend to backend.
//!
//! Push/pull semantics. Unlike the gameplay broadcast, input commands form a
//! queue: every pushed command is delivered, in order per connection, and
//! the backend drains them all each tick.

use std::path::Path;

use bytes::BytesMut;
use tracing::{debug, warn};

use framelink_state::InputCommand;

use crate::error::{ChannelError, Result};
use crate::framing::FrameStream;
use crate::socket::ChannelListener;

/// Frontend end of the input channel.
pub struct InputPusher {
    stream: FrameStream,
    scratch: BytesMut,
}

impl InputPusher {
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let stream = ChannelListener::connect(path)?;
        Ok(Self {
            stream: FrameStream::new(stream)?,
            scratch: BytesMut::with_capacity(256),
        })
    }

    /// Send one input command. Returns the encoded size.
    pub fn push(&mut self, input: &InputCommand) -> Result<usize> {
        self.scratch.clear();
        input.encode(&mut self.scratch);
        self.stream.send(&self.scratch)?;
        Ok(self.scratch.len())
    }
}

/// Backend end of the input channel.
pub struct InputPuller {
    listener: ChannelListener,
    pushers: Vec<FrameStream>,
}

impl InputPuller {
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            listener: ChannelListener::bind(path)?,
            pushers: Vec::new(),
        })
    }

    /// Take the next pending input command, if any. Never blocks.
    ///
    /// Commands from a single connection arrive in push order. A command
    /// that fails to decode is discarded with a warning and the next poll
    /// moves on; a disconnected pusher is dropped.
    pub fn try_take(&mut self) -> Result<Option<InputCommand>> {
        while let Some(stream) = self.listener.try_accept()? {
            debug!("input pusher connected");
            self.pushers.push(FrameStream::new(stream)?);
        }

        let mut index = 0;
        while index < self.pushers.len() {
            match self.pushers[index].try_recv() {
                Ok(Some(payload)) => match InputCommand::decode(&payload) {
                    Ok(input) => return Ok(Some(input)),
                    Err(err) => {
                        warn!(%err, "discarding undecodable input command");
                        continue;
                    }
                },
                Ok(None) => index += 1,
                Err(ChannelError::Disconnected) => {
                    debug!("input pusher disconnected");
                    self.pushers.swap_remove(index);
                }
                Err(err) => {
                    warn!(%err, "dropping input pusher after channel error");
                    self.pushers.swap_remove(index);
                }
            }
        }
        Ok(None)
    }

    /// Number of currently connected pushers.
    pub fn pusher_count(&self) -> usize {
        self.pushers.len()
    }
}
