//! Gameplay channel: one-way world-state broadcast, backend to frontend.
//!
//! Publish/subscribe semantics. The publisher never waits for subscribers;
//! each subscriber gets a bounded outbound buffer on top of the socket
//! buffer, and one that stops draining is dropped once that buffer fills.
//! Subscribers always collapse their backlog
//! to the newest frame, so a slow frontend skips frames instead of falling
//! behind.

use std::path::Path;

use bytes::BytesMut;
use tracing::{debug, warn};

use framelink_state::FrameSnapshot;

use crate::error::{ChannelError, Result};
use crate::framing::FrameStream;
use crate::socket::ChannelListener;

/// Backend end of the gameplay channel.
pub struct FramePublisher {
    listener: ChannelListener,
    subscribers: Vec<FrameStream>,
    scratch: BytesMut,
}

impl FramePublisher {
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            listener: ChannelListener::bind(path)?,
            subscribers: Vec::new(),
            scratch: BytesMut::with_capacity(1024),
        })
    }

    /// Broadcast one snapshot to every connected subscriber.
    ///
    /// Pending connections are accepted first, so a subscriber that arrives
    /// between ticks sees the very next frame. Subscribers whose socket
    /// errors are dropped. Returns the encoded size.
    pub fn publish(&mut self, snapshot: &FrameSnapshot) -> Result<usize> {
        self.accept_pending()?;

        self.scratch.clear();
        snapshot.encode(&mut self.scratch);
        let payload = self.scratch.split().freeze();

        self.subscribers.retain_mut(|sub| match sub.send(&payload) {
            Ok(()) => true,
            Err(err) => {
                debug!(%err, "dropping gameplay subscriber");
                false
            }
        });
        Ok(payload.len())
    }

    /// Number of currently connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Accept any connections waiting in the listener backlog.
    pub fn accept_pending(&mut self) -> Result<usize> {
        let mut accepted = 0;
        while let Some(stream) = self.listener.try_accept()? {
            self.subscribers.push(FrameStream::new(stream)?);
            accepted += 1;
        }
        Ok(accepted)
    }
}

/// Frontend end of the gameplay channel.
pub struct FrameSubscriber {
    stream: FrameStream,
}

impl FrameSubscriber {
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let stream = ChannelListener::connect(path)?;
        Ok(Self {
            stream: FrameStream::new(stream)?,
        })
    }

    /// Drain everything buffered and return the newest decodable snapshot.
    ///
    /// `Ok(None)` means no new frame this tick. Frames that fail to decode
    /// are discarded whole with a warning; older frames superseded within
    /// one call are skipped silently.
    pub fn try_receive(&mut self) -> Result<Option<FrameSnapshot>> {
        let mut latest = None;
        loop {
            match self.stream.try_recv() {
                Ok(Some(payload)) => match FrameSnapshot::decode(&payload) {
                    Ok(snapshot) => latest = Some(snapshot),
                    Err(err) => warn!(%err, "discarding undecodable snapshot frame"),
                },
                Ok(None) => return Ok(latest),
                // Report the backlog we already drained before the error.
                Err(ChannelError::Disconnected) if latest.is_some() => return Ok(latest),
                Err(err) => return Err(err),
            }
        }
    }
}
