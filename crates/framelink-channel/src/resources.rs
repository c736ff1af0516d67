//! Resources channel: request/reply asset transfer, frontend asks, backend
//! answers.
//!
//! Strict alternation per connection: one request, one reply. The backend
//! serves one requester at a time; a second connection waits in the backlog
//! until the current one goes away.

use std::path::Path;

use bytes::BytesMut;
use tracing::{debug, warn};

use framelink_state::{ResourceData, ResourceRequest};

use crate::error::{ChannelError, Result};
use crate::framing::FrameStream;
use crate::socket::ChannelListener;

/// Backend end of the resources channel.
pub struct ResourceReplier {
    listener: ChannelListener,
    client: Option<FrameStream>,
}

impl ResourceReplier {
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            listener: ChannelListener::bind(path)?,
            client: None,
        })
    }

    /// Check for an incoming request. Never blocks.
    ///
    /// A request that fails to decode drops the connection: the requester
    /// is desynced and a silent skip would deadlock its pending reply.
    pub fn poll_request(&mut self) -> Result<Option<ResourceRequest>> {
        if self.client.is_none() {
            if let Some(stream) = self.listener.try_accept()? {
                debug!("resource requester connected");
                self.client = Some(FrameStream::new(stream)?);
            }
        }

        let Some(client) = self.client.as_mut() else {
            return Ok(None);
        };
        match client.try_recv() {
            Ok(Some(payload)) => match ResourceRequest::decode(&payload) {
                Ok(request) => Ok(Some(request)),
                Err(err) => {
                    warn!(%err, "dropping requester after undecodable request");
                    self.client = None;
                    Ok(None)
                }
            },
            Ok(None) => Ok(None),
            Err(ChannelError::Disconnected) => {
                debug!("resource requester disconnected");
                self.client = None;
                Ok(None)
            }
            Err(err) => {
                warn!(%err, "dropping requester after channel error");
                self.client = None;
                Ok(None)
            }
        }
    }

    /// Send the reply for the most recent request. Returns the encoded size.
    pub fn reply(&mut self, data: &ResourceData) -> Result<usize> {
        let Some(client) = self.client.as_mut() else {
            return Err(ChannelError::Disconnected);
        };
        let mut scratch = BytesMut::with_capacity(64 + data.data.len());
        if let Err(err) = data.encode(&mut scratch) {
            warn!(%err, id = data.id, "resource reply too large to encode");
            return Err(ChannelError::PayloadTooLarge {
                size: data.data.len(),
                max: framelink_state::MAX_RESOURCE_DATA,
            });
        }
        let len = scratch.len();
        if let Err(err) = client.send(&scratch) {
            self.client = None;
            return Err(err);
        }
        Ok(len)
    }

    /// Whether a requester is currently connected.
    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }
}

/// Frontend end of the resources channel.
pub struct ResourceRequester {
    stream: FrameStream,
    scratch: BytesMut,
}

impl ResourceRequester {
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let stream = ChannelListener::connect(path)?;
        Ok(Self {
            stream: FrameStream::new(stream)?,
            scratch: BytesMut::with_capacity(256),
        })
    }

    /// Send one request. The caller polls for the reply before sending the
    /// next; the channel carries one outstanding request at a time.
    pub fn request(&mut self, request: &ResourceRequest) -> Result<usize> {
        self.scratch.clear();
        request.encode(&mut self.scratch);
        self.stream.send(&self.scratch)?;
        Ok(self.scratch.len())
    }

    /// Check for the reply to the outstanding request. Never blocks.
    pub fn poll_reply(&mut self) -> Result<Option<ResourceData>> {
        match self.stream.try_recv()? {
            Some(payload) => match ResourceData::decode(&payload) {
                Ok(data) => Ok(Some(data)),
                Err(err) => {
                    warn!(%err, "discarding undecodable resource reply");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }
}
