//! Socket message channels between the backend and frontend processes.
//!
//! Three Unix domain sockets, one per traffic pattern:
//!
//! - **resources** — request/reply asset transfer, frontend asks, backend
//!   answers ([`ResourceRequester`] / [`ResourceReplier`])
//! - **gameplay** — one-way world-state broadcast, newest frame wins
//!   ([`FramePublisher`] / [`FrameSubscriber`])
//! - **input** — one-way command pipeline, every command delivered in order
//!   ([`InputPusher`] / [`InputPuller`])
//!
//! All ends poll without blocking; "nothing yet" is a normal per-tick
//! outcome on every channel.

pub mod endpoints;
pub mod error;
pub mod framing;
pub mod gameplay;
pub mod input;
pub mod resources;
pub mod socket;

pub use endpoints::{BackendChannels, ChannelEndpoints, FrontendChannels, DEFAULT_SOCKET_DIR};
pub use error::{ChannelError, Result};
pub use framing::FrameStream;
pub use gameplay::{FramePublisher, FrameSubscriber};
pub use input::{InputPuller, InputPusher};
pub use resources::{ResourceReplier, ResourceRequester};
pub use socket::ChannelListener;
