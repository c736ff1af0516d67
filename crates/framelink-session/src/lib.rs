//! Transport session for the process-split engine.
//!
//! A [`Session`] owns one side's transport (shared region or socket
//! channels), exposes the same per-tick API over either, and tracks
//! broadcast performance. [`SessionExtension`] adapts a shared session to
//! the host's [`Extension`] hooks so the main loop never branches on
//! transport or role itself.
//!
//! [`Extension`]: framelink_hooks::Extension

pub mod config;
pub mod error;
pub mod extension;
pub mod session;
pub mod stats;
pub mod view;

pub use config::{Role, SessionConfig, TransportKind};
pub use error::{Result, SessionError};
pub use extension::SessionExtension;
pub use session::Session;
pub use stats::Stats;
pub use view::{ResourceStore, WorldView};
