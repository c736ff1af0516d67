use std::path::PathBuf;

/// Errors that can occur on the socket channels.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Failed to bind a listening socket.
    #[error("failed to bind {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to a listening socket.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The socket path exceeds the platform's `sun_path` limit.
    #[error("socket path too long: {path} ({len} bytes, max {max})")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// A stream frame header contains the wrong magic bytes.
    #[error("invalid stream frame magic")]
    InvalidMagic,

    /// A frame payload exceeds the configured maximum size.
    #[error("frame payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The peer stopped draining and the outbound buffer is full.
    #[error("peer not draining ({pending} bytes pending)")]
    Backpressure { pending: usize },

    /// The peer closed the connection.
    #[error("peer disconnected")]
    Disconnected,

    /// An I/O error occurred on a channel socket.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
