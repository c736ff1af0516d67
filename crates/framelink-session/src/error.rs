/// Errors from session lifecycle operations.
///
/// Per-tick operations never produce these; they report transient outcomes
/// through booleans and `Option`. Only initialize/shutdown/mode switches can
/// fail.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The shared-memory transport failed to come up.
    #[error(transparent)]
    Shm(#[from] framelink_shmem::ShmError),

    /// The channel transport failed to come up.
    #[error(transparent)]
    Channel(#[from] framelink_channel::ChannelError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
