/// Errors that can occur while mapping or unmapping the shared region.
#[derive(Debug, thiserror::Error)]
pub enum ShmError {
    /// Failed to create the named shared-memory object.
    #[error("failed to create shared region {name}: {source}")]
    Create {
        name: String,
        source: std::io::Error,
    },

    /// Failed to open an existing named shared-memory object.
    #[error("failed to open shared region {name}: {source}")]
    Open {
        name: String,
        source: std::io::Error,
    },

    /// Failed to size the shared-memory object.
    #[error("failed to size shared region {name}: {source}")]
    Resize {
        name: String,
        source: std::io::Error,
    },

    /// Failed to map the region into the address space.
    #[error("failed to map shared region: {0}")]
    Map(std::io::Error),

    /// The region name is not a valid shared-memory object name.
    #[error("invalid shared region name: {0}")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, ShmError>;
