/// Errors that can occur while encoding or decoding wire records.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The buffer does not start with the record magic.
    #[error("bad record magic")]
    BadMagic,

    /// The record was produced by an incompatible wire version.
    #[error("unsupported wire version {found} (expected {expected})")]
    UnsupportedVersion { found: u8, expected: u8 },

    /// The record tag does not match the expected record type.
    #[error("unexpected record tag {found} (expected {expected})")]
    UnexpectedRecord { expected: u8, found: u8 },

    /// The buffer ended before the record was complete.
    #[error("truncated record: need {needed} more bytes")]
    Truncated { needed: usize },

    /// A counted array exceeds its fixed capacity.
    #[error("{what} count {count} exceeds capacity {max}")]
    CountExceedsCapacity {
        what: &'static str,
        count: usize,
        max: usize,
    },

    /// A length-prefixed string exceeds its bound.
    #[error("{what} length {len} exceeds maximum {max}")]
    StringTooLong {
        what: &'static str,
        len: usize,
        max: usize,
    },

    /// A string field is not valid UTF-8.
    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    /// A variable payload exceeds its bound.
    #[error("{what} payload {size} bytes exceeds maximum {max}")]
    PayloadTooLarge {
        what: &'static str,
        size: usize,
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, WireError>;
