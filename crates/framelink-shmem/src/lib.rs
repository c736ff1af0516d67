//! Shared-memory transport for one-slot world-state broadcast and input
//! delivery between the backend and frontend processes.
//!
//! The region carries exactly one encoded [`FrameSnapshot`] slot and one
//! encoded [`InputCommand`] slot, guarded by a sequence counter and a
//! write-in-progress flag. No kernel locking: readers never block, a slow
//! reader skips frames, and a racing reader re-checks the sequence after
//! copying and discards anything that might have been torn.
//!
//! [`FrameSnapshot`]: framelink_state::FrameSnapshot
//! [`InputCommand`]: framelink_state::InputCommand

pub mod error;
pub mod region;
pub mod transport;

pub use error::{Result, ShmError};
pub use region::MemoryRegion;
pub use transport::{RegionConfig, SharedRegion, DEFAULT_REGION_NAME};
