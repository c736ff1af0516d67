//! World-state and input records exchanged between the backend and frontend
//! processes, plus the versioned binary wire codec both transports share.
//!
//! Records are encoded with an explicit little-endian layout (magic + wire
//! version + record tag), never by reinterpreting in-memory struct layout.
//! Decoding is bounds-checked at every field and fails closed: a mismatched
//! build on the other side of the pipe produces a [`WireError`], not a
//! half-applied snapshot.

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{
    input_max_wire, snapshot_max_wire, RecordTag, MAGIC, MAX_COMMAND_TEXT, MAX_ENTITIES,
    MAX_LIGHTS, MAX_MAP_NAME, MAX_RESOURCE_DATA, MAX_RESOURCE_NAME, WIRE_VERSION,
};
pub use error::{Result, WireError};
pub use types::{
    Buttons, Entity, FrameSnapshot, InputCommand, Light, PlayerState, ResourceData,
    ResourceRequest, Vec3,
};
