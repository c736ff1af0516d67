use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use tracing::warn;

use framelink_state::{
    input_max_wire, snapshot_max_wire, FrameSnapshot, InputCommand, MAX_ENTITIES, MAX_LIGHTS,
};

use crate::error::Result;
use crate::region::MemoryRegion;

/// Well-known name of the engine's shared region.
pub const DEFAULT_REGION_NAME: &str = "/framelink-world";

// Control-word offsets. The layout is a contract between builds: fixed byte
// offsets, never compiler struct layout.
const SEQ: usize = 0;
const FLAG: usize = 4;
const SNAP_LEN: usize = 8;
const SNAP: usize = 12;

/// Shared-region sizing and naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionConfig {
    /// POSIX shared-memory object name.
    pub name: String,
    /// Entity capacity of the snapshot slot.
    pub max_entities: usize,
    /// Light capacity of the snapshot slot.
    pub max_lights: usize,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_REGION_NAME.to_string(),
            max_entities: MAX_ENTITIES,
            max_lights: MAX_LIGHTS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RegionLayout {
    snap_slot: usize,
    input_ready: usize,
    input_len: usize,
    input: usize,
    total: usize,
}

impl RegionLayout {
    fn for_config(config: &RegionConfig) -> Self {
        let snap_slot = snapshot_max_wire(config.max_entities, config.max_lights);
        // Keep the input control word 4-aligned.
        let input_ready = (SNAP + snap_slot + 3) & !3;
        let input_len = input_ready + 4;
        let input = input_ready + 8;
        Self {
            snap_slot,
            input_ready,
            input_len,
            input,
            total: input + input_max_wire(),
        }
    }
}

/// One mapped shared region plus the per-process protocol state.
///
/// The backend constructs with [`SharedRegion::create`] and calls
/// [`publish`](SharedRegion::publish) / [`try_take_input`](SharedRegion::try_take_input);
/// the frontend constructs with [`SharedRegion::open`] and calls
/// [`try_receive`](SharedRegion::try_receive) / [`send_input`](SharedRegion::send_input).
/// Nothing here blocks: "no new data" is a normal per-tick outcome.
pub struct SharedRegion {
    region: Arc<MemoryRegion>,
    layout: RegionLayout,
    config: RegionConfig,
    scratch: BytesMut,
    incoming: Vec<u8>,
    last_seen: u32,
}

impl SharedRegion {
    /// Create the region fresh (backend side). Any stale object left by a
    /// previous run is unlinked first.
    pub fn create(config: RegionConfig) -> Result<Self> {
        let config = clamp_config(config);
        let layout = RegionLayout::for_config(&config);
        let region = MemoryRegion::create(&config.name, layout.total)?;
        Ok(Self::from_region(Arc::new(region), layout, config))
    }

    /// Map the backend's region (frontend side).
    pub fn open(config: RegionConfig) -> Result<Self> {
        let config = clamp_config(config);
        let layout = RegionLayout::for_config(&config);
        let region = MemoryRegion::open(&config.name, layout.total)?;
        Ok(Self::from_region(Arc::new(region), layout, config))
    }

    /// Two endpoints over one anonymous mapping, for exercising the
    /// protocol across threads without touching `/dev/shm`.
    pub fn anonymous_pair(config: RegionConfig) -> Result<(Self, Self)> {
        let config = clamp_config(config);
        let layout = RegionLayout::for_config(&config);
        let region = Arc::new(MemoryRegion::anonymous(layout.total)?);
        let a = Self::from_region(Arc::clone(&region), layout, config.clone());
        let b = Self::from_region(region, layout, config);
        Ok((a, b))
    }

    fn from_region(region: Arc<MemoryRegion>, layout: RegionLayout, config: RegionConfig) -> Self {
        Self {
            region,
            layout,
            config,
            scratch: BytesMut::with_capacity(1024),
            incoming: Vec::new(),
            last_seen: 0,
        }
    }

    /// Total mapped size in bytes.
    pub fn size(&self) -> usize {
        self.layout.total
    }

    /// Current value of the frame sequence counter.
    pub fn sequence(&self) -> u32 {
        self.word(SEQ).load(Ordering::Acquire)
    }

    /// Publish one snapshot (backend).
    ///
    /// Write protocol: raise the write-in-progress flag, overwrite the slot,
    /// bump the sequence, drop the flag. Entity/light arrays beyond the
    /// region's configured capacity are clamped. Returns the encoded size.
    pub fn publish(&mut self, snapshot: &FrameSnapshot) -> usize {
        self.scratch.clear();
        if snapshot.entities.len() > self.config.max_entities
            || snapshot.lights.len() > self.config.max_lights
        {
            warn!(
                entities = snapshot.entities.len(),
                lights = snapshot.lights.len(),
                max_entities = self.config.max_entities,
                max_lights = self.config.max_lights,
                "snapshot clamped to region capacity"
            );
            let mut clamped = snapshot.clone();
            clamped.entities.truncate(self.config.max_entities);
            clamped.lights.truncate(self.config.max_lights);
            clamped.encode(&mut self.scratch);
        } else {
            snapshot.encode(&mut self.scratch);
        }
        let len = self.scratch.len();
        debug_assert!(len <= self.layout.snap_slot);

        self.word(FLAG).store(1, Ordering::Release);
        // SAFETY: SNAP + len stays within the mapping (slot sized for the
        // maximum encoding); the flag is up, so protocol-following readers
        // will not consume these bytes mid-copy.
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.scratch.as_ptr(),
                self.region.as_ptr().add(SNAP),
                len,
            );
        }
        self.word(SNAP_LEN).store(len as u32, Ordering::Release);
        let next = self.word(SEQ).load(Ordering::Relaxed).wrapping_add(1);
        self.word(SEQ).store(next, Ordering::Release);
        self.word(FLAG).store(0, Ordering::Release);
        len
    }

    /// Try to consume a new snapshot (frontend). Never blocks.
    ///
    /// Returns `None` when a write is in progress, when the sequence has not
    /// advanced since the last successful read, when a concurrent write
    /// tore the copy twice in a row, or when the slot fails to decode (the
    /// frame is then discarded whole).
    pub fn try_receive(&mut self) -> Option<FrameSnapshot> {
        if self.word(FLAG).load(Ordering::Acquire) != 0 {
            return None;
        }
        let seq = self.word(SEQ).load(Ordering::Acquire);
        if seq == self.last_seen {
            return None;
        }

        // Optimistic copy with one discard-and-retry if the writer raced us.
        for _ in 0..2 {
            let len = self.word(SNAP_LEN).load(Ordering::Acquire) as usize;
            if len > self.layout.snap_slot {
                continue;
            }
            self.incoming.resize(len, 0);
            // SAFETY: SNAP + len is within the mapping per the check above.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    self.region.as_ptr().add(SNAP),
                    self.incoming.as_mut_ptr(),
                    len,
                );
            }
            if self.word(FLAG).load(Ordering::Acquire) != 0
                || self.word(SEQ).load(Ordering::Acquire) != seq
            {
                continue;
            }

            self.last_seen = seq;
            return match FrameSnapshot::decode(&self.incoming) {
                Ok(snapshot) => Some(snapshot),
                Err(err) => {
                    warn!(%err, "discarding undecodable snapshot");
                    None
                }
            };
        }
        None
    }

    /// Send one input command (frontend). A previous unread command is
    /// overwritten: last writer wins, there is no queue in this transport.
    /// Returns the encoded size.
    pub fn send_input(&mut self, input: &InputCommand) -> usize {
        self.scratch.clear();
        input.encode(&mut self.scratch);
        let len = self.scratch.len();
        debug_assert!(len <= input_max_wire());

        // SAFETY: input slot is sized for the maximum input encoding.
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.scratch.as_ptr(),
                self.region.as_ptr().add(self.layout.input),
                len,
            );
        }
        self.word(self.layout.input_len)
            .store(len as u32, Ordering::Release);
        self.word(self.layout.input_ready)
            .store(1, Ordering::Release);
        len
    }

    /// Whether an unconsumed input command is waiting (backend).
    pub fn has_pending_input(&self) -> bool {
        self.word(self.layout.input_ready).load(Ordering::Acquire) != 0
    }

    /// Consume the pending input command, if any (backend). Clears the
    /// ready flag after copying, so the next frontend write is seen fresh.
    pub fn try_take_input(&mut self) -> Option<InputCommand> {
        if !self.has_pending_input() {
            return None;
        }
        let len = self.word(self.layout.input_len).load(Ordering::Acquire) as usize;
        if len > input_max_wire() {
            self.word(self.layout.input_ready)
                .store(0, Ordering::Release);
            warn!(len, "discarding oversized input slot");
            return None;
        }
        self.incoming.resize(len, 0);
        // SAFETY: input + len is within the mapping per the check above.
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.region.as_ptr().add(self.layout.input),
                self.incoming.as_mut_ptr(),
                len,
            );
        }
        self.word(self.layout.input_ready)
            .store(0, Ordering::Release);

        match InputCommand::decode(&self.incoming) {
            Ok(input) => Some(input),
            Err(err) => {
                warn!(%err, "discarding undecodable input command");
                None
            }
        }
    }

    fn word(&self, offset: usize) -> &AtomicU32 {
        debug_assert!(offset % 4 == 0 && offset + 4 <= self.region.len());
        // SAFETY: offset is in bounds and 4-aligned (mmap returns page-aligned
        // memory); the mapping outlives self, and concurrent access goes
        // through atomic operations only.
        unsafe { &*(self.region.as_ptr().add(offset) as *const AtomicU32) }
    }
}

fn clamp_config(mut config: RegionConfig) -> RegionConfig {
    if config.max_entities > MAX_ENTITIES {
        warn!(
            requested = config.max_entities,
            max = MAX_ENTITIES,
            "region entity capacity clamped"
        );
        config.max_entities = MAX_ENTITIES;
    }
    if config.max_lights > MAX_LIGHTS {
        warn!(
            requested = config.max_lights,
            max = MAX_LIGHTS,
            "region light capacity clamped"
        );
        config.max_lights = MAX_LIGHTS;
    }
    config
}
