use bytes::{BufMut, BytesMut};
use tracing::warn;

use crate::error::{Result, WireError};
use crate::types::{
    Buttons, Entity, FrameSnapshot, InputCommand, Light, PlayerState, ResourceData,
    ResourceRequest, Vec3,
};

/// Record magic: "FL" (0x46 0x4C).
pub const MAGIC: [u8; 2] = [0x46, 0x4C];

/// Wire format version. Bumped on any layout change; decoders reject
/// records from a different version so mismatched builds fail closed.
pub const WIRE_VERSION: u8 = 1;

/// Entity array capacity per snapshot.
pub const MAX_ENTITIES: usize = 8192;

/// Dynamic light capacity per snapshot.
pub const MAX_LIGHTS: usize = 64;

/// Map name byte limit.
pub const MAX_MAP_NAME: usize = 63;

/// Console command text byte limit.
pub const MAX_COMMAND_TEXT: usize = 255;

/// Resource name byte limit.
pub const MAX_RESOURCE_NAME: usize = 255;

/// Resource blob byte limit: 16 MiB.
pub const MAX_RESOURCE_DATA: usize = 16 * 1024 * 1024;

/// Record header: magic (2) + wire version (1) + record tag (1).
const RECORD_HEADER: usize = 4;

const ENTITY_WIRE: usize = 40;
const LIGHT_WIRE: usize = 32;
const SNAPSHOT_FIXED: usize = RECORD_HEADER + 4 + 8 + 40 + 1 + 2 + 2 + 2;
const INPUT_FIXED: usize = RECORD_HEADER + 4 + 8 + 12 + 12 + 4 + 1 + 2;

/// Record tags carried in the header byte after the version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordTag {
    Snapshot = 1,
    Input = 2,
    ResourceRequest = 3,
    ResourceData = 4,
}

/// Largest possible encoded snapshot for the given capacities.
///
/// Used by the shared-memory transport to size its snapshot slot.
pub const fn snapshot_max_wire(max_entities: usize, max_lights: usize) -> usize {
    SNAPSHOT_FIXED + MAX_MAP_NAME + max_entities * ENTITY_WIRE + max_lights * LIGHT_WIRE
}

/// Largest possible encoded input command.
pub const fn input_max_wire() -> usize {
    INPUT_FIXED + MAX_COMMAND_TEXT
}

fn put_header(dst: &mut BytesMut, tag: RecordTag) {
    dst.put_slice(&MAGIC);
    dst.put_u8(WIRE_VERSION);
    dst.put_u8(tag as u8);
}

fn put_vec3(dst: &mut BytesMut, v: Vec3) {
    dst.put_f32_le(v.x);
    dst.put_f32_le(v.y);
    dst.put_f32_le(v.z);
}

/// Truncate to at most `max` bytes without splitting a UTF-8 sequence.
fn clamp_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn put_str(dst: &mut BytesMut, s: &str, max: usize, what: &'static str) {
    let clamped = clamp_str(s, max);
    if clamped.len() < s.len() {
        warn!(what, len = s.len(), max, "string clamped for encoding");
    }
    dst.put_u16_le(clamped.len() as u16);
    dst.put_slice(clamped.as_bytes());
}

impl FrameSnapshot {
    /// Encode into the versioned wire layout.
    ///
    /// Entity and light arrays beyond capacity are clamped (excess dropped),
    /// never overflowed; the map name is clamped to its byte bound.
    pub fn encode(&self, dst: &mut BytesMut) {
        let num_entities = self.entities.len().min(MAX_ENTITIES);
        if num_entities < self.entities.len() {
            warn!(
                count = self.entities.len(),
                max = MAX_ENTITIES,
                "entity array clamped for encoding"
            );
        }
        let num_lights = self.lights.len().min(MAX_LIGHTS);
        if num_lights < self.lights.len() {
            warn!(
                count = self.lights.len(),
                max = MAX_LIGHTS,
                "light array clamped for encoding"
            );
        }

        dst.reserve(snapshot_max_wire(num_entities, num_lights));
        put_header(dst, RecordTag::Snapshot);
        dst.put_u32_le(self.frame_number);
        dst.put_f64_le(self.timestamp);

        put_vec3(dst, self.player.origin);
        put_vec3(dst, self.player.angles);
        dst.put_f32_le(self.player.health);
        dst.put_f32_le(self.player.armor);
        dst.put_i32_le(self.player.weapon);
        dst.put_i32_le(self.player.ammo);

        let mut flags = 0u8;
        if self.paused {
            flags |= 1;
        }
        if self.in_game {
            flags |= 2;
        }
        dst.put_u8(flags);

        put_str(dst, &self.map_name, MAX_MAP_NAME, "map_name");
        dst.put_u16_le(num_entities as u16);
        dst.put_u16_le(num_lights as u16);

        for ent in &self.entities[..num_entities] {
            put_vec3(dst, ent.origin);
            put_vec3(dst, ent.angles);
            dst.put_u32_le(ent.model);
            dst.put_u32_le(ent.frame);
            dst.put_u32_le(ent.skin);
            dst.put_u32_le(ent.effects);
        }
        for light in &self.lights[..num_lights] {
            put_vec3(dst, light.origin);
            dst.put_f32_le(light.radius);
            dst.put_f32_le(light.decay);
            put_vec3(dst, light.color);
        }
    }

    /// Decode a complete snapshot, or fail without partial application.
    pub fn decode(src: &[u8]) -> Result<FrameSnapshot> {
        let mut r = Reader::new(src);
        r.expect_header(RecordTag::Snapshot)?;

        let frame_number = r.u32()?;
        let timestamp = r.f64()?;

        let player = PlayerState {
            origin: r.vec3()?,
            angles: r.vec3()?,
            health: r.f32()?,
            armor: r.f32()?,
            weapon: r.i32()?,
            ammo: r.i32()?,
        };

        let flags = r.u8()?;
        let map_name = r.string(MAX_MAP_NAME, "map_name")?;
        let num_entities = r.u16()? as usize;
        let num_lights = r.u16()? as usize;

        if num_entities > MAX_ENTITIES {
            return Err(WireError::CountExceedsCapacity {
                what: "entity",
                count: num_entities,
                max: MAX_ENTITIES,
            });
        }
        if num_lights > MAX_LIGHTS {
            return Err(WireError::CountExceedsCapacity {
                what: "light",
                count: num_lights,
                max: MAX_LIGHTS,
            });
        }

        let mut entities = Vec::with_capacity(num_entities);
        for _ in 0..num_entities {
            entities.push(Entity {
                origin: r.vec3()?,
                angles: r.vec3()?,
                model: r.u32()?,
                frame: r.u32()?,
                skin: r.u32()?,
                effects: r.u32()?,
            });
        }
        let mut lights = Vec::with_capacity(num_lights);
        for _ in 0..num_lights {
            lights.push(Light {
                origin: r.vec3()?,
                radius: r.f32()?,
                decay: r.f32()?,
                color: r.vec3()?,
            });
        }

        Ok(FrameSnapshot {
            frame_number,
            timestamp,
            player,
            paused: flags & 1 != 0,
            in_game: flags & 2 != 0,
            map_name,
            entities,
            lights,
        })
    }
}

impl InputCommand {
    /// Encode into the versioned wire layout.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(input_max_wire());
        put_header(dst, RecordTag::Input);
        dst.put_u32_le(self.sequence);
        dst.put_f64_le(self.timestamp);
        dst.put_f32_le(self.forward_move);
        dst.put_f32_le(self.side_move);
        dst.put_f32_le(self.up_move);
        put_vec3(dst, self.view_angles);
        dst.put_u32_le(self.buttons.0);
        dst.put_u8(self.impulse);
        put_str(dst, &self.command_text, MAX_COMMAND_TEXT, "command_text");
    }

    /// Decode a complete input command.
    pub fn decode(src: &[u8]) -> Result<InputCommand> {
        let mut r = Reader::new(src);
        r.expect_header(RecordTag::Input)?;

        Ok(InputCommand {
            sequence: r.u32()?,
            timestamp: r.f64()?,
            forward_move: r.f32()?,
            side_move: r.f32()?,
            up_move: r.f32()?,
            view_angles: r.vec3()?,
            buttons: Buttons(r.u32()?),
            impulse: r.u8()?,
            command_text: r.string(MAX_COMMAND_TEXT, "command_text")?,
        })
    }
}

impl ResourceRequest {
    pub fn encode(&self, dst: &mut BytesMut) {
        put_header(dst, RecordTag::ResourceRequest);
        dst.put_u32_le(self.id);
        put_str(dst, &self.name, MAX_RESOURCE_NAME, "resource name");
    }

    pub fn decode(src: &[u8]) -> Result<ResourceRequest> {
        let mut r = Reader::new(src);
        r.expect_header(RecordTag::ResourceRequest)?;
        Ok(ResourceRequest {
            id: r.u32()?,
            name: r.string(MAX_RESOURCE_NAME, "resource name")?,
        })
    }
}

impl ResourceData {
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        if self.data.len() > MAX_RESOURCE_DATA {
            return Err(WireError::PayloadTooLarge {
                what: "resource",
                size: self.data.len(),
                max: MAX_RESOURCE_DATA,
            });
        }
        dst.reserve(RECORD_HEADER + 4 + 1 + 4 + self.data.len());
        put_header(dst, RecordTag::ResourceData);
        dst.put_u32_le(self.id);
        dst.put_u8(self.ok as u8);
        dst.put_u32_le(self.data.len() as u32);
        dst.put_slice(&self.data);
        Ok(())
    }

    pub fn decode(src: &[u8]) -> Result<ResourceData> {
        let mut r = Reader::new(src);
        r.expect_header(RecordTag::ResourceData)?;
        let id = r.u32()?;
        let ok = r.u8()? != 0;
        let len = r.u32()? as usize;
        if len > MAX_RESOURCE_DATA {
            return Err(WireError::PayloadTooLarge {
                what: "resource",
                size: len,
                max: MAX_RESOURCE_DATA,
            });
        }
        let data = r.bytes(len)?.to_vec();
        Ok(ResourceData { id, ok, data })
    }
}

/// Bounds-checked sequential reader over a record buffer.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() < n {
            return Err(WireError::Truncated {
                needed: n - self.buf.len(),
            });
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn expect_header(&mut self, tag: RecordTag) -> Result<()> {
        let header = self.bytes(RECORD_HEADER)?;
        if header[0..2] != MAGIC {
            return Err(WireError::BadMagic);
        }
        if header[2] != WIRE_VERSION {
            return Err(WireError::UnsupportedVersion {
                found: header[2],
                expected: WIRE_VERSION,
            });
        }
        if header[3] != tag as u8 {
            return Err(WireError::UnexpectedRecord {
                expected: tag as u8,
                found: header[3],
            });
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(self.u32()? as i32)
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.u32()?))
    }

    fn f64(&mut self) -> Result<f64> {
        let b = self.bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(f64::from_le_bytes(raw))
    }

    fn vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3 {
            x: self.f32()?,
            y: self.f32()?,
            z: self.f32()?,
        })
    }

    fn string(&mut self, max: usize, what: &'static str) -> Result<String> {
        let len = self.u16()? as usize;
        if len > max {
            return Err(WireError::StringTooLong { what, len, max });
        }
        let raw = self.bytes(len)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| WireError::InvalidUtf8(what))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> FrameSnapshot {
        FrameSnapshot {
            frame_number: 42,
            timestamp: 1.25,
            player: PlayerState {
                origin: Vec3::new(16.0, -48.0, 24.0),
                angles: Vec3::new(0.0, 90.0, 0.0),
                health: 100.0,
                armor: 50.0,
                weapon: 2,
                ammo: 25,
            },
            paused: false,
            in_game: true,
            map_name: "start".to_string(),
            entities: vec![
                Entity {
                    origin: Vec3::new(1.0, 2.0, 3.0),
                    angles: Vec3::ZERO,
                    model: 7,
                    frame: 1,
                    skin: 0,
                    effects: 4,
                },
                Entity::default(),
            ],
            lights: vec![Light {
                origin: Vec3::new(0.0, 0.0, 64.0),
                radius: 200.0,
                decay: 0.5,
                color: Vec3::new(1.0, 0.8, 0.6),
            }],
        }
    }

    #[test]
    fn snapshot_roundtrip() {
        let snap = sample_snapshot();
        let mut buf = BytesMut::new();
        snap.encode(&mut buf);

        let decoded = FrameSnapshot::decode(&buf).unwrap();
        assert_eq!(decoded, snap);
    }

    #[test]
    fn input_roundtrip() {
        let input = InputCommand {
            sequence: 9,
            timestamp: 3.5,
            forward_move: 200.0,
            side_move: -100.0,
            up_move: 0.0,
            view_angles: Vec3::new(-5.0, 180.0, 0.0),
            buttons: Buttons(Buttons::ATTACK.0 | Buttons::JUMP.0),
            impulse: 9,
            command_text: "god".to_string(),
        };
        let mut buf = BytesMut::new();
        input.encode(&mut buf);

        let decoded = InputCommand::decode(&buf).unwrap();
        assert_eq!(decoded, input);
        assert!(decoded.buttons.contains(Buttons::ATTACK));
        assert!(!decoded.buttons.contains(Buttons::USE));
    }

    #[test]
    fn resource_records_roundtrip() {
        let req = ResourceRequest {
            id: 3,
            name: "maps/e1m1.bsp".to_string(),
        };
        let mut buf = BytesMut::new();
        req.encode(&mut buf);
        assert_eq!(ResourceRequest::decode(&buf).unwrap(), req);

        let data = ResourceData {
            id: 3,
            ok: true,
            data: vec![0xAB; 512],
        };
        let mut buf = BytesMut::new();
        data.encode(&mut buf).unwrap();
        assert_eq!(ResourceData::decode(&buf).unwrap(), data);
    }

    #[test]
    fn bad_magic_rejected() {
        let snap = sample_snapshot();
        let mut buf = BytesMut::new();
        snap.encode(&mut buf);
        buf[0] = 0xFF;

        assert!(matches!(
            FrameSnapshot::decode(&buf),
            Err(WireError::BadMagic)
        ));
    }

    #[test]
    fn version_mismatch_fails_closed() {
        let snap = sample_snapshot();
        let mut buf = BytesMut::new();
        snap.encode(&mut buf);
        buf[2] = WIRE_VERSION + 1;

        assert!(matches!(
            FrameSnapshot::decode(&buf),
            Err(WireError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn wrong_record_tag_rejected() {
        let input = InputCommand::default();
        let mut buf = BytesMut::new();
        input.encode(&mut buf);

        assert!(matches!(
            FrameSnapshot::decode(&buf),
            Err(WireError::UnexpectedRecord { .. })
        ));
    }

    #[test]
    fn truncation_anywhere_is_detected() {
        let snap = sample_snapshot();
        let mut buf = BytesMut::new();
        snap.encode(&mut buf);

        // Every proper prefix must fail, never panic or half-decode.
        for end in 0..buf.len() {
            assert!(FrameSnapshot::decode(&buf[..end]).is_err(), "prefix {end}");
        }
    }

    #[test]
    fn entity_count_over_capacity_rejected() {
        let snap = FrameSnapshot {
            map_name: String::new(),
            ..Default::default()
        };
        let mut buf = BytesMut::new();
        snap.encode(&mut buf);

        // Patch the entity count field: fixed part up to the count is
        // header(4) + frame(4) + ts(8) + player(40) + flags(1) + maplen(2).
        let count_at = 4 + 4 + 8 + 40 + 1 + 2;
        let bad = (MAX_ENTITIES as u16 + 1).to_le_bytes();
        buf[count_at] = bad[0];
        buf[count_at + 1] = bad[1];

        assert!(matches!(
            FrameSnapshot::decode(&buf),
            Err(WireError::CountExceedsCapacity { what: "entity", .. })
        ));
    }

    #[test]
    fn oversized_entity_array_is_clamped_on_encode() {
        let snap = FrameSnapshot {
            entities: vec![Entity::default(); MAX_ENTITIES + 16],
            ..Default::default()
        };
        let mut buf = BytesMut::new();
        snap.encode(&mut buf);

        let decoded = FrameSnapshot::decode(&buf).unwrap();
        assert_eq!(decoded.entities.len(), MAX_ENTITIES);
    }

    #[test]
    fn long_map_name_is_clamped_on_encode() {
        let snap = FrameSnapshot {
            map_name: "m".repeat(MAX_MAP_NAME + 40),
            ..Default::default()
        };
        let mut buf = BytesMut::new();
        snap.encode(&mut buf);

        let decoded = FrameSnapshot::decode(&buf).unwrap();
        assert_eq!(decoded.map_name.len(), MAX_MAP_NAME);
    }

    #[test]
    fn invalid_utf8_map_name_rejected() {
        let snap = FrameSnapshot {
            map_name: "abcd".to_string(),
            ..Default::default()
        };
        let mut buf = BytesMut::new();
        snap.encode(&mut buf);

        // Corrupt one map-name byte into an invalid UTF-8 lead byte.
        let name_at = 4 + 4 + 8 + 40 + 1 + 2;
        buf[name_at] = 0xC0;

        assert!(matches!(
            FrameSnapshot::decode(&buf),
            Err(WireError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn max_wire_sizes_bound_real_encodings() {
        let snap = FrameSnapshot {
            map_name: "m".repeat(MAX_MAP_NAME),
            entities: vec![Entity::default(); MAX_ENTITIES],
            lights: vec![Light::default(); MAX_LIGHTS],
            ..Default::default()
        };
        let mut buf = BytesMut::new();
        snap.encode(&mut buf);
        assert_eq!(buf.len(), snapshot_max_wire(MAX_ENTITIES, MAX_LIGHTS));

        let input = InputCommand {
            command_text: "x".repeat(MAX_COMMAND_TEXT),
            ..Default::default()
        };
        let mut buf = BytesMut::new();
        input.encode(&mut buf);
        assert_eq!(buf.len(), input_max_wire());
    }
}
