/// Three-component vector used for positions and Euler angles.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// One renderable entity. Opaque to the transport layer: the renderer
/// interprets `model`/`frame`/`skin`/`effects`, we only move them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Entity {
    pub origin: Vec3,
    pub angles: Vec3,
    pub model: u32,
    pub frame: u32,
    pub skin: u32,
    pub effects: u32,
}

/// One dynamic light.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Light {
    pub origin: Vec3,
    pub radius: f32,
    pub decay: f32,
    pub color: Vec3,
}

/// Player/view portion of a frame snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerState {
    pub origin: Vec3,
    pub angles: Vec3,
    pub health: f32,
    pub armor: f32,
    pub weapon: i32,
    pub ammo: i32,
}

/// Input button bitfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buttons(pub u32);

impl Buttons {
    pub const ATTACK: Buttons = Buttons(1 << 0);
    pub const JUMP: Buttons = Buttons(1 << 1);
    pub const USE: Buttons = Buttons(1 << 2);

    pub fn contains(self, other: Buttons) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Buttons) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Buttons) {
        self.0 &= !other.0;
    }
}

/// One simulation tick's observable world state, broadcast backend → frontend.
///
/// A snapshot is all-or-nothing: decoding either yields every field intact or
/// fails, there is no partial application.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameSnapshot {
    /// Monotonic, backend-assigned frame counter.
    pub frame_number: u32,
    pub timestamp: f64,
    pub player: PlayerState,
    pub paused: bool,
    pub in_game: bool,
    pub map_name: String,
    pub entities: Vec<Entity>,
    pub lights: Vec<Light>,
}

/// One frontend tick's contribution to the simulation, sent frontend → backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputCommand {
    pub sequence: u32,
    pub timestamp: f64,
    pub forward_move: f32,
    pub side_move: f32,
    pub up_move: f32,
    pub view_angles: Vec3,
    pub buttons: Buttons,
    pub impulse: u8,
    /// Optional console command forwarded to the backend command buffer.
    pub command_text: String,
}

/// Frontend request for a static asset, sent on the resources channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceRequest {
    pub id: u32,
    pub name: String,
}

/// Backend reply carrying an asset blob. `ok == false` means "not found";
/// the payload is opaque to this layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceData {
    pub id: u32,
    pub ok: bool,
    pub data: Vec<u8>,
}
