use framelink_state::{Entity, FrameSnapshot, Light, PlayerState};

/// The frontend's applied copy of the world.
///
/// Updated wholesale from a decoded snapshot; never partially. Between
/// applies the view keeps the previous frame, so the renderer always has a
/// coherent world even when a tick brings nothing new.
#[derive(Debug, Clone, Default)]
pub struct WorldView {
    pub frame_number: u32,
    pub timestamp: f64,
    pub player: PlayerState,
    pub paused: bool,
    pub in_game: bool,
    pub map_name: String,
    pub entities: Vec<Entity>,
    pub lights: Vec<Light>,
}

impl WorldView {
    pub(crate) fn apply(&mut self, snapshot: FrameSnapshot) {
        self.frame_number = snapshot.frame_number;
        self.timestamp = snapshot.timestamp;
        self.player = snapshot.player;
        self.paused = snapshot.paused;
        self.in_game = snapshot.in_game;
        self.map_name = snapshot.map_name;
        self.entities = snapshot.entities;
        self.lights = snapshot.lights;
    }
}

/// Read access to static assets served over the resources channel.
///
/// `None` means "not found" and travels back to the requester as a negative
/// reply; it is not an error on the serving side.
pub trait ResourceStore {
    fn fetch(&self, name: &str) -> Option<Vec<u8>>;
}
