use std::time::Instant;

use tracing::{debug, info, warn};

use framelink_channel::{BackendChannels, FrontendChannels};
use framelink_shmem::SharedRegion;
use framelink_state::{FrameSnapshot, InputCommand, ResourceData, ResourceRequest};

use crate::config::{Role, SessionConfig, TransportKind};
use crate::error::Result;
use crate::stats::Stats;
use crate::view::{ResourceStore, WorldView};

enum ActiveTransport {
    RegionBackend(SharedRegion),
    RegionFrontend(SharedRegion),
    ChannelBackend(BackendChannels),
    ChannelFrontend(FrontendChannels),
}

/// One process's end of the backend/frontend split.
///
/// The host owns the session directly; there is no global instance. Lifecycle
/// operations (initialize, shutdown, role and transport switches) return
/// `Result`; per-tick operations report transient outcomes as booleans and
/// `Option` and degrade to no-ops whenever the session is disabled,
/// uninitialized, or asked for the wrong role's operation.
pub struct Session {
    config: SessionConfig,
    transport: Option<ActiveTransport>,
    staged: Option<FrameSnapshot>,
    pending_snapshot: Option<FrameSnapshot>,
    current_input: Option<InputCommand>,
    unprocessed_input: bool,
    pending_commands: Vec<String>,
    view: WorldView,
    stats: Stats,
    // Fault latches: a persistent channel failure is logged once, not every
    // tick. Cleared by successful traffic and by shutdown.
    gameplay_fault: bool,
    input_fault: bool,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            transport: None,
            staged: None,
            pending_snapshot: None,
            current_input: None,
            unprocessed_input: false,
            pending_commands: Vec::new(),
            view: WorldView::default(),
            stats: Stats::default(),
            gameplay_fault: false,
            input_fault: false,
        }
    }

    /// Bring the configured transport up. Re-initializing tears the old
    /// transport down first; a disabled role initializes to nothing.
    pub fn initialize(&mut self) -> Result<()> {
        self.shutdown();

        if !self.config.role.is_enabled() {
            debug!("session disabled, no transport");
            return Ok(());
        }

        let transport = match (self.config.transport, self.config.role.is_backend()) {
            (TransportKind::SharedRegion, true) => {
                ActiveTransport::RegionBackend(SharedRegion::create(self.config.region.clone())?)
            }
            (TransportKind::SharedRegion, false) => {
                ActiveTransport::RegionFrontend(SharedRegion::open(self.config.region.clone())?)
            }
            (TransportKind::Channel, true) => {
                ActiveTransport::ChannelBackend(BackendChannels::bind(&self.config.endpoints)?)
            }
            (TransportKind::Channel, false) => {
                ActiveTransport::ChannelFrontend(FrontendChannels::connect(&self.config.endpoints)?)
            }
        };
        self.transport = Some(transport);
        info!(
            role = %self.config.role,
            transport = %self.config.transport,
            "session initialized"
        );
        Ok(())
    }

    /// Tear the transport down and drop all per-tick state. Idempotent.
    pub fn shutdown(&mut self) {
        if self.transport.take().is_some() {
            info!(role = %self.config.role, "session shut down");
        }
        self.staged = None;
        self.pending_snapshot = None;
        self.current_input = None;
        self.unprocessed_input = false;
        self.pending_commands.clear();
        self.gameplay_fault = false;
        self.input_fault = false;
    }

    /// Switch role. A changed role always goes through full shutdown and
    /// re-initialization; the transport is never mutated in place.
    pub fn set_role(&mut self, role: Role) -> Result<()> {
        if role == self.config.role {
            return Ok(());
        }
        info!(from = %self.config.role, to = %role, "switching session role");
        self.shutdown();
        self.config.role = role;
        self.initialize()
    }

    /// Switch transport kind, with the same teardown-and-recreate contract
    /// as [`set_role`](Session::set_role).
    pub fn set_transport(&mut self, transport: TransportKind) -> Result<()> {
        if transport == self.config.transport {
            return Ok(());
        }
        info!(
            from = %self.config.transport,
            to = %transport,
            "switching session transport"
        );
        self.shutdown();
        self.config.transport = transport;
        self.initialize()
    }

    pub fn role(&self) -> Role {
        self.config.role
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.config.transport
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_backend(&self) -> bool {
        self.config.role.is_backend()
    }

    pub fn is_frontend(&self) -> bool {
        self.config.role.is_frontend()
    }

    pub fn is_headless(&self) -> bool {
        self.config.headless
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Backend per-tick operations
    // ------------------------------------------------------------------

    /// Broadcast one snapshot over the active transport.
    ///
    /// Returns false when the session is not an initialized backend or the
    /// transport rejected the frame. Broadcast timing feeds [`Stats`].
    pub fn broadcast_world_state(&mut self, snapshot: &FrameSnapshot) -> bool {
        if !self.config.role.is_backend() {
            return false;
        }
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };

        let start = Instant::now();
        let bytes = match transport {
            ActiveTransport::RegionBackend(region) => region.publish(snapshot),
            ActiveTransport::ChannelBackend(channels) => {
                match channels.gameplay.publish(snapshot) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(%err, "snapshot broadcast failed");
                        return false;
                    }
                }
            }
            _ => return false,
        };
        let frame_time = start.elapsed().as_secs_f64();
        self.stats
            .record_broadcast(frame_time, snapshot.entities.len(), bytes);
        true
    }

    /// Stage a snapshot for the next broadcast hook. The host builds the
    /// snapshot after its server frame; the hook adapter publishes it at the
    /// broadcast point without another copy through the host.
    pub fn stage_snapshot(&mut self, snapshot: FrameSnapshot) {
        self.staged = Some(snapshot);
    }

    /// Broadcast the staged snapshot, if one is staged.
    pub fn broadcast_staged(&mut self) -> bool {
        match self.staged.take() {
            Some(snapshot) => self.broadcast_world_state(&snapshot),
            None => false,
        }
    }

    /// Whether input has arrived and not yet been taken.
    ///
    /// Polls the transport, but consumes nothing observable: anything drained
    /// here is parked on the session and still reported by the next
    /// [`process_input_commands`](Session::process_input_commands) call, so
    /// the answer means the same thing on both transports.
    pub fn has_pending_input(&mut self) -> bool {
        self.drain_transport_input();
        self.current_input.is_some()
    }

    /// Drain all input that arrived since the last call.
    ///
    /// The newest command becomes the current input (movement state is
    /// sampled, not queued); console command text from every drained command
    /// is collected in order for [`drain_command_text`](Session::drain_command_text).
    pub fn process_input_commands(&mut self) -> bool {
        self.drain_transport_input();
        std::mem::take(&mut self.unprocessed_input)
    }

    fn drain_transport_input(&mut self) {
        match self.transport.as_mut() {
            Some(ActiveTransport::RegionBackend(region)) => {
                while let Some(input) = region.try_take_input() {
                    if !input.command_text.is_empty() {
                        self.pending_commands.push(input.command_text.clone());
                    }
                    self.current_input = Some(input);
                    self.unprocessed_input = true;
                }
            }
            Some(ActiveTransport::ChannelBackend(channels)) => loop {
                match channels.input.try_take() {
                    Ok(Some(input)) => {
                        if !input.command_text.is_empty() {
                            self.pending_commands.push(input.command_text.clone());
                        }
                        self.current_input = Some(input);
                        self.unprocessed_input = true;
                        self.input_fault = false;
                    }
                    Ok(None) => break,
                    Err(err) => {
                        if !self.input_fault {
                            warn!(%err, "input channel error");
                            self.input_fault = true;
                        }
                        break;
                    }
                }
            },
            _ => {}
        }
    }

    /// The most recent input command, if not yet taken.
    pub fn current_input(&self) -> Option<&InputCommand> {
        self.current_input.as_ref()
    }

    /// Take the most recent input command for this simulation frame.
    pub fn take_current_input(&mut self) -> Option<InputCommand> {
        self.current_input.take()
    }

    /// Console commands forwarded from the frontend, in arrival order.
    pub fn drain_command_text(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_commands)
    }

    /// Answer at most one pending resource request from `store`.
    ///
    /// Only meaningful on the channel transport; the shared region carries
    /// no resource traffic. Returns true when a request was answered.
    pub fn serve_resources(&mut self, store: &dyn ResourceStore) -> bool {
        let Some(ActiveTransport::ChannelBackend(channels)) = self.transport.as_mut() else {
            return false;
        };
        match channels.resources.poll_request() {
            Ok(Some(request)) => {
                let data = store.fetch(&request.name);
                let ok = data.is_some();
                if !ok {
                    debug!(name = %request.name, "resource not found");
                }
                let reply = ResourceData {
                    id: request.id,
                    ok,
                    data: data.unwrap_or_default(),
                };
                if let Err(err) = channels.resources.reply(&reply) {
                    warn!(%err, "resource reply failed");
                }
                true
            }
            Ok(None) => false,
            Err(err) => {
                warn!(%err, "resources channel error");
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Frontend per-tick operations
    // ------------------------------------------------------------------

    /// Check the transport for new world state. Returns true when a snapshot
    /// is waiting to be applied.
    pub fn receive_world_state(&mut self) -> bool {
        if !self.config.role.is_frontend() {
            return false;
        }
        match self.transport.as_mut() {
            Some(ActiveTransport::RegionFrontend(region)) => {
                if let Some(snapshot) = region.try_receive() {
                    self.pending_snapshot = Some(snapshot);
                }
            }
            Some(ActiveTransport::ChannelFrontend(channels)) => {
                match channels.gameplay.try_receive() {
                    Ok(Some(snapshot)) => {
                        self.pending_snapshot = Some(snapshot);
                        self.gameplay_fault = false;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        if !self.gameplay_fault {
                            warn!(%err, "gameplay channel error");
                            self.gameplay_fault = true;
                        }
                    }
                }
            }
            _ => {}
        }
        self.pending_snapshot.is_some()
    }

    /// Apply the received snapshot to the owned [`WorldView`]. Returns false
    /// when there is nothing to apply.
    pub fn apply_received_state(&mut self) -> bool {
        match self.pending_snapshot.take() {
            Some(snapshot) => {
                self.view.apply(snapshot);
                true
            }
            None => false,
        }
    }

    /// The frontend's applied world.
    pub fn view(&self) -> &WorldView {
        &self.view
    }

    /// Send one input command to the backend.
    pub fn send_input(&mut self, input: &InputCommand) -> bool {
        if !self.config.role.is_frontend() {
            return false;
        }
        match self.transport.as_mut() {
            Some(ActiveTransport::RegionFrontend(region)) => {
                region.send_input(input);
                true
            }
            Some(ActiveTransport::ChannelFrontend(channels)) => {
                match channels.input.push(input) {
                    Ok(_) => {
                        self.input_fault = false;
                        true
                    }
                    Err(err) => {
                        if !self.input_fault {
                            warn!(%err, "input send failed");
                            self.input_fault = true;
                        }
                        false
                    }
                }
            }
            _ => false,
        }
    }

    /// Ask the backend for a resource. One request may be outstanding at a
    /// time; poll with [`poll_resource`](Session::poll_resource).
    pub fn request_resource(&mut self, id: u32, name: &str) -> bool {
        let Some(ActiveTransport::ChannelFrontend(channels)) = self.transport.as_mut() else {
            return false;
        };
        let request = ResourceRequest {
            id,
            name: name.to_string(),
        };
        match channels.resources.request(&request) {
            Ok(_) => true,
            Err(err) => {
                warn!(%err, "resource request failed");
                false
            }
        }
    }

    /// Check for the reply to the outstanding resource request.
    pub fn poll_resource(&mut self) -> Option<ResourceData> {
        let Some(ActiveTransport::ChannelFrontend(channels)) = self.transport.as_mut() else {
            return None;
        };
        match channels.resources.poll_reply() {
            Ok(reply) => reply,
            Err(err) => {
                warn!(%err, "resource poll failed");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::{Duration, Instant};

    use framelink_channel::ChannelEndpoints;
    use framelink_shmem::RegionConfig;
    use framelink_state::{Buttons, PlayerState, Vec3};

    use super::*;

    fn unique_region(tag: &str) -> RegionConfig {
        RegionConfig {
            name: format!(
                "/framelink-session-{tag}-{}-{}",
                std::process::id(),
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap()
                    .as_nanos()
            ),
            max_entities: 64,
            max_lights: 8,
        }
    }

    fn unique_endpoints(tag: &str) -> ChannelEndpoints {
        let dir = std::env::temp_dir().join(format!(
            "framelink-session-{tag}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        ChannelEndpoints::in_dir(dir)
    }

    fn snapshot(frame: u32, health: f32) -> FrameSnapshot {
        FrameSnapshot {
            frame_number: frame,
            timestamp: frame as f64 / 72.0,
            player: PlayerState {
                health,
                ..Default::default()
            },
            in_game: true,
            map_name: "e1m1".to_string(),
            ..Default::default()
        }
    }

    fn impulse_input(sequence: u32, impulse: u8) -> InputCommand {
        InputCommand {
            sequence,
            impulse,
            buttons: Buttons::ATTACK,
            view_angles: Vec3::new(-5.0, 90.0, 0.0),
            forward_move: 200.0,
            ..Default::default()
        }
    }

    fn shmem_pair(tag: &str) -> (Session, Session) {
        let region = unique_region(tag);
        let mut backend = Session::new(
            SessionConfig::new(Role::Backend)
                .with_transport(TransportKind::SharedRegion)
                .with_region(region.clone()),
        );
        backend.initialize().unwrap();
        let mut frontend = Session::new(
            SessionConfig::new(Role::Frontend)
                .with_transport(TransportKind::SharedRegion)
                .with_region(region),
        );
        frontend.initialize().unwrap();
        (backend, frontend)
    }

    #[test]
    fn snapshot_roundtrip_over_shared_region() {
        let (mut backend, mut frontend) = shmem_pair("snap");

        assert!(backend.broadcast_world_state(&snapshot(1, 100.0)));
        assert!(frontend.receive_world_state());
        assert!(frontend.apply_received_state());

        let view = frontend.view();
        assert_eq!(view.frame_number, 1);
        assert_eq!(view.player.health, 100.0);
        assert_eq!(view.map_name, "e1m1");
        assert!(view.in_game);

        // Nothing new: receive reports false, view keeps the last frame.
        assert!(!frontend.receive_world_state());
        assert!(!frontend.apply_received_state());
        assert_eq!(frontend.view().frame_number, 1);
    }

    #[test]
    fn input_roundtrip_over_shared_region() {
        let (mut backend, mut frontend) = shmem_pair("input");

        assert!(frontend.send_input(&impulse_input(1, 9)));
        assert!(backend.has_pending_input());
        assert!(backend.process_input_commands());

        let input = backend.take_current_input().expect("input expected");
        assert_eq!(input.impulse, 9);
        assert!(input.buttons.contains(Buttons::ATTACK));
        assert!(!backend.has_pending_input());
        assert!(backend.take_current_input().is_none());
    }

    #[test]
    fn snapshot_roundtrip_over_channels() {
        let endpoints = unique_endpoints("snap");
        let mut backend = Session::new(
            SessionConfig::new(Role::Backend).with_endpoints(endpoints.clone()),
        );
        backend.initialize().unwrap();
        let mut frontend = Session::new(
            SessionConfig::new(Role::Frontend).with_endpoints(endpoints),
        );
        frontend.initialize().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut received = false;
        let mut frame = 0u32;
        while !received && Instant::now() < deadline {
            frame += 1;
            assert!(backend.broadcast_world_state(&snapshot(frame, 100.0)));
            received = frontend.receive_world_state();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(received, "frontend never received a snapshot");
        assert!(frontend.apply_received_state());
        assert_eq!(frontend.view().player.health, 100.0);
    }

    #[test]
    fn input_and_command_text_over_channels() {
        let endpoints = unique_endpoints("input");
        let mut backend = Session::new(
            SessionConfig::new(Role::Backend).with_endpoints(endpoints.clone()),
        );
        backend.initialize().unwrap();
        let mut frontend = Session::new(
            SessionConfig::new(Role::Frontend).with_endpoints(endpoints),
        );
        frontend.initialize().unwrap();

        let mut with_text = impulse_input(1, 9);
        with_text.command_text = "god".to_string();
        assert!(frontend.send_input(&with_text));
        assert!(frontend.send_input(&impulse_input(2, 0)));

        let deadline = Instant::now() + Duration::from_secs(2);
        while !backend.process_input_commands() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        // Both commands may arrive in one drain or two; wait for the second.
        let deadline = Instant::now() + Duration::from_secs(2);
        while backend.current_input().map(|i| i.sequence) != Some(2)
            && Instant::now() < deadline
        {
            backend.process_input_commands();
            std::thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(backend.take_current_input().unwrap().sequence, 2);
        assert_eq!(backend.drain_command_text(), vec!["god"]);
        assert!(backend.drain_command_text().is_empty());
    }

    #[test]
    fn pending_input_is_visible_before_processing_over_channels() {
        let endpoints = unique_endpoints("peek");
        let mut backend = Session::new(
            SessionConfig::new(Role::Backend).with_endpoints(endpoints.clone()),
        );
        backend.initialize().unwrap();
        let mut frontend = Session::new(
            SessionConfig::new(Role::Frontend).with_endpoints(endpoints),
        );
        frontend.initialize().unwrap();

        assert!(!backend.has_pending_input());
        assert!(frontend.send_input(&impulse_input(1, 9)));

        let deadline = Instant::now() + Duration::from_secs(2);
        while !backend.has_pending_input() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(backend.has_pending_input(), "input never became visible");

        // The check consumed nothing: processing still reports the arrival.
        assert!(backend.process_input_commands());
        assert_eq!(backend.take_current_input().unwrap().impulse, 9);
        assert!(!backend.has_pending_input());
    }

    #[test]
    fn lost_publisher_keeps_the_frontend_ticking() {
        let endpoints = unique_endpoints("lost");
        let mut backend = Session::new(
            SessionConfig::new(Role::Backend).with_endpoints(endpoints.clone()),
        );
        backend.initialize().unwrap();
        let mut frontend = Session::new(
            SessionConfig::new(Role::Frontend).with_endpoints(endpoints),
        );
        frontend.initialize().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut received = false;
        let mut frame = 0u32;
        while !received && Instant::now() < deadline {
            frame += 1;
            assert!(backend.broadcast_world_state(&snapshot(frame, 100.0)));
            received = frontend.receive_world_state();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(received, "frontend never received a snapshot");
        assert!(frontend.apply_received_state());

        backend.shutdown();
        // Drain whatever was still buffered, then the dead channel becomes a
        // quiet per-tick no-op instead of an error storm.
        let deadline = Instant::now() + Duration::from_secs(2);
        while frontend.receive_world_state() && Instant::now() < deadline {
            frontend.apply_received_state();
            std::thread::sleep(Duration::from_millis(1));
        }
        for _ in 0..50 {
            assert!(!frontend.receive_world_state());
        }
        assert!(frontend.gameplay_fault, "fault should be latched");

        frontend.shutdown();
        assert!(!frontend.gameplay_fault, "shutdown clears the latch");
    }

    struct MapStore(HashMap<String, Vec<u8>>);

    impl ResourceStore for MapStore {
        fn fetch(&self, name: &str) -> Option<Vec<u8>> {
            self.0.get(name).cloned()
        }
    }

    #[test]
    fn resource_request_served_from_store() {
        let endpoints = unique_endpoints("res");
        let mut backend = Session::new(
            SessionConfig::new(Role::Backend).with_endpoints(endpoints.clone()),
        );
        backend.initialize().unwrap();
        let mut frontend = Session::new(
            SessionConfig::new(Role::Frontend).with_endpoints(endpoints),
        );
        frontend.initialize().unwrap();

        let store = MapStore(HashMap::from([(
            "maps/e1m1.bsp".to_string(),
            vec![0xAB; 2048],
        )]));

        assert!(frontend.request_resource(7, "maps/e1m1.bsp"));
        let deadline = Instant::now() + Duration::from_secs(2);
        let reply = loop {
            backend.serve_resources(&store);
            if let Some(reply) = frontend.poll_resource() {
                break reply;
            }
            assert!(Instant::now() < deadline, "resource reply never arrived");
            std::thread::sleep(Duration::from_millis(1));
        };
        assert_eq!(reply.id, 7);
        assert!(reply.ok);
        assert_eq!(reply.data.len(), 2048);

        // Unknown resource answers negatively instead of stalling.
        assert!(frontend.request_resource(8, "maps/nope.bsp"));
        let deadline = Instant::now() + Duration::from_secs(2);
        let reply = loop {
            backend.serve_resources(&store);
            if let Some(reply) = frontend.poll_resource() {
                break reply;
            }
            assert!(Instant::now() < deadline, "negative reply never arrived");
            std::thread::sleep(Duration::from_millis(1));
        };
        assert!(!reply.ok);
        assert!(reply.data.is_empty());
    }

    #[test]
    fn disabled_session_degrades_to_noops() {
        let mut session = Session::new(SessionConfig::default());
        session.initialize().unwrap();

        assert!(!session.is_enabled());
        assert!(!session.broadcast_world_state(&snapshot(1, 100.0)));
        assert!(!session.receive_world_state());
        assert!(!session.apply_received_state());
        assert!(!session.send_input(&impulse_input(1, 0)));
        assert!(!session.process_input_commands());
        assert!(!session.has_pending_input());
        assert!(session.take_current_input().is_none());
        assert!(session.drain_command_text().is_empty());
        assert!(session.poll_resource().is_none());
        assert_eq!(session.stats().frames_sent, 0);
    }

    #[test]
    fn role_gating_is_defensive() {
        let (mut backend, mut frontend) = shmem_pair("gate");

        // Wrong-role calls are no-ops, not errors.
        assert!(!frontend.broadcast_world_state(&snapshot(1, 1.0)));
        assert!(!frontend.process_input_commands());
        assert!(!backend.receive_world_state());
        assert!(!backend.send_input(&impulse_input(1, 0)));
        assert_eq!(frontend.stats().frames_sent, 0);
    }

    #[test]
    fn role_switch_tears_the_transport_down() {
        let endpoints = unique_endpoints("switch");
        let mut session = Session::new(
            SessionConfig::new(Role::Backend).with_endpoints(endpoints.clone()),
        );
        session.initialize().unwrap();
        assert!(endpoints.gameplay.exists());
        assert!(endpoints.input.exists());

        session.set_role(Role::Disabled).unwrap();
        assert!(!session.is_enabled());
        assert!(!endpoints.gameplay.exists(), "socket files must be removed");
        assert!(!endpoints.input.exists());
        assert!(!endpoints.resources.exists());

        // Same role again is a no-op.
        session.set_role(Role::Disabled).unwrap();
    }

    #[test]
    fn transport_switch_recreates_rather_than_mutates() {
        let region = unique_region("tswitch");
        let endpoints = unique_endpoints("tswitch");
        let mut session = Session::new(
            SessionConfig::new(Role::Backend)
                .with_transport(TransportKind::SharedRegion)
                .with_region(region.clone())
                .with_endpoints(endpoints.clone()),
        );
        session.initialize().unwrap();
        // The region exists while the shared-memory transport is up.
        assert!(SharedRegion::open(region.clone()).is_ok());

        session.set_transport(TransportKind::Channel).unwrap();
        assert!(session.is_enabled());
        assert!(endpoints.gameplay.exists());
        // The old region was unlinked, not left dangling.
        assert!(SharedRegion::open(region).is_err());
    }

    #[test]
    fn shutdown_clears_per_tick_state() {
        let (mut backend, mut frontend) = shmem_pair("clear");

        frontend.send_input(&{
            let mut input = impulse_input(1, 3);
            input.command_text = "map e1m2".to_string();
            input
        });
        backend.process_input_commands();
        assert!(backend.has_pending_input());

        backend.shutdown();
        assert!(!backend.is_enabled());
        assert!(!backend.has_pending_input());
        assert!(backend.take_current_input().is_none());
        assert!(backend.drain_command_text().is_empty());
        // Shutdown is idempotent.
        backend.shutdown();
    }

    #[test]
    fn broadcast_accumulates_stats() {
        let (mut backend, _frontend) = shmem_pair("stats");

        let mut snap = snapshot(1, 100.0);
        snap.entities = vec![Default::default(); 10];
        assert!(backend.broadcast_world_state(&snap));
        assert!(backend.broadcast_world_state(&snap));

        let stats = backend.stats();
        assert_eq!(stats.frames_sent, 2);
        assert_eq!(stats.total_entities, 20);
        assert!(stats.bytes_sent > 0);
        assert!(stats.total_time >= 0.0);
        assert!(stats.min_frame_time <= stats.max_frame_time);

        backend.reset_stats();
        assert_eq!(backend.stats().frames_sent, 0);
    }

    #[test]
    fn staged_snapshot_broadcasts_once() {
        let (mut backend, mut frontend) = shmem_pair("stage");

        assert!(!backend.broadcast_staged());
        backend.stage_snapshot(snapshot(5, 42.0));
        assert!(backend.broadcast_staged());
        assert!(!backend.broadcast_staged(), "stage is consumed");

        assert!(frontend.receive_world_state());
        frontend.apply_received_state();
        assert_eq!(frontend.view().frame_number, 5);
    }
}
