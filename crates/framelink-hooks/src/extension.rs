/// A host extension.
///
/// Every hook has a no-op default, so an extension implements only the
/// points it cares about. Hooks take `&mut self`; the host loop is
/// single-threaded and dispatch never re-enters an extension.
pub trait Extension {
    /// Extension name, for diagnostics and registry listings.
    fn name(&self) -> &str;

    /// Version string shown next to the name.
    fn version(&self) -> &str {
        "1.0"
    }

    /// Whether the extension is currently enabled. An inactive extension
    /// stays registered but is skipped by every dispatch.
    fn is_active(&self) -> bool {
        true
    }

    // Lifecycle
    fn init(&mut self) {}
    fn shutdown(&mut self) {}

    // Frame lifecycle
    fn frame_begin(&mut self) {}
    fn frame_end(&mut self) {}

    // Input
    /// Vote to suppress local keyboard/mouse sampling this frame.
    fn should_skip_local_input(&self) -> bool {
        false
    }
    fn process_input(&mut self) {}

    // Server
    /// Vote to suppress the local server frame.
    fn should_skip_server(&self) -> bool {
        false
    }
    fn pre_server_frame(&mut self) {}
    fn post_server_frame(&mut self) {}

    // World state
    fn broadcast_world_state(&mut self) {}
    /// Returns true when new world state arrived and should be applied.
    fn receive_world_state(&mut self) -> bool {
        false
    }
    fn apply_received_state(&mut self) {}

    // Rendering
    /// Vote to suppress video and audio output this frame.
    fn should_skip_rendering(&self) -> bool {
        false
    }
    fn pre_render(&mut self) {}
    fn post_render(&mut self) {}
}
