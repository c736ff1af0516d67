use std::cell::RefCell;
use std::rc::Rc;

use tracing::{info, warn};

use crate::extension::Extension;

/// Upper bound on registered extensions.
pub const MAX_EXTENSIONS: usize = 8;

/// Shared handle to a registered extension. The host and the extension's
/// owner both keep one; identity is pointer identity.
pub type SharedExtension = Rc<RefCell<dyn Extension>>;

/// Fan-out dispatcher for host hooks.
///
/// Extensions run in registration order. Inactive extensions are skipped
/// entirely. Dispatch itself carries no state between hooks; an extension
/// that needs per-frame context captures it in `frame_begin`.
#[derive(Default)]
pub struct HookDispatcher {
    extensions: Vec<SharedExtension>,
}

impl HookDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension. Rejected with a warning when the registry is
    /// full; registering the same handle twice is also rejected.
    pub fn register(&mut self, extension: SharedExtension) -> bool {
        if self.extensions.len() >= MAX_EXTENSIONS {
            warn!(max = MAX_EXTENSIONS, "too many extensions, not registering");
            return false;
        }
        if self
            .extensions
            .iter()
            .any(|existing| Rc::ptr_eq(existing, &extension))
        {
            warn!("extension already registered");
            return false;
        }
        {
            let ext = extension.borrow();
            info!(name = ext.name(), version = ext.version(), "registered extension");
        }
        self.extensions.push(extension);
        true
    }

    /// Remove an extension by handle identity. Unregistering a handle that
    /// was never registered is a no-op.
    pub fn unregister(&mut self, extension: &SharedExtension) {
        self.extensions
            .retain(|existing| !Rc::ptr_eq(existing, extension));
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Names of registered extensions, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|ext| ext.borrow().name().to_string())
            .collect()
    }

    fn each(&self, mut f: impl FnMut(&mut dyn Extension)) {
        for extension in &self.extensions {
            let mut ext = extension.borrow_mut();
            if ext.is_active() {
                f(&mut *ext);
            }
        }
    }

    /// Poll a skip query on every active extension and OR the votes.
    /// Deliberately no short-circuit: a later extension's poll still runs
    /// when an earlier one already voted yes.
    fn any_vote(&self, f: impl Fn(&dyn Extension) -> bool) -> bool {
        let mut vote = false;
        for extension in &self.extensions {
            let ext = extension.borrow();
            if ext.is_active() && f(&*ext) {
                vote = true;
            }
        }
        vote
    }

    pub fn init(&self) {
        self.each(|ext| ext.init());
    }

    pub fn shutdown(&self) {
        self.each(|ext| ext.shutdown());
    }

    pub fn frame_begin(&self) {
        self.each(|ext| ext.frame_begin());
    }

    pub fn frame_end(&self) {
        self.each(|ext| ext.frame_end());
    }

    pub fn should_skip_local_input(&self) -> bool {
        self.any_vote(|ext| ext.should_skip_local_input())
    }

    pub fn process_input(&self) {
        self.each(|ext| ext.process_input());
    }

    pub fn should_skip_server(&self) -> bool {
        self.any_vote(|ext| ext.should_skip_server())
    }

    pub fn pre_server_frame(&self) {
        self.each(|ext| ext.pre_server_frame());
    }

    pub fn post_server_frame(&self) {
        self.each(|ext| ext.post_server_frame());
    }

    pub fn broadcast_world_state(&self) {
        self.each(|ext| ext.broadcast_world_state());
    }

    /// True when at least one extension received new world state. Every
    /// active extension is polled so each gets its receive tick.
    pub fn receive_world_state(&self) -> bool {
        let mut received = false;
        for extension in &self.extensions {
            let mut ext = extension.borrow_mut();
            if ext.is_active() && ext.receive_world_state() {
                received = true;
            }
        }
        received
    }

    pub fn apply_received_state(&self) {
        self.each(|ext| ext.apply_received_state());
    }

    pub fn should_skip_rendering(&self) -> bool {
        self.any_vote(|ext| ext.should_skip_rendering())
    }

    pub fn pre_render(&self) {
        self.each(|ext| ext.pre_render());
    }

    pub fn post_render(&self) {
        self.each(|ext| ext.post_render());
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        name: String,
        log: Rc<RefCell<Vec<String>>>,
        active: bool,
        skip_input: bool,
        has_state: bool,
        input_polls: Rc<Cell<u32>>,
    }

    impl Recorder {
        fn new(name: &str, log: Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                name: name.to_string(),
                log,
                active: true,
                ..Default::default()
            }
        }

        fn push(&self, event: &str) {
            self.log.borrow_mut().push(format!("{}:{event}", self.name));
        }
    }

    impl Extension for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn frame_begin(&mut self) {
            self.push("frame_begin");
        }

        fn frame_end(&mut self) {
            self.push("frame_end");
        }

        fn should_skip_local_input(&self) -> bool {
            self.input_polls.set(self.input_polls.get() + 1);
            self.skip_input
        }

        fn receive_world_state(&mut self) -> bool {
            self.push("receive");
            self.has_state
        }
    }

    fn shared(ext: Recorder) -> SharedExtension {
        Rc::new(RefCell::new(ext))
    }

    #[test]
    fn hooks_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = HookDispatcher::new();
        assert!(dispatcher.register(shared(Recorder::new("a", Rc::clone(&log)))));
        assert!(dispatcher.register(shared(Recorder::new("b", Rc::clone(&log)))));

        dispatcher.frame_begin();
        dispatcher.frame_end();

        assert_eq!(
            *log.borrow(),
            vec!["a:frame_begin", "b:frame_begin", "a:frame_end", "b:frame_end"]
        );
    }

    #[test]
    fn registry_rejects_overflow_and_duplicates() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = HookDispatcher::new();
        for i in 0..MAX_EXTENSIONS {
            assert!(dispatcher.register(shared(Recorder::new(&format!("e{i}"), Rc::clone(&log)))));
        }
        assert!(!dispatcher.register(shared(Recorder::new("overflow", Rc::clone(&log)))));
        assert_eq!(dispatcher.len(), MAX_EXTENSIONS);

        let mut dispatcher = HookDispatcher::new();
        let ext = shared(Recorder::new("dup", Rc::clone(&log)));
        assert!(dispatcher.register(Rc::clone(&ext)));
        assert!(!dispatcher.register(ext));
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn unregister_is_by_identity_and_idempotent() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = HookDispatcher::new();
        let a = shared(Recorder::new("a", Rc::clone(&log)));
        let b = shared(Recorder::new("b", Rc::clone(&log)));
        dispatcher.register(Rc::clone(&a));
        dispatcher.register(Rc::clone(&b));

        dispatcher.unregister(&a);
        assert_eq!(dispatcher.names(), vec!["b"]);

        dispatcher.unregister(&a);
        assert_eq!(dispatcher.len(), 1);

        let never_registered = shared(Recorder::new("c", Rc::clone(&log)));
        dispatcher.unregister(&never_registered);
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn skip_queries_poll_every_extension() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = HookDispatcher::new();

        let first_polls = Rc::new(Cell::new(0));
        let second_polls = Rc::new(Cell::new(0));

        let mut first = Recorder::new("first", Rc::clone(&log));
        first.skip_input = true;
        first.input_polls = Rc::clone(&first_polls);
        let mut second = Recorder::new("second", Rc::clone(&log));
        second.input_polls = Rc::clone(&second_polls);

        dispatcher.register(shared(first));
        dispatcher.register(shared(second));

        assert!(dispatcher.should_skip_local_input());
        // The yes vote from the first extension must not starve the second.
        assert_eq!(first_polls.get(), 1);
        assert_eq!(second_polls.get(), 1);
    }

    #[test]
    fn receive_or_reduces_across_extensions() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = HookDispatcher::new();

        let mut with_state = Recorder::new("with", Rc::clone(&log));
        with_state.has_state = true;
        let without_state = Recorder::new("without", Rc::clone(&log));

        dispatcher.register(shared(with_state));
        dispatcher.register(shared(without_state));

        assert!(dispatcher.receive_world_state());
        assert_eq!(*log.borrow(), vec!["with:receive", "without:receive"]);
    }

    #[test]
    fn inactive_extensions_are_skipped() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = HookDispatcher::new();

        let mut dormant = Recorder::new("dormant", Rc::clone(&log));
        dormant.active = false;
        dormant.skip_input = true;
        dispatcher.register(shared(dormant));
        dispatcher.register(shared(Recorder::new("live", Rc::clone(&log))));

        dispatcher.frame_begin();
        assert!(!dispatcher.should_skip_local_input());
        assert_eq!(*log.borrow(), vec!["live:frame_begin"]);
    }

    #[test]
    fn empty_registry_defaults() {
        let dispatcher = HookDispatcher::new();
        assert!(dispatcher.is_empty());
        assert!(!dispatcher.should_skip_local_input());
        assert!(!dispatcher.should_skip_server());
        assert!(!dispatcher.should_skip_rendering());
        assert!(!dispatcher.receive_world_state());
        dispatcher.frame_begin();
        dispatcher.frame_end();
    }
}
