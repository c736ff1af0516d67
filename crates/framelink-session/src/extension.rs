use std::cell::RefCell;
use std::rc::Rc;

use framelink_hooks::Extension;

use crate::session::Session;

/// [`Extension`] adapter over a shared [`Session`].
///
/// The host loop talks only to its [`HookDispatcher`]; this adapter plugs
/// the session into it. The host keeps its own `Rc` to the session for
/// staging snapshots and reading the view.
///
/// Role mapping:
/// - backend: local input sampling is skipped (input arrives over the
///   transport), `process_input` drains it, the broadcast hook publishes the
///   staged snapshot, and a headless backend votes to skip rendering;
/// - frontend: the local server frame is skipped, receive/apply drive the
///   world view.
///
/// [`HookDispatcher`]: framelink_hooks::HookDispatcher
pub struct SessionExtension {
    session: Rc<RefCell<Session>>,
}

impl SessionExtension {
    pub fn new(session: Rc<RefCell<Session>>) -> Self {
        Self { session }
    }

    /// The shared session handle.
    pub fn session(&self) -> Rc<RefCell<Session>> {
        Rc::clone(&self.session)
    }
}

impl Extension for SessionExtension {
    fn name(&self) -> &str {
        "framelink"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn is_active(&self) -> bool {
        self.session.borrow().is_enabled()
    }

    fn shutdown(&mut self) {
        self.session.borrow_mut().shutdown();
    }

    fn should_skip_local_input(&self) -> bool {
        self.session.borrow().is_backend()
    }

    fn process_input(&mut self) {
        let mut session = self.session.borrow_mut();
        if session.is_backend() {
            session.process_input_commands();
        }
    }

    fn should_skip_server(&self) -> bool {
        self.session.borrow().is_frontend()
    }

    fn broadcast_world_state(&mut self) {
        let mut session = self.session.borrow_mut();
        if session.is_backend() {
            session.broadcast_staged();
        }
    }

    fn receive_world_state(&mut self) -> bool {
        let mut session = self.session.borrow_mut();
        session.is_frontend() && session.receive_world_state()
    }

    fn apply_received_state(&mut self) {
        let mut session = self.session.borrow_mut();
        if session.is_frontend() {
            session.apply_received_state();
        }
    }

    fn should_skip_rendering(&self) -> bool {
        let session = self.session.borrow();
        session.is_backend() && session.is_headless()
    }
}
