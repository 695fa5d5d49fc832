//! Headless server fixture shared by unit tests

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::Server;
use crate::backend::headless::DeliveryLog;
use crate::backend::HeadlessBackend;
use crate::config::CardboardConfig;
use crate::events::{ServerEvent, Subscription};
use crate::geometry::Rect;
use crate::output::OutputId;
use crate::view::headless::{surface, NativeSurface, SurfaceProbe};
use crate::view::{SurfaceHandle, View, ViewId, ViewKind};

pub(crate) struct TestServer {
    pub server: Server,
    pub output: OutputId,
    pub deliveries: DeliveryLog,
    probes: HashMap<ViewId, SurfaceProbe>,
    next_surface: u64,
    subscriptions: Vec<Subscription>,
}

impl TestServer {
    /// One 1000x800 output, animations off.
    pub fn new() -> Self {
        let mut config = CardboardConfig::default();
        config.animation.enabled = false;
        let backend = HeadlessBackend::new();
        let deliveries = backend.deliveries();

        let mut server = match Server::new(config, Box::new(backend)) {
            Ok(server) => server,
            Err(e) => panic!("default config must be valid: {e:#}"),
        };
        let output = server.add_output("HEADLESS-1", Rect::new(0, 0, 1000, 800));

        Self {
            server,
            output,
            deliveries,
            probes: HashMap::new(),
            next_surface: 1,
            subscriptions: Vec::new(),
        }
    }

    pub fn next_handle(&mut self, client: u64) -> SurfaceHandle {
        let handle = surface(self.next_surface, client);
        self.next_surface += 1;
        handle
    }

    /// Creates a toplevel without mapping it.
    pub fn create(&mut self, native: NativeSurface) -> ViewId {
        let geometry = native.geometry();
        let probe = native.probe();
        let id = self.server.new_view(ViewKind::Native, Box::new(native), geometry);
        self.probes.insert(id, probe);
        id
    }

    pub fn map(&mut self, size: (i32, i32)) -> ViewId {
        let handle = self.next_handle(1);
        let id = self.create(NativeSurface::new(handle, size));
        self.server.map_view(id);
        id
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.server.desktop.views.get(id)
    }

    pub fn probe(&self, id: ViewId) -> SurfaceProbe {
        Rc::clone(&self.probes[&id])
    }

    /// Records every event emitted from now on.
    pub fn record(&mut self) -> Rc<RefCell<Vec<ServerEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let subscription = self
            .server
            .events
            .subscribe(None, move |e| sink.borrow_mut().push(e.clone()));
        self.subscriptions.push(subscription);
        seen
    }
}
