//! Typed notification bus
//!
//! The server announces what happened to its windows, workspaces and outputs
//! as [`ServerEvent`]s. Interested parties register a handler with
//! [`EventBus::subscribe`] and keep the returned [`Subscription`] alive for as
//! long as they want to be notified; dropping it unregisters the handler.

use log::{trace, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::output::OutputId;
use crate::view::ViewId;
use crate::workspace::WorkspaceId;

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    ViewMapped(ViewId),
    ViewUnmapped(ViewId),
    ViewDestroyed(ViewId),
    FocusChanged(Option<ViewId>),
    WorkspaceSwitched {
        workspace: WorkspaceId,
        output: OutputId,
    },
    OutputAdded(OutputId),
    OutputRemoved(OutputId),
    /// An IPC or key-binding command finished with this status
    CommandExecuted {
        name: String,
        code: i32,
    },
    Shutdown {
        code: i32,
    },
}

/// Discriminant of [`ServerEvent`], used to filter subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ViewMapped,
    ViewUnmapped,
    ViewDestroyed,
    FocusChanged,
    WorkspaceSwitched,
    OutputAdded,
    OutputRemoved,
    CommandExecuted,
    Shutdown,
}

impl ServerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ServerEvent::ViewMapped(_) => EventKind::ViewMapped,
            ServerEvent::ViewUnmapped(_) => EventKind::ViewUnmapped,
            ServerEvent::ViewDestroyed(_) => EventKind::ViewDestroyed,
            ServerEvent::FocusChanged(_) => EventKind::FocusChanged,
            ServerEvent::WorkspaceSwitched { .. } => EventKind::WorkspaceSwitched,
            ServerEvent::OutputAdded(_) => EventKind::OutputAdded,
            ServerEvent::OutputRemoved(_) => EventKind::OutputRemoved,
            ServerEvent::CommandExecuted { .. } => EventKind::CommandExecuted,
            ServerEvent::Shutdown { .. } => EventKind::Shutdown,
        }
    }
}

type Handler = Rc<RefCell<dyn FnMut(&ServerEvent)>>;

struct Listener {
    id: u64,
    /// `None` listens to every kind
    kind: Option<EventKind>,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<Listener>,
}

/// Registry of event handlers, owned by the server
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for events of `kind`, or for every event when `kind` is `None`.
    #[must_use = "the handler is unregistered as soon as the subscription is dropped"]
    pub fn subscribe<F>(&self, kind: Option<EventKind>, handler: F) -> Subscription
    where
        F: FnMut(&ServerEvent) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push(Listener {
            id,
            kind,
            handler: Rc::new(RefCell::new(handler)),
        });
        trace!("Subscribed listener {} to {:?}", id, kind);

        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Delivers `event` to every matching handler, in subscription order.
    ///
    /// Handlers may subscribe, unsubscribe or emit further events. A handler
    /// that is reached again while it is still running is skipped.
    pub fn emit(&self, event: ServerEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .registry
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.kind.map_or(true, |k| k == kind))
            .map(|l| Rc::clone(&l.handler))
            .collect();

        trace!("Emitting {:?} to {} listener(s)", event, handlers.len());
        for handler in handlers {
            match handler.try_borrow_mut() {
                Ok(mut handler) => (&mut *handler)(&event),
                Err(_) => warn!("⚠️ Skipping re-entrant delivery of {:?}", kind),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps a handler registered; dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().listeners.retain(|l| l.id != self.id);
            trace!("Unsubscribed listener {}", self.id);
        }
    }
}
