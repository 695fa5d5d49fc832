//! Backend without a display
//!
//! Announces a fixed set of virtual outputs when started and records the input
//! cardboard hands to clients. Useful for driving the window manager over IPC
//! without a graphical session, and in tests.

use anyhow::{bail, Result};
use log::{debug, info};
use std::cell::RefCell;
use std::rc::Rc;
use tokio::sync::mpsc::UnboundedSender;

use super::{Backend, BackendEvent};
use crate::geometry::Rect;
use crate::input::MouseButton;
use crate::view::SurfaceHandle;

/// Input forwarded to a client
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Key {
        surface: SurfaceHandle,
        keysym: String,
        pressed: bool,
    },
    Button {
        surface: SurfaceHandle,
        button: MouseButton,
        pressed: bool,
    },
}

pub type DeliveryLog = Rc<RefCell<Vec<Delivery>>>;

/// Feeds events to the server through a started backend
#[derive(Debug, Clone, Default)]
pub struct Injector {
    slot: Rc<RefCell<Option<UnboundedSender<BackendEvent>>>>,
}

impl Injector {
    /// Queues `event`. Returns false when the backend is not running.
    pub fn send(&self, event: BackendEvent) -> bool {
        self.slot
            .borrow()
            .as_ref()
            .map(|tx| tx.send(event).is_ok())
            .unwrap_or(false)
    }
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    outputs: Vec<(String, Rect)>,
    /// Also keeps the event channel open while the backend lives
    events: Injector,
    deliveries: DeliveryLog,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a virtual output of `width`x`height`, placed right of the previous ones.
    pub fn with_output(mut self, width: i32, height: i32) -> Self {
        let x = self.outputs.iter().map(|(_, r)| r.right()).max().unwrap_or(0);
        let name = format!("HEADLESS-{}", self.outputs.len() + 1);
        self.outputs.push((name, Rect::new(x, 0, width, height)));
        self
    }

    pub fn deliveries(&self) -> DeliveryLog {
        Rc::clone(&self.deliveries)
    }

    /// Handle for injecting further events once started.
    pub fn injector(&self) -> Injector {
        self.events.clone()
    }
}

impl Backend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn start(&mut self, events: UnboundedSender<BackendEvent>) -> Result<()> {
        if self.events.slot.borrow().is_some() {
            bail!("headless backend already started");
        }

        for (name, layout_box) in &self.outputs {
            if layout_box.width <= 0 || layout_box.height <= 0 {
                bail!("invalid output size {}x{}", layout_box.width, layout_box.height);
            }
            if events
                .send(BackendEvent::NewOutput {
                    name: name.clone(),
                    layout_box: *layout_box,
                })
                .is_err()
            {
                bail!("event channel closed during start");
            }
        }

        info!("🖥️ Headless backend started with {} output(s)", self.outputs.len());
        *self.events.slot.borrow_mut() = Some(events);
        Ok(())
    }

    fn send_key(&mut self, surface: SurfaceHandle, keysym: &str, pressed: bool) {
        debug!("Key {} ({}) to surface {}", keysym, pressed, surface.id);
        self.deliveries.borrow_mut().push(Delivery::Key {
            surface,
            keysym: keysym.to_string(),
            pressed,
        });
    }

    fn send_button(&mut self, surface: SurfaceHandle, button: MouseButton, pressed: bool) {
        self.deliveries.borrow_mut().push(Delivery::Button {
            surface,
            button,
            pressed,
        });
    }

    fn shutdown(&mut self) {
        self.events.slot.borrow_mut().take();
        debug!("Headless backend stopped");
    }
}
