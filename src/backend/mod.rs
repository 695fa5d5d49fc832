//! Windowing collaborator interface
//!
//! Display-server plumbing (client connections, buffers, mode-setting) lives
//! outside of cardboard. A [`Backend`] reports what happens there as
//! [`BackendEvent`]s on a channel, and receives the input cardboard decides
//! to forward to clients.

use anyhow::Result;
use std::fmt;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;

use crate::geometry::Rect;
use crate::input::{Modifiers, MouseButton};
use crate::layers::{Layer, LayerShellSurface, LayerSurfaceState};
use crate::output::OutputId;
use crate::seat::{InputDeviceId, InputDeviceKind, ResizeEdges};
use crate::view::{ClientId, ShellSurface, SurfaceHandle, ViewKind};

pub mod headless;

pub use headless::HeadlessBackend;

/// Something that happened on the display-server side
#[derive(Debug)]
pub enum BackendEvent {
    /// A display was plugged in at `layout_box`
    NewOutput { name: String, layout_box: Rect },
    OutputRemoved(OutputId),
    /// The output changed mode or was moved in the layout
    OutputLayoutChanged { output: OutputId, layout_box: Rect },
    /// A frame was shown on the output
    OutputFrame { output: OutputId, when: Instant },

    /// A toplevel was created. `geometry` is its visible box relative to the surface origin.
    NewToplevel {
        kind: ViewKind,
        shell: Box<dyn ShellSurface>,
        geometry: Rect,
    },
    Map(SurfaceHandle),
    Unmap(SurfaceHandle),
    Destroy(SurfaceHandle),
    /// The client acknowledged a configure and committed this visible box
    Commit { surface: SurfaceHandle, geometry: Rect },
    RequestMove(SurfaceHandle),
    RequestResize { surface: SurfaceHandle, edges: ResizeEdges },
    RequestFullscreen { surface: SurfaceHandle, fullscreen: bool },

    /// A layer surface was created; `output` is `None` when the client leaves the choice to us
    NewLayerSurface {
        surface: SurfaceHandle,
        namespace: String,
        layer: Layer,
        output: Option<OutputId>,
        state: LayerSurfaceState,
        shell: Box<dyn LayerShellSurface>,
    },
    LayerCommit { surface: SurfaceHandle, state: LayerSurfaceState },

    /// An override-redirect surface (menu, tooltip) placed by its client was mapped
    NewUnmanaged {
        surface: SurfaceHandle,
        geometry: Rect,
        wants_focus: bool,
    },
    UnmanagedConfigure { surface: SurfaceHandle, geometry: Rect },

    InputDeviceAdded { kind: InputDeviceKind, id: InputDeviceId },
    InputDeviceRemoved(InputDeviceId),
    PointerMotion { dx: f64, dy: f64 },
    PointerMotionAbsolute { x: f64, y: f64 },
    PointerButton { button: MouseButton, pressed: bool },
    Modifiers(Modifiers),
    /// A key, already translated to its keysym name
    Key { keysym: String, pressed: bool },
    SetCursor { client: ClientId, image: Option<SurfaceHandle> },

    /// A client (screen locker) asked for all input
    InhibitActivated(ClientId),
    InhibitDeactivated,
}

/// The display-server side of the compositor
pub trait Backend: fmt::Debug {
    fn name(&self) -> &str;

    /// Starts reporting events on `events`. A failure here is fatal.
    fn start(&mut self, events: UnboundedSender<BackendEvent>) -> Result<()>;

    /// Delivers a key that no binding consumed to `surface`.
    fn send_key(&mut self, surface: SurfaceHandle, keysym: &str, pressed: bool);

    /// Delivers a pointer button to the surface under the cursor.
    fn send_button(&mut self, surface: SurfaceHandle, button: MouseButton, pressed: bool);

    /// Tears down the display-server side.
    fn shutdown(&mut self) {}
}
