//! In-memory shell surfaces
//!
//! These back views when no display server is attached (headless runs, tests,
//! benchmarks). They behave like well-mannered clients: every configure is
//! obeyed, and every request is recorded in a shared [`SurfaceProbe`] so the
//! caller can observe what the core asked for.

use std::cell::RefCell;
use std::rc::Rc;

use super::{ClientId, ShellSurface, SurfaceHandle, ViewId};
use crate::geometry::Rect;

/// Everything a headless surface has been asked to do
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SurfaceState {
    pub view: Option<ViewId>,
    /// Requested visible sizes, oldest first
    pub configures: Vec<(i32, i32)>,
    /// Last position carried by a configure (external surfaces only)
    pub position: Option<(i32, i32)>,
    pub activated: bool,
    pub fullscreen: bool,
    pub close_requested: bool,
}

impl SurfaceState {
    pub fn last_configure(&self) -> Option<(i32, i32)> {
        self.configures.last().copied()
    }
}

pub type SurfaceProbe = Rc<RefCell<SurfaceState>>;

/// Native shell toplevel with optional client-side shadow margins
#[derive(Debug)]
pub struct NativeSurface {
    surface: SurfaceHandle,
    /// Offset of the visible box from the buffer origin
    margin: (i32, i32),
    size: (i32, i32),
    subsurfaces: Vec<(SurfaceHandle, Rect)>,
    fixed_size: bool,
    state: SurfaceProbe,
}

impl NativeSurface {
    pub fn new(surface: SurfaceHandle, size: (i32, i32)) -> Self {
        Self {
            surface,
            margin: (0, 0),
            size,
            subsurfaces: Vec::new(),
            fixed_size: false,
            state: SurfaceProbe::default(),
        }
    }

    /// Adds client-side decoration margins around the visible box.
    pub fn with_margin(mut self, mx: i32, my: i32) -> Self {
        self.margin = (mx, my);
        self
    }

    /// Marks the toplevel as a fixed-size dialog, which floats on map.
    pub fn with_fixed_size(mut self) -> Self {
        self.fixed_size = true;
        self
    }

    /// Adds a subsurface at `rect`, relative to the surface origin.
    pub fn with_subsurface(mut self, surface: SurfaceHandle, rect: Rect) -> Self {
        self.subsurfaces.push((surface, rect));
        self
    }

    pub fn probe(&self) -> SurfaceProbe {
        Rc::clone(&self.state)
    }

    /// Visible box relative to the surface origin, as the view should record it.
    pub fn geometry(&self) -> Rect {
        Rect::new(self.margin.0, self.margin.1, self.size.0, self.size.1)
    }

    fn extent(&self) -> Rect {
        Rect::new(
            0,
            0,
            self.size.0 + 2 * self.margin.0,
            self.size.1 + 2 * self.margin.1,
        )
    }
}

impl ShellSurface for NativeSurface {
    fn get_surface(&self) -> SurfaceHandle {
        self.surface
    }

    fn surface_at(&self, sx: f64, sy: f64) -> Option<(SurfaceHandle, f64, f64)> {
        // Later subsurfaces stack above earlier ones.
        for (sub, rect) in self.subsurfaces.iter().rev() {
            if rect.contains(sx, sy) {
                return Some((*sub, sx - rect.x as f64, sy - rect.y as f64));
            }
        }
        self.extent()
            .contains(sx, sy)
            .then_some((self.surface, sx, sy))
    }

    fn request_resize(&mut self, width: i32, height: i32) {
        self.size = (width, height);
        self.state.borrow_mut().configures.push((width, height));
    }

    fn set_activated(&mut self, activated: bool) {
        self.state.borrow_mut().activated = activated;
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.state.borrow_mut().fullscreen = fullscreen;
    }

    fn prepare(&mut self, view: ViewId) {
        self.state.borrow_mut().view = Some(view);
    }

    fn for_each_subsurface(&self, visitor: &mut dyn FnMut(SurfaceHandle, i32, i32)) {
        for (sub, rect) in &self.subsurfaces {
            visitor(*sub, rect.x, rect.y);
        }
    }

    fn close(&mut self) {
        self.state.borrow_mut().close_requested = true;
    }

    fn wants_floating(&self) -> bool {
        self.fixed_size
    }
}

/// X11-style toplevel: no shadow margins, configures carry the position
#[derive(Debug)]
pub struct ExternalSurface {
    surface: SurfaceHandle,
    size: (i32, i32),
    state: SurfaceProbe,
}

impl ExternalSurface {
    pub fn new(surface: SurfaceHandle, size: (i32, i32)) -> Self {
        Self {
            surface,
            size,
            state: SurfaceProbe::default(),
        }
    }

    pub fn probe(&self) -> SurfaceProbe {
        Rc::clone(&self.state)
    }

    pub fn geometry(&self) -> Rect {
        Rect::new(0, 0, self.size.0, self.size.1)
    }
}

impl ShellSurface for ExternalSurface {
    fn get_surface(&self) -> SurfaceHandle {
        self.surface
    }

    fn surface_at(&self, sx: f64, sy: f64) -> Option<(SurfaceHandle, f64, f64)> {
        self.geometry()
            .contains(sx, sy)
            .then_some((self.surface, sx, sy))
    }

    fn request_resize(&mut self, width: i32, height: i32) {
        self.size = (width, height);
        self.state.borrow_mut().configures.push((width, height));
    }

    fn notify_position(&mut self, x: i32, y: i32) {
        self.state.borrow_mut().position = Some((x, y));
    }

    fn set_activated(&mut self, activated: bool) {
        self.state.borrow_mut().activated = activated;
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.state.borrow_mut().fullscreen = fullscreen;
    }

    fn prepare(&mut self, view: ViewId) {
        self.state.borrow_mut().view = Some(view);
    }

    fn for_each_subsurface(&self, _visitor: &mut dyn FnMut(SurfaceHandle, i32, i32)) {}

    fn close(&mut self) {
        self.state.borrow_mut().close_requested = true;
    }
}

/// Convenience constructor for a surface handle.
pub fn surface(id: u64, client: u64) -> SurfaceHandle {
    SurfaceHandle {
        id,
        client: ClientId(client),
    }
}
