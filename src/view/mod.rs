//! Managed windows ("views")
//!
//! A [`View`] is the compositor-side record of a mapped toplevel surface. The
//! surface itself lives in the windowing collaborator; the core only talks to it
//! through the [`ShellSurface`] capability trait. Every surface kind (native
//! shell toplevels, X11 toplevels) is one implementation of that trait.
//!
//! Geometry is authoritative only after the shell acknowledges a resize: the
//! engine *requests* new dimensions with [`View::resize`] and waits for the
//! collaborator to report the committed geometry back.

pub mod headless;

use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::geometry::Rect;
use crate::workspace::WorkspaceId;

/// Identifier of a connected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ClientId(pub u64);

/// Opaque handle to a surface owned by the windowing collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SurfaceHandle {
    pub id: u64,
    pub client: ClientId,
}

/// Identifier of a view inside the [`ViewArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ViewId(pub u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Which protocol the view's surface speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewKind {
    /// Native shell toplevel
    Native,
    /// Toplevel bridged from an external windowing protocol (X11)
    External,
}

/// Capability set the core needs from a toplevel surface.
///
/// Coordinates passed to [`ShellSurface::surface_at`] are relative to the
/// surface origin.
pub trait ShellSurface: fmt::Debug {
    fn get_surface(&self) -> SurfaceHandle;

    /// Returns the (sub)surface under the surface-local point, with coordinates
    /// relative to that surface.
    fn surface_at(&self, sx: f64, sy: f64) -> Option<(SurfaceHandle, f64, f64)>;

    /// Sends a configure asking for the given visible size.
    fn request_resize(&mut self, width: i32, height: i32);

    /// Informs the surface of its new layout position. Only protocols that carry
    /// positions in their configure events care.
    fn notify_position(&mut self, _x: i32, _y: i32) {}

    fn set_activated(&mut self, activated: bool);

    fn set_fullscreen(&mut self, fullscreen: bool);

    /// Called once when the view is created, before it is mapped.
    fn prepare(&mut self, view: ViewId);

    /// Visits every subsurface with its offset from the surface origin.
    fn for_each_subsurface(&self, visitor: &mut dyn FnMut(SurfaceHandle, i32, i32));

    /// Asks the client to close the toplevel.
    fn close(&mut self);

    /// Whether the surface should start out floating (fixed-size dialogs).
    fn wants_floating(&self) -> bool {
        false
    }
}

/// A managed toplevel window
#[derive(Debug)]
pub struct View {
    pub id: ViewId,
    pub kind: ViewKind,
    shell: Box<dyn ShellSurface>,

    /// Visible box; `x`/`y` are the offset from the surface origin
    pub geometry: Rect,

    /// Current surface position in layout space (may be mid-animation)
    pub x: i32,
    pub y: i32,

    /// Position the layout wants the surface at
    pub target_x: i32,
    pub target_y: i32,

    /// Whether the shell has signalled the surface as ready to show
    pub mapped: bool,

    /// Workspace currently holding the view, if any
    pub workspace_id: Option<WorkspaceId>,

    /// Size to restore after fullscreen; still set while the restore is in flight
    pub saved_size: Option<(i32, i32)>,

    /// Layout position held when fullscreen began
    pub saved_position: Option<(i32, i32)>,
}

impl View {
    pub fn new(id: ViewId, kind: ViewKind, mut shell: Box<dyn ShellSurface>, geometry: Rect) -> Self {
        shell.prepare(id);
        Self {
            id,
            kind,
            shell,
            geometry,
            x: 0,
            y: 0,
            target_x: 0,
            target_y: 0,
            mapped: false,
            workspace_id: None,
            saved_size: None,
            saved_position: None,
        }
    }

    pub fn get_surface(&self) -> SurfaceHandle {
        self.shell.get_surface()
    }

    /// Hit-tests a layout-space point against the view and its subsurfaces.
    pub fn hit_test(&self, lx: f64, ly: f64) -> Option<(SurfaceHandle, f64, f64)> {
        self.shell.surface_at(lx - self.x as f64, ly - self.y as f64)
    }

    /// Requests a new visible size; the geometry changes once the shell commits it.
    pub fn resize(&mut self, width: i32, height: i32) {
        debug_assert!(self.mapped, "resizing unmapped {}", self.id);
        if !self.mapped {
            return;
        }
        self.shell.request_resize(width.max(1), height.max(1));
    }

    pub fn set_activated(&mut self, activated: bool) {
        self.shell.set_activated(activated);
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.shell.set_fullscreen(fullscreen);
    }

    pub fn for_each_subsurface(&self, visitor: &mut dyn FnMut(SurfaceHandle, i32, i32)) {
        self.shell.for_each_subsurface(visitor);
    }

    pub fn close(&mut self) {
        self.shell.close();
    }

    pub fn wants_floating(&self) -> bool {
        self.shell.wants_floating()
    }

    /// Places the surface immediately.
    pub fn move_to(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
        self.shell.notify_position(x, y);
    }

    /// Sets the layout target and jumps there.
    pub fn place(&mut self, x: i32, y: i32) {
        self.target_x = x;
        self.target_y = y;
        self.move_to(x, y);
    }

    pub fn save_size(&mut self, size: (i32, i32)) {
        debug_assert!(self.saved_size.is_none(), "{} already has a saved size", self.id);
        debug!("{} saved size ({:4}, {:4})", self.id, size.0, size.1);
        self.saved_size = Some(size);
        self.saved_position = Some((self.target_x, self.target_y));
    }

    /// Forgets the pre-fullscreen geometry. Returns whether any was saved.
    pub fn clear_saved(&mut self) -> bool {
        self.saved_position = None;
        self.saved_size.take().is_some()
    }

    /// True when the view is neither fullscreen nor recovering from it.
    pub fn is_normal(&self) -> bool {
        self.saved_size.is_none()
    }

    /// Visible box of the view at its target position, in layout space.
    pub fn target_rect(&self) -> Rect {
        Rect::new(
            self.target_x + self.geometry.x,
            self.target_y + self.geometry.y,
            self.geometry.width,
            self.geometry.height,
        )
    }

    /// Visible box of the view at its current position, in layout space.
    pub fn current_rect(&self) -> Rect {
        Rect::new(
            self.x + self.geometry.x,
            self.y + self.geometry.y,
            self.geometry.width,
            self.geometry.height,
        )
    }
}

/// Owner of every view, keyed by [`ViewId`]
#[derive(Debug, Default)]
pub struct ViewArena {
    views: HashMap<ViewId, View>,
    next_view_id: u64,
}

impl ViewArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a view around `shell`; the view starts unmapped and untracked.
    pub fn create(&mut self, kind: ViewKind, shell: Box<dyn ShellSurface>, geometry: Rect) -> ViewId {
        let id = ViewId(self.next_view_id);
        self.next_view_id += 1;
        self.views.insert(id, View::new(id, kind, shell, geometry));
        debug!("Created {} ({:?})", id, kind);
        id
    }

    pub fn get(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    pub fn get_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.views.get_mut(&id)
    }

    pub fn remove(&mut self, id: ViewId) -> Option<View> {
        self.views.remove(&id)
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.views.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Finds the view owning `surface` (toplevel or one of its subsurfaces).
    pub fn find_by_surface(&self, surface: SurfaceHandle) -> Option<ViewId> {
        self.views.values().find_map(|view| {
            if view.get_surface() == surface {
                return Some(view.id);
            }
            let mut found = false;
            view.for_each_subsurface(&mut |sub, _, _| found |= sub == surface);
            found.then_some(view.id)
        })
    }
}
