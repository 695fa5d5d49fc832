//! Input coordination for the default seat
//!
//! The seat owns the attached input devices, the cursor, the focus stack and
//! the interactive grab state machine:
//!
//! ```text
//! IDLE --begin_interactive--> GRABBING(MOVE | RESIZE) --end_interactive--> IDLE
//! ```
//!
//! Methods that need to look at or change windows borrow the [`Desktop`]
//! for the duration of the call.

use bitflags::bitflags;
use log::{debug, info, trace};

use crate::desktop::{Desktop, HitTarget};
use crate::input::{BoundCommand, KeybindingsConfig, Modifiers, MouseButton};
use crate::layers::LayerSurfaceId;
use crate::view::{ClientId, SurfaceHandle, ViewId};
use crate::workspace::{Placement, WorkspaceId};

pub const DEFAULT_SEAT: &str = "seat0";

/// Cursor image shown when the compositor owns the pointer
pub const DEFAULT_CURSOR: &str = "left_ptr";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputDeviceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputDeviceKind {
    Keyboard,
    Pointer,
    Touch,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabMode {
    Move,
    Resize,
}

bitflags! {
    /// Edges dragged by a resize grab
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ResizeEdges: u32 {
        const TOP    = 1 << 0;
        const BOTTOM = 1 << 1;
        const LEFT   = 1 << 2;
        const RIGHT  = 1 << 3;
    }
}

/// Snapshot taken when an interactive grab begins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabState {
    pub mode: GrabMode,
    pub view: ViewId,
    /// Cursor position at the start of the grab
    pub x: f64,
    pub y: f64,
    /// View position at the start of the grab
    pub view_x: i32,
    pub view_y: i32,
    /// View size at the start of the grab
    pub width: i32,
    pub height: i32,
    pub resize_edges: ResizeEdges,
    /// Viewport offset at the start of the grab, when dragging a tiled view
    pub scroll_x: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CursorImage {
    Named(&'static str),
    /// Set by the client holding pointer focus; `None` hides the cursor
    Client(Option<SurfaceHandle>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
    pub image: CursorImage,
}

/// What to do with a key press
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    /// A binding matched; run this command
    Command(BoundCommand),
    /// Deliver the key to this surface
    Forward(SurfaceHandle),
    /// The focused surface may not receive input right now
    Suppressed,
    /// Nobody holds keyboard focus
    Unfocused,
}

#[derive(Debug)]
pub struct Seat {
    pub name: String,
    pub cursor: Cursor,
    pub grab_state: Option<GrabState>,

    keyboards: Vec<InputDeviceId>,
    pointers: Vec<InputDeviceId>,

    /// Views ordered by the time they were focused, most recent first
    focus_stack: Vec<ViewId>,
    focused_view: Option<ViewId>,
    pub focused_layer: Option<LayerSurfaceId>,

    keyboard_focus: Option<SurfaceHandle>,
    pointer_focus: Option<(SurfaceHandle, f64, f64)>,
    exclusive_client: Option<ClientId>,

    modifiers: Modifiers,
    mouse_mods: Modifiers,
}

impl Seat {
    pub fn new(name: impl Into<String>, mouse_mods: Modifiers) -> Self {
        Self {
            name: name.into(),
            cursor: Cursor {
                x: 0.0,
                y: 0.0,
                image: CursorImage::Named(DEFAULT_CURSOR),
            },
            grab_state: None,
            keyboards: Vec::new(),
            pointers: Vec::new(),
            focus_stack: Vec::new(),
            focused_view: None,
            focused_layer: None,
            keyboard_focus: None,
            pointer_focus: None,
            exclusive_client: None,
            modifiers: Modifiers::empty(),
            mouse_mods,
        }
    }

    /// Sets up a newly attached input device.
    pub fn add_input_device(&mut self, kind: InputDeviceKind, id: InputDeviceId) {
        match kind {
            InputDeviceKind::Keyboard => self.keyboards.push(id),
            InputDeviceKind::Pointer => self.pointers.push(id),
            InputDeviceKind::Touch | InputDeviceKind::Other => {
                debug!("Ignoring unsupported input device {:?} ({:?})", id, kind);
                return;
            }
        }
        info!("🖱️ Attached {:?} {:?} to {}", kind, id, self.name);
    }

    pub fn remove_input_device(&mut self, id: InputDeviceId) {
        self.keyboards.retain(|&k| k != id);
        self.pointers.retain(|&p| p != id);
    }

    pub fn keyboards(&self) -> &[InputDeviceId] {
        &self.keyboards
    }

    pub fn pointers(&self) -> &[InputDeviceId] {
        &self.pointers
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    pub fn mouse_mods(&self) -> Modifiers {
        self.mouse_mods
    }

    pub fn set_mouse_mods(&mut self, mouse_mods: Modifiers) {
        debug!("Mouse modifiers set to {}", mouse_mods);
        self.mouse_mods = mouse_mods;
    }

    /// The view holding keyboard focus.
    pub fn get_focused_view(&self) -> Option<ViewId> {
        self.focused_view
    }

    pub fn focus_stack(&self) -> &[ViewId] {
        &self.focus_stack
    }

    pub fn keyboard_focus(&self) -> Option<SurfaceHandle> {
        self.keyboard_focus
    }

    pub fn pointer_focus(&self) -> Option<(SurfaceHandle, f64, f64)> {
        self.pointer_focus
    }

    pub fn exclusive_client(&self) -> Option<ClientId> {
        self.exclusive_client
    }

    /// Restricts input to the surfaces of `client`; `None` lifts the restriction.
    pub fn set_exclusive_client(&mut self, desktop: &mut Desktop, client: Option<ClientId>) {
        self.exclusive_client = client;
        let Some(client) = client else {
            debug!("Input is no longer exclusive");
            return;
        };
        debug!("Input is exclusive to client {}", client.0);

        if self
            .keyboard_focus
            .map(|s| s.client != client)
            .unwrap_or(false)
        {
            self.unfocus_view(desktop);
            self.keyboard_focus = None;
            self.focused_layer = None;
        }
        if self
            .pointer_focus
            .map(|(s, ..)| s.client != client)
            .unwrap_or(false)
        {
            self.pointer_focus = None;
        }
    }

    /// Whether `surface` may receive input. Always true without an exclusive client.
    pub fn is_input_allowed(&self, surface: SurfaceHandle) -> bool {
        self.exclusive_client
            .map(|client| surface.client == client)
            .unwrap_or(true)
    }

    fn keyboard_notify_enter(&mut self, surface: SurfaceHandle) {
        trace!("Keyboard focus to surface {} of client {}", surface.id, surface.client.0);
        self.keyboard_focus = Some(surface);
    }

    fn unfocus_view(&mut self, desktop: &mut Desktop) {
        if let Some(previous) = self.focused_view.take() {
            if let Some(view) = desktop.views.get_mut(previous) {
                view.set_activated(false);
            }
        }
    }

    /// Sets the focus state on `view` and auto-scrolls its workspace if it is tiled.
    ///
    /// With `None`, the previously focused view is deactivated and keyboard focus is cleared.
    pub fn focus_view(&mut self, desktop: &mut Desktop, view: Option<ViewId>) {
        let Some(id) = view else {
            self.unfocus_view(desktop);
            self.keyboard_focus = None;
            return;
        };

        let Some(surface) = desktop
            .views
            .get(id)
            .filter(|v| v.mapped)
            .map(|v| v.get_surface())
        else {
            return;
        };
        if !self.is_input_allowed(surface) {
            debug!("Not focusing {}: input is exclusive to another client", id);
            return;
        }

        if self.focused_view != Some(id) {
            self.unfocus_view(desktop);
        }

        self.focus_stack.retain(|&v| v != id);
        self.focus_stack.insert(0, id);

        if let Some(v) = desktop.views.get_mut(id) {
            v.set_activated(true);
        }
        self.keyboard_notify_enter(surface);
        self.focused_view = Some(id);
        self.focused_layer = None;
        debug!("Focused {}", id);

        let Some(ws_id) = desktop.view_workspace(id) else {
            return;
        };
        let auto_scroll = desktop.layout.auto_scroll;
        if let Some((workspace, mut ctx)) = desktop.workspace_ctx(ws_id) {
            match workspace.placement(id) {
                Placement::Floating => {
                    workspace.raise_floating(id);
                }
                Placement::Tiled { .. } if auto_scroll => {
                    workspace.fit_view_on_screen(&mut ctx, id, false);
                }
                _ => {}
            }
        }
    }

    /// Gives keyboard focus to a layer surface; `None` hands it back to the top of the focus stack.
    pub fn focus_layer(&mut self, desktop: &mut Desktop, layer: Option<LayerSurfaceId>) {
        let Some(id) = layer else {
            if self.focused_layer.take().is_some() {
                self.keyboard_focus = None;
                let next = self.top_visible_view(desktop);
                self.focus_view(desktop, next);
            }
            return;
        };

        let Some(surface) = desktop.layers.get(id).map(|l| l.surface) else {
            return;
        };
        if !self.is_input_allowed(surface) {
            return;
        }

        self.unfocus_view(desktop);
        self.keyboard_notify_enter(surface);
        self.focused_layer = Some(id);
        debug!("Focused layer surface {:?}", id);
    }

    /// Gives keyboard focus to a surface that is neither a view nor a layer (override-redirect menus).
    pub fn focus_unmanaged(&mut self, desktop: &mut Desktop, surface: SurfaceHandle) {
        if !self.is_input_allowed(surface) {
            return;
        }
        self.unfocus_view(desktop);
        self.focused_layer = None;
        self.keyboard_notify_enter(surface);
    }

    /// Most recently focused view that is mapped and on a shown workspace.
    pub fn top_visible_view(&self, desktop: &Desktop) -> Option<ViewId> {
        self.focus_stack.iter().copied().find(|&v| {
            desktop.views.get(v).map(|v| v.mapped).unwrap_or(false) && desktop.is_view_visible(v)
        })
    }

    /// Focuses the column `offset` places right (left if negative) of the focused one.
    ///
    /// At the ends of the column list the offset is clamped, or wrapped
    /// around when `layout.focus_wrap` is set.
    pub fn focus_by_offset(&mut self, desktop: &mut Desktop, offset: i32) {
        let Some(ws_id) = self.get_focused_workspace(desktop) else {
            return;
        };
        let Some(workspace) = desktop.workspaces.get(ws_id) else {
            return;
        };
        if workspace.columns.is_empty() {
            return;
        }

        let current = self.focused_view.and_then(|v| workspace.find_column(v));
        let Some(current) = current else {
            let dominant = workspace.find_dominant_view(&desktop.views, &desktop.outputs, None);
            if dominant.is_some() {
                self.focus_view(desktop, dominant);
            }
            return;
        };

        let count = workspace.columns.len() as i64;
        let wanted = current as i64 + offset as i64;
        let target = if desktop.layout.focus_wrap {
            wanted.rem_euclid(count)
        } else {
            wanted.clamp(0, count - 1)
        } as usize;
        if target == current {
            return;
        }

        let column = &workspace.columns[target];
        let view = self
            .focus_stack
            .iter()
            .copied()
            .find(|&v| column.contains(v))
            .or_else(|| column.views().next());
        self.focus_view(desktop, view);
    }

    /// Focuses the tile `offset` rows below (above if negative) within the focused column.
    pub fn focus_in_column(&mut self, desktop: &mut Desktop, offset: i32) {
        let Some(focused) = self.focused_view else {
            return;
        };
        let Some(workspace) = desktop
            .view_workspace(focused)
            .and_then(|ws| desktop.workspaces.get(ws))
        else {
            return;
        };
        let Some((column, row)) = workspace.find_tile(focused) else {
            return;
        };

        let rows = workspace.columns[column].tiles.len() as i64;
        let target = (row as i64 + offset as i64).clamp(0, rows - 1) as usize;
        if target != row {
            let view = workspace.columns[column].tiles[target].view;
            self.focus_view(desktop, Some(view));
        }
    }

    /// Focuses the least recently focused visible view, walking the whole stack on repeat.
    pub fn cycle_focus(&mut self, desktop: &mut Desktop) {
        let last = self.focus_stack.iter().rev().copied().find(|&v| {
            Some(v) != self.focused_view
                && desktop.views.get(v).map(|v| v.mapped).unwrap_or(false)
                && desktop.is_view_visible(v)
        });
        if last.is_some() {
            self.focus_view(desktop, last);
        }
    }

    /// Removes `view` from the focus stack.
    pub fn remove_from_focus_stack(&mut self, view: ViewId) {
        self.focus_stack.retain(|&v| v != view);
    }

    /// Takes `view` out of input consideration without unmapping it.
    ///
    /// Happens when its workspace is deactivated, and on unmap.
    pub fn hide_view(&mut self, desktop: &mut Desktop, view: ViewId) {
        if self.grab_state.map(|g| g.view) == Some(view) {
            debug!("Grabbed {} went away, ending grab", view);
            self.grab_state = None;
        }

        if self.focused_view == Some(view) {
            self.unfocus_view(desktop);
            self.keyboard_focus = None;
        }

        if let Some(surface) = desktop.views.get(view).map(|v| v.get_surface()) {
            if self.pointer_focus.map(|(s, ..)| s) == Some(surface) {
                self.pointer_focus = None;
            }
        }

        self.remove_from_focus_stack(view);
    }

    /// The workspace under the cursor, else the focused view's, else the first shown one.
    pub fn get_focused_workspace(&self, desktop: &Desktop) -> Option<WorkspaceId> {
        desktop
            .outputs
            .get_output_at(self.cursor.x, self.cursor.y)
            .and_then(|output| desktop.workspace_on_output(output))
            .or_else(|| self.focused_view.and_then(|v| desktop.view_workspace(v)))
            .or_else(|| {
                desktop
                    .workspaces
                    .iter()
                    .find(|ws| ws.output.is_some())
                    .map(|ws| ws.index)
            })
    }

    /// Starts an interactive move or resize of `view`.
    ///
    /// Does nothing while another grab is active.
    pub fn begin_interactive(&mut self, desktop: &Desktop, view: ViewId, mode: GrabMode, edges: ResizeEdges) {
        if self.grab_state.is_some() {
            debug!("Ignoring grab of {}: a grab is already active", view);
            return;
        }
        let Some(v) = desktop.views.get(view).filter(|v| v.mapped) else {
            return;
        };

        let scroll_x = match (mode, v.workspace_id) {
            (GrabMode::Move, Some(ws)) => desktop
                .workspaces
                .get(ws)
                .filter(|w| matches!(w.placement(view), Placement::Tiled { .. }))
                .map(|w| w.scroll_x),
            _ => None,
        };

        self.grab_state = Some(GrabState {
            mode,
            view,
            x: self.cursor.x,
            y: self.cursor.y,
            view_x: v.x,
            view_y: v.y,
            width: v.geometry.width,
            height: v.geometry.height,
            resize_edges: edges,
            scroll_x,
        });
        debug!("Began {:?} grab of {} (edges {:?})", mode, view, edges);
    }

    /// Moves the cursor to a layout-space point and processes the motion.
    pub fn warp_cursor(&mut self, desktop: &mut Desktop, lx: f64, ly: f64) {
        self.cursor.x = lx;
        self.cursor.y = ly;
        self.process_cursor_motion(desktop);
    }

    /// Moves the cursor by a relative delta and processes the motion.
    pub fn move_cursor(&mut self, desktop: &mut Desktop, dx: f64, dy: f64) {
        self.cursor.x += dx;
        self.cursor.y += dy;
        self.process_cursor_motion(desktop);
    }

    /// Reacts to the cursor having moved: drives the grab, or updates pointer focus.
    pub fn process_cursor_motion(&mut self, desktop: &mut Desktop) {
        match self.grab_state {
            Some(grab) if grab.mode == GrabMode::Move => self.process_cursor_move(desktop, grab),
            Some(grab) => self.process_cursor_resize(desktop, grab),
            None => self.update_pointer_focus(desktop),
        }
    }

    fn process_cursor_move(&mut self, desktop: &mut Desktop, grab: GrabState) {
        let dx = (self.cursor.x - grab.x).round() as i32;
        let dy = (self.cursor.y - grab.y).round() as i32;

        // Dragging a tiled view drags the whole plane
        if let Some(scroll_x) = grab.scroll_x {
            let Some(ws_id) = desktop.view_workspace(grab.view) else {
                return;
            };
            if let Some((workspace, mut ctx)) = desktop.workspace_ctx(ws_id) {
                workspace.scroll_x = scroll_x - dx;
                workspace.arrange_workspace(&mut ctx, false);
            }
            return;
        }

        desktop.animation.cancel_tasks(&mut desktop.views, grab.view);
        if let Some(view) = desktop.views.get_mut(grab.view) {
            view.place(grab.view_x + dx, grab.view_y + dy);
        }
    }

    fn process_cursor_resize(&mut self, desktop: &mut Desktop, grab: GrabState) {
        let dx = (self.cursor.x - grab.x).round() as i32;
        let dy = (self.cursor.y - grab.y).round() as i32;
        let edges = grab.resize_edges;

        let (mut x, mut y) = (grab.view_x, grab.view_y);
        let (mut width, mut height) = (grab.width, grab.height);

        if edges.contains(ResizeEdges::LEFT) {
            width = grab.width - dx;
            x = grab.view_x + grab.width - width.max(1);
        } else if edges.contains(ResizeEdges::RIGHT) {
            width = grab.width + dx;
        }
        if edges.contains(ResizeEdges::TOP) {
            height = grab.height - dy;
            y = grab.view_y + grab.height - height.max(1);
        } else if edges.contains(ResizeEdges::BOTTOM) {
            height = grab.height + dy;
        }

        let floating = desktop
            .view_workspace(grab.view)
            .and_then(|ws| desktop.workspaces.get(ws))
            .map(|ws| ws.is_view_floating(grab.view))
            .unwrap_or(false);

        let Some(view) = desktop.views.get_mut(grab.view) else {
            return;
        };
        if floating {
            view.place(x, y);
            view.resize(width, height);
        } else {
            // Tiles only choose their column width; the column decides the height
            view.resize(width, grab.height);
        }
    }

    fn update_pointer_focus(&mut self, desktop: &Desktop) {
        let hit = desktop
            .surface_at(self.cursor.x, self.cursor.y)
            .filter(|hit| self.is_input_allowed(hit.surface));

        match hit {
            Some(hit) => {
                if matches!(hit.target, HitTarget::Layer(_)) {
                    self.cursor.image = CursorImage::Named(DEFAULT_CURSOR);
                }
                self.pointer_focus = Some((hit.surface, hit.sx, hit.sy));
            }
            None => {
                self.cursor.image = CursorImage::Named(DEFAULT_CURSOR);
                self.pointer_focus = None;
            }
        }
    }

    /// Ends the active grab, if any. Tiled views snap back into the layout.
    pub fn end_interactive(&mut self, desktop: &mut Desktop) {
        let Some(grab) = self.grab_state.take() else {
            return;
        };
        debug!("Ended {:?} grab of {}", grab.mode, grab.view);

        if grab.scroll_x.is_none() {
            if let Some(ws) = desktop.view_workspace(grab.view) {
                desktop.arrange_workspace(ws, true);
            }
        }
    }

    /// Honours a client's request to set the cursor image, if it holds pointer focus.
    pub fn request_set_cursor(&mut self, client: ClientId, image: Option<SurfaceHandle>) {
        let focused_client = self.pointer_focus.map(|(s, ..)| s.client);
        if focused_client == Some(client) {
            self.cursor.image = CursorImage::Client(image);
        }
    }

    /// Handles a pointer button. Returns true when the press was consumed by the compositor.
    ///
    /// With `mouse_mods` held, the left button moves and the right button
    /// resizes the view under the cursor. Otherwise a press focuses it.
    pub fn process_button(&mut self, desktop: &mut Desktop, button: MouseButton, pressed: bool) -> bool {
        if !pressed {
            let grabbing = self.grab_state.is_some();
            self.end_interactive(desktop);
            return grabbing;
        }

        let Some(hit) = desktop.surface_at(self.cursor.x, self.cursor.y) else {
            return false;
        };
        if !self.is_input_allowed(hit.surface) {
            return true;
        }

        match hit.target {
            HitTarget::View(view) => {
                self.focus_view(desktop, Some(view));

                let mouse_mods = self.mouse_mods.significant();
                let held = !mouse_mods.is_empty() && self.modifiers.significant().contains(mouse_mods);
                if !held {
                    return false;
                }

                match button {
                    MouseButton::Left => {
                        self.begin_interactive(desktop, view, GrabMode::Move, ResizeEdges::empty());
                        true
                    }
                    MouseButton::Right => {
                        let edges = self.edges_under_cursor(desktop, view);
                        self.begin_interactive(desktop, view, GrabMode::Resize, edges);
                        true
                    }
                    _ => false,
                }
            }
            HitTarget::Layer(id) => {
                let interactive = desktop
                    .layers
                    .get(id)
                    .map(|l| l.state.keyboard_interactive)
                    .unwrap_or(false);
                if interactive {
                    self.focus_layer(desktop, Some(id));
                }
                false
            }
            HitTarget::Unmanaged => false,
        }
    }

    /// Edges closest to the cursor, by quadrant of the view's visible box.
    fn edges_under_cursor(&self, desktop: &Desktop, view: ViewId) -> ResizeEdges {
        let Some(rect) = desktop.views.get(view).map(|v| v.current_rect()) else {
            return ResizeEdges::BOTTOM | ResizeEdges::RIGHT;
        };
        let center_x = rect.x as f64 + rect.width as f64 / 2.0;
        let center_y = rect.y as f64 + rect.height as f64 / 2.0;

        let horizontal = if self.cursor.x < center_x {
            ResizeEdges::LEFT
        } else {
            ResizeEdges::RIGHT
        };
        let vertical = if self.cursor.y < center_y {
            ResizeEdges::TOP
        } else {
            ResizeEdges::BOTTOM
        };
        horizontal | vertical
    }

    /// Decides what happens with a key. Bindings are not consulted while input is exclusive.
    pub fn process_key(&self, keybindings: &KeybindingsConfig, keysym: &str, pressed: bool) -> KeyOutcome {
        if pressed && self.exclusive_client.is_none() {
            if let Some(command) = keybindings.lookup(self.modifiers, keysym) {
                debug!("⌨️ Key binding matched: {}", command.argv().join(" "));
                return KeyOutcome::Command(command.clone());
            }
        }

        match self.keyboard_focus {
            None => KeyOutcome::Unfocused,
            Some(surface) if !self.is_input_allowed(surface) => KeyOutcome::Suppressed,
            Some(surface) => KeyOutcome::Forward(surface),
        }
    }
}
