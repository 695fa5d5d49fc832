//! Top-level window manager state and event loop
//!
//! [`Server`] owns everything: the desktop (views, workspaces, outputs,
//! layers), the seat, the key bindings and the event bus. Backend events, IPC
//! commands and frame ticks are all handled on one thread, one at a time.

use anyhow::{bail, Context, Result};
use log::{debug, error, info, trace, warn};
use std::path::Path;
use std::time::Instant;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::backend::{Backend, BackendEvent};
use crate::commands;
use crate::config::{CardboardConfig, SOCKET_ENV_VAR};
use crate::desktop::{Desktop, UnmanagedSurface};
use crate::events::{EventBus, ServerEvent};
use crate::geometry::Rect;
use crate::input::{parse_modifiers, KeybindingsConfig, MouseButton};
use crate::ipc::{serve_connection, IpcServer};
use crate::layers::{Layer, LayerShellSurface, LayerSurfaceId, LayerSurfaceState};
use crate::output::OutputId;
use crate::seat::{GrabMode, KeyOutcome, ResizeEdges, Seat, DEFAULT_SEAT};
use crate::spawn::Spawner;
use crate::view::{ClientId, ShellSurface, SurfaceHandle, ViewId, ViewKind};
use crate::workspace::{Placement, WorkspaceId};

pub struct Server {
    pub desktop: Desktop,
    pub seat: Seat,
    pub keybindings: KeybindingsConfig,
    pub events: EventBus,
    pub spawner: Spawner,
    pub config: CardboardConfig,
    backend: Box<dyn Backend>,
    exit_code: Option<i32>,
}

impl Server {
    pub fn new(config: CardboardConfig, backend: Box<dyn Backend>) -> Result<Self> {
        info!("🏗️ Initializing cardboard ({} backend)", backend.name());

        let mouse_mods = parse_modifiers(&config.input.mouse_mods)
            .with_context(|| format!("Invalid mouse_mods: {}", config.input.mouse_mods))?;

        Ok(Self {
            desktop: Desktop::new(&config),
            seat: Seat::new(DEFAULT_SEAT, mouse_mods),
            keybindings: KeybindingsConfig::new(),
            events: EventBus::new(),
            spawner: Spawner::new(),
            config,
            backend,
            exit_code: None,
        })
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.exit_code.is_none()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Asks the event loop to stop with `code`.
    pub fn teardown(&mut self, code: i32) {
        if self.exit_code.is_some() {
            return;
        }
        info!("🔽 Shutting down cardboard (exit code {})", code);
        self.exit_code = Some(code);
        self.events.emit(ServerEvent::Shutdown { code });
    }

    /// Runs until [`teardown`](Self::teardown) is called or a termination signal arrives.
    ///
    /// Starts the backend, then binds the command socket, then launches the
    /// config script. The first two are fatal on failure, the last is not.
    pub async fn run(&mut self, socket_path: &Path, config_script: Option<&Path>) -> Result<i32> {
        info!("🎬 Starting cardboard event loop");

        let (tx, mut rx) = mpsc::unbounded_channel();
        self.backend
            .start(tx)
            .with_context(|| format!("Failed to start {} backend", self.backend.name()))?;

        let ipc = IpcServer::bind(socket_path).context("Failed to start IPC server")?;
        self.spawner.set_env(SOCKET_ENV_VAR, ipc.socket_path());

        if let Some(script) = config_script {
            debug!("Running config file {}", script.display());
            if let Err(e) = self.spawner.spawn_script(script) {
                error!("❌ Couldn't execute the config file: {}", e);
            }
        }

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        let mut frames = tokio::time::interval(self.desktop.animation.settings().frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while self.is_running() {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => self.handle_backend_event(event),
                    None => {
                        error!("❌ Backend event channel closed");
                        self.teardown(1);
                    }
                },
                connection = ipc.accept() => match connection {
                    Ok(stream) => {
                        if let Err(e) = serve_connection(stream, |args| commands::dispatch(self, &args)).await {
                            warn!("⚠️ Error serving IPC connection: {}", e);
                        }
                    }
                    Err(e) => error!("❌ Error accepting IPC connection: {}", e),
                },
                now = frames.tick() => self.tick(now.into_std()),
                _ = sigterm.recv() => {
                    info!("📨 Received SIGTERM, shutting down gracefully");
                    self.teardown(0);
                }
                _ = sigint.recv() => {
                    info!("📨 Received SIGINT (Ctrl+C), shutting down gracefully");
                    self.teardown(0);
                }
            }
        }

        self.backend.shutdown();
        info!("🛑 Cardboard event loop finished");
        Ok(self.exit_code.unwrap_or(0))
    }

    /// Advances animations and collects exited children.
    pub fn tick(&mut self, now: Instant) {
        let moved = self.desktop.animation.tick(&mut self.desktop.views, now);
        if moved > 0 {
            trace!("Animated {} view(s)", moved);
        }
        self.spawner.reap();
    }

    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        trace!("Backend event: {:?}", event);
        let focused = self.seat.get_focused_view();

        match event {
            BackendEvent::NewOutput { name, layout_box } => {
                self.add_output(name, layout_box);
            }
            BackendEvent::OutputRemoved(id) => self.remove_output(id),
            BackendEvent::OutputLayoutChanged { output, layout_box } => {
                self.reconfigure_output(output, layout_box)
            }
            BackendEvent::OutputFrame { output, when } => self.desktop.outputs.mark_presented(output, when),

            BackendEvent::NewToplevel { kind, shell, geometry } => {
                self.new_view(kind, shell, geometry);
            }
            BackendEvent::Map(surface) => {
                if let Some(view) = self.desktop.views.find_by_surface(surface) {
                    self.map_view(view);
                } else if let Some(layer) = self.desktop.layers.find_by_surface(surface) {
                    self.map_layer(layer);
                } else {
                    warn!("⚠️ Map of unknown surface {}", surface.id);
                }
            }
            BackendEvent::Unmap(surface) => {
                if let Some(view) = self.desktop.views.find_by_surface(surface) {
                    self.unmap_view(view);
                } else if let Some(layer) = self.desktop.layers.find_by_surface(surface) {
                    self.unmap_layer(layer);
                } else {
                    self.remove_unmanaged(surface);
                }
            }
            BackendEvent::Destroy(surface) => {
                if let Some(view) = self.desktop.views.find_by_surface(surface) {
                    self.destroy_view(view);
                } else if let Some(layer) = self.desktop.layers.find_by_surface(surface) {
                    self.destroy_layer(layer);
                } else {
                    self.remove_unmanaged(surface);
                }
            }
            BackendEvent::Commit { surface, geometry } => {
                if let Some(view) = self.desktop.views.find_by_surface(surface) {
                    self.handle_commit(view, geometry);
                }
            }
            BackendEvent::RequestMove(surface) => {
                if let Some(view) = self.desktop.views.find_by_surface(surface) {
                    self.seat
                        .begin_interactive(&self.desktop, view, GrabMode::Move, ResizeEdges::empty());
                }
            }
            BackendEvent::RequestResize { surface, edges } => {
                if let Some(view) = self.desktop.views.find_by_surface(surface) {
                    self.seat
                        .begin_interactive(&self.desktop, view, GrabMode::Resize, edges);
                }
            }
            BackendEvent::RequestFullscreen { surface, fullscreen } => {
                if let Some(view) = self.desktop.views.find_by_surface(surface) {
                    self.set_fullscreen(view, fullscreen);
                }
            }

            BackendEvent::NewLayerSurface {
                surface,
                namespace,
                layer,
                output,
                state,
                shell,
            } => {
                self.new_layer_surface(surface, namespace, layer, output, state, shell);
            }
            BackendEvent::LayerCommit { surface, state } => {
                if let Some(layer) = self.desktop.layers.find_by_surface(surface) {
                    self.commit_layer(layer, state);
                }
            }

            BackendEvent::NewUnmanaged {
                surface,
                geometry,
                wants_focus,
            } => self.add_unmanaged(surface, geometry, wants_focus),
            BackendEvent::UnmanagedConfigure { surface, geometry } => {
                if let Some(u) = self.desktop.unmanaged.iter_mut().find(|u| u.surface == surface) {
                    u.geometry = geometry;
                }
            }

            BackendEvent::InputDeviceAdded { kind, id } => self.seat.add_input_device(kind, id),
            BackendEvent::InputDeviceRemoved(id) => self.seat.remove_input_device(id),
            BackendEvent::PointerMotion { dx, dy } => self.seat.move_cursor(&mut self.desktop, dx, dy),
            BackendEvent::PointerMotionAbsolute { x, y } => self.seat.warp_cursor(&mut self.desktop, x, y),
            BackendEvent::PointerButton { button, pressed } => self.handle_button(button, pressed),
            BackendEvent::Modifiers(modifiers) => self.seat.set_modifiers(modifiers),
            BackendEvent::Key { keysym, pressed } => self.handle_key(&keysym, pressed),
            BackendEvent::SetCursor { client, image } => self.seat.request_set_cursor(client, image),

            BackendEvent::InhibitActivated(client) => self.set_inhibitor(Some(client)),
            BackendEvent::InhibitDeactivated => self.set_inhibitor(None),
        }

        self.notify_focus_change(focused);
    }

    /// Emits [`ServerEvent::FocusChanged`] if the focused view is no longer `before`.
    pub(crate) fn notify_focus_change(&mut self, before: Option<ViewId>) {
        let now = self.seat.get_focused_view();
        if now != before {
            self.events.emit(ServerEvent::FocusChanged(now));
        }
    }

    // Outputs

    /// Registers an output and shows the first unassigned workspace on it.
    pub fn add_output(&mut self, name: impl Into<String>, layout_box: Rect) -> OutputId {
        let had_outputs = !self.desktop.outputs.is_empty();
        let id = self.desktop.outputs.add_output(name, layout_box);

        let unassigned = self
            .desktop
            .workspaces
            .iter()
            .position(|ws| ws.output.is_none());
        let ws = match unassigned {
            Some(ws) => ws,
            None => self.desktop.create_workspace(),
        };
        self.desktop.workspaces[ws].activate(id);
        self.arrange_suspended(ws);
        self.desktop.layers.arrange_layers(&mut self.desktop.outputs, id);

        if !had_outputs {
            let (cx, cy) = (
                layout_box.x as f64 + layout_box.width as f64 / 2.0,
                layout_box.y as f64 + layout_box.height as f64 / 2.0,
            );
            self.seat.warp_cursor(&mut self.desktop, cx, cy);
        }

        self.events.emit(ServerEvent::OutputAdded(id));
        self.events.emit(ServerEvent::WorkspaceSwitched { workspace: ws, output: id });
        id
    }

    /// Forgets an output. Its workspaces stay around unassigned and its layer surfaces are closed.
    pub fn remove_output(&mut self, id: OutputId) {
        let closed = self.desktop.layers.close_on_output(id);
        if closed > 0 {
            debug!("Closed {} layer surface(s) on removed output", closed);
        }

        let shown: Vec<WorkspaceId> = self
            .desktop
            .workspaces
            .iter()
            .filter(|ws| ws.output == Some(id))
            .map(|ws| ws.index)
            .collect();
        for ws in shown {
            self.hide_workspace_views(ws);
            self.desktop.workspaces[ws].deactivate();
        }

        if self.desktop.outputs.remove_output(id).is_none() {
            warn!("⚠️ Removal of unknown output {:?}", id);
            return;
        }

        let stale_layer = self
            .seat
            .focused_layer
            .is_some_and(|layer| self.desktop.layers.get(layer).is_none());
        if stale_layer {
            self.seat.focus_layer(&mut self.desktop, None);
        }
        if self.seat.get_focused_view().is_none() {
            let next = self.seat.top_visible_view(&self.desktop);
            self.seat.focus_view(&mut self.desktop, next);
        }
        self.events.emit(ServerEvent::OutputRemoved(id));
    }

    /// Applies a new layout box to `id` and lays out its layers and workspace again.
    pub fn reconfigure_output(&mut self, id: OutputId, layout_box: Rect) {
        if self.desktop.outputs.get(id).is_none() {
            warn!("⚠️ Layout change for unknown output {:?}", id);
            return;
        }
        info!("🖥️ Output {:?} is now {}x{} at ({}, {})", id, layout_box.width, layout_box.height, layout_box.x, layout_box.y);
        self.desktop.outputs.set_output_box(id, layout_box);
        self.desktop.arrange_output(id);

        let focused = self.seat.get_focused_view();
        if let Some(view) = focused {
            if let Some(ws) = self.desktop.view_workspace(view) {
                if let Some((workspace, mut ctx)) = self.desktop.workspace_ctx(ws) {
                    if matches!(workspace.placement(view), Placement::Tiled { .. }) {
                        workspace.fit_view_on_screen(&mut ctx, view, false);
                    }
                }
            }
        }
    }

    fn arrange_suspended(&mut self, ws: WorkspaceId) {
        if let Some((workspace, mut ctx)) = self.desktop.workspace_ctx(ws) {
            workspace.suspend_animations = true;
            workspace.arrange_workspace(&mut ctx, false);
            workspace.suspend_animations = false;
        }
    }

    fn hide_workspace_views(&mut self, ws: WorkspaceId) {
        let views: Vec<ViewId> = self
            .desktop
            .workspaces
            .get(ws)
            .map(|w| w.views().collect())
            .unwrap_or_default();
        for view in views {
            self.seat.hide_view(&mut self.desktop, view);
        }
    }

    // Views

    pub fn new_view(&mut self, kind: ViewKind, shell: Box<dyn ShellSurface>, geometry: Rect) -> ViewId {
        let id = self.desktop.views.create(kind, shell, geometry);
        debug!("New {:?} toplevel {}", kind, id);
        id
    }

    /// Shows a view: it joins the focused workspace next to the focused view and takes focus.
    pub fn map_view(&mut self, view: ViewId) {
        let Some(v) = self.desktop.views.get_mut(view) else {
            return;
        };
        if v.mapped {
            return;
        }
        v.mapped = true;
        let floating = v.wants_floating();

        let next_to = self.seat.get_focused_view();
        if let Some(ws) = self.seat.get_focused_workspace(&self.desktop) {
            if let Some((workspace, mut ctx)) = self.desktop.workspace_ctx(ws) {
                workspace.add_view(&mut ctx, view, next_to, floating, false);
            }
            if floating {
                self.center_on_workspace(view, ws);
            }
        }

        debug!("Mapped {}", view);
        self.seat.focus_view(&mut self.desktop, Some(view));
        self.events.emit(ServerEvent::ViewMapped(view));
    }

    fn center_on_workspace(&mut self, view: ViewId, ws: WorkspaceId) {
        let Some(usable) = self
            .desktop
            .workspaces
            .get(ws)
            .and_then(|w| w.usable_area(&self.desktop.outputs))
        else {
            return;
        };
        if let Some(v) = self.desktop.views.get_mut(view) {
            let x = usable.x + (usable.width - v.geometry.width) / 2 - v.geometry.x;
            let y = usable.y + (usable.height - v.geometry.height) / 2 - v.geometry.y;
            v.place(x, y);
        }
    }

    /// Hides a view: it leaves its workspace and every kind of focus, but stays known.
    pub fn unmap_view(&mut self, view: ViewId) {
        let Some(v) = self.desktop.views.get_mut(view) else {
            return;
        };
        if !v.mapped {
            return;
        }
        v.mapped = false;

        if let Some(ws) = self.desktop.view_workspace(view) {
            if let Some((workspace, mut ctx)) = self.desktop.workspace_ctx(ws) {
                workspace.remove_view(&mut ctx, view, false);
            }
        }

        let was_focused = self.seat.get_focused_view() == Some(view);
        self.seat.hide_view(&mut self.desktop, view);
        if was_focused {
            let next = self.seat.top_visible_view(&self.desktop);
            self.seat.focus_view(&mut self.desktop, next);
        }

        debug!("Unmapped {}", view);
        self.events.emit(ServerEvent::ViewUnmapped(view));
    }

    /// Forgets a view for good. Views are expected to be unmapped first.
    pub fn destroy_view(&mut self, view: ViewId) {
        let mapped = self.desktop.views.get(view).map(|v| v.mapped).unwrap_or(false);
        debug_assert!(!mapped, "{view} destroyed while still mapped");
        if mapped {
            self.unmap_view(view);
        }

        // A grab on it would otherwise dangle
        self.seat.hide_view(&mut self.desktop, view);
        self.desktop.animation.forget(view);
        if self.desktop.views.remove(view).is_some() {
            debug!("Destroyed {}", view);
            self.events.emit(ServerEvent::ViewDestroyed(view));
        }
    }

    /// The client acknowledged a configure and committed `geometry`.
    pub fn handle_commit(&mut self, view: ViewId, geometry: Rect) {
        let fullscreen = self
            .desktop
            .view_workspace(view)
            .and_then(|ws| self.desktop.workspaces.get(ws))
            .map(|ws| ws.fullscreen_view == Some(view))
            .unwrap_or(false);

        let Some(v) = self.desktop.views.get_mut(view) else {
            return;
        };
        let resized = v.geometry != geometry;
        v.geometry = geometry;
        let recovered = !fullscreen && v.clear_saved();
        if recovered {
            trace!("{} restored its size after fullscreen", view);
        }
        if !v.mapped || !(resized || recovered) {
            return;
        }

        let Some(ws) = self.desktop.view_workspace(view) else {
            return;
        };
        let focused = self.seat.get_focused_view();
        let grabbing = self.seat.grab_state.is_some();
        if let Some((workspace, mut ctx)) = self.desktop.workspace_ctx(ws) {
            // Back among the tiles: its column has to be laid out again first
            if recovered {
                workspace.arrange_workspace(&mut ctx, true);
            }
            match focused {
                Some(f) if !grabbing && matches!(workspace.placement(f), Placement::Tiled { .. }) => {
                    workspace.fit_view_on_screen(&mut ctx, f, false);
                }
                _ => workspace.arrange_workspace(&mut ctx, true),
            }
        }
    }

    pub fn set_fullscreen(&mut self, view: ViewId, fullscreen: bool) {
        let Some(ws) = self.desktop.view_workspace(view) else {
            return;
        };
        if let Some((workspace, mut ctx)) = self.desktop.workspace_ctx(ws) {
            if fullscreen {
                workspace.set_fullscreen_view(&mut ctx, Some(view));
            } else if workspace.fullscreen_view == Some(view) {
                workspace.set_fullscreen_view(&mut ctx, None);
                if matches!(workspace.placement(view), Placement::Tiled { .. }) {
                    workspace.fit_view_on_screen(&mut ctx, view, false);
                }
            }
        }
    }

    pub fn toggle_fullscreen(&mut self, view: ViewId) {
        let fullscreen = self
            .desktop
            .view_workspace(view)
            .and_then(|ws| self.desktop.workspaces.get(ws))
            .map(|ws| ws.fullscreen_view == Some(view))
            .unwrap_or(false);
        self.set_fullscreen(view, !fullscreen);
    }

    /// Moves a view between the tiled and floating sets of its workspace.
    pub fn toggle_floating(&mut self, view: ViewId) {
        let Some(ws) = self.desktop.view_workspace(view) else {
            return;
        };
        self.set_fullscreen(view, false);

        let Some(workspace) = self.desktop.workspaces.get(ws) else {
            return;
        };
        let floating = workspace.is_view_floating(view);
        // Re-tiled views go right of the most recently focused tile
        let next_to = self
            .seat
            .focus_stack()
            .iter()
            .copied()
            .find(|&v| v != view && matches!(workspace.placement(v), Placement::Tiled { .. }));

        if let Some((workspace, mut ctx)) = self.desktop.workspace_ctx(ws) {
            workspace.remove_view(&mut ctx, view, true);
            workspace.add_view(&mut ctx, view, next_to, !floating, true);
            workspace.arrange_workspace(&mut ctx, true);
        }
        if !floating {
            self.center_on_workspace(view, ws);
        }

        debug!("{} is now {}", view, if floating { "tiled" } else { "floating" });
        self.seat.focus_view(&mut self.desktop, Some(view));
    }

    // Workspaces

    /// Shows workspace `n` on the focused output.
    ///
    /// If `n` is already shown on another output, the two outputs swap workspaces.
    pub fn switch_to_workspace(&mut self, n: WorkspaceId) -> Result<()> {
        if n >= self.desktop.workspaces.len() {
            bail!("No workspace {}", n);
        }
        let Some(output) = self
            .seat
            .get_focused_workspace(&self.desktop)
            .and_then(|ws| self.desktop.workspaces[ws].output)
        else {
            bail!("No output to show workspace {} on", n);
        };

        let current = self.desktop.workspace_on_output(output);
        if current == Some(n) {
            return Ok(());
        }

        let other_output = self.desktop.workspaces[n].output;
        if let Some(current) = current {
            match other_output {
                Some(other) => {
                    self.desktop.workspaces[current].activate(other);
                    self.arrange_suspended(current);
                }
                None => {
                    self.hide_workspace_views(current);
                    self.desktop.workspaces[current].deactivate();
                }
            }
        }

        self.desktop.workspaces[n].activate(output);
        self.arrange_suspended(n);

        let next = self
            .seat
            .focus_stack()
            .iter()
            .copied()
            .find(|&v| self.desktop.view_workspace(v) == Some(n))
            .or_else(|| {
                self.desktop.workspaces[n].find_dominant_view(&self.desktop.views, &self.desktop.outputs, None)
            })
            .or_else(|| self.desktop.workspaces[n].floating_views.last().copied());
        self.seat.focus_view(&mut self.desktop, next);

        info!("Switched to workspace {} on {:?}", n, output);
        self.events.emit(ServerEvent::WorkspaceSwitched { workspace: n, output });
        Ok(())
    }

    /// Moves `view` to workspace `n`, keeping it tiled or floating.
    pub fn move_view_to_workspace(&mut self, view: ViewId, n: WorkspaceId) -> Result<()> {
        if n >= self.desktop.workspaces.len() {
            bail!("No workspace {}", n);
        }
        let Some(source) = self.desktop.view_workspace(view) else {
            bail!("{} is not on a workspace", view);
        };
        if source == n {
            return Ok(());
        }

        self.set_fullscreen(view, false);
        let floating = self.desktop.workspaces[source].is_view_floating(view);

        if let Some((workspace, mut ctx)) = self.desktop.workspace_ctx(source) {
            workspace.remove_view(&mut ctx, view, true);
            workspace.arrange_workspace(&mut ctx, true);
        }
        if let Some((workspace, mut ctx)) = self.desktop.workspace_ctx(n) {
            let next_to = workspace.columns.last().and_then(|c| c.views().next());
            workspace.add_view(&mut ctx, view, next_to, floating, true);
            workspace.arrange_workspace(&mut ctx, true);
        }

        debug!("Moved {} from workspace {} to {}", view, source, n);
        if self.desktop.is_view_visible(view) {
            self.seat.focus_view(&mut self.desktop, Some(view));
        } else {
            self.seat.hide_view(&mut self.desktop, view);
            if self.seat.get_focused_view().is_none() {
                let next = self.seat.top_visible_view(&self.desktop);
                self.seat.focus_view(&mut self.desktop, next);
            }
        }
        Ok(())
    }

    // Layer surfaces

    /// Registers a layer surface. Without an output to put it on, it is closed right away.
    pub fn new_layer_surface(
        &mut self,
        surface: SurfaceHandle,
        namespace: String,
        layer: Layer,
        output: Option<OutputId>,
        state: LayerSurfaceState,
        mut shell: Box<dyn LayerShellSurface>,
    ) -> Option<LayerSurfaceId> {
        let output = output
            .filter(|o| self.desktop.outputs.get(*o).is_some())
            .or_else(|| {
                self.seat
                    .get_focused_workspace(&self.desktop)
                    .and_then(|ws| self.desktop.workspaces[ws].output)
            })
            .or_else(|| self.desktop.outputs.outputs().next().map(|o| o.id));
        let Some(output) = output else {
            warn!("⚠️ No output for layer surface '{}', closing it", namespace);
            shell.close();
            return None;
        };

        let id = self
            .desktop
            .layers
            .create_layer(surface, namespace, layer, output, state, shell);
        self.desktop.arrange_output(output);
        Some(id)
    }

    pub fn commit_layer(&mut self, id: LayerSurfaceId, state: LayerSurfaceState) {
        let Some(layer) = self.desktop.layers.get_mut(id) else {
            return;
        };
        layer.state = state;
        let output = layer.output;
        self.desktop.arrange_output(output);
    }

    pub fn map_layer(&mut self, id: LayerSurfaceId) {
        let Some(layer) = self.desktop.layers.get_mut(id) else {
            return;
        };
        layer.mapped = true;
        let output = layer.output;
        self.desktop.arrange_output(output);

        if self.desktop.layers.topmost_keyboard_interactive(output) == Some(id) {
            self.seat.focus_layer(&mut self.desktop, Some(id));
        }
    }

    pub fn unmap_layer(&mut self, id: LayerSurfaceId) {
        let Some(layer) = self.desktop.layers.get_mut(id) else {
            return;
        };
        layer.mapped = false;
        let output = layer.output;
        self.desktop.arrange_output(output);

        if self.seat.focused_layer == Some(id) {
            self.seat.focus_layer(&mut self.desktop, None);
        }
    }

    pub fn destroy_layer(&mut self, id: LayerSurfaceId) {
        if self.desktop.layers.get(id).map(|l| l.mapped).unwrap_or(false) {
            self.unmap_layer(id);
        }
        if let Some(layer) = self.desktop.layers.remove(id) {
            debug!("Layer surface '{}' destroyed", layer.namespace);
        }
    }

    // Override-redirect surfaces

    pub fn add_unmanaged(&mut self, surface: SurfaceHandle, geometry: Rect, wants_focus: bool) {
        self.desktop.unmanaged.push(UnmanagedSurface {
            surface,
            geometry,
            mapped: true,
            wants_focus,
        });
        if wants_focus {
            self.seat.focus_unmanaged(&mut self.desktop, surface);
        }
    }

    /// Drops an override-redirect surface. If it held keyboard focus, the last focused view gets it back.
    pub fn remove_unmanaged(&mut self, surface: SurfaceHandle) {
        let before = self.desktop.unmanaged.len();
        self.desktop.unmanaged.retain(|u| u.surface != surface);
        if self.desktop.unmanaged.len() == before {
            return;
        }

        if self.seat.keyboard_focus() == Some(surface) {
            let next = self.seat.top_visible_view(&self.desktop);
            self.seat.focus_view(&mut self.desktop, None);
            self.seat.focus_view(&mut self.desktop, next);
        }
    }

    // Input

    /// Grants all input to `client` (a screen locker), or lifts that with `None`.
    pub fn set_inhibitor(&mut self, client: Option<ClientId>) {
        self.seat.set_exclusive_client(&mut self.desktop, client);
        if client.is_none() {
            let next = self.seat.top_visible_view(&self.desktop);
            self.seat.focus_view(&mut self.desktop, next);
        }
    }

    pub fn handle_key(&mut self, keysym: &str, pressed: bool) {
        match self.seat.process_key(&self.keybindings, keysym, pressed) {
            KeyOutcome::Command(command) => {
                let result = commands::dispatch(self, &command.argv());
                if result.code != 0 {
                    warn!("⚠️ Key binding {} failed: {}", command.name, result.message);
                }
            }
            KeyOutcome::Forward(surface) => self.backend.send_key(surface, keysym, pressed),
            KeyOutcome::Suppressed => trace!("Key {} suppressed", keysym),
            KeyOutcome::Unfocused => trace!("Key {} with nothing focused", keysym),
        }
    }

    pub fn handle_button(&mut self, button: MouseButton, pressed: bool) {
        if self.seat.process_button(&mut self.desktop, button, pressed) {
            return;
        }
        if let Some((surface, ..)) = self.seat.pointer_focus() {
            self.backend.send_button(surface, button, pressed);
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("backend", &self.backend.name())
            .field("views", &self.desktop.views.len())
            .field("workspaces", &self.desktop.workspaces.len())
            .field("focused", &self.seat.get_focused_view())
            .field("exit_code", &self.exit_code)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing;
