//! Shared window-management state
//!
//! [`Desktop`] bundles everything the seat and the command layer act upon:
//! views, workspaces, outputs, layer surfaces and unmanaged surfaces. It is
//! owned by the server and lent out to the seat for each input event.

use log::debug;
use serde::Serialize;

use crate::animation::{AnimationSettings, ViewAnimation};
use crate::config::{CardboardConfig, LayoutConfig};
use crate::geometry::Rect;
use crate::layers::{Layer, LayerShell, LayerSurfaceId};
use crate::output::{OutputId, OutputManager};
use crate::view::{SurfaceHandle, ViewArena, ViewId};
use crate::workspace::{LayoutContext, Workspace, WorkspaceId};

/// Override-redirect surface (menus, tooltips) that is never managed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmanagedSurface {
    pub surface: SurfaceHandle,
    /// Box in layout space, as chosen by the client
    pub geometry: Rect,
    pub mapped: bool,
    /// Whether the client asked for keyboard focus when mapping it
    pub wants_focus: bool,
}

impl UnmanagedSurface {
    pub fn surface_at(&self, lx: f64, ly: f64) -> Option<(SurfaceHandle, f64, f64)> {
        self.geometry
            .contains(lx, ly)
            .then(|| (self.surface, lx - self.geometry.x as f64, ly - self.geometry.y as f64))
    }
}

/// What a hit-test found under a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitTarget {
    View(ViewId),
    Layer(LayerSurfaceId),
    Unmanaged,
}

/// A surface under a point, with surface-local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub target: HitTarget,
    pub surface: SurfaceHandle,
    pub sx: f64,
    pub sy: f64,
}

impl SurfaceHit {
    pub fn view(&self) -> Option<ViewId> {
        match self.target {
            HitTarget::View(view) => Some(view),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Desktop {
    pub views: ViewArena,
    pub workspaces: Vec<Workspace>,
    pub outputs: OutputManager,
    pub layers: LayerShell,
    pub unmanaged: Vec<UnmanagedSurface>,
    pub animation: ViewAnimation,
    pub layout: LayoutConfig,
}

impl Desktop {
    pub fn new(config: &CardboardConfig) -> Self {
        let workspaces = (0..config.layout.workspaces).map(Workspace::new).collect();
        Self {
            views: ViewArena::new(),
            workspaces,
            outputs: OutputManager::new(),
            layers: LayerShell::new(),
            unmanaged: Vec::new(),
            animation: ViewAnimation::new(AnimationSettings::from(&config.animation)),
            layout: config.layout.clone(),
        }
    }

    /// Lends out a workspace together with the layout context it needs.
    pub fn workspace_ctx(&mut self, id: WorkspaceId) -> Option<(&mut Workspace, LayoutContext<'_>)> {
        let workspace = self.workspaces.get_mut(id)?;
        let ctx = LayoutContext {
            views: &mut self.views,
            outputs: &self.outputs,
            animation: &mut self.animation,
            gap: self.layout.gap,
        };
        Some((workspace, ctx))
    }

    pub fn create_workspace(&mut self) -> WorkspaceId {
        let id = self.workspaces.len();
        self.workspaces.push(Workspace::new(id));
        debug!("Created workspace {}", id);
        id
    }

    /// The workspace currently shown on `output`.
    pub fn workspace_on_output(&self, output: OutputId) -> Option<WorkspaceId> {
        self.workspaces
            .iter()
            .find(|ws| ws.output == Some(output))
            .map(|ws| ws.index)
    }

    /// The workspace holding `view`, if it is tracked.
    pub fn view_workspace(&self, view: ViewId) -> Option<WorkspaceId> {
        self.views.get(view).and_then(|v| v.workspace_id)
    }

    /// Whether `view` sits in a workspace that is currently shown.
    pub fn is_view_visible(&self, view: ViewId) -> bool {
        self.view_workspace(view)
            .and_then(|ws| self.workspaces.get(ws))
            .map(|ws| ws.output.is_some())
            .unwrap_or(false)
    }

    pub fn arrange_workspace(&mut self, id: WorkspaceId, animate: bool) {
        if let Some((workspace, mut ctx)) = self.workspace_ctx(id) {
            workspace.arrange_workspace(&mut ctx, animate);
        }
    }

    /// Re-lays the layer surfaces of `output`, then the workspace shown on it.
    pub fn arrange_output(&mut self, output: OutputId) {
        self.layers.arrange_layers(&mut self.outputs, output);
        if let Some(ws) = self.workspace_on_output(output) {
            self.arrange_workspace(ws, true);
        }
    }

    /// Finds the surface under a layout-space point, top-most first.
    ///
    /// Only the workspace on the output under the point is considered. A
    /// fullscreen view covers the top layer, but never the overlay layer.
    pub fn surface_at(&self, lx: f64, ly: f64) -> Option<SurfaceHit> {
        let output = self.outputs.get_output_at(lx, ly)?;
        let workspace = self
            .workspace_on_output(output)
            .and_then(|ws| self.workspaces.get(ws));
        let fullscreen = workspace.and_then(|ws| ws.fullscreen_view);

        let layer_hit = |layer: Layer| {
            self.layers
                .layer_surface_at(&self.outputs, layer, lx, ly)
                .filter(|(id, ..)| {
                    self.layers
                        .get(*id)
                        .map(|l| l.is_on_output(output))
                        .unwrap_or(false)
                })
                .map(|(id, surface, sx, sy)| SurfaceHit {
                    target: HitTarget::Layer(id),
                    surface,
                    sx,
                    sy,
                })
        };
        let view_hit = |view: ViewId| {
            let v = self.views.get(view).filter(|v| v.mapped)?;
            let (surface, sx, sy) = v.hit_test(lx, ly)?;
            Some(SurfaceHit {
                target: HitTarget::View(view),
                surface,
                sx,
                sy,
            })
        };

        if let Some(hit) = layer_hit(Layer::Overlay) {
            return Some(hit);
        }
        if fullscreen.is_none() {
            if let Some(hit) = layer_hit(Layer::Top) {
                return Some(hit);
            }
        }

        for unmanaged in self.unmanaged.iter().rev().filter(|u| u.mapped) {
            if let Some((surface, sx, sy)) = unmanaged.surface_at(lx, ly) {
                return Some(SurfaceHit {
                    target: HitTarget::Unmanaged,
                    surface,
                    sx,
                    sy,
                });
            }
        }

        if let Some(workspace) = workspace {
            if let Some(hit) = fullscreen.and_then(view_hit) {
                return Some(hit);
            }
            // The last floating view is the top-most one
            for &view in workspace.floating_views.iter().rev() {
                if let Some(hit) = view_hit(view) {
                    return Some(hit);
                }
            }
            if fullscreen.is_none() {
                for view in workspace.tiled_views() {
                    if let Some(hit) = view_hit(view) {
                        return Some(hit);
                    }
                }
            }
        }

        layer_hit(Layer::Bottom).or_else(|| layer_hit(Layer::Background))
    }
}
