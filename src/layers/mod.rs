//! Layer-shell surfaces
//!
//! Panels, docks, wallpapers and lock screens live in four strata outside the
//! tiling plane. Surfaces that declare an exclusive zone shrink the usable
//! area of their output; the workspaces on that output tile inside what is
//! left.

pub mod headless;

use bitflags::bitflags;
use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::geometry::Rect;
use crate::output::{OutputId, OutputManager};
use crate::view::{ClientId, SurfaceHandle};

/// Strata, bottom-most first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Layer {
    Background,
    Bottom,
    Top,
    Overlay,
}

impl Layer {
    /// Every layer, from the top of the stack down.
    pub const TOP_DOWN: [Layer; 4] = [Layer::Overlay, Layer::Top, Layer::Bottom, Layer::Background];
}

bitflags! {
    /// Output edges a layer surface is anchored to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Anchor: u32 {
        const TOP    = 1 << 0;
        const BOTTOM = 1 << 1;
        const LEFT   = 1 << 2;
        const RIGHT  = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Margins {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

/// Client-requested layout parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerSurfaceState {
    pub anchor: Anchor,
    /// Zero means "stretch between the anchored edges"
    pub desired_width: i32,
    pub desired_height: i32,
    /// Positive reserves space; -1 asks to ignore other surfaces' zones
    pub exclusive_zone: i32,
    pub margin: Margins,
    pub keyboard_interactive: bool,
}

/// Collaborator side of a layer surface
pub trait LayerShellSurface: fmt::Debug {
    /// Sends the size the surface must use.
    fn configure(&mut self, width: i32, height: i32);

    /// Tells the client the surface is gone (e.g. its output vanished).
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LayerSurfaceId(pub u64);

#[derive(Debug)]
pub struct LayerSurface {
    pub id: LayerSurfaceId,
    pub surface: SurfaceHandle,
    pub namespace: String,
    pub layer: Layer,
    pub output: OutputId,
    pub state: LayerSurfaceState,
    /// Box relative to the output origin, set by [`LayerShell::arrange_layers`]
    pub geometry: Rect,
    pub mapped: bool,
    shell: Box<dyn LayerShellSurface>,
}

impl LayerSurface {
    pub fn client(&self) -> ClientId {
        self.surface.client
    }

    pub fn is_on_output(&self, output: OutputId) -> bool {
        self.output == output
    }

    /// Hit-tests a layout-space point. Needs the output origin to translate.
    pub fn get_surface_under_coords(&self, origin: (i32, i32), lx: f64, ly: f64) -> Option<(SurfaceHandle, f64, f64)> {
        let sx = lx - (origin.0 + self.geometry.x) as f64;
        let sy = ly - (origin.1 + self.geometry.y) as f64;
        Rect::new(0, 0, self.geometry.width, self.geometry.height)
            .contains(sx, sy)
            .then_some((self.surface, sx, sy))
    }
}

/// Shrinks `usable` by the exclusive zone of a surface anchored to one edge.
///
/// Surfaces anchored to an edge and both its neighbours count as anchored to
/// that edge; any other combination reserves nothing.
fn apply_exclusive(usable: &mut Rect, anchor: Anchor, exclusive: i32, margin: &Margins) {
    if exclusive <= 0 {
        return;
    }

    let horizontal = Anchor::LEFT | Anchor::RIGHT;
    let vertical = Anchor::TOP | Anchor::BOTTOM;

    if anchor == Anchor::TOP || anchor == Anchor::TOP | horizontal {
        usable.y += exclusive + margin.top;
        usable.height -= exclusive + margin.top;
    } else if anchor == Anchor::BOTTOM || anchor == Anchor::BOTTOM | horizontal {
        usable.height -= exclusive + margin.bottom;
    } else if anchor == Anchor::LEFT || anchor == Anchor::LEFT | vertical {
        usable.x += exclusive + margin.left;
        usable.width -= exclusive + margin.left;
    } else if anchor == Anchor::RIGHT || anchor == Anchor::RIGHT | vertical {
        usable.width -= exclusive + margin.right;
    }
}

/// Places a surface of `desired` size inside `bounds` according to its anchors.
fn place_in_bounds(state: &LayerSurfaceState, bounds: Rect) -> Rect {
    let anchor = state.anchor;
    let margin = &state.margin;
    let mut rect = Rect::new(0, 0, state.desired_width, state.desired_height);

    let both_horizontal = anchor.contains(Anchor::LEFT | Anchor::RIGHT);
    if rect.width == 0 && both_horizontal {
        rect.x = bounds.x + margin.left;
        rect.width = bounds.width - (margin.left + margin.right);
    } else if both_horizontal {
        rect.x = bounds.x + bounds.width / 2 - rect.width / 2;
    } else if anchor.contains(Anchor::LEFT) {
        rect.x = bounds.x + margin.left;
    } else if anchor.contains(Anchor::RIGHT) {
        rect.x = bounds.x + bounds.width - rect.width - margin.right;
    } else {
        rect.x = bounds.x + bounds.width / 2 - rect.width / 2;
    }

    let both_vertical = anchor.contains(Anchor::TOP | Anchor::BOTTOM);
    if rect.height == 0 && both_vertical {
        rect.y = bounds.y + margin.top;
        rect.height = bounds.height - (margin.top + margin.bottom);
    } else if both_vertical {
        rect.y = bounds.y + bounds.height / 2 - rect.height / 2;
    } else if anchor.contains(Anchor::TOP) {
        rect.y = bounds.y + margin.top;
    } else if anchor.contains(Anchor::BOTTOM) {
        rect.y = bounds.y + bounds.height - rect.height - margin.bottom;
    } else {
        rect.y = bounds.y + bounds.height / 2 - rect.height / 2;
    }

    rect
}

/// Every layer surface, across all outputs
#[derive(Debug, Default)]
pub struct LayerShell {
    surfaces: BTreeMap<LayerSurfaceId, LayerSurface>,
    next_id: u64,
}

impl LayerShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a layer surface. It is arranged on its first commit.
    pub fn create_layer(
        &mut self,
        surface: SurfaceHandle,
        namespace: impl Into<String>,
        layer: Layer,
        output: OutputId,
        state: LayerSurfaceState,
        shell: Box<dyn LayerShellSurface>,
    ) -> LayerSurfaceId {
        let id = LayerSurfaceId(self.next_id);
        self.next_id += 1;

        let namespace = namespace.into();
        debug!("New layer surface '{}' on {:?} ({:?})", namespace, output, layer);
        self.surfaces.insert(
            id,
            LayerSurface {
                id,
                surface,
                namespace,
                layer,
                output,
                state,
                geometry: Rect::default(),
                mapped: false,
                shell,
            },
        );
        id
    }

    pub fn remove(&mut self, id: LayerSurfaceId) -> Option<LayerSurface> {
        self.surfaces.remove(&id)
    }

    pub fn get(&self, id: LayerSurfaceId) -> Option<&LayerSurface> {
        self.surfaces.get(&id)
    }

    pub fn get_mut(&mut self, id: LayerSurfaceId) -> Option<&mut LayerSurface> {
        self.surfaces.get_mut(&id)
    }

    pub fn find_by_surface(&self, surface: SurfaceHandle) -> Option<LayerSurfaceId> {
        self.surfaces
            .values()
            .find(|l| l.surface == surface)
            .map(|l| l.id)
    }

    /// Surfaces of one layer on one output, in creation order.
    pub fn on_output(&self, output: OutputId, layer: Layer) -> impl Iterator<Item = &LayerSurface> {
        self.surfaces
            .values()
            .filter(move |l| l.output == output && l.layer == layer)
    }

    /// Closes and forgets every surface on `output`. Returns how many went.
    pub fn close_on_output(&mut self, output: OutputId) -> usize {
        let doomed: Vec<LayerSurfaceId> = self
            .surfaces
            .values()
            .filter(|l| l.output == output)
            .map(|l| l.id)
            .collect();
        for id in &doomed {
            if let Some(mut layer) = self.surfaces.remove(id) {
                layer.shell.close();
            }
        }
        doomed.len()
    }

    /// Topmost mapped surface under the point in `layer`, searched on every output.
    pub fn layer_surface_at(
        &self,
        outputs: &OutputManager,
        layer: Layer,
        lx: f64,
        ly: f64,
    ) -> Option<(LayerSurfaceId, SurfaceHandle, f64, f64)> {
        self.surfaces
            .values()
            .rev()
            .filter(|l| l.layer == layer && l.mapped)
            .find_map(|l| {
                let origin = outputs.get_output_box(l.output)?;
                let (surface, sx, sy) = l.get_surface_under_coords((origin.x, origin.y), lx, ly)?;
                Some((l.id, surface, sx, sy))
            })
    }

    /// Topmost mapped Top/Overlay surface on `output` asking for the keyboard.
    pub fn topmost_keyboard_interactive(&self, output: OutputId) -> Option<LayerSurfaceId> {
        [Layer::Overlay, Layer::Top].into_iter().find_map(|layer| {
            self.on_output(output, layer)
                .filter(|l| l.mapped && l.state.keyboard_interactive)
                .last()
                .map(|l| l.id)
        })
    }

    fn arrange_layer(&mut self, output: OutputId, full_area: Rect, usable: &mut Rect, layer: Layer, exclusive: bool) {
        let ids: Vec<LayerSurfaceId> = self.on_output(output, layer).map(|l| l.id).collect();

        for id in ids {
            let Some(surface) = self.surfaces.get_mut(&id) else {
                continue;
            };
            let state = surface.state;
            if (state.exclusive_zone > 0) != exclusive {
                continue;
            }

            let bounds = if state.exclusive_zone == -1 { full_area } else { *usable };
            let rect = place_in_bounds(&state, bounds);
            if rect.width <= 0 || rect.height <= 0 {
                warn!(
                    "Layer surface '{}' has an invalid size {}x{}, closing",
                    surface.namespace, rect.width, rect.height
                );
                surface.shell.close();
                self.surfaces.remove(&id);
                continue;
            }

            surface.geometry = rect;
            if surface.mapped {
                apply_exclusive(usable, state.anchor, state.exclusive_zone, &state.margin);
            }
            surface.shell.configure(rect.width, rect.height);
        }
    }

    /// Lays out every layer surface of `output` and stores the resulting usable area.
    ///
    /// Exclusive surfaces are placed first, top-most layer first, each one
    /// shrinking the area the next ones see. Then the others are placed in the
    /// remaining (or, for `exclusive_zone == -1`, the full) area.
    pub fn arrange_layers(&mut self, outputs: &mut OutputManager, output: OutputId) -> Option<Rect> {
        let layout_box = outputs.get_output_box(output)?;
        let full_area = Rect::new(0, 0, layout_box.width, layout_box.height);
        let mut usable = full_area;

        for layer in Layer::TOP_DOWN {
            self.arrange_layer(output, full_area, &mut usable, layer, true);
        }
        for layer in Layer::TOP_DOWN {
            self.arrange_layer(output, full_area, &mut usable, layer, false);
        }

        outputs.set_usable_area(output, usable);
        Some(usable)
    }
}
