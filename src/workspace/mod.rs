//! Scrollable tiling workspaces
//!
//! A workspace can be imagined as an infinite horizontal plane with columns of
//! vertically stacked views placed side by side. The plane has its origin at the
//! left edge of its first column. Only a segment of the plane is visible on the
//! assigned output: the viewport, which slides horizontally according to
//! [`Workspace::scroll_x`].
//!
//! Each column owns its tiles; a tile wraps exactly one view and carries a
//! vertical scale that weighs its height against its siblings. A column is
//! destroyed the moment its last tile leaves, so an empty column is never
//! observable.
//!
//! Besides the tiling plane, a workspace keeps a set of floating views and at
//! most one fullscreen view.

use log::debug;
use serde::Serialize;
use std::time::Instant;

use crate::animation::ViewAnimation;
use crate::geometry::Rect;
use crate::output::{OutputId, OutputManager};
use crate::view::{ViewArena, ViewId};

/// Index of a workspace in the server's workspace list
pub type WorkspaceId = usize;

/// Placement of a view inside one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tile {
    pub view: ViewId,

    /// Number of "parts" of the column height this tile gets (default 1.0)
    pub vertical_scale: f32,
}

impl Tile {
    pub fn new(view: ViewId) -> Self {
        Self {
            view,
            vertical_scale: 1.0,
        }
    }
}

/// Vertical stack of tiles occupying one horizontal slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub tiles: Vec<Tile>,
}

impl Column {
    fn with_view(view: ViewId) -> Self {
        Self {
            tiles: vec![Tile::new(view)],
        }
    }

    pub fn contains(&self, view: ViewId) -> bool {
        self.tiles.iter().any(|t| t.view == view)
    }

    pub fn views(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.tiles.iter().map(|t| t.view)
    }

    /// Tiles whose views are mapped and not fullscreen (or recovering from it).
    fn mapped_and_normal<'a>(&'a self, views: &'a ViewArena) -> impl Iterator<Item = &'a Tile> + 'a {
        self.tiles.iter().filter(move |t| {
            views
                .get(t.view)
                .map(|v| v.mapped && v.is_normal())
                .unwrap_or(false)
        })
    }
}

/// Where a view lives inside a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Placement {
    Tiled { column: usize, row: usize },
    Floating,
    Fullscreen,
    Untracked,
}

/// Shared state the layout operations read and mutate
pub struct LayoutContext<'a> {
    pub views: &'a mut ViewArena,
    pub outputs: &'a OutputManager,
    pub animation: &'a mut ViewAnimation,
    /// Gap between tiles, in pixels
    pub gap: i32,
}

/// A group of tiled and floating views, assigned to at most one output
#[derive(Debug, Clone, Serialize)]
pub struct Workspace {
    pub index: WorkspaceId,

    pub columns: Vec<Column>,

    pub floating_views: Vec<ViewId>,

    /// Output this workspace is shown on; `None` when deactivated
    pub output: Option<OutputId>,

    /// The currently fullscreen view, if any
    pub fullscreen_view: Option<ViewId>,

    /// Horizontal offset of the viewport
    pub scroll_x: i32,

    /// When set, `arrange_workspace` jumps views to their places
    #[serde(skip)]
    pub suspend_animations: bool,
}

impl Workspace {
    pub fn new(index: WorkspaceId) -> Self {
        Self {
            index,
            columns: Vec::new(),
            floating_views: Vec::new(),
            output: None,
            fullscreen_view: None,
            scroll_x: 0,
            suspend_animations: false,
        }
    }

    /// Index of the column containing `view`.
    pub fn find_column(&self, view: ViewId) -> Option<usize> {
        self.columns.iter().position(|c| c.contains(view))
    }

    /// Column and row of the tile wrapping `view`.
    pub fn find_tile(&self, view: ViewId) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(ci, column)| {
            column
                .tiles
                .iter()
                .position(|t| t.view == view)
                .map(|ri| (ci, ri))
        })
    }

    /// Returns true if the view is floating in this workspace.
    pub fn is_view_floating(&self, view: ViewId) -> bool {
        self.floating_views.contains(&view)
    }

    /// Puts a floating view on top of the other floating views.
    pub fn raise_floating(&mut self, view: ViewId) -> bool {
        let Some(pos) = self.floating_views.iter().position(|&v| v == view) else {
            return false;
        };
        let view = self.floating_views.remove(pos);
        self.floating_views.push(view);
        true
    }

    pub fn contains(&self, view: ViewId) -> bool {
        self.find_column(view).is_some() || self.is_view_floating(view)
    }

    /// Reports exactly one placement for `view`; fullscreen wins over the slot
    /// the view returns to afterwards.
    pub fn placement(&self, view: ViewId) -> Placement {
        if self.fullscreen_view == Some(view) {
            return Placement::Fullscreen;
        }
        if let Some((column, row)) = self.find_tile(view) {
            return Placement::Tiled { column, row };
        }
        if self.is_view_floating(view) {
            return Placement::Floating;
        }
        Placement::Untracked
    }

    /// Tiled views in column order, top to bottom.
    pub fn tiled_views(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.columns.iter().flat_map(|c| c.views())
    }

    /// Every view held by this workspace.
    pub fn views(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.tiled_views().chain(self.floating_views.iter().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.floating_views.is_empty()
    }

    /// Adds `view` in its own new column right of the column holding `next_to`.
    ///
    /// Even if `next_to` shares its column with other tiles, `view` gets its very
    /// own column. With no (or an unknown) `next_to`, the column is appended at
    /// the end. Floating views are only recorded; tiling is untouched.
    ///
    /// `transferring` defers arranging to the caller, for multi-step moves.
    pub fn add_view(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        view: ViewId,
        next_to: Option<ViewId>,
        floating: bool,
        transferring: bool,
    ) {
        debug_assert!(!self.contains(view), "{view} is already in workspace {}", self.index);

        if floating {
            self.floating_views.push(view);
        } else {
            let position = next_to
                .and_then(|n| self.find_column(n))
                .map(|i| i + 1)
                .unwrap_or(self.columns.len());
            self.columns.insert(position, Column::with_view(view));
        }

        if let Some(v) = ctx.views.get_mut(view) {
            v.workspace_id = Some(self.index);
        }

        debug!(
            "Added {} to workspace {} ({})",
            view,
            self.index,
            if floating { "floating" } else { "tiled" }
        );

        if !transferring {
            self.arrange_workspace(ctx, true);
        }
    }

    /// Removes `view` from the workspace and tiles the others accordingly.
    ///
    /// If the view was the sole tile of its column, the column goes too.
    pub fn remove_view(&mut self, ctx: &mut LayoutContext<'_>, view: ViewId, transferring: bool) {
        if self.fullscreen_view == Some(view) {
            let mapped = ctx.views.get(view).map(|v| v.mapped).unwrap_or(false);
            if mapped && !transferring {
                self.set_fullscreen_view(ctx, None);
            } else if mapped {
                // The caller arranges once the transfer is complete
                self.restore_from_fullscreen(ctx, view);
                self.fullscreen_view = None;
            } else {
                self.fullscreen_view = None;
                if let Some(v) = ctx.views.get_mut(view) {
                    v.set_fullscreen(false);
                    v.clear_saved();
                }
            }
        }

        if let Some((ci, ri)) = self.find_tile(view) {
            self.columns[ci].tiles.remove(ri);
            if self.columns[ci].tiles.is_empty() {
                self.columns.remove(ci);
            }
        } else if let Some(pos) = self.floating_views.iter().position(|&v| v == view) {
            self.floating_views.remove(pos);
        } else {
            return;
        }

        if let Some(v) = ctx.views.get_mut(view) {
            v.workspace_id = None;
        }
        debug!("Removed {} from workspace {}", view, self.index);

        if !transferring {
            self.arrange_workspace(ctx, true);
        }
    }

    /// Takes `view` out of its column and stacks it at the bottom of `column`.
    pub fn insert_into_column(&mut self, ctx: &mut LayoutContext<'_>, view: ViewId, column: usize) {
        let Some((ci, ri)) = self.find_tile(view) else {
            debug_assert!(false, "{view} is not tiled in workspace {}", self.index);
            return;
        };
        if ci == column || column >= self.columns.len() {
            return;
        }

        self.columns[ci].tiles.remove(ri);
        let mut target = column;
        if self.columns[ci].tiles.is_empty() {
            self.columns.remove(ci);
            if ci < target {
                target -= 1;
            }
        }
        self.columns[target].tiles.push(Tile::new(view));

        debug!("Stacked {} into column {} of workspace {}", view, target, self.index);
        self.arrange_workspace(ctx, true);
    }

    /// Takes the bottom-most tile of `column` into its own column on the right.
    pub fn pop_from_column(&mut self, ctx: &mut LayoutContext<'_>, column: usize) {
        let Some(col) = self.columns.get_mut(column) else {
            return;
        };
        if col.tiles.len() < 2 {
            return;
        }
        let Some(tile) = col.tiles.pop() else {
            return;
        };

        debug!("Popped {} out of column {} of workspace {}", tile.view, column, self.index);
        self.columns.insert(column + 1, Column::with_view(tile.view));
        self.arrange_workspace(ctx, true);
    }

    /// Puts views in tiled position and takes care of the fullscreen view.
    pub fn arrange_workspace(&mut self, ctx: &mut LayoutContext<'_>, animate: bool) {
        let Some(output) = self.output else {
            return;
        };
        let Some(usable) = ctx.outputs.get_output_real_usable_area(output) else {
            return;
        };
        let animate = animate && !self.suspend_animations && ctx.animation.enabled();
        let now = Instant::now();

        if let Some(fullscreen) = self.fullscreen_view {
            if let Some(view) = ctx.views.get_mut(fullscreen) {
                let (x, y) = (usable.x - view.geometry.x, usable.y - view.geometry.y);
                ctx.animation.forget(fullscreen);
                view.place(x, y);
                if view.mapped {
                    view.resize(usable.width, usable.height);
                }
            }
            return;
        }

        let gap = ctx.gap;
        let mut acc_width = 0;
        for column in &self.columns {
            let tiles: Vec<(ViewId, f32)> = column
                .mapped_and_normal(ctx.views)
                .map(|t| (t.view, t.vertical_scale))
                .collect();
            let Some(&(first, _)) = tiles.first() else {
                continue;
            };
            let column_width = ctx.views.get(first).map(|v| v.geometry.width).unwrap_or(0);
            let scale_sum: f32 = tiles.iter().map(|(_, s)| s).sum();
            let available = (usable.height - gap * (tiles.len() as i32 - 1)).max(tiles.len() as i32);

            let mut acc_height = 0;
            let mut used = 0;
            for (i, &(id, scale)) in tiles.iter().enumerate() {
                let height = if i + 1 == tiles.len() {
                    available - used
                } else {
                    (available as f32 * scale / scale_sum).round() as i32
                };

                let Some(geometry) = ctx.views.get(id).map(|v| v.geometry) else {
                    continue;
                };
                let target_x = usable.x + acc_width - geometry.x - self.scroll_x;
                let target_y = usable.y + acc_height - geometry.y;

                if animate {
                    ctx.animation.enqueue_task(ctx.views, id, target_x, target_y, now);
                } else {
                    ctx.animation.forget(id);
                    if let Some(view) = ctx.views.get_mut(id) {
                        view.place(target_x, target_y);
                    }
                }
                if let Some(view) = ctx.views.get_mut(id) {
                    view.resize(column_width, height);
                }

                used += height;
                acc_height += height + gap;
            }

            acc_width += column_width + gap;
        }
    }

    /// Whether the columns, laid side by side, cover the whole usable width.
    pub fn is_spanning(&self, views: &ViewArena, outputs: &OutputManager) -> bool {
        let Some(usable) = self
            .output
            .and_then(|o| outputs.get_output_real_usable_area(o))
        else {
            return false;
        };

        let mut acc_width = 0;
        for column in &self.columns {
            let Some(first) = column.tiles.first() else {
                continue;
            };
            acc_width += views.get(first.view).map(|v| v.geometry.width).unwrap_or(0);
            if acc_width >= usable.width {
                return true;
            }
        }

        false
    }

    /// Scrolls the viewport just enough to make the whole of `view` visible.
    ///
    /// When the workspace spans the output (or `condense` is set) the first and
    /// last columns are aligned flush with the corresponding output edge.
    pub fn fit_view_on_screen(&mut self, ctx: &mut LayoutContext<'_>, view: ViewId, condense: bool) {
        if self.fullscreen_view.is_some() {
            return;
        }
        let Some(usable) = self
            .output
            .and_then(|o| ctx.outputs.get_output_real_usable_area(o))
        else {
            return;
        };
        let Some(column) = self.find_column(view) else {
            return;
        };
        let Some(rect) = ctx.views.get(view).map(|v| v.target_rect()) else {
            return;
        };

        let vx = rect.x;
        let align_edges = condense || self.is_spanning(ctx.views, ctx.outputs);
        let previous = self.scroll_x;

        if align_edges && column == 0 {
            // align first window to the display's left edge
            self.scroll_x += vx - usable.x;
        } else if align_edges && column + 1 == self.columns.len() {
            // align last window to the display's right edge
            self.scroll_x += vx + rect.width - usable.right();
        } else if vx < usable.x {
            self.scroll_x += vx - usable.x;
        } else if vx + rect.width > usable.right() {
            self.scroll_x += vx + rect.width - usable.right();
        }

        if self.scroll_x != previous {
            debug!(
                "Workspace {} scrolled from {} to {} to fit {}",
                self.index, previous, self.scroll_x, view
            );
        }

        self.arrange_workspace(ctx, true);
    }

    /// Among visible tiled views, the one with the largest visible share of its
    /// width. Ties go to `focused_view` when it is among them, else to the first
    /// in column order.
    pub fn find_dominant_view(
        &self,
        views: &ViewArena,
        outputs: &OutputManager,
        focused_view: Option<ViewId>,
    ) -> Option<ViewId> {
        let usable = self
            .output
            .and_then(|o| outputs.get_output_real_usable_area(o))?;

        let mut best_coverage = 0.0f64;
        let mut tied: Vec<ViewId> = Vec::new();

        for column in &self.columns {
            for tile in column.mapped_and_normal(views) {
                let Some(view) = views.get(tile.view) else {
                    continue;
                };
                let rect = view.target_rect();
                if rect.width <= 0 {
                    continue;
                }
                let Some(visible) = rect.intersection(&usable) else {
                    continue;
                };

                let coverage = visible.width as f64 / rect.width as f64;
                if tied.is_empty() || coverage > best_coverage + f64::EPSILON {
                    best_coverage = coverage;
                    tied.clear();
                    tied.push(tile.view);
                } else if (coverage - best_coverage).abs() <= f64::EPSILON {
                    tied.push(tile.view);
                }
            }
        }

        match focused_view {
            Some(focused) if tied.contains(&focused) => Some(focused),
            _ => tied.first().copied(),
        }
    }

    /// X coordinate of the column holding `view`, in workspace coordinates.
    ///
    /// The origin of the workspace plane is the left edge of the first column,
    /// be it off-screen or not.
    pub fn get_view_wx(&self, views: &ViewArena, view: ViewId, gap: i32) -> i32 {
        let mut acc_wx = 0;
        for column in &self.columns {
            if column.contains(view) {
                break;
            }
            if let Some(first) = column.tiles.first() {
                acc_wx += views.get(first.view).map(|v| v.geometry.width).unwrap_or(0) + gap;
            }
        }
        acc_wx
    }

    /// Sets `view` as the fullscreen view; `None` clears it.
    ///
    /// The previous fullscreen view is asked to go back to its saved size. Its
    /// saved size stays recorded until the client acknowledges the restore.
    pub fn set_fullscreen_view(&mut self, ctx: &mut LayoutContext<'_>, view: Option<ViewId>) {
        if let Some(previous) = self.fullscreen_view.take() {
            self.restore_from_fullscreen(ctx, previous);
        }

        if let Some(id) = view {
            let Some(v) = ctx.views.get_mut(id) else {
                return;
            };
            if !v.mapped {
                return;
            }
            if v.saved_size.is_none() {
                let size = (v.geometry.width, v.geometry.height);
                v.save_size(size);
            }
            v.set_fullscreen(true);
            self.fullscreen_view = Some(id);
            debug!("{} is fullscreen on workspace {}", id, self.index);
        }

        self.arrange_workspace(ctx, true);
    }

    /// Asks `view` to go back to its saved size. Floating views also return to
    /// the position they had, since arranging never moves them.
    fn restore_from_fullscreen(&self, ctx: &mut LayoutContext<'_>, view: ViewId) {
        let floating = self.is_view_floating(view);
        let Some(v) = ctx.views.get_mut(view) else {
            return;
        };
        v.set_fullscreen(false);
        match v.saved_size {
            Some((width, height)) if v.mapped => {
                v.resize(width, height);
                if let Some((x, y)) = v.saved_position.filter(|_| floating) {
                    ctx.animation.forget(view);
                    v.place(x, y);
                }
            }
            _ => {
                v.clear_saved();
            }
        }
        debug!("{} left fullscreen on workspace {}", view, self.index);
    }

    /// Assigns the workspace to `output`.
    pub fn activate(&mut self, output: OutputId) {
        debug!("Workspace {} activated on {:?}", self.index, output);
        self.output = Some(output);
    }

    /// Marks the workspace as not assigned to any output.
    pub fn deactivate(&mut self) {
        debug!("Workspace {} deactivated", self.index);
        self.output = None;
    }

    /// Usable area of the assigned output, in layout space.
    pub fn usable_area(&self, outputs: &OutputManager) -> Option<Rect> {
        self.output
            .and_then(|o| outputs.get_output_real_usable_area(o))
    }
}

#[cfg(test)]
mod tests;
