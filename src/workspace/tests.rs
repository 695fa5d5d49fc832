//! Unit tests for workspace module
//!
//! Tests column management, tiling geometry, viewport fitting, dominant
//! view selection and fullscreen handling.

use super::*;
use crate::animation::AnimationSettings;
use crate::view::headless::{surface, NativeSurface, SurfaceProbe};
use crate::view::ViewKind;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::time::Duration;

struct Fixture {
    views: ViewArena,
    outputs: OutputManager,
    animation: ViewAnimation,
    probes: HashMap<ViewId, SurfaceProbe>,
    gap: i32,
    output: OutputId,
}

impl Fixture {
    fn new(width: i32, height: i32) -> Self {
        let mut outputs = OutputManager::new();
        let output = outputs.add_output("TEST-1", Rect::new(0, 0, width, height));
        Self {
            views: ViewArena::new(),
            outputs,
            animation: ViewAnimation::new(AnimationSettings {
                enabled: false,
                duration: Duration::from_millis(300),
                frame_interval: Duration::from_millis(16),
            }),
            probes: HashMap::new(),
            gap: 10,
            output,
        }
    }

    fn ctx(&mut self) -> LayoutContext<'_> {
        LayoutContext {
            views: &mut self.views,
            outputs: &self.outputs,
            animation: &mut self.animation,
            gap: self.gap,
        }
    }

    fn workspace(&self) -> Workspace {
        let mut workspace = Workspace::new(0);
        workspace.activate(self.output);
        workspace
    }

    /// Creates a mapped view with the given visible size.
    fn spawn_view(&mut self, width: i32, height: i32) -> ViewId {
        self.spawn_with_margin(width, height, 0)
    }

    fn spawn_with_margin(&mut self, width: i32, height: i32, margin: i32) -> ViewId {
        let handle = surface(self.views.len() as u64 + 1, 1);
        let native = NativeSurface::new(handle, (width, height)).with_margin(margin, margin);
        let geometry = native.geometry();
        let probe = native.probe();
        let id = self.views.create(ViewKind::Native, Box::new(native), geometry);
        if let Some(view) = self.views.get_mut(id) {
            view.mapped = true;
        }
        self.probes.insert(id, probe);
        id
    }

    /// Plays the part of the clients: commits every pending configure.
    fn ack(&mut self) {
        for (id, probe) in &self.probes {
            let Some((width, height)) = probe.borrow().last_configure() else {
                continue;
            };
            if let Some(view) = self.views.get_mut(*id) {
                view.geometry.width = width;
                view.geometry.height = height;
            }
        }
    }

    fn last_configure(&self, view: ViewId) -> Option<(i32, i32)> {
        self.probes.get(&view).and_then(|p| p.borrow().last_configure())
    }

    fn target(&self, view: ViewId) -> Option<(i32, i32)> {
        self.views.get(view).map(|v| (v.target_x, v.target_y))
    }
}

fn column_layout(workspace: &Workspace) -> Vec<Vec<ViewId>> {
    workspace
        .columns
        .iter()
        .map(|c| c.views().collect())
        .collect()
}

#[test]
fn test_add_view_next_to_focused_column() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(600, 400);
    let b = fx.spawn_view(600, 400);
    let c = fx.spawn_view(600, 400);
    let d = fx.spawn_view(600, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);
    workspace.add_view(&mut fx.ctx(), c, Some(b), false, false);

    // d lands right after a, in its own column
    workspace.add_view(&mut fx.ctx(), d, Some(a), false, false);
    assert_eq!(column_layout(&workspace), vec![vec![a], vec![d], vec![b], vec![c]]);

    let view = fx.views.get(d).context("view d")?;
    assert_eq!(view.workspace_id, Some(0));

    Ok(())
}

#[test]
fn test_unknown_neighbour_appends_at_end() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(600, 400);
    let b = fx.spawn_view(600, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(ViewId(999)), false, false);
    assert_eq!(column_layout(&workspace), vec![vec![a], vec![b]]);

    Ok(())
}

#[test]
fn test_floating_view_does_not_tile() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = fx.workspace();
    let dialog = fx.spawn_view(300, 200);

    workspace.add_view(&mut fx.ctx(), dialog, None, true, false);

    assert!(workspace.columns.is_empty());
    assert!(workspace.is_view_floating(dialog));
    assert_eq!(workspace.placement(dialog), Placement::Floating);
    // Floating views are left where they are
    assert_eq!(fx.last_configure(dialog), None);

    Ok(())
}

#[test]
fn test_removing_last_tile_destroys_column() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(600, 400);
    let b = fx.spawn_view(600, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);
    workspace.remove_view(&mut fx.ctx(), a, false);

    assert_eq!(column_layout(&workspace), vec![vec![b]]);
    assert!(workspace.columns.iter().all(|c| !c.tiles.is_empty()));
    assert_eq!(workspace.placement(a), Placement::Untracked);
    assert_eq!(fx.views.get(a).and_then(|v| v.workspace_id), None);

    Ok(())
}

#[test]
fn test_remove_then_add_restores_columns() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(500, 400);
    let b = fx.spawn_view(500, 400);
    let c = fx.spawn_view(500, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);
    workspace.add_view(&mut fx.ctx(), c, Some(b), false, false);
    let before = column_layout(&workspace);

    workspace.remove_view(&mut fx.ctx(), b, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);

    assert_eq!(column_layout(&workspace), before);

    Ok(())
}

#[test]
fn test_insert_into_column_and_pop_back_out() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(600, 400);
    let b = fx.spawn_view(600, 400);
    let c = fx.spawn_view(600, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);
    workspace.add_view(&mut fx.ctx(), c, Some(b), false, false);

    // c joins a's column; its own column disappears
    workspace.insert_into_column(&mut fx.ctx(), c, 0);
    assert_eq!(column_layout(&workspace), vec![vec![a, c], vec![b]]);
    assert_eq!(workspace.placement(c), Placement::Tiled { column: 0, row: 1 });

    // b moves left into column 0; target index shifts after its removal
    workspace.insert_into_column(&mut fx.ctx(), b, 0);
    assert_eq!(column_layout(&workspace), vec![vec![a, c, b]]);

    workspace.pop_from_column(&mut fx.ctx(), 0);
    assert_eq!(column_layout(&workspace), vec![vec![a, c], vec![b]]);

    // A single-tile column cannot be popped
    workspace.pop_from_column(&mut fx.ctx(), 1);
    assert_eq!(column_layout(&workspace), vec![vec![a, c], vec![b]]);

    Ok(())
}

#[test]
fn test_insert_right_shifts_target_index() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(400, 400);
    let b = fx.spawn_view(400, 400);
    let c = fx.spawn_view(400, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);
    workspace.add_view(&mut fx.ctx(), c, Some(b), false, false);

    workspace.insert_into_column(&mut fx.ctx(), a, 2);
    assert_eq!(column_layout(&workspace), vec![vec![b], vec![c, a]]);

    Ok(())
}

#[test]
fn test_arrange_places_columns_side_by_side() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(800, 400);
    let b = fx.spawn_view(600, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);
    fx.ack();

    assert_eq!(fx.target(a), Some((0, 0)));
    assert_eq!(fx.target(b), Some((810, 0)));
    assert_eq!(fx.last_configure(a), Some((800, 1080)));
    assert_eq!(fx.last_configure(b), Some((600, 1080)));

    Ok(())
}

#[test]
fn test_arrange_stacks_tiles_by_vertical_scale() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(800, 400);
    let b = fx.spawn_view(600, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);
    workspace.insert_into_column(&mut fx.ctx(), b, 0);
    fx.ack();

    // 1080 minus one gap, halved
    assert_eq!(fx.target(b), Some((0, 545)));
    assert_eq!(fx.last_configure(a), Some((800, 535)));
    assert_eq!(fx.last_configure(b), Some((800, 535)));

    // Three parts for a, one for b
    workspace.columns[0].tiles[0].vertical_scale = 3.0;
    workspace.arrange_workspace(&mut fx.ctx(), false);
    fx.ack();
    assert_eq!(fx.last_configure(a), Some((800, 803)));
    assert_eq!(fx.last_configure(b), Some((800, 267)));
    assert_eq!(fx.target(b), Some((0, 813)));

    Ok(())
}

#[test]
fn test_arrange_honours_geometry_offset() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    fx.outputs.set_usable_area(fx.output, Rect::new(0, 30, 1920, 1050));
    let mut workspace = fx.workspace();
    let shadowed = fx.spawn_with_margin(800, 400, 12);

    workspace.add_view(&mut fx.ctx(), shadowed, None, false, false);

    // The visible box, not the buffer, starts at the usable origin
    assert_eq!(fx.target(shadowed), Some((-12, 18)));

    Ok(())
}

#[test]
fn test_arrange_is_idempotent() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = fx.workspace();
    let ids: Vec<ViewId> = (0..4).map(|_| fx.spawn_view(700, 500)).collect();
    for (i, &id) in ids.iter().enumerate() {
        let next_to = i.checked_sub(1).map(|p| ids[p]);
        workspace.add_view(&mut fx.ctx(), id, next_to, false, false);
    }
    workspace.insert_into_column(&mut fx.ctx(), ids[3], 1);
    workspace.scroll_x = 300;
    fx.ack();

    workspace.arrange_workspace(&mut fx.ctx(), false);
    fx.ack();
    let first: Vec<_> = ids.iter().map(|&id| (fx.target(id), fx.last_configure(id))).collect();

    workspace.arrange_workspace(&mut fx.ctx(), false);
    fx.ack();
    let second: Vec<_> = ids.iter().map(|&id| (fx.target(id), fx.last_configure(id))).collect();

    assert_eq!(first, second);

    Ok(())
}

#[test]
fn test_arrange_without_output_is_noop() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = Workspace::new(3);
    let a = fx.spawn_view(800, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);

    assert_eq!(fx.last_configure(a), None);
    assert_eq!(fx.target(a), Some((0, 0)));
    assert_eq!(workspace.placement(a), Placement::Tiled { column: 0, row: 0 });

    Ok(())
}

#[test]
fn test_animated_arrange_queues_movement() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    fx.animation.set_settings(AnimationSettings {
        enabled: true,
        duration: Duration::from_millis(300),
        frame_interval: Duration::from_millis(16),
    });
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(800, 400);
    let b = fx.spawn_view(800, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);

    // b targets its slot but starts its journey from the origin
    assert_eq!(fx.target(b), Some((810, 0)));
    assert!(fx.animation.is_animating(b));
    assert_eq!(fx.views.get(b).map(|v| v.x), Some(0));

    // Suspended animations jump straight to the target
    workspace.suspend_animations = true;
    workspace.arrange_workspace(&mut fx.ctx(), true);
    assert!(!fx.animation.is_animating(b));
    assert_eq!(fx.views.get(b).map(|v| v.x), Some(810));

    Ok(())
}

#[test]
fn test_spanning_detection() -> Result<()> {
    let mut fx = Fixture::new(1000, 800);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(400, 400);
    let b = fx.spawn_view(400, 400);
    let c = fx.spawn_view(400, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);
    assert!(!workspace.is_spanning(&fx.views, &fx.outputs));

    workspace.add_view(&mut fx.ctx(), c, Some(b), false, false);
    assert!(workspace.is_spanning(&fx.views, &fx.outputs));

    Ok(())
}

#[test]
fn test_fit_view_protruding_left_edge() -> Result<()> {
    let mut fx = Fixture::new(1000, 800);
    let mut workspace = fx.workspace();
    let wide = fx.spawn_view(1200, 800);

    workspace.add_view(&mut fx.ctx(), wide, None, false, false);
    fx.ack();
    workspace.scroll_x = 50;
    workspace.arrange_workspace(&mut fx.ctx(), false);
    assert_eq!(fx.target(wide), Some((-50, 0)));

    workspace.fit_view_on_screen(&mut fx.ctx(), wide, false);

    assert_eq!(workspace.scroll_x, 0);
    let rect = fx.views.get(wide).context("wide view")?.target_rect();
    assert_eq!(rect.x, 0);

    Ok(())
}

#[test]
fn test_fit_view_shifts_by_protrusion_only() -> Result<()> {
    let mut fx = Fixture::new(1000, 800);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(300, 400);
    let b = fx.spawn_view(300, 400);
    let c = fx.spawn_view(300, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);
    workspace.add_view(&mut fx.ctx(), c, Some(b), false, false);
    fx.ack();

    // b's left edge sits at 310 - 400 = -90
    workspace.scroll_x = 400;
    workspace.arrange_workspace(&mut fx.ctx(), false);
    workspace.fit_view_on_screen(&mut fx.ctx(), b, false);
    assert_eq!(workspace.scroll_x, 310);
    assert_eq!(fx.target(b), Some((0, 0)));

    // Already visible: nothing moves
    workspace.fit_view_on_screen(&mut fx.ctx(), c, false);
    assert_eq!(workspace.scroll_x, 310);

    Ok(())
}

#[test]
fn test_fit_aligns_last_column_when_spanning() -> Result<()> {
    let mut fx = Fixture::new(1000, 800);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(400, 400);
    let b = fx.spawn_view(400, 400);
    let c = fx.spawn_view(400, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);
    workspace.add_view(&mut fx.ctx(), c, Some(b), false, false);
    fx.ack();

    workspace.fit_view_on_screen(&mut fx.ctx(), c, false);
    assert_eq!(workspace.scroll_x, 220);
    let rect = fx.views.get(c).context("view c")?.target_rect();
    assert_eq!(rect.right(), 1000);

    // And back flush left for the first column
    workspace.fit_view_on_screen(&mut fx.ctx(), a, false);
    assert_eq!(workspace.scroll_x, 0);

    Ok(())
}

#[test]
fn test_condense_aligns_first_column() -> Result<()> {
    let mut fx = Fixture::new(1000, 800);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(300, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    fx.ack();
    workspace.scroll_x = -200;
    workspace.arrange_workspace(&mut fx.ctx(), false);

    // Fully visible, but condense pulls it to the left edge anyway
    workspace.fit_view_on_screen(&mut fx.ctx(), a, true);
    assert_eq!(workspace.scroll_x, 0);
    assert_eq!(fx.target(a), Some((0, 0)));

    Ok(())
}

#[test]
fn test_dominant_view_prefers_focused_on_tie() -> Result<()> {
    let mut fx = Fixture::new(1000, 800);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(400, 400);
    let b = fx.spawn_view(400, 400);
    let c = fx.spawn_view(400, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);
    workspace.add_view(&mut fx.ctx(), c, Some(b), false, false);
    fx.ack();

    // a and b fully visible, c partially
    assert_eq!(workspace.find_dominant_view(&fx.views, &fx.outputs, None), Some(a));
    assert_eq!(workspace.find_dominant_view(&fx.views, &fx.outputs, Some(b)), Some(b));
    assert_eq!(workspace.find_dominant_view(&fx.views, &fx.outputs, Some(c)), Some(a));

    // Scroll so that only c is fully visible
    workspace.scroll_x = 500;
    workspace.arrange_workspace(&mut fx.ctx(), false);
    assert_eq!(workspace.find_dominant_view(&fx.views, &fx.outputs, Some(a)), Some(c));

    Ok(())
}

#[test]
fn test_view_workspace_x() -> Result<()> {
    let mut fx = Fixture::new(1000, 800);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(400, 400);
    let b = fx.spawn_view(250, 400);
    let c = fx.spawn_view(400, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);
    workspace.add_view(&mut fx.ctx(), c, Some(b), false, false);
    fx.ack();

    assert_eq!(workspace.get_view_wx(&fx.views, a, fx.gap), 0);
    assert_eq!(workspace.get_view_wx(&fx.views, c, fx.gap), 670);

    Ok(())
}

#[test]
fn test_fullscreen_round_trip_restores_size() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(800, 400);
    let b = fx.spawn_view(600, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);
    fx.ack();
    let before = fx.views.get(a).map(|v| v.geometry).context("view a")?;

    workspace.set_fullscreen_view(&mut fx.ctx(), Some(a));
    assert_eq!(workspace.placement(a), Placement::Fullscreen);
    assert_eq!(fx.last_configure(a), Some((1920, 1080)));
    assert!(fx.probes[&a].borrow().fullscreen);
    fx.ack();

    // Other tiles are left alone while a is fullscreen
    let b_configures = fx.probes[&b].borrow().configures.len();
    workspace.arrange_workspace(&mut fx.ctx(), false);
    assert_eq!(fx.probes[&b].borrow().configures.len(), b_configures);

    workspace.set_fullscreen_view(&mut fx.ctx(), None);
    assert_eq!(workspace.fullscreen_view, None);
    assert!(!fx.probes[&a].borrow().fullscreen);
    fx.ack();

    let after = fx.views.get(a).map(|v| v.geometry).context("view a")?;
    assert_eq!((after.width, after.height), (before.width, before.height));
    // The saved size is kept until the commit handler sees the restore land
    assert_eq!(fx.views.get(a).and_then(|v| v.saved_size), Some((800, 1080)));
    assert_eq!(workspace.placement(a), Placement::Tiled { column: 0, row: 0 });

    Ok(())
}

#[test]
fn test_fullscreen_switch_restores_previous_view() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(800, 400);
    let b = fx.spawn_view(600, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);
    fx.ack();

    workspace.set_fullscreen_view(&mut fx.ctx(), Some(a));
    fx.ack();
    workspace.set_fullscreen_view(&mut fx.ctx(), Some(b));

    assert_eq!(workspace.fullscreen_view, Some(b));
    assert_eq!(fx.last_configure(a), Some((800, 1080)));
    assert_eq!(fx.last_configure(b), Some((1920, 1080)));

    Ok(())
}

#[test]
fn test_removing_fullscreen_view_clears_it() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(800, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    fx.ack();
    workspace.set_fullscreen_view(&mut fx.ctx(), Some(a));
    if let Some(view) = fx.views.get_mut(a) {
        view.mapped = false;
    }

    workspace.remove_view(&mut fx.ctx(), a, false);

    assert_eq!(workspace.fullscreen_view, None);
    assert_eq!(workspace.placement(a), Placement::Untracked);
    assert_eq!(fx.views.get(a).and_then(|v| v.saved_size), None);

    Ok(())
}

#[test]
fn test_transferring_fullscreen_view_defers_arrange() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = fx.workspace();
    let a = fx.spawn_view(800, 400);
    let b = fx.spawn_view(600, 400);

    workspace.add_view(&mut fx.ctx(), a, None, false, false);
    workspace.add_view(&mut fx.ctx(), b, Some(a), false, false);
    fx.ack();
    workspace.set_fullscreen_view(&mut fx.ctx(), Some(a));
    fx.ack();

    let b_configures = fx.probes[&b].borrow().configures.len();
    workspace.remove_view(&mut fx.ctx(), a, true);

    assert_eq!(workspace.fullscreen_view, None);
    assert_eq!(workspace.placement(a), Placement::Untracked);
    assert!(!fx.probes[&a].borrow().fullscreen);
    assert_eq!(fx.last_configure(a), Some((800, 1080)));
    // b is laid out by whoever finishes the transfer
    assert_eq!(fx.probes[&b].borrow().configures.len(), b_configures);

    Ok(())
}

#[test]
fn test_activate_and_deactivate() -> Result<()> {
    let mut fx = Fixture::new(1920, 1080);
    let mut workspace = Workspace::new(1);
    let a = fx.spawn_view(800, 400);
    workspace.add_view(&mut fx.ctx(), a, None, false, false);

    workspace.activate(fx.output);
    assert_eq!(workspace.output, Some(fx.output));
    workspace.arrange_workspace(&mut fx.ctx(), false);
    assert_eq!(fx.last_configure(a), Some((800, 1080)));

    // Deactivation leaves the views where they are
    workspace.deactivate();
    assert_eq!(workspace.output, None);
    assert!(workspace.contains(a));
    assert!(fx.views.get(a).map(|v| v.mapped).unwrap_or(false));

    Ok(())
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Add { view: usize, next_to: usize, floating: bool },
        Remove { view: usize },
        Stack { view: usize, column: usize },
        Pop { column: usize },
        Fullscreen { view: Option<usize> },
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..8, 0usize..8, any::<bool>())
                .prop_map(|(view, next_to, floating)| Op::Add { view, next_to, floating }),
            (0usize..8).prop_map(|view| Op::Remove { view }),
            (0usize..8, 0usize..8).prop_map(|(view, column)| Op::Stack { view, column }),
            (0usize..8).prop_map(|column| Op::Pop { column }),
            proptest::option::of(0usize..8).prop_map(|view| Op::Fullscreen { view }),
        ]
    }

    fn apply(fx: &mut Fixture, workspace: &mut Workspace, ids: &[ViewId], op: &Op) {
        match *op {
            Op::Add { view, next_to, floating } => {
                if !workspace.contains(ids[view]) {
                    workspace.add_view(&mut fx.ctx(), ids[view], Some(ids[next_to]), floating, false);
                }
            }
            Op::Remove { view } => workspace.remove_view(&mut fx.ctx(), ids[view], false),
            Op::Stack { view, column } => {
                if workspace.find_column(ids[view]).is_some() {
                    workspace.insert_into_column(&mut fx.ctx(), ids[view], column);
                }
            }
            Op::Pop { column } => workspace.pop_from_column(&mut fx.ctx(), column),
            Op::Fullscreen { view } => {
                let target = view.map(|v| ids[v]).filter(|&v| workspace.contains(v));
                workspace.set_fullscreen_view(&mut fx.ctx(), target);
            }
        }
        fx.ack();
    }

    proptest! {
        #[test]
        fn test_every_view_has_one_placement(ops in prop::collection::vec(op(), 1..40)) {
            let mut fx = Fixture::new(1920, 1080);
            let mut workspace = fx.workspace();
            let ids: Vec<ViewId> = (0..8).map(|_| fx.spawn_view(500, 400)).collect();

            for op in &ops {
                apply(&mut fx, &mut workspace, &ids, op);

                for &id in &ids {
                    let tiled = workspace.find_column(id).is_some();
                    let floating = workspace.is_view_floating(id);
                    // A view never sits in two containers at once
                    prop_assert!(!(tiled && floating));
                    prop_assert!(workspace.tiled_views().filter(|&v| v == id).count() <= 1);
                    if workspace.fullscreen_view == Some(id) {
                        prop_assert_eq!(workspace.placement(id), Placement::Fullscreen);
                    }
                }
            }
        }

        #[test]
        fn test_columns_are_never_empty(ops in prop::collection::vec(op(), 1..40)) {
            let mut fx = Fixture::new(1920, 1080);
            let mut workspace = fx.workspace();
            let ids: Vec<ViewId> = (0..8).map(|_| fx.spawn_view(500, 400)).collect();

            for op in &ops {
                apply(&mut fx, &mut workspace, &ids, op);
                prop_assert!(workspace.columns.iter().all(|c| !c.tiles.is_empty()));
            }
        }

        #[test]
        fn test_arrange_twice_changes_nothing(
            ops in prop::collection::vec(op(), 1..30),
            scroll in -2000i32..2000
        ) {
            let mut fx = Fixture::new(1920, 1080);
            let mut workspace = fx.workspace();
            let ids: Vec<ViewId> = (0..8).map(|_| fx.spawn_view(500, 400)).collect();
            for op in &ops {
                apply(&mut fx, &mut workspace, &ids, op);
            }
            workspace.scroll_x = scroll;

            workspace.arrange_workspace(&mut fx.ctx(), false);
            fx.ack();
            let first: Vec<_> = ids.iter().map(|&id| (fx.target(id), fx.last_configure(id))).collect();

            workspace.arrange_workspace(&mut fx.ctx(), false);
            fx.ack();
            let second: Vec<_> = ids.iter().map(|&id| (fx.target(id), fx.last_configure(id))).collect();

            prop_assert_eq!(first, second);
        }
    }
}
