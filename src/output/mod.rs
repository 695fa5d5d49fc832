//! Output (monitor) tracking
//!
//! The output manager owns every attached display and knows where each one sits
//! in the shared layout space. It also stores the usable area of each output,
//! i.e. the part of the screen left over after layer-shell surfaces (panels,
//! docks) have reserved their exclusive zones.

use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::geometry::Rect;

/// Stable identifier of an attached output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OutputId(pub u64);

/// A physical display
#[derive(Debug, Clone)]
pub struct Output {
    pub id: OutputId,

    /// Connector name reported by the backend (e.g. "DP-1")
    pub name: String,

    /// Box of the output in layout space
    pub layout_box: Rect,

    /// Usable area relative to the output origin (not layout space)
    pub usable_area: Rect,

    /// Timestamp of the last presented frame
    pub last_present: Option<Instant>,
}

impl Output {
    fn new(id: OutputId, name: String, layout_box: Rect) -> Self {
        Self {
            id,
            name,
            layout_box,
            usable_area: Rect::new(0, 0, layout_box.width, layout_box.height),
            last_present: None,
        }
    }
}

/// Owner of the output set
#[derive(Debug, Default)]
pub struct OutputManager {
    outputs: BTreeMap<OutputId, Output>,
    next_output_id: u64,
}

impl OutputManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new output placed at `layout_box` and returns its id.
    pub fn add_output(&mut self, name: impl Into<String>, layout_box: Rect) -> OutputId {
        let id = OutputId(self.next_output_id);
        self.next_output_id += 1;

        let output = Output::new(id, name.into(), layout_box);
        info!(
            "Output {} added at {}x{}+{}+{}",
            output.name, layout_box.width, layout_box.height, layout_box.x, layout_box.y
        );
        self.outputs.insert(id, output);
        id
    }

    /// Removes `id` from the output list. Doesn't do anything else.
    pub fn remove_output(&mut self, id: OutputId) -> Option<Output> {
        let removed = self.outputs.remove(&id);
        if let Some(output) = &removed {
            info!("Output {} removed", output.name);
        }
        removed
    }

    pub fn get(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(&id)
    }

    pub fn get_mut(&mut self, id: OutputId) -> Option<&mut Output> {
        self.outputs.get_mut(&id)
    }

    /// Iterates over outputs in the order they were attached.
    pub fn outputs(&self) -> impl Iterator<Item = &Output> {
        self.outputs.values()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Returns the box of an output in the output layout.
    pub fn get_output_box(&self, id: OutputId) -> Option<Rect> {
        self.outputs.get(&id).map(|o| o.layout_box)
    }

    /// Returns the usable area of the output in layout space.
    pub fn get_output_real_usable_area(&self, id: OutputId) -> Option<Rect> {
        self.outputs.get(&id).map(|o| {
            Rect::new(
                o.layout_box.x + o.usable_area.x,
                o.layout_box.y + o.usable_area.y,
                o.usable_area.width,
                o.usable_area.height,
            )
        })
    }

    /// Stores a new usable area, relative to the output origin.
    pub fn set_usable_area(&mut self, id: OutputId, usable_area: Rect) {
        if let Some(output) = self.outputs.get_mut(&id) {
            if output.usable_area != usable_area {
                debug!(
                    "Usable area of {} is now {}x{}+{}+{}",
                    output.name, usable_area.width, usable_area.height, usable_area.x, usable_area.y
                );
            }
            output.usable_area = usable_area;
        }
    }

    /// Moves or resizes an output (mode change, layout reconfiguration).
    ///
    /// The usable area is reset to the whole output; layers must be re-arranged afterwards.
    pub fn set_output_box(&mut self, id: OutputId, layout_box: Rect) {
        if let Some(output) = self.outputs.get_mut(&id) {
            output.layout_box = layout_box;
            output.usable_area = Rect::new(0, 0, layout_box.width, layout_box.height);
        }
    }

    /// Returns the output under the given point, if any.
    pub fn get_output_at(&self, lx: f64, ly: f64) -> Option<OutputId> {
        self.outputs
            .values()
            .find(|o| o.layout_box.contains(lx, ly))
            .map(|o| o.id)
    }

    /// Returns true if the `reference` output contains the given point.
    pub fn output_contains_point(&self, reference: OutputId, lx: i32, ly: i32) -> bool {
        self.outputs
            .get(&reference)
            .map(|o| o.layout_box.contains(lx as f64, ly as f64))
            .unwrap_or(false)
    }

    /// Records that a frame was presented on the output.
    pub fn mark_presented(&mut self, id: OutputId, when: Instant) {
        if let Some(output) = self.outputs.get_mut(&id) {
            output.last_present = Some(when);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usable_area_is_reported_in_layout_space() {
        let mut manager = OutputManager::new();
        let id = manager.add_output("DP-1", Rect::new(1920, 0, 2560, 1440));
        manager.set_usable_area(id, Rect::new(0, 30, 2560, 1410));

        assert_eq!(
            manager.get_output_real_usable_area(id),
            Some(Rect::new(1920, 30, 2560, 1410))
        );
    }

    #[test]
    fn output_lookup_by_point() {
        let mut manager = OutputManager::new();
        let left = manager.add_output("HDMI-A-1", Rect::new(0, 0, 1920, 1080));
        let right = manager.add_output("DP-1", Rect::new(1920, 0, 1920, 1080));

        assert_eq!(manager.get_output_at(10.0, 10.0), Some(left));
        assert_eq!(manager.get_output_at(1920.0, 500.0), Some(right));
        assert_eq!(manager.get_output_at(4000.0, 0.0), None);
        assert!(manager.output_contains_point(right, 3000, 1000));
        assert!(!manager.output_contains_point(left, 3000, 1000));
    }

    #[test]
    fn removed_output_is_forgotten() {
        let mut manager = OutputManager::new();
        let id = manager.add_output("DP-1", Rect::new(0, 0, 800, 600));
        assert!(manager.remove_output(id).is_some());
        assert!(manager.get(id).is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn presentation_timestamp_is_recorded() {
        let mut manager = OutputManager::new();
        let id = manager.add_output("DP-1", Rect::new(0, 0, 800, 600));
        assert!(manager.get(id).and_then(|o| o.last_present).is_none());

        let now = Instant::now();
        manager.mark_presented(id, now);
        assert_eq!(manager.get(id).and_then(|o| o.last_present), Some(now));
    }
}
