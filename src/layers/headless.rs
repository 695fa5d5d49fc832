//! In-memory layer surfaces that record what they were told.

use std::cell::RefCell;
use std::rc::Rc;

use super::LayerShellSurface;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LayerProbeState {
    pub configures: Vec<(i32, i32)>,
    pub closed: bool,
}

pub type LayerProbe = Rc<RefCell<LayerProbeState>>;

#[derive(Debug, Default)]
pub struct RecordingLayer {
    state: LayerProbe,
}

impl RecordingLayer {
    pub fn probe(&self) -> LayerProbe {
        Rc::clone(&self.state)
    }
}

impl LayerShellSurface for RecordingLayer {
    fn configure(&mut self, width: i32, height: i32) {
        self.state.borrow_mut().configures.push((width, height));
    }

    fn close(&mut self) {
        self.state.borrow_mut().closed = true;
    }
}
