//! View movement animations
//!
//! Layout changes do not teleport views: the workspace engine records the
//! target position and queues a task here. Every frame tick moves each view a
//! bit closer along a smoothstep curve until it arrives.
//!
//! Cancelling a task only flags it; flagged tasks are dropped the next time the
//! queue is walked, so cancellation is safe from inside a tick.

use log::trace;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::AnimationConfig;
use crate::view::{ViewArena, ViewId};

/// Timing parameters of the animation engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSettings {
    pub enabled: bool,
    pub duration: Duration,
    pub frame_interval: Duration,
}

impl From<&AnimationConfig> for AnimationSettings {
    fn from(config: &AnimationConfig) -> Self {
        Self {
            enabled: config.enabled,
            duration: Duration::from_millis(config.duration_ms),
            frame_interval: Duration::from_millis(config.frame_interval_ms),
        }
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self::from(&AnimationConfig::default())
    }
}

#[derive(Debug, Clone)]
struct AnimationTask {
    view: ViewId,
    start_x: i32,
    start_y: i32,
    target_x: i32,
    target_y: i32,
    begin: Instant,
    cancelled: bool,
}

/// Queue of in-flight view movements
#[derive(Debug)]
pub struct ViewAnimation {
    settings: AnimationSettings,
    tasks: VecDeque<AnimationTask>,
}

/// Smoothstep easing, clamped to 1.0 past the end.
fn bezier_blend(t: f32) -> f32 {
    let t = t.min(1.0);
    t * t * (3.0 - 2.0 * t)
}

impl ViewAnimation {
    pub fn new(settings: AnimationSettings) -> Self {
        Self {
            settings,
            tasks: VecDeque::new(),
        }
    }

    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: AnimationSettings) {
        self.settings = settings;
    }

    pub fn enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Starts moving `view` from where it is now towards its target.
    ///
    /// Any task already running for the view is superseded.
    pub fn enqueue_task(&mut self, views: &mut ViewArena, view: ViewId, target_x: i32, target_y: i32, now: Instant) {
        self.forget(view);

        let Some(v) = views.get_mut(view) else {
            return;
        };
        v.target_x = target_x;
        v.target_y = target_y;

        if v.x == target_x && v.y == target_y {
            return;
        }

        self.tasks.push_back(AnimationTask {
            view,
            start_x: v.x,
            start_y: v.y,
            target_x,
            target_y,
            begin: now,
            cancelled: false,
        });
    }

    /// Flags every task of `view` as cancelled and snaps the view to its target.
    pub fn cancel_tasks(&mut self, views: &mut ViewArena, view: ViewId) {
        let mut had_tasks = false;
        for task in self.tasks.iter_mut().filter(|t| t.view == view) {
            task.cancelled = true;
            had_tasks = true;
        }

        if had_tasks {
            if let Some(v) = views.get_mut(view) {
                let (x, y) = (v.target_x, v.target_y);
                v.move_to(x, y);
            }
        }
    }

    /// Flags the tasks of `view` without moving it.
    pub fn forget(&mut self, view: ViewId) {
        for task in self.tasks.iter_mut().filter(|t| t.view == view) {
            task.cancelled = true;
        }
    }

    /// Whether `view` has a live task.
    pub fn is_animating(&self, view: ViewId) -> bool {
        self.tasks.iter().any(|t| t.view == view && !t.cancelled)
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.iter().all(|t| t.cancelled)
    }

    /// Advances every live task to `now`. Returns the number still running.
    pub fn tick(&mut self, views: &mut ViewArena, now: Instant) -> usize {
        let duration_ms = self.settings.duration.as_millis().max(1) as f32;

        let pending = self.tasks.len();
        for _ in 0..pending {
            let Some(task) = self.tasks.pop_front() else {
                break;
            };
            if task.cancelled {
                continue;
            }
            let Some(view) = views.get_mut(task.view) else {
                continue;
            };

            let elapsed = now.saturating_duration_since(task.begin).as_millis() as f32;
            let completeness = elapsed / duration_ms;
            let multiplier = bezier_blend(completeness);

            let x = task.start_x as f32 - multiplier * (task.start_x - task.target_x) as f32;
            let y = task.start_y as f32 - multiplier * (task.start_y - task.target_y) as f32;
            view.move_to(x.round() as i32, y.round() as i32);

            if completeness < 0.999 {
                self.tasks.push_back(task);
            } else {
                view.move_to(task.target_x, task.target_y);
                trace!("{} arrived at ({}, {})", task.view, task.target_x, task.target_y);
            }
        }

        self.tasks.len()
    }
}
