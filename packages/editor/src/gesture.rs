//! Pointer drag on a bounding box.
//!
//! A drag starts on the box body (move) or on one of its handles, turns
//! throttled pointer moves into bounding-box edits, and on release either
//! ends quietly or, if nothing moved, toggles the annotation's selection.

use crate::geometry::{apply_handle_action, compute_delta, ClampPolicy, GrowthFactor, HandleAction, Point};
use crate::model::BoundingBox;
use crate::mutations::{Edit, Mutation};
use crate::path::Path;
use crate::value::Value;
use std::time::{Duration, Instant};

/// Minimum spacing between two applied moves
pub const MOVE_THROTTLE: Duration = Duration::from_millis(50);

/// In-progress pointer drag on one annotation
#[derive(Debug, Clone)]
pub struct DragGesture {
    index: usize,
    action: HandleAction,
    anchor: Point,
    last_applied: Option<Instant>,
    performed: bool,
    clamp: ClampPolicy,
}

impl DragGesture {
    /// Pointer-down on the annotation at `index`
    pub fn begin(index: usize, action: HandleAction, pointer: Point) -> Self {
        Self {
            index,
            action,
            anchor: pointer,
            last_applied: None,
            performed: false,
            clamp: ClampPolicy::default(),
        }
    }

    pub fn with_clamp(mut self, clamp: ClampPolicy) -> Self {
        self.clamp = clamp;
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn action(&self) -> HandleAction {
        self.action
    }

    /// Whether any move has changed the box so far
    pub fn performed(&self) -> bool {
        self.performed
    }

    /// Pointer moved to `pointer` (screen space) at time `now`.
    ///
    /// Returns the bounding-box edit to apply, or `None` when the move is
    /// throttled or rounds to no change. Dropped moves keep the anchor, so
    /// small motions accumulate until they amount to a whole pixel.
    pub fn pointer_move(
        &mut self,
        pointer: Point,
        current: BoundingBox,
        growth: GrowthFactor,
        now: Instant,
    ) -> Option<Mutation> {
        if let Some(last) = self.last_applied {
            if now.saturating_duration_since(last) < MOVE_THROTTLE {
                return None;
            }
        }

        let delta_screen = Point::new(pointer.x - self.anchor.x, pointer.y - self.anchor.y);
        let delta = compute_delta(delta_screen, growth);
        if delta.x == 0.0 && delta.y == 0.0 {
            return None;
        }

        let updated = self.clamp.apply(apply_handle_action(current, self.action, delta));
        self.anchor = pointer;
        self.last_applied = Some(now);
        self.performed = true;

        Some(Mutation::new(
            Path::annotation(self.index, &["bounding_box"]),
            Edit::Set(Value::from(updated)),
        ))
    }

    /// Pointer released.
    ///
    /// A press-release that never changed the box is a click and toggles
    /// the annotation's selection.
    pub fn release(self, is_selected: bool) -> Option<Mutation> {
        if self.performed {
            return None;
        }
        Some(Mutation::new(
            Path::annotation(self.index, &["isSelected"]),
            Edit::Set(Value::Bool(!is_selected)),
        ))
    }
}
