//! # Geometry
//!
//! Bounding boxes are stored in unscaled frame pixels. The canvas shows the
//! frame at a zoom-dependent size, so pointer motion arrives in screen
//! pixels and must be divided by the growth factor before it can edit a box.
//!
//! ```text
//! displayed_width  = W + zoom
//! displayed_height = H / W * displayed_width
//! growth           = displayed / native      (per axis)
//! ```

use crate::model::BoundingBox;
use std::fmt;
use std::str::FromStr;

/// Prefix used by the handle elements of a rendered box
pub const HANDLE_PREFIX: &str = "BoundingBox-";

/// Zoom step per wheel unit
pub const ZOOM_STEP: f64 = 0.1;

/// Zoom step per wheel unit while shift is held
pub const ZOOM_STEP_FAST: f64 = 0.5;

/// A pair of screen or model coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// On-screen size / native size, per axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthFactor {
    pub x: f64,
    pub y: f64,
}

impl GrowthFactor {
    pub const IDENTITY: Self = Self { x: 1.0, y: 1.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Growth for a frame of `width × height` at the given zoom.
    ///
    /// `None` for frames without a usable size.
    pub fn from_zoom(width: f64, height: f64, zoom: f64) -> Option<Self> {
        let displayed = DisplaySize::at_zoom(width, height, zoom)?;
        Some(Self {
            x: displayed.width / width,
            y: displayed.height / height,
        })
    }
}

impl Default for GrowthFactor {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Size of the frame as drawn on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub fn at_zoom(width: f64, height: f64, zoom: f64) -> Option<Self> {
        if width == 0.0 || height == 0.0 || !width.is_finite() || !height.is_finite() {
            return None;
        }
        let displayed_width = width + zoom;
        // Zoomed out to nothing or past it
        if !displayed_width.is_finite() || displayed_width <= 0.0 {
            return None;
        }
        Some(Self {
            width: displayed_width,
            height: height / width * displayed_width,
        })
    }

    /// Whole-pixel size reported to the user
    pub fn rounded(&self) -> (i64, i64) {
        (self.width.round() as i64, self.height.round() as i64)
    }
}

/// Convert a screen-space pointer delta into a model-space delta
pub fn compute_delta(delta_screen: Point, growth: GrowthFactor) -> Point {
    Point {
        x: (delta_screen.x / growth.x).round(),
        y: (delta_screen.y / growth.y).round(),
    }
}

/// What a pointer drag does to a box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleAction {
    Move,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl HandleAction {
    pub const ALL: [HandleAction; 9] = [
        HandleAction::Move,
        HandleAction::Top,
        HandleAction::Bottom,
        HandleAction::Left,
        HandleAction::Right,
        HandleAction::TopLeft,
        HandleAction::TopRight,
        HandleAction::BottomLeft,
        HandleAction::BottomRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HandleAction::Move => "move",
            HandleAction::Top => "top",
            HandleAction::Bottom => "bottom",
            HandleAction::Left => "left",
            HandleAction::Right => "right",
            HandleAction::TopLeft => "top-left",
            HandleAction::TopRight => "top-right",
            HandleAction::BottomLeft => "bottom-left",
            HandleAction::BottomRight => "bottom-right",
        }
    }

    /// Horizontal edge that moves, if any
    fn horizontal(&self) -> Option<Edge> {
        match self {
            HandleAction::Left | HandleAction::TopLeft | HandleAction::BottomLeft => Some(Edge::Near),
            HandleAction::Right | HandleAction::TopRight | HandleAction::BottomRight => Some(Edge::Far),
            _ => None,
        }
    }

    /// Vertical edge that moves, if any
    fn vertical(&self) -> Option<Edge> {
        match self {
            HandleAction::Top | HandleAction::TopLeft | HandleAction::TopRight => Some(Edge::Near),
            HandleAction::Bottom | HandleAction::BottomLeft | HandleAction::BottomRight => Some(Edge::Far),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    Near,
    Far,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownHandle(pub String);

impl fmt::Display for UnknownHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown handle '{}'", self.0)
    }
}

impl std::error::Error for UnknownHandle {}

impl FromStr for HandleAction {
    type Err = UnknownHandle;

    /// Accepts `top-left`, the element class `BoundingBox-top-left`, and the
    /// bare body class `BoundingBox`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == HANDLE_PREFIX.trim_end_matches('-') {
            return Ok(HandleAction::Move);
        }
        let name = s.strip_prefix(HANDLE_PREFIX).unwrap_or(s);
        HandleAction::ALL
            .into_iter()
            .find(|action| action.as_str() == name)
            .ok_or_else(|| UnknownHandle(s.to_string()))
    }
}

impl fmt::Display for HandleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Treatment of negative sizes after a handle action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClampPolicy {
    /// Boxes may invert
    #[default]
    Unclamped,

    /// Width and height never drop below zero
    ClampToZero,
}

impl ClampPolicy {
    pub fn apply(&self, b: BoundingBox) -> BoundingBox {
        match self {
            ClampPolicy::Unclamped => b,
            ClampPolicy::ClampToZero => BoundingBox {
                width: b.width.max(0.0),
                height: b.height.max(0.0),
                ..b
            },
        }
    }
}

/// Apply a model-space delta to a box.
///
/// Near edges (top, left) move the coordinate and shrink the opposite
/// dimension by the same amount; far edges (bottom, right) only change the
/// dimension.
pub fn apply_handle_action(b: BoundingBox, action: HandleAction, delta: Point) -> BoundingBox {
    let mut out = b;

    if action == HandleAction::Move {
        out.x += delta.x;
        out.y += delta.y;
        return out;
    }

    match action.horizontal() {
        Some(Edge::Near) => {
            out.x += delta.x;
            out.width -= delta.x;
        }
        Some(Edge::Far) => out.width += delta.x,
        None => {}
    }
    match action.vertical() {
        Some(Edge::Near) => {
            out.y += delta.y;
            out.height -= delta.y;
        }
        Some(Edge::Far) => out.height += delta.y,
        None => {}
    }

    out
}

/// Scaled presentation of a stored box
pub fn to_screen(b: BoundingBox, growth: GrowthFactor) -> BoundingBox {
    BoundingBox {
        x: b.x * growth.x,
        y: b.y * growth.y,
        width: b.width * growth.x,
        height: b.height * growth.y,
    }
}

/// Map a pointer position on the canvas back to frame pixels
pub fn screen_to_model(point: Point, growth: GrowthFactor) -> Point {
    Point {
        x: point.x / growth.x,
        y: point.y / growth.y,
    }
}

/// Wheel-driven zoom of the canvas
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ZoomState {
    /// Pixels added to the native frame width; may be negative
    pub scale: f64,
}

impl ZoomState {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    /// Handle a wheel event; only ctrl+wheel zooms.
    ///
    /// Returns whether the zoom changed.
    pub fn on_wheel(&mut self, delta_y: f64, ctrl: bool, shift: bool) -> bool {
        if !ctrl {
            return false;
        }
        let step = if shift { ZOOM_STEP_FAST } else { ZOOM_STEP };
        let next = self.scale - delta_y * step;
        let changed = next != self.scale;
        self.scale = next;
        changed
    }

    pub fn growth(&self, width: f64, height: f64) -> Option<GrowthFactor> {
        GrowthFactor::from_zoom(width, height, self.scale)
    }

    pub fn display_size(&self, width: f64, height: f64) -> Option<DisplaySize> {
        DisplaySize::at_zoom(width, height, self.scale)
    }

    /// Zoom read-out, `W / displayed_width * 100`
    pub fn percent(&self, width: f64, height: f64) -> Option<f64> {
        let displayed = self.display_size(width, height)?;
        Some(width / displayed.width * 100.0)
    }
}
