//! Screen geometry in a Y-up coordinate space.
//!
//! All rectangles and points here use the convention that Y grows upward:
//! `top()` is the *maximum* Y of a rectangle and `bottom()` its origin.
//! The X11 backend converts from Y-down root coordinates at the boundary
//! (see [`Rect::from_y_down`]); nothing past that boundary sees Y-down values.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert a Y-down point on a root of `root_height` into Y-up space
    pub fn from_y_down(x: f64, y: f64, root_height: f64) -> Self {
        Self::new(x, root_height - y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when either dimension differs from `other` by more than `tolerance`
    pub fn differs_from(&self, other: Size, tolerance: f64) -> bool {
        (self.width - other.width).abs() > tolerance
            || (self.height - other.height).abs() > tolerance
    }
}

/// Rectangle anchored at its bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub const fn from_parts(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// Convert a Y-down rectangle (top-left origin) on a root of `root_height`
    pub fn from_y_down(x: f64, y: f64, width: f64, height: f64, root_height: f64) -> Self {
        Self::new(x, root_height - (y + height), width, height)
    }

    /// Top-left corner in Y-down space, rounded to whole pixels
    pub fn to_y_down_origin(&self, root_height: f64) -> (i32, i32) {
        (
            self.origin.x.round() as i32,
            (root_height - self.top()).round() as i32,
        )
    }

    pub fn left(&self) -> f64 {
        self.origin.x
    }

    pub fn right(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> f64 {
        self.origin.y
    }

    pub fn top(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let right = self.right().min(other.right());
        let bottom = self.bottom().max(other.bottom());
        let top = self.top().min(other.top());
        if right <= left || top <= bottom {
            return None;
        }
        Some(Rect::new(left, bottom, right - left, top - bottom))
    }
}
