use serde::{Deserialize, Serialize};

/// Axis-aligned box, `x`/`y` is the top-left corner.
/// Both predicates work on closed intervals, so touching boxes overlap.
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[inline]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect { x, y, width, height }
    }

    #[inline]
    pub fn square(x: f64, y: f64, size: f64) -> Self {
        Rect::new(x, y, size, size)
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[inline]
    pub fn cx(&self) -> f64 {
        self.x + self.width / 2.0
    }

    #[inline]
    pub fn cy(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// finite coordinates and a non-negative size
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
            && self.width.is_finite() && self.height.is_finite()
            && self.width >= 0.0 && self.height >= 0.0
    }

    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x <= other.right() && other.x <= self.right()
            && self.y <= other.bottom() && other.y <= self.bottom()
    }

    /// `other` lies fully inside `self` on both axes
    #[inline]
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x && other.right() <= self.right()
            && other.y >= self.y && other.bottom() <= self.bottom()
    }
}
