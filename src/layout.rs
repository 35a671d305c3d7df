//! Geometry for watermark placement
//!
//! Rectangles in image pixel space (origin top-left, y down), the square
//! ring walk used for tiling, and point/pixel conversions for PDF pages.

use tiny_skia::{Point, Transform};

/// Simple length type in PDF points (1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length(pub f32);

impl Length {
    /// Create a length from points
    pub fn from_pt(pt: f32) -> Self {
        Length(pt)
    }

    /// Get the value in points
    pub fn pt(&self) -> f32 {
        self.0
    }

    /// Number of pixels this length covers at `dpi` dots per inch
    pub fn to_pixels(&self, dpi: f32) -> f32 {
        self.0 * dpi / 72.0
    }
}

/// Pixel dimensions of a page of `width` x `height` points rasterized at `dpi`
pub fn scaled_dimensions(width: Length, height: Length, dpi: u32) -> (u32, u32) {
    let dpi = dpi as f32;
    (
        width.to_pixels(dpi).round().max(0.0) as u32,
        height.to_pixels(dpi).round().max(0.0) as u32,
    )
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// The full area of a `width` x `height` pixel image
    pub fn of_image(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    /// A `width` x `height` rectangle centered inside `outer`
    pub fn centered_in(outer: &Rect, width: f32, height: f32) -> Self {
        Self::new(
            outer.x + (outer.width - width) / 2.0,
            outer.y + (outer.height - height) / 2.0,
            width,
            height,
        )
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// True when the two rectangles share a region of non-zero area
    ///
    /// Touching edges do not count, and an empty rectangle intersects nothing.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x.max(other.x) < self.right().min(other.right())
            && self.y.max(other.y) < self.bottom().min(other.bottom())
    }

    /// Bounding box of this rectangle after `transform`
    pub fn map(&self, transform: &Transform) -> Rect {
        let mut corners = [
            Point::from_xy(self.x, self.y),
            Point::from_xy(self.right(), self.y),
            Point::from_xy(self.right(), self.bottom()),
            Point::from_xy(self.x, self.bottom()),
        ];
        transform.map_points(&mut corners);

        let (mut left, mut top) = (f32::INFINITY, f32::INFINITY);
        let (mut right, mut bottom) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for corner in &corners {
            left = left.min(corner.x);
            top = top.min(corner.y);
            right = right.max(corner.x);
            bottom = bottom.max(corner.y);
        }

        Rect::new(left, top, right - left, bottom - top)
    }
}

/// Tile grid coordinates at Chebyshev distance `radius` from the center
///
/// Order: top edge left to right, bottom edge left to right, then the left
/// edge top to bottom and the right edge top to bottom, corners excluded
/// from the side edges. Radius 0 yields just the center.
///
/// Tiles of one ring are painted with the same color, so the order of the
/// top and bottom edges does not change the composited result.
pub fn ring(radius: i32) -> impl Iterator<Item = (i32, i32)> {
    let radius = radius.abs();
    let top = (-radius..=radius).map(move |x| (x, -radius));
    let bottom = (-radius..=radius)
        .filter(move |_| radius > 0)
        .map(move |x| (x, radius));
    let left = (-radius + 1..radius).map(move |y| (-radius, y));
    let right = (-radius + 1..radius).map(move |y| (radius, y));

    top.chain(bottom).chain(left).chain(right)
}
