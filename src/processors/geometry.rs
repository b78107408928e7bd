//! Geometric primitives for sheet layout and detector output.
//!
//! Coordinates are page pixels with the origin at the top-left corner and
//! `y` growing downward.

use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f64,
    /// Y-coordinate of the point.
    pub y: f64,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns this point moved by `(dx, dy)`.
    #[inline]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Width and height of a rectangular region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    #[inline]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    /// Creates a bounding box from corner coordinates.
    ///
    /// The corners are normalized so that `x_min <= x_max` and `y_min <= y_max`.
    ///
    /// # Arguments
    ///
    /// * `x1` - The x-coordinate of the first corner.
    /// * `y1` - The y-coordinate of the first corner.
    /// * `x2` - The x-coordinate of the opposite corner.
    /// * `y2` - The y-coordinate of the opposite corner.
    pub fn from_coords(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x_min: x1.min(x2),
            y_min: y1.min(y2),
            x_max: x1.max(x2),
            y_max: y1.max(y2),
        }
    }

    /// Creates a bounding box from a top-left origin and its dimensions.
    pub fn from_origin(origin: Point, dimensions: Dimensions) -> Self {
        Self::from_coords(
            origin.x,
            origin.y,
            origin.x + dimensions.width,
            origin.y + dimensions.height,
        )
    }

    /// Top-left corner.
    pub fn origin(&self) -> Point {
        Point::new(self.x_min, self.y_min)
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Center of the box.
    pub fn center(&self) -> Point {
        Point::new(
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// Returns this box moved by `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x_min: self.x_min + dx,
            y_min: self.y_min + dy,
            x_max: self.x_max + dx,
            y_max: self.y_max + dy,
        }
    }

    /// Clamps the box to an image of `width` x `height` pixels and returns
    /// integer pixel bounds `(x0, y0, x1, y1)` with exclusive upper edges.
    ///
    /// Returns `None` when nothing of the box lies inside the image.
    pub fn clamp_to_image(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x_min.floor().max(0.0);
        let y0 = self.y_min.floor().max(0.0);
        let x1 = self.x_max.ceil().min(width as f64);
        let y1 = self.y_max.ceil().min(height as f64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_coords_normalizes_corners() {
        let bbox = BoundingBox::from_coords(10.0, 20.0, 0.0, 5.0);
        assert_eq!(bbox.x_min, 0.0);
        assert_eq!(bbox.y_max, 20.0);
        assert_eq!(bbox.center(), Point::new(5.0, 12.5));
    }

    #[test]
    fn test_clamp_to_image() {
        let bbox = BoundingBox::from_coords(-5.0, -5.0, 4.5, 3.0);
        assert_eq!(bbox.clamp_to_image(10, 10), Some((0, 0, 5, 3)));

        let outside = BoundingBox::from_coords(20.0, 20.0, 30.0, 30.0);
        assert_eq!(outside.clamp_to_image(10, 10), None);
    }

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        assert_eq!(a.distance_to(&Point::new(3.0, 4.0)), 5.0);
        assert_eq!(a.translated(1.0, -1.0), Point::new(1.0, -1.0));
    }
}
