//! Image-level building blocks shared by the stages.
//!
//! * `geometry` - Points, dimensions and axis-aligned boxes in page pixels
//! * `sampling` - Turning a bubble's pixels into one intensity value

pub mod geometry;
pub mod sampling;

pub use geometry::{BoundingBox, Dimensions, Point};
pub use sampling::{IntensitySampler, MeanIntensitySampler};
