//! Intensity sampling of scan boxes.

use image::GrayImage;
use std::fmt::Debug;

use crate::core::constants::MAX_INTENSITY;
use crate::core::errors::OmrResult;
use crate::domain::{Field, IntensitySample};
use crate::processors::geometry::Point;

/// Measures the darkness of every item of a field.
///
/// Implementations return one sample per item of `field`, in item order.
pub trait IntensitySampler: Send + Sync + Debug {
    /// Samples `field` on `image` with every item moved by `shift`.
    fn sample_field(
        &self,
        image: &GrayImage,
        field: &Field,
        shift: Point,
    ) -> OmrResult<Vec<IntensitySample>>;
}

/// Averages the gray level inside each scan box.
///
/// Boxes are clamped to the image; a box entirely outside the image reads as
/// white (255).
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanIntensitySampler;

impl MeanIntensitySampler {
    /// Mean intensity of the pixels in `[x0, x1) x [y0, y1)`.
    fn region_mean(image: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) -> f64 {
        let mut sum: u64 = 0;
        for y in y0..y1 {
            for x in x0..x1 {
                sum += u64::from(image.get_pixel(x, y)[0]);
            }
        }
        let count = u64::from(x1 - x0) * u64::from(y1 - y0);
        sum as f64 / count as f64
    }
}

impl IntensitySampler for MeanIntensitySampler {
    fn sample_field(
        &self,
        image: &GrayImage,
        field: &Field,
        shift: Point,
    ) -> OmrResult<Vec<IntensitySample>> {
        let (width, height) = image.dimensions();
        Ok(field
            .items
            .iter()
            .map(|item| {
                let bbox = item.bbox(shift);
                let value = match bbox.clamp_to_image(width, height) {
                    Some((x0, y0, x1, y1)) => Self::region_mean(image, x0, y0, x1, y1),
                    None => MAX_INTENSITY,
                };
                IntensitySample::new(value, bbox.origin(), item.label.clone())
            })
            .collect())
    }
}
