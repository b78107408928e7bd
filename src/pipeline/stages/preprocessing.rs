//! Image preprocessing stage.

use image::GrayImage;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

use super::{OmrStage, StageMetrics};
use crate::core::errors::OmrResult;
use crate::pipeline::context::ProcessingContext;

/// A pluggable image filter applied before alignment.
pub trait ImagePreprocessor: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Returns the filtered image.
    fn apply(&self, image: GrayImage) -> OmrResult<GrayImage>;
}

/// Linearly stretches gray levels so the darkest pixel maps to 0 and the
/// brightest to 255. Flat images are returned unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContrastStretch;

impl ImagePreprocessor for ContrastStretch {
    fn name(&self) -> &str {
        "contrast_stretch"
    }

    fn apply(&self, mut image: GrayImage) -> OmrResult<GrayImage> {
        let (min, max) = image
            .pixels()
            .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
        if max <= min {
            return Ok(image);
        }
        let range = u32::from(max - min);
        for pixel in image.pixels_mut() {
            let offset = u32::from(pixel[0] - min);
            pixel[0] = ((offset * 255 + range / 2) / range) as u8;
        }
        Ok(image)
    }
}

/// Runs preprocessors in order on the working image.
#[derive(Debug, Clone, Default)]
pub struct PreprocessingStage {
    preprocessors: Vec<Arc<dyn ImagePreprocessor>>,
}

impl PreprocessingStage {
    pub fn new(preprocessors: Vec<Arc<dyn ImagePreprocessor>>) -> Self {
        Self { preprocessors }
    }
}

impl OmrStage for PreprocessingStage {
    fn name(&self) -> &str {
        "preprocessing"
    }

    fn process(&self, context: &mut ProcessingContext) -> OmrResult<StageMetrics> {
        for preprocessor in &self.preprocessors {
            debug!(preprocessor = preprocessor.name(), file = %context.file_path, "Preprocessing");
            let image = std::mem::replace(&mut context.gray_image, GrayImage::new(0, 0));
            context.gray_image = preprocessor.apply(image)?;
        }
        Ok(StageMetrics::new(self.preprocessors.len(), 0))
    }
}
