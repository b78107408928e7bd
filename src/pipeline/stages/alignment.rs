//! Image alignment stage.

use image::GrayImage;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

use super::{OmrStage, StageMetrics};
use crate::core::errors::OmrResult;
use crate::domain::Template;
use crate::pipeline::context::ProcessingContext;

/// Warps a scanned page onto the template's coordinate frame.
///
/// The crate ships no aligner; feature matching and warping live with the
/// caller.
pub trait ImageAligner: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Returns `image` aligned to `template`.
    fn align(&self, image: GrayImage, template: &Template) -> OmrResult<GrayImage>;
}

/// Runs the configured aligner, if any.
#[derive(Debug, Clone, Default)]
pub struct AlignmentStage {
    aligner: Option<Arc<dyn ImageAligner>>,
}

impl AlignmentStage {
    pub fn new(aligner: Option<Arc<dyn ImageAligner>>) -> Self {
        Self { aligner }
    }
}

impl OmrStage for AlignmentStage {
    fn name(&self) -> &str {
        "alignment"
    }

    fn is_enabled(&self, _context: &ProcessingContext) -> bool {
        self.aligner.is_some()
    }

    fn process(&self, context: &mut ProcessingContext) -> OmrResult<StageMetrics> {
        let Some(aligner) = &self.aligner else {
            return Ok(StageMetrics::skipped());
        };
        debug!(aligner = aligner.name(), file = %context.file_path, "Aligning image");
        let image = std::mem::replace(&mut context.gray_image, GrayImage::new(0, 0));
        context.gray_image = aligner.align(image, &context.template)?;
        Ok(StageMetrics::new(1, 0).with_info("aligner", aligner.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpretation::reader::test_support::template;
    use image::{Luma, imageops};

    /// Moves the page content by a fixed offset.
    #[derive(Debug)]
    struct Translate(i64, i64);

    impl ImageAligner for Translate {
        fn name(&self) -> &str {
            "translate"
        }

        fn align(&self, image: GrayImage, _template: &Template) -> OmrResult<GrayImage> {
            let (w, h) = image.dimensions();
            let mut out = GrayImage::from_pixel(w, h, Luma([255]));
            imageops::replace(&mut out, &image, self.0, self.1);
            Ok(out)
        }
    }

    #[test]
    fn test_alignment_replaces_image() {
        let mut image = GrayImage::from_pixel(4, 4, Luma([255]));
        image.put_pixel(2, 2, Luma([0]));
        let mut context = ProcessingContext::new("a.png", image, Arc::new(template(1)));

        let stage = AlignmentStage::new(Some(Arc::new(Translate(-1, -1))));
        assert!(stage.is_enabled(&context));
        stage.process(&mut context).unwrap();
        assert_eq!(context.gray_image.get_pixel(1, 1)[0], 0);
    }

    #[test]
    fn test_without_aligner_is_disabled() {
        let context = ProcessingContext::new("a.png", GrayImage::new(1, 1), Arc::new(template(1)));
        assert!(!AlignmentStage::default().is_enabled(&context));
    }
}
