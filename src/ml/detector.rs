//! Contract for external object detectors.
//!
//! The crate never runs a model itself. Callers plug in anything that can
//! turn a grayscale image region into labelled boxes: an ONNX session, a
//! remote service, or a fake in tests.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

use crate::core::errors::OmrResult;
use crate::processors::geometry::BoundingBox;

/// One box reported by a detector, in the coordinates of the image it was
/// given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_id: u32,
    pub confidence: f64,
}

impl Detection {
    pub fn new(bbox: BoundingBox, class_id: u32, confidence: f64) -> Self {
        Self {
            bbox,
            class_id,
            confidence,
        }
    }

    /// Returns this detection moved by `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            bbox: self.bbox.translated(dx, dy),
            ..self.clone()
        }
    }
}

/// Trait for external object detectors.
///
/// Implementations must be usable from several worker threads at once.
pub trait ObjectDetector: Send + Sync + Debug {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Detects objects on `image`.
    ///
    /// # Arguments
    ///
    /// * `image` - The page or crop to run on
    ///
    /// # Returns
    ///
    /// Every detection, unfiltered; confidence filtering is done by the caller.
    fn predict(&self, image: &GrayImage) -> OmrResult<Vec<Detection>>;
}

/// Classes produced by a field-block detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockClass {
    FieldBlockMcq,
    FieldBlockOcr,
    FieldBlockBarcode,
}

impl BlockClass {
    pub fn from_id(class_id: u32) -> Option<Self> {
        match class_id {
            0 => Some(Self::FieldBlockMcq),
            1 => Some(Self::FieldBlockOcr),
            2 => Some(Self::FieldBlockBarcode),
            _ => None,
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            Self::FieldBlockMcq => 0,
            Self::FieldBlockOcr => 1,
            Self::FieldBlockBarcode => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FieldBlockMcq => "field_block_mcq",
            Self::FieldBlockOcr => "field_block_ocr",
            Self::FieldBlockBarcode => "field_block_barcode",
        }
    }
}

impl fmt::Display for BlockClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classes produced by a bubble detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BubbleClass {
    BubbleEmpty,
    BubbleFilled,
    /// Partially filled; read as unmarked.
    BubblePartial,
}

impl BubbleClass {
    pub fn from_id(class_id: u32) -> Option<Self> {
        match class_id {
            0 => Some(Self::BubbleEmpty),
            1 => Some(Self::BubbleFilled),
            2 => Some(Self::BubblePartial),
            _ => None,
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            Self::BubbleEmpty => 0,
            Self::BubbleFilled => 1,
            Self::BubblePartial => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BubbleEmpty => "bubble_empty",
            Self::BubbleFilled => "bubble_filled",
            Self::BubblePartial => "bubble_partial",
        }
    }

    pub fn is_marked(&self) -> bool {
        matches!(self, Self::BubbleFilled)
    }
}

impl fmt::Display for BubbleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_ids_round_trip() {
        for id in 0..3 {
            assert_eq!(BlockClass::from_id(id).map(|c| c.id()), Some(id));
            assert_eq!(BubbleClass::from_id(id).map(|c| c.id()), Some(id));
        }
        assert_eq!(BlockClass::from_id(3), None);
        assert_eq!(BubbleClass::from_id(7), None);
    }

    #[test]
    fn test_only_filled_is_marked() {
        assert!(BubbleClass::BubbleFilled.is_marked());
        assert!(!BubbleClass::BubblePartial.is_marked());
        assert!(!BubbleClass::BubbleEmpty.is_marked());
        assert_eq!(BubbleClass::BubblePartial.to_string(), "bubble_partial");
    }

    #[test]
    fn test_translated_detection() {
        let detection = Detection::new(BoundingBox::from_coords(0.0, 0.0, 10.0, 5.0), 1, 0.9);
        let moved = detection.translated(3.0, 4.0);
        assert_eq!(moved.bbox.origin().x, 3.0);
        assert_eq!(moved.bbox.origin().y, 4.0);
        assert_eq!(moved.class_id, 1);
    }
}
