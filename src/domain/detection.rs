//! Raw per-field detection results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::constants::MAX_INTENSITY;
use crate::processors::geometry::Point;

/// One darkness measurement for one item.
///
/// Lower values are darker and therefore more likely to be marked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensitySample {
    /// Mean intensity in `0.0..=255.0`.
    pub value: f64,
    /// Page position the sample was taken at.
    pub position: Point,
    /// Label of the item (the value it contributes to a response).
    pub label: String,
}

impl IntensitySample {
    pub fn new(value: f64, position: Point, label: impl Into<String>) -> Self {
        Self {
            value,
            position,
            label: label.into(),
        }
    }
}

/// Coarse confidence bucket derived from the spread of a field's samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanQuality {
    /// Clear contrast between marked and unmarked items.
    Excellent,
    Good,
    /// Marginal; may need review.
    Acceptable,
    /// Likely to contain errors.
    Poor,
}

impl ScanQuality {
    /// Buckets a population standard deviation.
    pub fn from_std_deviation(std_deviation: f64) -> Self {
        if std_deviation > 50.0 {
            Self::Excellent
        } else if std_deviation > 30.0 {
            Self::Good
        } else if std_deviation > 15.0 {
            Self::Acceptable
        } else {
            Self::Poor
        }
    }

    /// Weight this bucket contributes to a field's confidence score.
    pub fn factor(&self) -> f64 {
        match self {
            Self::Excellent => 1.0,
            Self::Good => 0.9,
            Self::Acceptable => 0.7,
            Self::Poor => 0.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Acceptable => "acceptable",
            Self::Poor => "poor",
        }
    }
}

impl fmt::Display for ScanQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Samples collected for one field during a detection pass.
///
/// Every statistic is recomputed from `samples` on access, so the struct
/// never holds stale derived values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDetectionResult {
    pub field_id: String,
    pub field_label: String,
    pub samples: Vec<IntensitySample>,
}

impl FieldDetectionResult {
    pub fn new(
        field_id: impl Into<String>,
        field_label: impl Into<String>,
        samples: Vec<IntensitySample>,
    ) -> Self {
        Self {
            field_id: field_id.into(),
            field_label: field_label.into(),
            samples,
        }
    }

    /// Number of items sampled.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample values in item order.
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// Sample values sorted ascending.
    pub fn sorted_values(&self) -> Vec<f64> {
        let mut values = self.values();
        values.sort_by(f64::total_cmp);
        values
    }

    /// Population standard deviation of the sample values; 0 when empty.
    pub fn std_deviation(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let n = self.samples.len() as f64;
        let mean = self.samples.iter().map(|s| s.value).sum::<f64>() / n;
        let variance = self
            .samples
            .iter()
            .map(|s| (s.value - mean).powi(2))
            .sum::<f64>()
            / n;
        variance.sqrt()
    }

    pub fn scan_quality(&self) -> ScanQuality {
        ScanQuality::from_std_deviation(self.std_deviation())
    }

    /// Whether the scan quality is good enough to trust without review.
    pub fn is_reliable(&self) -> bool {
        matches!(self.scan_quality(), ScanQuality::Excellent | ScanQuality::Good)
    }

    /// Gaps between consecutive sorted values.
    pub fn jumps(&self) -> Vec<f64> {
        self.sorted_values()
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect()
    }

    /// Largest gap between consecutive sorted values; 0 with fewer than two samples.
    pub fn max_jump(&self) -> f64 {
        self.jumps().into_iter().fold(0.0, f64::max)
    }

    /// Darkest sample value; 0 when empty.
    pub fn min_value(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.value)
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    /// Lightest sample value; 255 when empty.
    pub fn max_value(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.value)
            .reduce(f64::max)
            .unwrap_or(MAX_INTENSITY)
    }
}
