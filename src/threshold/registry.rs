//! Name-based selection of threshold strategies.

use super::adaptive::AdaptiveThreshold;
use super::global::GlobalThreshold;
use super::local::LocalThreshold;
use super::types::{ThresholdConfig, ThresholdResult};
use super::ThresholdStrategy;
use crate::core::errors::{OMRError, OmrResult};

/// The closed set of threshold strategies.
#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdCalculator {
    Global(GlobalThreshold),
    Local(LocalThreshold),
    Adaptive(AdaptiveThreshold),
}

impl ThresholdCalculator {
    /// Names accepted by [`ThresholdCalculator::from_name`].
    pub const AVAILABLE: [&'static str; 3] = ["global", "local", "adaptive"];

    pub fn global() -> Self {
        Self::Global(GlobalThreshold)
    }

    pub fn local(global_fallback: Option<f64>) -> Self {
        Self::Local(LocalThreshold::new(global_fallback))
    }

    /// The default calculator: global and local blended, preferring local.
    pub fn adaptive(global_fallback: Option<f64>) -> Self {
        Self::Adaptive(AdaptiveThreshold::global_and_local(global_fallback))
    }

    /// Looks a strategy up by name.
    ///
    /// `global_fallback` is passed to strategies that use one.
    ///
    /// # Errors
    ///
    /// Returns `OMRError::ConfigError` for an unknown name.
    pub fn from_name(name: &str, global_fallback: Option<f64>) -> OmrResult<Self> {
        match name {
            "global" => Ok(Self::global()),
            "local" => Ok(Self::local(global_fallback)),
            "adaptive" => Ok(Self::adaptive(global_fallback)),
            other => Err(OMRError::config_error_with_context(
                "threshold_strategy",
                other,
                &format!("expected one of {:?}", Self::AVAILABLE),
            )),
        }
    }
}

impl Default for ThresholdCalculator {
    fn default() -> Self {
        Self::adaptive(None)
    }
}

impl ThresholdStrategy for ThresholdCalculator {
    fn name(&self) -> &'static str {
        match self {
            Self::Global(s) => s.name(),
            Self::Local(s) => s.name(),
            Self::Adaptive(s) => s.name(),
        }
    }

    fn calculate(&self, values: &[f64], config: &ThresholdConfig) -> ThresholdResult {
        match self {
            Self::Global(s) => s.calculate(values, config),
            Self::Local(s) => s.calculate(values, config),
            Self::Adaptive(s) => s.calculate(values, config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_resolves_every_name() {
        for name in ThresholdCalculator::AVAILABLE {
            let calculator = ThresholdCalculator::from_name(name, Some(180.0)).unwrap();
            assert_eq!(calculator.name(), name);
        }
        let err = ThresholdCalculator::from_name("otsu", None).unwrap_err();
        assert!(matches!(err, OMRError::ConfigError { .. }));
        assert!(err.to_string().contains("'otsu'"));
    }

    #[test]
    fn test_bounds_and_idempotence() {
        let config = ThresholdConfig::default();
        let fallback = 240.0;
        let sets: [&[f64]; 6] = [
            &[90.0],
            &[100.0, 110.0],
            &[30.0, 240.0, 250.0],
            &[120.0, 121.0, 122.0, 123.0],
            &[0.0, 255.0, 0.0, 255.0, 128.0],
            &[200.0, 90.0, 95.0, 210.0, 205.0, 99.0, 180.0],
        ];
        for values in sets {
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            for name in ThresholdCalculator::AVAILABLE {
                let calculator = ThresholdCalculator::from_name(name, Some(fallback)).unwrap();
                let first = calculator.calculate(values, &config);
                let second = calculator.calculate(values, &config);
                assert_eq!(first, second);
                assert!((0.0..=1.0).contains(&first.confidence));

                let t = first.threshold_value;
                if values.len() < 2 {
                    assert!(first.fallback_used, "{name} on {values:?}");
                    continue;
                }
                match name {
                    "global" => assert!(t >= min && t <= max, "{name} on {values:?}: {t}"),
                    // Local fallbacks return the file threshold as-is, even
                    // outside the field's range.
                    "local" if first.fallback_used => assert_eq!(t, fallback),
                    // A blend of in-range thresholds and the fallbacks.
                    "adaptive" if first.fallback_used => {
                        let lo = min.min(fallback).min(config.default_threshold);
                        let hi = max.max(fallback).max(config.default_threshold);
                        assert!(t >= lo - 1e-9 && t <= hi + 1e-9, "{name} on {values:?}: {t}");
                    }
                    _ => assert!(
                        t >= min - 1e-9 && t <= max + 1e-9,
                        "{name} on {values:?}: {t}"
                    ),
                }
            }
        }
    }

    #[test]
    fn test_fallback_may_leave_sample_range() {
        let config = ThresholdConfig::default();
        let values = [100.0, 110.0];

        let local = ThresholdCalculator::local(Some(240.0)).calculate(&values, &config);
        assert!(local.fallback_used);
        assert_eq!(local.threshold_value, 240.0);

        let adaptive = ThresholdCalculator::adaptive(Some(240.0)).calculate(&values, &config);
        assert!(adaptive.fallback_used);
        assert!(adaptive.threshold_value > 110.0);
    }
}
