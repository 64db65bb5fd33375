//! # Revenue Normalizer
//! Maps revenue-per-attendee onto 0–100 against benchmarks.
//!
//! Benchmarks roll with history: once any other event has been scored, the
//! min/max revenue-per-attendee across those events replace the defaults.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_BENCHMARK: f64 = 20.0;
pub const DEFAULT_MAX_BENCHMARK: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    Default,
    Rolling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueAssessment {
    pub revenue_per_attendee: f64,
    pub min_benchmark: f64,
    pub max_benchmark: f64,
    pub normalization: Normalization,
    #[serde(skip)]
    pub revenue_score: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct RevenueNormalizer {
    default_min: f64,
    default_max: f64,
}

impl Default for RevenueNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_BENCHMARK, DEFAULT_MAX_BENCHMARK)
    }
}

impl RevenueNormalizer {
    /// Defaults are swapped if given in the wrong order.
    pub fn new(default_min: f64, default_max: f64) -> Self {
        let (lo, hi) = if default_min <= default_max {
            (default_min, default_max)
        } else {
            (default_max, default_min)
        };
        Self {
            default_min: lo,
            default_max: hi,
        }
    }

    /// `prior_rpa`: revenue-per-attendee of every *other* scored event.
    /// Attendance ≥ 1 and revenue ≥ 0 are validated upstream.
    pub fn assess(&self, revenue: f64, attendance: u32, prior_rpa: &[f64]) -> RevenueAssessment {
        let rpa = revenue / attendance.max(1) as f64;

        let prior: Vec<f64> = prior_rpa.iter().copied().filter(|v| v.is_finite()).collect();
        let (min_b, max_b, normalization) = if prior.is_empty() {
            (self.default_min, self.default_max, Normalization::Default)
        } else {
            let lo = prior.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = prior.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (lo, hi, Normalization::Rolling)
        };

        RevenueAssessment {
            revenue_per_attendee: rpa,
            min_benchmark: min_b,
            max_benchmark: max_b,
            normalization,
            revenue_score: normalize(rpa, min_b, max_b),
        }
    }
}

/// `clamp(100 × (x − min) / (max − min), 0, 100)`, or 50 when `max == min`.
pub fn normalize(x: f64, min_b: f64, max_b: f64) -> f64 {
    if max_b == min_b {
        return 50.0;
    }
    let score = 100.0 * (x - min_b) / (max_b - min_b);
    if score.is_finite() {
        score.clamp(0.0, 100.0)
    } else {
        50.0
    }
}
