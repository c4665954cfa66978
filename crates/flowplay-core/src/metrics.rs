//! Decode-throughput metrics.
//!
//! Tracks exponential moving averages of the decoder's reported per-unit
//! cost and duration. The averages feed the preload/backpressure heuristics
//! and are published to the application after every decode-progress message.

/// Exponential-moving-average tracker of decode cost and unit duration.
///
/// Smoothing factor 0.5: the first observed sample seeds each average,
/// thereafter `avg' = (avg + sample) / 2`. "No sample yet" is held as an
/// explicit absent state rather than the number 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeMetrics {
    avg_cost_ms: Option<f64>,
    avg_duration_ms: Option<f64>,
}

impl DecodeMetrics {
    /// Creates a tracker with no samples.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one decode-progress report into both averages.
    ///
    /// Negative samples are clamped to zero; the averages never go below 0.
    pub fn observe(&mut self, cost_ms: f64, duration_ms: f64) {
        self.avg_cost_ms = Some(fold(self.avg_cost_ms, cost_ms.max(0.0)));
        self.avg_duration_ms = Some(fold(self.avg_duration_ms, duration_ms.max(0.0)));
    }

    /// Average decode cost in milliseconds (0.0 before the first sample).
    pub fn average_decode_cost(&self) -> f64 {
        self.avg_cost_ms.unwrap_or(0.0)
    }

    /// Average unit duration in milliseconds (0.0 before the first sample).
    pub fn average_unit_duration(&self) -> f64 {
        self.avg_duration_ms.unwrap_or(0.0)
    }

    /// Returns the current averages as a publishable snapshot.
    pub fn snapshot(&self) -> PerformanceSnapshot {
        PerformanceSnapshot {
            average_decode_cost_ms: self.average_decode_cost(),
            average_unit_duration_ms: self.average_unit_duration(),
        }
    }
}

/// Point-in-time view of the decode metrics, published to the application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceSnapshot {
    /// Average decode cost in milliseconds.
    pub average_decode_cost_ms: f64,
    /// Average decoded-unit duration in milliseconds.
    pub average_unit_duration_ms: f64,
}

fn fold(avg: Option<f64>, sample: f64) -> f64 {
    match avg {
        None => sample,
        Some(avg) => (avg + sample) / 2.0,
    }
}
