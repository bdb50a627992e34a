use hdrhistogram::Histogram;

use crate::error::MetricsError;

/// Trend values are stored with microsecond resolution on millisecond inputs.
const SCALE: f64 = 1000.0;
const SIGNIFICANT_DIGITS: u8 = 3;

#[derive(Debug, Clone)]
pub struct TrendHistogram {
    hist: Histogram<u64>,
}

impl TrendHistogram {
    /// Create a new trend histogram.
    ///
    /// # Errors
    ///
    /// Returns an error if the histogram cannot be created.
    pub fn new() -> Result<Self, MetricsError> {
        let hist = Histogram::<u64>::new(SIGNIFICANT_DIGITS).map_err(|err| {
            MetricsError::Histogram {
                context: "create",
                source: Box::new(err),
            }
        })?;
        Ok(Self { hist })
    }

    /// Record a value. Negative values clamp to zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be recorded.
    pub fn record(&mut self, value: f64) -> Result<(), MetricsError> {
        self.hist
            .record(to_scaled(value))
            .map_err(|err| MetricsError::Histogram {
                context: "record",
                source: Box::new(err),
            })
    }

    /// Merge another histogram into this one.
    ///
    /// # Errors
    ///
    /// Returns an error if the merge fails.
    pub fn merge(&mut self, other: &TrendHistogram) -> Result<(), MetricsError> {
        self.hist
            .add(&other.hist)
            .map_err(|err| MetricsError::Histogram {
                context: "merge",
                source: Box::new(err),
            })
    }

    /// Value at percentile `percent` (0-100), in the recorded unit.
    #[must_use]
    pub fn percentile(&self, percent: f64) -> f64 {
        if self.hist.is_empty() {
            return 0.0;
        }
        let quantile = (percent / 100.0).clamp(0.0, 1.0);
        from_scaled(self.hist.value_at_quantile(quantile))
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.hist.len()
    }
}

fn to_scaled(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    (value * SCALE).round() as u64
}

fn from_scaled(value: u64) -> f64 {
    value as f64 / SCALE
}
