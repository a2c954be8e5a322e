//! Descriptive statistics over min/max-only samples
//!
//! The summary is an extrema-based approximation and is kept that way on purpose
//! because dashboards and alerts consume these exact numbers:
//! - `average` is the midpoint of the overall min and max, not the mean
//! - `median` is the element at index `len / 2` of the sorted combined values
//!   (upper middle for even lengths, no averaging)
//! - `count` is the number of combined values, i.e. twice the number of samples

use crate::source::DataPointSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single current aggregation result
///
/// `count == 0` exactly when every numeric field is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub average: Option<f64>,
    pub median: Option<f64>,
    pub count: u64,
    pub timestamp: DateTime<Utc>,
}

impl StatisticsSnapshot {
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            min: None,
            max: None,
            average: None,
            median: None,
            count: 0,
            timestamp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Compute the snapshot for `samples`, stamped with the current time
pub fn compute(samples: &[DataPointSample]) -> StatisticsSnapshot {
    compute_at(samples, Utc::now())
}

/// Compute the snapshot for `samples` with an explicit capture time
pub fn compute_at(samples: &[DataPointSample], timestamp: DateTime<Utc>) -> StatisticsSnapshot {
    if samples.is_empty() {
        return StatisticsSnapshot::empty(timestamp);
    }

    // All mins, then all maxes
    let mut combined: Vec<f64> = samples
        .iter()
        .map(|s| s.min)
        .chain(samples.iter().map(|s| s.max))
        .collect();

    // Total order keeps NaN/inf deterministic instead of panicking
    combined.sort_by(f64::total_cmp);

    let min = combined[0];
    let max = combined[combined.len() - 1];
    let median = combined[combined.len() / 2];

    StatisticsSnapshot {
        min: Some(min),
        max: Some(max),
        average: Some((min + max) / 2.0),
        median: Some(median),
        count: combined.len() as u64,
        timestamp,
    }
}
