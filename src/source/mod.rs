//! Data point reader - full-table extraction of (min, max) rows
//!
//! Every cycle re-reads the whole `data_points` table; rows are never
//! mutated, deleted or watermarked. Result order carries no meaning.

pub mod mysql_source;
pub mod sqlite_source;

pub use mysql_source::MySqlDataSource;
pub use sqlite_source::SqliteDataSource;

use crate::error::ReadError;
use crate::supervisor::Connector;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// `data_points` is written by the ingestion API; this crate only reads it
pub(crate) const SELECT_DATA_POINTS: &str = "SELECT min_value, max_value FROM data_points";

/// One recorded measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPointSample {
    pub min: f64,
    pub max: f64,
}

impl DataPointSample {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl From<(f64, f64)> for DataPointSample {
    fn from((min, max): (f64, f64)) -> Self {
        Self { min, max }
    }
}

/// Relational backend exposing the data points table
#[async_trait]
pub trait DataSource: Connector {
    async fn read_samples(
        &self,
        handle: &mut Self::Handle,
    ) -> Result<Vec<DataPointSample>, ReadError>;
}

/// Read the current batch and release `handle`, surfacing the read error
pub async fn try_fetch_batch<S>(
    source: &S,
    mut handle: S::Handle,
) -> Result<Vec<DataPointSample>, ReadError>
where
    S: DataSource + ?Sized,
{
    let result = source.read_samples(&mut handle).await;
    source.release(handle).await;
    result
}

/// Read the current batch and release `handle`
///
/// A backend error is logged and yields an empty batch.
pub async fn fetch_batch<S>(source: &S, handle: S::Handle) -> Vec<DataPointSample>
where
    S: DataSource + ?Sized,
{
    match try_fetch_batch(source, handle).await {
        Ok(samples) => {
            log::debug!("📥 Read {} data points from {}", samples.len(), source.backend_type());
            samples
        }
        Err(e) => {
            log::error!("❌ Failed to read data points from {}: {}", source.backend_type(), e);
            Vec::new()
        }
    }
}
