//! # statflow
//!
//! Periodically pulls (min, max) measurement rows from a relational store,
//! reduces them to a descriptive statistics snapshot and upserts that snapshot
//! into a document store under a fixed key.
//!
//! ```text
//! ConnectionSupervisor ──► DataSource (SQLite / MySQL) ──────────► try_fetch_batch
//!          │                                                              │
//!          │                                                       stats::compute
//!          │                                                              │
//!          └────────► DocumentSink (SQLite / JSON / MongoDB) ◄──────── publish
//!
//! AggregationScheduler: acquire → read → compute → publish → sleep, forever
//! ```

pub mod config;
pub mod error;
pub mod scheduler;
pub mod sink;
pub mod source;
pub mod stats;
pub mod supervisor;

pub use config::{AggregatorConfig, ConfigError, SinkConfig, SourceConfig};
pub use error::{ConnectionError, ReadError, WriteError};
pub use scheduler::{AggregationScheduler, CycleOutcome, CycleStats};
pub use sink::{
    DocumentSink, JsonDocumentSink, MongoDocumentSink, SqliteDocumentSink, SNAPSHOT_DOCUMENT_TYPE,
};
pub use source::{DataPointSample, DataSource, MySqlDataSource, SqliteDataSource};
pub use stats::StatisticsSnapshot;
pub use supervisor::{ConnectionSupervisor, Connector};
