//! Aggregator Binary - descriptive statistics loop
//!
//! Reads (min_value, max_value) rows, computes the snapshot and upserts it as the
//! `descriptive_statistics` document, then sleeps and repeats until killed.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin aggregator
//! ```
//!
//! ## Environment Variables
//!
//! - MYSQL_HOST / MYSQL_PORT / MYSQL_USER / MYSQL_PASSWORD / MYSQL_DATABASE - MySQL source
//! - SOURCE_DB_PATH - SQLite source when MYSQL_HOST is unset (default: data/measurements.db)
//! - DOCUMENT_STORE_URI - sqlite://<path>, file://<dir> or mongodb://... (default: sqlite://data/analytics.db)
//! - MONGO_URI - Fallback for DOCUMENT_STORE_URI
//! - MONGO_DATABASE / MONGO_COLLECTION - Target for mongodb:// (default: analytics / statistics)
//! - CONNECT_RETRIES - Connection attempts per acquisition (default: 5)
//! - CONNECT_RETRY_DELAY_SECS - Fixed delay between attempts (default: 5)
//! - POLL_INTERVAL_SECS - Sleep between cycles (default: 300)
//! - RUST_LOG - Logging level (optional, default: info)

use statflow::{
    AggregationScheduler, AggregatorConfig, ConnectionSupervisor, DataSource, DocumentSink,
    JsonDocumentSink, MongoDocumentSink, MySqlDataSource, SinkConfig, SourceConfig,
    SqliteDataSource, SqliteDocumentSink,
};

async fn run<S, D>(
    source: S,
    sink: D,
    config: &AggregatorConfig,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: DataSource,
    D: DocumentSink,
{
    let supervisor = ConnectionSupervisor::new(config.connect_retries, config.connect_retry_delay);
    let mut scheduler = AggregationScheduler::new(source, sink, supervisor, config.poll_interval);

    // Unreachable backends at startup are fatal; after this point nothing is
    log::info!("🔧 Verifying backend connections...");
    scheduler.verify_backends().await?;

    scheduler.run().await;
    Ok(())
}

async fn run_with_sink<S>(source: S, config: &AggregatorConfig) -> Result<(), Box<dyn std::error::Error>>
where
    S: DataSource,
{
    match &config.sink {
        SinkConfig::Sqlite { path } => run(source, SqliteDocumentSink::new(path), config).await,
        SinkConfig::JsonDir { dir } => run(source, JsonDocumentSink::new(dir), config).await,
        SinkConfig::Mongo { uri, database, collection } => {
            run(source, MongoDocumentSink::new(uri, database, collection), config).await
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = AggregatorConfig::from_env()?;

    log::info!("🚀 Starting statistics aggregator");
    log::info!("   ├─ Source: {}", config.source);
    log::info!("   ├─ Document store: {}", config.sink);
    log::info!(
        "   ├─ Connect retries: {} (delay: {:?})",
        config.connect_retries,
        config.connect_retry_delay
    );
    log::info!("   └─ Poll interval: {:?}", config.poll_interval);

    match &config.source {
        SourceConfig::Sqlite { path } => {
            run_with_sink(SqliteDataSource::new(path), &config).await
        }
        SourceConfig::MySql { host, port, user, password, database } => {
            let source = MySqlDataSource::new(host, *port, user, password.as_deref(), database);
            run_with_sink(source, &config).await
        }
    }
}
