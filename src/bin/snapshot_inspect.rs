//! Prints the current `descriptive_statistics` snapshot as JSON
//!
//! Uses the same DOCUMENT_STORE_URI / MONGO_* / CONNECT_* variables as the aggregator.
//! Exits with status 1 when no snapshot has been published yet.

use statflow::sink::latest_snapshot;
use statflow::{
    AggregatorConfig, ConnectionSupervisor, DocumentSink, JsonDocumentSink, MongoDocumentSink,
    SinkConfig, SqliteDocumentSink, StatisticsSnapshot,
};

async fn load<D>(
    sink: D,
    supervisor: &ConnectionSupervisor,
) -> Result<Option<StatisticsSnapshot>, Box<dyn std::error::Error>>
where
    D: DocumentSink,
{
    let handle = supervisor.acquire(&sink).await?;
    Ok(latest_snapshot(&sink, handle).await?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = AggregatorConfig::from_env()?;
    let supervisor = ConnectionSupervisor::new(config.connect_retries, config.connect_retry_delay);

    let snapshot = match &config.sink {
        SinkConfig::Sqlite { path } => load(SqliteDocumentSink::new(path), &supervisor).await?,
        SinkConfig::JsonDir { dir } => load(JsonDocumentSink::new(dir), &supervisor).await?,
        SinkConfig::Mongo { uri, database, collection } => {
            load(MongoDocumentSink::new(uri, database, collection), &supervisor).await?
        }
    };

    match snapshot {
        Some(snapshot) => {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
        None => {
            log::warn!("📭 No {} document in {}", statflow::SNAPSHOT_DOCUMENT_TYPE, config.sink);
            std::process::exit(1);
        }
    }
}
