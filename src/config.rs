//! Aggregator configuration from environment variables
//!
//! Loaded once at startup; every value is read-only afterwards.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SOURCE_DB_PATH: &str = "data/measurements.db";
pub const DEFAULT_DOCUMENT_STORE_URI: &str = "sqlite://data/analytics.db";
pub const DEFAULT_CONNECT_RETRIES: u32 = 5;
pub const DEFAULT_CONNECT_RETRY_DELAY_SECS: u64 = 5;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_MONGO_DATABASE: &str = "analytics";
pub const DEFAULT_MONGO_COLLECTION: &str = "statistics";

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where data points are read from
#[derive(Clone, PartialEq)]
pub enum SourceConfig {
    Sqlite {
        path: PathBuf,
    },
    MySql {
        host: String,
        port: u16,
        user: String,
        password: Option<String>,
        database: String,
    },
}

// Hand-written so the password never reaches a log line
impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceConfig::Sqlite { path } => f.debug_struct("Sqlite").field("path", path).finish(),
            SourceConfig::MySql { host, port, user, password, database } => f
                .debug_struct("MySql")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("password", &password.as_ref().map(|_| "***"))
                .field("database", database)
                .finish(),
        }
    }
}

impl fmt::Display for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceConfig::Sqlite { path } => write!(f, "sqlite {}", path.display()),
            SourceConfig::MySql { host, port, user, database, .. } => {
                write!(f, "mysql {}@{}:{}/{}", user, host, port, database)
            }
        }
    }
}

/// Where the snapshot document is published
#[derive(Clone, PartialEq)]
pub enum SinkConfig {
    /// `sqlite://<path>` - one row per document type
    Sqlite { path: PathBuf },
    /// `file://<dir>` - one `<type>.json` file per document type
    JsonDir { dir: PathBuf },
    /// `mongodb://` or `mongodb+srv://` - one document per type in `database.collection`
    Mongo {
        uri: String,
        database: String,
        collection: String,
    },
}

impl SinkConfig {
    pub fn parse_uri(uri: &str) -> Result<Self, ConfigError> {
        if let Some(path) = uri.strip_prefix("sqlite://") {
            if path.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "DOCUMENT_STORE_URI sqlite:// requires a path".to_string(),
                ));
            }
            return Ok(SinkConfig::Sqlite { path: path.into() });
        }

        if let Some(dir) = uri.strip_prefix("file://") {
            if dir.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "DOCUMENT_STORE_URI file:// requires a directory".to_string(),
                ));
            }
            return Ok(SinkConfig::JsonDir { dir: dir.into() });
        }

        for scheme in ["mongodb://", "mongodb+srv://"] {
            if let Some(rest) = uri.strip_prefix(scheme) {
                if rest.trim_start_matches('/').is_empty() {
                    return Err(ConfigError::InvalidValue(format!(
                        "DOCUMENT_STORE_URI {} requires a host",
                        scheme
                    )));
                }
                return Ok(SinkConfig::Mongo {
                    uri: uri.to_string(),
                    database: DEFAULT_MONGO_DATABASE.to_string(),
                    collection: DEFAULT_MONGO_COLLECTION.to_string(),
                });
            }
        }

        Err(ConfigError::InvalidValue(format!(
            "DOCUMENT_STORE_URI must start with sqlite://, file://, mongodb:// or mongodb+srv://, got '{}'",
            redact_credentials(uri)
        )))
    }
}

/// Replace the `user:password@` part of a connection URI with `***@`
fn redact_credentials(uri: &str) -> String {
    let Some(scheme_end) = uri.find("://").map(|i| i + 3) else {
        return uri.to_string();
    };
    let authority_end = uri[scheme_end..]
        .find('/')
        .map_or(uri.len(), |i| scheme_end + i);

    match uri[scheme_end..authority_end].rfind('@') {
        Some(at) => format!("{}***{}", &uri[..scheme_end], &uri[scheme_end + at..]),
        None => uri.to_string(),
    }
}

// Hand-written so Mongo credentials never reach a log line
impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkConfig::Sqlite { path } => f.debug_struct("Sqlite").field("path", path).finish(),
            SinkConfig::JsonDir { dir } => f.debug_struct("JsonDir").field("dir", dir).finish(),
            SinkConfig::Mongo { uri, database, collection } => f
                .debug_struct("Mongo")
                .field("uri", &redact_credentials(uri))
                .field("database", database)
                .field("collection", collection)
                .finish(),
        }
    }
}

impl fmt::Display for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkConfig::Sqlite { path } => write!(f, "sqlite://{}", path.display()),
            SinkConfig::JsonDir { dir } => write!(f, "file://{}", dir.display()),
            SinkConfig::Mongo { uri, database, collection } => {
                write!(f, "{} ({}.{})", redact_credentials(uri), database, collection)
            }
        }
    }
}

/// Configuration for the aggregation runtime
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub source: SourceConfig,
    pub sink: SinkConfig,

    /// Connection attempts per acquisition (>= 1)
    pub connect_retries: u32,

    /// Fixed delay between connection attempts
    pub connect_retry_delay: Duration,

    /// Sleep between cycles
    pub poll_interval: Duration,
}

impl AggregatorConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `MYSQL_HOST` (unset: read from SQLite at `SOURCE_DB_PATH`)
    /// - `MYSQL_PORT` (default: 3306)
    /// - `MYSQL_USER` (default: root)
    /// - `MYSQL_PASSWORD` (optional)
    /// - `MYSQL_DATABASE` (required when `MYSQL_HOST` is set)
    /// - `SOURCE_DB_PATH` (default: data/measurements.db)
    /// - `DOCUMENT_STORE_URI` (default: sqlite://data/analytics.db)
    /// - `MONGO_URI` (used when `DOCUMENT_STORE_URI` is unset)
    /// - `MONGO_DATABASE` (default: analytics)
    /// - `MONGO_COLLECTION` (default: statistics)
    /// - `CONNECT_RETRIES` (default: 5)
    /// - `CONNECT_RETRY_DELAY_SECS` (default: 5)
    /// - `POLL_INTERVAL_SECS` (default: 300)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = match lookup("MYSQL_HOST").filter(|h| !h.trim().is_empty()) {
            Some(host) => SourceConfig::MySql {
                host,
                port: parse_or(&lookup, "MYSQL_PORT", DEFAULT_MYSQL_PORT)?,
                user: lookup("MYSQL_USER").unwrap_or_else(|| "root".to_string()),
                password: lookup("MYSQL_PASSWORD"),
                database: lookup("MYSQL_DATABASE")
                    .ok_or_else(|| ConfigError::MissingVariable("MYSQL_DATABASE".to_string()))?,
            },
            None => SourceConfig::Sqlite {
                path: lookup("SOURCE_DB_PATH")
                    .unwrap_or_else(|| DEFAULT_SOURCE_DB_PATH.to_string())
                    .into(),
            },
        };

        let sink_uri = lookup("DOCUMENT_STORE_URI")
            .or_else(|| lookup("MONGO_URI"))
            .filter(|uri| !uri.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DOCUMENT_STORE_URI.to_string());
        let mut sink = SinkConfig::parse_uri(sink_uri.trim())?;
        if let SinkConfig::Mongo { database, collection, .. } = &mut sink {
            if let Some(name) = lookup("MONGO_DATABASE").filter(|n| !n.trim().is_empty()) {
                *database = name.trim().to_string();
            }
            if let Some(name) = lookup("MONGO_COLLECTION").filter(|n| !n.trim().is_empty()) {
                *collection = name.trim().to_string();
            }
        }

        let connect_retries = parse_or(&lookup, "CONNECT_RETRIES", DEFAULT_CONNECT_RETRIES)?;
        if connect_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "CONNECT_RETRIES must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            source,
            sink,
            connect_retries,
            connect_retry_delay: Duration::from_secs(parse_or(
                &lookup,
                "CONNECT_RETRY_DELAY_SECS",
                DEFAULT_CONNECT_RETRY_DELAY_SECS,
            )?),
            poll_interval: Duration::from_secs(parse_or(
                &lookup,
                "POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            ConfigError::InvalidValue(format!("{} must be a non-negative integer, got '{}'", key, raw))
        }),
    }
}
