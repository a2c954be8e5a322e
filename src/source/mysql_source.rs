//! MySQL data point source (the ingestion API's `data_points` table)

use super::{DataPointSample, DataSource, SELECT_DATA_POINTS};
use crate::error::{ConnectionError, ReadError};
use crate::supervisor::Connector;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};

pub struct MySqlDataSource {
    options: MySqlConnectOptions,
    display: String,
}

impl MySqlDataSource {
    pub fn new(
        host: &str,
        port: u16,
        user: &str,
        password: Option<&str>,
        database: &str,
    ) -> Self {
        let mut options = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(user)
            .database(database)
            .log_statements(log::LevelFilter::Debug);

        if let Some(password) = password {
            options = options.password(password);
        }

        Self {
            options,
            display: format!("{}@{}:{}/{}", user, host, port, database),
        }
    }

    /// `user@host:port/database`, without the password
    pub fn display_name(&self) -> &str {
        &self.display
    }
}

#[async_trait]
impl Connector for MySqlDataSource {
    type Handle = MySqlConnection;

    async fn connect(&self) -> Result<MySqlConnection, ConnectionError> {
        Ok(self.options.connect().await?)
    }

    async fn ping(&self, handle: &mut MySqlConnection) -> Result<(), ConnectionError> {
        Ok(handle.ping().await?)
    }

    async fn release(&self, handle: MySqlConnection) {
        if let Err(e) = handle.close().await {
            log::warn!("⚠️  Failed to close MySQL source {}: {}", self.display, e);
        }
    }

    fn backend_type(&self) -> &'static str {
        "MySQL"
    }
}

#[async_trait]
impl DataSource for MySqlDataSource {
    async fn read_samples(
        &self,
        handle: &mut MySqlConnection,
    ) -> Result<Vec<DataPointSample>, ReadError> {
        let rows: Vec<(f64, f64)> = sqlx::query_as(SELECT_DATA_POINTS)
            .fetch_all(&mut *handle)
            .await?;

        Ok(rows.into_iter().map(DataPointSample::from).collect())
    }
}
