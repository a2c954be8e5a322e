//! Aggregation scheduler - the acquire → read → compute → publish → sleep loop
//!
//! There is one steady state, running, entered at start and left only when the
//! process is killed. Cycles are strictly sequential: every handle acquired in a
//! cycle is released before the end-of-cycle sleep, and nothing but the
//! read-only configuration and the counters in `CycleStats` survives a cycle.
//! Backend failures end the current cycle early; they never end the loop.

use crate::error::ConnectionError;
use crate::sink::{self, DocumentSink};
use crate::source::{self, DataSource};
use crate::stats;
use crate::supervisor::ConnectionSupervisor;
use std::time::Duration;

/// Short interval for tight polling
pub const POLLING_INTERVAL: Duration = Duration::from_secs(5);
/// Long interval for batch-style aggregation
pub const BATCH_INTERVAL: Duration = Duration::from_secs(300);

/// How a single cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Snapshot upserted; `count` is the number of combined values
    Published { count: u64 },
    /// Source answered with no rows (nothing to aggregate yet)
    SkippedEmpty,
    /// Extraction query failed; nothing was published
    ReadFailed,
    /// Relational source exhausted its retry budget
    SourceUnavailable,
    /// Document store exhausted its retry budget
    SinkUnavailable,
    /// Document store rejected the upsert
    PublishFailed,
}

impl CycleOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            CycleOutcome::SourceUnavailable
                | CycleOutcome::ReadFailed
                | CycleOutcome::SinkUnavailable
                | CycleOutcome::PublishFailed
        )
    }
}

/// Counters across cycles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub cycles: u64,
    pub published: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl CycleStats {
    fn record(&mut self, outcome: CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Published { .. } => self.published += 1,
            CycleOutcome::SkippedEmpty => self.skipped += 1,
            _ => self.failed += 1,
        }
    }
}

pub struct AggregationScheduler<S, D> {
    source: S,
    sink: D,
    supervisor: ConnectionSupervisor,
    poll_interval: Duration,
    stats: CycleStats,
}

impl<S, D> AggregationScheduler<S, D>
where
    S: DataSource,
    D: DocumentSink,
{
    pub fn new(source: S, sink: D, supervisor: ConnectionSupervisor, poll_interval: Duration) -> Self {
        Self {
            source,
            sink,
            supervisor,
            poll_interval,
            stats: CycleStats::default(),
        }
    }

    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    /// Acquire and release both backends once
    ///
    /// Used by entry points that refuse to start against unreachable backends.
    pub async fn verify_backends(&self) -> Result<(), ConnectionError> {
        let handle = self.supervisor.acquire(&self.source).await?;
        self.source.release(handle).await;
        log::info!("✅ {} source reachable", self.source.backend_type());

        let handle = self.supervisor.acquire(&self.sink).await?;
        self.sink.release(handle).await;
        log::info!("✅ {} document store reachable", self.sink.backend_type());

        Ok(())
    }

    /// Run one cycle without the trailing sleep
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let outcome = self.cycle().await;
        self.stats.record(outcome);

        log::debug!(
            "🔁 Cycle {} finished: {:?} (published: {}, skipped: {}, failed: {})",
            self.stats.cycles,
            outcome,
            self.stats.published,
            self.stats.skipped,
            self.stats.failed
        );

        outcome
    }

    /// Run one cycle followed by the poll interval sleep
    pub async fn tick(&mut self) -> CycleOutcome {
        let outcome = self.run_cycle().await;
        tokio::time::sleep(self.poll_interval).await;
        outcome
    }

    /// Run cycles until the process is terminated
    pub async fn run(&mut self) {
        log::info!(
            "⏰ Starting aggregation loop (interval: {:?}, source: {}, sink: {})",
            self.poll_interval,
            self.source.backend_type(),
            self.sink.backend_type()
        );

        loop {
            self.tick().await;
        }
    }

    async fn cycle(&self) -> CycleOutcome {
        let source_handle = match self.supervisor.acquire(&self.source).await {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("❌ Skipping cycle, source unavailable: {}", e);
                return CycleOutcome::SourceUnavailable;
            }
        };

        // Releases the source handle on every path
        let batch = match source::try_fetch_batch(&self.source, source_handle).await {
            Ok(batch) => batch,
            Err(e) => {
                log::error!(
                    "❌ Skipping cycle, failed to read data points from {}: {}",
                    self.source.backend_type(),
                    e
                );
                return CycleOutcome::ReadFailed;
            }
        };

        if batch.is_empty() {
            log::info!("📭 No data points available, skipping publish");
            return CycleOutcome::SkippedEmpty;
        }

        let snapshot = stats::compute(&batch);

        let sink_handle = match self.supervisor.acquire(&self.sink).await {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("❌ Snapshot dropped, document store unavailable: {}", e);
                return CycleOutcome::SinkUnavailable;
            }
        };

        // Releases the sink handle on every path
        if sink::publish(&self.sink, sink_handle, &snapshot).await {
            CycleOutcome::Published { count: snapshot.count }
        } else {
            CycleOutcome::PublishFailed
        }
    }
}
