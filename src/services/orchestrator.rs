//! Collection orchestration
//!
//! Drives the collector across the configured vault set, either once at
//! the current head ("incremental") or across a wall-clock range at a
//! fixed step ("backfill"). Execution is sequential: one vault at one
//! block at a time, time steps in strictly increasing order. Per-vault
//! and per-step failures are logged and do not stop the run.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{error, info};

use crate::services::block_time::find_block_by_time;
use crate::services::chain::{ChainError, ChainReader};
use crate::services::collector::MetricCollector;
use crate::services::store::MetricStore;

/// Source tag for collections at the current head
pub const SOURCE_INCREMENTAL: &str = "incremental:latest";

/// Source tag for historical backfill collections
pub const SOURCE_BACKFILL: &str = "backfill";

/// Error types for a whole orchestrated run
#[derive(Debug)]
pub enum OrchestrateError {
    InvalidRange(String),
    Chain(ChainError),
}

impl std::fmt::Display for OrchestrateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestrateError::InvalidRange(msg) => write!(f, "Invalid backfill range: {}", msg),
            OrchestrateError::Chain(e) => write!(f, "Chain error: {}", e),
        }
    }
}

impl std::error::Error for OrchestrateError {}

/// Counters for one orchestrated run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Units of work attempted (one vault at one block)
    pub attempted: usize,
    /// Units that completed without error (including idempotent no-ops
    /// and validation skips)
    pub collected: usize,
}

pub struct CollectionOrchestrator<C, S> {
    chain: Arc<C>,
    collector: MetricCollector<C, S>,
    vaults: Vec<String>,
}

impl<C: ChainReader, S: MetricStore> CollectionOrchestrator<C, S> {
    pub fn new(chain: Arc<C>, store: Arc<S>, vaults: Vec<String>) -> Self {
        let collector = MetricCollector::new(Arc::clone(&chain), store);
        Self {
            chain,
            collector,
            vaults,
        }
    }

    /// One pass at the current head for every configured vault.
    ///
    /// Head resolution failure aborts the run; per-vault failures are
    /// isolated.
    pub async fn run_incremental(&self) -> Result<RunSummary, OrchestrateError> {
        let head = self
            .chain
            .head_block_number()
            .await
            .map_err(OrchestrateError::Chain)?;

        info!(block = head, vaults = self.vaults.len(), "Starting incremental collection");

        let mut summary = RunSummary::default();
        self.collect_step(head, SOURCE_INCREMENTAL, &mut summary).await;

        info!(
            collected = summary.collected,
            attempted = summary.attempted,
            "Incremental collection completed"
        );

        Ok(summary)
    }

    /// Backfill across `[start, end]` at `step_secs` intervals.
    ///
    /// The range is validated before any chain call. Each step resolves a
    /// block via binary search; a resolution failure skips that step only.
    /// Steps resolving to the same block are absorbed by the idempotent
    /// insert.
    pub async fn run_backfill(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step_secs: i64,
    ) -> Result<RunSummary, OrchestrateError> {
        if end <= start {
            return Err(OrchestrateError::InvalidRange(format!(
                "end {} must be after start {}",
                end, start
            )));
        }
        if step_secs <= 0 {
            return Err(OrchestrateError::InvalidRange(format!(
                "step must be positive, got {}",
                step_secs
            )));
        }
        if start.timestamp() < 0 {
            return Err(OrchestrateError::InvalidRange(format!(
                "start {} predates the unix epoch",
                start
            )));
        }

        let step = Duration::seconds(step_secs);
        info!(
            start = %start,
            end = %end,
            step_secs = step_secs,
            vaults = self.vaults.len(),
            "Starting backfill"
        );

        let mut summary = RunSummary::default();
        let mut t = start;
        while t <= end {
            let block = match find_block_by_time(&*self.chain, t.timestamp() as u64).await {
                Ok(block) => block,
                Err(e) => {
                    error!(step = %t, error = %e, "Block resolution failed, skipping step");
                    summary.attempted += self.vaults.len();
                    t += step;
                    continue;
                }
            };

            info!(step = %t, block = block, "Backfill step resolved");
            self.collect_step(block, SOURCE_BACKFILL, &mut summary).await;
            t += step;
        }

        info!(
            collected = summary.collected,
            attempted = summary.attempted,
            "Backfill completed"
        );

        Ok(summary)
    }

    /// Collect every vault at one block, in supplied order, each
    /// fault-isolated.
    async fn collect_step(&self, block: u64, source: &str, summary: &mut RunSummary) {
        for vault in &self.vaults {
            summary.attempted += 1;
            match self.collector.collect_at_block(vault, block, source).await {
                Ok(_) => summary.collected += 1,
                Err(e) => {
                    error!(
                        vault = %vault,
                        block = block,
                        source = source,
                        error = %e,
                        "Collection failed for vault, continuing"
                    );
                }
            }
        }
    }
}
