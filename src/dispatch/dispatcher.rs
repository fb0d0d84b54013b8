//! Batch dispatcher run loop

use super::batch::{PendingUnit, ScanBatch};
use super::error::{DispatchError, DispatchResult};
use crate::core::shutdown::wait_for_shutdown;
use crate::detection::DetectionClient;
use crate::scanner::types::{ScanResponse, ScanUnit};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use strum_macros::Display;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, Instant};

/// Why a batch was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FlushReason {
    Full,
    Timer,
    StreamEnd,
}

/// Counters for one dispatcher run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub batches_flushed: usize,
    pub units_submitted: usize,
    pub responses_delivered: usize,
    /// Units whose callers were released without a response
    pub units_released: usize,
    pub units_rejected: usize,
    pub failed_batches: usize,
    pub flushes_full: usize,
    pub flushes_timer: usize,
    pub flushes_stream_end: usize,
}

impl DispatchStats {
    fn record_flush(&mut self, reason: FlushReason, units: usize) {
        self.batches_flushed += 1;
        self.units_submitted += units;
        match reason {
            FlushReason::Full => self.flushes_full += 1,
            FlushReason::Timer => self.flushes_timer += 1,
            FlushReason::StreamEnd => self.flushes_stream_end += 1,
        }
    }
}

/// Collects pending units into bounded batches and fans detection results back
/// out to the callers that submitted them
///
/// A batch is sent when it reaches the limit, when no unit has arrived for one
/// flush interval, or when the input stream closes. Transport failures release
/// the batch's callers and are forwarded to the error channel; the dispatcher
/// then carries on with the next batch.
pub struct BatchDispatcher {
    client: Arc<dyn DetectionClient>,
    batch_limit: usize,
    flush_interval: Duration,
    context: String,
    errors: Option<mpsc::UnboundedSender<DispatchError>>,
}

impl BatchDispatcher {
    pub fn new(
        client: Arc<dyn DetectionClient>,
        batch_limit: usize,
        flush_interval: Duration,
    ) -> DispatchResult<Self> {
        if batch_limit == 0 {
            return Err(DispatchError::InvalidLimit);
        }
        Ok(Self {
            client,
            batch_limit,
            flush_interval,
            context: "dispatcher".to_string(),
            errors: None,
        })
    }

    /// Label prefixed to every log line, usually the scanner ID
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Forward failed batches to `errors`
    pub fn with_error_channel(mut self, errors: mpsc::UnboundedSender<DispatchError>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Run until the unit stream closes or shutdown is signalled
    pub async fn run(
        self,
        mut units: mpsc::Receiver<PendingUnit>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> DispatchResult<DispatchStats> {
        let mut batch = ScanBatch::new(self.batch_limit)?;
        let mut stats = DispatchStats::default();
        let timer = sleep(self.flush_interval);
        tokio::pin!(timer);

        log::debug!(
            "{}: dispatcher started (limit {}, flush every {:?}, service {})",
            self.context,
            self.batch_limit,
            self.flush_interval,
            self.client.service_name()
        );

        loop {
            tokio::select! {
                biased;

                _ = wait_for_shutdown(&mut shutdown) => {
                    self.cancel(&mut batch, &mut stats);
                    return Err(DispatchError::Cancelled);
                }

                received = units.recv() => match received {
                    Some(pending) => {
                        if let Err(e) = batch.add(pending) {
                            log::warn!("{}: rejected unit: {}", self.context, e);
                            stats.units_rejected += 1;
                            continue;
                        }
                        timer.as_mut().reset(Instant::now() + self.flush_interval);
                        if batch.is_full() {
                            self.flush(&mut batch, FlushReason::Full, &mut stats, &mut shutdown).await?;
                        }
                    }
                    None => {
                        if !batch.is_empty() {
                            self.flush(&mut batch, FlushReason::StreamEnd, &mut stats, &mut shutdown).await?;
                        }
                        log::debug!(
                            "{}: dispatcher finished after {} batches ({} units, {} released)",
                            self.context,
                            stats.batches_flushed,
                            stats.units_submitted,
                            stats.units_released
                        );
                        return Ok(stats);
                    }
                },

                _ = &mut timer, if !batch.is_empty() => {
                    self.flush(&mut batch, FlushReason::Timer, &mut stats, &mut shutdown).await?;
                }
            }
        }
    }

    async fn flush(
        &self,
        batch: &mut ScanBatch,
        reason: FlushReason,
        stats: &mut DispatchStats,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> DispatchResult<()> {
        let entries = batch.take();
        stats.record_flush(reason, entries.len());
        log::debug!(
            "{}: flushing {} units ({})",
            self.context,
            entries.len(),
            reason
        );

        let request: Vec<ScanUnit> = entries.iter().map(|p| p.unit.clone()).collect();
        let requested_at = SystemTime::now();

        let outcome = tokio::select! {
            biased;
            _ = wait_for_shutdown(shutdown) => {
                stats.units_released += entries.len();
                log::info!(
                    "{}: cancelled with {} units in flight",
                    self.context,
                    entries.len()
                );
                return Err(DispatchError::Cancelled);
            }
            outcome = self.client.detect(&request) => outcome,
        };
        let responded_at = SystemTime::now();

        let documents = match outcome {
            Ok(documents) => documents,
            Err(source) => {
                stats.failed_batches += 1;
                stats.units_released += entries.len();
                let error = DispatchError::Detection {
                    units: entries.len(),
                    source,
                };
                log::error!("{}: {}", self.context, error);
                if let Some(errors) = &self.errors {
                    if errors.send(error).is_err() {
                        log::debug!("{}: error channel closed", self.context);
                    }
                }
                return Ok(());
            }
        };

        let mut waiting: HashMap<String, PendingUnit> = entries
            .into_iter()
            .map(|pending| (pending.unit.id().to_string(), pending))
            .collect();

        for document in documents {
            let Some(PendingUnit { unit, reply }) = waiting.remove(&document.id) else {
                log::warn!(
                    "{}: response for unknown unit {}, skipping",
                    self.context,
                    document.id
                );
                continue;
            };
            let response = ScanResponse {
                id: document.id,
                unit,
                results: document.results,
                redacted_text: document.redacted_text,
                requested_at,
                responded_at,
            };
            match reply.send(response) {
                Ok(()) => stats.responses_delivered += 1,
                Err(response) => log::debug!(
                    "{}: caller for unit {} went away",
                    self.context,
                    response.id
                ),
            }
        }

        if !waiting.is_empty() {
            log::warn!(
                "{}: {} units got no response and were released",
                self.context,
                waiting.len()
            );
            stats.units_released += waiting.len();
        }
        Ok(())
    }

    fn cancel(&self, batch: &mut ScanBatch, stats: &mut DispatchStats) {
        let dropped = batch.take();
        stats.units_released += dropped.len();
        log::info!(
            "{}: cancelled, releasing {} pending units",
            self.context,
            dropped.len()
        );
    }
}
