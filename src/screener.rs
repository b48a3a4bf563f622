// =============================================================================
// Screener — concurrent batch run over every instrument of a bar source
// =============================================================================
//
// Each instrument is loaded, clipped to the configured date range and analysed
// on the blocking pool under its own timeout.  At most `max_workers` analyses
// run at once, counting ones whose timeout already fired.  The
// market-cap table is shared read-only; the only shared mutable state is the
// append-only results list.
//
// Per-instrument failures never abort the batch: they are logged, counted in
// the summary, and the instrument is skipped.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::analysis_result::AnalysisResult;
use crate::market_data::{BarSource, DateRange, IngestError, MarketCapTable};
use crate::strategy::SignalAggregator;

/// Counts for one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub total: usize,
    /// Instruments that produced an [`AnalysisResult`].
    pub evaluated: usize,
    pub selected: usize,
    /// Fewer than the minimum number of bars inside the date range.
    pub not_evaluable: usize,
    /// Not evaluable plus malformed input.
    pub skipped: usize,
    /// I/O errors, timeouts and panics.
    pub failed: usize,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub summary: BatchSummary,
    /// Every evaluated instrument, sorted by identifier.
    pub results: Vec<AnalysisResult>,
}

/// What happened to a single instrument.
#[derive(Debug)]
enum InstrumentOutcome {
    Evaluated(AnalysisResult),
    NotEvaluable,
    Malformed(String),
    Failed(String),
}

/// Outcome kind once the result itself has been handed to the shared list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tally {
    Evaluated { selected: bool },
    NotEvaluable,
    Malformed,
    Failed,
}

pub struct Screener {
    source: Arc<dyn BarSource>,
    market_caps: Arc<MarketCapTable>,
    aggregator: SignalAggregator,
    max_workers: usize,
    instrument_timeout: Duration,
    date_range: DateRange,
    max_instruments: Option<usize>,
}

impl Screener {
    pub fn new(
        source: Arc<dyn BarSource>,
        market_caps: Arc<MarketCapTable>,
        aggregator: SignalAggregator,
    ) -> Self {
        Self {
            source,
            market_caps,
            aggregator,
            max_workers: 4,
            instrument_timeout: Duration::from_secs(30),
            date_range: DateRange::default(),
            max_instruments: None,
        }
    }

    /// Clamped to at least one worker.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_instrument_timeout(mut self, timeout: Duration) -> Self {
        self.instrument_timeout = timeout;
        self
    }

    /// Only bars inside `range` are analysed.
    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = range;
        self
    }

    /// Screen at most the first `limit` instruments in identifier order.
    pub fn with_max_instruments(mut self, limit: Option<usize>) -> Self {
        self.max_instruments = limit;
        self
    }

    /// Screen every instrument the source lists.
    ///
    /// Errors only when the instrument list itself cannot be obtained or is
    /// empty.
    pub async fn run(&self) -> Result<BatchOutcome> {
        let mut instruments = self
            .source
            .instruments()
            .context("failed to list instruments")?;
        if instruments.is_empty() {
            bail!("bar source lists no instruments");
        }
        instruments.sort();
        if let Some(limit) = self.max_instruments {
            if limit < instruments.len() {
                info!(available = instruments.len(), limit, "instrument list truncated");
                instruments.truncate(limit);
            }
        }

        let run_id = Uuid::new_v4();
        let total = instruments.len();
        info!(%run_id, total, workers = self.max_workers, "screening started");

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let results: Arc<Mutex<Vec<AnalysisResult>>> =
            Arc::new(Mutex::new(Vec::with_capacity(total)));
        let mut tasks = JoinSet::new();

        for instrument in instruments {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .context("worker semaphore closed")?;

            let source = self.source.clone();
            let market_caps = self.market_caps.clone();
            let aggregator = self.aggregator;
            let job = Job {
                range: self.date_range,
                timeout: self.instrument_timeout,
            };
            let results = results.clone();

            tasks.spawn(async move {
                let outcome =
                    screen_instrument(source, market_caps, aggregator, &instrument, job, permit)
                        .await;
                log_outcome(&instrument, &outcome);

                match outcome {
                    InstrumentOutcome::Evaluated(result) => {
                        let selected = result.selected;
                        results.lock().push(result);
                        Tally::Evaluated { selected }
                    }
                    InstrumentOutcome::NotEvaluable => Tally::NotEvaluable,
                    InstrumentOutcome::Malformed(_) => Tally::Malformed,
                    InstrumentOutcome::Failed(_) => Tally::Failed,
                }
            });
        }

        let mut summary = BatchSummary {
            run_id,
            total,
            evaluated: 0,
            selected: 0,
            not_evaluable: 0,
            skipped: 0,
            failed: 0,
        };

        while let Some(joined) = tasks.join_next().await {
            let tally = joined.unwrap_or_else(|e| {
                error!(error = %e, "screening task aborted");
                Tally::Failed
            });
            match tally {
                Tally::Evaluated { selected } => {
                    summary.evaluated += 1;
                    summary.selected += usize::from(selected);
                }
                Tally::NotEvaluable => {
                    summary.not_evaluable += 1;
                    summary.skipped += 1;
                }
                Tally::Malformed => summary.skipped += 1,
                Tally::Failed => summary.failed += 1,
            }
        }

        let mut results = std::mem::take(&mut *results.lock());
        results.sort_by(|a, b| a.instrument.cmp(&b.instrument));

        info!(
            %run_id,
            total = summary.total,
            evaluated = summary.evaluated,
            selected = summary.selected,
            skipped = summary.skipped,
            failed = summary.failed,
            "screening finished"
        );

        Ok(BatchOutcome { summary, results })
    }
}

/// Per-instrument limits shared by every task of a run.
#[derive(Debug, Clone, Copy)]
struct Job {
    range: DateRange,
    timeout: Duration,
}

async fn screen_instrument(
    source: Arc<dyn BarSource>,
    market_caps: Arc<MarketCapTable>,
    aggregator: SignalAggregator,
    instrument: &str,
    job: Job,
    permit: OwnedSemaphorePermit,
) -> InstrumentOutcome {
    let id = instrument.to_string();
    // The permit lives as long as the blocking work, not the timeout.
    let work = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        let series = source.load(&id)?;
        Ok::<_, IngestError>(
            series
                .clip(&job.range)
                .and_then(|s| aggregator.evaluate(&id, &s, &market_caps)),
        )
    });

    // A timed-out blocking task keeps running detached; its result is dropped.
    match tokio::time::timeout(job.timeout, work).await {
        Err(_) => InstrumentOutcome::Failed(format!(
            "timed out after {}s",
            job.timeout.as_secs_f64()
        )),
        Ok(Err(join_err)) => InstrumentOutcome::Failed(format!("analysis panicked: {join_err}")),
        Ok(Ok(Err(e))) if e.is_malformed() => InstrumentOutcome::Malformed(e.to_string()),
        Ok(Ok(Err(e))) => InstrumentOutcome::Failed(e.to_string()),
        Ok(Ok(Ok(None))) => InstrumentOutcome::NotEvaluable,
        Ok(Ok(Ok(Some(result)))) => InstrumentOutcome::Evaluated(result),
    }
}

fn log_outcome(instrument: &str, outcome: &InstrumentOutcome) {
    match outcome {
        InstrumentOutcome::Evaluated(r) if r.selected => {
            info!(instrument, date = %r.date, j = ?r.j, dif = ?r.dif, "selected");
        }
        InstrumentOutcome::Evaluated(r) => {
            info!(
                instrument,
                date = %r.date,
                reasons = %r.rejection_reasons().join("; "),
                "not selected"
            );
        }
        InstrumentOutcome::NotEvaluable => debug!(instrument, "not evaluable"),
        InstrumentOutcome::Malformed(reason) => {
            warn!(instrument, reason = %reason, "malformed bar data, skipped");
        }
        InstrumentOutcome::Failed(reason) => {
            error!(instrument, reason = %reason, "instrument failed");
        }
    }
}
