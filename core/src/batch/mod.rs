//! Batch orchestration
//!
//! [`BatchRunner::run`] extracts every case in pairing order and never
//! stops early: a failing case becomes a failure row and the run moves on.
//! With more than one worker, cases run on a fixed-size thread pool and
//! their rows are merged by original pair index once all workers finish.

use crate::error::RadiobatchError;
use crate::extraction::CaseExtractor;
use crate::table::{FeatureRow, ResultTable, TableBuilder};
use crate::types::{CasePair, ExtractionConfig};
use log::{debug, info, warn};
use rayon::prelude::*;

/// Side channel for per-case notifications
///
/// Called from worker threads when running in parallel.
pub trait CaseReporter: Sync {
    fn case_started(&self, _index: usize, _total: usize, _pair: &CasePair) {}

    fn case_succeeded(&self, _pair: &CasePair, _feature_count: usize) {}

    /// Called once for every failed case, with the case name and cause
    fn case_failed(&self, pair: &CasePair, error: &RadiobatchError);

    fn batch_finished(&self, _table: &ResultTable) {}
}

/// Reporter writing notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl CaseReporter for LogReporter {
    fn case_started(&self, index: usize, total: usize, pair: &CasePair) {
        debug!("[{}/{}] Extracting {}", index + 1, total, pair);
    }

    fn case_succeeded(&self, pair: &CasePair, feature_count: usize) {
        info!("Processed: {} ({} features)", pair.name(), feature_count);
    }

    fn case_failed(&self, pair: &CasePair, error: &RadiobatchError) {
        warn!(
            "{}: extraction failed, check the image and mask: {}",
            pair.name(),
            failure_message(error)
        );
    }

    fn batch_finished(&self, table: &ResultTable) {
        info!(
            "Batch finished: {} cases, {} failed",
            table.len(),
            table.failure_count()
        );
    }
}

/// Runs a [`CaseExtractor`] over a list of pairs
pub struct BatchRunner<E> {
    extractor: E,
    workers: usize,
}

impl<E: CaseExtractor> BatchRunner<E> {
    /// Creates a sequential runner
    pub fn new(extractor: E) -> Self {
        Self {
            extractor,
            workers: 1,
        }
    }

    /// Sets the worker pool size; `0` and `1` both mean sequential
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Extracts every pair and returns the frozen result table
    ///
    /// The table has exactly one row per pair, in pair order.
    pub fn run(
        &self,
        config: &ExtractionConfig,
        pairs: &[CasePair],
        reporter: &dyn CaseReporter,
    ) -> ResultTable {
        let total = pairs.len();
        info!("Extracting {} cases with {} worker(s)", total, self.workers);

        let rows = if self.workers > 1 && total > 1 {
            self.run_parallel(config, pairs, reporter)
        } else {
            self.run_sequential(config, pairs, reporter)
        };

        let mut builder = TableBuilder::new();
        for row in rows {
            builder.push(row);
        }
        let table = builder.finish();
        reporter.batch_finished(&table);
        table
    }

    fn run_sequential(
        &self,
        config: &ExtractionConfig,
        pairs: &[CasePair],
        reporter: &dyn CaseReporter,
    ) -> Vec<FeatureRow> {
        pairs
            .iter()
            .enumerate()
            .map(|(index, pair)| self.process(config, pair, index, pairs.len(), reporter))
            .collect()
    }

    fn run_parallel(
        &self,
        config: &ExtractionConfig,
        pairs: &[CasePair],
        reporter: &dyn CaseReporter,
    ) -> Vec<FeatureRow> {
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Failed to start worker pool ({}), running sequentially", e);
                return self.run_sequential(config, pairs, reporter);
            }
        };

        // collect() on an indexed parallel iterator keeps pair order
        pool.install(|| {
            pairs
                .par_iter()
                .enumerate()
                .map(|(index, pair)| self.process(config, pair, index, pairs.len(), reporter))
                .collect()
        })
    }

    fn process(
        &self,
        config: &ExtractionConfig,
        pair: &CasePair,
        index: usize,
        total: usize,
        reporter: &dyn CaseReporter,
    ) -> FeatureRow {
        reporter.case_started(index, total, pair);
        match self.extractor.extract(config, pair) {
            Ok(features) => {
                reporter.case_succeeded(pair, features.len());
                FeatureRow::success(pair.name(), features)
            }
            Err(e) => {
                reporter.case_failed(pair, &e);
                FeatureRow::failure(pair.name(), failure_message(&e))
            }
        }
    }
}

pub(crate) fn failure_message(error: &RadiobatchError) -> String {
    match error {
        RadiobatchError::Extraction { cause, .. } => cause.clone(),
        other => other.to_string(),
    }
}
