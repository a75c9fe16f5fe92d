//! Terminal progress for batch runs

use crate::batch::{failure_message, CaseReporter};
use crate::error::RadiobatchError;
use crate::table::ResultTable;
use crate::types::CasePair;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::sync::OnceLock;

fn batch_style() -> &'static ProgressStyle {
    static STYLE: OnceLock<ProgressStyle> = OnceLock::new();
    STYLE.get_or_init(|| {
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] Cases: [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    })
}

/// Progress bar advancing once per finished case
///
/// Failures are printed above the bar and logged, so they stay visible
/// after the bar is cleared. The bar hides itself when stderr is not a
/// terminal.
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(batch_style().clone());
        Self { bar }
    }

    /// Reporter that never draws, for quiet runs and tests
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl CaseReporter for ProgressReporter {
    fn case_started(&self, _index: usize, total: usize, pair: &CasePair) {
        if self.bar.length() != Some(total as u64) {
            self.bar.set_length(total as u64);
        }
        self.bar.set_message(pair.name());
    }

    fn case_succeeded(&self, pair: &CasePair, feature_count: usize) {
        info!("Processed: {} ({} features)", pair.name(), feature_count);
        self.bar.inc(1);
    }

    fn case_failed(&self, pair: &CasePair, error: &RadiobatchError) {
        let message = failure_message(error);
        warn!("{}: extraction failed: {}", pair.name(), message);
        self.bar.println(format!(
            "Error processing {}: {}. Please check the image and mask files.",
            pair.name(),
            message
        ));
        self.bar.inc(1);
    }

    fn batch_finished(&self, table: &ResultTable) {
        self.bar.finish_and_clear();
        info!(
            "Batch finished: {} cases, {} failed",
            table.len(),
            table.failure_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;

    #[test]
    fn test_counts_every_case() {
        let reporter = ProgressReporter::hidden();
        let a = CasePair::new("/img/A.nii", "/mask/A.nii");
        let b = CasePair::new("/img/B.nii", "/mask/B.nii");

        reporter.case_started(0, 2, &a);
        reporter.case_succeeded(&a, 19);
        reporter.case_started(1, 2, &b);
        reporter.case_failed(&b, &RadiobatchError::extraction("B.nii", "empty ROI"));
        assert_eq!(reporter.position(), 2);

        reporter.batch_finished(&TableBuilder::new().finish());
    }
}
