/// Ranks flagged spike candidates into the final report

use crate::core::types::{Report, SpikeResult};

pub struct ResultAggregator;

impl ResultAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Keeps candidates only and sorts them by volume ratio, highest first.
    /// The sort is stable, so equal ratios keep their input order.
    pub fn rank<I>(&self, results: I) -> Report
    where
        I: IntoIterator<Item = SpikeResult>,
    {
        let mut report: Report = results.into_iter().filter(|r| r.is_candidate).collect();
        report.sort_by(|a, b| b.volume_ratio.total_cmp(&a.volume_ratio));
        report
    }
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}
