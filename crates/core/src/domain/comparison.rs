// Comparison, MultiComparison and BulkComparison jobs

use serde::{Deserialize, Serialize};

use crate::domain::job::{child_id, JobId, JobKind, JobMeta, JobRecord};
use crate::domain::params::{ComparisonSpec, RunParams};

/// Paired comparison: one baseline and one accelerated TestJob for the same URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonJob {
    pub meta: JobMeta,
    pub url: String,
    pub params: RunParams,
    pub baseline_test: JobId,
    pub accelerated_test: JobId,
    /// Set once both tests have been dispatched
    pub tests_started: bool,
}

impl JobRecord for ComparisonJob {
    const KIND: JobKind = JobKind::Comparison;

    fn meta(&self) -> &JobMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut JobMeta {
        &mut self.meta
    }
}

impl ComparisonJob {
    pub fn new(
        meta: JobMeta,
        url: impl Into<String>,
        params: RunParams,
        baseline_test: JobId,
        accelerated_test: JobId,
    ) -> Self {
        Self {
            meta,
            url: url.into(),
            params,
            baseline_test,
            accelerated_test,
            tests_started: false,
        }
    }

    pub fn test_ids(&self) -> [JobId; 2] {
        [self.baseline_test.clone(), self.accelerated_test.clone()]
    }
}

/// Repeated measurement of one URL: comparisons run strictly one after another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiComparisonJob {
    pub meta: JobMeta,
    pub url: String,
    pub params: RunParams,
    pub runs: u32,
    /// Append-only
    pub comparisons: Vec<JobId>,
}

impl JobRecord for MultiComparisonJob {
    const KIND: JobKind = JobKind::MultiComparison;

    fn meta(&self) -> &JobMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut JobMeta {
        &mut self.meta
    }
}

impl MultiComparisonJob {
    pub fn new(meta: JobMeta, url: impl Into<String>, params: RunParams, runs: u32) -> Self {
        Self {
            meta,
            url: url.into(),
            params,
            runs,
            comparisons: Vec::new(),
        }
    }

    /// All requested comparisons have been created
    pub fn all_started(&self) -> bool {
        self.comparisons.len() >= self.runs as usize
    }

    /// Id for comparison number `len + 1`
    pub fn next_comparison_id(&self) -> JobId {
        child_id(&self.meta.id, &format!("c{}", self.comparisons.len() + 1))
    }
}

/// Campaign over many URLs, advanced one MultiComparisonJob at a time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkComparisonJob {
    pub meta: JobMeta,
    pub comparisons_to_start: Vec<ComparisonSpec>,
    /// Append-only, one entry per started spec
    pub multi_comparisons: Vec<JobId>,
}

impl JobRecord for BulkComparisonJob {
    const KIND: JobKind = JobKind::BulkComparison;

    fn meta(&self) -> &JobMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut JobMeta {
        &mut self.meta
    }
}

impl BulkComparisonJob {
    pub fn new(meta: JobMeta, comparisons_to_start: Vec<ComparisonSpec>) -> Self {
        Self {
            meta,
            comparisons_to_start,
            multi_comparisons: Vec::new(),
        }
    }

    /// Id for MultiComparisonJob number `len + 1`
    pub fn next_multi_comparison_id(&self) -> JobId {
        child_id(&self.meta.id, &format!("m{}", self.multi_comparisons.len() + 1))
    }

    /// First queued spec whose URL has no started MultiComparisonJob yet
    ///
    /// Matching is exact string equality on the URL only; other run
    /// parameters are ignored, so a later spec repeating a URL is skipped.
    pub fn next_unscheduled<'a>(
        &'a self,
        started: &[MultiComparisonJob],
    ) -> Option<&'a ComparisonSpec> {
        self.comparisons_to_start
            .iter()
            .find(|spec| !started.iter().any(|multi| multi.url == spec.url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multi(url: &str) -> MultiComparisonJob {
        MultiComparisonJob::new(JobMeta::new(url, "tester", 0), url, RunParams::default(), 1)
    }

    #[test]
    fn test_next_unscheduled_follows_queue_order() {
        let bulk = BulkComparisonJob::new(
            JobMeta::new("b", "tester", 0),
            vec![ComparisonSpec::new("https://a"), ComparisonSpec::new("https://b")],
        );

        assert_eq!(bulk.next_unscheduled(&[]).unwrap().url, "https://a");
        assert_eq!(
            bulk.next_unscheduled(&[multi("https://a")]).unwrap().url,
            "https://b"
        );
        assert!(bulk
            .next_unscheduled(&[multi("https://a"), multi("https://b")])
            .is_none());
    }

    #[test]
    fn test_next_unscheduled_skips_repeated_url_regardless_of_params() {
        let mut mobile = ComparisonSpec::new("https://a");
        mobile.params.mobile = true;
        let bulk = BulkComparisonJob::new(
            JobMeta::new("b", "tester", 0),
            vec![ComparisonSpec::new("https://a"), mobile],
        );

        assert!(bulk.next_unscheduled(&[multi("https://a")]).is_none());
    }

    #[test]
    fn test_child_ids_are_derived_from_position() {
        let mut job = multi("https://a");
        assert_eq!(job.next_comparison_id(), "https://a-c1");
        job.comparisons.push(job.next_comparison_id());
        assert_eq!(job.next_comparison_id(), "https://a-c2");
        assert!(job.all_started());
    }
}
