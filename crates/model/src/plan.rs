use crate::ids::BatchIndex;
use serde::{Deserialize, Serialize};

/// One contiguous `[offset, offset + limit)` slice of the source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRange {
    pub batch_index: BatchIndex,
    pub offset: usize,
    pub limit: usize,
}

/// The ordered, immutable set of ranges covering `[0, total_rows)`,
/// computed once in the Planning state and never recomputed during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPlan {
    pub total_rows: usize,
    pub batch_size: usize,
    pub ranges: Vec<BatchRange>,
}

impl BatchPlan {
    /// Builds the plan for `total_rows` rows split into batches of at most
    /// `batch_size` rows. `batch_size` must be greater than zero.
    ///
    /// Invariant (I-PARTITION, §8 property 1): the resulting ranges
    /// partition `[0, total_rows)` with no overlap and no gap, and
    /// `batch_index = offset / batch_size` for every entry.
    pub fn compute(total_rows: usize, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size must be greater than zero");

        let mut ranges = Vec::new();
        let mut offset = 0usize;
        let mut idx = 0usize;

        while offset < total_rows {
            let limit = batch_size.min(total_rows - offset);
            ranges.push(BatchRange { batch_index: BatchIndex(idx), offset, limit });
            offset += batch_size;
            idx += 1;
        }

        Self { total_rows, batch_size, ranges }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn batch_count(&self) -> usize {
        self.ranges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_without_overlap_or_gap() {
        // Scenario S1: total_rows=3, batch_size=2 -> [(0,0,2),(1,2,1)]
        let plan = BatchPlan::compute(3, 2);
        assert_eq!(plan.ranges.len(), 2);
        assert_eq!(plan.ranges[0], BatchRange { batch_index: BatchIndex(0), offset: 0, limit: 2 });
        assert_eq!(plan.ranges[1], BatchRange { batch_index: BatchIndex(1), offset: 2, limit: 1 });
    }

    #[test]
    fn zero_rows_yields_empty_plan() {
        // Scenario S2.
        let plan = BatchPlan::compute(0, 1000);
        assert!(plan.is_empty());
        assert_eq!(plan.batch_count(), 0);
    }

    #[test]
    fn exact_multiple_has_no_trailing_short_batch() {
        let plan = BatchPlan::compute(10, 5);
        assert_eq!(plan.ranges.len(), 2);
        assert_eq!(plan.ranges[1].limit, 5);
    }

    #[test]
    fn planning_is_deterministic() {
        // Property 2: same (total_rows, batch_size) yields an identical plan.
        let a = BatchPlan::compute(1_234_567, 5_000_000);
        let b = BatchPlan::compute(1_234_567, 5_000_000);
        assert_eq!(a.ranges, b.ranges);
    }

    #[test]
    fn coverage_is_exhaustive_for_arbitrary_inputs() {
        for total_rows in [0, 1, 2, 7, 100, 5_000_001] {
            for batch_size in [1usize, 3, 5_000_000] {
                let plan = BatchPlan::compute(total_rows, batch_size);
                let mut covered = 0usize;
                for (i, r) in plan.ranges.iter().enumerate() {
                    assert_eq!(r.batch_index, BatchIndex(i));
                    assert_eq!(r.offset, covered);
                    assert_eq!(r.offset / batch_size, i);
                    covered += r.limit;
                }
                assert_eq!(covered, total_rows);
            }
        }
    }
}
