use std::iter::FusedIterator;

use bsh_core::ConfigurationPoint;
use serde::{Deserialize, Serialize};

/// The four ordered parameter dimensions swept by the harness.
///
/// Points are enumerated depth outermost, then batch size, then thread
/// count, with total operations varying fastest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSpace {
    #[serde(default = "SweepSpace::default_depths")]
    pub depths: Vec<u64>,
    #[serde(default = "SweepSpace::default_batch_sizes")]
    pub batch_sizes: Vec<u64>,
    #[serde(default = "SweepSpace::default_thread_counts")]
    pub thread_counts: Vec<u64>,
    #[serde(default = "SweepSpace::default_total_ops")]
    pub total_ops: Vec<u64>,
}

impl SweepSpace {
    fn default_depths() -> Vec<u64> {
        vec![12, 16, 20, 24]
    }

    fn default_batch_sizes() -> Vec<u64> {
        vec![1024, 2048, 4096]
    }

    fn default_thread_counts() -> Vec<u64> {
        vec![2, 4, 8, 16, 32, 64]
    }

    fn default_total_ops() -> Vec<u64> {
        vec![50_000, 100_000, 500_000, 1_000_000]
    }

    pub fn new(
        depths: Vec<u64>,
        batch_sizes: Vec<u64>,
        thread_counts: Vec<u64>,
        total_ops: Vec<u64>,
    ) -> Self {
        Self {
            depths,
            batch_sizes,
            thread_counts,
            total_ops,
        }
    }

    /// Number of points in the cross-product. Zero if any dimension is empty.
    pub fn len(&self) -> usize {
        self.depths.len() * self.batch_sizes.len() * self.thread_counts.len() * self.total_ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the point attempted at position `index`, or `None` past the end.
    pub fn point(&self, index: usize) -> Option<ConfigurationPoint> {
        if index >= self.len() {
            return None;
        }
        let mut rest = index;
        let ops = rest % self.total_ops.len();
        rest /= self.total_ops.len();
        let threads = rest % self.thread_counts.len();
        rest /= self.thread_counts.len();
        let batch = rest % self.batch_sizes.len();
        rest /= self.batch_sizes.len();
        Some(ConfigurationPoint::new(
            self.depths[rest],
            self.batch_sizes[batch],
            self.thread_counts[threads],
            self.total_ops[ops],
        ))
    }

    /// Lazily enumerates every point in attempt order.
    pub fn points(&self) -> Points<'_> {
        Points {
            space: self,
            next: 0,
            end: self.len(),
        }
    }
}

impl Default for SweepSpace {
    fn default() -> Self {
        Self::new(
            Self::default_depths(),
            Self::default_batch_sizes(),
            Self::default_thread_counts(),
            Self::default_total_ops(),
        )
    }
}

impl<'a> IntoIterator for &'a SweepSpace {
    type Item = ConfigurationPoint;
    type IntoIter = Points<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.points()
    }
}

/// Iterator returned by [`SweepSpace::points`].
#[derive(Debug, Clone)]
pub struct Points<'a> {
    space: &'a SweepSpace,
    next: usize,
    end: usize,
}

impl Iterator for Points<'_> {
    type Item = ConfigurationPoint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let point = self.space.point(self.next);
        self.next += 1;
        point
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Points<'_> {}

impl FusedIterator for Points<'_> {}
