//! Collects the best-scoring hits of a search.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::index::reader::DocAddress;

/// One hit.
#[derive(Debug, Clone, Copy)]
pub struct ScoreDoc {
    pub address: DocAddress,
    pub score: f32,
}

impl PartialEq for ScoreDoc {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoreDoc {}

impl Ord for ScoreDoc {
    /// Higher score is greater; on ties the lower address wins.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.address.cmp(&self.address))
    }
}

impl PartialOrd for ScoreDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Result of a search: the total match count and the best hits.
#[derive(Debug, Clone, Default)]
pub struct TopDocs {
    pub total_hits: usize,
    pub score_docs: Vec<ScoreDoc>,
}

/// Keeps the `limit` best hits in a min-heap.
#[derive(Debug)]
pub struct TopDocsCollector {
    limit: usize,
    total_hits: usize,
    heap: BinaryHeap<Reverse<ScoreDoc>>,
}

impl TopDocsCollector {
    pub fn new(limit: usize) -> Self {
        TopDocsCollector {
            limit,
            total_hits: 0,
            heap: BinaryHeap::with_capacity(limit.min(1024)),
        }
    }

    pub fn collect(&mut self, address: DocAddress, score: f32) {
        self.total_hits += 1;
        if self.limit == 0 {
            return;
        }

        let hit = ScoreDoc { address, score };
        if self.heap.len() < self.limit {
            self.heap.push(Reverse(hit));
        } else if let Some(Reverse(worst)) = self.heap.peek()
            && hit > *worst
        {
            self.heap.pop();
            self.heap.push(Reverse(hit));
        }
    }

    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    /// Hits sorted best first.
    pub fn into_top_docs(self) -> TopDocs {
        TopDocs {
            total_hits: self.total_hits,
            score_docs: self
                .heap
                .into_sorted_vec()
                .into_iter()
                .map(|Reverse(hit)| hit)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(segment: usize, doc: u32) -> DocAddress {
        DocAddress { segment, doc }
    }

    #[test]
    fn test_keeps_best_hits_in_order() {
        let mut collector = TopDocsCollector::new(2);
        collector.collect(addr(0, 0), 0.5);
        collector.collect(addr(0, 1), 2.0);
        collector.collect(addr(1, 0), 1.0);
        collector.collect(addr(1, 1), 0.1);

        let top = collector.into_top_docs();
        assert_eq!(top.total_hits, 4);
        let hits: Vec<_> = top.score_docs.iter().map(|h| h.address).collect();
        assert_eq!(hits, vec![addr(0, 1), addr(1, 0)]);
    }

    #[test]
    fn test_ties_prefer_lower_address() {
        let mut collector = TopDocsCollector::new(1);
        collector.collect(addr(1, 0), 1.0);
        collector.collect(addr(0, 3), 1.0);

        let top = collector.into_top_docs();
        assert_eq!(top.score_docs[0].address, addr(0, 3));
    }

    #[test]
    fn test_zero_limit_only_counts() {
        let mut collector = TopDocsCollector::new(0);
        collector.collect(addr(0, 0), 1.0);
        assert_eq!(collector.total_hits(), 1);
        assert!(collector.into_top_docs().score_docs.is_empty());
    }
}
