//! Matches every live document.

use std::any::Any;

use crate::error::Result;
use crate::index::segment::SegmentReader;
use crate::query::query::{Query, ScoredDocs};

#[derive(Debug, Clone, Default)]
pub struct MatchAllQuery;

impl MatchAllQuery {
    pub fn new() -> Self {
        MatchAllQuery
    }
}

impl Query for MatchAllQuery {
    fn score_segment(&self, segment: &SegmentReader) -> Result<ScoredDocs> {
        Ok(segment.live_docs().map(|doc| (doc, 1.0)).collect())
    }

    fn description(&self) -> String {
        "*:*".to_string()
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
