//! Term query: documents containing one analyzed term.

use std::any::Any;

use crate::error::Result;
use crate::index::segment::SegmentReader;
use crate::query::query::{Query, ScoredDocs, idf};

/// Matches documents containing `term` in `field`, or in any field when no
/// field is given.
#[derive(Debug, Clone, PartialEq)]
pub struct TermQuery {
    field: Option<String>,
    term: String,
    boost: f32,
}

impl TermQuery {
    pub fn new<F, T>(field: F, term: T) -> Self
    where
        F: Into<String>,
        T: Into<String>,
    {
        let field = field.into();
        TermQuery {
            field: (!field.is_empty()).then_some(field),
            term: term.into(),
            boost: 1.0,
        }
    }

    /// A term query over every field.
    pub fn any_field<T: Into<String>>(term: T) -> Self {
        TermQuery {
            field: None,
            term: term.into(),
            boost: 1.0,
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn boost(&self) -> f32 {
        self.boost
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

impl Query for TermQuery {
    fn score_segment(&self, segment: &SegmentReader) -> Result<ScoredDocs> {
        let mut scores = ScoredDocs::default();
        let data = segment.data();

        let lists: Vec<_> = match &self.field {
            Some(field) => data.postings(field, &self.term).into_iter().collect(),
            None => data
                .postings_any_field(&self.term)
                .map(|(_, postings)| postings)
                .collect(),
        };

        for postings in lists {
            let weight = idf(postings.len(), segment.max_doc()) * self.boost;
            for posting in postings {
                if segment.is_deleted(posting.doc) {
                    continue;
                }
                *scores.entry(posting.doc).or_insert(0.0) +=
                    (posting.term_freq() as f32).sqrt() * weight;
            }
        }

        Ok(scores)
    }

    fn description(&self) -> String {
        match &self.field {
            Some(field) => format!("{field}:{}", self.term),
            None => self.term.clone(),
        }
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::test_support::segment_with;

    #[test]
    fn test_term_query_on_field() {
        let segment = segment_with(&[("#1:0", "hello world"), ("#1:1", "goodbye world")]);

        let scores = TermQuery::new("text", "world").score_segment(&segment).unwrap();
        assert_eq!(scores.len(), 2);

        let scores = TermQuery::new("text", "hello").score_segment(&segment).unwrap();
        assert_eq!(scores.keys().copied().collect::<Vec<_>>(), vec![0]);

        let scores = TermQuery::new("other", "hello").score_segment(&segment).unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn test_empty_field_means_any_field() {
        let segment = segment_with(&[("#1:0", "hello world")]);
        let query = TermQuery::new("", "hello");

        assert_eq!(query.field(), None);
        assert_eq!(query.description(), "hello");
        assert_eq!(query.score_segment(&segment).unwrap().len(), 1);
    }

    #[test]
    fn test_higher_frequency_scores_higher() {
        let segment = segment_with(&[("#1:0", "rome"), ("#1:1", "rome rome rome")]);
        let scores = TermQuery::any_field("rome").score_segment(&segment).unwrap();

        assert!(scores.get(&1) > scores.get(&0));
    }
}
