//! Phrase query: terms at fixed relative positions.

use std::any::Any;

use ahash::AHashMap;

use crate::error::Result;
use crate::index::segment::{DocId, Posting, SegmentReader};
use crate::query::query::{Query, ScoredDocs, idf};

/// Matches documents where the terms occur at the given relative positions.
///
/// Positions come from analysis, so a stop word removed from the middle of a
/// phrase leaves the same gap in the query as in the indexed text.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseQuery {
    field: Option<String>,
    terms: Vec<(u32, String)>,
    boost: f32,
}

impl PhraseQuery {
    /// Build a phrase from `(position, term)` pairs. Positions are made
    /// relative to the first one.
    pub fn new<F: Into<String>>(field: F, terms: Vec<(u32, String)>) -> Self {
        let field = field.into();
        let base = terms.first().map(|(pos, _)| *pos).unwrap_or(0);
        PhraseQuery {
            field: (!field.is_empty()).then_some(field),
            terms: terms
                .into_iter()
                .map(|(pos, term)| (pos.saturating_sub(base), term))
                .collect(),
            boost: 1.0,
        }
    }

    /// Build a phrase of consecutive terms.
    pub fn from_terms<F: Into<String>, T: Into<String>>(field: F, terms: Vec<T>) -> Self {
        Self::new(
            field,
            terms
                .into_iter()
                .enumerate()
                .map(|(pos, term)| (pos as u32, term.into()))
                .collect(),
        )
    }

    pub fn terms(&self) -> &[(u32, String)] {
        &self.terms
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    fn candidate_fields<'a>(&'a self, segment: &'a SegmentReader) -> Vec<&'a str> {
        match (&self.field, self.terms.first()) {
            (Some(field), _) => vec![field.as_str()],
            (None, Some((_, first))) => segment
                .data()
                .postings_any_field(first)
                .map(|(field, _)| field)
                .collect(),
            (None, None) => Vec::new(),
        }
    }

    fn score_field(&self, segment: &SegmentReader, field: &str, scores: &mut ScoredDocs) {
        let data = segment.data();
        let mut lists: Vec<&[Posting]> = Vec::with_capacity(self.terms.len());
        for (_, term) in &self.terms {
            match data.postings(field, term) {
                Some(postings) => lists.push(postings),
                None => return,
            }
        }

        let weight: f32 = lists
            .iter()
            .map(|postings| idf(postings.len(), segment.max_doc()))
            .sum::<f32>()
            * self.boost;

        let by_doc: Vec<AHashMap<DocId, &[u32]>> = lists[1..]
            .iter()
            .map(|postings| {
                postings
                    .iter()
                    .map(|p| (p.doc, p.positions.as_slice()))
                    .collect()
            })
            .collect();

        for first in lists[0] {
            if segment.is_deleted(first.doc) {
                continue;
            }

            let mut freq = 0usize;
            'start: for start in &first.positions {
                for (i, (offset, _)) in self.terms.iter().enumerate().skip(1) {
                    let Some(positions) = by_doc[i - 1].get(&first.doc) else {
                        break 'start;
                    };
                    if positions.binary_search(&(start + offset)).is_err() {
                        continue 'start;
                    }
                }
                freq += 1;
            }

            if freq > 0 {
                *scores.entry(first.doc).or_insert(0.0) += (freq as f32).sqrt() * weight;
            }
        }
    }
}

impl Query for PhraseQuery {
    fn score_segment(&self, segment: &SegmentReader) -> Result<ScoredDocs> {
        let mut scores = ScoredDocs::default();
        if self.terms.is_empty() {
            return Ok(scores);
        }

        for field in self.candidate_fields(segment) {
            self.score_field(segment, field, &mut scores);
        }
        Ok(scores)
    }

    fn description(&self) -> String {
        let text = self
            .terms
            .iter()
            .map(|(_, term)| term.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        match &self.field {
            Some(field) => format!("{field}:\"{text}\""),
            None => format!("\"{text}\""),
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
