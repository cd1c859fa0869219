//! Boolean combinations of queries.

use std::any::Any;

use crate::error::Result;
use crate::index::segment::SegmentReader;
use crate::query::query::{Query, ScoredDocs};

/// How a clause takes part in a boolean query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// The clause must match.
    Must,
    /// The clause may match; without required clauses at least one must.
    Should,
    /// The clause must not match.
    MustNot,
}

impl Occur {
    fn prefix(&self) -> &'static str {
        match self {
            Occur::Must => "+",
            Occur::Should => "",
            Occur::MustNot => "-",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BooleanClause {
    pub query: Box<dyn Query>,
    pub occur: Occur,
}

/// A query made of required, optional and prohibited clauses.
///
/// A query with only prohibited clauses matches nothing, as does an empty one.
#[derive(Debug, Clone, Default)]
pub struct BooleanQuery {
    clauses: Vec<BooleanClause>,
}

impl BooleanQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clause(&mut self, query: Box<dyn Query>, occur: Occur) {
        self.clauses.push(BooleanClause { query, occur });
    }

    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl Query for BooleanQuery {
    fn score_segment(&self, segment: &SegmentReader) -> Result<ScoredDocs> {
        let mut required: Option<ScoredDocs> = None;
        let mut optional: Vec<ScoredDocs> = Vec::new();
        let mut prohibited = ScoredDocs::default();

        for clause in &self.clauses {
            let scores = clause.query.score_segment(segment)?;
            match clause.occur {
                Occur::Must => {
                    required = Some(match required {
                        None => scores,
                        Some(acc) => acc
                            .into_iter()
                            .filter_map(|(doc, score)| scores.get(&doc).map(|s| (doc, score + s)))
                            .collect(),
                    });
                }
                Occur::Should => optional.push(scores),
                Occur::MustNot => prohibited.extend(scores),
            }
        }

        let mut result = match required {
            Some(mut acc) => {
                for scores in &optional {
                    for (doc, score) in acc.iter_mut() {
                        if let Some(extra) = scores.get(doc) {
                            *score += extra;
                        }
                    }
                }
                acc
            }
            None => {
                let mut acc = ScoredDocs::default();
                for scores in optional {
                    for (doc, score) in scores {
                        *acc.entry(doc).or_insert(0.0) += score;
                    }
                }
                acc
            }
        };

        result.retain(|doc, _| !prohibited.contains_key(doc));
        Ok(result)
    }

    fn description(&self) -> String {
        let inner = self
            .clauses
            .iter()
            .map(|clause| format!("{}{}", clause.occur.prefix(), clause.query.description()))
            .collect::<Vec<_>>()
            .join(" ");
        format!("({inner})")
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Fluent construction of [`BooleanQuery`].
#[derive(Debug, Default)]
pub struct BooleanQueryBuilder {
    query: BooleanQuery,
}

impl BooleanQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn must(mut self, query: Box<dyn Query>) -> Self {
        self.query.add_clause(query, Occur::Must);
        self
    }

    pub fn should(mut self, query: Box<dyn Query>) -> Self {
        self.query.add_clause(query, Occur::Should);
        self
    }

    pub fn must_not(mut self, query: Box<dyn Query>) -> Self {
        self.query.add_clause(query, Occur::MustNot);
        self
    }

    pub fn build(self) -> BooleanQuery {
        self.query
    }
}
