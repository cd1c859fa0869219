//! Query execution over an [`IndexReader`].

use crate::document::Document;
use crate::error::Result;
use crate::index::Generation;
use crate::index::reader::{DocAddress, IndexReader};
use crate::query::Query;
use crate::query::collector::{TopDocs, TopDocsCollector};

/// Runs queries against a reader snapshot.
///
/// A searcher remembers the writer generation its reader was opened at: every
/// write with a generation at or below it is visible.
#[derive(Debug, Clone)]
pub struct IndexSearcher {
    reader: IndexReader,
    generation: Generation,
}

impl IndexSearcher {
    pub fn new(reader: IndexReader, generation: Generation) -> Self {
        IndexSearcher { reader, generation }
    }

    pub fn reader(&self) -> &IndexReader {
        &self.reader
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn num_docs(&self) -> usize {
        self.reader.num_docs()
    }

    /// Best `limit` hits, highest score first.
    pub fn search(&self, query: &dyn Query, limit: usize) -> Result<TopDocs> {
        let mut collector = TopDocsCollector::new(limit);
        for (ord, segment) in self.reader.segments().iter().enumerate() {
            for (doc, score) in query.score_segment(segment)? {
                collector.collect(DocAddress { segment: ord, doc }, score);
            }
        }
        Ok(collector.into_top_docs())
    }

    /// Number of live documents matching `query`.
    pub fn count(&self, query: &dyn Query) -> Result<usize> {
        let mut total = 0;
        for segment in self.reader.segments() {
            total += query.score_segment(segment)?.len();
        }
        Ok(total)
    }

    pub fn doc(&self, address: DocAddress) -> Option<&Document> {
        self.reader.document(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::analysis::analyzer::StandardAnalyzer;
    use crate::document::RID;
    use crate::index::term::Term;
    use crate::index::writer::{IndexWriter, IndexWriterConfig};
    use crate::query::{MatchAllQuery, TermQuery};
    use crate::storage::MemoryStorage;

    fn searcher(docs: &[(&str, &str)]) -> IndexSearcher {
        let mut writer = IndexWriter::open(
            Arc::new(MemoryStorage::new()),
            Arc::new(StandardAnalyzer::new().unwrap()),
            IndexWriterConfig::default(),
        )
        .unwrap();
        for (rid, text) in docs {
            let doc = Document::builder().add_text(RID, *rid).add_text("text", *text).build();
            writer.update_document(&Term::new(RID, *rid), doc).unwrap();
        }
        IndexSearcher::new(writer.get_reader().unwrap(), docs.len() as Generation)
    }

    #[test]
    fn test_search_ranks_by_frequency() {
        let searcher = searcher(&[
            ("#1:0", "rome"),
            ("#1:1", "rome rome rome"),
            ("#1:2", "paris"),
        ]);

        let top = searcher.search(&TermQuery::new("text", "rome"), 10).unwrap();
        assert_eq!(top.total_hits, 2);
        assert_eq!(top.score_docs.len(), 2);

        let best = searcher.doc(top.score_docs[0].address).unwrap();
        assert_eq!(best.rid(), Some("#1:1"));
    }

    #[test]
    fn test_limit_and_count() {
        let searcher = searcher(&[("#1:0", "a b"), ("#1:1", "c d"), ("#1:2", "e f")]);

        let top = searcher.search(&MatchAllQuery::new(), 2).unwrap();
        assert_eq!(top.total_hits, 3);
        assert_eq!(top.score_docs.len(), 2);
        assert_eq!(searcher.count(&MatchAllQuery::new()).unwrap(), 3);
        assert_eq!(searcher.num_docs(), 3);
        assert_eq!(searcher.generation(), 3);
    }
}
