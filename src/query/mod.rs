//! Queries, the query parser and hit collection.

pub mod boolean;
pub mod collector;
pub mod match_all;
pub mod parser;
pub mod phrase;
#[allow(clippy::module_inception)]
pub mod query;
pub mod term;

pub use boolean::{BooleanClause, BooleanQuery, BooleanQueryBuilder, Occur};
pub use collector::{ScoreDoc, TopDocs, TopDocsCollector};
pub use match_all::MatchAllQuery;
pub use parser::QueryParser;
pub use phrase::PhraseQuery;
pub use query::{Query, ScoredDocs};
pub use term::TermQuery;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::analysis::analyzer::StandardAnalyzer;
    use crate::document::{Document, RID};
    use crate::index::segment::SegmentReader;
    use crate::index::writer::{IndexWriter, IndexWriterConfig};
    use crate::storage::MemoryStorage;

    /// A single segment holding one document per `(rid, text)` pair, in order.
    pub fn segment_with(docs: &[(&str, &str)]) -> SegmentReader {
        let mut writer = IndexWriter::open(
            Arc::new(MemoryStorage::new()),
            Arc::new(StandardAnalyzer::new().unwrap()),
            IndexWriterConfig::default(),
        )
        .unwrap();

        for (rid, text) in docs {
            let doc = Document::builder()
                .add_text(RID, *rid)
                .add_text("text", *text)
                .build();
            writer.add_document(doc).unwrap();
        }

        writer.get_reader().unwrap().segments()[0].clone()
    }
}
