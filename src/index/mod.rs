//! Inverted index: segments, the writer, NRT readers and searcher management.

pub mod reader;
pub mod reopen;
pub mod searcher;
pub mod searcher_manager;
pub mod segment;
pub mod term;
pub mod tracking;
pub mod writer;

/// Strictly increasing stamp returned for every write.
pub type Generation = u64;

pub use reader::{DocAddress, IndexReader};
pub use reopen::ReopenThread;
pub use searcher::IndexSearcher;
pub use searcher_manager::{SearcherLease, SearcherManager};
pub use segment::{DocId, SegmentReader};
pub use term::Term;
pub use tracking::TrackingIndexWriter;
pub use writer::{IndexWriter, IndexWriterConfig, WriterStats};
