//! Analyzer implementations that combine tokenizers and filters.

#[allow(clippy::module_inception)]
pub mod analyzer;
pub mod factory;
pub mod keyword;
pub mod per_field;
pub mod pipeline;
pub mod simple;
pub mod standard;

pub use analyzer::Analyzer;
pub use factory::{AnalyzerFactory, AnalyzerKind};
pub use keyword::KeywordAnalyzer;
pub use per_field::{PerFieldAnalyzer, analyze_field};
pub use pipeline::PipelineAnalyzer;
pub use simple::SimpleAnalyzer;
pub use standard::StandardAnalyzer;
