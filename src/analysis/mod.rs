//! Text analysis for Lucerna.
//!
//! Tokenizers split text into [`Token`]s, filters transform or drop them, and
//! analyzers wire the two together. Each index owns an index-time and a
//! query-time analyzer built by [`AnalyzerFactory`].

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::{
    Analyzer, AnalyzerFactory, AnalyzerKind, KeywordAnalyzer, PerFieldAnalyzer,
    PipelineAnalyzer, SimpleAnalyzer, StandardAnalyzer, analyze_field,
};
pub use token::{Token, TokenStream};
pub use token_filter::Filter;
pub use token_filter::lowercase::LowercaseFilter;
pub use token_filter::stop::StopFilter;
pub use tokenizer::Tokenizer;
pub use tokenizer::regex::RegexTokenizer;
pub use tokenizer::whole::WholeTokenizer;
