//! Core analyzer trait definition.
//!
//! Analyzers combine a tokenizer and filters into the complete text processing
//! pipeline:
//!
//! ```text
//! Raw Text → Analyzer → Token Stream → Index
//!             ↓
//!         Tokenizer
//!             ↓
//!         Filter 1..N
//! ```
//!
//! The same analyzer family is used on both sides of the index: the index-time
//! analyzer turns document fields into terms, and the query-time analyzer turns
//! keys and query strings into the terms that are looked up.
//!
//! # Examples
//!
//! ```
//! use lucerna::analysis::analyzer::analyzer::Analyzer;
//! use lucerna::analysis::analyzer::standard::StandardAnalyzer;
//!
//! let analyzer = StandardAnalyzer::new().unwrap();
//! let tokens: Vec<_> = analyzer.analyze("Hello World").unwrap().collect();
//!
//! assert_eq!(tokens[0].text, "hello");
//! assert_eq!(tokens[1].text, "world");
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for analyzers that convert text into processed tokens.
///
/// The trait requires `Send + Sync` so analyzers can be shared between the
/// writer and every thread that parses queries.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer (for logs and configuration).
    fn name(&self) -> &'static str;

    /// Provide access to the concrete type for downcasting.
    ///
    /// Used to reach [`PerFieldAnalyzer`](super::per_field::PerFieldAnalyzer)
    /// when a field-specific analyzer is needed.
    fn as_any(&self) -> &dyn std::any::Any;
}
