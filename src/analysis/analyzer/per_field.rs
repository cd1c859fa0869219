//! Per-field analyzer.

use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::analyzer::analyzer::Analyzer;
use crate::analysis::token::TokenStream;
use crate::error::Result;

/// An analyzer that applies different analyzers to different fields.
///
/// Fields with no registered analyzer use the default one. When the same
/// analyzer serves several fields, register clones of one `Arc` rather than
/// separate instances.
///
/// # Example
///
/// ```
/// use lucerna::analysis::analyzer::{Analyzer, KeywordAnalyzer, PerFieldAnalyzer, StandardAnalyzer};
/// use std::sync::Arc;
///
/// let keyword: Arc<dyn Analyzer> = Arc::new(KeywordAnalyzer::new());
/// let mut analyzer = PerFieldAnalyzer::new(Arc::new(StandardAnalyzer::new().unwrap()));
/// analyzer.add_analyzer("RID", Arc::clone(&keyword));
/// analyzer.add_analyzer("City.code", Arc::clone(&keyword));
///
/// let tokens: Vec<_> = analyzer.analyze_field("RID", "#1:0").unwrap().collect();
/// assert_eq!(tokens[0].text, "#1:0");
/// ```
#[derive(Clone)]
pub struct PerFieldAnalyzer {
    /// Default analyzer for fields not in the map.
    default_analyzer: Arc<dyn Analyzer>,

    /// Map of field names to their specific analyzers.
    field_analyzers: AHashMap<String, Arc<dyn Analyzer>>,
}

impl PerFieldAnalyzer {
    /// Create a new per-field analyzer with a default analyzer.
    pub fn new(default_analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            default_analyzer,
            field_analyzers: AHashMap::new(),
        }
    }

    /// Add a field-specific analyzer.
    pub fn add_analyzer(&mut self, field: impl Into<String>, analyzer: Arc<dyn Analyzer>) {
        self.field_analyzers.insert(field.into(), analyzer);
    }

    /// Get the analyzer for a specific field.
    pub fn get_analyzer(&self, field: &str) -> &Arc<dyn Analyzer> {
        self.field_analyzers
            .get(field)
            .unwrap_or(&self.default_analyzer)
    }

    /// Whether the field has its own analyzer.
    pub fn has_field_analyzer(&self, field: &str) -> bool {
        self.field_analyzers.contains_key(field)
    }

    /// Get the default analyzer.
    pub fn default_analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.default_analyzer
    }

    /// Field names with a registered analyzer, sorted.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.field_analyzers.keys().map(String::as_str).collect();
        fields.sort_unstable();
        fields
    }

    /// Analyze text with the analyzer for the given field.
    pub fn analyze_field(&self, field: &str, text: &str) -> Result<TokenStream> {
        self.get_analyzer(field).analyze(text)
    }
}

impl Analyzer for PerFieldAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.default_analyzer.analyze(text)
    }

    fn name(&self) -> &'static str {
        "per_field"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl std::fmt::Debug for PerFieldAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields: Vec<(&str, &'static str)> = self
            .field_analyzers
            .iter()
            .map(|(k, v)| (k.as_str(), v.name()))
            .collect();
        fields.sort_unstable();
        f.debug_struct("PerFieldAnalyzer")
            .field("default", &self.default_analyzer.name())
            .field("fields", &fields)
            .finish()
    }
}

/// Analyze `text` for `field`, honouring per-field configuration when the
/// analyzer is a [`PerFieldAnalyzer`].
pub fn analyze_field(analyzer: &dyn Analyzer, field: &str, text: &str) -> Result<TokenStream> {
    match analyzer.as_any().downcast_ref::<PerFieldAnalyzer>() {
        Some(per_field) => per_field.analyze_field(field, text),
        None => analyzer.analyze(text),
    }
}
