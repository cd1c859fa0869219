//! Builds index-time and query-time analyzers from an index definition.
//!
//! The factory reads analyzer names from the index metadata:
//!
//! | key                      | applies to                          |
//! |--------------------------|-------------------------------------|
//! | `analyzer`               | every field, both kinds             |
//! | `index_analyzer`         | every field, index time             |
//! | `query_analyzer`         | every field, query time             |
//! | `<field>_index_analyzer` | one field, index time               |
//! | `<field>_query_analyzer` | one field, query time               |
//!
//! Names are matched loosely: `keyword`, `KeywordAnalyzer` and
//! `org.apache.lucene.analysis.core.KeywordAnalyzer` all resolve to
//! [`KeywordAnalyzer`]. The record id field always uses the keyword analyzer.
//!
//! When `prefix_with_class_name` is true, every per-field analyzer is also
//! registered under `Class.field`.

use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::analysis::analyzer::analyzer::Analyzer;
use crate::analysis::analyzer::keyword::KeywordAnalyzer;
use crate::analysis::analyzer::per_field::PerFieldAnalyzer;
use crate::analysis::analyzer::simple::SimpleAnalyzer;
use crate::analysis::analyzer::standard::StandardAnalyzer;
use crate::analysis::tokenizer::regex::RegexTokenizer;
use crate::document::RID;
use crate::engine::definition::{IndexDefinition, Metadata};
use crate::error::{LucernaError, Result};

/// Metadata flag that registers per-field analyzers under `Class.field` too.
pub const PREFIX_WITH_CLASS_NAME: &str = "prefix_with_class_name";

/// Which side of the index an analyzer is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerKind {
    Index,
    Query,
}

impl AnalyzerKind {
    fn key(&self) -> &'static str {
        match self {
            AnalyzerKind::Index => "index_analyzer",
            AnalyzerKind::Query => "query_analyzer",
        }
    }
}

/// Creates per-field analyzers for an index.
#[derive(Debug, Default, Clone)]
pub struct AnalyzerFactory;

impl AnalyzerFactory {
    pub fn new() -> Self {
        AnalyzerFactory
    }

    /// Build the analyzer of the given kind for `definition`.
    pub fn create_analyzer(
        &self,
        definition: &IndexDefinition,
        kind: AnalyzerKind,
        metadata: &Metadata,
    ) -> Result<Arc<dyn Analyzer>> {
        let default = match lookup(metadata, kind.key())?.or(lookup(metadata, "analyzer")?) {
            Some(name) => analyzer_by_name(name)?,
            None => Arc::new(StandardAnalyzer::new()?) as Arc<dyn Analyzer>,
        };

        let mut analyzer = PerFieldAnalyzer::new(default);
        analyzer.add_analyzer(RID, Arc::new(KeywordAnalyzer::new()));

        let prefix = match metadata.get(PREFIX_WITH_CLASS_NAME) {
            Some(Value::Bool(flag)) => *flag,
            Some(other) => {
                return Err(LucernaError::invalid_config(format!(
                    "{PREFIX_WITH_CLASS_NAME} must be a boolean, got {other}"
                )));
            }
            None => false,
        };

        for field in definition.fields() {
            let key = format!("{field}_{}", kind.key());
            if let Some(name) = lookup(metadata, &key)? {
                let field_analyzer = analyzer_by_name(name)?;
                if prefix && let Some(class_name) = definition.class_name() {
                    analyzer.add_analyzer(
                        format!("{class_name}.{field}"),
                        Arc::clone(&field_analyzer),
                    );
                }
                analyzer.add_analyzer(field.clone(), field_analyzer);
            }
        }

        debug!("created {kind:?} analyzer {analyzer:?}");
        Ok(Arc::new(analyzer))
    }
}

fn lookup<'a>(metadata: &'a Metadata, key: &str) -> Result<Option<&'a str>> {
    match metadata.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(name)) => Ok(Some(name.as_str())),
        Some(other) => Err(LucernaError::invalid_config(format!(
            "analyzer setting '{key}' must be a string, got {other}"
        ))),
    }
}

/// Resolve an analyzer by name.
pub fn analyzer_by_name(name: &str) -> Result<Arc<dyn Analyzer>> {
    let short = name.rsplit('.').next().unwrap_or(name).to_lowercase();
    let short = short.trim_end_matches("analyzer").trim_end_matches('_');

    let analyzer: Arc<dyn Analyzer> = match short {
        "standard" | "" => Arc::new(StandardAnalyzer::new()?),
        "standard_no_stop" | "english_no_stop" => Arc::new(StandardAnalyzer::without_stop_words()?),
        "keyword" => Arc::new(KeywordAnalyzer::new()),
        "simple" => Arc::new(SimpleAnalyzer::new(Arc::new(RegexTokenizer::new()?))),
        "whitespace" => Arc::new(SimpleAnalyzer::new(Arc::new(
            RegexTokenizer::with_pattern(r"\S+")?,
        ))),
        _ => {
            return Err(LucernaError::invalid_config(format!(
                "unknown analyzer '{name}'"
            )));
        }
    };
    Ok(analyzer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::per_field::analyze_field;
    use crate::engine::definition::KeyType;
    use serde_json::json;

    fn metadata(value: serde_json::Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    fn city() -> IndexDefinition {
        IndexDefinition::new("City")
            .with_field("name", KeyType::String)
            .with_field("code", KeyType::String)
    }

    #[test]
    fn test_default_is_standard_with_keyword_rid() {
        let analyzer = AnalyzerFactory::new()
            .create_analyzer(&city(), AnalyzerKind::Index, &Metadata::new())
            .unwrap();

        let tokens: Vec<_> = analyze_field(analyzer.as_ref(), "name", "The Eternal City")
            .unwrap()
            .collect();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "eternal");

        let tokens: Vec<_> = analyze_field(analyzer.as_ref(), RID, "#9:1").unwrap().collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "#9:1");
    }

    #[test]
    fn test_field_override_with_class_prefix() {
        let meta = metadata(json!({
            "code_index_analyzer": "org.apache.lucene.analysis.core.KeywordAnalyzer",
            "prefix_with_class_name": true,
        }));
        let analyzer = AnalyzerFactory::new()
            .create_analyzer(&city(), AnalyzerKind::Index, &meta)
            .unwrap();
        let per_field = analyzer.as_any().downcast_ref::<PerFieldAnalyzer>().unwrap();

        assert!(per_field.has_field_analyzer("code"));
        assert!(per_field.has_field_analyzer("City.code"));
        assert!(!per_field.has_field_analyzer("name"));
        assert_eq!(per_field.get_analyzer("City.code").name(), "keyword");
    }

    #[test]
    fn test_kind_specific_defaults() {
        let meta = metadata(json!({
            "index_analyzer": "standard",
            "query_analyzer": "KeywordAnalyzer",
        }));
        let factory = AnalyzerFactory::new();
        let index = factory
            .create_analyzer(&city(), AnalyzerKind::Index, &meta)
            .unwrap();
        let query = factory
            .create_analyzer(&city(), AnalyzerKind::Query, &meta)
            .unwrap();

        assert_eq!(analyze_field(index.as_ref(), "name", "a b").unwrap().count(), 2);
        assert_eq!(analyze_field(query.as_ref(), "name", "a b").unwrap().count(), 1);
    }

    #[test]
    fn test_unknown_analyzer_is_config_error() {
        let meta = metadata(json!({ "analyzer": "klingon" }));
        let result = AnalyzerFactory::new().create_analyzer(&city(), AnalyzerKind::Index, &meta);
        assert!(result.is_err());

        let meta = metadata(json!({ "analyzer": 42 }));
        let result = AnalyzerFactory::new().create_analyzer(&city(), AnalyzerKind::Index, &meta);
        assert!(result.is_err());
    }
}
