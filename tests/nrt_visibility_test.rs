//! Near-real-time visibility of writes.

use std::sync::Arc;
use std::time::Duration;

use lucerna::directory::StorageLocation;
use lucerna::document::{Document, RID};
use lucerna::engine::*;
use lucerna::error::{LucernaError, Result};
use lucerna::query::TermQuery;

fn engine(context: &EngineContext, max_stale_secs: f64) -> Result<Arc<SearchIndexEngine>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = EngineConfig {
        target_max_stale_secs: max_stale_secs,
        target_min_stale_secs: 0.01,
        ..EngineConfig::default()
    };
    Ok(Arc::new(SearchIndexEngine::new(
        "Event.text",
        StorageLocation::Memory,
        IndexDefinition::new("Event").with_field("text", KeyType::String),
        Metadata::new(),
        config,
        context,
    )?))
}

fn event(rid: &str, text: &str) -> Document {
    Document::builder().add_text(RID, rid).add_text("text", text).build()
}

#[test]
fn test_wait_for_generation_gives_read_your_writes() -> Result<()> {
    let context = EngineContext::new()?;
    let engine = engine(&context, 60.0)?;
    engine.start()?;

    let query = TermQuery::new("text", "launch");
    for i in 0..20 {
        let generation = engine.add_document(event(&format!("#3:{i}"), "launch"))?;
        engine.wait_for_generation(generation)?;

        let searcher = engine.acquire_searcher()?;
        assert!(searcher.generation() >= generation);
        assert_eq!(searcher.count(&query)?, i + 1);
    }

    engine.close();
    Ok(())
}

#[test]
fn test_eventual_visibility_without_waiting() -> Result<()> {
    let context = EngineContext::new()?;
    let engine = engine(&context, 0.05)?;
    engine.start()?;

    let generation = engine.add_document(event("#3:0", "quiet"))?;
    assert!(engine.wait_for_generation_timeout(generation, Duration::from_secs(5))?);
    assert_eq!(engine.acquire_searcher()?.num_docs(), 1);

    engine.close();
    Ok(())
}

#[test]
fn test_leases_outlive_refresh() -> Result<()> {
    let context = EngineContext::new()?;
    let engine = engine(&context, 60.0)?;
    engine.start()?;

    engine.add_document(event("#3:0", "first"))?;
    let old = engine.searcher()?;
    engine.add_document(event("#3:1", "second"))?;
    let new = engine.searcher()?;

    assert_eq!(old.num_docs(), 1);
    assert_eq!(new.num_docs(), 2);
    drop(old);
    new.release();

    engine.close();
    Ok(())
}

#[test]
fn test_waiting_on_unknown_generation_fails() -> Result<()> {
    let context = EngineContext::new()?;
    let engine = engine(&context, 60.0)?;
    engine.start()?;

    let generation = engine.add_document(event("#3:0", "x"))?;
    assert!(engine.wait_for_generation(generation + 10).is_err());

    engine.close();
    assert!(matches!(
        engine.wait_for_generation(generation),
        Err(LucernaError::Closed(_))
    ));
    Ok(())
}
