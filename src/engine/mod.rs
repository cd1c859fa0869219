//! The secondary-index engine the host database talks to.

pub mod builder;
pub mod capability;
pub mod commit;
pub mod config;
pub mod context;
pub mod contract;
pub mod definition;
#[allow(clippy::module_inception)]
pub mod engine;
pub mod tx;

pub use builder::{
    DefaultDocumentBuilder, DocumentBuilder, IndexKey, QueryBuilder, Record, RecordId,
    SimpleQueryBuilder,
};
pub use capability::{IndexCapabilities, IndexMode};
pub use commit::{CommitScheduler, CommitStats, CommitTarget};
pub use config::EngineConfig;
pub use context::EngineContext;
pub use contract::{IndexCursor, IndexEngine, IndexKeyCursor, ValuesTransformer};
pub use definition::{IndexCreateParams, IndexDefinition, IndexDescriptor, KeyType, Metadata};
pub use engine::{ENGINE_VERSION, EnginePhase, SearchHit, SearchIndexEngine};
pub use tx::TxChanges;
