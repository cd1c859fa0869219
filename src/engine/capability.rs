//! What an index engine can answer.
//!
//! The host planner reads the capabilities once and only plans the query
//! shapes the engine supports.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexMode {
    /// Ordered keys: range scans and cursors work.
    RangeCapable,
    /// Relevance-ranked full text: only point lookups and searches.
    SearchOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexCapabilities {
    mode: IndexMode,
    null_values: bool,
}

impl IndexCapabilities {
    pub const fn search_only() -> Self {
        IndexCapabilities {
            mode: IndexMode::SearchOnly,
            null_values: false,
        }
    }

    pub const fn range_capable() -> Self {
        IndexCapabilities {
            mode: IndexMode::RangeCapable,
            null_values: true,
        }
    }

    pub const fn with_null_values(mut self, null_values: bool) -> Self {
        self.null_values = null_values;
        self
    }

    pub fn mode(&self) -> IndexMode {
        self.mode
    }

    pub fn supports_range_queries(&self) -> bool {
        self.mode == IndexMode::RangeCapable
    }

    pub fn supports_ordered_iteration(&self) -> bool {
        self.mode == IndexMode::RangeCapable
    }

    pub fn supports_null_values(&self) -> bool {
        self.null_values
    }
}
