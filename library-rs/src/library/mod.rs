//! Community library metadata pipeline
//!
//! Syncs the remote tool catalog into strongly-typed records and serves
//! queries over them: declarative filters, fuzzy/keyword search, category
//! and quality listings.

pub mod filters;
pub mod manager;
pub mod search_engine;
pub mod tool_info;

pub use filters::{FilterStatistics, ToolFilter};
pub use manager::{CatalogSource, HttpCatalogSource, LibraryConfig, LibraryManager, SyncStatus};
pub use search_engine::ToolSearchEngine;
pub use tool_info::ToolInfo;
