//! # Sunshine-AIO Community Library Core
//!
//! Metadata cache and validation subsystem for the Sunshine-AIO community
//! library: the parts of the installer that decide which community tools
//! exist, whether they can be trusted, and what is already on disk.
//!
//! ## Components
//!
//! - **cache** - TTL cache with LRU eviction, JSON index persistence and a
//!   checksum-verified file-blob store
//! - **validator** - multi-level schema/platform/security/file/dependency
//!   validation producing [`ValidationResult`] verdicts
//! - **library** - catalog sync pipeline ([`LibraryManager`]), declarative
//!   filters ([`ToolFilter`]) and fuzzy search ([`ToolSearchEngine`]) over
//!   [`ToolInfo`] records
//!
//! ## Data flow
//!
//! ```text
//! remote catalog ──► LibraryManager ──► ToolInfo table
//!                                          │
//!                        ToolFilter / ToolSearchEngine
//!                                          │
//!                                  menu / GUI layer
//! ```
//!
//! Independently, [`CacheManager`] services key/value and key/file caching
//! for any component. Construct instances at the application root and pass
//! them down; there are no process-wide singletons. All I/O is synchronous
//! and blocking; callers needing responsiveness off-load onto worker
//! threads.

pub mod cache;
pub mod config;
pub mod errors;
pub mod library;
pub mod validator;

pub use cache::{CacheConfig, CacheEntry, CacheManager, CacheStats, CleanupReport};
pub use config::LibrarySettings;
pub use errors::{AioError, Result};
pub use library::{
    CatalogSource, FilterStatistics, HttpCatalogSource, LibraryConfig, LibraryManager, SyncStatus,
    ToolFilter, ToolInfo, ToolSearchEngine,
};
pub use validator::{ToolValidator, ValidationLevel, ValidationResult, ValidatorConfig};

/// Library core version
pub const VERSION: &str = "1.1.0";
