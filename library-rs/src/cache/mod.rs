//! Cache module for community library metadata and downloaded files
//!
//! Manages the local cache directory (metadata/, files/, temp/).
//! Entries carry a TTL; file blobs are checksum-verified on read and write.

pub mod entry;
pub mod manager;

pub use entry::CacheEntry;
pub use manager::{CacheConfig, CacheManager, CacheStats, CleanupReport};
