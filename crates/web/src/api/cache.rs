//! Cache types for slow-changing API responses.

use vibehive_core::models::{ForumStats, TagRecord};

/// Cache key for tags and stats.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Tags,
    ForumStats,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Tags(Vec<TagRecord>),
    ForumStats(ForumStats),
}
