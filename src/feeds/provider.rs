use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::{MatchRecord, Platform, PropRecord};

/// A DFS platform feed. Implementations own transport, auth and parsing;
/// the engine only sees validated `PropRecord`s.
#[async_trait]
pub trait PropProvider: Send + Sync {
    /// Fetch the platform's current CS2 prop lines.
    async fn fetch_props(&self) -> Result<Vec<PropRecord>>;

    /// Which platform this feed represents.
    fn platform(&self) -> Platform;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// A match-schedule feed.
#[async_trait]
pub trait MatchProvider: Send + Sync {
    /// Fetch upcoming CS2 matches.
    async fn fetch_upcoming_matches(&self) -> Result<Vec<MatchRecord>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
