pub mod hltv;
pub mod prizepicks;
pub mod provider;
pub mod underdog;

pub use hltv::HltvMatches;
pub use prizepicks::PrizePicksFeed;
pub use provider::{MatchProvider, PropProvider};
pub use underdog::UnderdogFeed;

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::db::models::{MatchRecord, PropRecord, SourceStatus};

/// Failures a feed can produce. Orchestration downgrades all of these to an
/// empty result plus a `SourceStatus` row so one dead source never blocks a
/// refresh pass.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed '{0}' timed out after {1:?}")]
    Timeout(String, Duration),
    #[error("feed '{0}' failed: {1}")]
    Upstream(String, anyhow::Error),
}

/// Fetches props from all providers concurrently. A provider that errors or
/// times out contributes nothing; its failure is recorded in the returned
/// status list rather than propagated.
pub async fn fetch_all_props(
    providers: &[Arc<dyn PropProvider>],
    timeout: Duration,
) -> (Vec<PropRecord>, Vec<SourceStatus>) {
    let fetch_futures: Vec<_> = providers
        .iter()
        .map(|p| {
            let p = Arc::clone(p);
            async move {
                let name = p.name().to_string();
                let res = tokio::time::timeout(timeout, p.fetch_props()).await;
                let out = match res {
                    Ok(Ok(props)) => Ok(props),
                    Ok(Err(e)) => Err(FeedError::Upstream(name.clone(), e)),
                    Err(_) => Err(FeedError::Timeout(name.clone(), timeout)),
                };
                (name, out)
            }
        })
        .collect();

    let results = futures_util::future::join_all(fetch_futures).await;

    let mut props = Vec::new();
    let mut statuses = Vec::new();
    for (name, result) in results {
        match result {
            Ok(records) => {
                info!("Feed '{}' returned {} props", name, records.len());
                statuses.push(SourceStatus {
                    source: name,
                    success: true,
                    count: records.len(),
                    note: None,
                    fetched_at: Utc::now(),
                });
                props.extend(records);
            }
            Err(e) => {
                warn!("{}", e);
                statuses.push(SourceStatus {
                    source: name,
                    success: false,
                    count: 0,
                    note: Some(e.to_string()),
                    fetched_at: Utc::now(),
                });
            }
        }
    }

    (props, statuses)
}

/// Fetches upcoming matches, tolerating failure the same way props do.
pub async fn fetch_matches(
    provider: &Arc<dyn MatchProvider>,
    timeout: Duration,
) -> (Vec<MatchRecord>, SourceStatus) {
    let name = provider.name().to_string();
    let res = tokio::time::timeout(timeout, provider.fetch_upcoming_matches()).await;
    match res {
        Ok(Ok(matches)) => {
            info!("Match feed '{}' returned {} matches", name, matches.len());
            let status = SourceStatus {
                source: name,
                success: true,
                count: matches.len(),
                note: None,
                fetched_at: Utc::now(),
            };
            (matches, status)
        }
        Ok(Err(e)) => {
            let err = FeedError::Upstream(name.clone(), e);
            warn!("{}", err);
            (
                Vec::new(),
                SourceStatus {
                    source: name,
                    success: false,
                    count: 0,
                    note: Some(err.to_string()),
                    fetched_at: Utc::now(),
                },
            )
        }
        Err(_) => {
            let err = FeedError::Timeout(name.clone(), timeout);
            warn!("{}", err);
            (
                Vec::new(),
                SourceStatus {
                    source: name,
                    success: false,
                    count: 0,
                    note: Some(err.to_string()),
                    fetched_at: Utc::now(),
                },
            )
        }
    }
}
