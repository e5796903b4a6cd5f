pub mod aggregator;
pub mod projection;
pub mod stat_norm;
pub mod teams;
pub mod tracker;

pub use aggregator::{PlayerProps, PropAggregator};
pub use projection::ProjectionModel;
pub use tracker::LineMovementTracker;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::models::{Match, Projection, SourceStatus};
use crate::db::Database;
use crate::feeds::{self, MatchProvider, PropProvider};

/// Result counts from one refresh pass, for logging and the refresh endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RefreshSummary {
    pub matches: usize,
    pub projections: usize,
    pub props: usize,
}

#[derive(Default)]
struct Snapshot {
    matches: Vec<Match>,
    projections: HashMap<String, Vec<Projection>>,
    feed_status: Vec<SourceStatus>,
    last_refresh: Option<DateTime<Utc>>,
}

/// Owns the refresh pipeline: fetch feeds, aggregate props, project lines,
/// and publish the result as the current snapshot. Refreshes are serialized;
/// reads go through an `RwLock` so the dashboard never sees a half-built
/// snapshot.
pub struct Engine {
    db: Database,
    prop_providers: Vec<Arc<dyn PropProvider>>,
    match_provider: Arc<dyn MatchProvider>,
    model: Mutex<ProjectionModel>,
    tracker: LineMovementTracker,
    feed_timeout: Duration,
    snapshot: RwLock<Snapshot>,
    refresh_gate: Mutex<()>,
}

impl Engine {
    pub fn new(
        db: Database,
        prop_providers: Vec<Arc<dyn PropProvider>>,
        match_provider: Arc<dyn MatchProvider>,
        model: ProjectionModel,
        feed_timeout: Duration,
    ) -> Self {
        Engine {
            db,
            prop_providers,
            match_provider,
            model: Mutex::new(model),
            tracker: LineMovementTracker::new(),
            feed_timeout,
            snapshot: RwLock::new(Snapshot::default()),
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn tracker(&self) -> &LineMovementTracker {
        &self.tracker
    }

    /// Runs one full refresh pass. Concurrent callers queue up behind the
    /// gate; each gets its own complete pass.
    pub async fn refresh(&self) -> Result<RefreshSummary> {
        let _gate = self.refresh_gate.lock().await;
        let started = std::time::Instant::now();

        let ((match_records, match_status), (props, mut feed_status)) = tokio::join!(
            feeds::fetch_matches(&self.match_provider, self.feed_timeout),
            feeds::fetch_all_props(&self.prop_providers, self.feed_timeout),
        );
        feed_status.push(match_status);

        self.tracker.record_lines(&props).await;

        let matches: Vec<Match> = match_records
            .into_iter()
            .map(|r| Match {
                id: Uuid::new_v4().to_string(),
                team1: r.team1,
                team2: r.team2,
                tournament: r.tournament,
                start_time: r.start_time,
                map1: "TBD".to_string(),
                map2: "TBD".to_string(),
                status: r.status,
            })
            .collect();

        let mut aggregator = PropAggregator::new(&props);
        if matches.is_empty() || aggregator.player_count() == 0 {
            warn!(
                "Refresh produced no work (matches={}, players={})",
                matches.len(),
                aggregator.player_count()
            );
        }

        let mut projections: HashMap<String, Vec<Projection>> = HashMap::new();
        let mut total_projections = 0usize;
        {
            let mut model = self.model.lock().await;
            for m in &matches {
                let player_props = aggregator.props_for_match(m);
                let projs = model
                    .generate_match_projections(&m.id, &m.team1, &m.team2, &player_props)
                    .await;
                total_projections += projs.len();
                projections.insert(m.id.clone(), projs);
            }
        }

        let summary = RefreshSummary {
            matches: matches.len(),
            projections: total_projections,
            props: props.len(),
        };

        let flat: Vec<Projection> = projections.values().flatten().cloned().collect();
        let persist = self.db.replace_snapshot(&matches, &flat);

        {
            let mut snap = self.snapshot.write().await;
            snap.matches = matches;
            snap.projections = projections;
            snap.feed_status = feed_status;
            snap.last_refresh = Some(Utc::now());
        }

        info!(
            "Refresh complete in {:?}: {} matches, {} projections from {} props",
            started.elapsed(),
            summary.matches,
            summary.projections,
            summary.props
        );

        // The in-memory snapshot is published either way; a write failure
        // only costs durability across restarts.
        if let Err(e) = persist {
            error!("Failed to persist snapshot: {:#}", e);
            return Err(e).context("snapshot persistence failed");
        }

        Ok(summary)
    }

    pub async fn matches(&self) -> Vec<Match> {
        self.snapshot.read().await.matches.clone()
    }

    pub async fn match_detail(&self, match_id: &str) -> Option<(Match, Vec<Projection>)> {
        let snap = self.snapshot.read().await;
        let m = snap.matches.iter().find(|m| m.id == match_id)?.clone();
        let projs = snap.projections.get(match_id).cloned().unwrap_or_default();
        Some((m, projs))
    }

    pub async fn feed_status(&self) -> Vec<SourceStatus> {
        self.snapshot.read().await.feed_status.clone()
    }

    pub async fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.snapshot.read().await.last_refresh
    }

    pub async fn model_info(&self) -> serde_json::Value {
        self.model.lock().await.model_info()
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}
