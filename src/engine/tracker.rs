//! Line movement tracking.
//!
//! Every batch of raw props is recorded into a bounded per-key time
//! series, independent of the per-refresh aggregation. Movement is always
//! computed from the two most recent observations; older history is kept
//! only for trend display, capped at 50 entries per key.
//!
//! Written by the refresh task and read by dashboard queries, so the
//! whole structure sits behind an async RwLock: appends, reads and prunes
//! are each atomic.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::db::models::{Platform, PropRecord};

/// Most recent entries retained per (player, stat, platform) key.
const HISTORY_CAP: usize = 50;
/// |movement| below this is reported as stable.
const DIRECTION_DEADBAND: f64 = 0.5;
/// Significance cutoffs by stat family.
const SIGNIFICANT_KILLS: f64 = 1.5;
const SIGNIFICANT_OTHER: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MovementKey {
    player_name: String,
    stat_type: String,
    platform: Platform,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub line: f64,
    pub platform: Platform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    Up,
    Down,
    Stable,
    /// Only one observation so far, no movement computable
    New,
}

/// Movement between the two most recent observations for one key.
#[derive(Debug, Clone, Serialize)]
pub struct LineMovement {
    pub player_name: String,
    pub stat_type: String,
    pub platform: Platform,
    pub current_line: f64,
    pub previous_line: Option<f64>,
    pub movement: f64,
    pub direction: MovementDirection,
    pub is_significant: bool,
    pub history_count: usize,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackerStats {
    pub tracked_players: usize,
    pub tracked_stat_lines: usize,
    pub total_history_entries: usize,
    pub movements_detected: usize,
    pub significant_movements: usize,
}

#[derive(Default)]
struct TrackerInner {
    history: HashMap<MovementKey, VecDeque<LineHistoryEntry>>,
    /// Flat latest-value index for O(1) lookups
    current: HashMap<MovementKey, LineHistoryEntry>,
}

/// Thread-safe line movement tracker.
#[derive(Clone, Default)]
pub struct LineMovementTracker {
    inner: Arc<RwLock<TrackerInner>>,
}

impl LineMovementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current batch of scraped props. Records missing a
    /// player name, stat type or positive line are skipped.
    pub async fn record_lines(&self, props: &[PropRecord]) {
        self.record_at(props, Utc::now()).await
    }

    async fn record_at(&self, props: &[PropRecord], timestamp: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        let mut recorded = 0usize;

        for prop in props {
            if prop.player_name.trim().is_empty()
                || prop.stat_type.trim().is_empty()
                || prop.line <= 0.0
            {
                continue;
            }

            let key = MovementKey {
                player_name: prop.player_name.clone(),
                stat_type: prop.stat_type.clone(),
                platform: prop.platform,
            };
            let entry = LineHistoryEntry {
                timestamp,
                line: prop.line,
                platform: prop.platform,
            };

            let history = inner.history.entry(key.clone()).or_default();
            history.push_back(entry.clone());
            while history.len() > HISTORY_CAP {
                history.pop_front();
            }

            inner.current.insert(key, entry);
            recorded += 1;
        }

        info!("Recorded {} lines for movement tracking", recorded);
    }

    /// Movement for one key, or `None` if it has never been recorded.
    pub async fn get_line_movement(
        &self,
        player_name: &str,
        stat_type: &str,
        platform: Platform,
    ) -> Option<LineMovement> {
        let inner = self.inner.read().await;
        let key = MovementKey {
            player_name: player_name.to_string(),
            stat_type: stat_type.to_string(),
            platform,
        };
        let history = inner.history.get(&key)?;
        movement_from_history(&key, history)
    }

    /// Movements for every tracked key.
    pub async fn get_all_movements(&self) -> Vec<LineMovement> {
        let inner = self.inner.read().await;
        inner
            .history
            .iter()
            .filter_map(|(key, history)| movement_from_history(key, history))
            .collect()
    }

    /// Significant movements only, largest |movement| first. Brand-new
    /// keys are excluded even if they would clear the threshold.
    pub async fn get_significant_movements(&self) -> Vec<LineMovement> {
        let mut significant: Vec<LineMovement> = self
            .get_all_movements()
            .await
            .into_iter()
            .filter(|m| m.is_significant && m.direction != MovementDirection::New)
            .collect();
        significant.sort_by(|a, b| {
            b.movement
                .abs()
                .partial_cmp(&a.movement.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        significant
    }

    /// Drop history entries older than `hours`, then any key left empty.
    pub async fn clear_old_history(&self, hours: i64) {
        let cutoff = Utc::now() - Duration::hours(hours);
        let mut inner = self.inner.write().await;

        inner
            .history
            .iter_mut()
            .for_each(|(_, history)| history.retain(|e| e.timestamp > cutoff));
        inner.history.retain(|_, history| !history.is_empty());
        let live: HashSet<MovementKey> = inner.history.keys().cloned().collect();
        inner.current.retain(|key, _| live.contains(key));

        debug!("Cleared line history older than {} hours", hours);
    }

    /// Counters for the dashboard.
    pub async fn get_tracker_stats(&self) -> TrackerStats {
        let movements = self.get_all_movements().await;
        let significant = movements.iter().filter(|m| m.is_significant).count();

        let inner = self.inner.read().await;
        let players: HashSet<&str> = inner
            .history
            .keys()
            .map(|k| k.player_name.as_str())
            .collect();
        TrackerStats {
            tracked_players: players.len(),
            tracked_stat_lines: inner.history.len(),
            total_history_entries: inner.history.values().map(|h| h.len()).sum(),
            movements_detected: movements.len(),
            significant_movements: significant,
        }
    }
}

fn movement_from_history(
    key: &MovementKey,
    history: &VecDeque<LineHistoryEntry>,
) -> Option<LineMovement> {
    let first = history.front()?;
    let current = history.back()?;

    if history.len() == 1 {
        return Some(LineMovement {
            player_name: key.player_name.clone(),
            stat_type: key.stat_type.clone(),
            platform: key.platform,
            current_line: current.line,
            previous_line: None,
            movement: 0.0,
            direction: MovementDirection::New,
            is_significant: false,
            history_count: 1,
            first_seen: first.timestamp,
            last_updated: current.timestamp,
        });
    }

    let previous = &history[history.len() - 2];
    let movement = round1(current.line - previous.line);

    let threshold = if key.stat_type.to_lowercase().contains("kill") {
        SIGNIFICANT_KILLS
    } else {
        SIGNIFICANT_OTHER
    };

    let direction = if movement > DIRECTION_DEADBAND {
        MovementDirection::Up
    } else if movement < -DIRECTION_DEADBAND {
        MovementDirection::Down
    } else {
        MovementDirection::Stable
    };

    Some(LineMovement {
        player_name: key.player_name.clone(),
        stat_type: key.stat_type.clone(),
        platform: key.platform,
        current_line: current.line,
        previous_line: Some(previous.line),
        movement,
        direction,
        is_significant: movement.abs() >= threshold,
        history_count: history.len(),
        first_seen: first.timestamp,
        last_updated: current.timestamp,
    })
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn prop(player: &str, stat: &str, line: f64) -> PropRecord {
        PropRecord {
            player_name: player.to_string(),
            stat_type: stat.to_string(),
            line,
            platform: Platform::Prizepicks,
            team: None,
            maps: None,
        }
    }

    #[tokio::test]
    async fn unseen_key_returns_none() {
        let tracker = LineMovementTracker::new();
        let m = tracker
            .get_line_movement("s1mple", "kills", Platform::Prizepicks)
            .await;
        assert!(m.is_none());
    }

    #[tokio::test]
    async fn single_entry_is_new_and_not_significant() {
        let tracker = LineMovementTracker::new();
        tracker.record_lines(&[prop("s1mple", "kills", 45.5)]).await;

        let m = tracker
            .get_line_movement("s1mple", "kills", Platform::Prizepicks)
            .await
            .unwrap();
        assert_eq!(m.direction, MovementDirection::New);
        assert_relative_eq!(m.movement, 0.0);
        assert!(!m.is_significant);
        assert_eq!(m.previous_line, None);
        assert_eq!(m.history_count, 1);
    }

    #[tokio::test]
    async fn significant_upward_movement_for_kills() {
        let tracker = LineMovementTracker::new();
        tracker.record_lines(&[prop("s1mple", "kills", 10.0)]).await;
        tracker.record_lines(&[prop("s1mple", "kills", 11.7)]).await;

        let m = tracker
            .get_line_movement("s1mple", "kills", Platform::Prizepicks)
            .await
            .unwrap();
        assert_relative_eq!(m.movement, 1.7, epsilon = 1e-9);
        assert_eq!(m.direction, MovementDirection::Up);
        assert!(m.is_significant, "1.7 >= kills threshold 1.5");
    }

    #[tokio::test]
    async fn small_movement_is_stable() {
        let tracker = LineMovementTracker::new();
        tracker.record_lines(&[prop("s1mple", "kills", 10.0)]).await;
        tracker.record_lines(&[prop("s1mple", "kills", 10.2)]).await;

        let m = tracker
            .get_line_movement("s1mple", "kills", Platform::Prizepicks)
            .await
            .unwrap();
        assert_eq!(m.direction, MovementDirection::Stable);
        assert!(!m.is_significant);
    }

    #[tokio::test]
    async fn headshots_use_lower_significance_threshold() {
        let tracker = LineMovementTracker::new();
        tracker.record_lines(&[prop("ZywOo", "headshots", 20.0)]).await;
        tracker.record_lines(&[prop("ZywOo", "headshots", 21.2)]).await;

        let m = tracker
            .get_line_movement("ZywOo", "headshots", Platform::Prizepicks)
            .await
            .unwrap();
        // 1.2 clears the non-kills threshold of 1.0 but not the kills one
        assert!(m.is_significant);
        assert_eq!(m.direction, MovementDirection::Up);
    }

    #[tokio::test]
    async fn history_is_capped_at_fifty() {
        let tracker = LineMovementTracker::new();
        for i in 0..60 {
            tracker
                .record_lines(&[prop("s1mple", "kills", 10.0 + i as f64)])
                .await;
        }

        let m = tracker
            .get_line_movement("s1mple", "kills", Platform::Prizepicks)
            .await
            .unwrap();
        assert_eq!(m.history_count, 50);
        // Most recent 50 retained: current is the 60th observation
        assert_relative_eq!(m.current_line, 69.0);
        assert_relative_eq!(m.previous_line.unwrap(), 68.0);

        let stats = tracker.get_tracker_stats().await;
        assert_eq!(stats.total_history_entries, 50);
    }

    #[tokio::test]
    async fn invalid_records_are_skipped() {
        let tracker = LineMovementTracker::new();
        tracker
            .record_lines(&[
                prop("", "kills", 40.0),
                prop("s1mple", "", 40.0),
                prop("s1mple", "kills", 0.0),
            ])
            .await;
        let stats = tracker.get_tracker_stats().await;
        assert_eq!(stats.total_history_entries, 0);
    }

    #[tokio::test]
    async fn significant_movements_sorted_by_magnitude() {
        let tracker = LineMovementTracker::new();
        tracker
            .record_lines(&[prop("a", "kills", 10.0), prop("b", "kills", 20.0), prop("c", "kills", 30.0)])
            .await;
        tracker
            .record_lines(&[
                prop("a", "kills", 12.0), // +2.0
                prop("b", "kills", 16.5), // -3.5
                prop("c", "kills", 30.2), // +0.2, not significant
            ])
            .await;

        let significant = tracker.get_significant_movements().await;
        assert_eq!(significant.len(), 2);
        assert_eq!(significant[0].player_name, "b");
        assert_relative_eq!(significant[0].movement, -3.5, epsilon = 1e-9);
        assert_eq!(significant[1].player_name, "a");
    }

    #[tokio::test]
    async fn new_keys_excluded_from_significant() {
        let tracker = LineMovementTracker::new();
        tracker.record_lines(&[prop("a", "kills", 50.0)]).await;
        assert!(tracker.get_significant_movements().await.is_empty());
    }

    #[tokio::test]
    async fn clear_old_history_prunes_and_drops_empty_keys() {
        let tracker = LineMovementTracker::new();
        let stale = Utc::now() - Duration::hours(48);
        tracker.record_at(&[prop("old", "kills", 30.0)], stale).await;
        tracker.record_lines(&[prop("fresh", "kills", 40.0)]).await;

        tracker.clear_old_history(24).await;

        assert!(tracker
            .get_line_movement("old", "kills", Platform::Prizepicks)
            .await
            .is_none());
        assert!(tracker
            .get_line_movement("fresh", "kills", Platform::Prizepicks)
            .await
            .is_some());
        let stats = tracker.get_tracker_stats().await;
        assert_eq!(stats.tracked_players, 1);
        assert_eq!(stats.tracked_stat_lines, 1);
    }

    #[tokio::test]
    async fn tracker_stats_counts() {
        let tracker = LineMovementTracker::new();
        tracker
            .record_lines(&[prop("a", "kills", 10.0), prop("a", "headshots", 5.0)])
            .await;
        tracker
            .record_lines(&[prop("a", "kills", 13.0), prop("a", "headshots", 5.1)])
            .await;

        let stats = tracker.get_tracker_stats().await;
        assert_eq!(stats.tracked_players, 1);
        assert_eq!(stats.tracked_stat_lines, 2);
        assert_eq!(stats.total_history_entries, 4);
        assert_eq!(stats.movements_detected, 2);
        assert_eq!(stats.significant_movements, 1);
    }
}
