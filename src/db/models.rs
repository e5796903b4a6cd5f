use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An upcoming or in-progress CS2 match, created once per aggregation pass.
/// Identity is the generated `id`, not the team names: two passes may mint
/// different ids for the same real-world match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub team1: String,
    pub team2: String,
    pub tournament: String,
    pub start_time: DateTime<Utc>,
    /// First map of the series, "TBD" until the veto is known
    pub map1: String,
    pub map2: String,
    pub status: MatchStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Upcoming,
    Live,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Upcoming => "upcoming",
            MatchStatus::Live => "live",
            MatchStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> MatchStatus {
        match s {
            "live" => MatchStatus::Live,
            "completed" => MatchStatus::Completed,
            _ => MatchStatus::Upcoming,
        }
    }
}

/// DFS platform that posts player prop lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Prizepicks,
    Underdog,
}

/// A single platform's posted line for one player/stat. Immutable once observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DfsLine {
    pub platform: Platform,
    pub stat_type: String,
    pub line: f64,
    /// Maps the line covers, e.g. "Map1+Map2"
    pub maps: String,
}

/// Our independent projection for one player/stat in one match.
/// Rebuilt from scratch every aggregation pass, never partially mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projection {
    pub match_id: String,
    pub player_name: String,
    pub team: String,
    pub stat_type: String,
    pub projected_value: f64,
    /// 0–100, clamped into [60, 95] by the model
    pub confidence: f64,
    pub dfs_lines: Vec<DfsLine>,
    pub value_opportunity: bool,
    /// projected_value − average(dfs_lines.line)
    pub difference: f64,
}

/// Raw prop record as delivered by a feed source, validated at the
/// ingestion boundary (non-empty player, positive line).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropRecord {
    pub player_name: String,
    pub stat_type: String,
    pub line: f64,
    pub platform: Platform,
    /// Team affiliation if the source reports one
    pub team: Option<String>,
    pub maps: Option<String>,
}

/// Raw upcoming-match record from the schedule source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub team1: String,
    pub team2: String,
    pub tournament: String,
    pub start_time: DateTime<Utc>,
    pub status: MatchStatus,
}

/// Per-source outcome of one fetch, surfaced at /api/feed-status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStatus {
    pub source: String,
    pub success: bool,
    pub count: usize,
    pub note: Option<String>,
    pub fetched_at: DateTime<Utc>,
}
