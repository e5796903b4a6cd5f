//! Upcoming-match feed backed by the HLTV RapidAPI mirror.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::db::models::{MatchRecord, MatchStatus};
use crate::feeds::provider::MatchProvider;

#[derive(Clone)]
pub struct HltvMatches {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HltvMatches {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: std::time::Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HltvMatches {
            http,
            base_url: base_url.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl MatchProvider for HltvMatches {
    async fn fetch_upcoming_matches(&self) -> Result<Vec<MatchRecord>> {
        let url = format!("{}/matches", self.base_url);
        debug!("Fetching upcoming matches: {}", url);

        let mut req = self.http.get(&url);
        if let Some(key) = &self.api_key {
            req = req.header("x-rapidapi-key", key.as_str());
        }

        let resp = req.send().await.context("HLTV request failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("HLTV API returned status {}", resp.status());
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse HLTV response")?;

        let matches = parse_matches(&raw);
        info!("Parsed {} upcoming matches", matches.len());
        Ok(matches)
    }

    fn name(&self) -> &str {
        "HLTV"
    }
}

fn parse_matches(raw: &serde_json::Value) -> Vec<MatchRecord> {
    let items = raw
        .get("data")
        .and_then(|v| v.as_array())
        .or_else(|| raw.as_array());
    let items = match items {
        Some(items) => items,
        None => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| {
            let team1 = item["team_one"]["title"].as_str().unwrap_or("").trim();
            let team2 = item["team_two"]["title"].as_str().unwrap_or("").trim();
            if team1.is_empty() || team2.is_empty() {
                return None;
            }

            let start_time = item["starts_at"]
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            let start_time = match start_time {
                Some(t) => t,
                None => {
                    warn!("Skipping match {} vs {} with unparseable start time", team1, team2);
                    return None;
                }
            };

            let tournament = item["event"]["title"]
                .as_str()
                .unwrap_or("Unknown Event")
                .to_string();

            let status = match item["status"].as_str() {
                Some("live") | Some("running") => MatchStatus::Live,
                Some("finished") | Some("completed") => MatchStatus::Completed,
                _ => MatchStatus::Upcoming,
            };

            Some(MatchRecord {
                team1: team1.to_string(),
                team2: team2.to_string(),
                tournament,
                start_time,
                status,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const SAMPLE: &str = r#"{
        "data": [
            {
                "team_one": { "title": "Natus Vincere" },
                "team_two": { "title": "FaZe" },
                "starts_at": "2026-09-01T18:00:00+00:00",
                "event": { "title": "IEM Cologne 2026" }
            },
            {
                "team_one": { "title": "Spirit" },
                "team_two": { "title": "" },
                "starts_at": "2026-09-01T20:00:00+00:00",
                "event": { "title": "IEM Cologne 2026" }
            },
            {
                "team_one": { "title": "G2" },
                "team_two": { "title": "Vitality" },
                "starts_at": "not-a-date",
                "event": { "title": "IEM Cologne 2026" }
            }
        ]
    }"#;

    #[test]
    fn parses_upcoming_matches() {
        let raw: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        let matches = parse_matches(&raw);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].team1, "Natus Vincere");
        assert_eq!(matches[0].team2, "FaZe");
        assert_eq!(matches[0].tournament, "IEM Cologne 2026");
        assert_eq!(matches[0].start_time.year(), 2026);
        assert_eq!(matches[0].status, MatchStatus::Upcoming);
    }

    #[test]
    fn tolerates_missing_data_key() {
        let raw = serde_json::json!({"error": "rate limited"});
        assert!(parse_matches(&raw).is_empty());
    }
}
