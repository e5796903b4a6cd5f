//! PrizePicks projections API client.
//!
//! The public projections endpoint returns a JSON:API document whose
//! `data` array carries one item per posted line. The player name rides
//! in the description field ("s1mple - NAVI vs FaZe"), the line in
//! `line_score`. Anti-bot measures mean this endpoint regularly answers
//! 403; the orchestrator treats that as an empty fetch, not a fatal error.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::db::models::{Platform, PropRecord};
use crate::engine::stat_norm::normalize_stat_type;
use crate::feeds::provider::PropProvider;

#[derive(Clone)]
pub struct PrizePicksFeed {
    http: Client,
    base_url: String,
}

impl PrizePicksFeed {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(PrizePicksFeed {
            http,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl PropProvider for PrizePicksFeed {
    async fn fetch_props(&self) -> Result<Vec<PropRecord>> {
        let url = format!("{}/projections", self.base_url);
        debug!("Fetching PrizePicks projections: {}", url);

        let resp = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("PrizePicks request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("PrizePicks API returned status {}", resp.status());
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse PrizePicks response")?;

        let props = parse_projections(&raw);
        info!("Parsed {} PrizePicks projections", props.len());
        Ok(props)
    }

    fn platform(&self) -> Platform {
        Platform::Prizepicks
    }

    fn name(&self) -> &str {
        "PrizePicks"
    }
}

/// Extract prop records from a PrizePicks JSON:API document. Items with
/// an empty player name or non-positive line are dropped at the boundary.
fn parse_projections(raw: &serde_json::Value) -> Vec<PropRecord> {
    let items = match raw.get("data").and_then(|v| v.as_array()) {
        Some(items) => items,
        None => return Vec::new(),
    };

    items
        .iter()
        .filter(|item| item["type"].as_str() == Some("projection"))
        .filter_map(|item| {
            let attrs = item.get("attributes")?;
            let description = attrs["description"].as_str().unwrap_or("");
            let player_name = description
                .split(" - ")
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            let line = attrs["line_score"]
                .as_f64()
                .or_else(|| attrs["line_score"].as_str().and_then(|s| s.parse().ok()))
                .unwrap_or(0.0);

            if player_name.is_empty() || line <= 0.0 {
                return None;
            }

            Some(PropRecord {
                player_name,
                stat_type: normalize_stat_type(attrs["stat_type"].as_str().unwrap_or("")),
                line,
                platform: Platform::Prizepicks,
                team: attrs["team"].as_str().map(str::to_string),
                maps: attrs["maps"].as_str().map(str::to_string),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "data": [
            {
                "type": "projection",
                "attributes": {
                    "description": "s1mple - NAVI vs FaZe",
                    "stat_type": "MAPS 1-2 Kills",
                    "line_score": 45.5,
                    "team": "NAVI"
                }
            },
            {
                "type": "projection",
                "attributes": {
                    "description": "ZywOo - Vitality vs MOUZ",
                    "stat_type": "Headshots",
                    "line_score": "21.5"
                }
            },
            {
                "type": "projection",
                "attributes": {
                    "description": " - broken row",
                    "stat_type": "Kills",
                    "line_score": 40.0
                }
            },
            {
                "type": "projection",
                "attributes": {
                    "description": "karrigan - FaZe vs NAVI",
                    "stat_type": "Kills",
                    "line_score": 0
                }
            },
            { "type": "league", "attributes": {} }
        ]
    }"#;

    #[test]
    fn parses_valid_projections_only() {
        let raw: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        let props = parse_projections(&raw);
        assert_eq!(props.len(), 2);

        assert_eq!(props[0].player_name, "s1mple");
        assert_eq!(props[0].stat_type, "kills");
        assert!((props[0].line - 45.5).abs() < 1e-9);
        assert_eq!(props[0].team.as_deref(), Some("NAVI"));

        // String-typed line_score still parses
        assert_eq!(props[1].player_name, "ZywOo");
        assert_eq!(props[1].stat_type, "headshots");
        assert!((props[1].line - 21.5).abs() < 1e-9);
        assert_eq!(props[1].team, None);
    }

    #[test]
    fn missing_data_array_yields_empty() {
        let raw: serde_json::Value = serde_json::json!({"errors": ["blocked"]});
        assert!(parse_projections(&raw).is_empty());
    }
}
