//! Underdog Fantasy over/under lines client.
//!
//! Underdog's endpoint returns `over_under_lines`, each carrying the
//! posted value as a string in `stat_value` plus the appearance metadata
//! (player, team, stat) nested under `over_under`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::db::models::{Platform, PropRecord};
use crate::engine::stat_norm::normalize_stat_type;
use crate::feeds::provider::PropProvider;

#[derive(Clone)]
pub struct UnderdogFeed {
    http: Client,
    base_url: String,
}

impl UnderdogFeed {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(UnderdogFeed {
            http,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl PropProvider for UnderdogFeed {
    async fn fetch_props(&self) -> Result<Vec<PropRecord>> {
        let url = format!("{}/over_under_lines", self.base_url);
        debug!("Fetching Underdog lines: {}", url);

        let resp = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Underdog request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Underdog API returned status {}", resp.status());
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse Underdog response")?;

        let props = parse_lines(&raw);
        info!("Parsed {} Underdog lines", props.len());
        Ok(props)
    }

    fn platform(&self) -> Platform {
        Platform::Underdog
    }

    fn name(&self) -> &str {
        "Underdog"
    }
}

fn parse_lines(raw: &serde_json::Value) -> Vec<PropRecord> {
    let items = match raw.get("over_under_lines").and_then(|v| v.as_array()) {
        Some(items) => items,
        None => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| {
            let line = item["stat_value"]
                .as_f64()
                .or_else(|| item["stat_value"].as_str().and_then(|s| s.parse().ok()))
                .unwrap_or(0.0);

            let player = item.get("player");
            let player_name = player
                .and_then(|p| p["name"].as_str())
                .or_else(|| {
                    // Fall back to the line title, "Djon8 Maps 1+2 Kills"
                    item["over_under"]["title"]
                        .as_str()
                        .and_then(|t| t.split_whitespace().next())
                })
                .unwrap_or("")
                .trim()
                .to_string();

            if player_name.is_empty() || line <= 0.0 {
                return None;
            }

            let stat = item["over_under"]["appearance_stat"]["stat"]
                .as_str()
                .unwrap_or("");
            let team = player
                .and_then(|p| p["team_name"].as_str())
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string);

            Some(PropRecord {
                player_name,
                stat_type: normalize_stat_type(stat),
                line,
                platform: Platform::Underdog,
                team,
                maps: Some("Map1+Map2".to_string()),
            })
        })
        .collect()
}
