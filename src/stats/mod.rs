//! Historical player/team stats, backed by PandaScore.
//!
//! Disabled by default; when no API key is configured every lookup returns
//! `None` and the projection model falls back to its sampled form and the
//! static rating table.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Source of per-player form and per-team strength overrides. Returning
/// `Ok(None)` means "no data"; the caller falls back to its own defaults.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    async fn fetch_player_recent_form(&self, player: &str) -> Result<Option<f64>>;
    async fn fetch_team_rating(&self, team: &str) -> Result<Option<f64>>;
    fn name(&self) -> &str;
}

struct CacheEntry {
    value: f64,
    fetched_at: Instant,
}

#[derive(Default)]
struct StatsCache {
    players: HashMap<String, CacheEntry>,
    teams: HashMap<String, CacheEntry>,
}

impl StatsCache {
    fn fresh(entry: Option<&CacheEntry>) -> Option<f64> {
        entry
            .filter(|e| e.fetched_at.elapsed() < CACHE_TTL)
            .map(|e| e.value)
    }
}

pub struct PandaScoreStats {
    http: Client,
    base_url: String,
    api_key: String,
    enabled: bool,
    cache: Arc<RwLock<StatsCache>>,
}

impl PandaScoreStats {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let enabled = api_key.is_some();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(PandaScoreStats {
            http,
            base_url: "https://api.pandascore.co/csgo".to_string(),
            api_key: api_key.unwrap_or_default(),
            enabled,
            cache: Arc::new(RwLock::new(StatsCache::default())),
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .context("PandaScore request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("PandaScore returned status {}", resp.status());
        }
        resp.json().await.context("Failed to parse PandaScore response")
    }
}

#[async_trait]
impl StatsProvider for PandaScoreStats {
    async fn fetch_player_recent_form(&self, player: &str) -> Result<Option<f64>> {
        if !self.enabled {
            return Ok(None);
        }

        if let Some(form) = StatsCache::fresh(self.cache.read().await.players.get(player)) {
            debug!("Using cached form for {}", player);
            return Ok(Some(form));
        }

        let search = self
            .get_json(
                &format!("{}/players", self.base_url),
                &[("search[name]", player), ("per_page", "1")],
            )
            .await?;

        let found = match search.as_array().and_then(|a| a.first()) {
            Some(p) => p.clone(),
            None => {
                debug!("Player {} not found in PandaScore", player);
                return Ok(None);
            }
        };

        let player_id = found["id"].as_i64().unwrap_or(0);
        let form = match self
            .get_json(&format!("{}/players/{}/stats", self.base_url, player_id), &[])
            .await
        {
            Ok(stats) => form_from_stats(&stats),
            Err(e) => {
                // Stats endpoint can be stale for fringe players; search data
                // alone still tells us whether they have an active team.
                warn!("Stats endpoint unavailable for {}: {}", player, e);
                if found["current_team"].is_object() {
                    1.05
                } else {
                    1.0
                }
            }
        };

        self.cache.write().await.players.insert(
            player.to_string(),
            CacheEntry { value: form, fetched_at: Instant::now() },
        );
        info!("Real form for {}: {:.2}x", player, form);
        Ok(Some(form))
    }

    async fn fetch_team_rating(&self, team: &str) -> Result<Option<f64>> {
        if !self.enabled {
            return Ok(None);
        }

        if let Some(rating) = StatsCache::fresh(self.cache.read().await.teams.get(team)) {
            debug!("Using cached rating for {}", team);
            return Ok(Some(rating));
        }

        let search = self
            .get_json(
                &format!("{}/teams", self.base_url),
                &[("search[name]", team), ("per_page", "1")],
            )
            .await?;

        let found = match search.as_array().and_then(|a| a.first()) {
            Some(t) => t,
            None => {
                debug!("Team {} not found in PandaScore", team);
                return Ok(None);
            }
        };

        let rating = rating_from_team(found);
        self.cache.write().await.teams.insert(
            team.to_string(),
            CacheEntry { value: rating, fetched_at: Instant::now() },
        );
        Ok(Some(rating))
    }

    fn name(&self) -> &str {
        "PandaScore"
    }
}

/// Maps a raw stats document onto a form multiplier in [0.85, 1.15].
/// K/D carries most of the weight; kills per round and headshot rate nudge.
fn form_from_stats(stats: &Value) -> f64 {
    let kd_ratio = stats["kd_ratio"].as_f64().unwrap_or(1.0);
    let kills_per_round = stats["average_kills_per_round"].as_f64().unwrap_or(0.7);
    let headshot_pct = stats["headshot_percentage"].as_f64().unwrap_or(50.0);

    let mut form: f64 = 1.0;

    form += if kd_ratio >= 1.3 {
        0.15
    } else if kd_ratio >= 1.2 {
        0.12
    } else if kd_ratio >= 1.1 {
        0.08
    } else if kd_ratio >= 1.0 {
        0.05
    } else if kd_ratio >= 0.9 {
        0.02
    } else if kd_ratio >= 0.8 {
        -0.05
    } else {
        -0.10
    };

    if kills_per_round >= 0.85 {
        form += 0.05;
    } else if kills_per_round >= 0.75 {
        form += 0.03;
    } else if kills_per_round < 0.6 {
        form -= 0.03;
    }

    if headshot_pct >= 55.0 {
        form += 0.02;
    } else if headshot_pct < 45.0 {
        form -= 0.02;
    }

    (form.clamp(0.85, 1.15) * 100.0).round() / 100.0
}

fn rating_from_team(team: &Value) -> f64 {
    // A full five-man roster marks an active team.
    let roster = team["players"].as_array().map(|p| p.len()).unwrap_or(0);
    if roster >= 5 {
        1.05
    } else {
        1.0
    }
}
