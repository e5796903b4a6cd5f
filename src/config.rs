use clap::Parser;

/// CS2 player-prop projection engine
#[derive(Parser, Debug, Clone)]
#[command(name = "propsight", version, about)]
pub struct Config {
    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "propsight.db")]
    pub database_path: String,

    /// Automatic refresh interval in seconds
    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value = "300")]
    pub refresh_interval_secs: u64,

    /// Per-feed fetch timeout in seconds
    #[arg(long, env = "FEED_TIMEOUT_SECS", default_value = "15")]
    pub feed_timeout_secs: u64,

    /// PrizePicks API base URL
    #[arg(
        long,
        env = "PRIZEPICKS_API_URL",
        default_value = "https://api.prizepicks.com"
    )]
    pub prizepicks_api_url: String,

    /// Underdog Fantasy API base URL
    #[arg(
        long,
        env = "UNDERDOG_API_URL",
        default_value = "https://api.underdogfantasy.com/beta/v3"
    )]
    pub underdog_api_url: String,

    /// HLTV match feed base URL (RapidAPI mirror)
    #[arg(
        long,
        env = "HLTV_API_URL",
        default_value = "https://hltv-api.p.rapidapi.com"
    )]
    pub hltv_api_url: String,

    /// RapidAPI key for the HLTV match feed
    #[arg(long, env = "HLTV_API_KEY")]
    pub hltv_api_key: Option<String>,

    /// PandaScore API key; enables real player/team stats when set
    #[arg(long, env = "PANDASCORE_API_KEY")]
    pub pandascore_api_key: Option<String>,

    /// Hours of line history to keep before pruning
    #[arg(long, env = "HISTORY_RETENTION_HOURS", default_value = "24")]
    pub history_retention_hours: i64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.refresh_interval_secs == 0 {
            anyhow::bail!("refresh_interval_secs must be positive");
        }
        if self.feed_timeout_secs == 0 {
            anyhow::bail!("feed_timeout_secs must be positive");
        }
        if self.feed_timeout_secs >= self.refresh_interval_secs {
            anyhow::bail!(
                "feed_timeout_secs ({}) must be shorter than refresh_interval_secs ({})",
                self.feed_timeout_secs,
                self.refresh_interval_secs
            );
        }
        if self.history_retention_hours <= 0 {
            anyhow::bail!("history_retention_hours must be positive");
        }
        Ok(())
    }
}
