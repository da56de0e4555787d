use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// TMDB API key (v3)
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// TMDB image base URL (original-size posters)
    #[serde(default = "default_tmdb_image_url")]
    pub tmdb_image_url: String,

    /// SQLite database connection URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Outbound HTTP call timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Idle time in seconds after which a dialogue session is evicted
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_url() -> String {
    "https://image.tmdb.org/t/p/original".to_string()
}

fn default_database_url() -> String {
    "sqlite://film_match.db?mode=rwc".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_session_idle_secs() -> u64 {
    1800
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
