use std::env;

use crate::pipeline::Thresholds;

#[derive(Debug, Clone)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Supabase
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub readings_table: String,
    pub devices_table: String,
    pub profiles_table: String,
    pub request_timeout_seconds: u64,
    pub realtime_heartbeat_seconds: u64,

    // Live window
    pub window_capacity: usize,
    pub thresholds: Thresholds,

    // API settings
    pub api_host: String,
    pub api_port: u16,

    // Application metadata
    pub deployment: Deployment,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if required environment variables are not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Thresholds::default();

        Ok(Self {
            // Supabase
            supabase_url: env::var("SUPABASE_URL")
                .map_err(|_| ConfigError::Missing("SUPABASE_URL"))?
                .trim_end_matches('/')
                .to_string(),
            supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                .map_err(|_| ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            readings_table: env::var("READINGS_TABLE").unwrap_or_else(|_| "mediciones".to_string()),
            devices_table: env::var("DEVICES_TABLE").unwrap_or_else(|_| "devices".to_string()),
            profiles_table: env::var("PROFILES_TABLE").unwrap_or_else(|_| "profiles".to_string()),
            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            realtime_heartbeat_seconds: env::var("REALTIME_HEARTBEAT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),

            // Live window
            window_capacity: env::var("WINDOW_CAPACITY")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .ok()
                .filter(|c| *c > 0)
                .unwrap_or(20),
            thresholds: Thresholds {
                ph_min: env::var("THRESHOLD_PH_MIN")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.ph_min),
                ph_max: env::var("THRESHOLD_PH_MAX")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.ph_max),
                tds_max: env::var("THRESHOLD_TDS_MAX")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.tds_max),
                turbidity_max: env::var("THRESHOLD_TURBIDITY_MAX")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.turbidity_max),
            },

            // API settings
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),

            // Application metadata
            deployment: Deployment::from_str(
                &env::var("DEPLOYMENT").unwrap_or_else(|_| "local".to_string()),
            ),
        })
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
