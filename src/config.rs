use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub max_body_size: usize,
    pub fetch: FetchConfig,
    /// Directory holding `schema-<version>.json` files. Built-in schemas are used when unset.
    pub schema_dir: Option<PathBuf>,
    /// Persist a newly submitted record even when its first fetch fails.
    pub keep_failed_submissions: bool,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_response_size: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_response_size: 1_048_576,
            user_agent: concat!("when-events/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;

        let host: IpAddr = env_or("WHEN_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid WHEN_HOST: {e}"))?;

        let port: u16 = env_or("WHEN_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid WHEN_PORT: {e}"))?;

        let log_level = env_or("WHEN_LOG_LEVEL", "info");

        let max_body_size: usize = env_or("WHEN_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid WHEN_MAX_BODY_SIZE: {e}"))?;

        let defaults = FetchConfig::default();

        let timeout_secs: u64 = env_or("WHEN_FETCH_TIMEOUT_SECS", "30")
            .parse()
            .map_err(|e| format!("Invalid WHEN_FETCH_TIMEOUT_SECS: {e}"))?;
        if timeout_secs == 0 {
            return Err("Invalid WHEN_FETCH_TIMEOUT_SECS: must be at least 1".to_string());
        }

        let max_response_size: usize = env_or("WHEN_MAX_RESPONSE_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid WHEN_MAX_RESPONSE_SIZE: {e}"))?;

        let user_agent = env_or("WHEN_USER_AGENT", &defaults.user_agent);

        let schema_dir = std::env::var("WHEN_SCHEMA_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let keep_failed_submissions = match env_or("WHEN_KEEP_FAILED_SUBMISSIONS", "true").as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            other => {
                return Err(format!(
                    "Invalid WHEN_KEEP_FAILED_SUBMISSIONS '{other}': expected true or false"
                ))
            }
        };

        Ok(Config {
            database_url,
            host,
            port,
            log_level,
            max_body_size,
            fetch: FetchConfig {
                timeout: Duration::from_secs(timeout_secs),
                max_response_size,
                user_agent,
            },
            schema_dir,
            keep_failed_submissions,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
