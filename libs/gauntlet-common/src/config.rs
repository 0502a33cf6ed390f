use std::env;
use std::time::Duration;

/// Which declaration wins when user code defines several functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryPointPolicy {
    /// First declaration in source order
    #[default]
    FirstDeclared,
    /// Declaration with the most parameters; earlier wins on ties
    LargestArity,
}

impl EntryPointPolicy {
    pub fn from_str(s: &str) -> Option<EntryPointPolicy> {
        match s.trim().to_lowercase().as_str() {
            "first" | "first-declared" => Some(EntryPointPolicy::FirstDeclared),
            "largest-arity" | "largest" => Some(EntryPointPolicy::LargestArity),
            _ => None,
        }
    }
}

/// Application configuration
/// Provides defaults with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    pub sandbox_url: String,
    pub request_timeout_ms: u64,
    pub compile_timeout_ms: u64,
    pub run_timeout_ms: u64,
    pub max_rate_limit_retries: u32,
    pub max_transport_retries: u32,
    pub backoff_base_ms: u64,
    pub single_cache_ttl_secs: u64,
    pub batch_cache_ttl_secs: u64,
    pub entry_point: EntryPointPolicy,
    pub languages_config_path: String,
    pub api_addr: String,
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            sandbox_url: env::var("GAUNTLET_SANDBOX_URL")
                .unwrap_or_else(|_| "https://emkc.org/api/v2/piston".to_string()),
            request_timeout_ms: parsed("GAUNTLET_REQUEST_TIMEOUT_MS", 20_000),
            compile_timeout_ms: parsed("GAUNTLET_COMPILE_TIMEOUT_MS", 8_000),
            run_timeout_ms: parsed("GAUNTLET_RUN_TIMEOUT_MS", 10_000),
            max_rate_limit_retries: parsed("GAUNTLET_MAX_RATE_LIMIT_RETRIES", 2),
            max_transport_retries: parsed("GAUNTLET_MAX_TRANSPORT_RETRIES", 1),
            backoff_base_ms: parsed("GAUNTLET_BACKOFF_BASE_MS", 300),
            single_cache_ttl_secs: parsed("GAUNTLET_SINGLE_CACHE_TTL_SECS", 300),
            batch_cache_ttl_secs: parsed("GAUNTLET_BATCH_CACHE_TTL_SECS", 600),
            entry_point: env::var("GAUNTLET_ENTRY_POINT")
                .ok()
                .and_then(|v| EntryPointPolicy::from_str(&v))
                .unwrap_or_default(),
            languages_config_path: env::var("GAUNTLET_LANGUAGES_CONFIG")
                .unwrap_or_else(|_| "config/languages.json".to_string()),
            api_addr: env::var("GAUNTLET_API_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        }
    }

    pub fn new() -> Self {
        Self::from_env()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn single_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.single_cache_ttl_secs)
    }

    pub fn batch_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.batch_cache_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.max_rate_limit_retries, 2);
        assert_eq!(config.max_transport_retries, 1);
        assert_eq!(config.single_cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.batch_cache_ttl(), Duration::from_secs(600));
        assert!(config.single_cache_ttl() < config.batch_cache_ttl());
    }

    #[test]
    fn test_entry_point_policy_parsing() {
        assert_eq!(
            EntryPointPolicy::from_str("first"),
            Some(EntryPointPolicy::FirstDeclared)
        );
        assert_eq!(
            EntryPointPolicy::from_str("Largest-Arity"),
            Some(EntryPointPolicy::LargestArity)
        );
        assert_eq!(EntryPointPolicy::from_str("random"), None);
        assert_eq!(EntryPointPolicy::default(), EntryPointPolicy::FirstDeclared);
    }
}
