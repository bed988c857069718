//! Service configuration.
//!
//! Values come from (lowest to highest priority) built-in defaults, an
//! optional TOML file, environment variables, and CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::browser::{BrowserEngineConfig, WaitUntil};
use crate::llm::LlmConfig;
use crate::stores::{MatchMode, StoreRouter};

/// Top-level service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Listen address ("port", "host" or "host:port").
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Upper bound for one navigation, including its load condition.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Best-effort wait for each selector before the content snapshot.
    #[serde(default = "default_selector_timeout_ms")]
    pub selector_timeout_ms: u64,

    /// Deadline for one extraction item, navigation and waits included.
    #[serde(default = "default_item_deadline_ms")]
    pub item_deadline_ms: u64,

    /// Load condition used when a request does not name one.
    #[serde(default)]
    pub default_wait_until: WaitUntil,

    /// Load condition for store-routed price extraction.
    #[serde(default = "default_precios_wait_until")]
    pub precios_wait_until: WaitUntil,

    /// How URLs are matched to store profiles.
    #[serde(default)]
    pub router_match: MatchMode,

    /// Extra store profiles, loaded once at startup.
    #[serde(default)]
    pub profiles_file: Option<PathBuf>,

    #[serde(default)]
    pub browser: BrowserEngineConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_navigation_timeout_ms() -> u64 {
    60_000
}

fn default_selector_timeout_ms() -> u64 {
    10_000
}

fn default_item_deadline_ms() -> u64 {
    60_000
}

fn default_precios_wait_until() -> WaitUntil {
    WaitUntil::NetworkIdle
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            selector_timeout_ms: default_selector_timeout_ms(),
            item_deadline_ms: default_item_deadline_ms(),
            default_wait_until: WaitUntil::default(),
            precios_wait_until: default_precios_wait_until(),
            router_match: MatchMode::default(),
            profiles_file: None,
            browser: BrowserEngineConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {:?}", path))?;
                Self::from_toml(&content)
                    .with_context(|| format!("Failed to parse config file {:?}", path))?
            }
            None => Self::default(),
        };
        Ok(config.with_env_overrides())
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment variable overrides.
    ///
    /// - `SCRAPER_BIND`
    /// - `SCRAPER_NAVIGATION_TIMEOUT_MS`
    /// - `SCRAPER_SELECTOR_TIMEOUT_MS`
    /// - `SCRAPER_ITEM_DEADLINE_MS`
    /// - `SCRAPER_WAIT_UNTIL`
    /// - `SCRAPER_PRECIOS_WAIT_UNTIL`
    /// - `SCRAPER_ROUTER_MATCH` ("host" or "substring")
    /// - `SCRAPER_PROFILES_FILE`
    ///
    /// Browser and LLM sections apply their own overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("SCRAPER_BIND") {
            self.bind = val;
        }
        if let Some(ms) = env_parse("SCRAPER_NAVIGATION_TIMEOUT_MS") {
            self.navigation_timeout_ms = ms;
        }
        if let Some(ms) = env_parse("SCRAPER_SELECTOR_TIMEOUT_MS") {
            self.selector_timeout_ms = ms;
        }
        if let Some(ms) = env_parse("SCRAPER_ITEM_DEADLINE_MS") {
            self.item_deadline_ms = ms;
        }
        if let Some(w) = env_parse("SCRAPER_WAIT_UNTIL") {
            self.default_wait_until = w;
        }
        if let Some(w) = env_parse("SCRAPER_PRECIOS_WAIT_UNTIL") {
            self.precios_wait_until = w;
        }
        if let Some(mode) = env_parse("SCRAPER_ROUTER_MATCH") {
            self.router_match = mode;
        }
        if let Ok(val) = std::env::var("SCRAPER_PROFILES_FILE") {
            if !val.is_empty() {
                self.profiles_file = Some(PathBuf::from(val));
            }
        }

        self.browser = self.browser.with_env_overrides();
        self.llm = self.llm.with_env_overrides();
        self
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }

    pub fn item_deadline(&self) -> Duration {
        Duration::from_millis(self.item_deadline_ms)
    }

    /// Build the store router: built-in profiles plus the profile file.
    pub fn build_router(&self) -> anyhow::Result<StoreRouter> {
        let mut router = StoreRouter::builtin(self.router_match)?;
        if let Some(ref path) = self.profiles_file {
            router
                .extend_from_file(path)
                .with_context(|| format!("Failed to load store profiles from {:?}", path))?;
        }
        Ok(router)
    }
}

/// Parse an env var; a set but invalid value is logged and ignored.
fn env_parse<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let val = std::env::var(key).ok()?;
    match val.parse() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Ignoring invalid {}={:?}: {}", key, val, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.navigation_timeout(), Duration::from_secs(60));
        assert_eq!(config.selector_timeout(), Duration::from_secs(10));
        assert_eq!(config.default_wait_until, WaitUntil::DomContentLoaded);
        assert_eq!(config.precios_wait_until, WaitUntil::NetworkIdle);
        assert_eq!(config.router_match, MatchMode::Host);
    }

    #[test]
    fn test_partial_toml() {
        let config = ServiceConfig::from_toml(
            r#"
            bind = "0.0.0.0:9000"
            selector_timeout_ms = 15000
            default_wait_until = "networkIdle"
            router_match = "substring"

            [browser]
            headless = false

            [llm]
            model = "llama3.1:8b"
            "#,
        )
        .unwrap();

        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.selector_timeout_ms, 15000);
        assert_eq!(config.navigation_timeout_ms, 60_000);
        assert_eq!(config.default_wait_until, WaitUntil::NetworkIdle);
        assert_eq!(config.router_match, MatchMode::Substring);
        assert!(!config.browser.headless);
        assert_eq!(config.llm.model, "llama3.1:8b");
    }

    #[test]
    fn test_build_router_with_profile_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stores.toml");
        std::fs::write(
            &path,
            "[[store]]\ntoken = \"locatel.com.co\"\nselectors = [{ label = \"precio_actual\", selector = \".price\" }]\n",
        )
        .unwrap();

        let config = ServiceConfig {
            profiles_file: Some(path),
            ..Default::default()
        };
        let router = config.build_router().unwrap();
        assert_eq!(router.profiles().len(), 4);

        let config = ServiceConfig {
            profiles_file: Some(dir.path().join("missing.toml")),
            ..Default::default()
        };
        assert!(config.build_router().is_err());
    }

    #[test]
    fn test_env_parse_rejects_invalid_values() {
        std::env::set_var("STOREFRONT_TEST_ROUTER_MATCH", "hots");
        std::env::set_var("STOREFRONT_TEST_TIMEOUT_MS", "15000");
        assert_eq!(env_parse::<MatchMode>("STOREFRONT_TEST_ROUTER_MATCH"), None);
        assert_eq!(env_parse::<u64>("STOREFRONT_TEST_TIMEOUT_MS"), Some(15000));
        assert_eq!(env_parse::<u64>("STOREFRONT_TEST_UNSET_KEY"), None);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(ServiceConfig::load(Some(Path::new("/nonexistent/storefront.toml"))).is_err());
    }
}
