//! Store profiles and URL routing.
//!
//! Profiles are data: a domain token plus the ordered selectors (and optional
//! labeled-row scan) for that storefront. Adding a store never touches the
//! extraction code.

mod builtin;

pub use builtin::{
    builtin_profiles, LABEL_CURRENT_PRICE, LABEL_PREVIOUS_PRICE, LABEL_SANITARY_REGISTRATION,
};

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::{Result, ScrapeError};
use crate::extract::selector::compile_all;
use crate::extract::{CompiledRowScan, CompiledSelector, RowScanSpec, SelectorSpec};

/// Selector set for one storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreProfile {
    /// Domain token, e.g. "cruzverde.com.co".
    pub token: String,
    #[serde(default)]
    pub name: String,
    pub selectors: Vec<SelectorSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_scan: Option<RowScanSpec>,
}

impl StoreProfile {
    pub fn compile(self) -> Result<CompiledProfile> {
        if self.token.trim().is_empty() {
            return Err(ScrapeError::malformed("store profile token must not be empty"));
        }
        if self.selectors.is_empty() {
            return Err(ScrapeError::malformed(format!(
                "store profile {} has no selectors",
                self.token
            )));
        }

        let selectors = compile_all(&self.selectors)?;
        let row_scan = self.row_scan.as_ref().map(RowScanSpec::compile).transpose()?;
        Ok(CompiledProfile {
            profile: StoreProfile {
                token: self.token.to_lowercase(),
                ..self
            },
            selectors,
            row_scan,
        })
    }
}

/// A profile with its selectors parsed once at load time.
#[derive(Debug, Clone)]
pub struct CompiledProfile {
    profile: StoreProfile,
    selectors: Vec<CompiledSelector>,
    row_scan: Option<CompiledRowScan>,
}

impl CompiledProfile {
    pub fn profile(&self) -> &StoreProfile {
        &self.profile
    }

    pub fn token(&self) -> &str {
        &self.profile.token
    }

    pub fn selectors(&self) -> &[CompiledSelector] {
        &self.selectors
    }

    pub fn row_scan(&self) -> Option<&CompiledRowScan> {
        self.row_scan.as_ref()
    }
}

/// How a URL is matched against profile tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Host equals the token or ends with ".token".
    #[default]
    Host,
    /// Token appears anywhere in the URL string. A path or query mentioning
    /// another store's domain will misroute.
    Substring,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "host" | "exact" | "suffix" => Ok(Self::Host),
            "substring" | "contains" => Ok(Self::Substring),
            other => Err(format!("unknown match mode '{}' (expected host or substring)", other)),
        }
    }
}

/// TOML file of extra store profiles.
#[derive(Debug, Deserialize)]
struct ProfileFile {
    #[serde(default, rename = "store")]
    stores: Vec<StoreProfile>,
}

/// Maps URLs to store profiles; first registered match wins.
#[derive(Debug, Clone, Default)]
pub struct StoreRouter {
    profiles: Vec<CompiledProfile>,
    mode: MatchMode,
}

impl StoreRouter {
    pub fn new(mode: MatchMode) -> Self {
        Self {
            profiles: Vec::new(),
            mode,
        }
    }

    /// Router preloaded with the built-in storefronts.
    pub fn builtin(mode: MatchMode) -> Result<Self> {
        let mut router = Self::new(mode);
        for profile in builtin_profiles() {
            router.register(profile)?;
        }
        Ok(router)
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn profiles(&self) -> &[CompiledProfile] {
        &self.profiles
    }

    /// Register a profile. A profile with an existing token replaces it in
    /// place, keeping its priority.
    pub fn register(&mut self, profile: StoreProfile) -> Result<()> {
        let compiled = profile.compile()?;
        match self
            .profiles
            .iter_mut()
            .find(|p| p.token() == compiled.token())
        {
            Some(existing) => {
                debug!("Replacing store profile {}", compiled.token());
                *existing = compiled;
            }
            None => self.profiles.push(compiled),
        }
        Ok(())
    }

    /// Load profiles from a TOML string (`[[store]]` tables).
    pub fn extend_from_toml(&mut self, content: &str) -> Result<usize> {
        let file: ProfileFile = toml::from_str(content)
            .map_err(|e| ScrapeError::malformed(format!("invalid profile file: {}", e)))?;
        let count = file.stores.len();
        for profile in file.stores {
            self.register(profile)?;
        }
        Ok(count)
    }

    /// Load profiles from a TOML file.
    pub fn extend_from_file(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScrapeError::malformed(format!("cannot read profile file {:?}: {}", path, e))
        })?;
        let count = self.extend_from_toml(&content)?;
        info!("Loaded {} store profiles from {:?}", count, path);
        Ok(count)
    }

    /// Find the profile for `url`.
    pub fn resolve(&self, url: &str) -> Result<&CompiledProfile> {
        let found = match self.mode {
            MatchMode::Host => {
                let host = Url::parse(url)
                    .ok()
                    .and_then(|u| u.host_str().map(|h| h.to_lowercase()));
                host.and_then(|host| {
                    self.profiles
                        .iter()
                        .find(|p| host_matches(&host, p.token()))
                })
            }
            MatchMode::Substring => {
                let haystack = url.to_lowercase();
                self.profiles.iter().find(|p| haystack.contains(p.token()))
            }
        };

        found.ok_or_else(|| ScrapeError::UnsupportedStore {
            url: url.to_string(),
        })
    }

    /// Selector list of the profile routed for `url`.
    pub fn resolve_store_profile(&self, url: &str) -> Result<&[SelectorSpec]> {
        self.resolve(url).map(|p| p.profile().selectors.as_slice())
    }
}

fn host_matches(host: &str, token: &str) -> bool {
    host == token
        || host
            .strip_suffix(token)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(mode: MatchMode) -> StoreRouter {
        StoreRouter::builtin(mode).unwrap()
    }

    #[test]
    fn test_routes_by_host_regardless_of_path() {
        let r = router(MatchMode::Host);
        let selectors = r
            .resolve_store_profile("https://www.cruzverde.com.co/acetaminofen/123.html?q=farmatodo.com.co#x")
            .unwrap();
        assert_eq!(selectors, builtin_profiles()[0].selectors.as_slice());

        let p = r.resolve("https://farmatodo.com.co/producto/1").unwrap();
        assert_eq!(p.token(), "farmatodo.com.co");
        assert!(p.row_scan().is_none());
    }

    #[test]
    fn test_unknown_store_is_rejected() {
        let r = router(MatchMode::Host);
        let err = r.resolve("https://example.com/p/1").unwrap_err();
        assert!(matches!(err, ScrapeError::UnsupportedStore { .. }));
        assert!(r.resolve("not a url").is_err());
        // Look-alike host must not match by suffix
        assert!(r.resolve("https://evilcruzverde.com.co/").is_err());
    }

    #[test]
    fn test_substring_mode_matches_anywhere() {
        let r = router(MatchMode::Substring);
        let p = r
            .resolve("https://example.com/redirect?to=farmatodo.com.co")
            .unwrap();
        assert_eq!(p.token(), "farmatodo.com.co");

        // First registered token wins when several appear
        let p = r
            .resolve("https://farmatodo.com.co/?ref=cruzverde.com.co")
            .unwrap();
        assert_eq!(p.token(), "cruzverde.com.co");
    }

    #[test]
    fn test_host_mode_ignores_tokens_in_query() {
        let r = router(MatchMode::Host);
        let p = r
            .resolve("https://farmatodo.com.co/?ref=cruzverde.com.co")
            .unwrap();
        assert_eq!(p.token(), "farmatodo.com.co");
        assert!(r.resolve("https://example.com/?to=farmatodo.com.co").is_err());
    }

    #[test]
    fn test_file_profiles_extend_and_replace() {
        let mut r = router(MatchMode::Host);
        let added = r
            .extend_from_toml(
                r#"
                [[store]]
                token = "Locatel.com.co"
                name = "Locatel"
                selectors = [
                    { label = "precio_actual", selector = "span.vtex-price" },
                    { label = "imagen", selector = "img.main", attr = "src" },
                ]

                [[store]]
                token = "farmatodo.com.co"
                selectors = [{ label = "precio_actual", selector = "span.new-price" }]

                [store.row_scan]
                label = "registro_invima"
                row_selector = "tr"
                header_selector = "th"
                value_selector = "td"
                header_match = "invima"
                "#,
            )
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(r.profiles().len(), 4);

        // Replacement keeps priority slot
        assert_eq!(r.profiles()[1].token(), "farmatodo.com.co");
        assert_eq!(r.profiles()[1].selectors().len(), 1);
        assert!(r.profiles()[1].row_scan().is_some());

        let p = r.resolve("https://www.locatel.com.co/p").unwrap();
        assert_eq!(p.profile().name, "Locatel");
        assert_eq!(p.selectors()[1].spec().attribute(), Some("src"));
    }

    #[test]
    fn test_invalid_profiles_rejected() {
        let mut r = StoreRouter::new(MatchMode::Host);
        assert!(r.extend_from_toml("[[store]]\ntoken = \"a.com\"\nselectors = []").is_err());
        assert!(r
            .extend_from_toml("[[store]]\ntoken = \"a.com\"\nselectors = [{ selector = \"div[\" }]")
            .is_err());
        assert!(r.extend_from_toml("not toml [").is_err());
    }

    #[test]
    fn test_extend_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stores.toml");
        std::fs::write(
            &path,
            "[[store]]\ntoken = \"pasteur.com.co\"\nselectors = [{ label = \"precio_actual\", selector = \".price\" }]\n",
        )
        .unwrap();

        let mut r = StoreRouter::new(MatchMode::Host);
        assert_eq!(r.extend_from_file(&path).unwrap(), 1);
        assert!(r.resolve("https://pasteur.com.co/x").is_ok());
        assert!(r.extend_from_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_match_mode_parse() {
        assert_eq!("substring".parse::<MatchMode>().unwrap(), MatchMode::Substring);
        assert_eq!("HOST".parse::<MatchMode>().unwrap(), MatchMode::Host);
        assert!("regex".parse::<MatchMode>().is_err());
    }
}
