//! Configuration for the poster studio.
//!
//! Layered by figment: defaults, then an optional YAML file, then the
//! environment. Absent backend values are not an error; they select the
//! unavailable backend and every store runs on its fallback path.

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use poster_studio_sdk::Secret;
use serde::{Deserialize, Deserializer};
use url::Url;

/// Environment prefix for every configuration key.
pub const ENV_PREFIX: &str = "POSTER_STUDIO_";

/// How design writes relate local state to the remote outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Local state changes whatever the backend answers.
    #[default]
    Optimistic,
    /// Local state changes only after the backend confirms the write.
    Confirmed,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudioConfig {
    pub backend: BackendConfig,
    pub write_mode: WriteMode,
}

/// Connection settings for the remote data/auth service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Project endpoint, e.g. `https://xyz.supabase.co`.
    pub url: Option<Url>,

    /// Public (anon) API key.
    #[serde(deserialize_with = "deserialize_secret")]
    pub anon_key: Option<Secret>,

    /// Per-request timeout.
    #[serde(deserialize_with = "deserialize_duration")]
    pub request_timeout: Duration,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            request_timeout: default_request_timeout(),
        }
    }
}

impl BackendConfig {
    /// Both external values are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.anon_key.as_ref().is_some_and(|k| !k.is_empty())
    }
}

impl StudioConfig {
    /// Loads defaults, then `path` (YAML) if given, then `POSTER_STUDIO_*`
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or a variable holds a malformed value.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).map(|key| env_key(key.as_str()).into()))
    }
}

/// Maps a prefix-stripped variable name to its config path.
///
/// `BACKEND__URL` and the flat `BACKEND_URL` both land on `backend.url`.
fn env_key(raw: &str) -> String {
    let key = raw.to_ascii_lowercase().replace("__", ".");
    match key.as_str() {
        "backend_url" => "backend.url".to_owned(),
        "backend_anon_key" => "backend.anon_key".to_owned(),
        "backend_request_timeout" => "backend.request_timeout".to_owned(),
        _ => key,
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<Secret>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(Secret::non_blank))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    humantime::parse_duration(&value).map_err(serde::de::Error::custom)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
