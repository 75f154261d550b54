// Application configuration: defaults, TOML, .env and PHIAL_* variables

use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Settings for a [`Phial`](crate::Phial) application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Largest accepted request body in bytes. `None` means unbounded.
    pub max_body_size: Option<usize>,
    /// Turn view panics into server errors instead of unwinding into the host.
    pub catch_panics: bool,
    /// Log one `METHOD path -> status` line per request at info level.
    pub access_log: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_body_size: None,
            catch_panics: true,
            access_log: false,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        toml::from_str(content).map_err(|e| Error::Config(format!("invalid TOML: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::default().merge_env()
    }

    /// Overlay `PHIAL_*` environment variables onto `self`.
    pub fn merge_env(self) -> Result<Self, Error> {
        self.merge_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`, keyed by environment variable name.
    pub fn merge_lookup<F>(mut self, lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("PHIAL_MAX_BODY_SIZE") {
            let raw = raw.trim();
            self.max_body_size = if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(raw.parse().map_err(|_| {
                    Error::Config(format!("PHIAL_MAX_BODY_SIZE is not a byte count: {}", raw))
                })?)
            };
        }
        if let Some(raw) = lookup("PHIAL_CATCH_PANICS") {
            self.catch_panics = parse_bool("PHIAL_CATCH_PANICS", &raw)?;
        }
        if let Some(raw) = lookup("PHIAL_ACCESS_LOG") {
            self.access_log = parse_bool("PHIAL_ACCESS_LOG", &raw)?;
        }
        Ok(self)
    }

    /// Full layering: defaults, then the TOML file at `path` if given, then
    /// `./.env` if one exists, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        Self::load_layers(path, Path::new(".env"), |key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with an explicit `.env` location and variable
    /// lookup. Values from `lookup` win over the `.env` file.
    pub fn load_layers<F>(path: Option<&Path>, env_file: &Path, lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let invalid_env =
            |e: dotenvy::Error| Error::Config(format!("invalid {}: {}", env_file.display(), e));
        let dotenv: HashMap<String, String> = match dotenvy::from_path_iter(env_file) {
            Ok(entries) => entries.collect::<Result<_, _>>().map_err(invalid_env)?,
            // Missing .env is fine
            Err(e) if e.not_found() => HashMap::new(),
            Err(e) => return Err(invalid_env(e)),
        };
        if !dotenv.is_empty() {
            phial_log::debug!(target: "phial::config", "Loaded {}", env_file.display());
        }

        let config = base.merge_lookup(|key| lookup(key).or_else(|| dotenv.get(key).cloned()))?;
        phial_log::debug!(target: "phial::config", "Configuration: {:?}", config);
        Ok(config)
    }

    pub fn with_max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = Some(limit);
        self
    }

    pub fn with_catch_panics(mut self, catch: bool) -> Self {
        self.catch_panics = catch;
        self
    }

    pub fn with_access_log(mut self, enabled: bool) -> Self {
        self.access_log = enabled;
        self
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("{} is not a boolean: {}", key, other))),
    }
}
