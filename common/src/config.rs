//! Configuration loading.
//!
//! Parsing the config file format itself is not the interesting part of
//! this pipeline, but every binary still needs a concrete path from "file on
//! disk" to a typed [`Config`]. Layered with `figment` so operators can
//! override any key with a `SERIES_ROUTER_`-prefixed environment variable,
//! the way `Lowband21-ferrex` layers env over file config.

use std::path::Path;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load config from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: figment::Error,
    },
}

/// Every key named in spec.md §6. `retry_max`, `retry_delay`, and
/// `max_concurrent_dispatches` are dispatcher-only; router and cleaner
/// ignore them.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub incoming_folder: String,
    pub outgoing_folder: String,
    pub success_folder: String,
    pub discard_folder: String,
    pub error_folder: String,

    pub series_complete_trigger: u64,
    pub router_scan_interval: u64,
    pub cleaner_scan_interval: u64,

    pub retention: u64,
    pub offpeak_start: String,
    pub offpeak_end: String,

    #[serde(default)]
    pub bookkeeper: Option<String>,
    #[serde(default)]
    pub graphite_ip: Option<String>,
    #[serde(default)]
    pub graphite_port: Option<u16>,

    #[serde(default = "default_retry_max")]
    pub retry_max: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: f64,
    #[serde(default = "default_max_concurrent_dispatches")]
    pub max_concurrent_dispatches: usize,
    #[serde(default = "default_dispatcher_scan_interval")]
    pub dispatcher_scan_interval: u64,
}

fn default_retry_max() -> u32 {
    3
}

fn default_retry_delay() -> f64 {
    300.0
}

fn default_max_concurrent_dispatches() -> usize {
    1
}

fn default_dispatcher_scan_interval() -> u64 {
    10
}

impl Config {
    /// Loads `path` as TOML, then overlays any `SERIES_ROUTER_<KEY>`
    /// environment variable. A missing or unparsable file is fatal - callers
    /// at process startup should exit non-zero on this error (spec.md §6).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("SERIES_ROUTER_"))
            .extract()
            .map_err(|source| ConfigError::Load {
                path: path.display().to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal_toml() -> &'static str {
        r#"
incoming_folder = "/data/incoming"
outgoing_folder = "/data/outgoing"
success_folder = "/data/success"
discard_folder = "/data/discard"
error_folder = "/data/error"
series_complete_trigger = 30
router_scan_interval = 10
cleaner_scan_interval = 3600
retention = 604800
offpeak_start = "22:00"
offpeak_end = "06:00"
"#
    }

    #[test]
    fn loads_minimal_config_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(minimal_toml().as_bytes()).unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.incoming_folder, "/data/incoming");
        assert_eq!(cfg.retry_max, 3);
        assert_eq!(cfg.retry_delay, 300.0);
        assert_eq!(cfg.max_concurrent_dispatches, 1);
        assert_eq!(cfg.dispatcher_scan_interval, 10);
        assert!(cfg.bookkeeper.is_none());
    }

    #[test]
    fn overrides_apply_dispatcher_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut contents = minimal_toml().to_string();
        contents.push_str("retry_max = 5\nretry_delay = 60.0\n");
        file.write_all(contents.as_bytes()).unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.retry_max, 5);
        assert_eq!(cfg.retry_delay, 60.0);
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = Path::new("/nonexistent/series-router.toml");
        assert!(Config::load(path).is_err());
    }
}
