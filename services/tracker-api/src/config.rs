use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use fleetcore_core::logging::LogFormat;
use fleetcore_core::{FleetManifest, TrackingConfig};

/// Process settings read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Fleet manifest; the built-in demo fleet when unset
    pub fleet_manifest: Option<PathBuf>,
    /// Tracking tuning; defaults when unset
    pub tracking_config: Option<PathBuf>,
    /// Distance-matrix endpoint; local ETA only when unset
    pub routing_url: Option<String>,
    pub routing_api_key: Option<String>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid PORT: {}", raw))?,
            None => 8080,
        };
        let log_format = match var("LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>().map_err(|e| anyhow!(e))?,
            None => LogFormat::default(),
        };

        Ok(Config {
            port,
            fleet_manifest: var("FLEET_MANIFEST").map(PathBuf::from),
            tracking_config: var("TRACKING_CONFIG").map(PathBuf::from),
            routing_url: var("ROUTING_URL"),
            routing_api_key: var("ROUTING_API_KEY"),
            log_format,
        })
    }

    pub fn load_tracking_config(&self) -> anyhow::Result<TrackingConfig> {
        match &self.tracking_config {
            Some(path) => TrackingConfig::from_file(path)
                .with_context(|| format!("loading tracking config {}", path.display())),
            None => Ok(TrackingConfig::default()),
        }
    }

    pub fn load_manifest(&self) -> anyhow::Result<FleetManifest> {
        match &self.fleet_manifest {
            Some(path) => FleetManifest::from_file(path)
                .with_context(|| format!("loading fleet manifest {}", path.display())),
            None => Ok(FleetManifest::default_manifest()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.fleet_manifest.is_none());
        assert!(config.routing_url.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.load_manifest().unwrap().buses.len(), 3);
        assert_eq!(config.load_tracking_config().unwrap(), TrackingConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PORT", "9000"),
            ("LOG_FORMAT", "json"),
            ("ROUTING_URL", "http://routing.local/matrix"),
            ("ROUTING_API_KEY", ""),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.routing_url.as_deref(), Some("http://routing.local/matrix"));
        assert!(config.routing_api_key.is_none());
    }

    #[test]
    fn test_bad_port() {
        assert!(config(&[("PORT", "eighty")]).is_err());
    }

    #[test]
    fn test_missing_manifest_file() {
        let config = config(&[("FLEET_MANIFEST", "/nonexistent/fleet.toml")]).unwrap();
        assert!(config.load_manifest().is_err());
    }
}
