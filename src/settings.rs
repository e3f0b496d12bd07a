use config::{Config, Environment};
use serde::Deserialize;
use tracing::warn;

use crate::server::{DEFAULT_BIND, DEFAULT_MAX_UPLOAD_MB};

const ENV_PREFIX: &str = "SPLITTER";

/// Server settings from `SPLITTER_*` environment variables. Command-line flags
/// take precedence over these.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    pub max_upload_mb: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

impl ServerSettings {
    pub fn from_env() -> Self {
        Self::from_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn from_source(source: Environment) -> Self {
        Config::builder()
            .add_source(source)
            .build()
            .and_then(|c| c.try_deserialize())
            .unwrap_or_else(|e| {
                warn!("Ignoring invalid {}_* settings: {}", ENV_PREFIX, e);
                Self::default()
            })
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .source(Some(map))
    }

    #[test]
    fn defaults_without_env() {
        assert_eq!(ServerSettings::from_source(env(&[])), ServerSettings::default());
    }

    #[test]
    fn reads_prefixed_vars() {
        let s = ServerSettings::from_source(env(&[
            ("SPLITTER_BIND", "0.0.0.0:9000"),
            ("SPLITTER_MAX_UPLOAD_MB", "8"),
        ]));
        assert_eq!(s.bind, "0.0.0.0:9000");
        assert_eq!(s.max_upload_mb, 8);
        assert_eq!(s.max_upload_bytes(), 8 * 1024 * 1024);
    }

    #[test]
    fn invalid_value_falls_back() {
        let s = ServerSettings::from_source(env(&[("SPLITTER_MAX_UPLOAD_MB", "lots")]));
        assert_eq!(s, ServerSettings::default());
    }
}
