//! Run configuration and optional persistent defaults (`~/.config/dirpush/config.toml`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_BATCH_SIZE: usize = 200;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LABEL: &str = "source=dirpush";
pub const DEFAULT_ERROR_LOG: &str = "errors.log";

/// Invalid run configuration. Raised before enumeration starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid endpoint URL {url:?}: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported endpoint scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
    #[error("timeout must be at least 1 second")]
    ZeroTimeout,
}

/// Defaults read from `config.toml`. Every field is optional; flags win over file values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDefaults {
    /// Maximum number of uploads in flight at once.
    #[serde(default)]
    pub concurrency: Option<usize>,
    /// Number of files enumerated per batch.
    #[serde(default)]
    pub batch_size: Option<usize>,
    /// Value sent as the `labels` query parameter.
    #[serde(default)]
    pub label: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Path of the failed-upload log.
    #[serde(default)]
    pub error_log: Option<PathBuf>,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dirpush")?;
    Ok(xdg_dirs.get_config_home().join("config.toml"))
}

/// Load defaults from the XDG config file if it exists. Never creates the file.
pub fn load_defaults() -> Result<UploadDefaults> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(UploadDefaults::default());
    }
    load_defaults_from(&path)
}

/// Load defaults from an explicit file.
pub fn load_defaults_from(path: &Path) -> Result<UploadDefaults> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let defaults: UploadDefaults =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    tracing::debug!("loaded defaults from {}", path.display());
    Ok(defaults)
}

/// Everything one run needs. Built once, validated, then owned by the coordinator.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub endpoint: Url,
    pub source_dir: PathBuf,
    pub concurrency: usize,
    pub batch_size: usize,
    pub label: String,
    pub error_log: PathBuf,
    pub timeout: Duration,
}

impl RunConfig {
    /// Config with built-in defaults for everything except endpoint and source directory.
    pub fn new(endpoint: &str, source_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint).map_err(|source| ConfigError::InvalidEndpoint {
            url: endpoint.to_string(),
            source,
        })?;
        Ok(Self {
            endpoint,
            source_dir: source_dir.into(),
            concurrency: DEFAULT_CONCURRENCY,
            batch_size: DEFAULT_BATCH_SIZE,
            label: DEFAULT_LABEL.to_string(),
            error_log: PathBuf::from(DEFAULT_ERROR_LOG),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Overlay values from a defaults file.
    pub fn with_defaults(mut self, defaults: &UploadDefaults) -> Self {
        if let Some(n) = defaults.concurrency {
            self.concurrency = n;
        }
        if let Some(n) = defaults.batch_size {
            self.batch_size = n;
        }
        if let Some(label) = &defaults.label {
            self.label = label.clone();
        }
        if let Some(secs) = defaults.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(path) = &defaults.error_log {
            self.error_log = path.clone();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.endpoint.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Endpoint with `labels=<label>` appended to any existing query.
    pub fn upload_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("labels", &self.label);
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_builtin_defaults() {
        let cfg = RunConfig::new("http://localhost:8080/api/v2/sbom", "/data").unwrap();
        assert_eq!(cfg.concurrency, 4);
        assert_eq!(cfg.batch_size, 200);
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.error_log, PathBuf::from("errors.log"));
        assert_eq!(cfg.label, DEFAULT_LABEL);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn upload_url_appends_encoded_label() {
        let mut cfg = RunConfig::new("http://localhost:8080/api/v2/sbom", "/data").unwrap();
        cfg.label = "source=nightly import".to_string();
        assert_eq!(
            cfg.upload_url().as_str(),
            "http://localhost:8080/api/v2/sbom?labels=source%3Dnightly+import"
        );
    }

    #[test]
    fn upload_url_keeps_existing_query() {
        let mut cfg = RunConfig::new("http://h/api?x=1", "/data").unwrap();
        cfg.label = "a".to_string();
        assert_eq!(cfg.upload_url().as_str(), "http://h/api?x=1&labels=a");
    }

    #[test]
    fn invalid_endpoint_rejected() {
        let err = RunConfig::new("not a url", "/data").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
    }

    #[test]
    fn validate_rejects_zero_limits_and_bad_scheme() {
        let mut cfg = RunConfig::new("http://h/", "/data").unwrap();
        cfg.concurrency = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroConcurrency)));
        cfg.concurrency = 1;
        cfg.batch_size = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroBatchSize)));
        cfg.batch_size = 1;
        cfg.timeout = Duration::ZERO;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroTimeout)));

        let ftp = RunConfig::new("ftp://h/", "/data").unwrap();
        assert!(matches!(ftp.validate(), Err(ConfigError::UnsupportedScheme(_))));
    }

    #[test]
    fn defaults_toml_partial() {
        let toml = r#"
            concurrency = 16
            label = "source=mirror"
        "#;
        let defaults: UploadDefaults = toml::from_str(toml).unwrap();
        assert_eq!(defaults.concurrency, Some(16));
        assert!(defaults.batch_size.is_none());
        let cfg = RunConfig::new("http://h/", "/data")
            .unwrap()
            .with_defaults(&defaults);
        assert_eq!(cfg.concurrency, 16);
        assert_eq!(cfg.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(cfg.label, "source=mirror");
    }

    #[test]
    fn defaults_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "batch_size = 50\ntimeout_secs = 120\nerror_log = \"/var/tmp/failed.log\"\n",
        )
        .unwrap();
        let defaults = load_defaults_from(&path).unwrap();
        assert_eq!(defaults.batch_size, Some(50));
        assert_eq!(defaults.timeout_secs, Some(120));
        assert_eq!(defaults.error_log, Some(PathBuf::from("/var/tmp/failed.log")));
    }

    #[test]
    fn defaults_from_malformed_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "concurrency = \"many\"").unwrap();
        assert!(load_defaults_from(&path).is_err());
    }
}
