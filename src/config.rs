use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Server settings.
///
/// Every field has a default, so a YAML file only needs the keys it changes:
///
/// ```yaml
/// listen_addr: "0.0.0.0:9000"
/// chunk_size: 1024
/// read_timeout_ms: 5000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    /// Bytes requested from the transport per read
    pub chunk_size: usize,
    /// Upper bound on the request line plus header block
    pub max_header_bytes: usize,
    /// Deadline for each read; `None` waits forever
    pub read_timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            chunk_size: 512,
            max_header_bytes: 8192,
            read_timeout_ms: None,
        }
    }
}

impl Config {
    /// Loads the file named by `WAYPOINT_CONFIG` (if set), then applies the
    /// `LISTEN` override. A broken file is logged and replaced by defaults.
    pub fn load() -> Self {
        match Self::try_load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to default configuration");
                let mut cfg = Self::default();
                cfg.apply_env();
                cfg
            }
        }
    }

    pub fn try_load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("WAYPOINT_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be at least 1");
        }
        if self.max_header_bytes == 0 {
            anyhow::bail!("max_header_bytes must be at least 1");
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("LISTEN") {
            self.listen_addr = addr;
        }
    }
}
