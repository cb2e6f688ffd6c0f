use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "filedrop.toml";
/// Global share keys live at most one day.
pub const MAX_SHARE_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Public base URL for external access (e.g., "https://files.example.com").
    /// Used for generating blob upload and download URLs.
    pub public_base_url: Option<String>,
    /// Issuer prefix for identity token identifiers (`<issuer>|<subject>`).
    pub issuer: String,
    /// Lifetime of a global share key, in seconds.
    pub share_ttl_secs: i64,
    /// Interval between purge sweeps, in seconds.
    pub sweep_interval_secs: u64,
}

/// Optional overrides read from `filedrop.toml` in the data directory.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_base_url: Option<String>,
    pub issuer: Option<String>,
    pub share_ttl_secs: Option<i64>,
    pub sweep_interval_secs: Option<u64>,
}

impl FileConfig {
    /// Loads the config file from `data_dir`, returning defaults if it does not exist.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("filedrop.db")
    }

    #[must_use]
    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }

    /// Base URL used when building blob URLs.
    #[must_use]
    pub fn base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }

    /// Fills every field the file sets and the command line left at its default.
    pub fn merge_file(&mut self, file: FileConfig) -> Result<()> {
        let defaults = Self::default();

        if let Some(host) = file.host {
            if self.host == defaults.host {
                self.host = host;
            }
        }
        if let Some(port) = file.port {
            if self.port == defaults.port {
                self.port = port;
            }
        }
        if self.public_base_url.is_none() {
            self.public_base_url = file.public_base_url;
        }
        if let Some(issuer) = file.issuer {
            if self.issuer == defaults.issuer {
                self.issuer = issuer;
            }
        }
        if let Some(ttl) = file.share_ttl_secs {
            if self.share_ttl_secs == defaults.share_ttl_secs {
                self.share_ttl_secs = ttl;
            }
        }
        if let Some(interval) = file.sweep_interval_secs {
            if self.sweep_interval_secs == defaults.sweep_interval_secs {
                self.sweep_interval_secs = interval;
            }
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SHARE_TTL_SECS).contains(&self.share_ttl_secs) {
            return Err(Error::Config(format!(
                "share_ttl_secs must be between 1 and {MAX_SHARE_TTL_SECS}"
            )));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::Config("sweep_interval_secs must be positive".into()));
        }
        if self.issuer.is_empty() || self.issuer.contains('|') {
            return Err(Error::Config("issuer must be non-empty and contain no '|'".into()));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            public_base_url: None,
            issuer: "filedrop".to_string(),
            share_ttl_secs: 600,
            sweep_interval_secs: 60 * 60,
        }
    }
}
