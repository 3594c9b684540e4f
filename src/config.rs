use std::{fs, path::Path, time::Duration};

use reqwest::Url;
use serde::Deserialize;

use crate::{
    consts::{
        assets_default, cache_name_default, log_folder_default, log_level_default,
        timeout_default,
    },
    error::{Error, Result},
    worker::{Retention, WorkerConfig},
};

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SettingWorker {
    /// Cache owned by this worker version
    #[serde(default = "cache_name_default")]
    pub cache_name: String,
    /// Upstream every request is fetched from
    pub origin: String,
    /// Paths stored on install, relative to `origin`
    #[serde(default = "assets_default")]
    pub assets: Vec<String>,
    /// Network fetch timeout in seconds, none waits forever
    pub fetch_timeout: Option<u64>,
    #[serde(default)]
    pub retention: Retention,
}

impl SettingWorker {
    pub fn scope(&self) -> Result<Url> {
        Url::parse(&self.origin).map_err(|err| Error::InvalidUrl {
            url: self.origin.clone(),
            reason: err.to_string(),
        })
    }

    pub fn worker_config(&self) -> Result<WorkerConfig> {
        let config = WorkerConfig::new(self.cache_name.clone(), self.scope()?)
            .with_assets(self.assets.clone())
            .with_retention(self.retention.clone());
        Ok(config)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout.map(Duration::from_secs)
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SettingHost {
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub ssl: bool,
    /// Certificate file path
    pub certificate: Option<String>,
    /// Certificate key file path
    pub certificate_key: Option<String>,
    /// Timeout of a whole request in seconds
    #[serde(default = "timeout_default")]
    pub timeout: u16,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "log_level_default")]
    pub log_level: String,
    #[serde(default = "log_folder_default")]
    pub log_folder: String,
    pub worker: SettingWorker,
    pub host: Vec<SettingHost>,
}

impl Settings {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let file = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&file)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.worker.cache_name.is_empty() {
            return Err(Error::EmptyCacheName);
        }
        let scope = self.worker.scope()?;
        if !matches!(scope.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "origin {} must be http or https",
                self.worker.origin
            )));
        }
        if self.host.is_empty() {
            return Err(Error::Config("at least one host is required".to_string()));
        }
        for host in &self.host {
            if host.ssl && (host.certificate.is_none() || host.certificate_key.is_none()) {
                return Err(Error::Config(format!(
                    "host {}:{} enables ssl without certificate and key",
                    host.ip, host.port
                )));
            }
        }
        Ok(())
    }
}
