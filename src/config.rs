use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::RecallError;

pub const CONFIG_FILE_NAME: &str = "recall-monitor.json";

/// Upper bound the FDA enforcement endpoint accepts for `limit`.
pub const FDA_MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegradePolicy {
    /// Failed sources contribute no records.
    #[default]
    Empty,
    /// Failed sources contribute the built-in sample records.
    Static,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fda_base_url: String,
    pub cpsc_base_url: String,
    pub cpsc_recall_date_start: String,
    pub fda_page_size: usize,
    pub fda_timeout_secs: u64,
    pub cpsc_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub user_agent: String,
    pub degrade: DegradePolicy,
    pub max_list_limit: usize,
    pub default_search_limit: usize,
    pub max_search_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fda_base_url: "https://api.fda.gov/food/enforcement.json".to_string(),
            cpsc_base_url: "https://www.saferproducts.gov/RestWebServices/RecallDelimited"
                .to_string(),
            cpsc_recall_date_start: "2024-01-01".to_string(),
            fda_page_size: FDA_MAX_PAGE_SIZE,
            fda_timeout_secs: 30,
            cpsc_timeout_secs: 45,
            probe_timeout_secs: 10,
            user_agent: format!("recall-monitor/{}", env!("CARGO_PKG_VERSION")),
            degrade: DegradePolicy::Empty,
            max_list_limit: 10_000,
            default_search_limit: 20,
            max_search_limit: 100,
        }
    }
}

impl Settings {
    pub fn fda_timeout(&self) -> Duration {
        Duration::from_secs(self.fda_timeout_secs.max(1))
    }

    pub fn cpsc_timeout(&self) -> Duration {
        Duration::from_secs(self.cpsc_timeout_secs.max(1))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }

    pub fn fda_page_size(&self) -> usize {
        self.fda_page_size.clamp(1, FDA_MAX_PAGE_SIZE)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolves settings from an explicit path, then `./recall-monitor.json`,
    /// then the per-user config directory, falling back to defaults.
    pub fn resolve(path: Option<&str>) -> Result<Settings, RecallError> {
        if let Some(path) = path {
            return Self::load(Utf8Path::new(path));
        }

        let local = Utf8PathBuf::from(CONFIG_FILE_NAME);
        if local.as_std_path().exists() {
            return Self::load(&local);
        }

        if let Some(user) = Self::user_config_path()
            && user.as_std_path().exists()
        {
            return Self::load(&user);
        }

        tracing::debug!("no config file found, using defaults");
        Ok(Settings::default())
    }

    pub fn load(path: &Utf8Path) -> Result<Settings, RecallError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| RecallError::ConfigRead(path.to_path_buf()))?;
        let settings = Self::parse(&content)?;
        tracing::debug!(path = %path, "loaded config");
        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Settings, RecallError> {
        serde_json::from_str(content).map_err(|err| RecallError::ConfigParse(err.to_string()))
    }

    pub fn user_config_path() -> Option<Utf8PathBuf> {
        ProjectDirs::from("", "", "recall-monitor").and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.config_dir().join("config.json")).ok()
        })
    }
}
