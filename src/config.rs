use crate::error::PlannerError;
use crate::logi;
use crate::schedule::SlotOverflow;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_posting_hours")]
    pub posting_hours: Vec<u32>,
    #[serde(default = "default_niche")]
    pub default_niche: String,
    #[serde(default = "default_recent_episode_limit")]
    pub recent_episode_limit: usize,
    #[serde(default = "default_max_parallel_episodes")]
    pub max_parallel_episodes: usize,
    #[serde(default = "default_max_parallel_api_calls")]
    pub max_parallel_api_calls: usize,
    #[serde(default)]
    pub slot_overflow: SlotOverflow,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// File the config was read from; `None` when running on defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("storage/episodes")
}

fn default_timezone() -> String {
    "Europe/London".to_string()
}

fn default_posting_hours() -> Vec<u32> {
    vec![11, 14, 18, 20, 22]
}

fn default_niche() -> String {
    "courtroom".to_string()
}

fn default_recent_episode_limit() -> usize {
    100
}

fn default_max_parallel_episodes() -> usize {
    3
}

fn default_max_parallel_api_calls() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            timezone: default_timezone(),
            posting_hours: default_posting_hours(),
            default_niche: default_niche(),
            recent_episode_limit: default_recent_episode_limit(),
            max_parallel_episodes: default_max_parallel_episodes(),
            max_parallel_api_calls: default_max_parallel_api_calls(),
            slot_overflow: SlotOverflow::default(),
            log_level: default_log_level(),
            source: None,
        }
    }
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;

        config.validate()?;
        config.source = Some(path.as_ref().to_path_buf());
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    /// Silent; call [`Config::log_source`] once logging is up.
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if fs::metadata(&path).await.is_err() {
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        }
        Self::load(path).await
    }

    pub fn log_source(&self) {
        match &self.source {
            Some(path) => logi(format!("Loaded config from {}", path.display())),
            None => logi("No config file found; using defaults"),
        }
    }

    pub fn validate(&self) -> Result<(), PlannerError> {
        if self.posting_hours.is_empty() {
            return Err(PlannerError::EmptyPostingHours);
        }
        if let Some(bad) = self.posting_hours.iter().find(|h| **h > 23) {
            return Err(PlannerError::InvalidPostingHour(*bad));
        }
        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(PlannerError::UnknownTimezone(self.timezone.clone()));
        }
        if self.recent_episode_limit == 0 {
            return Err(PlannerError::InvalidConfig(
                "recent_episode_limit must be at least 1".to_string(),
            ));
        }
        if self.max_parallel_episodes == 0 || self.max_parallel_api_calls == 0 {
            return Err(PlannerError::InvalidConfig(
                "parallelism caps must be at least 1".to_string(),
            ));
        }
        if self.default_niche.trim().is_empty() {
            return Err(PlannerError::InvalidConfig(
                "default_niche missing".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"timezone": "America/New_York", "posting_hours": [9, 17]}"#)
            .await
            .unwrap();

        let cfg = Config::load(&path).await.unwrap();
        assert_eq!(cfg.timezone, "America/New_York");
        assert_eq!(cfg.posting_hours, vec![9, 17]);
        assert_eq!(cfg.recent_episode_limit, 100);
        assert_eq!(cfg.default_niche, "courtroom");
        assert_eq!(cfg.slot_overflow, SlotOverflow::SameDay);
        assert_eq!(cfg.source.as_deref(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn unknown_timezone_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"timezone": "Mars/Olympus_Mons"}"#)
            .await
            .unwrap();

        let err = Config::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus_Mons"));
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load_or_default(dir.path().join("nope.json"))
            .await
            .unwrap();
        assert_eq!(cfg.posting_hours, vec![11, 14, 18, 20, 22]);
        assert_eq!(cfg.source, None);
        assert!(Config::load(dir.path().join("nope.json")).await.is_err());
    }

    #[test]
    fn out_of_range_hour_fails_validation() {
        let cfg = Config {
            posting_hours: vec![11, 24],
            ..Config::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(PlannerError::InvalidPostingHour(24))
        ));
    }

    #[test]
    fn zero_parallelism_fails_validation() {
        let cfg = Config {
            max_parallel_api_calls: 0,
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(PlannerError::InvalidConfig(_))));
    }
}
