use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::hold::HoldConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PracticeSettings {
    pub tick_interval_ms: u64,
    pub keypoint_score_threshold: f32,
    pub max_low_confidence: usize,
    pub match_threshold: f32,
    pub hold_target_ms: u64,
    pub warning_after_ms: u64,
    pub breath_phase_ms: u64,
    pub accuracy_buffer_capacity: usize,
    pub inference_timeout_ms: u64,
    pub audio_enabled: bool,
    pub cue_volume: f32,
    pub user_id: String,
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            keypoint_score_threshold: 0.4,
            max_low_confidence: 4,
            match_threshold: 0.97,
            hold_target_ms: 30_000,
            warning_after_ms: 3_000,
            breath_phase_ms: 4_000,
            accuracy_buffer_capacity: 100,
            inference_timeout_ms: 1_000,
            audio_enabled: true,
            cue_volume: 0.6,
            user_id: "local".into(),
        }
    }
}

impl PracticeSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms.max(1))
    }

    pub fn hold_config(&self) -> HoldConfig {
        HoldConfig {
            tick_interval: self.tick_interval(),
            hold_target: Duration::from_millis(self.hold_target_ms),
            warning_after: Duration::from_millis(self.warning_after_ms),
            breath_phase: Duration::from_millis(self.breath_phase_ms),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<PracticeSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring malformed settings at {}: {err}", path.display());
                PracticeSettings::default()
            })
        } else {
            PracticeSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn practice(&self) -> PracticeSettings {
        self.read().clone()
    }

    pub fn update_practice(&self, settings: PracticeSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    fn read(&self) -> RwLockReadGuard<'_, PracticeSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PracticeSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &PracticeSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "posehold-settings-{}-{}.json",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let store = SettingsStore::new(temp_path("missing")).unwrap();
        assert_eq!(store.practice(), PracticeSettings::default());
    }

    #[test]
    fn test_update_persists_and_reloads() {
        let path = temp_path("roundtrip");
        let store = SettingsStore::new(path.clone()).unwrap();
        let mut settings = store.practice();
        settings.user_id = "ana@example.com".into();
        settings.hold_target_ms = 45_000;
        store.update_practice(settings.clone()).unwrap();

        let reloaded = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(reloaded.practice(), settings);
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_path("partial");
        fs::write(&path, r#"{ "match_threshold": 0.9 }"#).unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        let settings = store.practice();
        assert_eq!(settings.match_threshold, 0.9);
        assert_eq!(settings.tick_interval_ms, 100);
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_hold_config_conversion() {
        let config = PracticeSettings::default().hold_config();
        assert_eq!(config, HoldConfig::default());
    }
}
