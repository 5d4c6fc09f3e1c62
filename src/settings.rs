use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// How often the poller re-fetches the page manifest.
    pub poll_interval_secs: u64,
    /// Visible fraction (percent) at which a surface counts as viewed.
    pub viewability_threshold_pct: u8,
    /// Continuous time above the threshold before the activeview ping fires.
    pub active_view_delay_ms: u64,
    pub ping_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            viewability_threshold_pct: 50,
            active_view_delay_ms: 1000,
            ping_timeout_secs: 10,
        }
    }
}

impl Settings {
    pub fn get_path(base_dir: &Path) -> PathBuf {
        base_dir.join("settings.json")
    }

    pub fn load(base_dir: &Path) -> Self {
        let path = Self::get_path(base_dir);
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                    log::warn!("[Settings] Failed to parse settings: {}, returning defaults", e);
                    Self::default()
                }),
                Err(e) => {
                    log::warn!("[Settings] Failed to read file: {}, returning defaults", e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        }
    }

    pub fn save(&self, base_dir: &Path) -> Result<(), String> {
        let path = Self::get_path(base_dir);
        let tmp_path = path.with_extension("tmp");

        fs::create_dir_all(base_dir).map_err(|e| e.to_string())?;

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        // Atomic Write Strategy: Write to tmp, then rename.
        // This ensures we never have a half-written file if the host crashes.
        fs::write(&tmp_path, json).map_err(|e| e.to_string())?;
        fs::rename(tmp_path, path).map_err(|e| e.to_string())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.poll_interval_secs, 300);
        assert_eq!(settings.viewability_threshold_pct, 50);
        assert_eq!(settings.active_view_delay_ms, 1000);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();

        let mut settings = Settings::default();
        settings.poll_interval_secs = 15;
        settings.active_view_delay_ms = 750;
        settings.save(dir.path()).unwrap();

        let loaded = Settings::load(dir.path());
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Settings::load(dir.path()), Settings::default());
    }

    #[test]
    fn test_corrupt_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(Settings::get_path(dir.path()), "{not json").unwrap();
        assert_eq!(Settings::load(dir.path()), Settings::default());
    }
}
