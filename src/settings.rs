use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowSize {
    pub width: f64,
    pub height: f64,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 660.0,
        }
    }
}

/// Knobs for the detached inspector. Loaded once; the inspector never writes it back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InspectorSettings {
    /// Origin the primary view runs on. Messages from any other origin are ignored.
    pub app_origin: String,
    /// Base URL for `PUT {apiBaseUrl}/records/{id}`.
    pub api_base_url: String,
    pub notes_debounce_ms: u64,
    /// Delay between a terminal action's invocation and the surface closing.
    pub terminal_close_delay_ms: u64,
    pub clock_refresh_ms: u64,
    pub request_timeout_ms: u64,
    /// IANA zone used when a postal code cannot be resolved. Product decision: Eastern.
    pub fallback_zone: String,
    pub window: WindowSize,
}

impl Default for InspectorSettings {
    fn default() -> Self {
        Self {
            app_origin: "http://localhost:5173".into(),
            api_base_url: "http://localhost:3005/api".into(),
            notes_debounce_ms: 800,
            terminal_close_delay_ms: 50,
            clock_refresh_ms: 1000,
            request_timeout_ms: 10_000,
            fallback_zone: "America/New_York".into(),
            window: WindowSize::default(),
        }
    }
}

impl InspectorSettings {
    pub fn notes_debounce(&self) -> Duration {
        Duration::from_millis(self.notes_debounce_ms)
    }

    pub fn terminal_close_delay(&self) -> Duration {
        Duration::from_millis(self.terminal_close_delay_ms)
    }

    pub fn clock_refresh(&self) -> Duration {
        Duration::from_millis(self.clock_refresh_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("LEAD_INSPECTOR_API_BASE_URL") {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(origin) = std::env::var("LEAD_INSPECTOR_ORIGIN") {
            if !origin.trim().is_empty() {
                self.app_origin = origin.trim().to_string();
            }
        }
        let debug_mode = std::env::var("LEAD_INSPECTOR_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.notes_debounce_ms = 200;
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<InspectorSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = load_from(&path)?;
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn current(&self) -> InspectorSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn reload(&self) -> Result<()> {
        let fresh = load_from(&self.path)?;
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = fresh;
        Ok(())
    }
}

fn load_from(path: &PathBuf) -> Result<InspectorSettings> {
    let mut settings = if path.exists() {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read inspector settings from {}", path.display()))?;
        serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!(
                "Ignoring malformed inspector settings at {}: {}",
                path.display(),
                err
            );
            InspectorSettings::default()
        })
    } else {
        InspectorSettings::default()
    };
    settings.apply_env_overrides();
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("inspector.json")).unwrap();
        let settings = store.current();
        assert_eq!(settings.notes_debounce_ms, InspectorSettings::default().notes_debounce_ms);
        assert_eq!(settings.terminal_close_delay_ms, 50);
        assert_eq!(settings.fallback_zone, "America/New_York");
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inspector.json");
        fs::write(&path, r#"{"clockRefreshMs": 500, "window": {"width": 900, "height": 500}}"#)
            .unwrap();

        let store = SettingsStore::new(path).unwrap();
        let settings = store.current();
        assert_eq!(settings.clock_refresh_ms, 500);
        assert_eq!(settings.window.width, 900.0);
        assert_eq!(settings.request_timeout_ms, 10_000);
    }

    #[test]
    fn malformed_file_falls_back_and_reload_picks_up_fix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inspector.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.current().clock_refresh_ms, 1000);

        fs::write(&path, r#"{"clockRefreshMs": 250}"#).unwrap();
        store.reload().unwrap();
        assert_eq!(store.current().clock_refresh_ms, 250);
    }

    #[test]
    fn clock_refresh_never_zero() {
        let settings = InspectorSettings {
            clock_refresh_ms: 0,
            ..InspectorSettings::default()
        };
        assert_eq!(settings.clock_refresh(), Duration::from_millis(1));
    }
}
