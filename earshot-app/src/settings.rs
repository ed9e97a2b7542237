//! Persistent host settings (JSON file in the user data directory).

use std::fs;
use std::path::{Path, PathBuf};

use earshot_core::{KeyPhraseSet, RecognizerConfig};
use serde::{Deserialize, Serialize};

const MAX_KEY_PHRASES: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub recognizer: RecognizerConfig,
    /// Empty means unconstrained decoding.
    pub key_phrases: Vec<String>,
    /// Consumer tick period in milliseconds.
    pub tick_ms: u64,
    pub preferred_input_device: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            recognizer: RecognizerConfig::default(),
            key_phrases: Vec::new(),
            tick_ms: 50,
            preferred_input_device: None,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.recognizer.normalize();
        self.key_phrases = normalize_key_phrases(&self.key_phrases);
        self.tick_ms = self.tick_ms.clamp(10, 1_000);
        self.preferred_input_device = self
            .preferred_input_device
            .take()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
    }

    pub fn key_phrase_set(&self) -> KeyPhraseSet {
        KeyPhraseSet::new(self.key_phrases.iter().cloned())
    }
}

fn normalize_key_phrases(raw: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for phrase in raw {
        let normalized = phrase.trim();
        if normalized.is_empty() {
            continue;
        }
        if out.iter().any(|p: &String| p.eq_ignore_ascii_case(normalized)) {
            continue;
        }
        out.push(normalized.to_string());
        if out.len() >= MAX_KEY_PHRASES {
            break;
        }
    }
    out
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Earshot")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".config")
            })
            .join("earshot")
            .join("settings.json")
    }
}

/// Missing or unreadable files fall back to defaults.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
