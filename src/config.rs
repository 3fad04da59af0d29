use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::locale::Locale;
use crate::session::DEFAULT_NOTICE_SECONDS;

pub const CONFIG_VERSION: u64 = 1;

/// Which remote document store a session talks to.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store; nothing survives a restart.
    #[default]
    Memory,
    Http {
        base_url: String,
    },
}

fn default_notice_seconds() -> i64 {
    DEFAULT_NOTICE_SECONDS
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClarioConfig {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub store: StoreBackend,
    /// Locale before the user document says otherwise.
    #[serde(default)]
    pub locale: Locale,
    #[serde(default = "fallback_locale")]
    pub fallback_locale: Locale,
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default = "default_notice_seconds")]
    pub notice_seconds: i64,
}

fn fallback_locale() -> Locale {
    Locale::FALLBACK
}

impl Default for ClarioConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            store: StoreBackend::default(),
            locale: Locale::default(),
            fallback_locale: fallback_locale(),
            debug_logging: false,
            notice_seconds: default_notice_seconds(),
        }
    }
}

impl ClarioConfig {
    /// `~/.config/clario/config.json` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("clario")
            .join("config.json")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    /// Read the file at `path`. A missing or unreadable file gives defaults.
    pub fn load_from(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                log::warn!("Could not read {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str::<Self>(&text) {
            Ok(config) => {
                if config.version != CONFIG_VERSION {
                    log::info!(
                        "Config {} is version {}, expected {}",
                        path.display(),
                        config.version,
                        CONFIG_VERSION
                    );
                }
                config
            }
            Err(e) => {
                log::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("clario-config-{}-{}", std::process::id(), uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn parses_http_backend() {
        let config: ClarioConfig = serde_json::from_str(
            r#"{
                "version": 1,
                "store": { "kind": "http", "base_url": "https://docs.example.com" },
                "locale": "de",
                "debugLogging": true
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.store,
            StoreBackend::Http {
                base_url: "https://docs.example.com".into()
            }
        );
        assert_eq!(config.locale, Locale::De);
        assert_eq!(config.fallback_locale, Locale::Tr);
        assert_eq!(config.notice_seconds, 5);
        assert!(config.debug_logging);
    }

    #[test]
    fn missing_or_broken_file_gives_defaults() {
        let path = temp_path("config.json");
        assert_eq!(ClarioConfig::load_from(&path), ClarioConfig::default());

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(ClarioConfig::load_from(&path), ClarioConfig::default());
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn save_then_load() {
        let path = temp_path("config.json");
        let config = ClarioConfig {
            locale: Locale::Fr,
            notice_seconds: 8,
            ..ClarioConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(ClarioConfig::load_from(&path), config);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
