use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::FolioError;

const SETTINGS_FILENAME: &str = "settings.toml";
const APP_NAME: &str = "folio";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Th,
}

/// How the main window is shown on startup. Persisted as 0, 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum DisplayMode {
    Normal,
    #[default]
    Maximized,
    Fullscreen,
}

impl TryFrom<u8> for DisplayMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Maximized),
            2 => Ok(Self::Fullscreen),
            other => Err(format!("display_mode must be 0, 1 or 2, got {other}")),
        }
    }
}

impl From<DisplayMode> for u8 {
    fn from(mode: DisplayMode) -> Self {
        match mode {
            DisplayMode::Normal => 0,
            DisplayMode::Maximized => 1,
            DisplayMode::Fullscreen => 2,
        }
    }
}

/// How the first page of a freshly opened PDF is fitted to the viewport.
///
/// `FitWidth` reproduces the behaviour users of the desktop viewer are used
/// to; `FitPage` makes the whole page visible without cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InitialZoom {
    #[default]
    FitWidth,
    FitPage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    pub font_family: String,
    pub font_size: u16,
    pub language: Language,
    pub display_mode: DisplayMode,
    pub initial_zoom: InitialZoom,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            font_family: "Segoe UI".to_string(),
            font_size: 16,
            language: Language::En,
            display_mode: DisplayMode::Maximized,
            initial_zoom: InitialZoom::FitWidth,
        }
    }
}

/// On-disk layout: everything lives in a single `[general]` section
#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    general: Settings,
}

pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file is
    /// missing or unreadable, then write the result back so the file always
    /// holds every key.
    pub fn load_or_create(path: &Path) -> Self {
        let settings = Self::load_from_path(path);
        if let Err(e) = settings.save(path) {
            error!("Failed to save settings to {path:?}: {e}");
        }
        settings
    }

    fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            info!("Settings file not found, creating with defaults at {path:?}");
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<SettingsFile>(&content) {
                Ok(file) => {
                    debug!("Loaded settings from {path:?}");
                    file.general
                }
                Err(e) => {
                    error!("Failed to parse settings file {path:?}: {e}");
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read settings file {path:?}: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = SettingsFile {
            general: self.clone(),
        };
        fs::write(path, toml::to_string(&file)?)?;
        debug!("Saved settings to {path:?}");
        Ok(())
    }

    /// Set a single key from its textual form
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), FolioError> {
        let value = value.trim();
        match key {
            "theme" => self.theme = value.parse()?,
            "font_family" => {
                if value.is_empty() {
                    return Err(FolioError::invalid("font_family must not be empty"));
                }
                self.font_family = value.to_string();
            }
            "font_size" => {
                self.font_size = value
                    .parse::<u16>()
                    .ok()
                    .filter(|size| (8..=60).contains(size))
                    .ok_or_else(|| FolioError::invalid("font_size must be between 8 and 60"))?;
            }
            "language" => self.language = value.parse()?,
            "display_mode" => {
                self.display_mode = value
                    .parse::<u8>()
                    .map_err(|_| FolioError::invalid("display_mode must be 0, 1 or 2"))
                    .and_then(|v| DisplayMode::try_from(v).map_err(FolioError::InvalidInput))?;
            }
            "initial_zoom" => self.initial_zoom = value.parse()?,
            other => {
                warn!("Ignoring unknown settings key {other:?}");
                return Err(FolioError::invalid(format!("unknown settings key {other:?}")));
            }
        }
        Ok(())
    }

    /// Key/value pairs in file order, for display
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("theme", self.theme.to_string()),
            ("font_family", self.font_family.clone()),
            ("font_size", self.font_size.to_string()),
            ("language", self.language.to_string()),
            ("display_mode", u8::from(self.display_mode).to_string()),
            ("initial_zoom", self.initial_zoom.to_string()),
        ]
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

impl FromStr for Theme {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(FolioError::invalid(format!("unknown theme {s:?}"))),
        }
    }
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::En => "en",
            Language::Th => "th",
        })
    }
}

impl FromStr for Language {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "th" => Ok(Language::Th),
            _ => Err(FolioError::invalid(format!("unknown language {s:?}"))),
        }
    }
}

impl Language {
    pub fn toggled(self) -> Self {
        match self {
            Language::En => Language::Th,
            Language::Th => Language::En,
        }
    }
}

impl fmt::Display for InitialZoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InitialZoom::FitWidth => "fit_width",
            InitialZoom::FitPage => "fit_page",
        })
    }
}

impl FromStr for InitialZoom {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fit_width" => Ok(InitialZoom::FitWidth),
            "fit_page" => Ok(InitialZoom::FitPage),
            _ => Err(FolioError::invalid(format!("unknown initial_zoom {s:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let settings = Settings::load_or_create(&path);

        assert_eq!(settings, Settings::default());
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("[general]"));
        assert!(written.contains("font_family = \"Segoe UI\""));
        assert!(written.contains("display_mode = 1"));
    }

    #[test]
    fn missing_keys_take_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[general]\ntheme = \"dark\"\nfont_size = 20\n").unwrap();

        let settings = Settings::load_or_create(&path);

        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.font_size, 20);
        assert_eq!(settings.language, Language::En);
        assert_eq!(settings.display_mode, DisplayMode::Maximized);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[general\nthis is not toml").unwrap();

        let settings = Settings::load_or_create(&path);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        let mut settings = Settings::default();
        settings.set("theme", "dark").unwrap();
        settings.set("language", "th").unwrap();
        settings.set("display_mode", "2").unwrap();
        settings.set("initial_zoom", "fit_page").unwrap();
        settings.save(&path).unwrap();

        let loaded = Settings::load_or_create(&path);
        assert_eq!(loaded, settings);
        assert_eq!(loaded.display_mode, DisplayMode::Fullscreen);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut settings = Settings::default();
        assert!(settings.set("display_mode", "7").is_err());
        assert!(settings.set("font_size", "200").is_err());
        assert!(settings.set("theme", "solarized").is_err());
        assert!(settings.set("colour", "red").is_err());
        assert_eq!(settings, Settings::default());
    }
}
