use anyhow::{Context, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::color::HexColor;
use crate::constants::appearance::*;

/// Resolved appearance settings (colors parsed, ranges clamped)
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConfig {
    pub time_format: String,
    pub font: String,
    pub text_size: f32,
    /// Straight ARGB
    pub text_color: u32,
    /// Straight ARGB
    pub background_color: u32,
    pub padding: u16,
}

/// Everything persisted in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentState {
    /// Whether the clock should ever appear
    #[serde(default = "default_clock_enabled")]
    pub clock_enabled: bool,

    /// Draw a background plate behind the text
    #[serde(default)]
    pub show_background: bool,

    #[serde(default)]
    pub appearance: Appearance,
}

/// User-edited look of the clock face. Read at startup only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    /// chrono strftime pattern
    #[serde(default = "default_time_format")]
    pub time_format: String,

    /// Fontconfig name, e.g. "DejaVu Sans Bold"
    #[serde(default = "default_font")]
    pub font: String,

    /// Text size in pixels (accepts integer or float)
    #[serde(default = "default_text_size", deserialize_with = "deserialize_text_size")]
    pub text_size: f32,

    #[serde(default = "default_text_color")]
    pub text_color: String,

    #[serde(default = "default_background_color")]
    pub background_color: String,

    #[serde(default = "default_padding")]
    pub padding: u16,
}

fn default_clock_enabled() -> bool {
    true
}

fn default_time_format() -> String {
    DEFAULT_TIME_FORMAT.to_string()
}

fn default_font() -> String {
    DEFAULT_FONT.to_string()
}

fn default_text_size() -> f32 {
    DEFAULT_TEXT_SIZE
}

fn default_text_color() -> String {
    DEFAULT_TEXT_COLOR.to_string()
}

fn default_background_color() -> String {
    DEFAULT_BACKGROUND_COLOR.to_string()
}

fn default_padding() -> u16 {
    DEFAULT_PADDING
}

/// Custom deserializer that accepts both integer and float for text_size
fn deserialize_text_size<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrFloat {
        Int(i64),
        Float(f32),
    }

    match IntOrFloat::deserialize(deserializer)? {
        IntOrFloat::Int(i) => Ok(i as f32),
        IntOrFloat::Float(f) => Ok(f),
    }
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            time_format: default_time_format(),
            font: default_font(),
            text_size: default_text_size(),
            text_color: default_text_color(),
            background_color: default_background_color(),
            padding: default_padding(),
        }
    }
}

impl Default for PersistentState {
    fn default() -> Self {
        Self {
            clock_enabled: default_clock_enabled(),
            show_background: false,
            appearance: Appearance::default(),
        }
    }
}

impl PersistentState {
    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Load from `path`, applying env overrides and clamping.
    ///
    /// A missing file yields defaults and is written out. A broken file is
    /// left alone for the user to fix and defaults are used in memory.
    pub fn load_from(path: &Path) -> Self {
        let mut state = match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<PersistentState>(&contents) {
                Ok(state) => {
                    info!(path = %path.display(), "Loaded config");
                    state
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to parse config file");
                    error!(path = %path.display(), "The file has been preserved, using defaults until it is fixed");
                    Self::default()
                }
            },
            Err(_) => {
                let state = Self::default();
                match state.save_to(path) {
                    Ok(()) => info!(path = %path.display(), "Generated default config file"),
                    Err(e) => error!(error = ?e, "Failed to write default config"),
                }
                state
            }
        };

        state.apply_overrides(|name| env::var(name).ok());
        state.validate_and_clamp();
        state
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        fs::write(path, contents)
            .context(format!("Failed to write config file to {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides. `lookup` is `env::var` outside tests.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        use crate::constants::env::{TEXT_SIZE, TIME_FORMAT};

        if let Some(format) = lookup(TIME_FORMAT) {
            self.appearance.time_format = format;
        }
        if let Some(raw) = lookup(TEXT_SIZE) {
            match raw.trim().parse::<f32>() {
                Ok(size) => self.appearance.text_size = size,
                Err(e) => error!(var = TEXT_SIZE, value = %raw, error = %e, "failed to parse env var"),
            }
        }
    }

    /// Validate and clamp values to safe ranges
    fn validate_and_clamp(&mut self) {
        let appearance = &mut self.appearance;

        if !appearance.text_size.is_finite() || appearance.text_size < MIN_TEXT_SIZE {
            warn!(text_size = appearance.text_size, min = MIN_TEXT_SIZE, "text_size below minimum, clamping");
            appearance.text_size = MIN_TEXT_SIZE;
        } else if appearance.text_size > MAX_TEXT_SIZE {
            warn!(text_size = appearance.text_size, max = MAX_TEXT_SIZE, "text_size exceeds maximum, clamping");
            appearance.text_size = MAX_TEXT_SIZE;
        }

        if appearance.padding > MAX_PADDING {
            warn!(padding = appearance.padding, max = MAX_PADDING, "padding exceeds maximum, clamping");
            appearance.padding = MAX_PADDING;
        }

        if !is_valid_time_format(&appearance.time_format) {
            error!(time_format = %appearance.time_format, "Invalid time_format, using default");
            appearance.time_format = default_time_format();
        }
    }

    pub fn build_display_config(&self) -> DisplayConfig {
        let appearance = &self.appearance;

        let text_color = HexColor::parse(&appearance.text_color)
            .unwrap_or_else(|| {
                error!(text_color = %appearance.text_color, "Invalid text_color hex, using default");
                HexColor::from_argb32(0xFF_FF_FF_FF)
            })
            .argb32();

        let background_color = HexColor::parse(&appearance.background_color)
            .unwrap_or_else(|| {
                error!(background_color = %appearance.background_color, "Invalid background_color hex, using default");
                HexColor::from_argb32(0xB0_20_20_20)
            })
            .argb32();

        DisplayConfig {
            time_format: appearance.time_format.clone(),
            font: appearance.font.clone(),
            text_size: appearance.text_size,
            text_color,
            background_color,
            padding: appearance.padding,
        }
    }
}

fn is_valid_time_format(format: &str) -> bool {
    !format.trim().is_empty()
        && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = PersistentState::default();
        assert!(state.clock_enabled);
        assert!(!state.show_background);
        assert_eq!(state.appearance.time_format, DEFAULT_TIME_FORMAT);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let state: PersistentState =
            serde_json::from_str(r#"{ "show_background": true, "appearance": { "text_size": 20 } }"#)
                .unwrap();
        assert!(state.clock_enabled);
        assert!(state.show_background);
        assert_eq!(state.appearance.text_size, 20.0);
        assert_eq!(state.appearance.padding, DEFAULT_PADDING);
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let state = PersistentState::load_from(&path);
        assert!(state.clock_enabled);
        assert!(path.exists());
    }

    #[test]
    fn test_broken_file_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let state = PersistentState::load_from(&path);
        assert!(state.clock_enabled);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut state = PersistentState::default();
        state.clock_enabled = false;
        state.show_background = true;
        state.save_to(&path).unwrap();

        let loaded = PersistentState::load_from(&path);
        assert!(!loaded.clock_enabled);
        assert!(loaded.show_background);
    }

    #[test]
    fn test_validate_and_clamp() {
        let mut state = PersistentState::default();
        state.appearance.text_size = 500.0;
        state.appearance.padding = 1000;
        state.appearance.time_format = "%Q broken".to_string();
        state.validate_and_clamp();

        assert_eq!(state.appearance.text_size, MAX_TEXT_SIZE);
        assert_eq!(state.appearance.padding, MAX_PADDING);
        assert_eq!(state.appearance.time_format, DEFAULT_TIME_FORMAT);

        state.appearance.text_size = 1.0;
        state.validate_and_clamp();
        assert_eq!(state.appearance.text_size, MIN_TEXT_SIZE);
    }

    #[test]
    fn test_env_overrides() {
        let mut state = PersistentState::default();
        state.apply_overrides(|name| match name {
            "CORNER_CLOCK_FORMAT" => Some("%H:%M:%S".to_string()),
            "CORNER_CLOCK_TEXT_SIZE" => Some("18".to_string()),
            _ => None,
        });
        assert_eq!(state.appearance.time_format, "%H:%M:%S");
        assert_eq!(state.appearance.text_size, 18.0);

        state.apply_overrides(|name| (name == "CORNER_CLOCK_TEXT_SIZE").then(|| "huge".to_string()));
        assert_eq!(state.appearance.text_size, 18.0);
    }

    #[test]
    fn test_build_display_config_invalid_colors_fallback() {
        let mut state = PersistentState::default();
        state.appearance.text_color = "invalid".to_string();
        state.appearance.background_color = "00FF00".to_string();

        let config = state.build_display_config();
        assert_eq!(config.text_color, 0xFFFFFFFF);
        assert_eq!(config.background_color, 0xFF00FF00);
    }
}
