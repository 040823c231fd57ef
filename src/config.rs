//! Runtime settings, read from TOML and overridden on the command line.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Runtime settings. Every field has a default, so a config file only needs
/// the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Surface pixels per canvas pixel (half a terminal cell).
    pub pixels_per_cell: f32,
    /// Background and fade colour.
    pub background: (u8, u8, u8),
    /// Opacity of the per-tick fade overlay.
    pub fade_alpha: f32,
    pub max_particles: usize,
    pub auto_fire: bool,
    /// Index into the preset table.
    pub preset: usize,
    pub bell: bool,
    pub recipe_file: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            pixels_per_cell: 6.0,
            background: (0, 0, 5),
            fade_alpha: 0.2,
            max_particles: 20_000,
            auto_fire: false,
            preset: 0,
            bell: false,
            recipe_file: None,
            log_dir: None,
        }
    }
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate must be positive".into()));
        }
        if !(self.pixels_per_cell.is_finite() && self.pixels_per_cell > 0.0) {
            return Err(ConfigError::Invalid(
                "pixels_per_cell must be positive".into(),
            ));
        }
        if !(self.fade_alpha > 0.0 && self.fade_alpha <= 1.0) {
            return Err(ConfigError::Invalid(
                "fade_alpha must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Parse `RRGGBB`, with or without a leading `#`.
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(Settings::from_toml("").unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_file_overrides() {
        let settings = Settings::from_toml(
            r#"
            tick_rate = 30
            background = [10, 20, 30]
            auto_fire = true
            recipe_file = "dragon.json"
            "#,
        )
        .unwrap();
        assert_eq!(settings.tick_rate, 30);
        assert_eq!(settings.background, (10, 20, 30));
        assert!(settings.auto_fire);
        assert_eq!(settings.recipe_file, Some(PathBuf::from("dragon.json")));
        assert_eq!(settings.max_particles, 20_000);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            Settings::from_toml("tick_rate = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_toml("fade_alpha = 0.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_toml("pixels_per_cell = -2.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_toml("colour = 1"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(parse_hex_color("1a1b26"), Some((0x1a, 0x1b, 0x26)));
        assert_eq!(parse_hex_color("#FFFFFF"), Some((255, 255, 255)));
        assert_eq!(parse_hex_color("fff"), None);
        assert_eq!(parse_hex_color("zz0000"), None);
    }
}
