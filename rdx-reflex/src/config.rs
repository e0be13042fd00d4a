//! Defines all configuration structures for the Reflex engine.
//!
//! These structs are deserialized with `serde`, usually from a TOML file
//! layered under `REFLEX__*` environment overrides. Every section has
//! defaults, so an empty file (or no file at all) yields the stock game: a
//! 25px target on an 800x600 surface and the three classic items.

use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

/// The top-level configuration for a game.
#[derive(Debug, Clone, Deserialize)]
pub struct ReflexConfig {
    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub score: ScoreConfig,

    #[serde(default)]
    pub logger: LoggerConfig,

    /// The items the player can collect. Order is presentation order.
    #[serde(default = "default_items")]
    pub items: Vec<ItemConfig>,
}

/// Target geometry and scoring.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Default width and height in pixels. Random sizes are drawn from
    /// `[side / 2, side * 3 + side / 2)`.
    pub side: u32,
    /// Default left position.
    pub left: u32,
    /// Default top position.
    pub top: u32,
    /// Bounds used for random placement.
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Points for one accepted click, before timescale scaling.
    pub points_value: u64,
    /// Record the session start as the first click time, so the first click
    /// of a session measures reaction time from the start.
    pub seed_click_on_start: bool,
    /// Fixed seed for geometry randomization. Random when absent.
    pub rng_seed: Option<u64>,
}

/// Score presentation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Character length scores are zero-padded to.
    pub padded_length: usize,
}

/// Log retention.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Maximum number of entries kept; the oldest are dropped first.
    pub capacity: usize,
}

/// One collectible item.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemConfig {
    /// Name shown in log entries.
    pub presentation_name: String,
    /// Identifier the presentation surface activates the item by.
    pub id: String,
    /// Seconds the item stays unavailable after an accepted click.
    pub spawn_interval_seconds: u64,
    /// Session second at which the item first becomes available.
    #[serde(default)]
    pub start_spawn_time_seconds: u64,
    #[serde(default)]
    pub background_color_class: String,
    #[serde(default)]
    pub background_image_class: String,
}

impl ReflexConfig {
    /// Loads configuration from an optional TOML file, then applies
    /// `REFLEX__SECTION__KEY` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("REFLEX")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

impl Default for ReflexConfig {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            score: ScoreConfig::default(),
            logger: LoggerConfig::default(),
            items: default_items(),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            side: 25,
            left: 50,
            top: 50,
            viewport_width: 800,
            viewport_height: 600,
            points_value: 1,
            seed_click_on_start: true,
            rng_seed: None,
        }
    }
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self { padded_length: 6 }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { capacity: 200 }
    }
}

// --- Default value functions for serde ---

fn default_items() -> Vec<ItemConfig> {
    vec![
        ItemConfig {
            presentation_name: "Red Armor".to_string(),
            id: "itemArmorRed".to_string(),
            spawn_interval_seconds: 25,
            start_spawn_time_seconds: 0,
            background_color_class: "background-color-red".to_string(),
            background_image_class: "background-image-armor".to_string(),
        },
        ItemConfig {
            presentation_name: "Yellow Armor".to_string(),
            id: "itemArmorYellow".to_string(),
            spawn_interval_seconds: 25,
            start_spawn_time_seconds: 0,
            background_color_class: "background-color-yellow".to_string(),
            background_image_class: "background-image-armor".to_string(),
        },
        ItemConfig {
            presentation_name: "Megahealth".to_string(),
            id: "itemHealthMega".to_string(),
            spawn_interval_seconds: 35,
            start_spawn_time_seconds: 0,
            background_color_class: "background-color-blue".to_string(),
            background_image_class: "background-image-megahealth".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_describe_the_stock_game() {
        let config = ReflexConfig::default();
        assert_eq!(config.target.side, 25);
        assert_eq!(config.score.padded_length, 6);
        let names: Vec<_> = config
            .items
            .iter()
            .map(|item| item.presentation_name.as_str())
            .collect();
        assert_eq!(names, ["Red Armor", "Yellow Armor", "Megahealth"]);
    }

    #[test]
    fn toml_file_overrides_selected_fields() {
        let path = std::env::temp_dir().join(format!("reflex-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[target]
side = 40
rng_seed = 7

[[items]]
presentation_name = "Quad Damage"
id = "quad"
spawn_interval_seconds = 90
start_spawn_time_seconds = 30
"#
        )
        .unwrap();

        let config = ReflexConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.target.side, 40);
        assert_eq!(config.target.rng_seed, Some(7));
        assert_eq!(config.target.viewport_width, 800);
        assert_eq!(config.logger.capacity, 200);
        assert_eq!(config.items.len(), 1);
        assert_eq!(config.items[0].start_spawn_time_seconds, 30);
    }
}
