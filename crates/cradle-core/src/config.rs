//! Configuration loading and typed config structures for the Cradle
//! simulation.
//!
//! The canonical configuration lives in `cradle-config.yaml` in the working
//! directory. Every section is optional; missing sections and fields fall
//! back to the defaults below. The `agents` section is read by the engine
//! binary's spawner and ignored here.

use std::path::Path;

use cradle_carry::{BackendKind, CarryPolicy, InteractionTable};
use cradle_types::LifeStage;
use serde::Deserialize;

/// Environment variable that overrides `persistence.snapshot_path`.
pub const SNAPSHOT_PATH_ENV: &str = "CRADLE_SNAPSHOT_PATH";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but is inconsistent.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `cradle-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed, tick pacing).
    #[serde(default)]
    pub world: WorldConfig,

    /// Run boundaries.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Age thresholds between life stages.
    #[serde(default)]
    pub life_stages: LifeStageConfig,

    /// Carrier capacity policy.
    #[serde(default)]
    pub carry: CarryPolicy,

    /// Interaction durations and cooldowns.
    #[serde(default)]
    pub interactions: InteractionTable,

    /// Job execution parameters.
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Presentation backend selection.
    #[serde(default)]
    pub presentation: PresentationConfig,

    /// Save file location and autosave cadence.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `CRADLE_SNAPSHOT_PATH`, when set, overrides
    /// `persistence.snapshot_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if the values are inconsistent.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if the values are inconsistent.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.persistence.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.life_stages.validate()?;
        if self.carry.default_capacity > self.carry.capacity_ceiling {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "carry.default_capacity ({}) exceeds carry.capacity_ceiling ({})",
                    self.carry.default_capacity, self.carry.capacity_ceiling
                ),
            });
        }
        if self.jobs.move_speed == 0 {
            return Err(ConfigError::Invalid {
                reason: "jobs.move_speed must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for the demo population.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time milliseconds between ticks (0 = as fast as possible).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Simulation boundary configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum number of ticks before the run ends (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,
}

/// Ages, in ticks, at which an agent enters each life stage.
///
/// An agent younger than `baby_at` is a newborn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LifeStageConfig {
    /// Age at which a newborn becomes a baby.
    #[serde(default = "default_baby_at")]
    pub baby_at: u64,
    /// Age at which a baby becomes a toddler.
    #[serde(default = "default_toddler_at")]
    pub toddler_at: u64,
    /// Age at which a toddler becomes a child (no longer carriable).
    #[serde(default = "default_child_at")]
    pub child_at: u64,
    /// Age at which a child becomes an adult (may carry).
    #[serde(default = "default_adult_at")]
    pub adult_at: u64,
}

impl Default for LifeStageConfig {
    fn default() -> Self {
        Self {
            baby_at: default_baby_at(),
            toddler_at: default_toddler_at(),
            child_at: default_child_at(),
            adult_at: default_adult_at(),
        }
    }
}

impl LifeStageConfig {
    /// The life stage of an agent aged `age_ticks`.
    pub const fn stage_for_age(&self, age_ticks: u64) -> LifeStage {
        if age_ticks >= self.adult_at {
            LifeStage::Adult
        } else if age_ticks >= self.child_at {
            LifeStage::Child
        } else if age_ticks >= self.toddler_at {
            LifeStage::Toddler
        } else if age_ticks >= self.baby_at {
            LifeStage::Baby
        } else {
            LifeStage::Newborn
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let ascending = self.baby_at < self.toddler_at
            && self.toddler_at < self.child_at
            && self.child_at < self.adult_at;
        if ascending {
            Ok(())
        } else {
            Err(ConfigError::Invalid {
                reason: format!(
                    "life_stages must be strictly ascending (got {} / {} / {} / {})",
                    self.baby_at, self.toddler_at, self.child_at, self.adult_at
                ),
            })
        }
    }
}

/// Job execution parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct JobsConfig {
    /// Grid cells a carrier moves per tick toward a pickup target.
    #[serde(default = "default_move_speed")]
    pub move_speed: u32,

    /// Ticks after putting a dependent down, or being pulled off the carry
    /// job, during which a carrier does not pick anyone up on its own.
    /// The hold always covers the tick of the release itself.
    #[serde(default = "default_repickup_delay_ticks")]
    pub repickup_delay_ticks: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            move_speed: default_move_speed(),
            repickup_delay_ticks: default_repickup_delay_ticks(),
        }
    }
}

/// Presentation configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PresentationConfig {
    /// Animation backend: `log` or `none`.
    #[serde(default)]
    pub backend: BackendKind,
}

/// Save file configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the JSON snapshot file.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    /// Save every N ticks (0 = only on shutdown).
    #[serde(default = "default_autosave_interval_ticks")]
    pub autosave_interval_ticks: u64,
}

impl PersistenceConfig {
    /// Override the snapshot path with `CRADLE_SNAPSHOT_PATH` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(SNAPSHOT_PATH_ENV) {
            self.snapshot_path = val;
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            autosave_interval_ticks: default_autosave_interval_ticks(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    String::from("Cradle")
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_baby_at() -> u64 {
    40
}

const fn default_toddler_at() -> u64 {
    120
}

const fn default_child_at() -> u64 {
    480
}

const fn default_adult_at() -> u64 {
    1200
}

const fn default_move_speed() -> u32 {
    1
}

const fn default_repickup_delay_ticks() -> u64 {
    30
}

fn default_snapshot_path() -> String {
    String::from("cradle-snapshot.json")
}

const fn default_autosave_interval_ticks() -> u64 {
    200
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.world.seed, 42);
        assert_eq!(config.carry.default_capacity, 1);
        assert_eq!(config.presentation.backend, BackendKind::Log);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
world:
  name: "Test Cradle"
  seed: 7
  tick_interval_ms: 0

simulation:
  max_ticks: 300

life_stages:
  baby_at: 10
  toddler_at: 20
  child_at: 30
  adult_at: 40

carry:
  default_capacity: 1
  capacity_ceiling: 4
  species_overrides:
    ogre: 2
  trait_modifiers:
    strong: 1
    frail: -1

interactions:
  tickle:
    duration_ticks: 2
    cooldown_ticks: 30

jobs:
  move_speed: 2
  repickup_delay_ticks: 12

presentation:
  backend: none

persistence:
  snapshot_path: "saves/test.json"
  autosave_interval_ticks: 50

logging:
  level: "debug"
  format: json

agents:
  factions: 3
"#;

        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.world.name, "Test Cradle");
        assert_eq!(config.simulation.max_ticks, 300);
        assert_eq!(config.life_stages.child_at, 30);
        assert_eq!(config.carry.capacity_ceiling, 4);
        assert_eq!(config.carry.species_overrides.get("ogre"), Some(&2));
        assert_eq!(config.carry.trait_modifiers.get("frail"), Some(&-1));
        assert_eq!(config.interactions.tickle.cooldown_ticks, 30);
        // Unlisted kinds keep their defaults.
        assert_eq!(
            config.interactions.spin,
            InteractionTable::default().spin
        );
        assert_eq!(config.jobs.move_speed, 2);
        assert_eq!(config.jobs.repickup_delay_ticks, 12);
        assert_eq!(config.presentation.backend, BackendKind::None);
        assert_eq!(config.persistence.autosave_interval_ticks, 50);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn parse_minimal_and_empty_yaml() {
        let config = SimulationConfig::parse("world:\n  seed: 9\n").unwrap();
        assert_eq!(config.world.seed, 9);
        assert_eq!(config.life_stages, LifeStageConfig::default());

        assert!(SimulationConfig::parse("").is_ok());
    }

    #[test]
    fn rejects_unordered_life_stages() {
        let yaml = "life_stages:\n  toddler_at: 500\n  child_at: 400\n";
        assert!(matches!(
            SimulationConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_zero_move_speed() {
        let yaml = "jobs:\n  move_speed: 0\n";
        assert!(matches!(
            SimulationConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn stage_boundaries() {
        let stages = LifeStageConfig::default();
        assert_eq!(stages.stage_for_age(0), LifeStage::Newborn);
        assert_eq!(stages.stage_for_age(stages.toddler_at.saturating_sub(1)), LifeStage::Baby);
        assert_eq!(stages.stage_for_age(stages.toddler_at), LifeStage::Toddler);
        assert_eq!(stages.stage_for_age(stages.child_at), LifeStage::Child);
        assert_eq!(stages.stage_for_age(u64::MAX), LifeStage::Adult);
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("cradle-config.yaml");
        if path.exists() {
            let config = SimulationConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
