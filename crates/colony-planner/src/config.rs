//! Configuration loading and typed config structures for the colony planner.
//!
//! The canonical configuration lives in `colony-config.yaml` at the project
//! root. [`ColonyConfig`] mirrors that file: a `planner` section read by the
//! orchestrator and a `simulation` section read only by the `colony-sim`
//! binary. Every field has a default, so an empty file is valid.

use std::path::Path;

use serde::Deserialize;

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
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ColonyConfig {
    /// Planner cadences, budgets and thresholds.
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Simulation harness parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl ColonyConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Planner cadences, budgets and thresholds. Intervals and TTLs are in
/// ticks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlannerConfig {
    /// Construction sites a zone may have pending at once.
    #[serde(default = "default_max_construction_sites")]
    pub max_construction_sites: u32,

    /// Lifetime of a cached terrain analysis.
    #[serde(default = "default_terrain_ttl")]
    pub terrain_ttl: u64,

    /// Lifetime of a cached cost grid.
    #[serde(default = "default_cost_grid_ttl")]
    pub cost_grid_ttl: u64,

    /// Decay window of traffic records.
    #[serde(default = "default_traffic_ttl")]
    pub traffic_ttl: u64,

    /// How often the layout is checked for replanning.
    #[serde(default = "default_replan_interval")]
    pub replan_interval: u64,

    /// How often the road network is recomputed.
    #[serde(default = "default_road_plan_interval")]
    pub road_plan_interval: u64,

    /// How often plans are diffed against the world.
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval: u64,

    /// How often expired traffic records are dropped.
    #[serde(default = "default_traffic_prune_interval")]
    pub traffic_prune_interval: u64,

    /// Minimum visit count for a cell to become a road candidate on
    /// traffic alone.
    #[serde(default = "default_high_traffic_min_count")]
    pub high_traffic_min_count: u32,

    /// Traffic score that makes a road candidate eligible for placement
    /// regardless of priority.
    #[serde(default = "default_road_traffic_threshold")]
    pub road_traffic_threshold: u32,

    /// Share of the road network (percent) that must be placed before
    /// missing structural segments are treated as rebuilds.
    #[serde(default = "default_rebuild_completion_percent")]
    pub rebuild_completion_percent: u32,

    /// Number of exits each spawn is connected to.
    #[serde(default = "default_max_exit_paths")]
    pub max_exit_paths: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_construction_sites: default_max_construction_sites(),
            terrain_ttl: default_terrain_ttl(),
            cost_grid_ttl: default_cost_grid_ttl(),
            traffic_ttl: default_traffic_ttl(),
            replan_interval: default_replan_interval(),
            road_plan_interval: default_road_plan_interval(),
            reconcile_interval: default_reconcile_interval(),
            traffic_prune_interval: default_traffic_prune_interval(),
            high_traffic_min_count: default_high_traffic_min_count(),
            road_traffic_threshold: default_road_traffic_threshold(),
            rebuild_completion_percent: default_rebuild_completion_percent(),
            max_exit_paths: default_max_exit_paths(),
        }
    }
}

/// Parameters of the `colony-sim` harness.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Ticks to run.
    #[serde(default = "default_ticks")]
    pub ticks: u64,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Ticks a construction site takes to finish.
    #[serde(default = "default_build_ticks")]
    pub build_ticks: u64,

    /// Per-tick chance that a standing structure decays away.
    #[serde(default = "default_decay_chance")]
    pub decay_chance: f64,

    /// Ticks between tier advances.
    #[serde(default = "default_tier_interval")]
    pub tier_interval: u64,

    /// Mobile units walking between spawn and sources.
    #[serde(default = "default_units")]
    pub units: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks: default_ticks(),
            seed: default_seed(),
            build_ticks: default_build_ticks(),
            decay_chance: default_decay_chance(),
            tier_interval: default_tier_interval(),
            units: default_units(),
        }
    }
}

const fn default_max_construction_sites() -> u32 {
    10
}

const fn default_terrain_ttl() -> u64 {
    5000
}

const fn default_cost_grid_ttl() -> u64 {
    1000
}

const fn default_traffic_ttl() -> u64 {
    1500
}

const fn default_replan_interval() -> u64 {
    100
}

const fn default_road_plan_interval() -> u64 {
    500
}

const fn default_reconcile_interval() -> u64 {
    250
}

const fn default_traffic_prune_interval() -> u64 {
    100
}

const fn default_high_traffic_min_count() -> u32 {
    10
}

const fn default_road_traffic_threshold() -> u32 {
    20
}

const fn default_rebuild_completion_percent() -> u32 {
    90
}

const fn default_max_exit_paths() -> usize {
    4
}

const fn default_ticks() -> u64 {
    3000
}

const fn default_seed() -> u64 {
    42
}

const fn default_build_ticks() -> u64 {
    5
}

const fn default_decay_chance() -> f64 {
    0.0005
}

const fn default_tier_interval() -> u64 {
    300
}

const fn default_units() -> u32 {
    4
}
