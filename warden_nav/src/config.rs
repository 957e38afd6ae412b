// Data-driven navigation configuration.
//
// Every tunable threshold of the navigation core lives in `NavConfig`, grouped
// by the component that reads it: `GraphParams` (classification and room
// detection), `PatternParams` (search pattern generation and lifecycle),
// `SweepParams` (room sweeps) and `IntegrationParams` (per-agent behavior in
// the façade). Components read from the config and never embed magic numbers.
//
// The config loads from JSON. Every struct is `#[serde(default)]`, so a
// config file only needs to name the values it overrides.
//
// See also: `nav.rs`, `pattern.rs`, `sweep.rs` and `integration.rs` for the
// consumers of each parameter group.
//
// **Critical constraint: determinism.** Config values feed directly into
// graph classification and pattern generation. Identical configs and tile
// grids produce identical graphs and patterns.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Parameter groups
// ---------------------------------------------------------------------------

/// Thresholds for graph classification and room detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphParams {
    /// Minimum number of distinct passages around a node for it to count as
    /// a junction.
    pub junction_min_connections: u32,
    /// Narrowest span (in tiles) still considered a corridor.
    pub corridor_width_min: u32,
    /// Widest span (in tiles) still considered a corridor.
    pub corridor_width_max: u32,
    /// Widest span (in tiles) a doorway may have.
    pub doorway_max_width: u32,
    /// Minimum open span along the doorway's long axis.
    pub doorway_min_open: u32,
    /// Corridor/doorway nodes this narrow (or narrower) are chokepoint
    /// candidates.
    pub chokepoint_max_width: u32,
    /// Flood-fill components smaller than this are not rooms.
    pub room_min_area: usize,
    /// Width measurement stops after this many tiles in each direction.
    pub width_scan_limit: u32,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            junction_min_connections: 3,
            corridor_width_min: 1,
            corridor_width_max: 3,
            doorway_max_width: 3,
            doorway_min_open: 4,
            chokepoint_max_width: 1,
            room_min_area: 9,
            width_scan_limit: 16,
        }
    }
}

/// Search pattern generation and lifecycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternParams {
    /// Hard cap on points per pattern.
    pub max_pattern_points: usize,
    /// Patterns older than this are discarded on next access.
    pub pattern_timeout_ms: u64,
    /// Lane sweep emits every Nth corridor node as a primary point.
    pub lane_stride: usize,
    /// Perpendicular offset (tiles) of lane sweep side checks.
    pub lane_offset: i32,
    /// Branch walks stop after this many nodes.
    pub branch_max_depth: usize,
    /// Branches shorter than this are discarded.
    pub branch_min_length: usize,
    /// Radius of the first expanding ring.
    pub ring_initial_radius: u32,
    /// Largest ring radius for the default expanding ring.
    pub ring_max_radius: u32,
    /// Largest ring radius when searching from inside a room.
    pub ring_wide_max_radius: u32,
    /// Radius increment between rings.
    pub ring_step: u32,
    /// Angular samples per tile of radius (at least 8 per ring).
    pub ring_samples_per_radius: u32,
    /// Non-walkable ring samples snap to a node within this many tiles.
    pub ring_snap_radius: i32,
    /// Corridor search walks this many tiles in each cardinal direction.
    pub corridor_search_depth: u32,
    /// Per-tile priority multiplier for corridor search.
    pub corridor_search_decay: f32,
    /// Number of finished patterns kept for statistics.
    pub history_capacity: usize,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            max_pattern_points: 24,
            pattern_timeout_ms: 30_000,
            lane_stride: 3,
            lane_offset: 2,
            branch_max_depth: 12,
            branch_min_length: 2,
            ring_initial_radius: 2,
            ring_max_radius: 8,
            ring_wide_max_radius: 12,
            ring_step: 2,
            ring_samples_per_radius: 4,
            ring_snap_radius: 2,
            corridor_search_depth: 8,
            corridor_search_decay: 0.9,
            history_capacity: 64,
        }
    }
}

/// Room sweep generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepParams {
    /// Hard cap on points per sweep.
    pub max_sweep_points: usize,
    /// Assumed agent speed (world units per second) for duration estimates.
    pub agent_speed: f32,
    pub doorway_priority: f32,
    pub corner_priority: f32,
    pub center_priority: f32,
    /// Priority of perimeter, spiral and cross points.
    pub edge_priority: f32,
}

impl Default for SweepParams {
    fn default() -> Self {
        Self {
            max_sweep_points: 32,
            agent_speed: 64.0,
            doorway_priority: 1.5,
            corner_priority: 1.2,
            center_priority: 1.0,
            edge_priority: 1.0,
        }
    }
}

/// Per-agent behavior of the integration façade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationParams {
    /// A path is invalid when the agent is farther than this (in tiles) from
    /// every path point.
    pub path_deviation_tiles: f32,
    /// Interval between stuck checks.
    pub stuck_check_interval_ms: u64,
    /// Displacement below this (in tiles) over one interval counts as stuck.
    pub stuck_distance_tiles: f32,
    /// Failed recoveries before the caller is told to fall back.
    pub max_recovery_attempts: u32,
    /// Attach a standard sweep when an agent enters a room.
    pub auto_sweep_on_room_entry: bool,
    /// Search radius (tiles) for walkability correction.
    pub valid_position_radius: u32,
    /// Speed multiplier reported for corridor nodes.
    pub corridor_speed_multiplier: f32,
    /// Speed multiplier reported for chokepoint nodes.
    pub chokepoint_speed_multiplier: f32,
}

impl Default for IntegrationParams {
    fn default() -> Self {
        Self {
            path_deviation_tiles: 3.0,
            stuck_check_interval_ms: 1_000,
            stuck_distance_tiles: 0.5,
            max_recovery_attempts: 3,
            auto_sweep_on_room_entry: true,
            valid_position_radius: 5,
            corridor_speed_multiplier: 1.2,
            chokepoint_speed_multiplier: 0.8,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level navigation configuration. Loaded once, never mutated by the
/// navigation core.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub graph: GraphParams,
    pub patterns: PatternParams,
    pub sweeps: SweepParams,
    pub integration: IntegrationParams,
}

impl NavConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the config to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = NavConfig::default();
        let json = config.to_json().unwrap();
        let restored = NavConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn config_loads_partial_json() {
        let json = r#"{
            "graph": { "room_min_area": 4, "corridor_width_max": 2 },
            "patterns": { "max_pattern_points": 10 },
            "integration": { "auto_sweep_on_room_entry": false }
        }"#;
        let config = NavConfig::from_json(json).unwrap();
        assert_eq!(config.graph.room_min_area, 4);
        assert_eq!(config.graph.corridor_width_max, 2);
        // Untouched fields keep their defaults.
        assert_eq!(config.graph.junction_min_connections, 3);
        assert_eq!(config.patterns.max_pattern_points, 10);
        assert_eq!(config.patterns.lane_stride, 3);
        assert!(!config.integration.auto_sweep_on_room_entry);
        assert_eq!(config.sweeps, SweepParams::default());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(NavConfig::from_json("{ \"graph\": 7 }").is_err());
        assert!(NavConfig::from_json("not json").is_err());
    }

    #[test]
    fn defaults_are_internally_consistent() {
        let config = NavConfig::default();
        assert!(config.graph.corridor_width_min <= config.graph.corridor_width_max);
        assert!(config.graph.chokepoint_max_width <= config.graph.corridor_width_max);
        assert!(config.patterns.ring_initial_radius <= config.patterns.ring_max_radius);
        assert!(config.patterns.ring_max_radius <= config.patterns.ring_wide_max_radius);
        assert!(config.patterns.ring_step > 0);
        assert!(config.sweeps.agent_speed > 0.0);
    }
}
