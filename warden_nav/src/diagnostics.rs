// Plain-data diagnostics: graph dumps and integration counters.
//
// `GraphDump` is a serializable snapshot of a built graph (counts, build
// timing, every node, every undirected edge, every room). `NavDiagnostics` is
// an explicit counter object owned by `NavIntegration` and bumped by its
// operations. Neither is ever read back by the navigation core to make a
// decision; they exist for the caller to log or visualize.
//
// See also: `nav.rs` (`NavGraph::dump()`), `integration.rs` which owns the
// `NavDiagnostics` instance.
//
// **Critical constraint: determinism.** Apart from `build_duration_us`, a dump
// is a pure function of the graph. Maps use `BTreeMap` so JSON output is
// stable.

use crate::types::{NavNodeId, NodeType, RoomId, TileCoord};
use serde::Serialize;
use std::collections::BTreeMap;

/// One node in a `GraphDump`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub id: NavNodeId,
    pub tile: TileCoord,
    pub node_type: NodeType,
    pub connections: usize,
    pub room: Option<RoomId>,
    pub strategic_value: f32,
}

/// One undirected edge in a `GraphDump`, listed once with `from < to`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EdgeSnapshot {
    pub from: NavNodeId,
    pub to: NavNodeId,
    pub cost: f32,
}

/// One room in a `GraphDump`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub min: TileCoord,
    pub max: TileCoord,
    pub center: TileCoord,
    pub area: usize,
    pub doorways: Vec<TileCoord>,
}

/// Full snapshot of a navigation graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphDump {
    pub width: u32,
    pub height: u32,
    pub node_count: usize,
    pub edge_count: usize,
    pub room_count: usize,
    pub type_counts: BTreeMap<NodeType, usize>,
    pub build_duration_us: u64,
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
    pub rooms: Vec<RoomSnapshot>,
}

impl GraphDump {
    /// Serialize to compact JSON for a log line or an external viewer.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Counters bumped by the integration façade.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NavDiagnostics {
    pub graph_builds: u64,
    pub last_build_us: u64,
    pub agents_registered: u64,
    pub agents_unregistered: u64,
    pub path_validations: u64,
    pub invalid_paths: u64,
    pub stuck_checks: u64,
    pub stuck_detections: u64,
    /// Successful recoveries keyed by strategy name.
    pub recoveries: BTreeMap<String, u64>,
    pub legacy_fallbacks: u64,
    pub room_entries: u64,
    pub room_exits: u64,
    pub room_changes: u64,
    pub sweeps_started: u64,
    pub sweep_points_served: u64,
    pub searches_started: u64,
    pub search_points_served: u64,
    pub position_corrections: u64,
    pub path_points_dropped: u64,
}

impl NavDiagnostics {
    pub fn record_recovery(&mut self, strategy: &str) {
        *self.recoveries.entry(strategy.to_string()).or_default() += 1;
    }

    /// Total successful recoveries across all strategies.
    pub fn total_recoveries(&self) -> u64 {
        self.recoveries.values().sum()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
