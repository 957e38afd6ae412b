// warden_nav — semantic navigation for patrol and search agents on tile maps.
//
// This crate turns a static tile map into a graph of movement nodes tagged by
// structural role (corridor, doorway, room interior, junction, chokepoint,
// dead end), groups open area into rooms, and generates deterministic,
// priority-weighted point sequences for agents searching without a known
// target. It has no rendering, timing or AI dependencies; the host game
// supplies walkability through `TileMap` and drives everything through
// `NavIntegration`.
//
// Module overview:
// - `types.rs`:        TileCoord, WorldPos, node/room/agent IDs, NodeType, direction tables.
// - `tiles.rs`:        TileMap capability trait, TileGeometry, TileGrid (dense grid + ASCII loader).
// - `config.rs`:       NavConfig with nested parameter groups, JSON loading.
// - `nav.rs`:          NavGraph five-phase build pipeline and graph queries.
// - `reachability.rs`: Explicit-queue BFS (flood fill, has_path, hop distances).
// - `diagnostics.rs`:  GraphDump snapshots and NavDiagnostics counters.
// - `pattern.rs`:      Search pattern generators and PathCheckEngine lifecycle.
// - `sweep.rs`:        Room sweeps (standard, perimeter, spiral, cross).
// - `integration.rs`:  NavIntegration façade: agents, path validation, anti-stuck, room entry.
//
// **Critical constraint: determinism.** Graph build, pattern generation and
// sweep generation are pure functions of the tile grid, config and inputs.
// Time only enters as a caller-supplied `now_ms`. No randomness, no
// iteration over hash maps. Use `BTreeMap` for ordered collections.

pub mod config;
pub mod diagnostics;
pub mod integration;
pub mod nav;
pub mod pattern;
pub mod reachability;
pub mod sweep;
pub mod tiles;
pub mod types;

pub use config::NavConfig;
pub use integration::{
    AgentNavState, NavIntegration, NodeContext, PathValidation, PatternRequest, RecoveryStrategy,
    RoomTransition, StuckRecovery,
};
pub use nav::{NavGraph, NavNode, Room};
pub use pattern::{PathCheckEngine, PatternPoint, PatternType, SearchPattern};
pub use sweep::{RoomSweep, RoomSweepGenerator, SweepType, Urgency};
pub use tiles::{TileGrid, TileMap};
pub use types::{AgentId, NavNodeId, NodeType, RoomId, TileCoord, WorldPos};
