// The navigation façade: the one stateful entry point for agent logic.
//
// `NavIntegration` owns the tile map, the `NavGraph` built from it, the
// `PathCheckEngine`, the `RoomSweepGenerator`, a per-agent arena
// (`BTreeMap<AgentId, AgentNavState>`) and a `NavDiagnostics` counter object.
// Callers register agents by an opaque `AgentId` and then drive everything
// through this type:
//
// - **Path validation** (`validate_path()`): flags a path invalid when the
//   agent has drifted more than `path_deviation_tiles` from every point.
//   Never computes a replacement.
// - **Anti-stuck recovery** (`check_stuck()`): once per
//   `stuck_check_interval_ms`, compares displacement against
//   `stuck_distance_tiles`. A stuck agent gets a waypoint from, in order: a
//   neighbor tile (not the one it came from) with BFS reachability to the
//   target, the nearest junction, the nearest corridor. When all fail and
//   the attempt count reaches `max_recovery_attempts`, the result says to
//   fall back to the caller's legacy movement.
// - **Room transitions** (`update_room()`): entering a room attaches a
//   standard sweep rooted at the entry tile; leaving discards it.
// - **Search façade** (`start_search()` etc.): delegation to the engine,
//   resolving `PatternRequest::Auto` with `best_pattern_type()`.
// - **Node context** and **walkability enforcement**: speed/strategic hints
//   for the current tile, nearest-valid-tile correction and path
//   sanitizing. A tile is valid only if the map says walkable AND the graph
//   has a node there.
//
// `rebuild_graph()` and `replace_map()` are destructive: every active pattern
// is cancelled and every agent's transient state reset. Call them at map load
// boundaries only.
//
// See also: `nav.rs`, `pattern.rs`, `sweep.rs` for the components composed
// here, `diagnostics.rs` for the counters.
//
// **Critical constraint: determinism.** All time is the caller's `now_ms`.
// Agent state lives in a `BTreeMap`, and every candidate list is ordered with
// explicit tie-breaks.

use crate::config::NavConfig;
use crate::diagnostics::{GraphDump, NavDiagnostics};
use crate::nav::NavGraph;
use crate::pattern::{self, PathCheckEngine, PatternPoint, PatternStats, PatternType};
use crate::sweep::{RoomSweep, RoomSweepGenerator, SweepType, Urgency, best_sweep_type};
use crate::tiles::TileMap;
use crate::types::{AgentId, NodeType, RING_OFFSETS, RoomId, TileCoord, WorldPos};
use serde::Serialize;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Per-agent state and results
// ---------------------------------------------------------------------------

/// Stuck-detection bookkeeping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StuckTracker {
    pub last_pos: Option<WorldPos>,
    pub last_check_ms: Option<u64>,
    /// Consecutive stuck intervals.
    pub attempts: u32,
}

/// Everything the façade tracks for one agent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AgentNavState {
    pub last_tile: Option<TileCoord>,
    /// The tile the agent occupied before `last_tile`.
    pub came_from: Option<TileCoord>,
    pub last_room: Option<RoomId>,
    pub last_node_type: Option<NodeType>,
    pub active_pattern: Option<PatternType>,
    pub active_sweep: Option<RoomSweep>,
    /// Index of the next sweep point to hand out.
    pub sweep_index: usize,
    pub stuck: StuckTracker,
    pub replan_needed: bool,
}

impl AgentNavState {
    /// Record the agent standing on `tile`.
    fn track_tile(&mut self, tile: TileCoord) {
        if self.last_tile != Some(tile) {
            self.came_from = self.last_tile;
            self.last_tile = Some(tile);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PathValidation {
    pub valid: bool,
    pub replan_needed: bool,
    /// Index of the path point nearest the agent. `None` for an empty path.
    pub nearest_index: Option<usize>,
    /// Distance to that point in tiles. Infinite for an empty path.
    pub deviation_tiles: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RecoveryStrategy {
    Neighbor,
    NearestJunction,
    NearestCorridor,
}

impl RecoveryStrategy {
    pub const fn name(self) -> &'static str {
        match self {
            RecoveryStrategy::Neighbor => "neighbor",
            RecoveryStrategy::NearestJunction => "nearest_junction",
            RecoveryStrategy::NearestCorridor => "nearest_corridor",
        }
    }
}

/// Result of a stuck check that found the agent stuck.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StuckRecovery {
    /// World-space center of the recovery tile, if any strategy produced one.
    pub waypoint: Option<WorldPos>,
    pub strategy: Option<RecoveryStrategy>,
    pub attempts: u32,
    /// Every strategy failed and the attempt cap is reached.
    pub fallback_to_legacy: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RoomTransition {
    None,
    Entered(RoomId),
    Exited(RoomId),
    Changed { from: RoomId, to: RoomId },
}

/// Which pattern to start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternRequest {
    /// Let `best_pattern_type()` decide.
    Auto,
    Specific(PatternType),
}

/// Movement hints for the tile an agent stands on.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NodeContext {
    pub node_type: NodeType,
    pub speed_multiplier: f32,
    /// Doorway, junction or chokepoint.
    pub strategic: bool,
}

/// Candidate for the anti-stuck recovery. `came_from` is skipped by the
/// neighbor strategy; reachability is checked against `target`.
fn recovery_waypoint(
    graph: &NavGraph,
    current: TileCoord,
    target: TileCoord,
    came_from: Option<TileCoord>,
) -> Option<(TileCoord, RecoveryStrategy)> {
    let neighbors: Vec<TileCoord> = match graph.node_at_tile(current) {
        Some(node) => node
            .neighbors
            .iter()
            .filter_map(|e| graph.node(e.to).map(|n| n.tile))
            .collect(),
        None => RING_OFFSETS
            .iter()
            .map(|&(dx, dy)| current.offset(dx, dy))
            .filter(|&t| graph.node_id_at(t).is_some())
            .collect(),
    };
    let best_neighbor = neighbors
        .into_iter()
        .filter(|&t| Some(t) != came_from)
        .filter(|&t| graph.has_path(t, target))
        .min_by(|a, b| {
            a.euclidean_distance(target)
                .total_cmp(&b.euclidean_distance(target))
        });
    if let Some(tile) = best_neighbor {
        return Some((tile, RecoveryStrategy::Neighbor));
    }

    for (node_type, strategy) in [
        (NodeType::Junction, RecoveryStrategy::NearestJunction),
        (NodeType::Corridor, RecoveryStrategy::NearestCorridor),
    ] {
        let nearest = graph
            .nodes_of_type(node_type)
            .filter(|n| n.tile != current)
            .min_by_key(|n| n.tile.manhattan_distance(current));
        if let Some(node) = nearest {
            return Some((node.tile, strategy));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Façade
// ---------------------------------------------------------------------------

pub struct NavIntegration<M: TileMap> {
    config: NavConfig,
    map: M,
    graph: NavGraph,
    engine: PathCheckEngine,
    sweeps: RoomSweepGenerator,
    agents: BTreeMap<AgentId, AgentNavState>,
    diagnostics: NavDiagnostics,
}

impl<M: TileMap> NavIntegration<M> {
    /// Build the graph for `map` and set up empty agent tracking.
    pub fn new(map: M, config: NavConfig) -> Self {
        let graph = NavGraph::build(&map, &config.graph);
        let diagnostics = NavDiagnostics {
            graph_builds: 1,
            last_build_us: graph.build_duration_us(),
            ..NavDiagnostics::default()
        };
        Self {
            engine: PathCheckEngine::new(config.patterns.clone()),
            sweeps: RoomSweepGenerator::new(config.sweeps.clone()),
            config,
            map,
            graph,
            agents: BTreeMap::new(),
            diagnostics,
        }
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn graph(&self) -> &NavGraph {
        &self.graph
    }

    pub fn diagnostics(&self) -> &NavDiagnostics {
        &self.diagnostics
    }

    /// Plain-data snapshot of the current graph.
    pub fn graph_dump(&self) -> GraphDump {
        self.graph.dump()
    }

    fn tile_size(&self) -> f32 {
        self.graph.geometry().tile_size
    }

    // -- Agent lifecycle --

    /// Start tracking an agent. Returns `false` if it was already registered.
    pub fn register_agent(&mut self, agent: AgentId) -> bool {
        if self.agents.contains_key(&agent) {
            return false;
        }
        self.agents.insert(agent, AgentNavState::default());
        self.diagnostics.agents_registered += 1;
        true
    }

    /// Stop tracking an agent and cancel its search. Returns `false` for an
    /// unknown agent.
    pub fn unregister_agent(&mut self, agent: AgentId, now_ms: u64) -> bool {
        if self.agents.remove(&agent).is_none() {
            return false;
        }
        self.engine.cancel_pattern(agent, now_ms);
        self.diagnostics.agents_unregistered += 1;
        true
    }

    pub fn agent_state(&self, agent: AgentId) -> Option<&AgentNavState> {
        self.agents.get(&agent)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Rebuild the graph from the current map. Cancels every pattern and
    /// resets every agent's transient state; registrations survive.
    pub fn rebuild_graph(&mut self, now_ms: u64) {
        self.graph.rebuild(&self.map);
        self.engine.clear_all(now_ms);
        for state in self.agents.values_mut() {
            *state = AgentNavState::default();
        }
        self.diagnostics.graph_builds += 1;
        self.diagnostics.last_build_us = self.graph.build_duration_us();
    }

    /// Swap in a new map and rebuild.
    pub fn replace_map(&mut self, map: M, now_ms: u64) {
        self.map = map;
        self.rebuild_graph(now_ms);
    }

    // -- Path validation --

    /// Check an agent's current path. `None` for an unknown agent.
    pub fn validate_path(
        &mut self,
        agent: AgentId,
        pos: WorldPos,
        path: &[WorldPos],
    ) -> Option<PathValidation> {
        let tile_size = self.tile_size();
        let threshold = self.config.integration.path_deviation_tiles;
        let state = self.agents.get_mut(&agent)?;

        let nearest = path
            .iter()
            .enumerate()
            .map(|(i, p)| (i, pos.distance(*p) / tile_size))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        let (nearest_index, deviation_tiles) = match nearest {
            Some((i, d)) => (Some(i), d),
            None => (None, f32::INFINITY),
        };
        let valid = nearest_index.is_some() && deviation_tiles <= threshold;
        state.replan_needed = !valid;

        self.diagnostics.path_validations += 1;
        if !valid {
            self.diagnostics.invalid_paths += 1;
        }
        Some(PathValidation {
            valid,
            replan_needed: !valid,
            nearest_index,
            deviation_tiles,
        })
    }

    // -- Anti-stuck --

    /// Run the stuck check for an agent heading to `target`. Returns `Some`
    /// only when a check interval has elapsed and the agent moved less than
    /// the stuck distance since the previous check.
    pub fn check_stuck(
        &mut self,
        agent: AgentId,
        pos: WorldPos,
        target: WorldPos,
        now_ms: u64,
    ) -> Option<StuckRecovery> {
        let params = &self.config.integration;
        let min_travel = params.stuck_distance_tiles * self.tile_size();
        let interval = params.stuck_check_interval_ms;
        let max_attempts = params.max_recovery_attempts;
        let current = self.graph.world_to_tile(pos);
        let target_tile = self.graph.world_to_tile(target);

        let state = self.agents.get_mut(&agent)?;
        state.track_tile(current);
        let (Some(last_pos), Some(last_check)) = (state.stuck.last_pos, state.stuck.last_check_ms)
        else {
            state.stuck.last_pos = Some(pos);
            state.stuck.last_check_ms = Some(now_ms);
            return None;
        };
        if now_ms.saturating_sub(last_check) < interval {
            return None;
        }

        state.stuck.last_pos = Some(pos);
        state.stuck.last_check_ms = Some(now_ms);
        self.diagnostics.stuck_checks += 1;
        if pos.distance(last_pos) >= min_travel {
            state.stuck.attempts = 0;
            return None;
        }

        state.stuck.attempts += 1;
        let attempts = state.stuck.attempts;
        let came_from = state.came_from;
        self.diagnostics.stuck_detections += 1;

        let found = recovery_waypoint(&self.graph, current, target_tile, came_from);
        let fallback_to_legacy = found.is_none() && attempts >= max_attempts;
        match found {
            Some((tile, strategy)) => {
                log::debug!(
                    "{agent}: stuck at {current}, recovering via {} to {tile}",
                    strategy.name()
                );
                self.diagnostics.record_recovery(strategy.name());
            }
            None if fallback_to_legacy => {
                log::warn!(
                    "{agent}: stuck at {current} after {attempts} attempts, falling back to legacy movement"
                );
                self.diagnostics.legacy_fallbacks += 1;
            }
            None => {}
        }

        Some(StuckRecovery {
            waypoint: found.map(|(tile, _)| self.graph.tile_to_world(tile)),
            strategy: found.map(|(_, s)| s),
            attempts,
            fallback_to_legacy,
        })
    }

    // -- Room transitions --

    /// Update an agent's room from its position. Entering a room attaches a
    /// standard sweep rooted at the entry tile (if enabled); leaving discards
    /// the active sweep. Unknown agents get `RoomTransition::None`.
    pub fn update_room(&mut self, agent: AgentId, pos: WorldPos) -> RoomTransition {
        let tile = self.graph.world_to_tile(pos);
        let room = self.graph.room_at_tile(tile).map(|r| r.id);
        let node_type = self.graph.node_type_at(tile);
        let auto_sweep = self.config.integration.auto_sweep_on_room_entry;

        let Some(state) = self.agents.get_mut(&agent) else {
            return RoomTransition::None;
        };
        state.track_tile(tile);
        state.last_node_type = node_type;
        let previous = state.last_room;
        state.last_room = room;

        let transition = match (previous, room) {
            (None, Some(to)) => RoomTransition::Entered(to),
            (Some(from), None) => RoomTransition::Exited(from),
            (Some(from), Some(to)) if from != to => RoomTransition::Changed { from, to },
            _ => RoomTransition::None,
        };

        match transition {
            RoomTransition::None => {}
            RoomTransition::Exited(from) => {
                state.active_sweep = None;
                state.sweep_index = 0;
                self.diagnostics.room_exits += 1;
                log::debug!("{agent}: exited {from}");
            }
            RoomTransition::Entered(to) | RoomTransition::Changed { to, .. } => {
                state.active_sweep = None;
                state.sweep_index = 0;
                if matches!(transition, RoomTransition::Changed { .. }) {
                    self.diagnostics.room_changes += 1;
                } else {
                    self.diagnostics.room_entries += 1;
                }
                log::debug!("{agent}: entered {to} at {tile}");
                let sweep = if auto_sweep {
                    self.sweeps
                        .generate(&self.graph, to, SweepType::Standard, Some(tile))
                } else {
                    None
                };
                if sweep.is_some() {
                    self.diagnostics.sweeps_started += 1;
                }
                state.active_sweep = sweep;
            }
        }
        transition
    }

    // -- Sweeps --

    /// Attach a sweep of the given shape for `room`. Returns the sweep, or
    /// `None` for an unknown agent or room.
    pub fn start_sweep(
        &mut self,
        agent: AgentId,
        room: RoomId,
        sweep_type: SweepType,
        entry: Option<TileCoord>,
    ) -> Option<&RoomSweep> {
        let sweep = self.sweeps.generate(&self.graph, room, sweep_type, entry)?;
        let state = self.agents.get_mut(&agent)?;
        state.active_sweep = Some(sweep);
        state.sweep_index = 0;
        self.diagnostics.sweeps_started += 1;
        state.active_sweep.as_ref()
    }

    /// Attach the adaptively chosen sweep for `room`.
    pub fn start_best_sweep(
        &mut self,
        agent: AgentId,
        room: RoomId,
        entry: Option<TileCoord>,
        urgency: Urgency,
    ) -> Option<&RoomSweep> {
        let sweep_type = best_sweep_type(self.graph.room(room)?, urgency);
        self.start_sweep(agent, room, sweep_type, entry)
    }

    /// Hand out the agent's next sweep point. The last point clears the sweep.
    pub fn next_sweep_point(&mut self, agent: AgentId) -> Option<PatternPoint> {
        let state = self.agents.get_mut(&agent)?;
        let sweep = state.active_sweep.as_ref()?;
        let point = sweep.points.get(state.sweep_index).copied();
        state.sweep_index += 1;
        if state.sweep_index >= sweep.points.len() {
            state.active_sweep = None;
            state.sweep_index = 0;
        }
        if point.is_some() {
            self.diagnostics.sweep_points_served += 1;
        }
        point
    }

    pub fn active_sweep(&self, agent: AgentId) -> Option<&RoomSweep> {
        self.agents.get(&agent)?.active_sweep.as_ref()
    }

    /// Discard the agent's sweep. Returns whether one was active.
    pub fn clear_sweep(&mut self, agent: AgentId) -> bool {
        let Some(state) = self.agents.get_mut(&agent) else {
            return false;
        };
        state.sweep_index = 0;
        state.active_sweep.take().is_some()
    }

    // -- Search façade --

    /// Start a search pattern for an agent at `pos`. With a known `target`,
    /// `Auto` always rings the target. Returns the chosen type, or `None` for
    /// an unknown agent.
    pub fn start_search(
        &mut self,
        agent: AgentId,
        request: PatternRequest,
        pos: WorldPos,
        target: Option<WorldPos>,
        now_ms: u64,
    ) -> Option<PatternType> {
        let origin = self.graph.world_to_tile(pos);
        let target = target.map(|t| self.graph.world_to_tile(t));
        let state = self.agents.get_mut(&agent)?;
        state.track_tile(origin);
        let came_from = state.came_from;

        let pattern_type = match request {
            PatternRequest::Auto => self.engine.start_best_pattern(
                &self.graph,
                agent,
                origin,
                target,
                came_from,
                now_ms,
            ),
            PatternRequest::Specific(pattern_type) => {
                let root = match pattern_type {
                    PatternType::ExpandingRing => target.unwrap_or(origin),
                    _ => origin,
                };
                let pattern = pattern::generate(
                    &self.graph,
                    pattern_type,
                    root,
                    came_from,
                    self.engine.params(),
                    now_ms,
                );
                self.engine.start_pattern(agent, pattern);
                pattern_type
            }
        };
        state.active_pattern = Some(pattern_type);
        self.diagnostics.searches_started += 1;
        Some(pattern_type)
    }

    pub fn next_search_point(&mut self, agent: AgentId, now_ms: u64) -> Option<PatternPoint> {
        let state = self.agents.get_mut(&agent)?;
        let point = self.engine.next_pattern_point(agent, now_ms);
        if !self.engine.has_active_pattern(agent, now_ms) {
            state.active_pattern = None;
        }
        if point.is_some() {
            self.diagnostics.search_points_served += 1;
        }
        point
    }

    /// Cancel the agent's search. Returns whether one was active.
    pub fn cancel_search(&mut self, agent: AgentId, now_ms: u64) -> bool {
        if let Some(state) = self.agents.get_mut(&agent) {
            state.active_pattern = None;
        }
        self.engine.cancel_pattern(agent, now_ms)
    }

    pub fn search_stats(&self) -> PatternStats {
        self.engine.stats()
    }

    /// Drop every timed-out search and clear it from its agent's state.
    /// Returns how many were dropped.
    pub fn expire_searches(&mut self, now_ms: u64) -> usize {
        let dropped = self.engine.expire_stale(now_ms);
        if dropped > 0 {
            for (&agent, state) in self.agents.iter_mut() {
                if state.active_pattern.is_some() && !self.engine.has_active_pattern(agent, now_ms) {
                    state.active_pattern = None;
                }
            }
        }
        dropped
    }

    // -- Node context --

    /// Movement hints at `pos`. Ungraphed positions get corridor defaults.
    pub fn node_context(&self, pos: WorldPos) -> NodeContext {
        let params = &self.config.integration;
        let Some(node) = self.graph.node_at_world(pos) else {
            return NodeContext {
                node_type: NodeType::Corridor,
                speed_multiplier: 1.0,
                strategic: false,
            };
        };
        let speed_multiplier = match node.node_type {
            NodeType::Corridor => params.corridor_speed_multiplier,
            NodeType::Chokepoint => params.chokepoint_speed_multiplier,
            _ => 1.0,
        };
        NodeContext {
            node_type: node.node_type,
            speed_multiplier,
            strategic: matches!(
                node.node_type,
                NodeType::Doorway | NodeType::Junction | NodeType::Chokepoint
            ),
        }
    }

    // -- Walkability --

    /// The map says walkable and the graph has a node there.
    pub fn is_walkable(&self, tile: TileCoord) -> bool {
        self.map.is_walkable(tile) && self.graph.node_id_at(tile).is_some()
    }

    /// `pos` itself if its tile is valid, else the center of the nearest
    /// valid tile within `radius` tiles, searched ring by ring.
    pub fn find_nearest_valid_position(&self, pos: WorldPos, radius: u32) -> Option<WorldPos> {
        let origin = self.graph.world_to_tile(pos);
        if self.is_walkable(origin) {
            return Some(pos);
        }
        for r in 1..=radius as i32 {
            let mut best: Option<(TileCoord, f32)> = None;
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx.abs() != r && dy.abs() != r {
                        continue;
                    }
                    let tile = origin.offset(dx, dy);
                    if !self.is_walkable(tile) {
                        continue;
                    }
                    let d = pos.distance(self.graph.tile_to_world(tile));
                    if best.is_none_or(|(_, bd)| d < bd) {
                        best = Some((tile, d));
                    }
                }
            }
            if let Some((tile, _)) = best {
                return Some(self.graph.tile_to_world(tile));
            }
        }
        None
    }

    /// Map every point onto a valid tile, dropping points with no valid tile
    /// within `valid_position_radius` and points that land on the same tile
    /// as the previous kept point.
    pub fn sanitize_path(&mut self, path: &[WorldPos]) -> Vec<WorldPos> {
        let radius = self.config.integration.valid_position_radius;
        let mut out: Vec<WorldPos> = Vec::with_capacity(path.len());
        let mut last_tile = None;
        for &p in path {
            let Some(valid) = self.find_nearest_valid_position(p, radius) else {
                self.diagnostics.path_points_dropped += 1;
                continue;
            };
            if valid != p {
                self.diagnostics.position_corrections += 1;
            }
            let tile = self.graph.world_to_tile(valid);
            if last_tile == Some(tile) {
                continue;
            }
            last_tile = Some(tile);
            out.push(valid);
        }
        out
    }
}
