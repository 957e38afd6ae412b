// Search patterns: deterministic point sequences for searching without a
// known target, plus their per-agent lifecycle.
//
// Four generators read a `NavGraph` and emit an ordered, priority-weighted,
// tile-deduplicated list of `PatternPoint`s capped at `max_pattern_points`:
//
// - **Lane sweep** (`lane_sweep()`): walk the origin's corridor component
//   along its long axis, emitting every `lane_stride`-th node plus side checks
//   at ±`lane_offset` tiles that are themselves in the component.
// - **Branch check** (`branch_check()`): from a junction, follow each exit
//   (except the one the agent arrived from) until the next junction, doorway
//   or dead end, and emit branch endpoints and midpoints.
// - **Expanding ring** (`expanding_ring()`): concentric rings sampled at fixed
//   angles, snapped to the nearest node, each ring ordered by strategic value.
// - **Corridor search** (`corridor_search()`): straight cardinal walks with
//   priority decaying per tile.
//
// `best_pattern_type()` picks a generator from the origin's node type (or
// forces an expanding ring when a last-known target is given).
// `PathCheckEngine` holds at most one active pattern per agent in a
// `BTreeMap<AgentId, SearchPattern>`, hands points out through a cursor, and
// discards a pattern when it is exhausted, cancelled, replaced, or found
// expired on access. Finished patterns leave a `PatternRecord` in a bounded
// history used only for statistics.
//
// See also: `nav.rs` for the graph queries the generators use, `sweep.rs`
// for the room-scoped counterpart, `integration.rs` for the search façade.
//
// **Critical constraint: determinism.** Ring angles are fixed (`2πk/n`),
// every sort is stable with explicit tie-breaks, and `FxHashSet` is used for
// membership tests only, never iterated.

use crate::config::PatternParams;
use crate::nav::{NavGraph, NavNode};
use crate::types::{AgentId, CARDINAL_OFFSETS, NodeType, TileCoord, WorldPos};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

// ---------------------------------------------------------------------------
// Pattern data
// ---------------------------------------------------------------------------

/// Which generator produced a pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PatternType {
    LaneSweep,
    BranchCheck,
    ExpandingRing,
    CorridorSearch,
    /// Just the origin. Used at dead ends.
    SinglePoint,
}

/// One point of a search pattern.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PatternPoint {
    pub tile: TileCoord,
    /// World-space center of `tile`.
    pub world: WorldPos,
    pub priority: f32,
}

/// An ordered point sequence with a read cursor.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchPattern {
    pub pattern_type: PatternType,
    pub points: Vec<PatternPoint>,
    pub origin: TileCoord,
    /// Index of the next point to hand out.
    pub cursor: usize,
    pub created_ms: u64,
    pub completed: bool,
}

impl SearchPattern {
    pub fn new(
        pattern_type: PatternType,
        origin: TileCoord,
        points: Vec<PatternPoint>,
        now_ms: u64,
    ) -> Self {
        Self {
            pattern_type,
            points,
            origin,
            cursor: 0,
            created_ms: now_ms,
            completed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points not yet handed out.
    pub fn remaining(&self) -> usize {
        self.points.len().saturating_sub(self.cursor)
    }

    pub fn is_expired(&self, now_ms: u64, timeout_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_ms) >= timeout_ms
    }
}

/// How a pattern left the active set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PatternOutcome {
    Completed,
    Cancelled,
    TimedOut,
    /// Overwritten by a new `start_pattern()` for the same agent.
    Replaced,
}

/// History entry for a finished pattern.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatternRecord {
    pub agent: AgentId,
    pub pattern_type: PatternType,
    pub outcome: PatternOutcome,
    pub points_served: usize,
    pub total_points: usize,
    pub duration_ms: u64,
}

/// Aggregate lifecycle counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PatternStats {
    pub started: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub timed_out: u64,
    pub replaced: u64,
    /// Patterns currently held by agents.
    pub active: usize,
}

// ---------------------------------------------------------------------------
// Point collection helper
// ---------------------------------------------------------------------------

/// Accumulates points, dropping repeated tiles. First occurrence wins.
struct PointSet<'g> {
    graph: &'g NavGraph,
    points: Vec<PatternPoint>,
    seen: FxHashSet<TileCoord>,
}

impl<'g> PointSet<'g> {
    fn new(graph: &'g NavGraph) -> Self {
        Self {
            graph,
            points: Vec::new(),
            seen: FxHashSet::default(),
        }
    }

    fn contains(&self, tile: TileCoord) -> bool {
        self.seen.contains(&tile)
    }

    fn push(&mut self, tile: TileCoord, priority: f32) -> bool {
        if !self.seen.insert(tile) {
            return false;
        }
        self.points.push(PatternPoint {
            tile,
            world: self.graph.tile_to_world(tile),
            priority,
        });
        true
    }

    /// Stable sort by priority, highest first.
    fn sort_descending(&mut self) {
        self.points.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    }

    fn finish(mut self, cap: usize) -> Vec<PatternPoint> {
        self.points.truncate(cap);
        self.points
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Lane sweep along the origin's corridor component. Empty when the origin is
/// not graphed.
pub fn lane_sweep(graph: &NavGraph, origin: TileCoord, params: &PatternParams) -> Vec<PatternPoint> {
    let Some(node) = graph.node_at_tile(origin) else {
        return Vec::new();
    };
    let axis = node.width.long_axis();
    let cross = axis.perpendicular();

    let mut lane: Vec<TileCoord> = graph
        .corridor_component(origin)
        .iter()
        .filter_map(|&id| graph.node(id).map(|n| n.tile))
        .collect();
    lane.sort_by_key(|t| (axis.component(*t), cross.component(*t)));
    let members: FxHashSet<TileCoord> = lane.iter().copied().collect();

    let stride = params.lane_stride.max(1);
    let (cx, cy) = cross.step();
    let offset = params.lane_offset;
    let mut set = PointSet::new(graph);
    let last = lane.len().saturating_sub(1);
    for (i, &tile) in lane.iter().enumerate() {
        if i % stride != 0 && i != last {
            continue;
        }
        set.push(tile, 1.0);
        for side in [-offset, offset] {
            let check = tile.offset(cx * side, cy * side);
            if members.contains(&check) {
                set.push(check, 0.7);
            }
        }
    }
    set.finish(params.max_pattern_points)
}

/// Walk one branch starting with the step `from → first`. Stops at the depth
/// cap, at a junction, doorway or dead end (inclusive), or when no forward
/// neighbor remains.
fn walk_branch<'g>(
    graph: &'g NavGraph,
    from: &'g NavNode,
    first: &'g NavNode,
    max_depth: usize,
) -> Vec<&'g NavNode> {
    let mut path = vec![first];
    let mut visited: FxHashSet<TileCoord> = [from.tile, first.tile].into_iter().collect();
    let mut prev = from;
    let mut current = first;

    while path.len() < max_depth
        && !matches!(
            current.node_type,
            NodeType::Junction | NodeType::Doorway | NodeType::DeadEnd
        )
    {
        let heading = (current.tile.x - prev.tile.x, current.tile.y - prev.tile.y);
        let next = current
            .neighbors
            .iter()
            .filter_map(|e| graph.node(e.to).map(|n| (e, n)))
            .filter(|(_, n)| !visited.contains(&n.tile))
            .min_by(|(ea, a), (eb, b)| {
                let turn_a = (a.tile.x - current.tile.x, a.tile.y - current.tile.y) != heading;
                let turn_b = (b.tile.x - current.tile.x, b.tile.y - current.tile.y) != heading;
                turn_a
                    .cmp(&turn_b)
                    .then(ea.cost.total_cmp(&eb.cost))
                    .then(a.id.cmp(&b.id))
            })
            .map(|(_, n)| n);
        let Some(next) = next else {
            break;
        };
        visited.insert(next.tile);
        path.push(next);
        prev = current;
        current = next;
    }
    path
}

/// Branch check from a junction. `came_from` names the tile the agent
/// arrived from; that exit is skipped. Falls back to the origin alone when no
/// branch qualifies. Empty when the origin is not graphed.
pub fn branch_check(
    graph: &NavGraph,
    origin: TileCoord,
    came_from: Option<TileCoord>,
    params: &PatternParams,
) -> Vec<PatternPoint> {
    let Some(start) = graph.node_at_tile(origin) else {
        return Vec::new();
    };

    let mut set = PointSet::new(graph);
    for edge in &start.neighbors {
        let Some(first) = graph.node(edge.to) else {
            continue;
        };
        if Some(first.tile) == came_from {
            continue;
        }
        let branch = walk_branch(graph, start, first, params.branch_max_depth.max(1));
        if branch.len() < params.branch_min_length {
            continue;
        }
        let average =
            branch.iter().map(|n| n.strategic_value).sum::<f32>() / branch.len() as f32;
        if let Some(end) = branch.last() {
            set.push(end.tile, average);
        }
        if branch.len() > 3 {
            set.push(branch[branch.len() / 2].tile, 0.8 * average);
        }
    }

    if set.points.is_empty() {
        set.push(origin, 1.0);
    }
    set.sort_descending();
    set.finish(params.max_pattern_points)
}

/// Nearest node to `tile` within `radius` tiles (Euclidean, then scan order).
fn snap_to_node(graph: &NavGraph, tile: TileCoord, radius: i32) -> Option<&NavNode> {
    if let Some(node) = graph.node_at_tile(tile) {
        return Some(node);
    }
    let mut best: Option<(&NavNode, f32)> = None;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let Some(node) = graph.node_at_tile(tile.offset(dx, dy)) else {
                continue;
            };
            let d = ((dx * dx + dy * dy) as f32).sqrt();
            if d > radius as f32 {
                continue;
            }
            let better = match best {
                None => true,
                Some((b, bd)) => d < bd || (d == bd && node.id < b.id),
            };
            if better {
                best = Some((node, d));
            }
        }
    }
    best.map(|(n, _)| n)
}

/// Expanding rings around `center` out to `max_radius`. The center leads at
/// priority 2; a walled center snaps to the nearest node like ring samples do.
pub fn expanding_ring(
    graph: &NavGraph,
    center: TileCoord,
    max_radius: u32,
    params: &PatternParams,
) -> Vec<PatternPoint> {
    let mut set = PointSet::new(graph);
    if let Some(node) = snap_to_node(graph, center, params.ring_snap_radius) {
        set.push(node.tile, 2.0);
    }

    let step = params.ring_step.max(1);
    let mut radius = params.ring_initial_radius.max(1);
    let mut ring_index = 0u32;
    while radius <= max_radius && set.points.len() < params.max_pattern_points {
        let samples = (params.ring_samples_per_radius * radius).max(8);
        let mut ring: Vec<&NavNode> = Vec::new();
        let mut ring_seen: FxHashSet<TileCoord> = FxHashSet::default();
        for k in 0..samples {
            let angle = std::f32::consts::TAU * k as f32 / samples as f32;
            let sample = center.offset(
                (radius as f32 * angle.cos()).round() as i32,
                (radius as f32 * angle.sin()).round() as i32,
            );
            let Some(node) = snap_to_node(graph, sample, params.ring_snap_radius) else {
                continue;
            };
            if !set.contains(node.tile) && ring_seen.insert(node.tile) {
                ring.push(node);
            }
        }

        ring.sort_by(|a, b| b.strategic_value.total_cmp(&a.strategic_value));
        let falloff = 1.0 / (1.0 + 0.25 * ring_index as f32);
        for node in ring {
            set.push(node.tile, node.strategic_value * falloff);
        }

        radius += step;
        ring_index += 1;
    }
    set.finish(params.max_pattern_points)
}

/// Straight walks N, E, S, W from the origin with priority decaying per tile.
/// Each walk stops at a wall or after including a junction or doorway.
pub fn corridor_search(graph: &NavGraph, origin: TileCoord, params: &PatternParams) -> Vec<PatternPoint> {
    let mut set = PointSet::new(graph);
    if graph.node_at_tile(origin).is_none() {
        return Vec::new();
    }
    set.push(origin, 1.0);

    for &(dx, dy) in &CARDINAL_OFFSETS {
        for k in 1..=params.corridor_search_depth as i32 {
            let tile = origin.offset(dx * k, dy * k);
            let Some(node) = graph.node_at_tile(tile) else {
                break;
            };
            set.push(tile, params.corridor_search_decay.powi(k));
            if matches!(node.node_type, NodeType::Junction | NodeType::Doorway) {
                break;
            }
        }
    }

    set.sort_descending();
    set.finish(params.max_pattern_points)
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Pick a generator. A known target always forces an expanding ring around
/// it; otherwise the origin's node type decides.
pub fn best_pattern_type(graph: &NavGraph, origin: TileCoord, target: Option<TileCoord>) -> PatternType {
    if target.is_some() {
        return PatternType::ExpandingRing;
    }
    match graph.node_type_at(origin) {
        Some(NodeType::Junction) => PatternType::BranchCheck,
        Some(NodeType::Corridor | NodeType::Chokepoint) => PatternType::LaneSweep,
        Some(NodeType::Doorway) => PatternType::CorridorSearch,
        Some(NodeType::RoomInterior) => PatternType::ExpandingRing,
        Some(NodeType::DeadEnd) => PatternType::SinglePoint,
        None => PatternType::ExpandingRing,
    }
}

/// Generate a pattern of the given type rooted at `origin`. Expanding rings
/// centered on a room interior tile use the wide radius.
pub fn generate(
    graph: &NavGraph,
    pattern_type: PatternType,
    origin: TileCoord,
    came_from: Option<TileCoord>,
    params: &PatternParams,
    now_ms: u64,
) -> SearchPattern {
    let points = match pattern_type {
        PatternType::LaneSweep => lane_sweep(graph, origin, params),
        PatternType::BranchCheck => branch_check(graph, origin, came_from, params),
        PatternType::ExpandingRing => {
            let radius = if graph.node_type_at(origin) == Some(NodeType::RoomInterior) {
                params.ring_wide_max_radius
            } else {
                params.ring_max_radius
            };
            expanding_ring(graph, origin, radius, params)
        }
        PatternType::CorridorSearch => corridor_search(graph, origin, params),
        PatternType::SinglePoint => {
            let mut set = PointSet::new(graph);
            if graph.node_at_tile(origin).is_some() {
                set.push(origin, 1.0);
            }
            set.finish(params.max_pattern_points)
        }
    };
    SearchPattern::new(pattern_type, origin, points, now_ms)
}

/// The pattern `best_pattern_type()` would choose, generated. With a target
/// the ring is centered on the target instead of the origin.
pub fn best_pattern(
    graph: &NavGraph,
    origin: TileCoord,
    target: Option<TileCoord>,
    came_from: Option<TileCoord>,
    params: &PatternParams,
    now_ms: u64,
) -> SearchPattern {
    let pattern_type = best_pattern_type(graph, origin, target);
    let root = target.unwrap_or(origin);
    generate(graph, pattern_type, root, came_from, params, now_ms)
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Per-agent pattern tracking.
#[derive(Clone, Debug, Default)]
pub struct PathCheckEngine {
    params: PatternParams,
    active: BTreeMap<AgentId, SearchPattern>,
    history: VecDeque<PatternRecord>,
    stats: PatternStats,
}

impl PathCheckEngine {
    pub fn new(params: PatternParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn params(&self) -> &PatternParams {
        &self.params
    }

    /// Register `pattern` as the agent's active pattern, replacing any
    /// previous one. Returns the number of points.
    pub fn start_pattern(&mut self, agent: AgentId, pattern: SearchPattern) -> usize {
        let len = pattern.len();
        let created = pattern.created_ms;
        log::debug!(
            "{agent}: starting {:?} pattern at {} with {len} points",
            pattern.pattern_type,
            pattern.origin
        );
        if let Some(old) = self.active.insert(agent, pattern) {
            self.record(agent, &old, PatternOutcome::Replaced, created);
        }
        self.stats.started += 1;
        len
    }

    /// Generate and start the best pattern for an agent. Returns its type.
    pub fn start_best_pattern(
        &mut self,
        graph: &NavGraph,
        agent: AgentId,
        origin: TileCoord,
        target: Option<TileCoord>,
        came_from: Option<TileCoord>,
        now_ms: u64,
    ) -> PatternType {
        let pattern = best_pattern(graph, origin, target, came_from, &self.params, now_ms);
        let pattern_type = pattern.pattern_type;
        self.start_pattern(agent, pattern);
        pattern_type
    }

    /// Hand out the agent's next point. The last point completes the pattern
    /// and removes it; an expired pattern is removed and yields `None`.
    pub fn next_pattern_point(&mut self, agent: AgentId, now_ms: u64) -> Option<PatternPoint> {
        if self.discard_if_expired(agent, now_ms) {
            return None;
        }
        let pattern = self.active.get_mut(&agent)?;
        let point = pattern.points.get(pattern.cursor).copied();
        if point.is_some() {
            pattern.cursor += 1;
        }
        if pattern.cursor >= pattern.points.len() {
            pattern.completed = true;
            if let Some(done) = self.active.remove(&agent) {
                self.record(agent, &done, PatternOutcome::Completed, now_ms);
            }
        }
        point
    }

    /// Discard the agent's pattern. Returns whether one was active.
    pub fn cancel_pattern(&mut self, agent: AgentId, now_ms: u64) -> bool {
        match self.active.remove(&agent) {
            Some(pattern) => {
                self.record(agent, &pattern, PatternOutcome::Cancelled, now_ms);
                true
            }
            None => false,
        }
    }

    /// The agent's live pattern. An expired one is discarded first.
    pub fn active_pattern(&mut self, agent: AgentId, now_ms: u64) -> Option<&SearchPattern> {
        self.discard_if_expired(agent, now_ms);
        self.active.get(&agent)
    }

    pub fn has_active_pattern(&mut self, agent: AgentId, now_ms: u64) -> bool {
        self.active_pattern(agent, now_ms).is_some()
    }

    /// `(points handed out, total points)` for the agent's pattern.
    pub fn pattern_progress(&self, agent: AgentId) -> Option<(usize, usize)> {
        self.active.get(&agent).map(|p| (p.cursor, p.len()))
    }

    /// Discard every expired pattern. Returns how many were dropped.
    pub fn expire_stale(&mut self, now_ms: u64) -> usize {
        let timeout = self.params.pattern_timeout_ms;
        let stale: Vec<AgentId> = self
            .active
            .iter()
            .filter(|(_, p)| p.is_expired(now_ms, timeout))
            .map(|(&a, _)| a)
            .collect();
        for &agent in &stale {
            self.discard_if_expired(agent, now_ms);
        }
        stale.len()
    }

    /// Drop every active pattern, recorded as cancelled.
    pub fn clear_all(&mut self, now_ms: u64) {
        let active = std::mem::take(&mut self.active);
        for (agent, pattern) in &active {
            self.record(*agent, pattern, PatternOutcome::Cancelled, now_ms);
        }
    }

    /// Finished patterns, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &PatternRecord> + '_ {
        self.history.iter()
    }

    pub fn stats(&self) -> PatternStats {
        PatternStats {
            active: self.active.len(),
            ..self.stats
        }
    }

    fn discard_if_expired(&mut self, agent: AgentId, now_ms: u64) -> bool {
        let timeout = self.params.pattern_timeout_ms;
        let expired = self
            .active
            .get(&agent)
            .is_some_and(|p| p.is_expired(now_ms, timeout));
        if !expired {
            return false;
        }
        if let Some(pattern) = self.active.remove(&agent) {
            log::debug!("{agent}: {:?} pattern timed out", pattern.pattern_type);
            self.record(agent, &pattern, PatternOutcome::TimedOut, now_ms);
        }
        true
    }

    fn record(&mut self, agent: AgentId, pattern: &SearchPattern, outcome: PatternOutcome, now_ms: u64) {
        match outcome {
            PatternOutcome::Completed => self.stats.completed += 1,
            PatternOutcome::Cancelled => self.stats.cancelled += 1,
            PatternOutcome::TimedOut => self.stats.timed_out += 1,
            PatternOutcome::Replaced => self.stats.replaced += 1,
        }
        if self.params.history_capacity == 0 {
            return;
        }
        while self.history.len() >= self.params.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(PatternRecord {
            agent,
            pattern_type: pattern.pattern_type,
            outcome,
            points_served: pattern.cursor,
            total_points: pattern.len(),
            duration_ms: now_ms.saturating_sub(pattern.created_ms),
        });
    }
}
