// Navigation graph: semantic nodes built from a tile map.
//
// The graph is a set of `NavNode`s (one per walkable tile) connected by
// weighted `NavEdge`s, grouped into `Room`s. It is built by
// `NavGraph::build()` in five fixed phases and rebuilt wholesale, never
// patched, by `rebuild()`:
//
// 1. **Node creation**: one node per walkable tile, IDs assigned in row-major
//    scan order (y outer, x inner). A dense tile→node index gives O(1) lookup.
// 2. **Neighbor connection**: up to 8 edges per node. Orthogonal edges cost 1,
//    diagonal edges cost √2. A diagonal edge requires both orthogonal flanking
//    tiles to be nodes (no corner cutting), so adjacency is symmetric.
// 3. **Classification**: connectivity first (one edge → DeadEnd; at least
//    `junction_min_connections` distinct passages around the node →
//    Junction), then the contiguous open span through the node on each axis
//    decides Corridor / Doorway / RoomInterior.
// 4. **Room detection**: BFS flood fill over RoomInterior/Junction nodes;
//    components of at least `room_min_area` nodes become rooms.
// 5. **Strategic pass**: narrow corridor/doorway nodes with edges on both
//    axes are promoted to Chokepoint, then every node gets its strategic
//    value.
//
// "Distinct passages" is the larger of two counts. Ring runs are the separate
// open runs in the node's connected 8-neighbor ring: a tile in the middle of a
// room has a fully open ring (zero runs), a T-intersection of 1-wide corridors
// has three. Corridor arms are the cardinal directions in which a passage no
// wider than `corridor_width_max` starts within that many tiles; they catch
// crossings of 2- and 3-wide corridors, whose rings are fully open.
//
// All storage uses `Vec` indexed by `NavNodeId`/`RoomId`. All point queries
// return `None`/empty for out-of-grid or ungraphed tiles.
//
// See also: `reachability.rs` for the BFS queries, `tiles.rs` for the
// `TileMap` adapter the graph is built from, `diagnostics.rs` for the plain
// data dump, `pattern.rs` and `sweep.rs` which read the graph.
//
// **Critical constraint: determinism.** The graph is a pure function of the
// tile grid and `GraphParams`. Rebuilding on an unchanged grid yields the same
// node IDs, types, rooms and values.

use crate::config::GraphParams;
use crate::diagnostics::{EdgeSnapshot, GraphDump, NodeSnapshot, RoomSnapshot};
use crate::reachability;
use crate::tiles::{TileGeometry, TileMap};
use crate::types::{
    Axis, CARDINAL_OFFSETS, NavNodeId, NodeType, RING_OFFSETS, RoomId, TileCoord, WorldPos,
};
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::time::Instant;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A weighted edge to a neighboring node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NavEdge {
    pub to: NavNodeId,
    /// 1.0 for orthogonal steps, √2 for diagonal steps.
    pub cost: f32,
}

/// Contiguous open span through a tile on each axis, in tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LocalWidth {
    pub x: u32,
    pub y: u32,
    /// The tile is the elbow of a 1-wide turn: two cardinal neighbors on
    /// different axes with no diagonal between them.
    pub elbow: bool,
}

impl LocalWidth {
    /// Span along `axis`.
    pub fn span(&self, axis: Axis) -> u32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    /// Width of the passage at this tile. An elbow is 1 wide even though both
    /// of its axis spans run down the two arms of the turn.
    pub fn narrow(&self) -> u32 {
        if self.elbow { 1 } else { self.x.min(self.y) }
    }

    /// The axis of travel. Ties go to X.
    pub fn long_axis(&self) -> Axis {
        if self.x >= self.y { Axis::X } else { Axis::Y }
    }
}

/// A node in the navigation graph: one walkable tile.
#[derive(Clone, Debug, Serialize)]
pub struct NavNode {
    pub id: NavNodeId,
    pub tile: TileCoord,
    pub node_type: NodeType,
    /// Neighbor edges in ring order (N, NE, E, SE, S, SW, W, NW).
    pub neighbors: SmallVec<[NavEdge; 8]>,
    pub room: Option<RoomId>,
    pub strategic_value: f32,
    pub walkable: bool,
    pub width: LocalWidth,
}

impl NavNode {
    /// Number of neighbor edges.
    pub fn connections(&self) -> usize {
        self.neighbors.len()
    }
}

/// A flood-fill-detected cluster of open interior nodes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Room {
    pub id: RoomId,
    /// Min corner of the tile bounding box (inclusive).
    pub min: TileCoord,
    /// Max corner of the tile bounding box (inclusive).
    pub max: TileCoord,
    /// Member tile closest to the mean member position.
    pub center: TileCoord,
    /// Member nodes in BFS discovery order.
    pub nodes: Vec<NavNodeId>,
    /// Doorway nodes adjacent to any member, sorted by ID.
    pub doorways: Vec<NavNodeId>,
    /// Number of member nodes.
    pub area: usize,
}

impl Room {
    /// Bounding box width in tiles.
    pub fn width(&self) -> u32 {
        (self.max.x - self.min.x + 1) as u32
    }

    /// Bounding box height in tiles.
    pub fn height(&self) -> u32 {
        (self.max.y - self.min.y + 1) as u32
    }

    /// Whether `tile` lies within the bounding box (not necessarily a member).
    pub fn bounds_contain(&self, tile: TileCoord) -> bool {
        tile.x >= self.min.x && tile.x <= self.max.x && tile.y >= self.min.y && tile.y <= self.max.y
    }
}

/// The navigation graph container.
#[derive(Clone, Debug, Default)]
pub struct NavGraph {
    nodes: Vec<NavNode>,
    rooms: Vec<Room>,
    /// Flat tile→node index: index = x + y * width.
    tile_index: Vec<Option<NavNodeId>>,
    width: u32,
    height: u32,
    geometry: TileGeometry,
    params: GraphParams,
    by_type: BTreeMap<NodeType, Vec<NavNodeId>>,
    build_duration_us: u64,
}

// ---------------------------------------------------------------------------
// Build pipeline
// ---------------------------------------------------------------------------

impl NavGraph {
    /// Build a graph from a tile map. A map without walkable tiles yields an
    /// empty graph.
    pub fn build<M: TileMap + ?Sized>(map: &M, params: &GraphParams) -> Self {
        let started = Instant::now();
        let mut graph = Self {
            width: map.width(),
            height: map.height(),
            geometry: map.geometry(),
            params: params.clone(),
            ..Self::default()
        };

        graph.create_nodes(map);
        graph.connect_neighbors();
        graph.classify_nodes();
        graph.detect_rooms();
        graph.apply_strategic_pass();
        graph.index_types();

        graph.build_duration_us = started.elapsed().as_micros() as u64;
        log::info!(
            "nav graph built: {} nodes, {} rooms, {} doorways, {} chokepoints in {}us",
            graph.nodes.len(),
            graph.rooms.len(),
            graph.doorways().len(),
            graph.chokepoints().len(),
            graph.build_duration_us,
        );
        graph
    }

    /// Discard everything and rebuild from `map` with the same parameters.
    pub fn rebuild<M: TileMap + ?Sized>(&mut self, map: &M) {
        let params = self.params.clone();
        *self = Self::build(map, &params);
    }

    /// Phase 1: one node per walkable tile.
    fn create_nodes<M: TileMap + ?Sized>(&mut self, map: &M) {
        let total = self.width as usize * self.height as usize;
        self.tile_index = vec![None; total];
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let tile = TileCoord::new(x, y);
                if !map.is_walkable(tile) {
                    continue;
                }
                let id = NavNodeId(self.nodes.len() as u32);
                self.nodes.push(NavNode {
                    id,
                    tile,
                    node_type: NodeType::RoomInterior,
                    neighbors: SmallVec::new(),
                    room: None,
                    strategic_value: 0.0,
                    walkable: true,
                    width: LocalWidth::default(),
                });
                if let Some(i) = self.flat_index(tile) {
                    self.tile_index[i] = Some(id);
                }
            }
        }
    }

    /// Phase 2: 8-direction edges without corner cutting.
    fn connect_neighbors(&mut self) {
        for i in 0..self.nodes.len() {
            let tile = self.nodes[i].tile;
            let mut neighbors = SmallVec::new();
            for &(dx, dy) in &RING_OFFSETS {
                if !self.connected(tile, dx, dy) {
                    continue;
                }
                if let Some(to) = self.node_id_at(tile.offset(dx, dy)) {
                    let cost = if dx != 0 && dy != 0 {
                        std::f32::consts::SQRT_2
                    } else {
                        1.0
                    };
                    neighbors.push(NavEdge { to, cost });
                }
            }
            self.nodes[i].neighbors = neighbors;
        }
    }

    /// Phase 3: connectivity roles first, then width-based roles.
    fn classify_nodes(&mut self) {
        let limit = self.params.width_scan_limit.max(1);
        let widths: Vec<LocalWidth> = self
            .nodes
            .iter()
            .map(|n| self.measure_width(n.tile, limit))
            .collect();
        for (node, width) in self.nodes.iter_mut().zip(widths) {
            node.width = width;
        }

        let junction_min = self.params.junction_min_connections as usize;
        let mut roles: Vec<Option<NodeType>> = self
            .nodes
            .iter()
            .map(|n| {
                if n.connections() == 1 {
                    Some(NodeType::DeadEnd)
                } else if self.passage_count(n) >= junction_min {
                    Some(NodeType::Junction)
                } else {
                    None
                }
            })
            .collect();

        for i in 0..self.nodes.len() {
            if roles[i].is_none() {
                roles[i] = Some(self.classify_by_width(i, &roles));
            }
        }

        for (node, role) in self.nodes.iter_mut().zip(roles) {
            node.node_type = role.unwrap_or(NodeType::RoomInterior);
        }
    }

    fn classify_by_width(&self, i: usize, roles: &[Option<NodeType>]) -> NodeType {
        let p = &self.params;
        let node = &self.nodes[i];
        let narrow = node.width.narrow();

        if narrow >= p.corridor_width_min
            && narrow <= p.corridor_width_max
            && self.stays_narrow(node, roles)
        {
            return NodeType::Corridor;
        }

        // Spans are measured to the first wall, so a narrow span is always
        // closed at both ends.
        if narrow <= p.doorway_max_width
            && node.width.span(node.width.long_axis()) >= p.doorway_min_open
        {
            return NodeType::Doorway;
        }

        NodeType::RoomInterior
    }

    /// A corridor stays narrow one step each way along its direction of
    /// travel. Neighbors that are walls, junctions or dead ends don't count
    /// against it.
    fn stays_narrow(&self, node: &NavNode, roles: &[Option<NodeType>]) -> bool {
        let max = self.params.corridor_width_max;
        let mut checks: SmallVec<[(TileCoord, Axis); 2]> = SmallVec::new();
        if node.width.elbow {
            for &(dx, dy) in &CARDINAL_OFFSETS {
                if self.node_id_at(node.tile.offset(dx, dy)).is_some() {
                    let travel = if dx != 0 { Axis::X } else { Axis::Y };
                    checks.push((node.tile.offset(dx, dy), travel));
                }
            }
        } else {
            let long = node.width.long_axis();
            let (sx, sy) = long.step();
            checks.push((node.tile.offset(-sx, -sy), long));
            checks.push((node.tile.offset(sx, sy), long));
        }

        checks.iter().all(|&(tile, travel)| {
            let Some(id) = self.node_id_at(tile) else {
                return true;
            };
            let idx = id.0 as usize;
            if matches!(roles[idx], Some(NodeType::Junction | NodeType::DeadEnd)) {
                return true;
            }
            self.nodes[idx].width.span(travel.perpendicular()) <= max
        })
    }

    /// Phase 4: flood fill rooms over RoomInterior/Junction nodes.
    fn detect_rooms(&mut self) {
        let mut visited = vec![false; self.nodes.len()];
        let mut rooms = Vec::new();

        for i in 0..self.nodes.len() {
            if visited[i] || !self.nodes[i].node_type.is_room_member() {
                continue;
            }
            let component =
                reachability::flood_fill(self, NavNodeId(i as u32), |n| n.node_type.is_room_member());
            for id in &component {
                visited[id.0 as usize] = true;
            }
            if component.len() < self.params.room_min_area.max(1) {
                continue;
            }
            let room_id = RoomId(rooms.len() as u32);
            rooms.push(self.make_room(room_id, component));
        }

        for room in &rooms {
            for id in &room.nodes {
                self.nodes[id.0 as usize].room = Some(room.id);
            }
        }
        self.rooms = rooms;
    }

    fn make_room(&self, id: RoomId, members: Vec<NavNodeId>) -> Room {
        let tiles: Vec<TileCoord> = members.iter().map(|m| self.nodes[m.0 as usize].tile).collect();
        let min = TileCoord::new(
            tiles.iter().map(|t| t.x).min().unwrap_or(0),
            tiles.iter().map(|t| t.y).min().unwrap_or(0),
        );
        let max = TileCoord::new(
            tiles.iter().map(|t| t.x).max().unwrap_or(0),
            tiles.iter().map(|t| t.y).max().unwrap_or(0),
        );

        let count = tiles.len().max(1) as f32;
        let mean_x = tiles.iter().map(|t| t.x as f32).sum::<f32>() / count;
        let mean_y = tiles.iter().map(|t| t.y as f32).sum::<f32>() / count;
        // Lowest node ID wins ties so the center is stable across rebuilds.
        let mut ordered = members.clone();
        ordered.sort();
        let center = ordered
            .iter()
            .map(|m| self.nodes[m.0 as usize].tile)
            .min_by(|a, b| {
                let da = (a.x as f32 - mean_x).powi(2) + (a.y as f32 - mean_y).powi(2);
                let db = (b.x as f32 - mean_x).powi(2) + (b.y as f32 - mean_y).powi(2);
                da.total_cmp(&db)
            })
            .unwrap_or(min);

        let mut doorways: Vec<NavNodeId> = members
            .iter()
            .flat_map(|m| self.nodes[m.0 as usize].neighbors.iter())
            .map(|e| e.to)
            .filter(|to| self.nodes[to.0 as usize].node_type == NodeType::Doorway)
            .collect();
        doorways.sort();
        doorways.dedup();

        Room {
            id,
            min,
            max,
            center,
            area: members.len(),
            nodes: members,
            doorways,
        }
    }

    /// Phase 5: chokepoint promotion, then strategic values.
    fn apply_strategic_pass(&mut self) {
        let max_width = self.params.chokepoint_max_width;
        let promoted: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.node_type, NodeType::Corridor | NodeType::Doorway))
            .filter(|(_, n)| n.width.narrow() <= max_width && self.spans_both_axes(n.tile))
            .map(|(i, _)| i)
            .collect();
        for i in promoted {
            self.nodes[i].node_type = NodeType::Chokepoint;
        }

        for node in &mut self.nodes {
            let bonus = if node.node_type.is_transition() { 1.0 } else { 0.0 };
            node.strategic_value =
                node.node_type.base_priority() + 0.1 * node.connections() as f32 + bonus;
        }
    }

    fn index_types(&mut self) {
        let mut by_type: BTreeMap<NodeType, Vec<NavNodeId>> = BTreeMap::new();
        for node in &self.nodes {
            by_type.entry(node.node_type).or_default().push(node.id);
        }
        self.by_type = by_type;
    }

    // -----------------------------------------------------------------------
    // Build helpers
    // -----------------------------------------------------------------------

    fn flat_index(&self, tile: TileCoord) -> Option<usize> {
        if self.in_grid(tile) {
            Some(tile.x as usize + tile.y as usize * self.width as usize)
        } else {
            None
        }
    }

    /// Whether a step of `(dx, dy)` from `tile` is a legal edge: the target is
    /// a node and, for diagonals, both flanking tiles are nodes.
    fn connected(&self, tile: TileCoord, dx: i32, dy: i32) -> bool {
        if self.node_id_at(tile.offset(dx, dy)).is_none() {
            return false;
        }
        if dx != 0 && dy != 0 {
            return self.node_id_at(tile.offset(dx, 0)).is_some()
                && self.node_id_at(tile.offset(0, dy)).is_some();
        }
        true
    }

    /// Distinct passages leaving a node: the larger of its ring runs and its
    /// corridor arms.
    fn passage_count(&self, node: &NavNode) -> usize {
        self.ring_runs(node.tile).max(self.corridor_arms(node.tile))
    }

    /// Number of separate open runs in the connected 8-neighbor ring.
    fn ring_runs(&self, tile: TileCoord) -> usize {
        let open: [bool; 8] = std::array::from_fn(|i| {
            let (dx, dy) = RING_OFFSETS[i];
            self.connected(tile, dx, dy)
        });
        if open.iter().all(|&o| o) {
            return 0;
        }
        (0..8).filter(|&i| open[i] && !open[(i + 7) % 8]).count()
    }

    /// Cardinal directions in which a corridor leaves the tile. Walking up to
    /// `corridor_width_max` tiles out, some tile must be at most
    /// `corridor_width_max` wide across the direction of travel. Needs
    /// widths already measured.
    fn corridor_arms(&self, tile: TileCoord) -> usize {
        let max = self.params.corridor_width_max;
        let reach = max.max(1) as i32;
        CARDINAL_OFFSETS
            .iter()
            .filter(|&&(dx, dy)| {
                let across = if dx != 0 { Axis::Y } else { Axis::X };
                (1..=reach)
                    .map_while(|k| self.node_id_at(tile.offset(dx * k, dy * k)))
                    .any(|id| self.nodes[id.0 as usize].width.span(across) <= max)
            })
            .count()
    }

    /// Open tiles walking from `tile` in direction `(dx, dy)`. Stops at the
    /// first non-node or after `limit` steps.
    fn open_run(&self, tile: TileCoord, dx: i32, dy: i32, limit: u32) -> u32 {
        let mut steps = 0;
        let mut cursor = tile.offset(dx, dy);
        while steps < limit && self.node_id_at(cursor).is_some() {
            cursor = cursor.offset(dx, dy);
            steps += 1;
        }
        steps
    }

    fn measure_width(&self, tile: TileCoord, limit: u32) -> LocalWidth {
        LocalWidth {
            x: 1 + self.open_run(tile, -1, 0, limit) + self.open_run(tile, 1, 0, limit),
            y: 1 + self.open_run(tile, 0, -1, limit) + self.open_run(tile, 0, 1, limit),
            elbow: self.is_elbow(tile),
        }
    }

    fn is_elbow(&self, tile: TileCoord) -> bool {
        let dirs: SmallVec<[usize; 4]> = (0..4)
            .filter(|&d| {
                let (dx, dy) = CARDINAL_OFFSETS[d];
                self.node_id_at(tile.offset(dx, dy)).is_some()
            })
            .collect();
        if dirs.len() != 2 || (dirs[0] + 2) % 4 == dirs[1] {
            return false;
        }
        let (ax, ay) = CARDINAL_OFFSETS[dirs[0]];
        let (bx, by) = CARDINAL_OFFSETS[dirs[1]];
        self.node_id_at(tile.offset(ax + bx, ay + by)).is_none()
    }

    /// Whether the node has cardinal edges on both the X and the Y axis.
    fn spans_both_axes(&self, tile: TileCoord) -> bool {
        let horizontal = self.node_id_at(tile.offset(1, 0)).is_some()
            || self.node_id_at(tile.offset(-1, 0)).is_some();
        let vertical = self.node_id_at(tile.offset(0, 1)).is_some()
            || self.node_id_at(tile.offset(0, -1)).is_some();
        horizontal && vertical
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl NavGraph {
    /// Grid width in tiles at build time.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in tiles at build time.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn geometry(&self) -> TileGeometry {
        self.geometry
    }

    pub fn params(&self) -> &GraphParams {
        &self.params
    }

    pub fn in_grid(&self, tile: TileCoord) -> bool {
        tile.x >= 0 && tile.y >= 0 && (tile.x as u32) < self.width && (tile.y as u32) < self.height
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in ID order.
    pub fn nodes(&self) -> &[NavNode] {
        &self.nodes
    }

    /// All rooms in ID order.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn node(&self, id: NavNodeId) -> Option<&NavNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn node_id_at(&self, tile: TileCoord) -> Option<NavNodeId> {
        self.flat_index(tile).and_then(|i| self.tile_index[i])
    }

    pub fn node_at_tile(&self, tile: TileCoord) -> Option<&NavNode> {
        self.node_id_at(tile).and_then(|id| self.node(id))
    }

    pub fn node_at_world(&self, pos: WorldPos) -> Option<&NavNode> {
        self.node_at_tile(self.geometry.world_to_tile(pos))
    }

    pub fn tile_to_world(&self, tile: TileCoord) -> WorldPos {
        self.geometry.tile_to_world(tile)
    }

    pub fn world_to_tile(&self, pos: WorldPos) -> TileCoord {
        self.geometry.world_to_tile(pos)
    }

    /// Node type at `tile`, if the tile is graphed.
    pub fn node_type_at(&self, tile: TileCoord) -> Option<NodeType> {
        self.node_at_tile(tile).map(|n| n.node_type)
    }

    /// IDs of every node of the given type, in ID order.
    pub fn ids_of_type(&self, node_type: NodeType) -> &[NavNodeId] {
        self.by_type.get(&node_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every node of the given type, in ID order.
    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = &NavNode> + '_ {
        self.ids_of_type(node_type)
            .iter()
            .filter_map(move |&id| self.node(id))
    }

    pub fn doorways(&self) -> &[NavNodeId] {
        self.ids_of_type(NodeType::Doorway)
    }

    pub fn chokepoints(&self) -> &[NavNodeId] {
        self.ids_of_type(NodeType::Chokepoint)
    }

    pub fn junctions(&self) -> &[NavNodeId] {
        self.ids_of_type(NodeType::Junction)
    }

    pub fn dead_ends(&self) -> &[NavNodeId] {
        self.ids_of_type(NodeType::DeadEnd)
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.0 as usize)
    }

    /// The room whose member set contains `tile`.
    pub fn room_at_tile(&self, tile: TileCoord) -> Option<&Room> {
        self.node_at_tile(tile)
            .and_then(|n| n.room)
            .and_then(|id| self.room(id))
    }

    /// Nearest node of `node_type` to `tile` by Manhattan distance. Ties go to
    /// the lowest node ID. `tile` itself need not be graphed.
    pub fn nearest_node_of_type(&self, tile: TileCoord, node_type: NodeType) -> Option<&NavNode> {
        self.nodes_of_type(node_type)
            .min_by_key(|n| n.tile.manhattan_distance(tile))
    }

    /// Whether `to` is reachable from `from`.
    pub fn has_path(&self, from: TileCoord, to: TileCoord) -> bool {
        reachability::has_path(self, from, to)
    }

    /// Connected Corridor/Chokepoint nodes reachable from `seed` through
    /// Corridor/Chokepoint nodes. The seed is included whatever its type;
    /// empty when `seed` is not graphed.
    pub fn corridor_component(&self, seed: TileCoord) -> Vec<NavNodeId> {
        match self.node_id_at(seed) {
            Some(id) => reachability::flood_fill(self, id, |n| n.node_type.is_corridor_like()),
            None => Vec::new(),
        }
    }

    /// Microseconds the last build took. Diagnostic only.
    pub fn build_duration_us(&self) -> u64 {
        self.build_duration_us
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(NavNode::connections).sum::<usize>() / 2
    }

    /// Full plain-data snapshot for logging or external visualization.
    pub fn dump(&self) -> GraphDump {
        let mut type_counts = BTreeMap::new();
        for ty in NodeType::ALL {
            type_counts.insert(ty, self.ids_of_type(ty).len());
        }

        let nodes = self
            .nodes
            .iter()
            .map(|n| NodeSnapshot {
                id: n.id,
                tile: n.tile,
                node_type: n.node_type,
                connections: n.connections(),
                room: n.room,
                strategic_value: n.strategic_value,
            })
            .collect();

        let edges = self
            .nodes
            .iter()
            .flat_map(|n| {
                n.neighbors
                    .iter()
                    .filter(move |e| e.to > n.id)
                    .map(move |e| EdgeSnapshot {
                        from: n.id,
                        to: e.to,
                        cost: e.cost,
                    })
            })
            .collect();

        let rooms = self
            .rooms
            .iter()
            .map(|r| RoomSnapshot {
                id: r.id,
                min: r.min,
                max: r.max,
                center: r.center,
                area: r.area,
                doorways: r
                    .doorways
                    .iter()
                    .filter_map(|&d| self.node(d).map(|n| n.tile))
                    .collect(),
            })
            .collect();

        GraphDump {
            width: self.width,
            height: self.height,
            node_count: self.nodes.len(),
            edge_count: self.edge_count(),
            room_count: self.rooms.len(),
            type_counts,
            build_duration_us: self.build_duration_us,
            nodes,
            edges,
            rooms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::TileGrid;

    fn build(drawing: &str) -> NavGraph {
        NavGraph::build(&TileGrid::from_ascii(drawing, 16.0), &GraphParams::default())
    }

    fn type_at(graph: &NavGraph, x: i32, y: i32) -> Option<NodeType> {
        graph.node_type_at(TileCoord::new(x, y))
    }

    /// 10x10 walled room with a 2-wide exit through the east wall into a
    /// corridor running to x = 18.
    const ROOM_WITH_EXIT: &str = "
        ####################
        #........###########
        #........###########
        #........###########
        #..................#
        #..................#
        #........###########
        #........###########
        #........###########
        ####################
    ";

    #[test]
    fn node_ids_follow_scan_order() {
        let graph = build("###\n#..\n.#.");
        let tiles: Vec<TileCoord> = graph.nodes().iter().map(|n| n.tile).collect();
        assert_eq!(
            tiles,
            vec![
                TileCoord::new(1, 1),
                TileCoord::new(2, 1),
                TileCoord::new(0, 2),
                TileCoord::new(2, 2),
            ]
        );
        for (i, n) in graph.nodes().iter().enumerate() {
            assert_eq!(n.id, NavNodeId(i as u32));
        }
    }

    #[test]
    fn adjacency_is_symmetric_with_matching_costs() {
        let graph = build(ROOM_WITH_EXIT);
        for node in graph.nodes() {
            for edge in &node.neighbors {
                let back = graph
                    .node(edge.to)
                    .and_then(|other| other.neighbors.iter().find(|e| e.to == node.id));
                assert_eq!(back.map(|e| e.cost), Some(edge.cost), "{} -> {:?}", node.tile, edge.to);
            }
        }
    }

    #[test]
    fn diagonals_never_cut_corners() {
        let graph = build(
            "
            ......
            .#..#.
            ..#...
            ....#.
            ",
        );
        for node in graph.nodes() {
            for edge in &node.neighbors {
                let to = graph.node(edge.to).unwrap().tile;
                let dx = to.x - node.tile.x;
                let dy = to.y - node.tile.y;
                if dx != 0 && dy != 0 {
                    assert!(graph.node_at_tile(node.tile.offset(dx, 0)).is_some());
                    assert!(graph.node_at_tile(node.tile.offset(0, dy)).is_some());
                    assert!((edge.cost - std::f32::consts::SQRT_2).abs() < 1e-6);
                } else {
                    assert_eq!(edge.cost, 1.0);
                }
            }
        }
    }

    #[test]
    fn room_with_corridor_exit_classifies() {
        let graph = build(ROOM_WITH_EXIT);

        for y in 1..=8 {
            for x in 1..=8 {
                assert_eq!(type_at(&graph, x, y), Some(NodeType::RoomInterior), "({x}, {y})");
            }
        }
        assert_eq!(type_at(&graph, 9, 4), Some(NodeType::Doorway));
        assert_eq!(type_at(&graph, 9, 5), Some(NodeType::Doorway));
        for x in 10..=18 {
            assert_eq!(type_at(&graph, x, 4), Some(NodeType::Corridor), "({x}, 4)");
            assert_eq!(type_at(&graph, x, 5), Some(NodeType::Corridor), "({x}, 5)");
        }

        assert_eq!(graph.rooms().len(), 1);
        let room = &graph.rooms()[0];
        assert_eq!(room.area, 64);
        assert_eq!(room.min, TileCoord::new(1, 1));
        assert_eq!(room.max, TileCoord::new(8, 8));
        let doorway_tiles: Vec<TileCoord> = room
            .doorways
            .iter()
            .map(|&d| graph.node(d).unwrap().tile)
            .collect();
        assert_eq!(doorway_tiles, vec![TileCoord::new(9, 4), TileCoord::new(9, 5)]);
    }

    #[test]
    fn doorway_needs_a_long_open_span() {
        let params = GraphParams {
            doorway_min_open: 19,
            ..GraphParams::default()
        };
        let graph = NavGraph::build(&TileGrid::from_ascii(ROOM_WITH_EXIT, 16.0), &params);
        // The exit tiles span 18 along x, one short of the threshold.
        assert_eq!(type_at(&graph, 9, 4), Some(NodeType::RoomInterior));
        assert_eq!(type_at(&graph, 9, 5), Some(NodeType::RoomInterior));
        assert_eq!(type_at(&graph, 10, 4), Some(NodeType::Corridor));
        assert!(graph.doorways().is_empty());
        assert_eq!(graph.rooms().len(), 1);
        assert_eq!(graph.rooms()[0].area, 66);
        assert!(graph.rooms()[0].doorways.is_empty());
    }

    #[test]
    fn walled_corridor_has_dead_ends() {
        let graph = build(
            "
            ############
            #..........#
            ############
            ",
        );
        assert_eq!(type_at(&graph, 1, 1), Some(NodeType::DeadEnd));
        assert_eq!(type_at(&graph, 10, 1), Some(NodeType::DeadEnd));
        for x in 2..=9 {
            assert_eq!(type_at(&graph, x, 1), Some(NodeType::Corridor), "({x}, 1)");
        }
        assert!(graph.rooms().is_empty());
    }

    #[test]
    fn corridor_opening_into_room_ends_in_doorway() {
        let graph = build(
            "
            ##############
            #######......#
            #######......#
            #............#
            #######......#
            #######......#
            ##############
            ",
        );
        assert_eq!(type_at(&graph, 1, 3), Some(NodeType::DeadEnd));
        for x in 2..=5 {
            assert_eq!(type_at(&graph, x, 3), Some(NodeType::Corridor), "({x}, 3)");
        }
        assert_eq!(type_at(&graph, 6, 3), Some(NodeType::Doorway));
        assert_eq!(graph.rooms().len(), 1);
        assert_eq!(graph.rooms()[0].area, 30);
    }

    #[test]
    fn t_intersection_is_a_junction() {
        let graph = build(
            "
            #######
            #.....#
            ###.###
            ###.###
            ###.###
            #######
            ",
        );
        assert_eq!(type_at(&graph, 3, 1), Some(NodeType::Junction));
        assert_eq!(type_at(&graph, 2, 1), Some(NodeType::Corridor));
        assert_eq!(type_at(&graph, 3, 2), Some(NodeType::Corridor));
        assert_eq!(graph.dead_ends().len(), 3);
        // A lone junction is below the room size threshold.
        assert!(graph.rooms().is_empty());
    }

    #[test]
    fn wide_t_intersection_is_a_junction_block() {
        let graph = build(
            "
            ############
            #..........#
            #..........#
            #####..#####
            #####..#####
            #####..#####
            #####..#####
            #####..#####
            #####..#####
            ############
            ",
        );
        let crossing = [(5, 1), (6, 1), (5, 2), (6, 2)];
        for (x, y) in crossing {
            assert_eq!(type_at(&graph, x, y), Some(NodeType::Junction), "({x}, {y})");
        }
        assert_eq!(graph.junctions().len(), crossing.len());
        for (x, y) in [(1, 1), (3, 1), (4, 2), (7, 1), (10, 2), (5, 3), (6, 5), (5, 8)] {
            assert_eq!(type_at(&graph, x, y), Some(NodeType::Corridor), "({x}, {y})");
        }
        assert!(graph.chokepoints().is_empty());
        assert!(graph.rooms().is_empty());
        assert_eq!(
            crate::pattern::best_pattern_type(&graph, TileCoord::new(5, 2), None),
            crate::pattern::PatternType::BranchCheck
        );
    }

    #[test]
    fn narrow_turn_is_promoted_to_chokepoint() {
        let graph = build(
            "
            #####
            #...#
            ###.#
            ###.#
            #####
            ",
        );
        assert_eq!(type_at(&graph, 3, 1), Some(NodeType::Chokepoint));
        assert_eq!(type_at(&graph, 2, 1), Some(NodeType::Corridor));
        assert_eq!(graph.chokepoints().len(), 1);
    }

    #[test]
    fn straight_narrow_corridor_is_not_a_chokepoint() {
        let graph = build("#######\n#.....#\n#######");
        assert!(graph.chokepoints().is_empty());
    }

    #[test]
    fn strategic_value_formula() {
        let graph = build(ROOM_WITH_EXIT);
        for node in graph.nodes() {
            let bonus = if node.node_type.is_transition() { 1.0 } else { 0.0 };
            let expected =
                node.node_type.base_priority() + 0.1 * node.connections() as f32 + bonus;
            assert!((node.strategic_value - expected).abs() < 1e-5);
        }
        let door = graph.node_at_tile(TileCoord::new(9, 4)).unwrap();
        let inner = graph.node_at_tile(TileCoord::new(4, 4)).unwrap();
        assert!(door.strategic_value > inner.strategic_value);
    }

    #[test]
    fn rebuild_is_deterministic() {
        let grid = TileGrid::from_ascii(ROOM_WITH_EXIT, 16.0);
        let mut graph = NavGraph::build(&grid, &GraphParams::default());
        let before: Vec<(TileCoord, NodeType, Option<RoomId>)> =
            graph.nodes().iter().map(|n| (n.tile, n.node_type, n.room)).collect();
        let rooms_before = graph.rooms().to_vec();

        graph.rebuild(&grid);
        let after: Vec<(TileCoord, NodeType, Option<RoomId>)> =
            graph.nodes().iter().map(|n| (n.tile, n.node_type, n.room)).collect();
        assert_eq!(before, after);
        assert_eq!(rooms_before, graph.rooms());
    }

    #[test]
    fn empty_and_walled_grids_yield_empty_graphs() {
        for grid in [TileGrid::default(), TileGrid::filled(8, 8, false, 16.0)] {
            let graph = NavGraph::build(&grid, &GraphParams::default());
            assert!(graph.is_empty());
            assert!(graph.rooms().is_empty());
            assert!(graph.doorways().is_empty());
            assert!(graph.node_at_tile(TileCoord::new(0, 0)).is_none());
            assert!(graph.nearest_node_of_type(TileCoord::new(0, 0), NodeType::Corridor).is_none());
            assert!(graph.corridor_component(TileCoord::new(1, 1)).is_empty());
            assert!(!graph.has_path(TileCoord::new(0, 0), TileCoord::new(1, 1)));
            assert_eq!(graph.dump().node_count, 0);
        }
    }

    #[test]
    fn out_of_grid_queries_return_none() {
        let graph = build(ROOM_WITH_EXIT);
        assert!(graph.node_at_tile(TileCoord::new(-1, 3)).is_none());
        assert!(graph.node_at_tile(TileCoord::new(3, 500)).is_none());
        assert!(graph.room_at_tile(TileCoord::new(0, 0)).is_none());
        assert!(graph.node_at_world(WorldPos::new(-10.0, -10.0)).is_none());
        assert!(graph.room(RoomId(42)).is_none());
        assert!(graph.node(NavNodeId(9999)).is_none());
    }

    #[test]
    fn node_at_world_uses_tile_size() {
        let graph = build(ROOM_WITH_EXIT);
        // Tile size is 16: (72, 72) lies in tile (4, 4).
        let node = graph.node_at_world(WorldPos::new(72.0, 72.0)).unwrap();
        assert_eq!(node.tile, TileCoord::new(4, 4));
        assert_eq!(graph.room_at_tile(node.tile).map(|r| r.id), Some(RoomId(0)));
    }

    #[test]
    fn rooms_partition_member_nodes() {
        let graph = build(
            "
            #############
            #....#......#
            #....#......#
            #...........#
            #....#......#
            #############
            ",
        );
        let mut seen = std::collections::BTreeSet::new();
        for room in graph.rooms() {
            assert!(room.area >= graph.params().room_min_area);
            assert_eq!(room.area, room.nodes.len());
            for id in &room.nodes {
                assert!(seen.insert(*id), "node {id:?} in two rooms");
                let node = graph.node(*id).unwrap();
                assert!(node.node_type.is_room_member());
                assert_eq!(node.room, Some(room.id));
            }
        }
        // Members of a room carry its id and nobody else does.
        for node in graph.nodes() {
            if let Some(r) = node.room {
                assert!(graph.room(r).unwrap().nodes.contains(&node.id));
            }
        }
    }

    #[test]
    fn nearest_node_of_type_prefers_lowest_id_on_ties() {
        let graph = build("#######\n#.....#\n#######");
        // Dead ends at (1,1) and (5,1); (3,1) is equidistant.
        let nearest = graph
            .nearest_node_of_type(TileCoord::new(3, 1), NodeType::DeadEnd)
            .unwrap();
        assert_eq!(nearest.tile, TileCoord::new(1, 1));
    }

    #[test]
    fn corridor_component_stays_in_corridors() {
        let graph = build(ROOM_WITH_EXIT);
        let component = graph.corridor_component(TileCoord::new(12, 4));
        assert_eq!(component.len(), 18);
        for id in &component {
            assert!(graph.node(*id).unwrap().node_type.is_corridor_like());
        }
        assert!(graph.corridor_component(TileCoord::new(0, 0)).is_empty());
    }

    #[test]
    fn dump_counts_match_graph() {
        let graph = build(ROOM_WITH_EXIT);
        let dump = graph.dump();
        assert_eq!(dump.node_count, graph.node_count());
        assert_eq!(dump.edges.len(), graph.edge_count());
        assert_eq!(dump.room_count, 1);
        assert_eq!(dump.type_counts[&NodeType::Doorway], 2);
        assert_eq!(dump.type_counts.values().sum::<usize>(), graph.node_count());
        assert_eq!(dump.rooms[0].doorways.len(), 2);
    }
}
