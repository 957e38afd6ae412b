// Core types shared across the navigation crate.
//
// Defines tile and world coordinates (`TileCoord`, `WorldPos`), compact
// integer IDs for graph nodes and rooms, the opaque `AgentId` used as the key
// of every per-agent map, and the `NodeType` enum that tags each node with its
// structural role. All types derive `Serialize` so diagnostic dumps can be
// written as JSON by the caller.
//
// See also: `nav.rs` for the graph that assigns `NodeType`s, `tiles.rs` for
// world↔tile conversion.
//
// **Critical constraint: determinism.** IDs are sequential integers assigned
// in fixed scan order during graph build. Nothing here draws on randomness.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A position on the tile grid.
///
/// The grid uses screen conventions:
/// - X: east  (positive) / west  (negative)
/// - Y: south (positive) / north (negative)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset by `(dx, dy)` tiles.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Manhattan distance between two tiles.
    pub fn manhattan_distance(self, other: Self) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    /// Chebyshev (king-move) distance between two tiles.
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
    }

    /// Straight-line distance in tiles.
    pub fn euclidean_distance(self, other: Self) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A position in world space (pixels or whatever unit the host uses).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f32,
    pub y: f32,
}

impl WorldPos {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Direction tables
// ---------------------------------------------------------------------------

/// Cardinal offsets in N, E, S, W order.
pub const CARDINAL_OFFSETS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// The 8-neighbor ring in clockwise order starting at N:
/// N, NE, E, SE, S, SW, W, NW. Even indices are cardinal.
pub const RING_OFFSETS: [(i32, i32); 8] = [
    (0, -1),  // N
    (1, -1),  // NE
    (1, 0),   // E
    (1, 1),   // SE
    (0, 1),   // S
    (-1, 1),  // SW
    (-1, 0),  // W
    (-1, -1), // NW
];

/// Grid axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub const fn perpendicular(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }

    /// Unit step along this axis.
    pub const fn step(self) -> (i32, i32) {
        match self {
            Axis::X => (1, 0),
            Axis::Y => (0, 1),
        }
    }

    /// The component of `tile` along this axis.
    pub const fn component(self, tile: TileCoord) -> i32 {
        match self {
            Axis::X => tile.x,
            Axis::Y => tile.y,
        }
    }
}

// ---------------------------------------------------------------------------
// IDs
// ---------------------------------------------------------------------------

/// Compact identifier for a navigation graph node. Index into `NavGraph.nodes`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NavNodeId(pub u32);

/// Compact identifier for a detected room. Index into `NavGraph.rooms`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub u32);

/// Opaque agent handle chosen by the caller. The crate never interprets it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoomId({})", self.0)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Node roles
// ---------------------------------------------------------------------------

/// Structural role of a navigation node. Exactly one per node.
///
/// `Chokepoint` is never assigned by the initial classification pass; it is a
/// promotion from `Corridor` or `Doorway` during the strategic pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeType {
    Corridor,
    Doorway,
    RoomInterior,
    Junction,
    Chokepoint,
    DeadEnd,
}

impl NodeType {
    pub const ALL: [NodeType; 6] = [
        NodeType::Corridor,
        NodeType::Doorway,
        NodeType::RoomInterior,
        NodeType::Junction,
        NodeType::Chokepoint,
        NodeType::DeadEnd,
    ];

    /// Base term of the strategic value heuristic.
    pub const fn base_priority(self) -> f32 {
        match self {
            NodeType::Chokepoint => 3.0,
            NodeType::Doorway => 2.5,
            NodeType::Junction => 2.0,
            NodeType::Corridor => 1.5,
            NodeType::RoomInterior => 1.0,
            NodeType::DeadEnd => 0.5,
        }
    }

    /// Doorways and chokepoints get a flat bonus on top of the base priority.
    pub const fn is_transition(self) -> bool {
        matches!(self, NodeType::Doorway | NodeType::Chokepoint)
    }

    /// Node types a lane sweep and the corridor-component query travel through.
    pub const fn is_corridor_like(self) -> bool {
        matches!(self, NodeType::Corridor | NodeType::Chokepoint)
    }

    /// Node types that can belong to a room.
    pub const fn is_room_member(self) -> bool {
        matches!(self, NodeType::RoomInterior | NodeType::Junction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_distances() {
        let a = TileCoord::new(0, 0);
        let b = TileCoord::new(3, -4);
        assert_eq!(a.manhattan_distance(b), 7);
        assert_eq!(a.chebyshev_distance(b), 4);
        assert!((a.euclidean_distance(b) - 5.0).abs() < 1e-6);
        assert_eq!(b.manhattan_distance(a), 7);
    }

    #[test]
    fn ring_offsets_alternate_cardinal_and_diagonal() {
        for (i, &(dx, dy)) in RING_OFFSETS.iter().enumerate() {
            let cardinal = dx == 0 || dy == 0;
            assert_eq!(cardinal, i % 2 == 0, "offset {i} = ({dx}, {dy})");
        }
        for &offset in &CARDINAL_OFFSETS {
            assert!(RING_OFFSETS.contains(&offset));
        }
    }

    #[test]
    fn chokepoint_outranks_everything() {
        for ty in NodeType::ALL {
            assert!(NodeType::Chokepoint.base_priority() >= ty.base_priority());
        }
    }

    #[test]
    fn axis_helpers() {
        let t = TileCoord::new(4, 9);
        assert_eq!(Axis::X.component(t), 4);
        assert_eq!(Axis::Y.component(t), 9);
        assert_eq!(Axis::X.perpendicular(), Axis::Y);
        assert_eq!(Axis::Y.step(), (0, 1));
    }
}
