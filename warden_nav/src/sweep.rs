// Room sweeps: room-scoped search routes built from detected rooms.
//
// Four sweep shapes, all restricted to tiles that belong to the room:
//
// - **Standard**: entry tile, then the member nearest each bounding-box
//   corner ordered by polar angle around the entry, then the room center,
//   then the remaining doorways.
// - **Perimeter**: clockwise walk of the bounding-box edge through every
//   member tile, then the doorways.
// - **Spiral**: square spiral out from the center (legs right, down, left,
//   up with lengths 1, 1, 2, 2, ...), then the doorways. Only produced on
//   explicit request.
// - **Cross**: the center row and center column, then the doorways.
//
// `best_sweep_type()` chooses a shape from room area, bounding-box size and
// urgency. Every sweep carries an estimated traversal time: the summed
// point-to-point world distance divided by `agent_speed`.
//
// See also: `nav.rs` for `Room`, `pattern.rs` for `PatternPoint` and the
// non-room search patterns, `integration.rs` which attaches a standard sweep
// on room entry.
//
// **Critical constraint: determinism.** Corner ordering uses `atan2` with a
// tile-coordinate tie-break; spiral legs are a fixed sequence.

use crate::config::SweepParams;
use crate::nav::{NavGraph, Room};
use crate::pattern::PatternPoint;
use crate::types::{RoomId, TileCoord};
use rustc_hash::FxHashSet;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SweepType {
    Standard,
    Perimeter,
    Spiral,
    Cross,
}

/// How pressed the caller is. High urgency favors the quicker cross sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Urgency {
    #[default]
    Normal,
    High,
}

/// A generated room-clearing route.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoomSweep {
    pub sweep_type: SweepType,
    pub room: RoomId,
    pub points: Vec<PatternPoint>,
    /// Seconds to walk the points in order at the configured agent speed.
    pub estimated_duration_s: f32,
}

impl RoomSweep {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Adaptive shape selection. Spiral is never chosen here.
pub fn best_sweep_type(room: &Room, urgency: Urgency) -> SweepType {
    if room.area < 25 {
        SweepType::Standard
    } else if room.area >= 50 && (room.width() > 8 || room.height() > 8) {
        SweepType::Perimeter
    } else if room.area >= 50 {
        SweepType::Cross
    } else if urgency == Urgency::High {
        SweepType::Cross
    } else {
        SweepType::Standard
    }
}

/// Ordered, tile-deduplicated point list for one room.
struct SweepBuilder<'g> {
    graph: &'g NavGraph,
    room: &'g Room,
    points: Vec<PatternPoint>,
    seen: FxHashSet<TileCoord>,
}

impl<'g> SweepBuilder<'g> {
    fn new(graph: &'g NavGraph, room: &'g Room) -> Self {
        Self {
            graph,
            room,
            points: Vec::new(),
            seen: FxHashSet::default(),
        }
    }

    fn is_member(&self, tile: TileCoord) -> bool {
        self.graph
            .node_at_tile(tile)
            .is_some_and(|n| n.room == Some(self.room.id))
    }

    /// Add a tile if it is graphed and not already present.
    fn push(&mut self, tile: TileCoord, priority: f32) {
        if self.graph.node_at_tile(tile).is_none() || !self.seen.insert(tile) {
            return;
        }
        self.points.push(PatternPoint {
            tile,
            world: self.graph.tile_to_world(tile),
            priority,
        });
    }

    fn push_member(&mut self, tile: TileCoord, priority: f32) {
        if self.is_member(tile) {
            self.push(tile, priority);
        }
    }

    fn push_doorways(&mut self, priority: f32) {
        for &door in &self.room.doorways {
            if let Some(node) = self.graph.node(door) {
                self.push(node.tile, priority);
            }
        }
    }
}

/// Builds sweeps from graph room data.
#[derive(Clone, Debug, Default)]
pub struct RoomSweepGenerator {
    params: SweepParams,
}

impl RoomSweepGenerator {
    pub fn new(params: SweepParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SweepParams {
        &self.params
    }

    /// Generate a sweep of the given shape. `entry` only affects the standard
    /// sweep. `None` for an unknown room.
    pub fn generate(
        &self,
        graph: &NavGraph,
        room: RoomId,
        sweep_type: SweepType,
        entry: Option<TileCoord>,
    ) -> Option<RoomSweep> {
        let room = graph.room(room)?;
        let mut points = match sweep_type {
            SweepType::Standard => self.standard_points(graph, room, entry),
            SweepType::Perimeter => self.perimeter_points(graph, room),
            SweepType::Spiral => self.spiral_points(graph, room),
            SweepType::Cross => self.cross_points(graph, room),
        };
        points.truncate(self.params.max_sweep_points);
        let estimated_duration_s = self.estimate_duration(&points);
        log::debug!(
            "{}: {sweep_type:?} sweep with {} points, ~{estimated_duration_s:.1}s",
            room.id,
            points.len()
        );
        Some(RoomSweep {
            sweep_type,
            room: room.id,
            points,
            estimated_duration_s,
        })
    }

    /// Generate the shape `best_sweep_type()` picks for the room.
    pub fn best_sweep(
        &self,
        graph: &NavGraph,
        room: RoomId,
        entry: Option<TileCoord>,
        urgency: Urgency,
    ) -> Option<RoomSweep> {
        let sweep_type = best_sweep_type(graph.room(room)?, urgency);
        self.generate(graph, room, sweep_type, entry)
    }

    /// Walking time for the points in order, in seconds.
    pub fn estimate_duration(&self, points: &[PatternPoint]) -> f32 {
        let distance: f32 = points
            .windows(2)
            .map(|pair| pair[0].world.distance(pair[1].world))
            .sum();
        if self.params.agent_speed > 0.0 {
            distance / self.params.agent_speed
        } else {
            0.0
        }
    }

    fn standard_points(
        &self,
        graph: &NavGraph,
        room: &Room,
        entry: Option<TileCoord>,
    ) -> Vec<PatternPoint> {
        let p = &self.params;
        let mut b = SweepBuilder::new(graph, room);
        if let Some(entry) = entry {
            b.push(entry, p.doorway_priority);
        }

        let corners = [
            room.min,
            TileCoord::new(room.max.x, room.min.y),
            room.max,
            TileCoord::new(room.min.x, room.max.y),
        ];
        let mut nearest: Vec<TileCoord> = corners
            .iter()
            .filter_map(|&corner| {
                room.nodes
                    .iter()
                    .filter_map(|&id| graph.node(id))
                    .min_by(|a, b| {
                        corner
                            .euclidean_distance(a.tile)
                            .total_cmp(&corner.euclidean_distance(b.tile))
                            .then(a.id.cmp(&b.id))
                    })
                    .map(|n| n.tile)
            })
            .collect();
        let pivot = entry.unwrap_or(room.center);
        let angle = |t: &TileCoord| ((t.y - pivot.y) as f32).atan2((t.x - pivot.x) as f32);
        nearest.sort_by(|a, b| angle(a).total_cmp(&angle(b)).then(a.cmp(b)));
        for corner in nearest {
            b.push(corner, p.corner_priority);
        }

        b.push(room.center, p.center_priority);
        b.push_doorways(p.doorway_priority);
        b.points
    }

    fn perimeter_points(&self, graph: &NavGraph, room: &Room) -> Vec<PatternPoint> {
        let (min, max) = (room.min, room.max);
        let mut edge = Vec::new();
        for x in min.x..=max.x {
            edge.push(TileCoord::new(x, min.y));
        }
        for y in min.y + 1..=max.y {
            edge.push(TileCoord::new(max.x, y));
        }
        if max.y > min.y {
            for x in (min.x..max.x).rev() {
                edge.push(TileCoord::new(x, max.y));
            }
        }
        if max.x > min.x {
            for y in (min.y + 1..max.y).rev() {
                edge.push(TileCoord::new(min.x, y));
            }
        }

        let mut b = SweepBuilder::new(graph, room);
        for tile in edge {
            b.push_member(tile, self.params.edge_priority);
        }
        b.push_doorways(self.params.doorway_priority);
        b.points
    }

    fn spiral_points(&self, graph: &NavGraph, room: &Room) -> Vec<PatternPoint> {
        const LEGS: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
        let cap = self.params.max_sweep_points;
        let mut b = SweepBuilder::new(graph, room);
        b.push_member(room.center, self.params.center_priority);

        let span = room.width().max(room.height()) as i32;
        let mut cursor = room.center;
        let mut leg_len = 1;
        'turns: while leg_len <= 2 * span + 2 {
            let mut any_inside = false;
            for (leg, &(dx, dy)) in LEGS.iter().enumerate() {
                for _ in 0..leg_len {
                    cursor = cursor.offset(dx, dy);
                    if room.bounds_contain(cursor) {
                        any_inside = true;
                        b.push_member(cursor, self.params.edge_priority);
                    }
                    if b.points.len() >= cap {
                        break 'turns;
                    }
                }
                if leg % 2 == 1 {
                    leg_len += 1;
                }
            }
            if !any_inside {
                break;
            }
        }

        b.push_doorways(self.params.doorway_priority);
        b.points
    }

    fn cross_points(&self, graph: &NavGraph, room: &Room) -> Vec<PatternPoint> {
        let mut b = SweepBuilder::new(graph, room);
        let c = room.center;
        for x in room.min.x..=room.max.x {
            b.push_member(TileCoord::new(x, c.y), self.params.edge_priority);
        }
        for y in room.min.y..=room.max.y {
            b.push_member(TileCoord::new(c.x, y), self.params.edge_priority);
        }
        b.push_doorways(self.params.doorway_priority);
        b.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphParams;
    use crate::tiles::TileGrid;

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

    fn graph() -> NavGraph {
        NavGraph::build(&TileGrid::from_ascii(ROOM_WITH_EXIT, 16.0), &GraphParams::default())
    }

    fn room(area: usize, w: i32, h: i32) -> Room {
        Room {
            id: RoomId(0),
            min: TileCoord::new(0, 0),
            max: TileCoord::new(w - 1, h - 1),
            center: TileCoord::new(w / 2, h / 2),
            nodes: Vec::new(),
            doorways: Vec::new(),
            area,
        }
    }

    fn tiles(sweep: &RoomSweep) -> Vec<TileCoord> {
        sweep.points.iter().map(|p| p.tile).collect()
    }

    #[test]
    fn adaptive_selection() {
        assert_eq!(best_sweep_type(&room(80, 12, 7), Urgency::Normal), SweepType::Perimeter);
        assert_eq!(best_sweep_type(&room(30, 6, 5), Urgency::Normal), SweepType::Standard);
        assert_eq!(best_sweep_type(&room(30, 6, 5), Urgency::High), SweepType::Cross);
        assert_eq!(best_sweep_type(&room(64, 8, 8), Urgency::Normal), SweepType::Cross);
        assert_eq!(best_sweep_type(&room(20, 5, 4), Urgency::High), SweepType::Standard);
    }

    #[test]
    fn standard_sweep_order() {
        let graph = graph();
        let generator = RoomSweepGenerator::default();
        let sweep = generator
            .generate(&graph, RoomId(0), SweepType::Standard, Some(TileCoord::new(8, 4)))
            .unwrap();
        assert_eq!(
            tiles(&sweep),
            vec![
                TileCoord::new(8, 4),
                TileCoord::new(1, 1),
                TileCoord::new(8, 1),
                TileCoord::new(8, 8),
                TileCoord::new(1, 8),
                TileCoord::new(4, 4),
                TileCoord::new(9, 4),
                TileCoord::new(9, 5),
            ]
        );
        assert_eq!(sweep.points[0].priority, 1.5);
        assert_eq!(sweep.points[1].priority, 1.2);
        assert_eq!(sweep.points[5].priority, 1.0);
        assert!(sweep.estimated_duration_s > 0.0);
    }

    #[test]
    fn perimeter_sweep_walks_clockwise() {
        let graph = graph();
        let sweep = RoomSweepGenerator::default()
            .generate(&graph, RoomId(0), SweepType::Perimeter, None)
            .unwrap();
        let ts = tiles(&sweep);
        // Top edge left to right, then down the east edge.
        let top: Vec<TileCoord> = (1..=8).map(|x| TileCoord::new(x, 1)).collect();
        assert_eq!(&ts[..8], top.as_slice());
        assert_eq!(ts[8], TileCoord::new(8, 2));
        // All 28 edge tiles, then both doorways.
        assert_eq!(ts.len(), 30);
        assert_eq!(&ts[28..], &[TileCoord::new(9, 4), TileCoord::new(9, 5)]);
        let room = graph.room(RoomId(0)).unwrap();
        for t in &ts[..28] {
            assert!(t.x == room.min.x || t.x == room.max.x || t.y == room.min.y || t.y == room.max.y);
        }
        assert_eq!(ts.last(), Some(&TileCoord::new(9, 5)));
        assert_eq!(ts[27], TileCoord::new(1, 2));
    }

    #[test]
    fn perimeter_sweep_covers_every_edge_tile() {
        let mut grid = TileGrid::filled(7, 7, false, 16.0);
        grid.fill_rect(TileCoord::new(1, 1), TileCoord::new(5, 5), true);
        let graph = NavGraph::build(&grid, &GraphParams::default());
        let sweep = RoomSweepGenerator::default()
            .generate(&graph, RoomId(0), SweepType::Perimeter, None)
            .unwrap();
        let ts = tiles(&sweep);
        assert_eq!(ts.len(), 16);
        let expected: Vec<TileCoord> = (1..=5)
            .map(|x| TileCoord::new(x, 1))
            .chain((2..=5).map(|y| TileCoord::new(5, y)))
            .chain((1..=4).rev().map(|x| TileCoord::new(x, 5)))
            .chain((2..=4).rev().map(|y| TileCoord::new(1, y)))
            .collect();
        assert_eq!(ts, expected);
    }

    #[test]
    fn spiral_sweep_starts_at_center_and_stays_in_room() {
        let graph = graph();
        let sweep = RoomSweepGenerator::default()
            .generate(&graph, RoomId(0), SweepType::Spiral, None)
            .unwrap();
        let ts = tiles(&sweep);
        assert_eq!(ts[0], TileCoord::new(4, 4));
        assert_eq!(ts[1], TileCoord::new(5, 4));
        assert_eq!(ts[2], TileCoord::new(5, 5));
        assert!(ts.len() <= 32);
        let room = graph.room(RoomId(0)).unwrap();
        for t in &ts {
            assert!(room.bounds_contain(*t) || graph.node_type_at(*t) == Some(crate::types::NodeType::Doorway));
        }
    }

    #[test]
    fn cross_sweep_covers_center_row_and_column() {
        let graph = graph();
        let sweep = RoomSweepGenerator::default()
            .generate(&graph, RoomId(0), SweepType::Cross, None)
            .unwrap();
        let ts = tiles(&sweep);
        // 8 in the row, 7 more in the column, 2 doorways.
        assert_eq!(ts.len(), 17);
        assert!(ts[..8].iter().all(|t| t.y == 4));
        assert!(ts[8..15].iter().all(|t| t.x == 4));
    }

    #[test]
    fn sweeps_are_capped_and_deduplicated() {
        let graph = graph();
        let generator = RoomSweepGenerator::new(SweepParams {
            max_sweep_points: 5,
            ..SweepParams::default()
        });
        for ty in [SweepType::Standard, SweepType::Perimeter, SweepType::Spiral, SweepType::Cross] {
            let sweep = generator.generate(&graph, RoomId(0), ty, None).unwrap();
            assert!(sweep.len() <= 5);
            let unique: std::collections::BTreeSet<TileCoord> = tiles(&sweep).into_iter().collect();
            assert_eq!(unique.len(), sweep.len());
        }
    }

    #[test]
    fn unknown_room_yields_none() {
        let graph = graph();
        let generator = RoomSweepGenerator::default();
        assert!(generator.generate(&graph, RoomId(9), SweepType::Standard, None).is_none());
        assert!(generator.best_sweep(&graph, RoomId(9), None, Urgency::High).is_none());
        assert_eq!(
            generator.best_sweep(&graph, RoomId(0), None, Urgency::Normal).map(|s| s.sweep_type),
            Some(SweepType::Cross)
        );
    }

    #[test]
    fn duration_grows_with_path_length() {
        let graph = graph();
        let generator = RoomSweepGenerator::default();
        let sweep = generator
            .generate(&graph, RoomId(0), SweepType::Perimeter, None)
            .unwrap();
        let mut previous = 0.0;
        for n in 1..=sweep.points.len() {
            let d = generator.estimate_duration(&sweep.points[..n]);
            assert!(d >= previous);
            previous = d;
        }
        assert_eq!(generator.estimate_duration(&[]), 0.0);
    }
}
