// Breadth-first connectivity queries over the nav graph.
//
// Two queries share one explicit-queue BFS: `flood_fill()` (connected
// component under a node predicate, used for room detection and the
// corridor-component query) and `has_path()` (tile-to-tile reachability).
// Both keep visited flags in a `Vec<bool>` indexed by `NavNodeId`, so memory
// is bounded by the node count and stack depth is constant regardless of map
// size.
//
// This is connectivity only. Nothing here computes a costed route; callers
// that need literal routing do it on their side.
//
// See also: `nav.rs` for the graph and its build pipeline, `integration.rs`
// for the anti-stuck recovery that checks reachability before choosing a
// waypoint.
//
// **Critical constraint: determinism.** Neighbors are visited in edge-list
// order, which is fixed by the build pipeline, so component order is stable.

use crate::nav::{NavGraph, NavNode};
use crate::types::{NavNodeId, TileCoord};
use std::collections::VecDeque;

/// Connected component containing `seed`, expanding only into nodes for
/// which `passable` holds. The seed itself is always included. Returned in
/// BFS discovery order.
pub fn flood_fill<F>(graph: &NavGraph, seed: NavNodeId, passable: F) -> Vec<NavNodeId>
where
    F: Fn(&NavNode) -> bool,
{
    let n = graph.node_count();
    let si = seed.0 as usize;
    if si >= n {
        return Vec::new();
    }

    let mut visited = vec![false; n];
    let mut component = Vec::new();
    let mut queue = VecDeque::new();
    visited[si] = true;
    queue.push_back(seed);

    while let Some(current) = queue.pop_front() {
        component.push(current);
        for edge in &graph.nodes()[current.0 as usize].neighbors {
            let ni = edge.to.0 as usize;
            if visited[ni] {
                continue;
            }
            visited[ni] = true;
            if passable(&graph.nodes()[ni]) {
                queue.push_back(edge.to);
            }
        }
    }

    component
}

/// Whether `to` can be reached from `from` over graph edges. Ungraphed or
/// out-of-grid tiles are never reachable. Symmetric because every edge is
/// bidirectional.
pub fn has_path(graph: &NavGraph, from: TileCoord, to: TileCoord) -> bool {
    let (Some(start), Some(goal)) = (graph.node_id_at(from), graph.node_id_at(to)) else {
        return false;
    };
    if start == goal {
        return true;
    }

    let mut visited = vec![false; graph.node_count()];
    let mut queue = VecDeque::new();
    visited[start.0 as usize] = true;
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for edge in &graph.nodes()[current.0 as usize].neighbors {
            if edge.to == goal {
                return true;
            }
            let ni = edge.to.0 as usize;
            if !visited[ni] {
                visited[ni] = true;
                queue.push_back(edge.to);
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphParams;
    use crate::tiles::TileGrid;
    use crate::types::NodeType;

    fn two_islands() -> NavGraph {
        let grid = TileGrid::from_ascii(
            "
            #########
            #...#...#
            #...#...#
            #########
            ",
            1.0,
        );
        NavGraph::build(&grid, &GraphParams::default())
    }

    #[test]
    fn has_path_within_island() {
        let graph = two_islands();
        assert!(has_path(&graph, TileCoord::new(1, 1), TileCoord::new(3, 2)));
        assert!(has_path(&graph, TileCoord::new(5, 1), TileCoord::new(7, 2)));
    }

    #[test]
    fn has_path_across_wall_is_false() {
        let graph = two_islands();
        assert!(!has_path(&graph, TileCoord::new(1, 1), TileCoord::new(5, 1)));
        assert!(!has_path(&graph, TileCoord::new(7, 2), TileCoord::new(3, 2)));
    }

    #[test]
    fn has_path_rejects_ungraphed_tiles() {
        let graph = two_islands();
        assert!(!has_path(&graph, TileCoord::new(0, 0), TileCoord::new(1, 1)));
        assert!(!has_path(&graph, TileCoord::new(1, 1), TileCoord::new(-5, 40)));
        assert!(has_path(&graph, TileCoord::new(2, 2), TileCoord::new(2, 2)));
    }

    #[test]
    fn has_path_is_symmetric_for_all_pairs() {
        let graph = two_islands();
        let tiles: Vec<TileCoord> = (0..9)
            .flat_map(|x| (0..4).map(move |y| TileCoord::new(x, y)))
            .collect();
        for &a in &tiles {
            for &b in &tiles {
                assert_eq!(has_path(&graph, a, b), has_path(&graph, b, a), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn flood_fill_respects_predicate_but_keeps_seed() {
        let graph = two_islands();
        let seed = graph.node_id_at(TileCoord::new(1, 1)).unwrap();
        let all = flood_fill(&graph, seed, |_| true);
        assert_eq!(all.len(), 6);
        assert_eq!(all[0], seed);

        let none = flood_fill(&graph, seed, |_| false);
        assert_eq!(none, vec![seed]);

        let corridors = flood_fill(&graph, seed, |n| n.node_type == NodeType::Corridor);
        assert!(corridors.contains(&seed));
    }

    #[test]
    fn flood_fill_out_of_range_seed_is_empty() {
        let graph = two_islands();
        assert!(flood_fill(&graph, NavNodeId(10_000), |_| true).is_empty());
    }
}
