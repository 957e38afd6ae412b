// Tile adapter: the single capability the navigation core consumes.
//
// `TileMap` answers "is this tile walkable?" and exposes the grid extent and
// tile size. World↔tile conversion is provided on top of the tile size by
// `TileGeometry`, so every consumer agrees on where a tile's center lies.
//
// `TileGrid` is a dense in-memory implementation stored as a flat `Vec<bool>`
// indexed by `x + y * width`. Out-of-bounds reads are walls; out-of-bounds
// writes are no-ops. `TileGrid::from_ascii()` builds a grid from a text
// drawing (`#` = wall, anything else = floor), which is how tests and the
// benchmark describe maps.
//
// See also: `nav.rs` which builds the graph by scanning a `TileMap`,
// `integration.rs` which combines the raw predicate with graph presence.
//
// **Critical constraint: determinism.** The walkability predicate must be a
// pure function of the tile coordinate between graph rebuilds.

use crate::types::{TileCoord, WorldPos};

/// Walkability capability provided by the host game.
pub trait TileMap {
    /// Grid width in tiles.
    fn width(&self) -> u32;

    /// Grid height in tiles.
    fn height(&self) -> u32;

    /// Whether an agent can stand on `tile`. Must return `false` for tiles
    /// outside the grid.
    fn is_walkable(&self, tile: TileCoord) -> bool;

    /// Edge length of one tile in world units.
    fn tile_size(&self) -> f32;

    fn geometry(&self) -> TileGeometry {
        TileGeometry::new(self.tile_size())
    }

    fn world_to_tile(&self, pos: WorldPos) -> TileCoord {
        self.geometry().world_to_tile(pos)
    }

    fn tile_to_world(&self, tile: TileCoord) -> WorldPos {
        self.geometry().tile_to_world(tile)
    }
}

/// World↔tile conversion for a fixed tile size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileGeometry {
    pub tile_size: f32,
}

impl TileGeometry {
    pub fn new(tile_size: f32) -> Self {
        // A zero or negative tile size would make every conversion divide by
        // zero; clamp to one world unit.
        let tile_size = if tile_size > 0.0 { tile_size } else { 1.0 };
        Self { tile_size }
    }

    /// The tile containing `pos`.
    pub fn world_to_tile(&self, pos: WorldPos) -> TileCoord {
        TileCoord::new(
            (pos.x / self.tile_size).floor() as i32,
            (pos.y / self.tile_size).floor() as i32,
        )
    }

    /// The world-space center of `tile`.
    pub fn tile_to_world(&self, tile: TileCoord) -> WorldPos {
        WorldPos::new(
            (tile.x as f32 + 0.5) * self.tile_size,
            (tile.y as f32 + 0.5) * self.tile_size,
        )
    }
}

impl Default for TileGeometry {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Dense walkability grid.
#[derive(Clone, Debug, Default)]
pub struct TileGrid {
    /// Flat storage: index = x + y * width.
    walkable: Vec<bool>,
    width: u32,
    height: u32,
    tile_size: f32,
}

impl TileGrid {
    /// Create a grid where every tile has the given walkability.
    pub fn filled(width: u32, height: u32, walkable: bool, tile_size: f32) -> Self {
        Self {
            walkable: vec![walkable; width as usize * height as usize],
            width,
            height,
            tile_size,
        }
    }

    /// Parse a text drawing. `#` is a wall, every other character is floor.
    /// Lines are trimmed and blank lines dropped, so indented raw strings
    /// work. Short rows are padded with wall.
    pub fn from_ascii(drawing: &str, tile_size: f32) -> Self {
        let rows: Vec<&str> = drawing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as u32;
        let mut grid = Self::filled(width, height, false, tile_size);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                grid.set_walkable(TileCoord::new(x as i32, y as i32), ch != '#');
            }
        }
        grid
    }

    pub fn in_bounds(&self, tile: TileCoord) -> bool {
        tile.x >= 0 && tile.y >= 0 && (tile.x as u32) < self.width && (tile.y as u32) < self.height
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        if self.in_bounds(tile) {
            Some(tile.x as usize + tile.y as usize * self.width as usize)
        } else {
            None
        }
    }

    /// Write a tile. No-op for out-of-bounds coordinates.
    pub fn set_walkable(&mut self, tile: TileCoord, walkable: bool) {
        if let Some(i) = self.index(tile) {
            self.walkable[i] = walkable;
        }
    }

    /// Set every tile in the inclusive rectangle `min..=max`.
    pub fn fill_rect(&mut self, min: TileCoord, max: TileCoord, walkable: bool) {
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                self.set_walkable(TileCoord::new(x, y), walkable);
            }
        }
    }

    /// Number of walkable tiles.
    pub fn walkable_count(&self) -> usize {
        self.walkable.iter().filter(|&&w| w).count()
    }
}

impl TileMap for TileGrid {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn is_walkable(&self, tile: TileCoord) -> bool {
        self.index(tile).is_some_and(|i| self.walkable[i])
    }

    fn tile_size(&self) -> f32 {
        self.tile_size
    }
}
