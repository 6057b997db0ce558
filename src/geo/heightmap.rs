//! In-memory single-layer heightmap implementing [`GeoEngine`]

use crate::errors::{GeoPathError, GeoPathResult};
use crate::geo::{CELL_SIZE, GeoEngine, InstanceId, LinePoints3, Nswe};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

/// Height difference two neighbouring cells may have and still connect
pub const DEFAULT_MAX_STEP: i32 = 32;

const NEIGHBOURS: [(i32, i32, Nswe); 4] = [
    (1, 0, Nswe::EAST),
    (0, 1, Nswe::SOUTH),
    (-1, 0, Nswe::WEST),
    (0, -1, Nswe::NORTH),
];

/// Heightmap terrain with per-cell movement flags
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HeightMapGeo {
    #[validate(range(min = 1, max = 4096))]
    pub width: u32,
    #[validate(range(min = 1, max = 4096))]
    pub height: u32,
    /// World x of the west edge of cell column 0
    pub origin_x: i32,
    /// World y of the north edge of cell row 0
    pub origin_y: i32,
    #[validate(range(min = 1, max = 4096))]
    pub max_step: i32,
    heights: Vec<i32>, // Flattened 2D array (row-major)
    blocked: Vec<bool>,
    #[serde(skip)]
    flags: Vec<Nswe>,
}

impl HeightMapGeo {
    /// Create a heightmap and derive movement flags from its height steps
    pub fn new(
        width: u32,
        height: u32,
        origin: IVec2,
        heights: Vec<i32>,
        max_step: i32,
    ) -> GeoPathResult<Self> {
        let expected_size = width as usize * height as usize;
        if heights.len() != expected_size {
            return Err(GeoPathError::InvalidMapData {
                reason: format!(
                    "Heights array size {} does not match map dimensions {}x{} (expected {})",
                    heights.len(),
                    width,
                    height,
                    expected_size
                ),
            });
        }

        let mut geo = Self {
            width,
            height,
            origin_x: origin.x,
            origin_y: origin.y,
            max_step,
            heights,
            blocked: vec![false; expected_size],
            flags: vec![Nswe::NONE; expected_size],
        };

        geo.validate().map_err(|e| GeoPathError::InvalidMapData {
            reason: format!("Heightmap validation failed: {e}"),
        })?;

        geo.rebuild_flags();
        Ok(geo)
    }

    /// Create flat terrain anchored at the world origin
    pub fn flat(width: u32, height: u32, z: i32) -> GeoPathResult<Self> {
        let heights = vec![z; width as usize * height as usize];
        Self::new(width, height, IVec2::ZERO, heights, DEFAULT_MAX_STEP)
    }

    /// Build flat terrain from rows of `.` (open) and `#` (wall); row index is y
    pub fn from_ascii(rows: &[&str], z: i32) -> GeoPathResult<Self> {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |row| row.chars().count()) as u32;

        let mut geo = Self::flat(width, height, z)?;
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() as u32 != width {
                return Err(GeoPathError::InvalidMapData {
                    reason: format!(
                        "Row {y} has length {} instead of {width}",
                        row.chars().count()
                    ),
                });
            }
            for (x, cell) in row.chars().enumerate() {
                match cell {
                    '.' => {}
                    '#' => {
                        let index = y * width as usize + x;
                        geo.blocked[index] = true;
                    }
                    other => {
                        return Err(GeoPathError::InvalidMapData {
                            reason: format!("Unknown map symbol '{other}' at ({x}, {y})"),
                        });
                    }
                }
            }
        }

        geo.rebuild_flags();
        Ok(geo)
    }

    /// Load a map saved with [`HeightMapGeo::save_to_file`]
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GeoPathResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GeoPathError::MapFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let data = std::fs::read(path)?;
        let (mut geo, _): (HeightMapGeo, usize) =
            bincode::serde::decode_from_slice(&data, bincode::config::standard()).map_err(
                |e| GeoPathError::CorruptedMapFile {
                    reason: format!("Failed to deserialize map data: {e}"),
                },
            )?;

        geo.validate().map_err(|validation_errors| {
            let error_details = validation_errors
                .field_errors()
                .iter()
                .map(|(field, errors)| {
                    let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                    format!("{field}: {}", error_msgs.join(", "))
                })
                .collect::<Vec<String>>()
                .join("; ");

            GeoPathError::CorruptedMapFile {
                reason: format!("Map validation failed: {error_details}"),
            }
        })?;

        let cells = geo.width as usize * geo.height as usize;
        if geo.heights.len() != cells || geo.blocked.len() != cells {
            return Err(GeoPathError::CorruptedMapFile {
                reason: format!(
                    "Cell arrays do not match map dimensions {}x{}",
                    geo.width, geo.height
                ),
            });
        }

        // Flags are derived data and never stored
        geo.flags = vec![Nswe::NONE; cells];
        geo.rebuild_flags();
        Ok(geo)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> GeoPathResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data =
            bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(|e| {
                GeoPathError::InvalidMapData {
                    reason: format!("Failed to serialize map: {e}"),
                }
            })?;

        std::fs::write(path, data)?;
        Ok(())
    }

    fn index(&self, geo_x: i32, geo_y: i32) -> Option<usize> {
        if geo_x < 0 || geo_y < 0 || geo_x >= self.width as i32 || geo_y >= self.height as i32 {
            return None;
        }
        Some(geo_y as usize * self.width as usize + geo_x as usize)
    }

    pub fn cell_height(&self, geo_x: i32, geo_y: i32) -> Option<i32> {
        self.index(geo_x, geo_y).map(|index| self.heights[index])
    }

    pub fn cell_flags(&self, geo_x: i32, geo_y: i32) -> Option<Nswe> {
        self.index(geo_x, geo_y).map(|index| self.flags[index])
    }

    pub fn is_blocked(&self, geo_x: i32, geo_y: i32) -> bool {
        self.index(geo_x, geo_y)
            .is_none_or(|index| self.blocked[index])
    }

    /// Change a cell's height and re-derive movement flags
    pub fn set_height(&mut self, geo_x: i32, geo_y: i32, z: i32) {
        if let Some(index) = self.index(geo_x, geo_y) {
            self.heights[index] = z;
            self.rebuild_flags();
        }
    }

    /// Turn a cell into a wall nobody can enter or leave
    pub fn block_cell(&mut self, geo_x: i32, geo_y: i32) {
        if let Some(index) = self.index(geo_x, geo_y) {
            self.blocked[index] = true;
            self.rebuild_flags();
        }
    }

    /// Block many cells at once; flags are re-derived a single time
    pub fn block_cells<I: IntoIterator<Item = IVec2>>(&mut self, cells: I) {
        for cell in cells {
            if let Some(index) = self.index(cell.x, cell.y) {
                self.blocked[index] = true;
            }
        }
        self.rebuild_flags();
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.iter().filter(|&&b| b).count()
    }

    /// Recompute every cell's flags from walls and height steps
    pub fn rebuild_flags(&mut self) {
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let index = y as usize * self.width as usize + x as usize;
                let mut flags = Nswe::NONE;

                if !self.blocked[index] {
                    let here = self.heights[index];
                    for (dx, dy, direction) in NEIGHBOURS {
                        let Some(next) = self.index(x + dx, y + dy) else {
                            continue;
                        };
                        if !self.blocked[next] && (self.heights[next] - here).abs() <= self.max_step
                        {
                            flags.insert(direction);
                        }
                    }
                }

                self.flags[index] = flags;
            }
        }
    }

    /// Whether a single cell-to-cell step is allowed, applying the corner rule to diagonals
    fn can_step(&self, from: IVec2, dx: i32, dy: i32) -> bool {
        let Some(flags) = self.cell_flags(from.x, from.y) else {
            return false;
        };
        let (step_x, step_y) = (Nswe::toward_x(dx), Nswe::toward_y(dy));

        match (dx, dy) {
            (0, 0) => true,
            (_, 0) => flags.contains(step_x),
            (0, _) => flags.contains(step_y),
            _ => {
                flags.contains(step_x)
                    && flags.contains(step_y)
                    && self
                        .cell_flags(from.x + dx, from.y)
                        .is_some_and(|side| side.contains(step_y))
                    && self
                        .cell_flags(from.x, from.y + dy)
                        .is_some_and(|side| side.contains(step_x))
            }
        }
    }
}

impl GeoEngine for HeightMapGeo {
    fn has_geo(&self, world_x: i32, world_y: i32) -> bool {
        self.index(self.geo_x(world_x), self.geo_y(world_y)).is_some()
    }

    fn height(&self, world_x: i32, world_y: i32, world_z: i32) -> i32 {
        self.nearest_z(self.geo_x(world_x), self.geo_y(world_y), world_z)
    }

    fn geo_x(&self, world_x: i32) -> i32 {
        (world_x - self.origin_x).div_euclid(CELL_SIZE)
    }

    fn geo_y(&self, world_y: i32) -> i32 {
        (world_y - self.origin_y).div_euclid(CELL_SIZE)
    }

    fn world_x(&self, geo_x: i32) -> i32 {
        geo_x * CELL_SIZE + self.origin_x + CELL_SIZE / 2
    }

    fn world_y(&self, geo_y: i32) -> i32 {
        geo_y * CELL_SIZE + self.origin_y + CELL_SIZE / 2
    }

    fn nearest_z(&self, geo_x: i32, geo_y: i32, z: i32) -> i32 {
        self.cell_height(geo_x, geo_y).unwrap_or(z)
    }

    fn nswe(&self, geo_x: i32, geo_y: i32, _z: i32) -> Nswe {
        self.cell_flags(geo_x, geo_y).unwrap_or(Nswe::NONE)
    }

    fn can_move_to_target(&self, from: IVec3, to: IVec3, _instance: Option<InstanceId>) -> bool {
        let start = IVec2::new(self.geo_x(from.x), self.geo_y(from.y));
        let end = IVec2::new(self.geo_x(to.x), self.geo_y(to.y));
        if self.index(start.x, start.y).is_none() || self.index(end.x, end.y).is_none() {
            return false;
        }

        let start_z = self.nearest_z(start.x, start.y, from.z);
        let end_z = self.nearest_z(end.x, end.y, to.z);

        let mut previous = start;
        let mut z = start_z;
        for point in LinePoints3::new(start.extend(start_z), end.extend(end_z)) {
            let cell = point.truncate();
            if cell == previous {
                // A z-dominant line samples the same cell several times
                continue;
            }

            let step = cell - previous;
            if !self.can_step(previous, step.x, step.y) {
                return false;
            }

            let next_z = self.nearest_z(cell.x, cell.y, z);
            if (next_z - z).abs() > self.max_step {
                return false;
            }

            previous = cell;
            z = next_z;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heightmap_creation() {
        let geo = HeightMapGeo::new(2, 2, IVec2::ZERO, vec![0, 8, 16, 24], 32).unwrap();
        assert_eq!(geo.width, 2);
        assert_eq!(geo.height, 2);
        assert_eq!(geo.cell_height(1, 1), Some(24));
        assert_eq!(geo.cell_height(2, 0), None);
    }

    #[test]
    fn test_heightmap_invalid_size() {
        let result = HeightMapGeo::new(2, 2, IVec2::ZERO, vec![0, 0, 0], 32);
        assert!(matches!(result, Err(GeoPathError::InvalidMapData { .. })));
    }

    #[test]
    fn test_heightmap_rejects_zero_step() {
        let result = HeightMapGeo::new(1, 1, IVec2::ZERO, vec![0], 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_flat_flags_open_inside_closed_at_edges() {
        let geo = HeightMapGeo::flat(3, 3, 0).unwrap();
        assert_eq!(geo.cell_flags(1, 1), Some(Nswe::ALL));

        let corner = geo.cell_flags(0, 0).unwrap();
        assert!(corner.can_go_east());
        assert!(corner.can_go_south());
        assert!(!corner.can_go_west());
        assert!(!corner.can_go_north());
    }

    #[test]
    fn test_steep_step_cuts_connection() {
        let mut geo = HeightMapGeo::flat(3, 1, 0).unwrap();
        geo.set_height(1, 0, 100);

        assert!(!geo.cell_flags(0, 0).unwrap().can_go_east());
        assert!(!geo.cell_flags(1, 0).unwrap().can_go_west());
        assert!(!geo.cell_flags(1, 0).unwrap().can_go_east());
    }

    #[test]
    fn test_block_cell_isolates_it() {
        let mut geo = HeightMapGeo::flat(3, 3, 0).unwrap();
        geo.block_cell(1, 1);

        assert!(geo.is_blocked(1, 1));
        assert_eq!(geo.cell_flags(1, 1), Some(Nswe::NONE));
        assert!(!geo.cell_flags(0, 1).unwrap().can_go_east());
        assert!(!geo.cell_flags(1, 0).unwrap().can_go_south());
        assert!(!geo.cell_flags(2, 1).unwrap().can_go_west());
        assert!(!geo.cell_flags(1, 2).unwrap().can_go_north());
        assert_eq!(geo.blocked_count(), 1);
    }

    #[test]
    fn test_from_ascii() {
        let geo = HeightMapGeo::from_ascii(&["..#", "...", "#.."], 5).unwrap();
        assert_eq!((geo.width, geo.height), (3, 3));
        assert!(geo.is_blocked(2, 0));
        assert!(geo.is_blocked(0, 2));
        assert!(!geo.is_blocked(1, 1));
        assert_eq!(geo.cell_height(1, 1), Some(5));
    }

    #[test]
    fn test_from_ascii_rejects_ragged_rows() {
        assert!(HeightMapGeo::from_ascii(&["...", ".."], 0).is_err());
        assert!(HeightMapGeo::from_ascii(&["..x"], 0).is_err());
    }

    #[test]
    fn test_coordinate_conversion_round_trip() {
        let geo = HeightMapGeo::new(4, 4, IVec2::new(-32, 64), vec![0; 16], 32).unwrap();

        assert_eq!(geo.geo_x(-32), 0);
        assert_eq!(geo.geo_x(-17), 0);
        assert_eq!(geo.geo_x(-16), 1);
        assert_eq!(geo.geo_x(-33), -1);
        assert_eq!(geo.geo_y(64), 0);

        for cell in 0..4 {
            assert_eq!(geo.geo_x(geo.world_x(cell)), cell);
            assert_eq!(geo.geo_y(geo.world_y(cell)), cell);
        }

        assert!(geo.has_geo(-32, 64));
        assert!(!geo.has_geo(-33, 64));
        assert!(!geo.has_geo(32, 64 + 4 * CELL_SIZE));
    }

    #[test]
    fn test_height_outside_map_keeps_requested_z() {
        let geo = HeightMapGeo::flat(2, 2, 40).unwrap();
        assert_eq!(geo.height(8, 8, 0), 40);
        assert_eq!(geo.height(-100, -100, 77), 77);
    }

    #[test]
    fn test_can_move_on_open_ground() {
        let geo = HeightMapGeo::flat(10, 10, 0).unwrap();
        let from = IVec3::new(geo.world_x(0), geo.world_y(0), 0);
        let to = IVec3::new(geo.world_x(9), geo.world_y(6), 0);
        assert!(geo.can_move_to_target(from, to, None));
        assert!(geo.can_move_to_target(to, from, None));
    }

    #[test]
    fn test_can_move_blocked_by_wall() {
        let geo = HeightMapGeo::from_ascii(&["..#..", "..#..", "..#.."], 0).unwrap();
        let from = IVec3::new(geo.world_x(0), geo.world_y(1), 0);
        let to = IVec3::new(geo.world_x(4), geo.world_y(1), 0);
        assert!(!geo.can_move_to_target(from, to, None));
    }

    #[test]
    fn test_can_move_refuses_corner_cut() {
        // Moving diagonally from (0,1) to (1,0) would squeeze past the wall at (0,0)
        let geo = HeightMapGeo::from_ascii(&["#.", ".."], 0).unwrap();
        let from = IVec3::new(geo.world_x(0), geo.world_y(1), 0);
        let to = IVec3::new(geo.world_x(1), geo.world_y(0), 0);
        assert!(!geo.can_move_to_target(from, to, None));
    }

    #[test]
    fn test_can_move_outside_map_fails() {
        let geo = HeightMapGeo::flat(4, 4, 0).unwrap();
        let from = IVec3::new(geo.world_x(0), geo.world_y(0), 0);
        assert!(!geo.can_move_to_target(from, IVec3::new(-500, 0, 0), None));
    }

    #[test]
    fn test_can_move_over_gentle_slope_with_z_dominant_line() {
        let heights: Vec<i32> = (0..4).map(|x| x * 30).collect();
        let geo = HeightMapGeo::new(4, 1, IVec2::ZERO, heights, 32).unwrap();
        let from = IVec3::new(geo.world_x(0), geo.world_y(0), 0);
        let to = IVec3::new(geo.world_x(3), geo.world_y(0), 90);
        assert!(geo.can_move_to_target(from, to, None));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let mut geo = HeightMapGeo::flat(6, 5, 12).unwrap();
        geo.block_cell(2, 3);
        geo.set_height(4, 4, 20);

        let path = std::env::temp_dir().join(format!("geopath_map_{}.bin", std::process::id()));
        geo.save_to_file(&path).unwrap();
        let loaded = HeightMapGeo::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!((loaded.width, loaded.height), (6, 5));
        assert!(loaded.is_blocked(2, 3));
        assert_eq!(loaded.cell_height(4, 4), Some(20));
        assert_eq!(loaded.cell_flags(1, 1), geo.cell_flags(1, 1));
    }

    #[test]
    fn test_load_rejects_mismatched_cell_arrays() {
        let mut geo = HeightMapGeo::flat(4, 4, 0).unwrap();
        geo.blocked.truncate(3);

        let path = std::env::temp_dir().join(format!("geopath_bad_map_{}.bin", std::process::id()));
        geo.save_to_file(&path).unwrap();
        let result = HeightMapGeo::load_from_file(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(GeoPathError::CorruptedMapFile { .. })));
    }

    #[test]
    fn test_from_ascii_reports_row_length_in_chars() {
        let result = HeightMapGeo::from_ascii(&["...", "..é."], 0);
        match result {
            Err(GeoPathError::InvalidMapData { reason }) => {
                assert!(reason.contains("length 4"), "{reason}")
            }
            other => panic!("Expected InvalidMapData, got {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = HeightMapGeo::load_from_file("/no/such/dir/geopath_missing.bin");
        assert!(matches!(result, Err(GeoPathError::MapFileNotFound { .. })));
    }
}
