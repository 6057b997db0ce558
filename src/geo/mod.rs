//! Terrain collaborator interface consumed by the pathfinder

use bevy::prelude::*;
use derive_more::Display;
use serde::{Deserialize, Serialize};

pub mod heightmap;
pub mod line;

pub use heightmap::*;
pub use line::*;

/// World units covered by one geodata cell along x and y
pub const CELL_SIZE: i32 = 16;

/// Set of directions a mover may leave a terrain cell in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Nswe(u8);

impl Nswe {
    pub const NONE: Nswe = Nswe(0);
    pub const EAST: Nswe = Nswe(1 << 0);
    pub const WEST: Nswe = Nswe(1 << 1);
    pub const SOUTH: Nswe = Nswe(1 << 2);
    pub const NORTH: Nswe = Nswe(1 << 3);
    pub const ALL: Nswe = Nswe(0b1111);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Nswe) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Nswe) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Nswe) {
        self.0 &= !other.0;
    }

    pub fn can_go_east(self) -> bool {
        self.contains(Self::EAST)
    }

    pub fn can_go_west(self) -> bool {
        self.contains(Self::WEST)
    }

    pub fn can_go_south(self) -> bool {
        self.contains(Self::SOUTH)
    }

    pub fn can_go_north(self) -> bool {
        self.contains(Self::NORTH)
    }

    pub fn can_go_all(self) -> bool {
        self == Self::ALL
    }

    pub fn can_go_none(self) -> bool {
        self == Self::NONE
    }

    /// Flag for a unit step along x (east is +x)
    pub fn toward_x(dx: i32) -> Nswe {
        match dx.signum() {
            1 => Self::EAST,
            -1 => Self::WEST,
            _ => Self::NONE,
        }
    }

    /// Flag for a unit step along y (south is +y)
    pub fn toward_y(dy: i32) -> Nswe {
        match dy.signum() {
            1 => Self::SOUTH,
            -1 => Self::NORTH,
            _ => Self::NONE,
        }
    }
}

/// Opaque handle of the world instance a mover lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("instance#{_0}")]
pub struct InstanceId(pub u32);

/// Terrain storage and movement rules, provided by the embedding server
///
/// World coordinates are continuous-ish integers, geo coordinates are cell
/// indices. Heights are always world units.
pub trait GeoEngine: Send + Sync {
    /// Whether terrain data exists under a world position
    fn has_geo(&self, world_x: i32, world_y: i32) -> bool;

    /// Ground height at a world position, nearest to `world_z`
    fn height(&self, world_x: i32, world_y: i32, world_z: i32) -> i32;

    fn geo_x(&self, world_x: i32) -> i32;

    fn geo_y(&self, world_y: i32) -> i32;

    /// Representative world x of a geo cell (its centre)
    fn world_x(&self, geo_x: i32) -> i32;

    /// Representative world y of a geo cell (its centre)
    fn world_y(&self, geo_y: i32) -> i32;

    /// Height of the terrain layer at a geo cell that is nearest to `z`
    fn nearest_z(&self, geo_x: i32, geo_y: i32, z: i32) -> i32;

    /// Movement flags of the terrain layer at a geo cell nearest to `z`
    fn nswe(&self, geo_x: i32, geo_y: i32, z: i32) -> Nswe;

    /// Whether a mover can walk in a straight line between two world points
    fn can_move_to_target(&self, from: IVec3, to: IVec3, instance: Option<InstanceId>) -> bool;
}

impl<G: GeoEngine + ?Sized> GeoEngine for std::sync::Arc<G> {
    fn has_geo(&self, world_x: i32, world_y: i32) -> bool {
        (**self).has_geo(world_x, world_y)
    }

    fn height(&self, world_x: i32, world_y: i32, world_z: i32) -> i32 {
        (**self).height(world_x, world_y, world_z)
    }

    fn geo_x(&self, world_x: i32) -> i32 {
        (**self).geo_x(world_x)
    }

    fn geo_y(&self, world_y: i32) -> i32 {
        (**self).geo_y(world_y)
    }

    fn world_x(&self, geo_x: i32) -> i32 {
        (**self).world_x(geo_x)
    }

    fn world_y(&self, geo_y: i32) -> i32 {
        (**self).world_y(geo_y)
    }

    fn nearest_z(&self, geo_x: i32, geo_y: i32, z: i32) -> i32 {
        (**self).nearest_z(geo_x, geo_y, z)
    }

    fn nswe(&self, geo_x: i32, geo_y: i32, z: i32) -> Nswe {
        (**self).nswe(geo_x, geo_y, z)
    }

    fn can_move_to_target(&self, from: IVec3, to: IVec3, instance: Option<InstanceId>) -> bool {
        (**self).can_move_to_target(from, to, instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nswe_flags() {
        let mut flags = Nswe::NONE;
        assert!(flags.can_go_none());

        flags.insert(Nswe::EAST);
        flags.insert(Nswe::NORTH);
        assert!(flags.can_go_east());
        assert!(flags.can_go_north());
        assert!(!flags.can_go_west());
        assert!(!flags.can_go_all());

        flags.insert(Nswe::WEST);
        flags.insert(Nswe::SOUTH);
        assert!(flags.can_go_all());

        flags.remove(Nswe::SOUTH);
        assert!(!flags.can_go_south());
        assert_eq!(flags.bits(), 0b1011);
    }

    #[test]
    fn test_nswe_from_bits_masks_unknown_bits() {
        assert_eq!(Nswe::from_bits(0xFF), Nswe::ALL);
    }

    #[test]
    fn test_step_direction_flags() {
        assert_eq!(Nswe::toward_x(1), Nswe::EAST);
        assert_eq!(Nswe::toward_x(-3), Nswe::WEST);
        assert_eq!(Nswe::toward_y(1), Nswe::SOUTH);
        assert_eq!(Nswe::toward_y(-1), Nswe::NORTH);
        assert_eq!(Nswe::toward_y(0), Nswe::NONE);
    }

    #[test]
    fn test_instance_display() {
        assert_eq!(InstanceId(7).to_string(), "instance#7");
    }
}
