//! Search grid nodes

use crate::geo::{GeoEngine, Nswe};
use bevy::prelude::*;
use derive_more::Display;
use std::hash::{Hash, Hasher};

/// Cost marker of a node no search has reached yet
pub const UNVISITED: f64 = -1.0;

/// A grid lattice waypoint: cell indices plus terrain height in world units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("({x}, {y}, {z})")]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridPoint {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Representative world position of this cell
    pub fn to_world<G: GeoEngine + ?Sized>(&self, geo: &G) -> IVec3 {
        IVec3::new(geo.world_x(self.x), geo.world_y(self.y), self.z)
    }

    /// Chebyshev distance in the x/y plane
    pub fn chebyshev_distance(&self, other: &GridPoint) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

/// Grid location resolved against terrain: height and movement flags of the nearest layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLoc {
    pub point: GridPoint,
    pub nswe: Nswe,
}

impl NodeLoc {
    pub fn resolve<G: GeoEngine + ?Sized>(geo: &G, x: i32, y: i32, z: i32) -> Self {
        let z = geo.nearest_z(x, y, z);
        Self {
            point: GridPoint::new(x, y, z),
            nswe: geo.nswe(x, y, z),
        }
    }
}

/// One arena cell of a node buffer carrying A* bookkeeping
///
/// Parents are arena slot indices of the owning buffer, never references.
#[derive(Debug, Clone)]
pub struct GridNode {
    loc: Option<NodeLoc>,
    parent: Option<usize>,
    in_use: bool,
    closed: bool,
    g: f64,
    h: f64,
    f: f64,
}

impl GridNode {
    pub fn new(loc: NodeLoc) -> Self {
        Self {
            loc: Some(loc),
            parent: None,
            in_use: true,
            closed: false,
            g: UNVISITED,
            h: 0.0,
            f: UNVISITED,
        }
    }

    /// Claim a node left over from an earlier search for a new location
    pub fn reuse(&mut self, loc: NodeLoc) {
        self.loc = Some(loc);
        self.in_use = true;
    }

    /// Return to the idle state; the location is kept for the next reuse
    pub fn free(&mut self) {
        self.parent = None;
        self.in_use = false;
        self.closed = false;
        self.g = UNVISITED;
        self.h = 0.0;
        self.f = UNVISITED;
    }

    pub fn loc(&self) -> Option<&NodeLoc> {
        self.loc.as_ref()
    }

    /// Take the location out of the node; later reads see `None`
    pub fn take_loc(&mut self) -> Option<NodeLoc> {
        self.loc.take()
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_visited(&self) -> bool {
        self.g >= 0.0
    }

    pub fn g(&self) -> f64 {
        self.g
    }

    pub fn h(&self) -> f64 {
        self.h
    }

    pub fn f(&self) -> f64 {
        self.f
    }

    /// Legacy single cost value; same as `f`
    pub fn cost(&self) -> f64 {
        self.f
    }

    /// Record a (better) way to reach this node
    pub fn set_route(&mut self, parent: Option<usize>, g: f64, h: f64) {
        self.parent = parent;
        self.g = g;
        self.h = h;
        self.f = g + h;
    }
}

impl PartialEq for GridNode {
    fn eq(&self, other: &Self) -> bool {
        self.loc.map(|l| l.point) == other.loc.map(|l| l.point)
    }
}

impl Eq for GridNode {}

impl Hash for GridNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.loc.map(|l| l.point).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn loc(x: i32, y: i32, z: i32) -> NodeLoc {
        NodeLoc {
            point: GridPoint::new(x, y, z),
            nswe: Nswe::ALL,
        }
    }

    #[test]
    fn test_new_node_is_unvisited() {
        let node = GridNode::new(loc(1, 2, 3));
        assert!(node.is_in_use());
        assert!(!node.is_visited());
        assert_eq!(node.g(), UNVISITED);
        assert_eq!(node.parent(), None);
    }

    #[test]
    fn test_total_tracks_cost_and_heuristic() {
        let mut node = GridNode::new(loc(0, 0, 0));
        node.set_route(Some(4), 2.5, 4.0);
        assert_eq!(node.f(), 6.5);
        assert_eq!(node.cost(), node.f());

        node.set_route(Some(9), 1.0, 4.0);
        assert_eq!(node.f(), 5.0);
        assert_eq!(node.parent(), Some(9));
    }

    #[test]
    fn test_free_resets_transient_state() {
        let mut node = GridNode::new(loc(0, 0, 0));
        node.set_route(Some(1), 3.0, 1.0);
        node.close();
        node.free();

        assert!(!node.is_in_use());
        assert!(!node.is_closed());
        assert_eq!(node.g(), UNVISITED);
        assert_eq!(node.parent(), None);
        assert!(node.loc().is_some());
    }

    #[test]
    fn test_equality_by_location_only() {
        let mut a = GridNode::new(loc(5, 5, 0));
        let b = GridNode::new(loc(5, 5, 0));
        a.set_route(Some(3), 10.0, 1.0);
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&GridNode::new(loc(5, 6, 0))));
    }

    #[test]
    fn test_take_loc_clears_location() {
        let mut node = GridNode::new(loc(2, 2, 2));
        assert_eq!(node.take_loc().map(|l| l.point), Some(GridPoint::new(2, 2, 2)));
        assert!(node.loc().is_none());
        assert!(node.take_loc().is_none());
    }

    #[test]
    fn test_grid_point_display_and_distance() {
        let a = GridPoint::new(1, 2, 3);
        assert_eq!(a.to_string(), "(1, 2, 3)");
        assert_eq!(a.chebyshev_distance(&GridPoint::new(4, -5, 0)), 7);
    }
}
