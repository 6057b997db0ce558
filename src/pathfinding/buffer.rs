//! Reusable node window running one A* search at a time

use crate::config::GeoPathConfig;
use crate::geo::{GeoEngine, Nswe};
use crate::pathfinding::node::{GridNode, GridPoint, NodeLoc};
use bevy::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// Node expansions allowed before a search gives up
pub const MAX_ITERATIONS: usize = 7000;

/// Vertical distance under which the target cell counts as reached
pub const TARGET_Z_TOLERANCE: i32 = 64;

/// Height difference above which a step is considered rough terrain
pub const MAX_STEP_HEIGHT: i32 = 16;

/// Edge weights and diagonal toggle used by the search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchWeights {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub diagonal: f64,
    pub advanced_diagonal: bool,
}

impl From<&GeoPathConfig> for SearchWeights {
    fn from(config: &GeoPathConfig) -> Self {
        Self {
            low: f64::from(config.low_weight.get()),
            medium: f64::from(config.medium_weight.get()),
            high: f64::from(config.high_weight.get()),
            diagonal: f64::from(config.diagonal_weight.get()),
            advanced_diagonal: config.advanced_diagonal_strategy,
        }
    }
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self::from(&GeoPathConfig::default())
    }
}

/// Open set entry; the heap pops the lowest `f`, then the lowest `h`
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    f: f64,
    h: f64,
    g: f64,
    slot: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.h.total_cmp(&self.h))
            .then_with(|| other.slot.cmp(&self.slot))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

/// Square window of `map_size × map_size` nodes anchored per search
///
/// Nodes live in a dense arena indexed by offset from the search base and are
/// reset in bulk by [`NodeBuffer::free`], so a buffer serves any number of
/// searches without reallocating.
#[derive(Debug)]
pub struct NodeBuffer {
    map_size: usize,
    nodes: Vec<Option<GridNode>>,
    touched: Vec<usize>,
    open: BinaryHeap<OpenEntry>,
    base_x: i32,
    base_y: i32,
    target: GridPoint,
    iterations: usize,
    started_at: Option<Instant>,
    last_elapsed: Duration,
}

impl NodeBuffer {
    pub fn new(map_size: usize) -> Self {
        Self {
            map_size,
            nodes: vec![None; map_size * map_size],
            touched: Vec::new(),
            open: BinaryHeap::new(),
            base_x: 0,
            base_y: 0,
            target: GridPoint::new(0, 0, 0),
            iterations: 0,
            started_at: None,
            last_elapsed: Duration::ZERO,
        }
    }

    pub fn map_size(&self) -> usize {
        self.map_size
    }

    /// Nodes popped from the open set by the last search
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Duration of the last freed search
    pub fn last_elapsed(&self) -> Duration {
        self.last_elapsed
    }

    /// True when no search state is left behind
    pub fn is_clean(&self) -> bool {
        self.open.is_empty() && self.touched.is_empty()
    }

    pub fn node(&self, slot: usize) -> Option<&GridNode> {
        self.nodes.get(slot)?.as_ref()
    }

    pub fn node_mut(&mut self, slot: usize) -> Option<&mut GridNode> {
        self.nodes.get_mut(slot)?.as_mut()
    }

    /// Arena slot of a grid cell, if it lies inside the current window
    pub fn slot(&self, x: i32, y: i32) -> Option<usize> {
        let size = self.map_size as i64;
        let ax = i64::from(x) - i64::from(self.base_x);
        let ay = i64::from(y) - i64::from(self.base_y);
        if ax < 0 || ax >= size || ay < 0 || ay >= size {
            return None;
        }
        Some((ay * size + ax) as usize)
    }

    /// Run A* from `start` to `target`, returning the goal node's slot
    ///
    /// Grid points carry ground heights. The window is re-anchored so the
    /// straight line between both points sits in its middle.
    pub fn find_path<G: GeoEngine + ?Sized>(
        &mut self,
        geo: &G,
        weights: &SearchWeights,
        start: GridPoint,
        target: GridPoint,
    ) -> Option<usize> {
        self.started_at = Some(Instant::now());
        self.iterations = 0;

        let size = self.map_size as i32;
        self.base_x = start.x + (target.x - start.x - size) / 2;
        self.base_y = start.y + (target.y - start.y - size) / 2;
        self.target = target;

        let start_slot = self.get_node(geo, start.x, start.y, start.z)?;
        let start_point = self.point(start_slot)?;
        let h = self.heuristic(start_point);
        self.set_route(start_slot, None, 0.0, h)?;

        while self.iterations < MAX_ITERATIONS {
            let current = self.pop_open()?;
            self.iterations += 1;

            let node = self.node_mut(current)?;
            let point = node.loc()?.point;
            if point.x == target.x
                && point.y == target.y
                && (point.z - target.z).abs() < TARGET_Z_TOLERANCE
            {
                return Some(current);
            }

            node.close();
            self.expand(geo, weights, current);
        }

        debug!(
            "Search gave up after {} iterations: {} -> {}",
            self.iterations, start, target
        );
        None
    }

    /// Reset every node touched by the last search and clear the open set
    pub fn free(&mut self) -> Duration {
        self.open.clear();
        for slot in self.touched.drain(..) {
            if let Some(node) = self.nodes[slot].as_mut() {
                node.free();
            }
        }

        self.last_elapsed = self
            .started_at
            .take()
            .map(|started| started.elapsed())
            .unwrap_or_default();
        self.last_elapsed
    }

    fn point(&self, slot: usize) -> Option<GridPoint> {
        self.node(slot)?.loc().map(|loc| loc.point)
    }

    fn nswe(&self, slot: usize) -> Option<Nswe> {
        self.node(slot)?.loc().map(|loc| loc.nswe)
    }

    fn heuristic(&self, point: GridPoint) -> f64 {
        let dx = f64::from(point.x - self.target.x);
        let dy = f64::from(point.y - self.target.y);
        let dz = f64::from(point.z - self.target.z);
        (dx * dx + dy * dy + dz * dz / 256.0).sqrt()
    }

    /// Fetch the node for a cell, claiming and resolving it on first touch
    fn get_node<G: GeoEngine + ?Sized>(&mut self, geo: &G, x: i32, y: i32, z: i32) -> Option<usize> {
        let slot = self.slot(x, y)?;
        match &mut self.nodes[slot] {
            Some(node) if node.is_in_use() => {}
            Some(node) => {
                node.reuse(NodeLoc::resolve(geo, x, y, z));
                self.touched.push(slot);
            }
            empty => {
                *empty = Some(GridNode::new(NodeLoc::resolve(geo, x, y, z)));
                self.touched.push(slot);
            }
        }
        Some(slot)
    }

    fn set_route(&mut self, slot: usize, parent: Option<usize>, g: f64, h: f64) -> Option<()> {
        self.node_mut(slot)?.set_route(parent, g, h);
        self.open.push(OpenEntry {
            f: g + h,
            h,
            g,
            slot,
        });
        Some(())
    }

    /// Pop the best live entry, skipping closed nodes and superseded entries
    fn pop_open(&mut self) -> Option<usize> {
        while let Some(entry) = self.open.pop() {
            let Some(node) = self.node(entry.slot) else {
                continue;
            };
            if node.is_closed() || node.g() != entry.g {
                continue;
            }
            return Some(entry.slot);
        }
        None
    }

    fn expand<G: GeoEngine + ?Sized>(&mut self, geo: &G, weights: &SearchWeights, current: usize) {
        let Some(loc) = self.node(current).and_then(|node| node.loc().copied()) else {
            return;
        };
        if loc.nswe.can_go_none() {
            return;
        }

        let GridPoint { x, y, z } = loc.point;
        let east = loc
            .nswe
            .can_go_east()
            .then(|| self.add_node(geo, weights, current, x + 1, y, z, false))
            .flatten();
        let south = loc
            .nswe
            .can_go_south()
            .then(|| self.add_node(geo, weights, current, x, y + 1, z, false))
            .flatten();
        let west = loc
            .nswe
            .can_go_west()
            .then(|| self.add_node(geo, weights, current, x - 1, y, z, false))
            .flatten();
        let north = loc
            .nswe
            .can_go_north()
            .then(|| self.add_node(geo, weights, current, x, y - 1, z, false))
            .flatten();

        if !weights.advanced_diagonal {
            return;
        }

        let east = east.and_then(|slot| self.nswe(slot));
        let south = south.and_then(|slot| self.nswe(slot));
        let west = west.and_then(|slot| self.nswe(slot));
        let north = north.and_then(|slot| self.nswe(slot));

        // A diagonal needs both cardinal neighbours to lead around the corner
        if let (Some(e), Some(s)) = (east, south) {
            if e.can_go_south() && s.can_go_east() {
                self.add_node(geo, weights, current, x + 1, y + 1, z, true);
            }
        }
        if let (Some(s), Some(w)) = (south, west) {
            if w.can_go_south() && s.can_go_west() {
                self.add_node(geo, weights, current, x - 1, y + 1, z, true);
            }
        }
        if let (Some(n), Some(e)) = (north, east) {
            if e.can_go_north() && n.can_go_east() {
                self.add_node(geo, weights, current, x + 1, y - 1, z, true);
            }
        }
        if let (Some(n), Some(w)) = (north, west) {
            if w.can_go_north() && n.can_go_west() {
                self.add_node(geo, weights, current, x - 1, y - 1, z, true);
            }
        }
    }

    /// Offer a neighbour reached from `current`; returns its slot if it is inside the window
    #[allow(clippy::too_many_arguments)]
    fn add_node<G: GeoEngine + ?Sized>(
        &mut self,
        geo: &G,
        weights: &SearchWeights,
        current: usize,
        x: i32,
        y: i32,
        z: i32,
        diagonal: bool,
    ) -> Option<usize> {
        let slot = self.get_node(geo, x, y, z)?;
        let candidate = self.node(slot)?;
        if candidate.is_closed() {
            return Some(slot);
        }
        let loc = *candidate.loc()?;
        let known_g = candidate.is_visited().then(|| candidate.g());

        let parent = self.node(current)?;
        let parent_g = parent.g();
        let parent_z = parent.loc()?.point.z;

        let geo_z = loc.point.z;
        let step_z = (geo_z - parent_z).abs();
        let mut weight = if diagonal {
            weights.diagonal
        } else {
            weights.low
        };
        if !loc.nswe.can_go_all() || step_z > MAX_STEP_HEIGHT {
            weight = weights.high;
        } else if self.is_high_weight(geo, x + 1, y, geo_z)
            || self.is_high_weight(geo, x - 1, y, geo_z)
            || self.is_high_weight(geo, x, y + 1, geo_z)
            || self.is_high_weight(geo, x, y - 1, geo_z)
        {
            weight = weights.medium;
        }

        let g = parent_g + weight;
        if known_g.is_some_and(|known| g >= known) {
            return Some(slot);
        }

        let h = self.heuristic(loc.point);
        self.set_route(slot, Some(current), g, h)?;
        Some(slot)
    }

    fn is_high_weight<G: GeoEngine + ?Sized>(&mut self, geo: &G, x: i32, y: i32, z: i32) -> bool {
        let Some(slot) = self.get_node(geo, x, y, z) else {
            return true;
        };
        let Some(loc) = self.node(slot).and_then(|node| node.loc().copied()) else {
            return true;
        };
        !loc.nswe.can_go_all() || (loc.point.z - z).abs() > MAX_STEP_HEIGHT
    }
}
