//! Turning a finished search into waypoints and smoothing them

use crate::errors::{GeoPathError, GeoPathResult};
use crate::geo::{GeoEngine, InstanceId};
use crate::pathfinding::buffer::NodeBuffer;
use crate::pathfinding::node::GridPoint;
use bevy::prelude::*;

fn point_at(buffer: &NodeBuffer, slot: usize) -> GeoPathResult<GridPoint> {
    buffer
        .node(slot)
        .and_then(|node| node.loc())
        .map(|loc| loc.point)
        .ok_or_else(|| GeoPathError::CorruptedSearch {
            reason: format!("node at slot {slot} has no location during reconstruction"),
        })
}

/// Collect the waypoints from the search start to `goal`, one per change of direction
///
/// The start cell itself is not part of the result unless it is also the goal.
/// Every consumed node gives up its location, so a parent chain that loops
/// back onto an already consumed node is reported as corruption.
pub fn construct_path(
    buffer: &mut NodeBuffer,
    goal: usize,
    advanced_diagonal: bool,
) -> GeoPathResult<Vec<GridPoint>> {
    let mut path = Vec::new();
    let mut previous: Option<IVec2> = None;
    let mut slot = goal;

    while let Some(parent) = buffer.node(slot).and_then(|node| node.parent()) {
        let here = point_at(buffer, slot)?;
        let from = point_at(buffer, parent)?;

        let mut direction = IVec2::new(here.x - from.x, here.y - from.y);
        if !advanced_diagonal {
            // Two cardinal steps that add up to a diagonal count as that diagonal
            if let Some(grandparent) = buffer.node(parent).and_then(|node| node.parent()) {
                let before = point_at(buffer, grandparent)?;
                let span = IVec2::new(here.x - before.x, here.y - before.y);
                if span.x.abs() == span.y.abs() {
                    direction = span;
                }
            }
        }

        if previous != Some(direction) {
            previous = Some(direction);
            let loc = buffer
                .node_mut(slot)
                .and_then(|node| node.take_loc())
                .ok_or_else(|| GeoPathError::CorruptedSearch {
                    reason: format!("waypoint at slot {slot} consumed twice"),
                })?;
            path.push(loc.point);
        }

        slot = parent;
    }

    if path.is_empty() {
        // Start and goal share a cell
        path.push(point_at(buffer, slot)?);
    }

    path.reverse();
    Ok(path)
}

/// Drop waypoints the mover can skip by walking straight to the one after
///
/// `origin` is the mover's world position. Each pass walks the path with an
/// anchor starting at the origin: a waypoint is removed when the anchor has a
/// clear line to its successor, otherwise it is kept and becomes the anchor.
/// The destination is always kept. Passes repeat while the previous one
/// removed something, more than two waypoints remain and fewer than
/// `max_passes` have run. Returns the number of passes made.
pub fn post_filter<G: GeoEngine + ?Sized>(
    path: &mut Vec<GridPoint>,
    origin: IVec3,
    geo: &G,
    instance: Option<InstanceId>,
    max_passes: u32,
) -> u32 {
    let mut passes = 0;
    while passes < max_passes {
        passes += 1;

        let mut changed = false;
        let mut anchor = origin;
        let mut kept = Vec::with_capacity(path.len());
        for (index, &waypoint) in path.iter().enumerate() {
            let Some(next) = path.get(index + 1) else {
                kept.push(waypoint);
                break;
            };
            if geo.can_move_to_target(anchor, next.to_world(geo), instance) {
                changed = true;
            } else {
                anchor = waypoint.to_world(geo);
                kept.push(waypoint);
            }
        }
        *path = kept;

        if !changed || path.len() <= 2 {
            break;
        }
    }

    trace!("Post-filter finished after {passes} passes, {} waypoints", path.len());
    passes
}
