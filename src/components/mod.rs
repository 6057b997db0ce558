use crate::geo::InstanceId;
use crate::pathfinding::{GridPoint, MoverKind};
use bevy::prelude::*;
use derive_more::{Display, From};

/// World position of an entity in geodata units (z is height)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Component, Display, From)]
pub struct WorldPosition(pub IVec3);

/// An entity that wants to walk somewhere on the geodata
#[derive(Debug, Clone, Default, Component)]
pub struct NavAgent {
    pub destination: Option<IVec3>,
    pub mover: MoverKind,
    pub instance: Option<InstanceId>,
    waypoints: Vec<GridPoint>,
    cursor: usize,
}

impl NavAgent {
    pub fn new(mover: MoverKind) -> Self {
        Self {
            mover,
            ..default()
        }
    }

    pub fn with_instance(mut self, instance: InstanceId) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Ask for a new route; the current path is dropped
    pub fn go_to(&mut self, destination: IVec3) {
        self.destination = Some(destination);
        self.clear_path();
    }

    pub fn set_path(&mut self, waypoints: Vec<GridPoint>) {
        self.waypoints = waypoints;
        self.cursor = 0;
    }

    pub fn clear_path(&mut self) {
        self.waypoints.clear();
        self.cursor = 0;
    }

    pub fn has_path(&self) -> bool {
        !self.waypoints.is_empty()
    }

    /// Destination set but no route planned yet
    pub fn needs_path(&self) -> bool {
        self.destination.is_some() && !self.has_path()
    }

    pub fn waypoints(&self) -> &[GridPoint] {
        &self.waypoints
    }

    pub fn current_waypoint(&self) -> Option<GridPoint> {
        self.waypoints.get(self.cursor).copied()
    }

    /// Move on to the next waypoint; returns false once the path is finished
    pub fn advance_waypoint(&mut self) -> bool {
        if self.cursor < self.waypoints.len() {
            self.cursor += 1;
        }
        self.cursor < self.waypoints.len()
    }
}
