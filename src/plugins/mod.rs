use crate::components::{NavAgent, WorldPosition};
use crate::geo::GeoEngine;
use crate::pathfinding::PathFinder;
use bevy::prelude::*;

/// Makes a [`PathFinder`] available as a resource and plans routes for [`NavAgent`]s
pub struct GeoPathPlugin<G: GeoEngine + ?Sized> {
    finder: PathFinder<G>,
}

impl<G: GeoEngine + ?Sized> GeoPathPlugin<G> {
    pub fn new(finder: PathFinder<G>) -> Self {
        Self { finder }
    }
}

impl<G: GeoEngine + ?Sized + 'static> Plugin for GeoPathPlugin<G> {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.finder.clone())
            .add_systems(Update, (plan_paths::<G>, advance_waypoints::<G>).chain());
    }
}

/// Plan a route for every agent that has a destination but no path
pub fn plan_paths<G: GeoEngine + ?Sized + 'static>(
    mut agents: Query<(Entity, &mut NavAgent, &WorldPosition)>,
    finder: Res<PathFinder<G>>,
) {
    for (entity, mut agent, position) in agents.iter_mut() {
        if !agent.needs_path() {
            continue;
        }
        let Some(destination) = agent.destination else {
            continue;
        };

        match finder.find_path(position.0, destination, agent.instance, agent.mover) {
            Some(path) => {
                debug!(
                    "Planned {} waypoints for {entity} from {} to {destination}",
                    path.len(),
                    position.0
                );
                agent.set_path(path);
            }
            None => {
                warn!(
                    "No path for {entity} from {} to {destination} - dropping destination",
                    position.0
                );
                agent.destination = None;
            }
        }
    }
}

/// Step agents past waypoints whose cell they stand in; finished agents lose their destination
pub fn advance_waypoints<G: GeoEngine + ?Sized + 'static>(
    mut agents: Query<(&mut NavAgent, &WorldPosition)>,
    finder: Res<PathFinder<G>>,
) {
    let geo = finder.geo();
    for (mut agent, position) in agents.iter_mut() {
        let Some(waypoint) = agent.current_waypoint() else {
            continue;
        };

        let cell = (geo.geo_x(position.0.x), geo.geo_y(position.0.y));
        if cell != (waypoint.x, waypoint.y) {
            continue;
        }

        if !agent.advance_waypoint() {
            debug!("Agent reached its destination at {waypoint}");
            agent.destination = None;
            agent.clear_path();
        }
    }
}
