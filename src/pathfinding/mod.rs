use crate::config::GeoPathConfig;
use crate::errors::GeoPathResult;
use crate::geo::{GeoEngine, InstanceId};
use bevy::prelude::*;
use derive_more::Display;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub mod buffer;
pub mod node;
pub mod pool;
pub mod route;

pub use buffer::{MAX_ITERATIONS, MAX_STEP_HEIGHT, NodeBuffer, SearchWeights, TARGET_Z_TOLERANCE};
pub use node::{GridNode, GridPoint, NodeLoc};
pub use pool::{BufferLease, BufferPool, TierStats};

/// Cells added around the start/target span when sizing a search window
pub const WINDOW_MARGIN: usize = 64;

/// Who is asking for a path; only playable movers get their paths smoothed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum MoverKind {
    Playable,
    #[default]
    Npc,
}

impl MoverKind {
    pub fn is_playable(self) -> bool {
        self == MoverKind::Playable
    }
}

#[derive(Debug, Default)]
struct FinderCounters {
    successes: AtomicU64,
    failures: AtomicU64,
    postfilter_uses: AtomicU64,
    postfilter_passes: AtomicU64,
    postfilter_nanos: AtomicU64,
}

/// Snapshot of the finder's usage counters
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display(
    "Paths found: {successes}, failed: {failures}, post-filter uses: {postfilter_uses} ({postfilter_passes} passes, {postfilter_elapsed:?})"
)]
pub struct FinderStats {
    pub successes: u64,
    pub failures: u64,
    pub postfilter_uses: u64,
    pub postfilter_passes: u64,
    pub postfilter_elapsed: Duration,
}

/// Entry point for path searches over a terrain collaborator
///
/// Cheap to clone; every clone shares the same pool, config and counters, so
/// one finder built at startup can be handed to any number of threads.
pub struct PathFinder<G: GeoEngine + ?Sized> {
    geo: Arc<G>,
    pool: Arc<BufferPool>,
    config: Arc<GeoPathConfig>,
    weights: SearchWeights,
    counters: Arc<FinderCounters>,
}

impl<G: GeoEngine + ?Sized> Clone for PathFinder<G> {
    fn clone(&self) -> Self {
        Self {
            geo: Arc::clone(&self.geo),
            pool: Arc::clone(&self.pool),
            config: Arc::clone(&self.config),
            weights: self.weights,
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<G: GeoEngine + ?Sized + 'static> Resource for PathFinder<G> {}

impl<G: GeoEngine + ?Sized> PathFinder<G> {
    /// Build the finder and its buffer pool; bad buffer tiers are rejected here
    pub fn new(geo: Arc<G>, config: GeoPathConfig) -> GeoPathResult<Self> {
        config.check()?;
        let pool = BufferPool::new(&config.buffers)?;

        Ok(Self {
            geo,
            pool: Arc::new(pool),
            weights: SearchWeights::from(&config),
            config: Arc::new(config),
            counters: Arc::new(FinderCounters::default()),
        })
    }

    pub fn geo(&self) -> &G {
        &self.geo
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn config(&self) -> &GeoPathConfig {
        &self.config
    }

    /// Find a walkable route between two world positions
    ///
    /// Returns grid waypoints from just after the start to the target cell,
    /// or `None` when no route exists. Internal failures, including panics
    /// raised by the terrain collaborator, are logged and reported as `None`.
    pub fn find_path(
        &self,
        start: IVec3,
        target: IVec3,
        instance: Option<InstanceId>,
        mover: MoverKind,
    ) -> Option<Vec<GridPoint>> {
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| self.search(start, target, instance, mover)));

        let path = match outcome {
            Ok(Ok(path)) => path,
            Ok(Err(e)) => {
                error!("Path search {start} -> {target} failed: {e}");
                None
            }
            Err(payload) => {
                error!(
                    "Path search {start} -> {target} panicked: {}",
                    panic_message(payload.as_ref())
                );
                None
            }
        };

        let counter = match path {
            Some(_) => &self.counters.successes,
            None => &self.counters.failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        path
    }

    fn search(
        &self,
        start: IVec3,
        target: IVec3,
        instance: Option<InstanceId>,
        mover: MoverKind,
    ) -> GeoPathResult<Option<Vec<GridPoint>>> {
        let geo = self.geo.as_ref();
        if !geo.has_geo(start.x, start.y) || !geo.has_geo(target.x, target.y) {
            debug!("No geodata at {start} or {target}");
            return Ok(None);
        }

        let start_z = geo.height(start.x, start.y, start.z);
        let target_z = geo.height(target.x, target.y, target.z);
        let from = GridPoint::new(geo.geo_x(start.x), geo.geo_y(start.y), start_z);
        let to = GridPoint::new(geo.geo_x(target.x), geo.geo_y(target.y), target_z);

        let span = (to.x - from.x).unsigned_abs().max((to.y - from.y).unsigned_abs()) as usize;
        let required = WINDOW_MARGIN + 2 * span;
        let Some(mut buffer) = self.pool.allocate(required, mover) else {
            return Ok(None);
        };

        let Some(goal) = buffer.find_path(geo, &self.weights, from, to) else {
            debug!(
                "No path {from} -> {to} after {} iterations",
                buffer.iterations()
            );
            return Ok(None);
        };
        let mut path = route::construct_path(&mut buffer, goal, self.weights.advanced_diagonal)?;
        drop(buffer);

        let max_passes = self.config.max_postfilter_passes.get();
        if path.len() < 3 || max_passes == 0 || !mover.is_playable() {
            return Ok(Some(path));
        }

        let started = Instant::now();
        let origin = IVec3::new(start.x, start.y, start_z);
        let passes = route::post_filter(&mut path, origin, geo, instance, max_passes);

        let counters = &self.counters;
        counters.postfilter_uses.fetch_add(1, Ordering::Relaxed);
        counters
            .postfilter_passes
            .fetch_add(u64::from(passes), Ordering::Relaxed);
        let nanos = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        counters.postfilter_nanos.fetch_add(nanos, Ordering::Relaxed);

        Ok(Some(path))
    }

    pub fn stats(&self) -> FinderStats {
        let counters = &self.counters;
        FinderStats {
            successes: counters.successes.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
            postfilter_uses: counters.postfilter_uses.load(Ordering::Relaxed),
            postfilter_passes: counters.postfilter_passes.load(Ordering::Relaxed),
            postfilter_elapsed: Duration::from_nanos(
                counters.postfilter_nanos.load(Ordering::Relaxed),
            ),
        }
    }

    /// Human readable usage report, one line per buffer tier plus the totals
    pub fn report(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.pool.stats().iter().map(ToString::to_string).collect();
        lines.push(self.stats().to_string());
        lines
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
