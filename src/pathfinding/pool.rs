//! Size-tiered pool of node buffers handed out with non-blocking locks

use crate::config::BufferTierConfig;
use crate::errors::{GeoPathError, GeoPathResult};
use crate::pathfinding::MoverKind;
use crate::pathfinding::buffer::NodeBuffer;
use bevy::prelude::*;
use derive_more::Display;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
struct TierCounters {
    uses: AtomicU64,
    playable_uses: AtomicU64,
    overflows: AtomicU64,
    playable_overflows: AtomicU64,
    elapsed_nanos: AtomicU64,
}

impl TierCounters {
    fn record_use(&self, mover: MoverKind) {
        self.uses.fetch_add(1, Ordering::Relaxed);
        if mover.is_playable() {
            self.playable_uses.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_overflow(&self, mover: MoverKind) {
        self.overflows.fetch_add(1, Ordering::Relaxed);
        if mover.is_playable() {
            self.playable_overflows.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_elapsed(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::Relaxed);
    }
}

/// Buffers of one map size; slots start empty and are filled on demand
#[derive(Debug)]
struct BufferTier {
    map_size: usize,
    slots: Box<[Mutex<Option<NodeBuffer>>]>,
    counters: TierCounters,
}

impl BufferTier {
    fn new(config: BufferTierConfig) -> Self {
        let slots = (0..config.count).map(|_| Mutex::new(None)).collect();
        Self {
            map_size: config.size,
            slots,
            counters: TierCounters::default(),
        }
    }

    /// Lock an idle buffer, growing the tier into an empty slot if none is idle
    fn try_acquire(&self) -> Option<MappedMutexGuard<'_, NodeBuffer>> {
        // Existing buffers first so the tier only grows under contention
        for slot in self.slots.iter() {
            let Some(guard) = slot.try_lock() else {
                continue;
            };
            if let Ok(buffer) = MutexGuard::try_map(guard, Option::as_mut) {
                return Some(buffer);
            }
        }

        for slot in self.slots.iter() {
            let Some(mut guard) = slot.try_lock() else {
                continue;
            };
            if guard.is_none() {
                debug!("Growing buffer tier {} by one buffer", self.map_size);
                *guard = Some(NodeBuffer::new(self.map_size));
            }
            if let Ok(buffer) = MutexGuard::try_map(guard, Option::as_mut) {
                return Some(buffer);
            }
        }

        None
    }

    /// Buffers created in this tier; an upper bound while other threads are acquiring
    fn tracked(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| match slot.try_lock() {
                Some(guard) => guard.is_some(),
                // A lease, or `try_acquire` briefly checking a slot that may still be empty
                None => true,
            })
            .count()
    }

    fn stats(&self) -> TierStats {
        let counters = &self.counters;
        TierStats {
            map_size: self.map_size,
            max_buffers: self.slots.len(),
            tracked_buffers: self.tracked(),
            uses: counters.uses.load(Ordering::Relaxed),
            playable_uses: counters.playable_uses.load(Ordering::Relaxed),
            overflows: counters.overflows.load(Ordering::Relaxed),
            playable_overflows: counters.playable_overflows.load(Ordering::Relaxed),
            elapsed: Duration::from_nanos(counters.elapsed_nanos.load(Ordering::Relaxed)),
        }
    }
}

/// Snapshot of one tier's usage
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display(
    "Buffer {map_size}: {tracked_buffers}/{max_buffers} buffers, uses {uses} ({playable_uses} playable), overflows {overflows} ({playable_overflows} playable), total {elapsed:?}"
)]
pub struct TierStats {
    pub map_size: usize,
    pub max_buffers: usize,
    pub tracked_buffers: usize,
    pub uses: u64,
    pub playable_uses: u64,
    pub overflows: u64,
    pub playable_overflows: u64,
    pub elapsed: Duration,
}

enum LeasedBuffer<'a> {
    Pooled(MappedMutexGuard<'a, NodeBuffer>),
    Unpooled(Box<NodeBuffer>),
}

/// Exclusive use of one buffer; resets it and unlocks it on drop
pub struct BufferLease<'a> {
    buffer: LeasedBuffer<'a>,
    counters: &'a TierCounters,
}

impl BufferLease<'_> {
    /// False for the one-shot buffers handed out when a tier is saturated
    pub fn is_pooled(&self) -> bool {
        matches!(self.buffer, LeasedBuffer::Pooled(_))
    }
}

impl Deref for BufferLease<'_> {
    type Target = NodeBuffer;

    fn deref(&self) -> &NodeBuffer {
        match &self.buffer {
            LeasedBuffer::Pooled(guard) => guard,
            LeasedBuffer::Unpooled(buffer) => buffer,
        }
    }
}

impl DerefMut for BufferLease<'_> {
    fn deref_mut(&mut self) -> &mut NodeBuffer {
        match &mut self.buffer {
            LeasedBuffer::Pooled(guard) => guard,
            LeasedBuffer::Unpooled(buffer) => buffer,
        }
    }
}

impl Drop for BufferLease<'_> {
    fn drop(&mut self) {
        let elapsed = self.free();
        self.counters.record_elapsed(elapsed);
    }
}

/// Node buffers grouped by map size
///
/// Built once at startup and shared by every caller; each search leases a
/// buffer from the smallest tier that fits its window.
#[derive(Debug)]
pub struct BufferPool {
    tiers: Vec<BufferTier>,
}

impl BufferPool {
    pub fn new(configs: &[BufferTierConfig]) -> GeoPathResult<Self> {
        if configs.is_empty() {
            return Err(GeoPathError::InvalidBufferConfig {
                reason: "at least one buffer tier is required".to_string(),
            });
        }

        let mut configs = configs.to_vec();
        configs.sort_by_key(|tier| tier.size);

        for tier in &configs {
            if tier.size == 0 || tier.count == 0 {
                return Err(GeoPathError::InvalidBufferConfig {
                    reason: format!("buffer tier {tier} must have a non-zero size and count"),
                });
            }
        }
        if let Some(pair) = configs.windows(2).find(|pair| pair[0].size == pair[1].size) {
            return Err(GeoPathError::InvalidBufferConfig {
                reason: format!("buffer size {} is configured twice", pair[0].size),
            });
        }

        info!(
            "Buffer pool ready with {} tiers, largest map size {}",
            configs.len(),
            configs.last().map_or(0, |tier| tier.size)
        );

        Ok(Self {
            tiers: configs.into_iter().map(BufferTier::new).collect(),
        })
    }

    /// Largest window any tier can serve
    pub fn max_map_size(&self) -> usize {
        self.tiers.last().map_or(0, |tier| tier.map_size)
    }

    /// Lease a buffer with a map size of at least `required`
    ///
    /// Never blocks. When every buffer of the fitting tier is busy and the
    /// tier is full, a one-shot buffer of that tier's size is returned.
    pub fn allocate(&self, required: usize, mover: MoverKind) -> Option<BufferLease<'_>> {
        let Some(tier) = self.tiers.iter().find(|tier| tier.map_size >= required) else {
            error!(
                "No buffer tier fits a map size of {required} (largest is {}); check the buffer configuration",
                self.max_map_size()
            );
            return None;
        };

        tier.counters.record_use(mover);
        let buffer = match tier.try_acquire() {
            Some(guard) => LeasedBuffer::Pooled(guard),
            None => {
                tier.counters.record_overflow(mover);
                debug!(
                    "Buffer tier {} saturated, using an unpooled buffer",
                    tier.map_size
                );
                LeasedBuffer::Unpooled(Box::new(NodeBuffer::new(tier.map_size)))
            }
        };

        Some(BufferLease {
            buffer,
            counters: &tier.counters,
        })
    }

    /// Number of buffers a tier currently keeps, or `None` for an unknown size
    /// Buffers created in the tier of exactly `map_size`; may over-count under contention
    pub fn tracked_buffers(&self, map_size: usize) -> Option<usize> {
        self.tiers
            .iter()
            .find(|tier| tier.map_size == map_size)
            .map(BufferTier::tracked)
    }

    pub fn stats(&self) -> Vec<TierStats> {
        self.tiers.iter().map(BufferTier::stats).collect()
    }
}
