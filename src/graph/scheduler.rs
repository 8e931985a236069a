use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};

use super::types::{Connection, UnitId};
use crate::error::EngineError;

/// Preallocated working storage for schedule computation. Reused across
/// `reschedule` calls so the traversal never touches the allocator; the
/// vectors are bounded by `scratch_capacity` and overflow surfaces as
/// [`EngineError::OutOfCapacity`] before the committed schedule is
/// touched.
pub(crate) struct SchedulerScratch {
    /// Units in first-encounter (reverse) order; reversed in place at
    /// the end of the traversal.
    pub order: Vec<UnitId>,
    /// BFS frontier, consumed with a moving head cursor.
    pub queue: Vec<UnitId>,
    pub unit_seen: FxHashSet<UnitId>,
    pub pair_seen: FxHashSet<(UnitId, usize)>,
    /// Freshly minted bus ids, committed by the graph on success.
    pub bus_ids: FxHashMap<(UnitId, usize), usize>,
    capacity: usize,
}

impl SchedulerScratch {
    pub fn new(scratch_capacity: usize, connection_capacity: usize) -> Self {
        Self {
            order: Vec::with_capacity(scratch_capacity),
            queue: Vec::with_capacity(scratch_capacity),
            unit_seen: FxHashSet::with_capacity_and_hasher(scratch_capacity, Default::default()),
            pair_seen: FxHashSet::with_capacity_and_hasher(
                connection_capacity,
                Default::default(),
            ),
            bus_ids: FxHashMap::with_capacity_and_hasher(connection_capacity, Default::default()),
            capacity: scratch_capacity,
        }
    }

    fn clear(&mut self) {
        self.order.clear();
        self.queue.clear();
        self.unit_seen.clear();
        self.pair_seen.clear();
        self.bus_ids.clear();
    }
}

/// Reverse breadth-first traversal rooted at the sinks.
///
/// Every unit reachable from a sink lands in `scratch.order` exactly
/// once, producers before consumers (the first-encounter order is
/// reversed at the end). Every (consumer, channel) pair with at least
/// one incoming connection is assigned a distinct, monotonically
/// increasing bus id. The pair-seen set bounds the walk, so a graph
/// containing a cycle terminates; what such a graph *sounds* like is
/// unspecified, but the traversal is finite.
pub(crate) fn compute_schedule(
    connections: &[Connection],
    sinks: &[UnitId],
    bus_capacity: usize,
    scratch: &mut SchedulerScratch,
) -> Result<(), EngineError> {
    scratch.clear();
    let mut next_bus = 0usize;

    for &sink in sinks {
        if scratch.unit_seen.insert(sink) {
            if scratch.order.len() >= scratch.capacity {
                return Err(EngineError::OutOfCapacity);
            }
            scratch.order.push(sink);
            scratch.queue.push(sink);
        } else {
            warn!("duplicate sink {:?} in outputs list, ignoring", sink);
        }
    }

    let mut head = 0;
    while head < scratch.queue.len() {
        let unit = scratch.queue[head];
        head += 1;

        for conn in connections.iter().filter(|c| c.to == unit) {
            if scratch.pair_seen.insert((unit, conn.channel)) {
                if next_bus >= bus_capacity {
                    return Err(EngineError::OutOfCapacity);
                }
                scratch.bus_ids.insert((unit, conn.channel), next_bus);
                next_bus += 1;
            }
            if scratch.unit_seen.insert(conn.from) {
                if scratch.order.len() >= scratch.capacity
                    || scratch.queue.len() >= scratch.capacity
                {
                    return Err(EngineError::OutOfCapacity);
                }
                scratch.order.push(conn.from);
                scratch.queue.push(conn.from);
            }
        }
    }

    // Consumers were met first; flip so producers run first and sinks
    // land at the end.
    scratch.order.reverse();
    Ok(())
}
