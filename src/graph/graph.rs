use log::{debug, warn};
use rustc_hash::FxHashMap;

use super::bus::BusPool;
use super::scheduler::{compute_schedule, SchedulerScratch};
use super::types::{Connection, UnitId};
use crate::error::EngineError;
use crate::pool::Pool;
use crate::traits::{AudioUnit, MAX_UNIT_CHANNELS};

/// Construction parameters for an [`AudioGraph`]. Capacities are fixed
/// at construction; the non-real-time mutation paths may grow past
/// them, the `_real_time` paths fail with
/// [`EngineError::OutOfCapacity`] instead.
#[derive(Debug, Clone, Copy)]
pub struct GraphConfig {
    pub sample_rate: f32,
    pub max_block_size: usize,
    pub unit_capacity: usize,
    pub connection_capacity: usize,
    pub max_outputs: usize,
    /// Scheduler work-queue bound, in entries.
    pub scratch_capacity: usize,
    pub bus_capacity: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            max_block_size: 128,
            unit_capacity: 128,
            connection_capacity: 256,
            max_outputs: 16,
            scratch_capacity: 1024,
            bus_capacity: 64,
        }
    }
}

impl GraphConfig {
    pub fn new(sample_rate: f32, max_block_size: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            ..Self::default()
        }
    }
}

/// A pooled unit plus the bookkeeping the runner needs without going
/// through the trait object.
struct UnitEntry {
    unit: Box<dyn AudioUnit>,
    is_output: bool,
    inputs_connected: usize,
    outputs_connected: usize,
}

/// Where one of a unit's output slots lands: an internal bus, or a
/// host output channel (sinks only).
#[derive(Clone, Copy, PartialEq, Eq)]
enum OutTarget {
    Bus(usize),
    Host(usize),
}

/// The audio graph: owns the units, their connections, the schedule,
/// and the bus pool, and runs the whole thing once per block.
///
/// Mutation (`add`, `connect`, `disconnect`, `remove`) and execution
/// (`run`) must not overlap; the engine provides no locking. The usual
/// arrangement is a command queue drained between blocks, or pausing
/// the device around edits.
pub struct AudioGraph {
    units: Pool<UnitEntry>,
    connections: Vec<Connection>,
    outputs: Vec<UnitId>,
    schedule: Vec<UnitId>,
    bus_ids: FxHashMap<(UnitId, usize), usize>,
    bus_pool: BusPool,
    /// Per-unit output accumulation area, `MAX_UNIT_CHANNELS` channels
    /// of `max_block_size` frames.
    out_scratch: Vec<f32>,
    out_targets: Vec<OutTarget>,
    scratch: SchedulerScratch,
    revision: u64,
    scheduled_revision: u64,
    invalid: bool,
    sample_rate: f32,
    max_block_size: usize,
}

impl AudioGraph {
    pub fn new(config: GraphConfig) -> Self {
        assert!(config.sample_rate > 0.0, "sample rate must be positive");
        assert!(config.max_block_size > 0, "block size must be positive");
        Self {
            units: Pool::with_capacity(config.unit_capacity),
            connections: Vec::with_capacity(config.connection_capacity),
            outputs: Vec::with_capacity(config.max_outputs),
            schedule: Vec::with_capacity(config.scratch_capacity),
            bus_ids: FxHashMap::with_capacity_and_hasher(
                config.connection_capacity,
                Default::default(),
            ),
            bus_pool: BusPool::new(config.max_block_size, config.bus_capacity),
            out_scratch: vec![0.0; config.max_block_size * MAX_UNIT_CHANNELS],
            out_targets: Vec::with_capacity(config.connection_capacity),
            scratch: SchedulerScratch::new(config.scratch_capacity, config.connection_capacity),
            revision: 1,
            scheduled_revision: 0,
            invalid: false,
            sample_rate: config.sample_rate,
            max_block_size: config.max_block_size,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    fn entry_from(&mut self, mut unit: Box<dyn AudioUnit>) -> UnitEntry {
        unit.set_context(self.sample_rate, self.max_block_size);
        UnitEntry {
            is_output: unit.is_output(),
            unit,
            inputs_connected: 0,
            outputs_connected: 0,
        }
    }

    /// Insert a unit, growing the pool if it is full.
    pub fn add(&mut self, unit: Box<dyn AudioUnit>) -> UnitId {
        let entry = self.entry_from(unit);
        let is_output = entry.is_output;
        let id = UnitId(self.units.insert(entry));
        if is_output {
            self.outputs.push(id);
        }
        self.revision += 1;
        id
    }

    /// Insert a unit without allocating graph-side storage. Fails with
    /// [`EngineError::OutOfCapacity`] when the pool or the sink list is
    /// full.
    pub fn add_real_time(&mut self, unit: Box<dyn AudioUnit>) -> Result<UnitId, EngineError> {
        let entry = self.entry_from(unit);
        let is_output = entry.is_output;
        if is_output && self.outputs.len() == self.outputs.capacity() {
            return Err(EngineError::OutOfCapacity);
        }
        let id = UnitId(self.units.insert_within_capacity(entry)?);
        if is_output {
            self.outputs.push(id);
        }
        self.revision += 1;
        Ok(id)
    }

    /// Record a connection from `from`'s output into `to`'s input
    /// channel `channel`. Self-connections are rejected; everything
    /// else, including duplicates, is accepted.
    pub fn connect(
        &mut self,
        from: UnitId,
        to: UnitId,
        channel: usize,
    ) -> Result<(), EngineError> {
        if from == to {
            return Err(EngineError::FeedbackLoop);
        }
        assert!(channel < MAX_UNIT_CHANNELS, "channel out of range");
        if self.units.get(from.0).is_none() || self.units.get(to.0).is_none() {
            warn!("connect {:?} -> {:?} ignored: unknown unit", from, to);
            return Ok(());
        }
        self.connections.push(Connection { from, to, channel });
        if let Some(entry) = self.units.get_mut(to.0) {
            debug_assert!(channel < entry.unit.max_inputs());
            entry.inputs_connected += 1;
        }
        if let Some(entry) = self.units.get_mut(from.0) {
            entry.outputs_connected += 1;
        }
        self.revision += 1;
        Ok(())
    }

    /// Remove the first matching connection record, if any.
    pub fn disconnect(&mut self, from: UnitId, to: UnitId, channel: usize) {
        let found = self
            .connections
            .iter()
            .position(|c| c.from == from && c.to == to && c.channel == channel);
        if let Some(index) = found {
            self.connections.remove(index);
            if let Some(entry) = self.units.get_mut(to.0) {
                entry.inputs_connected -= 1;
            }
            if let Some(entry) = self.units.get_mut(from.0) {
                entry.outputs_connected -= 1;
            }
            self.revision += 1;
        }
    }

    /// Drop a unit together with every connection touching it.
    pub fn remove(&mut self, id: UnitId) {
        if self.units.get(id.0).is_none() {
            return;
        }
        // Fix up the counters of every connection partner before the
        // records go away.
        let mut i = 0;
        while i < self.connections.len() {
            let c = self.connections[i];
            if c.from == id || c.to == id {
                if c.from != id {
                    if let Some(entry) = self.units.get_mut(c.from.0) {
                        entry.outputs_connected -= 1;
                    }
                }
                if c.to != id {
                    if let Some(entry) = self.units.get_mut(c.to.0) {
                        entry.inputs_connected -= 1;
                    }
                }
                self.connections.remove(i);
            } else {
                i += 1;
            }
        }
        self.outputs.retain(|&sink| sink != id);
        self.units.remove(id.0);
        self.revision += 1;
    }

    /// Recompute the schedule and bus assignment if the graph changed
    /// since the last successful call; otherwise a no-op. On failure
    /// the previously committed schedule is untouched, but the graph is
    /// latched invalid and `run` emits silence until a later call
    /// succeeds.
    pub fn reschedule(&mut self) -> Result<(), EngineError> {
        if self.scheduled_revision == self.revision && !self.invalid {
            return Ok(());
        }
        match compute_schedule(
            &self.connections,
            &self.outputs,
            self.bus_pool.capacity(),
            &mut self.scratch,
        ) {
            Ok(()) => {
                self.schedule.clear();
                self.schedule.extend_from_slice(&self.scratch.order);
                self.bus_ids.clear();
                self.bus_ids
                    .extend(self.scratch.bus_ids.iter().map(|(&k, &v)| (k, v)));
                self.scheduled_revision = self.revision;
                self.invalid = false;
                debug!(
                    "rescheduled: {} units, {} buses",
                    self.schedule.len(),
                    self.bus_ids.len()
                );
                Ok(())
            }
            Err(err) => {
                self.invalid = true;
                warn!("reschedule failed: {err}");
                Err(err)
            }
        }
    }

    /// Fill the host's output channels starting at sample time `time`.
    ///
    /// `outputs` is planar: one `&mut [f32]` per channel, all the same
    /// length. The host buffer is processed in sub-blocks of at most
    /// `max_block_size` frames; `time` advances per sub-block and the
    /// new sample time is returned. Never fails: a graph latched
    /// invalid (or an empty one) produces zeros.
    pub fn run(&mut self, time: u64, _inputs: &[&[f32]], outputs: &mut [&mut [f32]]) -> u64 {
        let frames = outputs.first().map(|c| c.len()).unwrap_or(0);
        for channel in outputs.iter_mut() {
            channel.fill(0.0);
        }
        if self.scheduled_revision != self.revision {
            // Self-heal staleness; a failure latches `invalid`.
            let _ = self.reschedule();
        }
        if self.invalid {
            return time + frames as u64;
        }

        let mut t = time;
        let mut offset = 0;
        while offset < frames {
            let block_len = (frames - offset).min(self.max_block_size);
            self.run_block(t, outputs, offset, block_len);
            offset += block_len;
            t += block_len as u64;
        }
        t
    }

    /// Execute the schedule once for `block_len` frames, writing sink
    /// output into `host_out[..][offset..offset + block_len]`.
    fn run_block(
        &mut self,
        time: u64,
        host_out: &mut [&mut [f32]],
        offset: usize,
        block_len: usize,
    ) {
        let AudioGraph {
            units,
            connections,
            schedule,
            bus_ids,
            bus_pool,
            out_scratch,
            out_targets,
            ..
        } = self;

        bus_pool.zero_all();

        for idx in 0..schedule.len() {
            let id = schedule[idx];
            let entry = match units.get_mut(id.0) {
                Some(entry) => entry,
                None => continue,
            };

            // Destination slots: host channels for sinks, otherwise the
            // bus behind each outgoing edge. Duplicate edges collapse
            // onto one slot so their effect stays idempotent.
            out_targets.clear();
            if entry.is_output {
                for ch in 0..host_out.len().min(MAX_UNIT_CHANNELS) {
                    out_targets.push(OutTarget::Host(ch));
                }
            } else {
                for conn in connections.iter().filter(|c| c.from == id) {
                    if let Some(&bus) = bus_ids.get(&(conn.to, conn.channel)) {
                        let target = OutTarget::Bus(bus);
                        if !out_targets.contains(&target) {
                            out_targets.push(target);
                        }
                    }
                }
            }
            let n_out = out_targets.len().min(MAX_UNIT_CHANNELS);

            if !entry.unit.is_active() {
                continue;
            }

            // Input buses: the contiguous run of channels the scheduler
            // assigned buses to.
            let mut ins: [&[f32]; MAX_UNIT_CHANNELS] = [&[]; MAX_UNIT_CHANNELS];
            let mut n_in = 0;
            while n_in < MAX_UNIT_CHANNELS {
                match bus_ids.get(&(id, n_in)) {
                    Some(&bus) => {
                        ins[n_in] = bus_pool.bus(bus, block_len);
                        n_in += 1;
                    }
                    None => break,
                }
            }

            out_scratch[..n_out * block_len].fill(0.0);
            let mut outs: [&mut [f32]; MAX_UNIT_CHANNELS] =
                std::array::from_fn(|_| Default::default());
            for (slot, chunk) in outs
                .iter_mut()
                .zip(out_scratch.chunks_mut(block_len))
                .take(n_out)
            {
                *slot = chunk;
            }

            entry.unit.process(time, &ins[..n_in], &mut outs[..n_out]);

            // Fold the unit's contribution onto its destinations.
            for (j, target) in out_targets.iter().enumerate().take(n_out) {
                let src_start = j * block_len;
                match *target {
                    OutTarget::Bus(bus) => {
                        bus_pool.accumulate(bus, &out_scratch[src_start..src_start + block_len]);
                    }
                    OutTarget::Host(ch) => {
                        let dst = &mut host_out[ch][offset..offset + block_len];
                        for (d, &s) in dst
                            .iter_mut()
                            .zip(&out_scratch[src_start..src_start + block_len])
                        {
                            *d += s;
                        }
                    }
                }
            }
        }
    }

    /// Borrow a unit for inspection.
    pub fn unit(&self, id: UnitId) -> Option<&dyn AudioUnit> {
        self.units.get(id.0).map(|entry| entry.unit.as_ref())
    }

    /// Borrow a unit mutably, e.g. for parameter setters. Only safe to
    /// use while `run` is excluded.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut (dyn AudioUnit + '_)> {
        self.units
            .get_mut(id.0)
            .map(move |entry| entry.unit.as_mut() as &mut dyn AudioUnit)
    }

    /// Borrow a unit downcast to its concrete type.
    pub fn unit_as_mut<T: AudioUnit + 'static>(&mut self, id: UnitId) -> Option<&mut T> {
        self.unit_mut(id)?.as_any_mut().downcast_mut::<T>()
    }

    /// Return every unit's internal state to its post-construction
    /// values. Structure, schedule, and bus assignment are untouched.
    pub fn reset_units(&mut self) {
        for (_, entry) in self.units.iter_mut() {
            entry.unit.reset();
        }
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// The committed run order. Empty until the first `reschedule`.
    pub fn schedule(&self) -> &[UnitId] {
        &self.schedule
    }

    /// Bus assigned to a (consumer, channel) input pair, if scheduled.
    pub fn bus_for(&self, id: UnitId, channel: usize) -> Option<usize> {
        self.bus_ids.get(&(id, channel)).copied()
    }

    pub fn inputs_connected(&self, id: UnitId) -> Option<usize> {
        self.units.get(id.0).map(|entry| entry.inputs_connected)
    }

    pub fn outputs_connected(&self, id: UnitId) -> Option<usize> {
        self.units.get(id.0).map(|entry| entry.outputs_connected)
    }

    /// Engine health: `Ok` while the graph is runnable,
    /// [`EngineError::InvalidGraph`] while it is latched silent after a
    /// failed reschedule. A later successful `reschedule` clears the
    /// latch.
    pub fn status(&self) -> Result<(), EngineError> {
        if self.invalid {
            Err(EngineError::InvalidGraph)
        } else {
            Ok(())
        }
    }
}
