use std::any::Any;

/// Upper bound on input and output channels per unit. Connection channel
/// indices and scheduler bus assignments all live below this bound.
pub const MAX_UNIT_CHANNELS: usize = 16;

/// A node in the audio graph: one DSP operator with private state.
///
/// The graph calls `process` once per sub-block. `inputs[ch]` is the
/// already-mixed bus feeding input channel `ch`; `outputs[j]` is the
/// j-th destination this unit feeds. All slices share one length, the
/// current block length. Units *accumulate* into their outputs: every
/// output buffer arrives zeroed at the top of the block and several
/// producers may share a destination, so writing `+=` is what makes
/// fan-in mixing work.
///
/// `process` runs on the audio thread: no allocation, no I/O, no
/// blocking. Parameter setters (via `as_any_mut` downcasts) may only be
/// called while the host guarantees `process` is not running.
pub trait AudioUnit {
    /// Diagnostic name, stable for the unit's lifetime.
    fn name(&self) -> &'static str;

    /// Sink units write into the host's output channels instead of
    /// internal buses.
    fn is_output(&self) -> bool {
        false
    }

    /// Called once at insertion with the graph's sample rate and block
    /// bound. Units that precompute rate-dependent state or size
    /// internal buffers do it here.
    fn set_context(&mut self, _sample_rate: f32, _max_block_size: usize) {}

    /// Declared input channel bound; `connect` rejects channels at or
    /// above it.
    fn max_inputs(&self) -> usize {
        MAX_UNIT_CHANNELS
    }

    fn max_outputs(&self) -> usize {
        MAX_UNIT_CHANNELS
    }

    /// Process one block. `time` is the sample counter at the first
    /// frame of the block and is the same for every unit in the block.
    fn process(&mut self, time: u64, inputs: &[&[f32]], outputs: &mut [&mut [f32]]);

    /// Return internal state (phase, counters, cursors) to the
    /// post-construction state without reallocating.
    fn reset(&mut self) {}

    /// Inactive units are skipped by the runner and contribute silence.
    fn is_active(&self) -> bool {
        true
    }

    fn set_active(&mut self, _active: bool) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
