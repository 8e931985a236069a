use std::any::Any;

use crate::traits::AudioUnit;

/// Ramp oscillator: emits its own phase, a 0→1 sawtooth at the
/// configured frequency. The raw material for driving wave shapers and
/// table lookups.
pub struct Phasor {
    frequency: f32,
    phase: f32,
    sample_rate: f32,
    active: bool,
}

impl Phasor {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            phase: 0.0,
            sample_rate: 44_100.0,
            active: true,
        }
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }
}

impl AudioUnit for Phasor {
    fn name(&self) -> &'static str {
        "phasor"
    }

    fn set_context(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
    }

    fn process(&mut self, _time: u64, _inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let frames = outputs.first().map(|o| o.len()).unwrap_or(0);
        let increment = self.frequency / self.sample_rate;
        for i in 0..frames {
            self.phase += increment;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
            for out in outputs.iter_mut() {
                out[i] += self.phase;
            }
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
