use std::any::Any;

use crate::traits::AudioUnit;

/// Triangle oscillator: the phase ramp folded into `2·|2·phase − 1| − 1`.
pub struct Triangle {
    frequency: f32,
    phase: f32,
    sample_rate: f32,
    active: bool,
}

impl Triangle {
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
}

impl AudioUnit for Triangle {
    fn name(&self) -> &'static str {
        "triangle"
    }

    fn set_context(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
    }

    fn process(&mut self, _time: u64, _inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        if self.frequency == 0.0 {
            return;
        }
        let frames = outputs.first().map(|o| o.len()).unwrap_or(0);
        let increment = self.frequency / self.sample_rate;
        for i in 0..frames {
            self.phase += increment;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
            let sample = 2.0 * (2.0 * self.phase - 1.0).abs() - 1.0;
            for out in outputs.iter_mut() {
                out[i] += sample;
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
