use std::any::Any;

use crate::traits::AudioUnit;

/// Polynomial approximation of a bandlimited step: `t + t − t²` blended
/// in within one phase increment of the discontinuity on either side.
fn poly_blep(mut t: f32, dt: f32) -> f32 {
    if t < dt {
        t /= dt;
        t + t - t * t - 1.0
    } else if t > 1.0 - dt {
        t = (t - 1.0) / dt;
        t * t + t + t + 1.0
    } else {
        0.0
    }
}

/// Pulse oscillator with configurable duty cycle, polyBLEP-smoothed at
/// the duty and period boundaries.
pub struct Square {
    frequency: f32,
    duty: f32,
    phase: f32,
    sample_rate: f32,
    active: bool,
}

impl Square {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            duty: 0.5,
            phase: 0.0,
            sample_rate: 44_100.0,
            active: true,
        }
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    /// Fraction of the period spent high. Clamped to stay inside (0, 1)
    /// so both edges of the pulse survive.
    pub fn set_duty(&mut self, duty: f32) {
        self.duty = duty.clamp(0.001, 0.999);
    }

    pub fn duty(&self) -> f32 {
        self.duty
    }
}

impl AudioUnit for Square {
    fn name(&self) -> &'static str {
        "square"
    }

    fn set_context(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
    }

    fn process(&mut self, _time: u64, _inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        if self.frequency == 0.0 {
            return;
        }
        let frames = outputs.first().map(|o| o.len()).unwrap_or(0);
        let dt = self.frequency / self.sample_rate;
        for i in 0..frames {
            self.phase += dt;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
            let naive = if self.phase < self.duty { 1.0 } else { -1.0 };
            // Rising edge at the period boundary, falling edge at the
            // duty boundary.
            let mut fall = self.phase - self.duty;
            if fall < 0.0 {
                fall += 1.0;
            }
            let sample = naive + poly_blep(self.phase, dt) - poly_blep(fall, dt);
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

#[cfg(test)]
mod tests {
    use super::*;

    fn render(square: &mut Square, frames: usize) -> Vec<f32> {
        let mut buf = vec![0.0f32; frames];
        square.process(0, &[], &mut [&mut buf[..]]);
        buf
    }

    #[test]
    fn zero_frequency_is_silent() {
        let mut square = Square::new(0.0);
        square.set_context(44_100.0, 64);
        let buf = render(&mut square, 64);
        assert!(buf.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn plateau_values_away_from_edges() {
        // 100 Hz at 44.1 kHz: 441 samples per period, smoothing only
        // within one increment of the edges.
        let mut square = Square::new(100.0);
        square.set_context(44_100.0, 512);
        let buf = render(&mut square, 441);
        // Mid-plateau samples sit on ±1 exactly.
        assert!((buf[100] - 1.0).abs() < 1e-4);
        assert!((buf[330] + 1.0).abs() < 1e-4);
    }

    #[test]
    fn mean_tracks_duty_cycle() {
        let mut square = Square::new(100.0);
        square.set_context(44_100.0, 512);
        square.set_duty(0.25);
        // Ten whole periods.
        let buf = render(&mut square, 4410);
        let mean: f32 = buf.iter().sum::<f32>() / buf.len() as f32;
        // duty 0.25 -> mean 2*0.25 - 1 = -0.5
        assert!((mean + 0.5).abs() < 0.02, "mean {mean}");
    }

    #[test]
    fn output_stays_near_unit_range() {
        let mut square = Square::new(2000.0);
        square.set_context(44_100.0, 512);
        let buf = render(&mut square, 2048);
        // PolyBLEP overshoots slightly, but nothing pathological.
        assert!(buf.iter().all(|&x| x.abs() < 1.5));
    }
}
