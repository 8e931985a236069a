use std::any::Any;

use crate::traits::AudioUnit;

/// APDHSR stage durations and levels. All times are in samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    pub attack: f32,
    pub peak: f32,
    pub decay: f32,
    pub hold: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            attack: 441.0,
            peak: 1.0,
            decay: 4410.0,
            hold: 4410.0,
            sustain: 0.5,
            release: 8820.0,
        }
    }
}

/// APDHSR envelope: attack ramp to `peak`, decay ramp to `sustain`, a
/// timed hold at `sustain`, then a release ramp to zero. `start`
/// pre-computes the absolute end time of each phase so per-sample
/// evaluation is a couple of compares and a lerp.
///
/// With an input connected the envelope acts as a VCA, scaling each
/// input sample by the envelope value. With no input it emits the
/// envelope itself, for use as a control signal.
pub struct Envelope {
    params: EnvelopeParams,
    started: bool,
    start: f64,
    attack_end: f64,
    decay_end: f64,
    hold_end: f64,
    release_end: f64,
    active: bool,
}

impl Envelope {
    pub fn new(params: EnvelopeParams) -> Self {
        Self {
            params,
            started: false,
            start: 0.0,
            attack_end: 0.0,
            decay_end: 0.0,
            hold_end: 0.0,
            release_end: 0.0,
            active: true,
        }
    }

    pub fn params(&self) -> EnvelopeParams {
        self.params
    }

    /// Replace the stage parameters. Takes effect at the next `start`;
    /// a running envelope keeps its precomputed phase ends.
    pub fn set_params(&mut self, params: EnvelopeParams) {
        self.params = params;
    }

    /// Begin the envelope at absolute sample time `t0`.
    pub fn start(&mut self, t0: u64) {
        let p = self.params;
        self.started = true;
        self.start = t0 as f64;
        self.attack_end = self.start + p.attack as f64;
        self.decay_end = self.attack_end + p.decay as f64;
        self.hold_end = self.decay_end + p.hold as f64;
        self.release_end = self.hold_end + p.release as f64;
    }

    /// Envelope value at absolute sample time `t`. Zero before `start`
    /// and after the release ends; linear interpolation on integer
    /// sample times inside the ramps.
    pub fn sample(&self, t: f64) -> f32 {
        if !self.started || t < self.start || t >= self.release_end {
            return 0.0;
        }
        let p = self.params;
        if t < self.attack_end {
            (p.peak as f64 * (t - self.start) / p.attack as f64) as f32
        } else if t < self.decay_end {
            let frac = (t - self.attack_end) / p.decay as f64;
            (p.peak as f64 + (p.sustain - p.peak) as f64 * frac) as f32
        } else if t < self.hold_end {
            p.sustain
        } else {
            let frac = (t - self.hold_end) / p.release as f64;
            (p.sustain as f64 * (1.0 - frac)) as f32
        }
    }
}

impl AudioUnit for Envelope {
    fn name(&self) -> &'static str {
        "envelope"
    }

    fn process(&mut self, time: u64, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let frames = outputs.first().map(|o| o.len()).unwrap_or(0);
        let input = inputs.first();
        for i in 0..frames {
            let value = self.sample((time + i as u64) as f64);
            let sample = match input {
                Some(buf) => buf[i] * value,
                None => value,
            };
            for out in outputs.iter_mut() {
                out[i] += sample;
            }
        }
    }

    fn reset(&mut self) {
        self.started = false;
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
