use std::any::Any;
use std::sync::Arc;

use super::blep::HexBlep;
use crate::traits::AudioUnit;

/// Shape parameters for [`Hexwave`]. One period is six line segments
/// derived from these four knobs; see `vertices` for the layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexwaveParams {
    /// Mirror the second half-period in time instead of repeating the
    /// first half negated.
    pub reflect: bool,
    /// Where in the half-period the peak lands, 0..=1.
    pub peak_time: f32,
    /// Value held at the half-period point.
    pub half_height: f32,
    /// Fraction of the half-period spent flat at zero before rising.
    pub zero_wait: f32,
}

impl Default for HexwaveParams {
    fn default() -> Self {
        Self {
            reflect: true,
            peak_time: 0.0,
            half_height: 0.0,
            zero_wait: 0.0,
        }
    }
}

/// Segments shorter than this are treated as zero-length, i.e. as value
/// discontinuities handled by a blep rather than a slope.
const MIN_SEGMENT: f32 = 1e-7;

/// Nine (time, value) vertices plus per-segment slopes, regenerated at
/// each period wrap. Times are normalised to the period, slopes are in
/// value per period unit.
#[derive(Clone, Copy)]
struct Vertices {
    t: [f32; 9],
    v: [f32; 9],
    s: [f32; 9],
}

impl Vertices {
    fn generate(p: &HexwaveParams) -> Self {
        let mut t = [0.0f32; 9];
        let mut v = [0.0f32; 9];

        let wait = 0.5 * p.zero_wait.clamp(0.0, 1.0);
        let peak = wait + (0.5 - wait) * p.peak_time.clamp(0.0, 1.0);
        t[0] = 0.0;
        v[0] = 0.0;
        t[1] = wait;
        v[1] = 0.0;
        t[2] = peak;
        v[2] = 1.0;
        t[3] = 0.5;
        v[3] = p.half_height;

        if p.reflect {
            for j in 4..8 {
                t[j] = 1.0 - t[7 - j];
                v[j] = -v[7 - j];
            }
        } else {
            for j in 4..8 {
                t[j] = 0.5 + t[j - 4];
                v[j] = -v[j - 4];
            }
        }
        t[8] = 1.0;
        v[8] = 0.0;

        let mut s = [0.0f32; 9];
        for j in 0..8 {
            let gap = t[j + 1] - t[j];
            s[j] = if gap <= MIN_SEGMENT {
                0.0
            } else {
                (v[j + 1] - v[j]) / gap
            };
        }
        Self { t, v, s }
    }
}

/// Bandlimited six-segment oscillator.
///
/// Each block renders the piecewise-linear waveform naively and then
/// cancels its aliasing: a blep at every value discontinuity (a
/// zero-length segment), a blamp at every slope change, and a blamp at
/// the block head when the frequency moved since the last block.
/// Corrections span `width` samples, so the tail of each block is
/// carried into the head of the next, and the audible output trails the
/// naive waveform by half the blep width.
///
/// Parameter changes are deferred to the period wrap; mid-period
/// retuning of the segment geometry would itself alias.
pub struct Hexwave {
    frequency: f32,
    current: HexwaveParams,
    pending: Option<HexwaveParams>,
    verts: Vertices,
    t: f32,
    segment: usize,
    /// dt of the last processed block; `None` until a block has run,
    /// so a cold start never looks like a frequency change.
    prev_dt: Option<f32>,
    table: Arc<HexBlep>,
    temp: Vec<f32>,
    carry: Vec<f32>,
    sample_rate: f32,
    active: bool,
}

impl Hexwave {
    pub fn new(frequency: f32, params: HexwaveParams, table: Arc<HexBlep>) -> Self {
        Self {
            frequency,
            current: params,
            pending: None,
            verts: Vertices::generate(&params),
            t: 0.0,
            segment: 0,
            prev_dt: None,
            table,
            temp: Vec::new(),
            carry: Vec::new(),
            sample_rate: 44_100.0,
            active: true,
        }
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    pub fn params(&self) -> HexwaveParams {
        self.current
    }

    /// Stage a shape change; it takes effect at the next period wrap.
    pub fn set_params(&mut self, params: HexwaveParams) {
        self.pending = Some(params);
    }

    /// Emit blep/blamp corrections for crossing the vertex that ends
    /// the current segment, then advance into the next segment.
    /// `frac` is how far into the current sample the crossing happened.
    fn cross_vertex(&mut self, out: &mut [f32], dt: f32) {
        let k = self.segment + 1;
        let frac = if dt > 0.0 {
            ((self.t - self.verts.t[k]) / dt).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let gap = self.verts.t[k] - self.verts.t[self.segment];
        let jump = if gap <= MIN_SEGMENT {
            self.verts.v[k] - self.verts.v[self.segment]
        } else {
            0.0
        };
        let new_slope = if k < 8 { self.verts.s[k] } else { 0.0 };
        let slope_change = new_slope - self.verts.s[self.segment];
        if jump != 0.0 {
            self.table.blep(out, frac, jump);
        }
        if slope_change != 0.0 {
            self.table.blamp(out, frac, dt * slope_change);
        }
        self.segment = k;
    }

    /// Wrap into a fresh period: apply any pending parameters,
    /// regenerate the vertices, and blamp in the slope of the first
    /// segment (the old period's slope was already blamped out when its
    /// final vertex was crossed).
    fn wrap_period(&mut self, out: &mut [f32], dt: f32) {
        let frac = if dt > 0.0 {
            ((self.t - 1.0) / dt).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.t -= 1.0;
        if let Some(params) = self.pending.take() {
            self.current = params;
        }
        self.verts = Vertices::generate(&self.current);
        self.segment = 0;
        if self.verts.s[0] != 0.0 {
            self.table.blamp(out, frac, dt * self.verts.s[0]);
        }
    }
}

impl AudioUnit for Hexwave {
    fn name(&self) -> &'static str {
        "hexwave"
    }

    fn set_context(&mut self, sample_rate: f32, max_block_size: usize) {
        self.sample_rate = sample_rate;
        let width = self.table.width();
        self.temp = vec![0.0; max_block_size + width];
        self.carry = vec![0.0; width];
    }

    fn process(&mut self, _time: u64, _inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let frames = outputs.first().map(|o| o.len()).unwrap_or(0);
        let width = self.table.width();
        if frames == 0 || self.temp.len() < frames + width {
            return;
        }

        // Seed the head of the working buffer with the corrections that
        // spilled past the end of the previous block.
        let mut temp = std::mem::take(&mut self.temp);
        temp[..width].copy_from_slice(&self.carry);
        temp[width..frames + width].fill(0.0);

        let dt = (self.frequency / self.sample_rate).clamp(0.0, 1.0);
        if dt == 0.0 {
            // Frequency zero short-circuits: flush the remaining
            // correction tail, emit nothing new.
            for out in outputs.iter_mut() {
                for (o, &value) in out.iter_mut().zip(temp[..frames].iter()) {
                    *o += value;
                }
            }
            self.carry.copy_from_slice(&temp[frames..frames + width]);
            self.prev_dt = Some(dt);
            self.temp = temp;
            return;
        }
        if let Some(prev) = self.prev_dt {
            if prev != dt {
                // The slope of the in-progress segment changes with dt.
                let slope = self.verts.s[self.segment];
                if slope != 0.0 {
                    self.table.blamp(&mut temp[..width], 0.0, (dt - prev) * slope);
                }
            }
        }
        self.prev_dt = Some(dt);

        for i in 0..frames {
            self.t += dt;
            loop {
                if self.segment < 8 && self.t >= self.verts.t[self.segment + 1] {
                    self.cross_vertex(&mut temp[i..i + width], dt);
                } else if self.segment == 8 {
                    self.wrap_period(&mut temp[i..i + width], dt);
                } else {
                    break;
                }
            }
            let base = self.verts.v[self.segment]
                + self.verts.s[self.segment] * (self.t - self.verts.t[self.segment]);
            temp[i + width / 2] += base;
        }

        for out in outputs.iter_mut() {
            for (o, &value) in out.iter_mut().zip(temp[..frames].iter()) {
                *o += value;
            }
        }
        self.carry.copy_from_slice(&temp[frames..frames + width]);
        self.temp = temp;
    }

    fn reset(&mut self) {
        self.t = 0.0;
        self.segment = 0;
        self.prev_dt = None;
        self.pending = None;
        self.verts = Vertices::generate(&self.current);
        self.carry.fill(0.0);
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
