use std::f64::consts::PI;

/// Bandlimited step / ramp residual table.
///
/// The table stores what a bandlimited step (and its integral, the
/// bandlimited ramp) *differ* from the naive versions by. Adding the
/// residual to an aliased waveform at a discontinuity cancels the
/// aliasing without re-rendering the waveform itself. Built once and
/// shared read-only between oscillators (wrap it in an `Arc`).
///
/// Construction: a Nuttall-windowed sinc is integrated twice on a
/// 16×-finer grid (impulse → step → ramp), both integrals are
/// normalised, and the result is deinterleaved into `oversample + 1`
/// rows of `width` samples so a query can linearly interpolate between
/// the two rows bracketing a fractional transition time.
pub struct HexBlep {
    width: usize,
    oversample: usize,
    blep: Vec<f32>,
    blamp: Vec<f32>,
}

fn nuttall(x: f64) -> f64 {
    let a = 2.0 * PI * x;
    0.355768 - 0.487396 * a.cos() + 0.144232 * (2.0 * a).cos() - 0.012604 * (3.0 * a).cos()
}

impl HexBlep {
    /// `width` is the correction length in samples (even, at most 64);
    /// `oversample` is the number of sub-sample phase slots.
    pub fn new(width: usize, oversample: usize) -> Self {
        assert!(width > 0 && width <= 64 && width % 2 == 0, "bad blep width");
        assert!(oversample >= 1, "oversample must be at least 1");

        let half = width / 2 * oversample;
        let n = 2 * half + 1;
        const FINE: usize = 16;
        let total = n * FINE;

        // Two nested accumulators: the first turns the windowed impulse
        // into a step, the second turns the step into a ramp.
        let mut step = vec![0.0f64; n];
        let mut ramp = vec![0.0f64; n];
        let mut acc_step = 0.0f64;
        let mut acc_ramp = 0.0f64;
        for i in 0..total {
            let x = (i as f64 - total as f64 / 2.0) / (oversample as f64 * FINE as f64);
            let sinc = if x == 0.0 { 1.0 } else { (PI * x).sin() / (PI * x) };
            let window = nuttall(i as f64 / total as f64);
            acc_step += sinc * window;
            acc_ramp += acc_step;
            if i % FINE == FINE - 1 {
                let j = i / FINE;
                step[j] = acc_step;
                ramp[j] = acc_ramp;
            }
        }

        let step_scale = 1.0 / step[n - 1];
        let ramp_scale = (width as f64 / 2.0) / ramp[n - 1];

        // Deinterleave into rows and subtract the naive step and ramp,
        // leaving only the residual to accumulate onto a waveform.
        let rows = oversample + 1;
        let mut blep = vec![0.0f32; rows * width];
        let mut blamp = vec![0.0f32; rows * width];
        for j in 0..rows {
            for k in 0..width {
                let idx = j + k * oversample;
                let pos = (idx as f64 - half as f64) / oversample as f64;
                let naive_step = if idx > half { 1.0 } else { 0.0 };
                let naive_ramp = if pos > 0.0 { pos } else { 0.0 };
                blep[j * width + k] = (step[idx] * step_scale - naive_step) as f32;
                blamp[j * width + k] = (ramp[idx] * ramp_scale - naive_ramp) as f32;
            }
        }

        Self {
            width,
            oversample,
            blep,
            blamp,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn oversample(&self) -> usize {
        self.oversample
    }

    /// Add the step residual for a discontinuity that happened `t`
    /// samples (0 ≤ t < 1) before `output[width/2]`'s sample, scaled by
    /// the size of the value jump.
    pub fn blep(&self, output: &mut [f32], t: f32, scale: f32) {
        self.apply(&self.blep, output, t, scale);
    }

    /// Add the ramp residual for a slope change, scaled by the
    /// per-sample slope difference.
    pub fn blamp(&self, output: &mut [f32], t: f32, scale: f32) {
        self.apply(&self.blamp, output, t, scale);
    }

    fn apply(&self, table: &[f32], output: &mut [f32], t: f32, scale: f32) {
        let f = t.clamp(0.0, 1.0) * self.oversample as f32;
        let j0 = (f as usize).min(self.oversample - 1);
        let j1 = j0 + 1;
        let frac = f - j0 as f32;
        let w = self.width;
        let row0 = &table[j0 * w..(j0 + 1) * w];
        let row1 = &table[j1 * w..(j1 + 1) * w];
        for (k, out) in output.iter_mut().take(w).enumerate() {
            let value = row0[k] + (row1[k] - row0[k]) * frac;
            *out += value * scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residual_vanishes_at_the_edges() {
        let table = HexBlep::new(32, 32);
        for j in [0, 16, 32] {
            let row = &table.blep[j * 32..(j + 1) * 32];
            assert!(row[0].abs() < 0.01, "leading edge: {}", row[0]);
            assert!(row[31].abs() < 0.01, "trailing edge: {}", row[31]);
        }
    }

    #[test]
    fn step_residual_reconstructs_a_smooth_step() {
        let table = HexBlep::new(32, 32);
        // Naive step plus residual must pass near 0.5 at the centre;
        // the stored naive step turns on strictly after the half-point,
        // so at the centre the residual *is* the reconstructed value.
        let mut out = vec![0.0f32; 32];
        table.blep(&mut out, 0.0, 1.0);
        let centre = out[16];
        assert!(
            (centre - 0.5).abs() < 0.1,
            "centre of reconstructed step: {centre}"
        );
        // Past the correction window the residual has died out and the
        // naive step alone carries the waveform.
        assert!(out[31].abs() < 0.01);
    }

    #[test]
    fn queries_scale_linearly() {
        let table = HexBlep::new(16, 8);
        let mut once = vec![0.0f32; 16];
        let mut twice = vec![0.0f32; 16];
        table.blep(&mut once, 0.3, 1.0);
        table.blep(&mut twice, 0.3, 2.0);
        for (a, b) in once.iter().zip(&twice) {
            assert!((2.0 * a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn queries_accumulate() {
        let table = HexBlep::new(16, 8);
        let mut out = vec![0.5f32; 16];
        let mut reference = vec![0.0f32; 16];
        table.blamp(&mut reference, 0.5, 1.0);
        table.blamp(&mut out, 0.5, 1.0);
        for (o, r) in out.iter().zip(&reference) {
            assert!((o - (r + 0.5)).abs() < 1e-6);
        }
    }

    #[test]
    fn adjacent_rows_interpolate_continuously() {
        let table = HexBlep::new(32, 16);
        // A query exactly on a row boundary must match the row itself.
        let mut on_row = vec![0.0f32; 32];
        let mut near_row = vec![0.0f32; 32];
        table.blep(&mut on_row, 0.25, 1.0);
        table.blep(&mut near_row, 0.25 + 1e-4, 1.0);
        for (a, b) in on_row.iter().zip(&near_row) {
            assert!((a - b).abs() < 0.01);
        }
    }
}
