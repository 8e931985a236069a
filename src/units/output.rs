use std::any::Any;

use crate::traits::AudioUnit;

/// Sink unit: adds its summed input buses into the host's output
/// channels, channel for channel. The runner hands this unit the host
/// buffers directly instead of internal buses.
pub struct Output {
    active: bool,
}

impl Output {
    pub fn new() -> Self {
        Self { active: true }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioUnit for Output {
    fn name(&self) -> &'static str {
        "output"
    }

    fn is_output(&self) -> bool {
        true
    }

    fn process(&mut self, _time: u64, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        for (ch, out) in outputs.iter_mut().enumerate() {
            if let Some(input) = inputs.get(ch) {
                for (o, &x) in out.iter_mut().zip(input.iter()) {
                    *o += x;
                }
            }
        }
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

    #[test]
    fn routes_inputs_to_matching_channels() {
        let mut output = Output::new();
        let left = [0.1f32; 4];
        let right = [0.2f32; 4];
        let mut host_l = vec![0.0f32; 4];
        let mut host_r = vec![0.0f32; 4];
        output.process(
            0,
            &[&left, &right],
            &mut [&mut host_l[..], &mut host_r[..]],
        );
        assert_eq!(host_l, vec![0.1; 4]);
        assert_eq!(host_r, vec![0.2; 4]);
    }

    #[test]
    fn missing_input_channel_leaves_host_untouched() {
        let mut output = Output::new();
        let mono = [1.0f32; 4];
        let mut host_l = vec![0.0f32; 4];
        let mut host_r = vec![0.0f32; 4];
        output.process(0, &[&mono], &mut [&mut host_l[..], &mut host_r[..]]);
        assert_eq!(host_l, vec![1.0; 4]);
        assert_eq!(host_r, vec![0.0; 4]);
    }
}
