use std::any::Any;
use std::io::Read;

use log::debug;

use crate::audio::wav::WavFile;
use crate::error::WavError;
use crate::traits::AudioUnit;

/// Plays a decoded WAV file into the graph. Mono files feed every
/// output channel; stereo files route channel for channel. When the
/// stream runs out the player flips `is_finished` and emits silence
/// from then on, unless looping is enabled.
pub struct WavPlayer {
    channels: Vec<Vec<f32>>,
    position: usize,
    finished: bool,
    looping: bool,
    active: bool,
}

impl WavPlayer {
    pub fn from_memory(bytes: &[u8]) -> Result<Self, WavError> {
        Ok(Self::from_wav(&WavFile::from_memory(bytes)?))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, WavError> {
        Ok(Self::from_wav(&WavFile::from_reader(reader)?))
    }

    fn from_wav(wav: &WavFile) -> Self {
        let channels = (0..wav.format.num_channels as usize)
            .map(|ch| wav.channel(ch))
            .collect();
        Self {
            channels,
            position: 0,
            finished: false,
            looping: false,
            active: true,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wrap the play cursor instead of finishing.
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn num_frames(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }
}

impl AudioUnit for WavPlayer {
    fn name(&self) -> &'static str {
        "wav_player"
    }

    fn process(&mut self, _time: u64, _inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let frames = outputs.first().map(|o| o.len()).unwrap_or(0);
        let total = self.num_frames();
        if self.finished || total == 0 {
            return;
        }
        for i in 0..frames {
            if self.position >= total {
                if self.looping {
                    self.position = 0;
                } else {
                    self.finished = true;
                    debug!("wav player exhausted after {total} frames");
                    break;
                }
            }
            for (ch, out) in outputs.iter_mut().enumerate() {
                let source = &self.channels[ch.min(self.channels.len() - 1)];
                out[i] += source[self.position];
            }
            self.position += 1;
        }
    }

    fn reset(&mut self) {
        self.position = 0;
        self.finished = false;
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

    /// Mono 16-bit file with the given samples.
    fn mono_fixture(samples: &[i16]) -> Vec<u8> {
        let mut payload = Vec::new();
        for s in samples {
            payload.extend_from_slice(&s.to_le_bytes());
        }
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&8_000u32.to_le_bytes());
        bytes.extend_from_slice(&16_000u32.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&payload);
        bytes
    }

    #[test]
    fn plays_then_finishes_with_silence() {
        let samples: Vec<i16> = (1..=6).map(|i| i * 1000).collect();
        let mut player = WavPlayer::from_memory(&mono_fixture(&samples)).unwrap();
        assert_eq!(player.num_frames(), 6);

        let mut out = vec![0.0f32; 4];
        player.process(0, &[], &mut [&mut out[..]]);
        assert!((out[0] - 1000.0 / 32767.0).abs() < 1e-6);
        assert!(!player.is_finished());

        let mut tail = vec![0.0f32; 4];
        player.process(4, &[], &mut [&mut tail[..]]);
        assert!((tail[1] - 6000.0 / 32767.0).abs() < 1e-6);
        assert_eq!(tail[2], 0.0);
        assert_eq!(tail[3], 0.0);
        assert!(player.is_finished());

        // Once finished, blocks stay silent.
        let mut silent = vec![0.0f32; 4];
        player.process(8, &[], &mut [&mut silent[..]]);
        assert!(silent.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn mono_feeds_both_outputs() {
        let mut player = WavPlayer::from_memory(&mono_fixture(&[8000, -8000])).unwrap();
        let mut left = vec![0.0f32; 2];
        let mut right = vec![0.0f32; 2];
        player.process(0, &[], &mut [&mut left[..], &mut right[..]]);
        assert_eq!(left, right);
    }

    #[test]
    fn looping_wraps_instead_of_finishing() {
        let mut player = WavPlayer::from_memory(&mono_fixture(&[1000, 2000])).unwrap();
        player.set_looping(true);
        let mut out = vec![0.0f32; 6];
        player.process(0, &[], &mut [&mut out[..]]);
        assert!(!player.is_finished());
        assert!((out[0] - out[2]).abs() < 1e-6);
        assert!((out[1] - out[5]).abs() < 1e-6);
    }

    #[test]
    fn reset_rewinds_and_clears_finished() {
        let mut player = WavPlayer::from_memory(&mono_fixture(&[3000])).unwrap();
        let mut out = vec![0.0f32; 2];
        player.process(0, &[], &mut [&mut out[..]]);
        assert!(player.is_finished());
        player.reset();
        assert!(!player.is_finished());
        let mut again = vec![0.0f32; 1];
        player.process(0, &[], &mut [&mut again[..]]);
        assert!((again[0] - 3000.0 / 32767.0).abs() < 1e-6);
    }
}
