//! Strict RIFF/WAV decoding for the `WavPlayer` unit: uncompressed PCM,
//! 8-bit unsigned or 16-bit signed, mono or stereo.

use std::io::Read;

use crate::error::WavError;

/// The `fmt ` subchunk fields, verbatim from the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub audio_format: u16,
    pub num_channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

/// Raw decoded samples, interleaved, still in their container width.
/// `to_f32` applies the fixed-point conversion: `x / 32767` for 16-bit,
/// `(x / 255) · 2 − 1` for 8-bit.
#[derive(Debug, Clone)]
pub enum SampleData {
    U8(Vec<u8>),
    I16(Vec<i16>),
}

impl SampleData {
    /// Interleaved sample count across all channels.
    pub fn len(&self) -> usize {
        match self {
            SampleData::U8(samples) => samples.len(),
            SampleData::I16(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One interleaved sample converted to float.
    pub fn to_f32(&self, index: usize) -> f32 {
        match self {
            SampleData::U8(samples) => (samples[index] as f32 / 255.0) * 2.0 - 1.0,
            SampleData::I16(samples) => samples[index] as f32 / 32767.0,
        }
    }
}

/// A fully decoded WAV file.
#[derive(Debug, Clone)]
pub struct WavFile {
    pub format: WavFormat,
    pub data: SampleData,
}

struct Parser<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Parser<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], WavError> {
        if self.offset + n > self.bytes.len() {
            return Err(WavError::UnexpectedEOF);
        }
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn tag(&mut self) -> Result<[u8; 4], WavError> {
        let slice = self.take(4)?;
        Ok([slice[0], slice[1], slice[2], slice[3]])
    }

    fn u16_le(&mut self) -> Result<u16, WavError> {
        let slice = self.take(2)?;
        Ok(u16::from_le_bytes([slice[0], slice[1]]))
    }

    fn u32_le(&mut self) -> Result<u32, WavError> {
        let slice = self.take(4)?;
        Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
    }
}

impl WavFile {
    /// Decode a WAV file held in memory.
    pub fn from_memory(bytes: &[u8]) -> Result<Self, WavError> {
        let mut parser = Parser { bytes, offset: 0 };

        if &parser.tag()? != b"RIFF" {
            return Err(WavError::NotARiffFile);
        }
        let _riff_size = parser.u32_le()?;
        if &parser.tag()? != b"WAVE" {
            return Err(WavError::NotAWavFile);
        }

        if &parser.tag()? != b"fmt " {
            return Err(WavError::NotAWavFile);
        }
        let fmt_size = parser.u32_le()?;
        if fmt_size != 16 {
            return Err(WavError::UnsupportedFormatLength);
        }
        let format = WavFormat {
            audio_format: parser.u16_le()?,
            num_channels: parser.u16_le()?,
            sample_rate: parser.u32_le()?,
            byte_rate: parser.u32_le()?,
            block_align: parser.u16_le()?,
            bits_per_sample: parser.u16_le()?,
        };
        if format.audio_format != 1 {
            return Err(WavError::CompressedWavFile);
        }
        if !matches!(format.bits_per_sample, 8 | 16) || !matches!(format.num_channels, 1 | 2) {
            return Err(WavError::Unsupported);
        }
        let bytes_per_sample = format.bits_per_sample / 8;
        if format.block_align != format.num_channels * bytes_per_sample {
            return Err(WavError::MismatchedBlockAlign);
        }
        if format.byte_rate != format.sample_rate * format.block_align as u32 {
            return Err(WavError::MismatchedByteRate);
        }

        if &parser.tag()? != b"data" {
            return Err(WavError::InvalidDataHeader);
        }
        let data_size = parser.u32_le()? as usize;
        let payload = parser.take(data_size)?;

        let data = match format.bits_per_sample {
            8 => SampleData::U8(payload.to_vec()),
            16 => SampleData::I16(
                payload
                    .chunks_exact(2)
                    .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                    .collect(),
            ),
            _ => unreachable!("validated above"),
        };

        Ok(Self { format, data })
    }

    /// Decode from any reader; the stream is read to the end first.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, WavError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_memory(&bytes)
    }

    /// Frames per channel.
    pub fn num_frames(&self) -> usize {
        self.data.len() / self.format.num_channels as usize
    }

    /// One channel's sample at `frame`, converted to float.
    pub fn sample(&self, channel: usize, frame: usize) -> f32 {
        let channels = self.format.num_channels as usize;
        self.data.to_f32(frame * channels + channel)
    }

    /// Extract one channel as a planar float buffer.
    pub fn channel(&self, channel: usize) -> Vec<f32> {
        (0..self.num_frames())
            .map(|frame| self.sample(channel, frame))
            .collect()
    }

    /// Copy one channel into a caller buffer, returning the frame
    /// count. Fails with [`WavError::InsufficientBuffer`] when `dst`
    /// cannot hold the whole channel.
    pub fn channel_into(&self, channel: usize, dst: &mut [f32]) -> Result<usize, WavError> {
        let frames = self.num_frames();
        if dst.len() < frames {
            return Err(WavError::InsufficientBuffer);
        }
        for (frame, slot) in dst.iter_mut().take(frames).enumerate() {
            *slot = self.sample(channel, frame);
        }
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hand-rolled canonical header: RIFF + fmt(16) + data.
    fn wav_bytes(channels: u16, sample_rate: u32, bits: u16, payload: &[u8]) -> Vec<u8> {
        let block_align = channels * bits / 8;
        let byte_rate = sample_rate * block_align as u32;
        let riff_size = 36 + payload.len() as u32;

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&riff_size.to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&byte_rate.to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&bits.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn decodes_16_bit_stereo() {
        let samples: [i16; 4] = [0, 16384, -16384, 32767];
        let mut payload = Vec::new();
        for s in samples {
            payload.extend_from_slice(&s.to_le_bytes());
        }
        let wav = WavFile::from_memory(&wav_bytes(2, 44_100, 16, &payload)).unwrap();
        assert_eq!(wav.format.num_channels, 2);
        assert_eq!(wav.format.block_align, 4);
        assert_eq!(wav.num_frames(), 2);
        assert_eq!(wav.sample(0, 0), 0.0);
        assert!((wav.sample(1, 0) - 16384.0 / 32767.0).abs() < 1e-6);
        assert!((wav.sample(1, 1) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn decodes_8_bit_mono_endpoints() {
        let wav = WavFile::from_memory(&wav_bytes(1, 22_050, 8, &[0, 128, 255])).unwrap();
        assert_eq!(wav.num_frames(), 3);
        assert!((wav.sample(0, 0) + 1.0).abs() < 1e-6);
        assert!((wav.sample(0, 2) - 1.0).abs() < 1e-6);
        assert!(wav.sample(0, 1).abs() < 0.01);
    }

    #[test]
    fn conversion_is_stable() {
        // Decoding the same bytes twice converts identically.
        let bytes = wav_bytes(1, 8_000, 16, &[0x34, 0x12, 0xCC, 0xED]);
        let a = WavFile::from_memory(&bytes).unwrap();
        let b = WavFile::from_memory(&bytes).unwrap();
        for i in 0..a.data.len() {
            assert_eq!(a.data.to_f32(i), b.data.to_f32(i));
        }
    }

    #[test]
    fn ambience_fixture_geometry() {
        // A known capture: RIFF size 82472, PCM, stereo, 44.1 kHz,
        // 16-bit. Frames per channel = data size / 4.
        let data_size = 82_472 - 36;
        let wav =
            WavFile::from_memory(&wav_bytes(2, 44_100, 16, &vec![0u8; data_size])).unwrap();
        assert_eq!(wav.format.audio_format, 1);
        assert_eq!(wav.format.num_channels, 2);
        assert_eq!(wav.format.sample_rate, 44_100);
        assert_eq!(wav.format.byte_rate, 176_400);
        assert_eq!(wav.format.block_align, 4);
        assert_eq!(wav.format.bits_per_sample, 16);
        assert_eq!(wav.num_frames(), data_size / 4);
        assert_eq!(wav.num_frames(), 20_609);
    }

    #[test]
    fn hound_written_file_round_trips() {
        // Cross-check the parser against a second writer.
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..64i16 {
                writer.write_sample(i * 100).unwrap();
                writer.write_sample(-i * 100).unwrap();
            }
            writer.finalize().unwrap();
        }
        let wav = WavFile::from_reader(std::io::Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(wav.format.num_channels, 2);
        assert_eq!(wav.num_frames(), 64);
        assert!((wav.sample(0, 10) - 1000.0 / 32767.0).abs() < 1e-6);
        assert!((wav.sample(1, 10) + 1000.0 / 32767.0).abs() < 1e-6);
    }

    #[test]
    fn error_kinds() {
        // Not RIFF at all.
        assert!(matches!(
            WavFile::from_memory(b"OGGSxxxxxxxx"),
            Err(WavError::NotARiffFile)
        ));
        // RIFF but not WAVE.
        let mut bytes = wav_bytes(1, 8_000, 8, &[0]);
        bytes[8..12].copy_from_slice(b"AVI ");
        assert!(matches!(
            WavFile::from_memory(&bytes),
            Err(WavError::NotAWavFile)
        ));
        // Wrong fmt length.
        let mut bytes = wav_bytes(1, 8_000, 8, &[0]);
        bytes[16..20].copy_from_slice(&18u32.to_le_bytes());
        assert!(matches!(
            WavFile::from_memory(&bytes),
            Err(WavError::UnsupportedFormatLength)
        ));
        // Compressed format tag.
        let mut bytes = wav_bytes(1, 8_000, 8, &[0]);
        bytes[20..22].copy_from_slice(&3u16.to_le_bytes());
        assert!(matches!(
            WavFile::from_memory(&bytes),
            Err(WavError::CompressedWavFile)
        ));
        // Broken byte rate.
        let mut bytes = wav_bytes(1, 8_000, 8, &[0]);
        bytes[28..32].copy_from_slice(&999u32.to_le_bytes());
        assert!(matches!(
            WavFile::from_memory(&bytes),
            Err(WavError::MismatchedByteRate)
        ));
        // Broken block align.
        let mut bytes = wav_bytes(2, 8_000, 16, &[0, 0, 0, 0]);
        bytes[32..34].copy_from_slice(&7u16.to_le_bytes());
        assert!(matches!(
            WavFile::from_memory(&bytes),
            Err(WavError::MismatchedBlockAlign)
        ));
        // Something other than a data chunk.
        let mut bytes = wav_bytes(1, 8_000, 8, &[0]);
        bytes[36..40].copy_from_slice(b"LIST");
        assert!(matches!(
            WavFile::from_memory(&bytes),
            Err(WavError::InvalidDataHeader)
        ));
        // Truncated payload.
        let bytes = wav_bytes(1, 8_000, 8, &[0, 0, 0, 0]);
        assert!(matches!(
            WavFile::from_memory(&bytes[..bytes.len() - 2]),
            Err(WavError::UnexpectedEOF)
        ));
        // 24-bit is out of contract.
        let mut bytes = wav_bytes(1, 8_000, 16, &[0, 0]);
        bytes[34..36].copy_from_slice(&24u16.to_le_bytes());
        assert!(matches!(
            WavFile::from_memory(&bytes),
            Err(WavError::Unsupported)
        ));
    }

    #[test]
    fn channel_into_checks_capacity() {
        let wav = WavFile::from_memory(&wav_bytes(1, 8_000, 8, &[0, 255, 128])).unwrap();
        let mut small = [0.0f32; 2];
        assert!(matches!(
            wav.channel_into(0, &mut small),
            Err(WavError::InsufficientBuffer)
        ));
        let mut fits = [0.0f32; 3];
        assert_eq!(wav.channel_into(0, &mut fits).unwrap(), 3);
        assert!((fits[1] - 1.0).abs() < 1e-6);
    }
}
