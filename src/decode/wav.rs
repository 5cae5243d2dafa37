//! RIFF/WAVE parsing
//!
//! Handles the payloads a browser or test fixture is likely to produce:
//! 8/16/24/32-bit integer PCM, 32-bit float, and `WAVE_FORMAT_EXTENSIBLE`
//! wrapping either. Multi-channel audio is averaged down to one channel.

use thiserror::Error;

use crate::error::PracticeError;
use crate::media::DecodedAudio;

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

const RIFF_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
const FMT_MIN_LEN: usize = 16;
/// Offset of the SubFormat GUID inside an extensible fmt chunk
const SUBFORMAT_OFFSET: usize = 24;

/// Ways a WAV payload can be rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WavError {
    /// Shorter than a RIFF header
    #[error("WAV payload too small ({0} bytes)")]
    TooSmall(usize),
    /// Does not start with `RIFF`
    #[error("missing RIFF header")]
    MissingRiff,
    /// `RIFF` container is not `WAVE`
    #[error("missing WAVE marker")]
    MissingWave,
    /// fmt chunk shorter than 16 bytes or cut off
    #[error("fmt chunk truncated")]
    FmtTruncated,
    /// data chunk seen before any fmt chunk
    #[error("data chunk before fmt chunk")]
    DataBeforeFmt,
    /// Encoding this parser does not handle
    #[error("unsupported encoding: format {format}, {bits} bits")]
    UnsupportedFormat {
        /// Format code from the fmt chunk
        format: u16,
        /// Bits per sample
        bits: u16,
    },
    /// Zero channels
    #[error("invalid channel count {0}")]
    InvalidChannels(u16),
    /// Zero sample rate
    #[error("invalid sample rate {0}")]
    InvalidSampleRate(u32),
    /// No data chunk
    #[error("no data chunk")]
    NoDataChunk,
}

impl From<WavError> for PracticeError {
    fn from(e: WavError) -> Self {
        Self::DecodeFailure(e.to_string())
    }
}

/// Parsed fmt chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    /// Effective format code (extensible resolved to its sub-format)
    pub format: u16,
    /// Interleaved channels
    pub channels: u16,
    /// Frames per second
    pub sample_rate: u32,
    /// Bits per sample
    pub bits_per_sample: u16,
}

impl WavFormat {
    fn parse(body: &[u8]) -> Result<Self, WavError> {
        if body.len() < FMT_MIN_LEN {
            return Err(WavError::FmtTruncated);
        }
        let mut format = read_u16(body, 0);
        let channels = read_u16(body, 2);
        let sample_rate = read_u32(body, 4);
        let bits_per_sample = read_u16(body, 14);

        if format == FORMAT_EXTENSIBLE {
            if body.len() < SUBFORMAT_OFFSET + 2 {
                return Err(WavError::FmtTruncated);
            }
            format = read_u16(body, SUBFORMAT_OFFSET);
        }
        if channels == 0 {
            return Err(WavError::InvalidChannels(channels));
        }
        if sample_rate == 0 {
            return Err(WavError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            format,
            channels,
            sample_rate,
            bits_per_sample,
        })
    }

    /// Bytes per sample and the matching converter
    fn sample_decoder(self) -> Result<(usize, SampleFn), WavError> {
        match (self.format, self.bits_per_sample) {
            (FORMAT_PCM, 8) => Ok((1, pcm8 as SampleFn)),
            (FORMAT_PCM, 16) => Ok((2, pcm16 as SampleFn)),
            (FORMAT_PCM, 24) => Ok((3, pcm24 as SampleFn)),
            (FORMAT_PCM, 32) => Ok((4, pcm32 as SampleFn)),
            (FORMAT_IEEE_FLOAT, 32) => Ok((4, float32 as SampleFn)),
            (format, bits) => Err(WavError::UnsupportedFormat { format, bits }),
        }
    }
}

type SampleFn = fn(&[u8]) -> f32;

fn pcm8(b: &[u8]) -> f32 {
    (f32::from(b[0]) - 128.0) / 128.0
}

fn pcm16(b: &[u8]) -> f32 {
    f32::from(i16::from_le_bytes([b[0], b[1]])) / 32_768.0
}

#[allow(clippy::cast_precision_loss)]
fn pcm24(b: &[u8]) -> f32 {
    // Load high, shift back down to sign-extend
    let value = i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8;
    value as f32 / 8_388_608.0
}

#[allow(clippy::cast_precision_loss)]
fn pcm32(b: &[u8]) -> f32 {
    i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32 / 2_147_483_648.0
}

fn float32(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Iterates `(id, body)` over RIFF chunks, honouring odd-size padding
struct Chunks<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos + CHUNK_HEADER_LEN > self.bytes.len() {
            return None;
        }
        let id = &self.bytes[self.pos..self.pos + 4];
        let size = read_u32(self.bytes, self.pos + 4) as usize;
        let start = self.pos + CHUNK_HEADER_LEN;
        // Streaming writers leave the size unset; clamp to what is present.
        let end = start.saturating_add(size).min(self.bytes.len());
        self.pos = end + (size & 1);
        Some((id, &self.bytes[start..end]))
    }
}

/// Parse a WAV payload into one channel of samples
///
/// # Errors
///
/// Returns a [`WavError`] describing the first problem found.
pub fn parse_wav(bytes: &[u8]) -> Result<DecodedAudio, WavError> {
    if bytes.len() < RIFF_HEADER_LEN {
        return Err(WavError::TooSmall(bytes.len()));
    }
    if &bytes[0..4] != b"RIFF" {
        return Err(WavError::MissingRiff);
    }
    if &bytes[8..12] != b"WAVE" {
        return Err(WavError::MissingWave);
    }

    let mut format = None;
    let chunks = Chunks {
        bytes,
        pos: RIFF_HEADER_LEN,
    };
    for (id, body) in chunks {
        match id {
            b"fmt " => format = Some(WavFormat::parse(body)?),
            b"data" => {
                let format = format.ok_or(WavError::DataBeforeFmt)?;
                return Ok(DecodedAudio {
                    samples: downmix(body, format)?,
                    sample_rate: format.sample_rate,
                });
            }
            _ => {}
        }
    }
    Err(WavError::NoDataChunk)
}

#[allow(clippy::cast_precision_loss)]
fn downmix(data: &[u8], format: WavFormat) -> Result<Vec<f32>, WavError> {
    let (width, decode) = format.sample_decoder()?;
    let channels = usize::from(format.channels);
    let frame = width * channels;

    Ok(data
        .chunks_exact(frame)
        .map(|frame| {
            let sum: f32 = frame.chunks_exact(width).map(decode).sum();
            sum / channels as f32
        })
        .collect())
}
