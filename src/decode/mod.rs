//! Audio decode primitive
//!
//! Browsers decode through `AudioContext`; headless hosts and tests use
//! [`WavDecoder`]. Either way the result feeds the duration resolver (decoded
//! length of a blob) and the waveform renderer (sample data).

pub mod wav;

use crate::error::PracticeResult;
use crate::media::{AudioDecoder, DecodedAudio};

pub use wav::{parse_wav, WavError, WavFormat};

/// [`AudioDecoder`] for RIFF/WAVE payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl AudioDecoder for WavDecoder {
    fn decode(&mut self, bytes: &[u8]) -> PracticeResult<DecodedAudio> {
        Ok(parse_wav(bytes)?)
    }
}

/// Decode `bytes` and report their length in seconds
///
/// # Errors
///
/// Propagates the decoder's `DecodeFailure`.
pub fn decoded_duration<D: AudioDecoder + ?Sized>(decoder: &mut D, bytes: &[u8]) -> PracticeResult<f64> {
    decoder.decode(bytes).map(|audio| audio.duration())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PracticeError;

    fn silent_wav(frames: usize, rate: u32) -> Vec<u8> {
        let data = vec![0u8; frames * 2];
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&((36 + data.len()) as u32).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&rate.to_le_bytes());
        out.extend_from_slice(&(rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&data);
        out
    }

    #[test]
    fn test_decoded_duration() {
        let bytes = silent_wav(20_000, 8_000);
        let seconds = decoded_duration(&mut WavDecoder, &bytes).expect("valid");
        assert!((seconds - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_garbage_is_decode_failure() {
        let result = WavDecoder.decode(b"not audio at all");
        assert!(matches!(result, Err(PracticeError::DecodeFailure(_))));
    }
}
