// Narration PCM handling
// Base64 16-bit PCM decoding and linear-interpolation resampling

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::error::AudioError;

/// Sample rate of synthesized narration
pub const NARRATION_SAMPLE_RATE: u32 = 24_000;

/// Decode base64 narration into little-endian 16-bit samples.
/// A trailing odd byte is discarded.
pub fn decode_narration(base64_pcm: &str) -> Result<Vec<i16>, AudioError> {
    let bytes = STANDARD
        .decode(base64_pcm.trim())
        .map_err(|e| AudioError::InvalidNarration(format!("bad base64: {}", e)))?;

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Encode samples as base64 little-endian 16-bit PCM
pub fn encode_narration(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

/// Convert 16-bit samples to floats in [-1, 1] at `target_rate`.
///
/// Plain linear interpolation with no anti-aliasing filter. Good enough for
/// speech; steep downsampling will alias.
pub fn resample(samples: &[i16], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || source_rate == 0 || target_rate == 0 {
        return samples.iter().map(|&s| s as f32 / 32768.0).collect();
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let output_len = (samples.len() as f64 / ratio).round() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let value = if idx + 1 < samples.len() {
            samples[idx] as f64 * (1.0 - frac) + samples[idx + 1] as f64 * frac
        } else {
            // Past the last pair: hold the nearest sample
            samples[idx.min(samples.len() - 1)] as f64
        };

        output.push((value / 32768.0) as f32);
    }

    output
}
