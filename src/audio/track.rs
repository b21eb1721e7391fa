// Decoded background tracks
// Mono f32 buffers plus conversion to the output device rate

use rubato::{FftFixedIn, Resampler};

use super::error::AudioError;

/// Frames fed to the resampler per chunk
const RESAMPLE_CHUNK_FRAMES: usize = 1024;

/// A fully decoded mono track at its native sample rate
#[derive(Debug, Clone)]
pub struct DecodedTrack {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedTrack {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }

    /// Band-limited conversion to `target_rate` (music, unlike narration, is
    /// full-range, so it goes through rubato rather than the linear resampler)
    pub fn resampled_to(&self, target_rate: u32) -> Result<Vec<f32>, AudioError> {
        if self.sample_rate == target_rate || self.samples.is_empty() {
            return Ok(self.samples.clone());
        }

        let mut resampler = FftFixedIn::<f32>::new(
            self.sample_rate as usize,
            target_rate as usize,
            RESAMPLE_CHUNK_FRAMES,
            2,
            1,
        )
        .map_err(|e| AudioError::Resample(e.to_string()))?;

        let expected =
            (self.samples.len() as f64 * target_rate as f64 / self.sample_rate as f64).round() as usize;
        let delay = resampler.output_delay();
        let mut output = Vec::with_capacity(expected + delay);

        let mut position = 0;
        while position + resampler.input_frames_next() <= self.samples.len() {
            let frames = resampler.input_frames_next();
            let chunk: [&[f32]; 1] = [&self.samples[position..position + frames]];
            let out = resampler
                .process(&chunk[..], None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            output.extend_from_slice(&out[0]);
            position += frames;
        }

        if position < self.samples.len() {
            let tail: [&[f32]; 1] = [&self.samples[position..]];
            let out = resampler
                .process_partial(Some(&tail[..]), None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            output.extend_from_slice(&out[0]);
        }

        // Flush the filter delay
        let mut flushes = 0;
        while output.len() < expected + delay && flushes < 8 {
            let out = resampler
                .process_partial::<&[f32]>(None, None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            if out[0].is_empty() {
                break;
            }
            output.extend_from_slice(&out[0]);
            flushes += 1;
        }

        output.drain(..delay.min(output.len()));
        output.truncate(expected);
        Ok(output)
    }
}
