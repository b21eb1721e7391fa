// Narration and background music mixing
// Narration drives the timeline; the music bed loops until narration ends

use std::sync::Arc;

/// Looping background track with a fixed gain
#[derive(Debug, Clone)]
pub struct MusicBed {
    samples: Arc<Vec<f32>>,
    position: usize,
    gain: f32,
}

impl MusicBed {
    pub fn new(samples: Arc<Vec<f32>>, gain: f32) -> Self {
        Self {
            samples,
            position: 0,
            gain: gain.clamp(0.0, 1.0),
        }
    }

    fn next_sample(&mut self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let value = self.samples[self.position] * self.gain;
        self.position = (self.position + 1) % self.samples.len();
        value
    }
}

pub struct Mixer {
    narration: Vec<f32>,
    position: usize,
    music: Option<MusicBed>,
}

impl Mixer {
    /// Both inputs must already be at the output sample rate
    pub fn new(narration: Vec<f32>, music: Option<MusicBed>) -> Self {
        Self {
            narration,
            position: 0,
            music,
        }
    }

    pub fn has_music(&self) -> bool {
        self.music.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.narration.len()
    }

    pub fn remaining_frames(&self) -> usize {
        self.narration.len().saturating_sub(self.position)
    }

    /// Fill `out` with mono frames. Returns the number of frames written;
    /// fewer than `out.len()` means narration ended and music stopped with it.
    pub fn fill(&mut self, out: &mut [f32]) -> usize {
        let frames = out.len().min(self.remaining_frames());

        for (slot, &voice) in out
            .iter_mut()
            .zip(&self.narration[self.position..self.position + frames])
        {
            let bed = self.music.as_mut().map_or(0.0, |m| m.next_sample());
            *slot = (voice + bed).clamp(-1.0, 1.0);
        }

        self.position += frames;
        frames
    }

    /// Fill an interleaved buffer of `channels` channels, copying each mono frame
    pub fn fill_interleaved(&mut self, out: &mut [f32], channels: usize, scratch: &mut Vec<f32>) -> usize {
        let channels = channels.max(1);
        scratch.resize(out.len() / channels, 0.0);

        let frames = self.fill(scratch);
        for (frame, &value) in out.chunks_mut(channels).zip(scratch.iter()).take(frames) {
            frame.fill(value);
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narration_only() {
        let mut mixer = Mixer::new(vec![0.1, 0.2, 0.3], None);
        let mut out = [0.0; 2];
        assert_eq!(mixer.fill(&mut out), 2);
        assert_eq!(out, [0.1, 0.2]);
        assert_eq!(mixer.fill(&mut out), 1);
        assert_eq!(out[0], 0.3);
        assert!(mixer.is_finished());
        assert_eq!(mixer.fill(&mut out), 0);
    }

    #[test]
    fn test_music_loops_under_narration() {
        let bed = MusicBed::new(Arc::new(vec![1.0, -1.0]), 0.5);
        let mut mixer = Mixer::new(vec![0.0; 5], Some(bed));
        let mut out = [0.0; 5];
        assert_eq!(mixer.fill(&mut out), 5);
        assert_eq!(out, [0.5, -0.5, 0.5, -0.5, 0.5]);
    }

    #[test]
    fn test_music_stops_with_narration() {
        let bed = MusicBed::new(Arc::new(vec![0.8; 100]), 0.15);
        let mut mixer = Mixer::new(vec![0.0; 3], Some(bed));
        let mut out = [9.0; 8];
        assert_eq!(mixer.fill(&mut out), 3);
        // Frames past the end are left for the caller to discard
        assert_eq!(out[3], 9.0);
        assert!(mixer.is_finished());
    }

    #[test]
    fn test_mix_is_clamped() {
        let bed = MusicBed::new(Arc::new(vec![1.0]), 1.0);
        let mut mixer = Mixer::new(vec![0.9, -1.0], Some(bed));
        let mut out = [0.0; 2];
        mixer.fill(&mut out);
        assert_eq!(out, [1.0, 0.0]);
    }

    #[test]
    fn test_interleaved_copies_channels() {
        let mut mixer = Mixer::new(vec![0.25, 0.5, 0.75], None);
        let mut out = [0.0; 4];
        let mut scratch = Vec::new();
        assert_eq!(mixer.fill_interleaved(&mut out, 2, &mut scratch), 2);
        assert_eq!(out, [0.25, 0.25, 0.5, 0.5]);
        assert_eq!(mixer.remaining_frames(), 1);
    }

    #[test]
    fn test_empty_music_is_silent() {
        let bed = MusicBed::new(Arc::new(vec![]), 0.5);
        let mut mixer = Mixer::new(vec![0.3], Some(bed));
        let mut out = [0.0; 1];
        mixer.fill(&mut out);
        assert_eq!(out, [0.3]);
    }
}
