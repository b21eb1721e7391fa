// Audio output using cpal
// Opens the default device at its native rate and feeds it through a ring buffer

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::{HeapRb, traits::{Consumer, Observer, Producer, Split}};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use super::error::AudioError;

type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

/// Where a playback session sends its mixed, interleaved samples.
/// Created and dropped on the playback thread.
pub trait OutputSink {
    fn sample_rate(&self) -> u32;
    fn channels(&self) -> u16;
    /// Queue every sample, waiting for room. False if `cancel` was raised first.
    fn write_blocking(&self, samples: &[f32], cancel: &AtomicBool) -> bool;
    /// Wait until everything queued has been played. False if cancelled.
    fn drain(&self, cancel: &AtomicBool) -> bool;
    /// Silence and release the device
    fn close(self: Box<Self>);
}

/// Opens a sink with roughly `buffer_ms` of buffering
pub type OutputOpener = Arc<dyn Fn(u32) -> Result<Box<dyn OutputSink>, AudioError> + Send + Sync>;

/// The default device, through cpal
pub fn device_output() -> OutputOpener {
    Arc::new(|buffer_ms| AudioOutput::open(buffer_ms).map(|output| Box::new(output) as Box<dyn OutputSink>))
}

/// An open output stream. Not `Send`: it lives on the playback thread that created it.
pub struct AudioOutput {
    stream: Stream,
    producer: Arc<Mutex<RingProducer>>,
    sample_rate: u32,
    channels: u16,
    flush: Arc<AtomicBool>,
}

impl AudioOutput {
    /// Open the default output device with a buffer of roughly `buffer_ms`
    pub fn open(buffer_ms: u32) -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::Output("No output device available".to_string()))?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::Output(format!("Failed to get default output config: {}", e)))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        let capacity = ring_capacity(sample_rate, channels, buffer_ms);
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
        let producer = Arc::new(Mutex::new(producer));
        let consumer = Arc::new(Mutex::new(consumer));

        let flush = Arc::new(AtomicBool::new(false));
        let flush_requested = flush.clone();

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config.into(), consumer, flush_requested)?
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config.into(), consumer, flush_requested)?
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config.into(), consumer, flush_requested)?
            }
            format => {
                return Err(AudioError::Output(format!("Unsupported sample format: {:?}", format)))
            }
        };

        stream
            .play()
            .map_err(|e| AudioError::Output(format!("Failed to start stream: {}", e)))?;

        debug!(sample_rate, channels, capacity, "Opened audio output");

        Ok(Self {
            stream,
            producer,
            sample_rate,
            channels,
            flush,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        consumer: Arc<Mutex<RingConsumer>>,
        flush: Arc<AtomicBool>,
    ) -> Result<Stream, AudioError> {
        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut consumer = consumer.lock();

                    // Flush requested by the writer: skip to silence
                    if flush.swap(false, Ordering::SeqCst) {
                        while consumer.try_pop().is_some() {}
                    }

                    for sample in data.iter_mut() {
                        let value = consumer.try_pop().unwrap_or(0.0);
                        *sample = T::from_sample(value);
                    }
                },
                move |err| {
                    error!("Audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::Output(format!("Failed to build output stream: {}", e)))?;

        Ok(stream)
    }

    /// Queue as many samples as fit; returns how many were taken
    pub fn write(&self, samples: &[f32]) -> usize {
        self.producer.lock().push_slice(samples)
    }

    /// Drop everything queued so output goes silent immediately
    pub fn clear(&self) {
        self.flush.store(true, Ordering::SeqCst);
    }

    /// Samples waiting in the buffer
    pub fn queued(&self) -> usize {
        self.producer.lock().occupied_len()
    }
}

impl OutputSink for AudioOutput {
    /// Native rate of the device
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn write_blocking(&self, samples: &[f32], cancel: &AtomicBool) -> bool {
        let mut remaining = samples;

        while !remaining.is_empty() {
            if cancel.load(Ordering::SeqCst) {
                return false;
            }
            let written = self.write(remaining);
            if written == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
            remaining = &remaining[written..];
        }

        true
    }

    fn drain(&self, cancel: &AtomicBool) -> bool {
        while self.queued() > 0 {
            if cancel.load(Ordering::SeqCst) {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        true
    }

    fn close(self: Box<Self>) {
        self.clear();
        if let Err(e) = self.stream.pause() {
            debug!("Pausing stream on close failed: {}", e);
        }
        // Dropping the stream releases the device
    }
}

/// Ring buffer size in samples for `buffer_ms` of interleaved audio
pub fn ring_capacity(sample_rate: u32, channels: u16, buffer_ms: u32) -> usize {
    let buffer_ms = buffer_ms.clamp(50, 1000) as usize;
    (sample_rate as usize * channels.max(1) as usize * buffer_ms / 1000).max(1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_capacity() {
        // 250ms of stereo at 48kHz
        assert_eq!(ring_capacity(48000, 2, 250), 24000);
        assert_eq!(ring_capacity(44100, 1, 5), 2205);
        assert_eq!(ring_capacity(8000, 1, 50), 1024);
    }
}
