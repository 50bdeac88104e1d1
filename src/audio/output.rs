use crate::error::PipelineError;
use crate::event::SessionEvent;
use crate::playback::OutputDevice;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Speaker output via cpal.
///
/// Payloads are 16-bit little-endian mono PCM at the rate given to `new`.
/// Each playback owns its own output stream, so non-interrupting playbacks
/// may overlap; natural end is reported as `SessionEvent::PlaybackEnded` once
/// the buffer drains.
pub struct CpalOutput {
    sample_rate: u32,
    events: mpsc::Sender<SessionEvent>,
    streams: Vec<(Uuid, cpal::Stream, Arc<AtomicBool>)>,
}

impl CpalOutput {
    pub fn new(sample_rate: u32, events: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            sample_rate,
            events,
            streams: Vec::new(),
        }
    }

    fn reap_finished(&mut self) {
        self.streams
            .retain(|(_, _, finished)| !finished.load(Ordering::Relaxed));
    }
}

fn decode_le_pcm(payload: &[u8]) -> Vec<f32> {
    payload
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect()
}

impl OutputDevice for CpalOutput {
    fn play(&mut self, id: Uuid, payload: &[u8]) -> Result<(), PipelineError> {
        self.reap_finished();

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| PipelineError::PlaybackRejected("no output device".into()))?;

        let supported = device
            .supported_output_configs()
            .map_err(|e| PipelineError::PlaybackRejected(e.to_string()))?
            .find(|c| {
                c.channels() <= 2
                    && c.min_sample_rate().0 <= self.sample_rate
                    && c.max_sample_rate().0 >= self.sample_rate
            })
            .ok_or_else(|| PipelineError::PlaybackRejected("no suitable output config".into()))?;

        let config = supported
            .with_sample_rate(cpal::SampleRate(self.sample_rate))
            .config();
        let channels = config.channels as usize;

        let samples = Arc::new(decode_le_pcm(payload));
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let cb_samples = samples.clone();
        let cb_position = position.clone();
        let cb_finished = finished.clone();

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = cb_position.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(channels) {
                        let sample = if pos < cb_samples.len() {
                            let s = cb_samples[pos];
                            pos += 1;
                            s
                        } else {
                            cb_finished.store(true, Ordering::Relaxed);
                            0.0
                        };
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                    cb_position.store(pos, Ordering::Relaxed);
                },
                |err| debug!("output stream error: {}", err),
                None,
            )
            .map_err(|e| PipelineError::PlaybackRejected(e.to_string()))?;

        stream
            .play()
            .map_err(|e| PipelineError::PlaybackRejected(e.to_string()))?;

        // Watch for drain and report the natural end exactly once.
        let events = self.events.clone();
        let watch_finished = finished.clone();
        std::thread::spawn(move || loop {
            if watch_finished.load(Ordering::Relaxed) {
                let _ = events.blocking_send(SessionEvent::PlaybackEnded(id));
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        });

        self.streams.push((id, stream, finished));
        Ok(())
    }

    fn stop(&mut self, id: Uuid) {
        // Dropping the stream stops output; the watcher still fires a stale
        // end event, which the controller's identity check ignores.
        if let Some(idx) = self.streams.iter().position(|(sid, _, _)| *sid == id) {
            let (_, _, finished) = self.streams.remove(idx);
            finished.store(true, Ordering::Relaxed);
        }
        self.reap_finished();
    }
}
