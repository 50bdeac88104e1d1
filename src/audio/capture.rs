use crate::error::PipelineError;
use crate::event::SessionEvent;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Capture device collaborator. `acquire` starts frame delivery into the
/// given channel and reports the capture sample rate; `release` stops it and
/// frees the device.
pub trait CaptureSource {
    fn acquire(&mut self, events: mpsc::Sender<SessionEvent>) -> Result<u32, PipelineError>;

    fn release(&mut self);
}

/// Microphone capture via cpal.
///
/// The stream callback pushes f32 samples into an SPSC ring; when the ring is
/// full, input is dropped rather than queued (the device paces delivery, a
/// slow consumer loses audio). A pump thread pops fixed frames and forwards
/// them as `SessionEvent::Frame`.
pub struct CpalCapture {
    frame_ms: u64,
    active: Option<ActiveCapture>,
}

struct ActiveCapture {
    _stream: cpal::Stream,
    sample_rate: u32,
    stop: Arc<AtomicBool>,
    pump: Option<std::thread::JoinHandle<()>>,
}

impl CpalCapture {
    pub fn new(frame_ms: u64) -> Self {
        Self {
            frame_ms,
            active: None,
        }
    }
}

impl CaptureSource for CpalCapture {
    fn acquire(&mut self, events: mpsc::Sender<SessionEvent>) -> Result<u32, PipelineError> {
        if let Some(active) = &self.active {
            return Ok(active.sample_rate);
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| PipelineError::DeviceUnavailable("no input device".into()))?;

        info!("audio input device: {}", device.name().unwrap_or_default());

        // Prefer the standard speech rates, 16k first for efficiency.
        let target_rates = [16000, 32000, 48000, 8000];
        let mut selected_config = None;
        let mut selected_rate = 0;

        for &rate in &target_rates {
            let configs = device
                .supported_input_configs()
                .map_err(|e| PipelineError::DeviceUnavailable(e.to_string()))?;
            for config_range in configs {
                if config_range.min_sample_rate().0 <= rate
                    && config_range.max_sample_rate().0 >= rate
                {
                    selected_config = Some(config_range.with_sample_rate(cpal::SampleRate(rate)));
                    selected_rate = rate;
                    break;
                }
            }
            if selected_config.is_some() {
                break;
            }
        }

        let config = match selected_config {
            Some(c) => c,
            None => {
                let def = device
                    .default_input_config()
                    .map_err(|e| PipelineError::DeviceUnavailable(e.to_string()))?;
                selected_rate = def.sample_rate().0;
                def
            }
        };

        info!(
            "capture config: rate={}Hz channels={}",
            selected_rate,
            config.channels()
        );

        // One second of headroom between the callback and the pump.
        let rb = HeapRb::<f32>::new(selected_rate as usize);
        let (mut producer, consumer) = rb.split();

        let err_fn = |err| error!("capture stream error: {}", err);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device
                .build_input_stream(
                    &config.into(),
                    move |data: &[f32], _: &_| {
                        // Lossy when full: push_slice writes what fits.
                        producer.push_slice(data);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| PipelineError::DeviceUnavailable(e.to_string()))?,
            cpal::SampleFormat::I16 => device
                .build_input_stream(
                    &config.into(),
                    move |data: &[i16], _: &_| {
                        for &sample in data {
                            let _ = producer.try_push(sample as f32 / i16::MAX as f32);
                        }
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| PipelineError::DeviceUnavailable(e.to_string()))?,
            other => {
                return Err(PipelineError::DeviceUnavailable(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        };

        stream
            .play()
            .map_err(|e| PipelineError::DeviceUnavailable(e.to_string()))?;

        let stop = Arc::new(AtomicBool::new(false));
        let pump = FramePump {
            consumer,
            events,
            sample_rate: selected_rate,
            frame_ms: self.frame_ms,
            stop: stop.clone(),
        };
        let handle = std::thread::spawn(move || pump.run());

        self.active = Some(ActiveCapture {
            _stream: stream,
            sample_rate: selected_rate,
            stop,
            pump: Some(handle),
        });

        Ok(selected_rate)
    }

    fn release(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.stop.store(true, Ordering::Relaxed);
            if let Some(handle) = active.pump.take() {
                let _ = handle.join();
            }
            info!("capture released");
        }
    }
}

/// Pops fixed-duration frames from the capture ring and forwards them to the
/// coordinator. Runs on its own thread until stopped or the channel closes.
struct FramePump<C>
where
    C: Consumer<Item = f32> + Send,
{
    consumer: C,
    events: mpsc::Sender<SessionEvent>,
    sample_rate: u32,
    frame_ms: u64,
    stop: Arc<AtomicBool>,
}

impl<C> FramePump<C>
where
    C: Consumer<Item = f32> + Send,
{
    fn run(mut self) {
        let frame_size = (self.sample_rate as u64 * self.frame_ms / 1000) as usize;
        let mut frame = vec![0.0f32; frame_size];

        loop {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            if self.consumer.occupied_len() < frame_size {
                std::thread::sleep(std::time::Duration::from_millis(5));
                continue;
            }

            let _ = self.consumer.pop_slice(&mut frame);
            if self
                .events
                .blocking_send(SessionEvent::Frame(frame.clone()))
                .is_err()
            {
                // Coordinator gone; nothing left to feed.
                break;
            }
        }
    }
}
