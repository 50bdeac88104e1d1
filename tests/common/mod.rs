#![allow(dead_code)]

use parlance::audio::capture::CaptureSource;
use parlance::error::PipelineError;
use parlance::event::SessionEvent;
use parlance::playback::OutputDevice;
use parlance::transport::Transport;
use parlance::PipelineConfig;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Fast tunables for tests: 30ms frames at 16kHz, 60ms hangover.
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        energy_threshold: 0.01,
        hangover_ms: 60,
        target_sample_rate: 16000,
        frame_ms: 30,
        barge_in: true,
    }
}

/// One 30ms frame at 16kHz with every sample set to `value` (so RMS == |value|).
pub fn const_frame(value: f32) -> Vec<f32> {
    vec![value; 480]
}

pub struct MockCapture {
    pub sample_rate: u32,
    pub fail: bool,
    pub acquired: Arc<Mutex<u32>>,
    pub released: Arc<Mutex<u32>>,
}

impl MockCapture {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            fail: false,
            acquired: Arc::new(Mutex::new(0)),
            released: Arc::new(Mutex::new(0)),
        }
    }
}

impl CaptureSource for MockCapture {
    fn acquire(&mut self, _events: mpsc::Sender<SessionEvent>) -> Result<u32, PipelineError> {
        if self.fail {
            return Err(PipelineError::DeviceUnavailable("mock permission denied".into()));
        }
        *self.acquired.lock().unwrap() += 1;
        Ok(self.sample_rate)
    }

    fn release(&mut self) {
        *self.released.lock().unwrap() += 1;
    }
}

#[derive(Clone, Default)]
pub struct OutputLog {
    pub played: Arc<Mutex<Vec<(Uuid, usize)>>>,
    pub stopped: Arc<Mutex<Vec<Uuid>>>,
}

pub struct MockOutput {
    pub log: OutputLog,
    pub reject: bool,
}

impl MockOutput {
    pub fn new(log: OutputLog) -> Self {
        Self { log, reject: false }
    }
}

impl OutputDevice for MockOutput {
    fn play(&mut self, id: Uuid, payload: &[u8]) -> Result<(), PipelineError> {
        if self.reject {
            return Err(PipelineError::PlaybackRejected("mock refusal".into()));
        }
        self.log.played.lock().unwrap().push((id, payload.len()));
        Ok(())
    }

    fn stop(&mut self, id: Uuid) {
        self.log.stopped.lock().unwrap().push(id);
    }
}

#[derive(Clone, Default)]
pub struct SentLog {
    pub utterances: Arc<Mutex<Vec<Vec<u8>>>>,
}

pub struct MockTransport {
    pub sent: SentLog,
    pub subscribed: Arc<Mutex<bool>>,
    pub fail_send: bool,
}

impl MockTransport {
    pub fn new(sent: SentLog) -> Self {
        Self {
            sent,
            subscribed: Arc::new(Mutex::new(false)),
            fail_send: false,
        }
    }
}

impl Transport for MockTransport {
    fn subscribe(&mut self, _events: mpsc::Sender<SessionEvent>) -> Result<(), PipelineError> {
        *self.subscribed.lock().unwrap() = true;
        Ok(())
    }

    fn unsubscribe(&mut self) {
        *self.subscribed.lock().unwrap() = false;
    }

    fn send_utterance(&mut self, pcm: Vec<u8>) -> Result<(), PipelineError> {
        if self.fail_send {
            return Err(PipelineError::TransportSend("mock send failure".into()));
        }
        self.sent.utterances.lock().unwrap().push(pcm);
        Ok(())
    }
}
