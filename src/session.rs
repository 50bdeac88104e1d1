use crate::audio::capture::CaptureSource;
use crate::audio::{encode, energy, resample};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::event::SessionEvent;
use crate::playback::{OutputDevice, PlaybackController};
use crate::segment::{SegmentEvent, Segmenter, SegmenterConfig, SegmenterState};
use crate::transport::{ServerMessage, Transport};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Bot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
}

/// Append-only conversation log. Grows monotonically for the session's
/// lifetime; entries are never mutated or reordered.
#[derive(Debug, Default)]
pub struct TranscriptLog {
    entries: Vec<TranscriptEntry>,
}

impl TranscriptLog {
    pub fn push(&mut self, role: Role, text: String) {
        self.entries.push(TranscriptEntry { role, text });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }
}

/// Most recent partial caption. Overwritten on each arrival, not accumulated.
#[derive(Debug, Default)]
pub struct CaptionState {
    current: Option<String>,
}

impl CaptionState {
    pub fn set(&mut self, text: String) {
        self.current = Some(text);
    }

    pub fn take(&mut self) -> Option<String> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }
}

/// Wires capture, segmentation, encoding, transport and playback into one
/// recording session and owns all mutable pipeline state.
///
/// Cooperative model: every event is handled to completion on the one loop in
/// `run`, so the per-frame path and the transport path never race and no
/// locking is needed here.
pub struct SessionCoordinator<C, O, T>
where
    C: CaptureSource,
    O: OutputDevice,
    T: Transport,
{
    config: PipelineConfig,
    capture: C,
    playback: PlaybackController<O>,
    transport: T,
    segmenter: Segmenter,
    caption: CaptionState,
    transcript: TranscriptLog,
    connected: bool,
    running: bool,
    capture_rate: u32,
    // Monotonic ms derived from consumed sample counts, not wall time.
    clock_ms: u64,
}

impl<C, O, T> SessionCoordinator<C, O, T>
where
    C: CaptureSource,
    O: OutputDevice,
    T: Transport,
{
    pub fn new(config: PipelineConfig, capture: C, output: O, transport: T) -> Self {
        let segmenter = Segmenter::new(SegmenterConfig {
            energy_threshold: config.energy_threshold,
            hangover_ms: config.hangover_ms,
        });
        Self {
            config,
            capture,
            playback: PlaybackController::new(output),
            transport,
            segmenter,
            caption: CaptionState::default(),
            transcript: TranscriptLog::default(),
            connected: false,
            running: false,
            capture_rate: 0,
            clock_ms: 0,
        }
    }

    /// Acquire the capture device and begin a recording session. No-op when
    /// already started.
    pub fn start(&mut self, events: mpsc::Sender<SessionEvent>) -> Result<(), PipelineError> {
        if self.running {
            return Ok(());
        }

        self.capture_rate = self.capture.acquire(events.clone())?;
        self.transport.subscribe(events)?;
        self.segmenter.reset();
        self.clock_ms = 0;
        self.running = true;
        info!("session started (capture {}Hz)", self.capture_rate);
        Ok(())
    }

    /// Release the capture device and discard any partial utterance without
    /// transmitting it. Safe from any state; no-op when already stopped.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.capture.release();
        self.transport.unsubscribe();
        self.segmenter.reset();
        self.running = false;
        info!("session stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn segmenter_state(&self) -> SegmenterState {
        self.segmenter.state()
    }

    pub fn playback(&self) -> &PlaybackController<O> {
        &self.playback
    }

    pub fn caption(&self) -> &CaptionState {
        &self.caption
    }

    pub fn transcript(&self) -> &TranscriptLog {
        &self.transcript
    }

    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Frame(samples) => self.handle_frame(&samples),
            SessionEvent::Transport(msg) => self.handle_message(msg),
            SessionEvent::PlaybackEnded(id) => self.playback.on_natural_end(id),
        }
    }

    fn handle_frame(&mut self, samples: &[f32]) {
        if !self.running {
            // Frames may trail in after release; never resurrect a segment.
            return;
        }

        self.clock_ms += samples.len() as u64 * 1000 / self.capture_rate as u64;

        let resampled = resample::resample(samples, self.capture_rate, self.config.target_sample_rate);
        let rms = energy::rms(&resampled);
        let encoded = encode::encode_i16(&resampled);

        match self.segmenter.push(&encoded, rms, self.clock_ms) {
            Some(SegmentEvent::SpeechStart) => {
                if self.config.barge_in {
                    self.playback.on_speech_detected();
                }
            }
            Some(SegmentEvent::Utterance(pcm)) => {
                // Exactly one send attempt per finalized utterance; a failure
                // is logged and the utterance is not buffered for retry.
                let bytes = encode::pcm_to_le_bytes(&pcm);
                if let Err(e) = self.transport.send_utterance(bytes) {
                    warn!("utterance send failed: {}", e);
                }
            }
            None => {}
        }
    }

    fn handle_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Speech {
                audio,
                text,
                interrupt,
            } => {
                // The pending partial caption is the user's utterance this
                // speech answers; promote it before appending the bot turn.
                if let Some(user_text) = self.caption.take() {
                    self.transcript.push(Role::User, user_text);
                }
                self.transcript.push(Role::Bot, text);
                self.playback
                    .start_playback(&audio, interrupt, self.config.barge_in);
            }
            ServerMessage::Caption { text } => {
                self.caption.set(text);
            }
            ServerMessage::Status { connected } => {
                self.connected = connected;
                info!("transport connected: {}", connected);
            }
        }
    }

    /// Event loop driver. Runs until cancelled or the channel closes, then
    /// stops the session (releasing the device and dropping any partial
    /// segment).
    pub async fn run(
        &mut self,
        events: &mut mpsc::Receiver<SessionEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
            }
        }
        self.stop();
    }
}
