use parlance::audio::capture::CpalCapture;
use parlance::audio::output::CpalOutput;
use parlance::error::PipelineError;
use parlance::event::SessionEvent;
use parlance::transport::{ServerMessage, Transport};
use parlance::{PipelineConfig, SessionCoordinator};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Echoes every finalized utterance back as a synthesized-speech message, so
/// a microphone and speakers exercise the full duplex path (including
/// barge-in) without a server. Optionally dumps each utterance to a WAV file.
struct LoopbackTransport {
    events: Option<mpsc::Sender<SessionEvent>>,
    wav_dir: Option<PathBuf>,
    sample_rate: u32,
    sent: usize,
}

impl LoopbackTransport {
    fn new(wav_dir: Option<PathBuf>, sample_rate: u32) -> Self {
        Self {
            events: None,
            wav_dir,
            sample_rate,
            sent: 0,
        }
    }

    fn dump_wav(&self, pcm: &[u8]) -> anyhow::Result<()> {
        let Some(dir) = &self.wav_dir else {
            return Ok(());
        };
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = dir.join(format!("utterance-{:04}.wav", self.sent));
        let mut writer = hound::WavWriter::create(&path, spec)?;
        for b in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([b[0], b[1]]))?;
        }
        writer.finalize()?;
        tracing::info!("wrote {}", path.display());
        Ok(())
    }
}

impl Transport for LoopbackTransport {
    fn subscribe(&mut self, events: mpsc::Sender<SessionEvent>) -> Result<(), PipelineError> {
        let _ = events.try_send(SessionEvent::Transport(ServerMessage::Status {
            connected: true,
        }));
        self.events = Some(events);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.events = None;
    }

    fn send_utterance(&mut self, pcm: Vec<u8>) -> Result<(), PipelineError> {
        self.sent += 1;
        if let Err(e) = self.dump_wav(&pcm) {
            tracing::warn!("wav dump failed: {}", e);
        }

        let events = self
            .events
            .as_ref()
            .ok_or_else(|| PipelineError::TransportSend("not subscribed".into()))?;
        let text = format!("echo #{} ({} bytes)", self.sent, pcm.len());
        events
            .try_send(SessionEvent::Transport(ServerMessage::Speech {
                audio: pcm,
                text,
                interrupt: true,
            }))
            .map_err(|e| PipelineError::TransportSend(e.to_string()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match std::env::var("PARLANCE_CONFIG") {
        Ok(path) => PipelineConfig::load(Path::new(&path))?,
        Err(_) => PipelineConfig::default(),
    };
    tracing::info!(
        "threshold={} hangover={}ms target={}Hz barge_in={}",
        config.energy_threshold,
        config.hangover_ms,
        config.target_sample_rate,
        config.barge_in
    );

    let wav_dir = std::env::var("PARLANCE_DUMP_DIR").ok().map(PathBuf::from);

    let (tx, mut rx) = mpsc::channel(256);

    let capture = CpalCapture::new(config.frame_ms);
    let output = CpalOutput::new(config.target_sample_rate, tx.clone());
    let transport = LoopbackTransport::new(wav_dir, config.target_sample_rate);

    let mut session = SessionCoordinator::new(config, capture, output, transport);
    session.start(tx.clone())?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
            cancel.cancel();
        });
    }

    tracing::info!("speak into the microphone; utterances echo back. Ctrl+C to stop.");
    session.run(&mut rx, cancel).await;
    Ok(())
}
