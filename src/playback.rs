use crate::error::PipelineError;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Output device collaborator. `play` may be refused (no permission, device
/// busy); `stop` must be safe to call for an already-finished id.
pub trait OutputDevice {
    fn play(&mut self, id: Uuid, payload: &[u8]) -> Result<(), PipelineError>;

    fn stop(&mut self, id: Uuid);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Ended,
}

/// One outstanding synthesized-speech playback.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub id: Uuid,
    pub interruptible: bool,
}

/// Owns at most one tracked playback and its interruption policy.
///
/// The identity check in `on_natural_end` is the substitute for a race
/// guard: end notifications from an already-superseded session carry a stale
/// id and are ignored.
pub struct PlaybackController<O: OutputDevice> {
    device: O,
    current: Option<PlaybackSession>,
}

impl<O: OutputDevice> PlaybackController<O> {
    pub fn new(device: O) -> Self {
        Self {
            device,
            current: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        match self.current {
            Some(_) => PlaybackState::Playing,
            None => PlaybackState::Idle,
        }
    }

    pub fn current_id(&self) -> Option<Uuid> {
        self.current.as_ref().map(|s| s.id)
    }

    /// Start a new playback. With `interrupt_prior`, a Playing session is
    /// forced to Ended (device stopped, tracking dropped) before the new one
    /// starts; without it, the prior device playback is left untouched and
    /// only the tracking reference moves to the new session.
    ///
    /// A device refusal is non-fatal: logged, nothing tracked, no retry.
    pub fn start_playback(&mut self, payload: &[u8], interrupt_prior: bool, interruptible: bool) {
        if interrupt_prior {
            if let Some(prior) = self.current.take() {
                info!("interrupting playback {}", prior.id);
                self.device.stop(prior.id);
            }
        }

        let session = PlaybackSession {
            id: Uuid::new_v4(),
            interruptible,
        };

        match self.device.play(session.id, payload) {
            Ok(()) => {
                info!("playback {} started ({} bytes)", session.id, payload.len());
                self.current = Some(session);
            }
            Err(e) => {
                warn!("playback rejected: {}", e);
            }
        }
    }

    /// Barge-in: user speech ends bot speech. Called on the Idle -> Speaking
    /// edge of the segmenter.
    pub fn on_speech_detected(&mut self) {
        let Some(session) = self.current.as_ref() else {
            return;
        };
        if !session.interruptible {
            return;
        }
        let id = session.id;
        info!("barge-in, stopping playback {}", id);
        self.device.stop(id);
        self.current = None;
    }

    /// The device reports a playback finished unassisted. Only the tracked
    /// session clears state; anything else is a stale callback.
    pub fn on_natural_end(&mut self, id: Uuid) {
        match self.current.as_ref() {
            Some(session) if session.id == id => {
                debug!("playback {} ended", id);
                self.current = None;
            }
            _ => {
                debug!("ignoring stale playback end for {}", id);
            }
        }
    }
}
