use crate::error::PipelineError;
use crate::event::SessionEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Inbound messages from the transport collaborator. The wire format beyond
/// this enum (framing, encoding, reconnection) is the collaborator's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Synthesized speech: audio payload, accompanying bot text, and whether
    /// this playback should interrupt a prior one.
    Speech {
        audio: Vec<u8>,
        text: String,
        interrupt: bool,
    },
    /// Live partial caption of the user's in-progress utterance. Overwrites,
    /// never accumulates.
    Caption { text: String },
    /// Connection status, surfaced as a boolean indicator.
    Status { connected: bool },
}

/// Duplex transport collaborator.
///
/// Subscription is an explicit pair: the coordinator subscribes on session
/// start and unsubscribes on stop, so delivery is scoped to a running
/// session rather than tied to object lifetime.
pub trait Transport {
    fn subscribe(&mut self, events: mpsc::Sender<SessionEvent>) -> Result<(), PipelineError>;

    fn unsubscribe(&mut self);

    /// One attempt per finalized utterance: `pcm` is the merged sample buffer
    /// as little-endian mono bytes. Failures are not buffered for retry.
    fn send_utterance(&mut self, pcm: Vec<u8>) -> Result<(), PipelineError>;
}
