use crate::transport::ServerMessage;
use uuid::Uuid;

/// Everything the session coordinator consumes arrives on one channel as a
/// `SessionEvent`; handlers run to completion, so no locking is needed inside
/// the pipeline.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// One capture frame of normalized f32 samples at the capture rate.
    Frame(Vec<f32>),
    /// Inbound message from the transport collaborator.
    Transport(ServerMessage),
    /// The output device finished a playback unassisted.
    PlaybackEnded(Uuid),
}
