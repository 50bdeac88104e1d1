use thiserror::Error;

/// Error taxonomy for the pipeline.
///
/// Silence detection and hangover expiry are ordinary state transitions, not
/// errors; nothing in the per-frame path returns `Result`.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Capture device missing or permission denied. Fatal to `start()`,
    /// surfaced to the caller, never retried automatically.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Output device refused to start a playback. Non-fatal: logged, the
    /// playback simply does not occur.
    #[error("playback rejected: {0}")]
    PlaybackRejected(String),

    /// Transport refused an utterance send. Non-fatal: logged, the utterance
    /// is not buffered for retry.
    #[error("transport send failed: {0}")]
    TransportSend(String),
}
