use crate::audio::encode;
use tracing::{debug, info};

/// Energy-based VAD segmenter. Signal analysis only, no recognition.
///
/// A fixed RMS threshold plus a hangover timer approximates endpoint
/// detection: false positives on loud background noise and false negatives on
/// soft speech are the accepted cost of near-zero compute and no model
/// dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    Idle,
    Speaking,
}

/// Transition outputs of a single frame push.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentEvent {
    /// Idle -> Speaking edge. The barge-in hook.
    SpeechStart,
    /// Hangover expired: one finalized, non-empty utterance buffer.
    Utterance(Vec<i16>),
}

#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    pub energy_threshold: f32,
    pub hangover_ms: u64,
}

pub struct Segmenter {
    config: SegmenterConfig,
    state: SegmenterState,
    // Exactly one candidate utterance at a time, by construction.
    chunks: Vec<Vec<i16>>,
    // Valid only while Speaking and inside the hangover window.
    silence_started_ms: Option<u64>,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            state: SegmenterState::Idle,
            chunks: Vec::new(),
            silence_started_ms: None,
        }
    }

    pub fn state(&self) -> SegmenterState {
        self.state
    }

    /// Feed one frame: its encoded samples, its RMS energy, and a
    /// monotonically increasing timestamp in ms.
    pub fn push(&mut self, encoded: &[i16], energy: f32, now_ms: u64) -> Option<SegmentEvent> {
        let voiced = energy > self.config.energy_threshold;

        match self.state {
            SegmenterState::Idle => {
                if !voiced {
                    return None;
                }
                self.state = SegmenterState::Speaking;
                self.silence_started_ms = None;
                self.chunks.push(encoded.to_vec());
                info!("speech start (rms {:.4})", energy);
                Some(SegmentEvent::SpeechStart)
            }
            SegmenterState::Speaking => {
                if voiced {
                    // Voice resumed: silence timer back to "not started".
                    self.silence_started_ms = None;
                    self.chunks.push(encoded.to_vec());
                    return None;
                }

                // Silence is not part of the transmitted utterance.
                match self.silence_started_ms {
                    None => {
                        self.silence_started_ms = Some(now_ms);
                        None
                    }
                    Some(started) => {
                        if now_ms.saturating_sub(started) >= self.config.hangover_ms {
                            self.finalize()
                        } else {
                            None
                        }
                    }
                }
            }
        }
    }

    /// Discard any partially accumulated utterance and return to Idle.
    /// The stop path: partial unfinalized speech is never worth transmitting.
    pub fn reset(&mut self) {
        if !self.chunks.is_empty() {
            debug!("discarding partial segment ({} chunks)", self.chunks.len());
        }
        self.state = SegmenterState::Idle;
        self.chunks.clear();
        self.silence_started_ms = None;
    }

    fn finalize(&mut self) -> Option<SegmentEvent> {
        self.state = SegmenterState::Idle;
        self.silence_started_ms = None;
        let chunks = std::mem::take(&mut self.chunks);

        let total: usize = chunks.iter().map(Vec::len).sum();
        if total == 0 {
            // Hangover fired before any voiced samples accumulated. Guard:
            // zero-length segments are never transmitted.
            debug!("empty segment discarded");
            return None;
        }

        let merged = encode::merge_chunks(chunks);
        info!("speech end, utterance of {} samples", merged.len());
        Some(SegmentEvent::Utterance(merged))
    }
}
