use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pipeline tunables.
///
/// Captured deployments disagree on the threshold/hangover pair (0.008 vs
/// 0.01 RMS, 400 vs 800ms) and on whether user speech interrupts playback,
/// so all three are configuration rather than constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum RMS for a frame to count as voice.
    pub energy_threshold: f32,
    /// How long a contiguous low-energy span may persist inside an utterance
    /// before it is considered ended.
    pub hangover_ms: u64,
    /// Sample rate utterances are encoded at. Setting this equal to the
    /// capture rate turns the resampler into an identity copy.
    pub target_sample_rate: u32,
    /// Capture pump frame duration.
    pub frame_ms: u64,
    /// Whether detected user speech interrupts in-flight playback.
    pub barge_in: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 0.01,
            hangover_ms: 500,
            target_sample_rate: 16000,
            frame_ms: 30,
            barge_in: true,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }
}
