/// Root-mean-square loudness of a frame. The sole voice-activity signal.
///
/// Intentionally coarse: sensitive to background noise, monotonic in raw
/// gain, no notion of pitch or harmonicity. The tradeoff buys near-zero cost
/// and no model dependency.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sq_sum: f32 = samples.iter().map(|&x| x * x).sum();
    (sq_sum / samples.len() as f32).sqrt()
}
