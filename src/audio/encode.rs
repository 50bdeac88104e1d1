/// Convert normalized f32 samples to fixed-point 16-bit PCM.
///
/// Samples are clamped to [-1, 1]; negative values scale by 32768 and
/// non-negative by 32767 so neither direction exceeds the signed 16-bit
/// range. Out-of-range inputs are clamped, never rejected.
pub fn encode_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let s = s.clamp(-1.0, 1.0);
            if s < 0.0 {
                (s * 32768.0) as i16
            } else {
                (s * 32767.0) as i16
            }
        })
        .collect()
}

/// Merge ordered chunks into one contiguous buffer, preserving temporal
/// order. Total length equals the sum of the chunk lengths.
pub fn merge_chunks(chunks: Vec<Vec<i16>>) -> Vec<i16> {
    let total: usize = chunks.iter().map(Vec::len).sum();
    let mut merged = Vec::with_capacity(total);
    for chunk in chunks {
        merged.extend_from_slice(&chunk);
    }
    merged
}

/// Wire form: little-endian mono, 2 bytes per sample.
pub fn pcm_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}
