/// Linear decimation resampler.
///
/// Output sample `i` is the arithmetic mean of the input samples in index
/// range `[floor(i*ratio), floor((i+1)*ratio))`, which acts as a crude
/// anti-aliasing low-pass for the common downsampling case. When the range is
/// empty we fall back to the nearest single input sample (0.0 out of bounds).
///
/// Upsampling is not a supported use: with `out_rate > src_rate` the windows
/// degenerate to picking the single overlapping sample per output index (no
/// interpolation). Accepted limitation.
pub fn resample(input: &[f32], src_rate: u32, out_rate: u32) -> Vec<f32> {
    if src_rate == out_rate {
        return input.to_vec();
    }

    let ratio = src_rate as f64 / out_rate as f64;
    let out_len = (input.len() as u64 * out_rate as u64 / src_rate as u64) as usize;

    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let start = (i as f64 * ratio).floor() as usize;
        let end = (((i + 1) as f64) * ratio).floor() as usize;
        let end = end.min(input.len());

        if start < end {
            let sum: f32 = input[start..end].iter().sum();
            out.push(sum / (end - start) as f32);
        } else {
            out.push(input.get(start).copied().unwrap_or(0.0));
        }
    }
    out
}
