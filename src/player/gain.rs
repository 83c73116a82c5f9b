//! Per-sample gain application and sample-type conversion for the
//! Mixer callback.
//!
//! A scalar multiply-and-clamp per sample; volume scaling is the only
//! DSP operation this crate performs, so there's no runtime-dispatched
//! SIMD pipeline to reach for.

/// Multiply `samples` in place by `gain`, clamping to `[-1.0, 1.0]`.
#[inline]
pub fn apply_gain_f32(samples: &mut [f32], gain: f32) {
    for sample in samples.iter_mut() {
        *sample = (*sample * gain).clamp(-1.0, 1.0);
    }
}

/// Apply `gain` and convert to i16, for backends that want integer
/// samples.
#[inline]
pub fn apply_gain_i16(input: &[f32], output: &mut [i16], gain: f32) {
    debug_assert_eq!(input.len(), output.len());
    let scale = gain * 32767.0;
    for (inp, out) in input.iter().zip(output.iter_mut()) {
        *out = (*inp * scale).clamp(-32768.0, 32767.0) as i16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_gain_f32_scales_and_clamps() {
        let mut samples = vec![0.5, -0.5, 1.0, -1.0];
        apply_gain_f32(&mut samples, 0.5);
        assert_eq!(samples, vec![0.25, -0.25, 0.5, -0.5]);
    }

    #[test]
    fn apply_gain_f32_clamps_out_of_range() {
        let mut samples = vec![0.9, -0.9];
        apply_gain_f32(&mut samples, 2.0);
        assert_eq!(samples, vec![1.0, -1.0]);
    }

    #[test]
    fn apply_gain_zero_mutes() {
        let mut samples = vec![0.5, -0.5, 1.0];
        apply_gain_f32(&mut samples, 0.0);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn apply_gain_i16_converts_and_clamps() {
        let input = vec![1.0, -1.0, 0.5, -0.5];
        let mut output = vec![0i16; input.len()];
        apply_gain_i16(&input, &mut output, 0.5);
        assert_eq!(output[0], 16383);
        assert_eq!(output[1], -16383);
        assert_eq!(output[2], 8191);
        assert_eq!(output[3], -8191);
    }
}
