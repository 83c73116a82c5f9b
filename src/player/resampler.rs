//! Sample-rate conversion used internally by the Decoder to adapt
//! native audio to the requested output rate.
//!
//! Wraps rubato's `FftFixedIn`. Passthrough (no-op) when the requested
//! rate matches the source rate.

use rubato::{FftFixedIn, Resampler as RubatoResampler};

pub struct Resampler {
    resampler: Option<FftFixedIn<f32>>,
    input_rate: u32,
    output_rate: u32,
    channels: usize,
    input_buffer: Vec<Vec<f32>>,
    chunk_size: usize,
}

impl Resampler {
    /// Build a resampler converting `channels`-channel interleaved
    /// audio from `input_rate` to `output_rate`. `input_rate ==
    /// output_rate` builds a passthrough.
    pub fn new(input_rate: u32, output_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1) as usize;

        if input_rate == output_rate {
            return Self {
                resampler: None,
                input_rate,
                output_rate,
                channels,
                input_buffer: vec![Vec::new(); channels],
                chunk_size: 0,
            };
        }

        let chunk_size = 1024;
        let resampler = FftFixedIn::<f32>::new(
            input_rate as usize,
            output_rate as usize,
            chunk_size,
            2,
            channels,
        )
        .expect("failed to construct resampler");

        tracing::debug!(
            "resampler: {}Hz -> {}Hz ({} channels)",
            input_rate,
            output_rate,
            channels
        );

        Self {
            resampler: Some(resampler),
            input_rate,
            output_rate,
            channels,
            input_buffer: vec![Vec::new(); channels],
            chunk_size,
        }
    }

    pub fn needs_resampling(&self) -> bool {
        self.resampler.is_some()
    }

    pub fn ratio(&self) -> f64 {
        self.output_rate as f64 / self.input_rate as f64
    }

    /// Process interleaved input samples, returning resampled
    /// interleaved output. May return fewer frames than a 1:1 mapping
    /// would suggest while input accumulates toward a full chunk.
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        let Some(ref mut resampler) = self.resampler else {
            return input.to_vec();
        };

        for (i, sample) in input.iter().enumerate() {
            let channel = i % self.channels;
            self.input_buffer[channel].push(*sample);
        }

        let mut output = Vec::new();

        while self.input_buffer[0].len() >= self.chunk_size {
            let mut input_chunks: Vec<Vec<f32>> = Vec::with_capacity(self.channels);
            for ch_buf in &mut self.input_buffer {
                let chunk: Vec<f32> = ch_buf.drain(..self.chunk_size).collect();
                input_chunks.push(chunk);
            }

            match resampler.process(&input_chunks, None) {
                Ok(resampled) => {
                    if !resampled.is_empty() && !resampled[0].is_empty() {
                        let frames = resampled[0].len();
                        for frame in 0..frames {
                            for ch in &resampled {
                                output.push(ch[frame]);
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("resampling error: {}", e);
                }
            }
        }

        output
    }

    /// Flush remaining buffered samples at end of stream.
    pub fn flush(&mut self) -> Vec<f32> {
        let Some(ref mut resampler) = self.resampler else {
            return Vec::new();
        };

        let remaining = self.input_buffer[0].len();
        if remaining == 0 {
            return Vec::new();
        }

        let pad_needed = self.chunk_size - remaining;
        for ch_buf in &mut self.input_buffer {
            ch_buf.extend(std::iter::repeat_n(0.0, pad_needed));
        }

        let input_chunks: Vec<Vec<f32>> = self.input_buffer.drain(..).collect();
        self.input_buffer = vec![Vec::new(); self.channels];

        let mut output = Vec::new();
        match resampler.process(&input_chunks, None) {
            Ok(resampled) => {
                if !resampled.is_empty() && !resampled[0].is_empty() {
                    let expected_frames = (remaining as f64 * self.ratio()).ceil() as usize;
                    let frames = resampled[0].len().min(expected_frames);
                    for frame in 0..frames {
                        for ch in &resampled {
                            output.push(ch[frame]);
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!("resampling flush error: {}", e);
            }
        }

        output
    }

    /// Reset internal state. Call this after a seek.
    pub fn reset(&mut self) {
        for ch_buf in &mut self.input_buffer {
            ch_buf.clear();
        }
        if let Some(ref mut resampler) = self.resampler {
            resampler.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_resampling_when_rates_match() {
        let resampler = Resampler::new(48000, 48000, 2);
        assert!(!resampler.needs_resampling());
    }

    #[test]
    fn resampling_needed_when_rates_differ() {
        let resampler = Resampler::new(44100, 48000, 2);
        assert!(resampler.needs_resampling());
    }

    #[test]
    fn ratio_calculation() {
        let resampler = Resampler::new(44100, 48000, 2);
        let ratio = resampler.ratio();
        assert!((ratio - 48000.0 / 44100.0).abs() < 0.0001);
    }

    #[test]
    fn passthrough_when_no_resampling() {
        let mut resampler = Resampler::new(48000, 48000, 2);
        let input = vec![0.1, 0.2, 0.3, 0.4];
        let output = resampler.process(&input);
        assert_eq!(input, output);
    }
}
