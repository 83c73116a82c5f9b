//! Mixer: owns the cpal backend handle, runs the real-time audio
//! callback, and exposes play/pause/seek/volume/rate operations.
//!
//! Device selection and stream construction follow cpal's usual
//! pattern; the stream is rebuilt whenever `play` or
//! `change_sample_rate`/`restore_sample_rate` changes the output
//! configuration, rather than being fixed for the process's lifetime.

use std::path::Path;
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use parking_lot::Mutex;

use crate::error::EngineError;
use crate::player::decode_pump::DecodePump;
use crate::player::decoder::Decoder;
use crate::player::gain::{apply_gain_f32, apply_gain_i16};
use crate::player::ring_buffer::RingConsumer;
use crate::player::state::{MixerSharedState, PlaybackMode};

pub const MAX_VOLUME: f32 = 1.0;

pub struct Mixer {
    device: Device,
    stream: Option<Stream>,
    consumer: Arc<Mutex<RingConsumer>>,
    state: Arc<MixerSharedState>,
    decoder: Arc<Mutex<Option<Decoder>>>,
    device_sample_rate: u32,
    native_sample_rate: u32,
    channels: u16,
}

impl Mixer {
    /// Open the backend's default output device and enter IDLE. Does
    /// not yet start a stream — that happens on the first `play`.
    pub fn init(
        consumer: RingConsumer,
        state: Arc<MixerSharedState>,
        decoder: Arc<Mutex<Option<Decoder>>>,
    ) -> Result<Self, EngineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::Backend("no output device found".to_string()))?;

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        tracing::info!("using audio device: {}", device_name);

        let supported = device
            .default_output_config()
            .map_err(|e| EngineError::Backend(e.to_string()))?;

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();

        let mut mixer = Self {
            device,
            stream: None,
            consumer: Arc::new(Mutex::new(consumer)),
            state,
            decoder,
            device_sample_rate: sample_rate,
            native_sample_rate: sample_rate,
            channels,
        };

        mixer.reconfigure(sample_rate, channels, true)?;
        mixer.pause(true);

        Ok(mixer)
    }

    /// Stop the audio thread and close the backend. Safe to call even
    /// if no file was ever opened.
    pub fn destroy(&mut self) {
        self.state.set_mode(PlaybackMode::Idle);
        self.stream = None;
    }

    pub fn sample_rate(&self) -> u32 {
        self.device_sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Open `path`, reconfigure the device if its native format
    /// differs, and start playback. Runs the six-step sequence: pause,
    /// close, open, reconfigure, rescale, resume.
    ///
    /// Preserves whatever speed change is in effect: the ratio between
    /// the outgoing song's `device_sample_rate` and its own native rate
    /// is captured before the decoder is replaced, then reapplied on
    /// top of the new song's native rate, so a speed change survives a
    /// song change instead of silently resetting to 1.0x.
    pub fn play(&mut self, path: &Path, pump: &DecodePump) -> Result<(), EngineError> {
        self.pause(true);
        pump.stop();

        let speed_ratio = self.device_sample_rate as f64 / self.native_sample_rate as f64;

        {
            let mut guard = self.decoder.lock();
            *guard = None;
        }

        let new_decoder = Decoder::open(path)?;
        let source_rate = new_decoder.get_sample_rate();
        let source_channels = new_decoder.get_channels();
        let target_rate = ((source_rate as f64) * speed_ratio).round() as u32;

        if target_rate != self.device_sample_rate || source_channels != self.channels {
            self.reconfigure(target_rate, source_channels, false)?;
        }
        self.native_sample_rate = source_rate;

        {
            let mut guard = self.decoder.lock();
            let mut dec = new_decoder;
            dec.configure_output(self.device_sample_rate, self.channels);
            *guard = Some(dec);
        }

        self.consumer.lock().drain();
        self.state.set_song_end(false);
        self.state.set_current_time_ms(0);
        pump.start_decoding();
        self.pause(false);
        self.state.set_mode(PlaybackMode::Playing);

        Ok(())
    }

    /// Idempotent; suspends or resumes the callback.
    pub fn pause(&mut self, paused: bool) {
        let mode = if paused {
            PlaybackMode::Paused
        } else {
            PlaybackMode::Playing
        };
        if self.state.mode() == mode {
            return;
        }
        self.state.set_mode(mode);
    }

    pub fn toggle_pause(&mut self) {
        let paused = self.state.mode() == PlaybackMode::Paused;
        self.pause(!paused);
    }

    /// Forward an absolute-ms seek to the Decoder under its lock, then
    /// drain the Ring Buffer so stale samples never play.
    pub fn seek_ms(&mut self, absolute_ms: u64) -> Result<(), EngineError> {
        {
            let mut guard = self.decoder.lock();
            match guard.as_mut() {
                Some(dec) => dec.seek(absolute_ms).map_err(EngineError::from)?,
                None => return Err(EngineError::NoTrackLoaded),
            }
        }
        self.consumer.lock().drain();
        self.state.set_current_time_ms(absolute_ms);
        Ok(())
    }

    pub fn seek_off(&mut self, delta_ms: i64) -> Result<(), EngineError> {
        let total_ms = {
            let guard = self.decoder.lock();
            guard.as_ref().map(|d| d.get_total_ms()).unwrap_or(0)
        };
        let current = self.state.current_time_ms() as i64;
        let target = (current + delta_ms).clamp(0, total_ms as i64) as u64;
        self.seek_ms(target)
    }

    pub fn set_volume(&self, v: f32) {
        self.state.set_volume(v.clamp(0.0, MAX_VOLUME));
    }

    pub fn volume_up(&self, step: f32) {
        self.set_volume(self.state.volume() + step);
    }

    pub fn volume_down(&self, step: f32) {
        self.set_volume(self.state.volume() - step);
    }

    pub fn toggle_mute(&self) {
        self.state.set_muted(!self.state.muted());
    }

    /// Reconfigures the backend. `save = false` only changes the
    /// device's output rate (a speed change); `save = true` also
    /// updates what's considered "native" (used on song open).
    pub fn change_sample_rate(&mut self, rate: u32, save: bool) -> Result<(), EngineError> {
        self.reconfigure(rate, self.channels, save)
    }

    pub fn restore_sample_rate(&mut self) -> Result<(), EngineError> {
        self.reconfigure(self.native_sample_rate, self.channels, false)
    }

    fn reconfigure(&mut self, rate: u32, channels: u16, save: bool) -> Result<(), EngineError> {
        let was_playing = self.state.mode() == PlaybackMode::Playing;
        self.pause(true);
        self.stream = None;

        let config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let sample_format = self
            .device
            .default_output_config()
            .map_err(|e| EngineError::Backend(e.to_string()))?
            .sample_format();

        let stream = build_stream(
            &self.device,
            &config,
            sample_format,
            Arc::clone(&self.consumer),
            Arc::clone(&self.state),
        )?;
        stream.play().map_err(|e| EngineError::Backend(e.to_string()))?;

        self.stream = Some(stream);
        self.device_sample_rate = rate;
        self.channels = channels;
        if save {
            self.native_sample_rate = rate;
        }

        self.state.set_output_sample_rate(rate);
        self.state.set_channels(channels);

        if was_playing {
            self.pause(false);
        }

        Ok(())
    }
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    consumer: Arc<Mutex<RingConsumer>>,
    state: Arc<MixerSharedState>,
) -> Result<Stream, EngineError> {
    let channels = config.channels as usize;

    let result = match sample_format {
        SampleFormat::F32 => device.build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                run_callback_f32(data, channels, &consumer, &state)
            },
            |err| tracing::error!("audio stream error: {}", err),
            None,
        ),
        SampleFormat::I16 => device.build_output_stream(
            config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                run_callback_i16(data, channels, &consumer, &state)
            },
            |err| tracing::error!("audio stream error: {}", err),
            None,
        ),
        other => {
            return Err(EngineError::Backend(format!(
                "unsupported sample format: {:?}",
                other
            )));
        }
    };

    result.map_err(|e| EngineError::Backend(e.to_string()))
}

/// The real-time callback, f32 device variant. Touches only the Ring
/// Buffer and `MixerSharedState`'s atomics — never the decoder lock.
fn run_callback_f32(
    data: &mut [f32],
    channels: usize,
    consumer: &Arc<Mutex<RingConsumer>>,
    state: &Arc<MixerSharedState>,
) {
    if state.mode() == PlaybackMode::Paused {
        data.fill(0.0);
        return;
    }

    let gain = state.gain();

    {
        let mut rx = consumer.lock();
        rx.pop(data);
    }

    apply_gain_f32(data, gain);

    state.increment_callback_count();
    state.add_frames_played((data.len() / channels.max(1)) as u64);
    maybe_signal_song_end(consumer, state);
}

/// i16 device variant of the same contract.
fn run_callback_i16(
    data: &mut [i16],
    channels: usize,
    consumer: &Arc<Mutex<RingConsumer>>,
    state: &Arc<MixerSharedState>,
) {
    if state.mode() == PlaybackMode::Paused {
        data.fill(0);
        return;
    }

    let gain = state.gain();
    let mut scratch = vec![0f32; data.len()];

    {
        let mut rx = consumer.lock();
        rx.pop(&mut scratch);
    }

    apply_gain_i16(&scratch, data, gain);

    state.increment_callback_count();
    state.add_frames_played((data.len() / channels.max(1)) as u64);
    maybe_signal_song_end(consumer, state);
}

/// Once the Decode Pump has signalled DRAINING and the Ring Buffer is
/// actually empty, raise `song_end` and pause.
fn maybe_signal_song_end(consumer: &Arc<Mutex<RingConsumer>>, state: &Arc<MixerSharedState>) {
    use crate::player::state::DecodePumpState;

    if state.pump_state() == DecodePumpState::Draining
        && !state.song_end()
        && consumer.lock().available() == 0
    {
        state.set_song_end(true);
        state.set_mode(PlaybackMode::Paused);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_clamped_to_max() {
        let state = MixerSharedState::new();
        state.set_volume(5.0.min(MAX_VOLUME));
        assert!(state.volume() <= MAX_VOLUME);
    }

    #[test]
    fn gain_curve_matches_cube() {
        let state = MixerSharedState::new();
        state.set_volume(0.8);
        state.set_muted(false);
        let expected = 0.8_f32.powi(3);
        assert!((state.gain() - expected).abs() < 1e-6);
    }
}
