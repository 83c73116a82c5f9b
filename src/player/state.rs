//! Shared atomic state for the Mixer's real-time callback and the
//! Decode Pump.
//!
//! Lock-free volume/position/underrun tracking via atomics so the cpal
//! callback never blocks (`mode`, `volume`, `muted`, `song_end`,
//! `rate_update_requested`), plus the Decode Pump's own
//! `{IDLE, RUNNING, DRAINING, STOPPED}` state machine.
//!
//! `current_time_ms` is itself derived from two atomics rather than
//! stored directly: T-decode publishes its last known position
//! (`decoder_position_ms`) once per chunk it writes, already holding
//! the decoder lock for that write; T-audio never touches the decoder
//! at all, and instead advances `frames_since_decoder_update` by
//! however many frames it played this callback. The two combine via
//! the known output rate, so the RT callback's position tracking never
//! takes a lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Mixer playback mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    Idle,
    Playing,
    Paused,
}

impl PlaybackMode {
    fn to_u32(self) -> u32 {
        match self {
            PlaybackMode::Idle => 0,
            PlaybackMode::Playing => 1,
            PlaybackMode::Paused => 2,
        }
    }

    fn from_u32(v: u32) -> Self {
        match v {
            1 => PlaybackMode::Playing,
            2 => PlaybackMode::Paused,
            _ => PlaybackMode::Idle,
        }
    }
}

/// Decode Pump state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePumpState {
    #[default]
    Idle,
    Running,
    Draining,
    Stopped,
}

impl DecodePumpState {
    fn to_u32(self) -> u32 {
        match self {
            DecodePumpState::Idle => 0,
            DecodePumpState::Running => 1,
            DecodePumpState::Draining => 2,
            DecodePumpState::Stopped => 3,
        }
    }

    fn from_u32(v: u32) -> Self {
        match v {
            1 => DecodePumpState::Running,
            2 => DecodePumpState::Draining,
            3 => DecodePumpState::Stopped,
            _ => DecodePumpState::Idle,
        }
    }
}

/// The atomics the Mixer callback (T-audio) and Decode Pump (T-decode)
/// share with the rest of the engine. No field here is ever guarded by
/// a lock the RT callback could contend on.
#[derive(Debug)]
pub struct MixerSharedState {
    mode: AtomicU32,
    volume_bits: AtomicU32,
    muted: AtomicBool,
    decoder_position_ms: AtomicU64,
    frames_since_decoder_update: AtomicU64,
    output_sample_rate: AtomicU32,
    channels: AtomicU32,
    song_end: AtomicBool,
    rate_update_requested: AtomicBool,
    pump_state: AtomicU32,
    underruns: AtomicU32,
    callback_count: AtomicU64,
}

impl Default for MixerSharedState {
    fn default() -> Self {
        Self {
            mode: AtomicU32::new(PlaybackMode::Idle.to_u32()),
            volume_bits: AtomicU32::new(1.0_f32.to_bits()),
            muted: AtomicBool::new(false),
            decoder_position_ms: AtomicU64::new(0),
            frames_since_decoder_update: AtomicU64::new(0),
            output_sample_rate: AtomicU32::new(44_100),
            channels: AtomicU32::new(2),
            song_end: AtomicBool::new(false),
            rate_update_requested: AtomicBool::new(false),
            pump_state: AtomicU32::new(DecodePumpState::Idle.to_u32()),
            underruns: AtomicU32::new(0),
            callback_count: AtomicU64::new(0),
        }
    }
}

impl MixerSharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[inline]
    pub fn mode(&self) -> PlaybackMode {
        PlaybackMode::from_u32(self.mode.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_mode(&self, mode: PlaybackMode) {
        self.mode.store(mode.to_u32(), Ordering::Release);
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set_volume(&self, volume: f32) {
        self.volume_bits
            .store(volume.max(0.0).to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    /// The perceptual gain curve applied inside the callback: `0` when
    /// muted, else `volume^3`.
    #[inline]
    pub fn gain(&self) -> f32 {
        if self.muted() {
            0.0
        } else {
            let v = self.volume();
            v * v * v
        }
    }

    /// The playback clock: the last position T-decode published, plus
    /// however many frames T-audio has played since that publish,
    /// converted through the current output rate. Never locks.
    #[inline]
    pub fn current_time_ms(&self) -> u64 {
        let base_ms = self.decoder_position_ms.load(Ordering::Relaxed);
        let frames = self.frames_since_decoder_update.load(Ordering::Relaxed);
        let rate = self.output_sample_rate.load(Ordering::Relaxed).max(1) as u64;
        base_ms + (frames * 1000) / rate
    }

    /// Pins the clock to an exact position, discarding any frames
    /// counted since the last decoder publish. Used on seek and on
    /// opening a new song, where the position is known exactly rather
    /// than derived.
    #[inline]
    pub fn set_current_time_ms(&self, ms: u64) {
        self.decoder_position_ms.store(ms, Ordering::Relaxed);
        self.frames_since_decoder_update.store(0, Ordering::Relaxed);
    }

    /// Called from T-decode after writing a chunk: publishes the
    /// decoder's own notion of its position and resets the RT frame
    /// counter that measures drift since this publish.
    #[inline]
    pub fn publish_decoder_position_ms(&self, ms: u64) {
        self.frames_since_decoder_update.store(0, Ordering::Relaxed);
        self.decoder_position_ms.store(ms, Ordering::Relaxed);
    }

    /// Called from the RT callback once per buffer with the number of
    /// frames it just played.
    #[inline]
    pub fn add_frames_played(&self, frames: u64) {
        self.frames_since_decoder_update
            .fetch_add(frames, Ordering::Relaxed);
    }

    #[inline]
    pub fn output_sample_rate(&self) -> u32 {
        self.output_sample_rate.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_output_sample_rate(&self, rate: u32) {
        self.output_sample_rate.store(rate, Ordering::Relaxed);
    }

    /// The device channel count the Decode Pump should request from
    /// the Decoder. Updated by `Mixer::reconfigure` whenever the output
    /// stream's channel count changes, read by the pump thread on its
    /// own schedule rather than being fixed at spawn time.
    #[inline]
    pub fn channels(&self) -> u16 {
        self.channels.load(Ordering::Acquire) as u16
    }

    #[inline]
    pub fn set_channels(&self, channels: u16) {
        self.channels.store(channels as u32, Ordering::Release);
    }

    #[inline]
    pub fn song_end(&self) -> bool {
        self.song_end.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_song_end(&self, v: bool) {
        self.song_end.store(v, Ordering::Release);
    }

    #[inline]
    pub fn rate_update_requested(&self) -> bool {
        self.rate_update_requested.load(Ordering::Acquire)
    }

    #[inline]
    pub fn request_rate_update(&self) {
        self.rate_update_requested.store(true, Ordering::Release);
    }

    #[inline]
    pub fn clear_rate_update_request(&self) {
        self.rate_update_requested.store(false, Ordering::Release);
    }

    #[inline]
    pub fn pump_state(&self) -> DecodePumpState {
        DecodePumpState::from_u32(self.pump_state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_pump_state(&self, state: DecodePumpState) {
        self.pump_state.store(state.to_u32(), Ordering::Release);
    }

    #[inline]
    pub fn increment_underruns(&self) -> u32 {
        self.underruns.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    pub fn underruns(&self) -> u32 {
        self.underruns.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn increment_callback_count(&self) {
        self.callback_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn callback_count(&self) -> u64 {
        self.callback_count.load(Ordering::Relaxed)
    }
}

/// Commands accepted by the Decode Pump thread.
#[derive(Debug, Clone)]
pub enum PumpCommand {
    /// Begin decoding `path` from the start.
    StartDecoding,
    /// Stop decoding and return to IDLE, discarding any buffered audio.
    Stop,
    /// Shut the pump thread down entirely, guaranteed to terminate.
    Shutdown,
}

/// Per-event notifications fired on state change, consumed by the
/// Remote-Control Adapter and the TUI.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    PlaybackStatusChanged(PlaybackMode),
    MetadataChanged,
    VolumeChanged(f32),
    LoopStatusChanged,
    Seeked(u64),
    /// A command failed without a caller waiting on its result directly
    /// (currently: auto-advance after a song fails to open). Carries a
    /// human-readable message for a transient on-screen notice.
    PlaybackError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_idle() {
        let state = MixerSharedState::default();
        assert_eq!(state.mode(), PlaybackMode::Idle);
    }

    #[test]
    fn gain_is_zero_when_muted() {
        let state = MixerSharedState::default();
        state.set_volume(1.0);
        state.set_muted(true);
        assert_eq!(state.gain(), 0.0);
    }

    #[test]
    fn gain_is_volume_cubed_when_unmuted() {
        let state = MixerSharedState::default();
        state.set_volume(0.5);
        state.set_muted(false);
        assert!((state.gain() - 0.125).abs() < 1e-6);
    }

    #[test]
    fn toggle_mute_twice_is_a_noop_on_observable_state() {
        let state = MixerSharedState::default();
        state.set_muted(false);
        state.set_muted(!state.muted());
        state.set_muted(!state.muted());
        assert!(!state.muted());
    }

    #[test]
    fn pump_state_round_trips() {
        let state = MixerSharedState::default();
        state.set_pump_state(DecodePumpState::Running);
        assert_eq!(state.pump_state(), DecodePumpState::Running);
        state.set_pump_state(DecodePumpState::Draining);
        assert_eq!(state.pump_state(), DecodePumpState::Draining);
    }

    #[test]
    fn underrun_counter_accumulates() {
        let state = MixerSharedState::default();
        state.increment_underruns();
        state.increment_underruns();
        assert_eq!(state.underruns(), 2);
    }
}
