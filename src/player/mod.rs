//! The core audio engine: decoder façade, SPSC ring buffer, decode
//! pump, mixer, playlist controller, control plane, and an optional
//! OS remote-control adapter, assembled behind one [`AudioEngine`]
//! façade.
//!
//! # Architecture
//!
//! ```text
//! Decoder -> Decode Pump -> Ring Buffer -> Mixer callback -> device
//!                                               ^
//! UI / Remote-Control Adapter -> Control Plane -+-> Playlist Controller
//!                                               +-> Decoder
//! ```
//!
//! End-of-stream propagates Mixer -> Control Plane -> Playlist
//! Controller -> Decoder (opens next file) -> Decode Pump (resumes).

pub mod control;
pub mod decode_pump;
pub mod decoder;
pub mod gain;
pub mod mixer;
pub mod playlist;
pub mod remote;
pub mod resampler;
pub mod ring_buffer;
pub mod state;

pub use control::ControlPlane;
pub use decoder::Decoder;
pub use mixer::{MAX_VOLUME, Mixer};
pub use playlist::{Playlist, SongEndOutcome};
pub use remote::RemoteAdapter;
pub use state::{EngineEvent, MixerSharedState, PlaybackMode};

use std::sync::Arc;

use crossbeam_channel::{Receiver, unbounded};
use parking_lot::Mutex;

use crate::error::{Error, ResultExt};
use crate::model::{RenderSnapshot, Song};
use crate::player::decode_pump::DecodePump;
use crate::player::ring_buffer::ring_buffer;

/// ~0.5s of stereo audio at 48kHz — comfortably above the backend
/// callback's maximum burst size times a safety factor.
const RING_BUFFER_CAPACITY: usize = 48_000;

/// Owns every core component and wires them together. A UI front end
/// only ever touches `control()`, `tick()`, `poll_events()`, and
/// `render_snapshot()`.
pub struct AudioEngine {
    control: Arc<ControlPlane>,
    event_rx: Receiver<EngineEvent>,
    remote: Option<RemoteAdapter>,
}

impl AudioEngine {
    /// Opens the default output device, spawns the Decode Pump, and
    /// enters IDLE with `songs` as the playlist. Does not start
    /// playback.
    pub fn new(songs: Vec<Song>) -> Result<Self, Error> {
        let state = MixerSharedState::new();
        let (producer, consumer) = ring_buffer(RING_BUFFER_CAPACITY);
        let decoder_slot: Arc<Mutex<Option<Decoder>>> = Arc::new(Mutex::new(None));

        let mixer = Mixer::init(consumer, Arc::clone(&state), Arc::clone(&decoder_slot))
            .map_err(Error::from)
            .with_context("opening audio backend")?;

        let pump = DecodePump::spawn(Arc::clone(&decoder_slot), producer, Arc::clone(&state));

        let playlist = Playlist::new(songs);
        let (event_tx, event_rx) = unbounded();
        let control = Arc::new(ControlPlane::new(
            mixer,
            pump,
            playlist,
            decoder_slot,
            state,
            event_tx,
        ));

        let remote = RemoteAdapter::spawn(Arc::clone(&control));
        if remote.is_none() {
            tracing::warn!("remote-control adapter unavailable on this platform");
        }

        Ok(Self {
            control,
            event_rx,
            remote,
        })
    }

    pub fn control(&self) -> &Arc<ControlPlane> {
        &self.control
    }

    /// Drains end-of-stream handling and pushes fresh state to the
    /// remote-control adapter. Call once per T-ui tick.
    pub fn tick(&self) -> Result<(), Error> {
        self.control.poll_song_end()?;

        if let Some(remote) = &self.remote {
            remote.notify_playback(self.control.get_playback_state());
            remote.notify_position(self.control.get_current_ms());
        }

        Ok(())
    }

    /// Drains queued [`EngineEvent`]s, forwarding metadata changes to
    /// the remote-control adapter along the way.
    pub fn poll_events(&self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            if matches!(event, EngineEvent::MetadataChanged) {
                if let Some(remote) = &self.remote {
                    let meta = self.control.get_metadata_snapshot();
                    remote.notify_metadata(meta, self.control.get_total_ms());
                }
            }
            events.push(event);
        }
        events
    }

    pub fn quit_requested(&self) -> bool {
        self.control.quit_requested()
    }

    /// Builds the read model a UI backend renders from.
    pub fn render_snapshot(&self) -> RenderSnapshot {
        let total_ms = self.control.get_total_ms().max(1);
        let current_ms = self.control.get_current_ms();
        let progress = (current_ms as f32 / total_ms as f32).clamp(0.0, 1.0);

        let filter_names = self.control.with_playlist(|playlist| {
            playlist
                .filter_indices()
                .iter()
                .map(|&i| playlist.songs()[i].display_name.clone())
                .collect()
        });

        RenderSnapshot {
            metadata: self.control.get_metadata_snapshot(),
            focused_index: self.control.get_focused_index(),
            selected_index: self.control.get_selected_index(),
            filter_names,
            progress,
            volume: self.control.get_volume(),
            muted: self.control.get_muted(),
            repeat_mode: self.control.get_repeat_mode(),
            cover: self.control.get_cover_image(),
        }
    }
}

/// List available audio output devices, for `--mixer`/config UIs.
pub fn list_audio_devices() -> Vec<String> {
    use cpal::traits::{DeviceTrait, HostTrait};
    let host = cpal::default_host();
    host.output_devices()
        .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
        .unwrap_or_default()
}

/// Name of the default output device.
pub fn current_audio_device() -> String {
    use cpal::traits::{DeviceTrait, HostTrait};
    let host = cpal::default_host();
    host.default_output_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
