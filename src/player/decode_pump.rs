//! Decode Pump: drives the Decoder under `decoder_mutex`, pushing
//! decoded samples into the Ring Buffer on a dedicated thread. Runs an
//! explicit `{IDLE, RUNNING, DRAINING, STOPPED}` state machine on a
//! plain `std::thread`, with `crossbeam_channel` carrying commands in.
//!
//! Reads the live output channel count from `MixerSharedState::channels`
//! on every chunk rather than trusting a value fixed at spawn time,
//! since `Mixer::reconfigure` can change the device's channel count
//! mid-run (a song whose native channel count differs from the
//! previous one). Also publishes the decoder's position after each
//! chunk it writes, since it already holds the decoder lock to do so.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::player::decoder::{Decoder, WriteStatus};
use crate::player::ring_buffer::RingProducer;
use crate::player::state::{DecodePumpState, MixerSharedState, PumpCommand};

/// Frames decoded per chunk while RUNNING.
const CHUNK_FRAMES: usize = 1024;

pub struct DecodePump {
    command_tx: Sender<PumpCommand>,
    thread: Option<JoinHandle<()>>,
}

impl DecodePump {
    /// Spawn the pump thread. `decoder` is the slot the Control Plane
    /// also opens/seeks/closes through; `producer` is this track's
    /// Ring Buffer producer half. The output channel count is read
    /// live from `state` on every chunk rather than fixed here, since
    /// `Mixer::reconfigure` can change it mid-run.
    pub fn spawn(
        decoder: Arc<Mutex<Option<Decoder>>>,
        producer: RingProducer,
        state: Arc<MixerSharedState>,
    ) -> Self {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();

        let thread = thread::Builder::new()
            .name("decode-pump".to_string())
            .spawn(move || pump_main(decoder, producer, command_rx, state))
            .expect("failed to spawn decode-pump thread");

        Self {
            command_tx,
            thread: Some(thread),
        }
    }

    pub fn start_decoding(&self) {
        let _ = self.command_tx.send(PumpCommand::StartDecoding);
    }

    pub fn stop(&self) {
        let _ = self.command_tx.send(PumpCommand::Stop);
    }

    /// Bounded-termination shutdown: signal the thread and join it.
    pub fn shutdown(&mut self) {
        let _ = self.command_tx.send(PumpCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DecodePump {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn pump_main(
    decoder: Arc<Mutex<Option<Decoder>>>,
    mut producer: RingProducer,
    command_rx: Receiver<PumpCommand>,
    state: Arc<MixerSharedState>,
) {
    let mut scratch = vec![0f32; CHUNK_FRAMES * state.channels().max(1) as usize];

    loop {
        let is_idle = matches!(
            state.pump_state(),
            DecodePumpState::Idle | DecodePumpState::Draining
        );

        let command = if is_idle {
            command_rx.recv().ok()
        } else {
            command_rx.try_recv().ok()
        };

        if let Some(command) = command {
            match command {
                PumpCommand::StartDecoding => state.set_pump_state(DecodePumpState::Running),
                PumpCommand::Stop => state.set_pump_state(DecodePumpState::Idle),
                PumpCommand::Shutdown => {
                    state.set_pump_state(DecodePumpState::Stopped);
                    return;
                }
            }
        }

        if state.pump_state() != DecodePumpState::Running {
            continue;
        }

        let output_channels = state.channels();
        let channels = output_channels.max(1) as usize;
        let needed = CHUNK_FRAMES * channels;
        if scratch.len() != needed {
            scratch.resize(needed, 0.0);
        }

        let free_samples = producer.free_space();
        let requested_frames = (free_samples / channels).min(CHUNK_FRAMES);

        if requested_frames == 0 {
            thread::sleep(Duration::from_millis(1));
            continue;
        }

        let (written, status, position_ms) = {
            let mut guard = decoder.lock();
            match guard.as_mut() {
                Some(dec) => {
                    let (written, status) =
                        dec.write_to_buffer(&mut scratch, requested_frames, output_channels);
                    (written, status, Some(dec.get_current_ms()))
                }
                None => (0, WriteStatus::EndOfFile, None),
            }
        };

        if let Some(ms) = position_ms {
            state.publish_decoder_position_ms(ms);
        }

        if written > 0 {
            producer.push(&scratch[..written]);
        }

        match status {
            WriteStatus::EndOfFile | WriteStatus::Error => {
                // Leaves the final chunk's samples in the Ring Buffer;
                // the Mixer callback raises `song_end` only once the
                // buffer it reads from is actually empty.
                state.set_pump_state(DecodePumpState::Draining);
            }
            WriteStatus::Ok => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::ring_buffer::ring_buffer;

    #[test]
    fn pump_starts_idle_and_shuts_down_promptly() {
        let decoder: Arc<Mutex<Option<Decoder>>> = Arc::new(Mutex::new(None));
        let (producer, _consumer) = ring_buffer(4096);
        let state = MixerSharedState::new();

        let mut pump = DecodePump::spawn(decoder, producer, state.clone());
        assert_eq!(state.pump_state(), DecodePumpState::Idle);
        pump.shutdown();
        assert_eq!(state.pump_state(), DecodePumpState::Stopped);
    }

    #[test]
    fn pump_transitions_to_draining_with_no_decoder() {
        let decoder: Arc<Mutex<Option<Decoder>>> = Arc::new(Mutex::new(None));
        let (producer, _consumer) = ring_buffer(4096);
        let state = MixerSharedState::new();

        let mut pump = DecodePump::spawn(decoder, producer, state.clone());
        pump.start_decoding();

        for _ in 0..100 {
            if state.pump_state() == DecodePumpState::Draining {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(state.pump_state(), DecodePumpState::Draining);
        pump.shutdown();
    }
}
