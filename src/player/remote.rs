//! Remote-Control Adapter: polls the OS media-control bus (MPRIS on
//! Linux, SMTC on Windows, MediaCenter on macOS) and translates events
//! into Control Plane commands.
//!
//! Runs souvlaki's `MediaControls` on a dedicated thread with a
//! `recv_timeout` poll loop (Windows HWND setup gated behind
//! `cfg(windows)`). Incoming events call straight into the
//! [`ControlPlane`] rather than through a second command channel — its
//! internal mutex already gives command ordering, so there's nothing
//! left for that extra hop to buy. `OpenUri` is ignored, `Rate` is
//! read-only, and `SetVolume` from the bus is ignored.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::Duration;

use souvlaki::{MediaControlEvent, MediaControls, MediaMetadata, MediaPlayback, PlatformConfig};

use crate::model::TrackMetadata;
use crate::player::control::ControlPlane;
use crate::player::state::PlaybackMode;

/// Snapshot pushed to the remote-control thread whenever the engine's
/// observable state changes.
#[derive(Debug, Clone)]
enum RemoteUpdate {
    Metadata {
        meta: TrackMetadata,
        length_ms: u64,
    },
    Playback(PlaybackMode),
    Position(Duration),
    Shutdown,
}

/// Handle owned by the `AudioEngine` façade; dropping it stops T-remote.
pub struct RemoteAdapter {
    update_tx: Sender<RemoteUpdate>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl RemoteAdapter {
    /// Spawn the adapter thread. Returns `None` only if the thread
    /// itself fails to spawn; if the platform bus is unavailable the
    /// adapter logs once and retries from inside `run_remote` instead,
    /// leaving playback unaffected.
    pub fn spawn(control: Arc<ControlPlane>) -> Option<Self> {
        let (update_tx, update_rx) = channel::<RemoteUpdate>();

        let thread = std::thread::Builder::new()
            .name("remote-control".into())
            .spawn(move || {
                if let Err(e) = run_remote(update_rx, control) {
                    tracing::warn!("remote-control adapter exiting: {}", e);
                }
            })
            .ok()?;

        Some(Self {
            update_tx,
            thread: Some(thread),
        })
    }

    pub fn notify_metadata(&self, meta: TrackMetadata, length_ms: u64) {
        let _ = self.update_tx.send(RemoteUpdate::Metadata { meta, length_ms });
    }

    pub fn notify_playback(&self, mode: PlaybackMode) {
        let _ = self.update_tx.send(RemoteUpdate::Playback(mode));
    }

    pub fn notify_position(&self, ms: u64) {
        let _ = self.update_tx.send(RemoteUpdate::Position(Duration::from_millis(ms)));
    }

    pub fn shutdown(&mut self) {
        let _ = self.update_tx.send(RemoteUpdate::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RemoteAdapter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(target_os = "windows")]
fn make_hwnd() -> Result<Option<*mut std::ffi::c_void>, String> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use std::ptr;

    unsafe {
        let h_instance = windows_sys::Win32::System::LibraryLoader::GetModuleHandleW(ptr::null());
        let class_name: Vec<u16> = OsStr::new("CrateRemoteControl")
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        let wc = windows_sys::Win32::UI::WindowsAndMessaging::WNDCLASSEXW {
            cbSize: std::mem::size_of::<windows_sys::Win32::UI::WindowsAndMessaging::WNDCLASSEXW>() as u32,
            style: 0,
            lpfnWndProc: Some(windows_sys::Win32::UI::WindowsAndMessaging::DefWindowProcW),
            cbClsExtra: 0,
            cbWndExtra: 0,
            hInstance: h_instance,
            hIcon: 0,
            hCursor: 0,
            hbrBackground: 0,
            lpszMenuName: ptr::null(),
            lpszClassName: class_name.as_ptr(),
            hIconSm: 0,
        };
        windows_sys::Win32::UI::WindowsAndMessaging::RegisterClassExW(&wc);

        let hwnd = windows_sys::Win32::UI::WindowsAndMessaging::CreateWindowExW(
            0,
            class_name.as_ptr(),
            class_name.as_ptr(),
            0,
            0, 0, 0, 0,
            0,
            0,
            h_instance,
            ptr::null(),
        );

        if hwnd == 0 {
            let error = windows_sys::Win32::Foundation::GetLastError();
            return Err(format!("failed to create window for media controls: {}", error));
        }
        Ok(Some(hwnd as *mut std::ffi::c_void))
    }
}

#[cfg(target_os = "windows")]
fn pump_windows_messages() {
    use std::mem::MaybeUninit;
    unsafe {
        let mut msg = MaybeUninit::uninit();
        while windows_sys::Win32::UI::WindowsAndMessaging::PeekMessageW(
            msg.as_mut_ptr(),
            0,
            0,
            0,
            windows_sys::Win32::UI::WindowsAndMessaging::PM_REMOVE,
        ) != 0
        {
            let msg = msg.assume_init_ref();
            windows_sys::Win32::UI::WindowsAndMessaging::TranslateMessage(msg);
            windows_sys::Win32::UI::WindowsAndMessaging::DispatchMessageW(msg);
        }
    }
}

fn run_remote(update_rx: Receiver<RemoteUpdate>, control: Arc<ControlPlane>) -> Result<(), String> {
    #[cfg(target_os = "windows")]
    let hwnd = make_hwnd()?;

    let config = PlatformConfig {
        dbus_name: "crate_player",
        display_name: "Crate Player",
        #[cfg(target_os = "windows")]
        hwnd,
    };

    let mut controls = MediaControls::new(config).map_err(|e| format!("{:?}", e))?;

    let event_control = Arc::clone(&control);
    controls
        .attach(move |event: MediaControlEvent| handle_event(event, &event_control))
        .map_err(|e| format!("{:?}", e))?;

    loop {
        #[cfg(target_os = "windows")]
        for _ in 0..5 {
            pump_windows_messages();
            std::thread::sleep(Duration::from_millis(2));
        }

        match update_rx.recv_timeout(Duration::from_millis(10)) {
            Ok(RemoteUpdate::Metadata { meta, length_ms }) => {
                let metadata = MediaMetadata {
                    title: meta.title.as_deref(),
                    artist: meta.artist.as_deref(),
                    album: meta.album.as_deref(),
                    duration: Some(Duration::from_millis(length_ms)),
                    cover_url: None,
                };
                if let Err(e) = controls.set_metadata(metadata) {
                    tracing::debug!("failed to set remote metadata: {:?}", e);
                }
            }
            Ok(RemoteUpdate::Playback(mode)) => {
                let playback = match mode {
                    PlaybackMode::Playing => MediaPlayback::Playing { progress: None },
                    PlaybackMode::Paused => MediaPlayback::Paused { progress: None },
                    PlaybackMode::Idle => MediaPlayback::Stopped,
                };
                if let Err(e) = controls.set_playback(playback) {
                    tracing::debug!("failed to set remote playback state: {:?}", e);
                }
            }
            Ok(RemoteUpdate::Position(_)) => {
                // souvlaki folds position into the playback state; the
                // next `Playback` update carries it.
            }
            Ok(RemoteUpdate::Shutdown) => break,
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

/// Translates one `MediaControlEvent` into a Control Plane call.
/// `Play`/`Pause` are idempotent against the current state since the
/// Control Plane only exposes `toggle_pause`.
fn handle_event(event: MediaControlEvent, control: &Arc<ControlPlane>) {
    let result = match event {
        MediaControlEvent::Play => {
            if control.get_playback_state() == PlaybackMode::Paused {
                control.toggle_pause()
            } else {
                Ok(())
            }
        }
        MediaControlEvent::Pause | MediaControlEvent::Stop => {
            if control.get_playback_state() == PlaybackMode::Playing {
                control.toggle_pause()
            } else {
                Ok(())
            }
        }
        MediaControlEvent::Toggle => control.toggle_pause(),
        MediaControlEvent::Next => control.next(),
        MediaControlEvent::Previous => control.prev(),
        MediaControlEvent::Seek(dir) => {
            let delta_ms = seek_step_ms(dir);
            control.seek_rel(delta_ms)
        }
        MediaControlEvent::SeekBy(dir, dur) => {
            let ms = dur.as_millis() as i64;
            control.seek_rel(if matches!(dir, souvlaki::SeekDirection::Forward) { ms } else { -ms })
        }
        MediaControlEvent::SetPosition(pos) => control.seek_abs(pos.0.as_millis() as u64),
        MediaControlEvent::SetVolume(_) => Ok(()), // ignored; not used by playerctl
        MediaControlEvent::OpenUri(_) => Ok(()),
        MediaControlEvent::Raise | MediaControlEvent::Quit => Ok(()),
    };

    if let Err(e) = result {
        tracing::debug!("remote command failed: {}", e);
    }
}

fn seek_step_ms(dir: souvlaki::SeekDirection) -> i64 {
    const STEP_MS: i64 = 5_000;
    match dir {
        souvlaki::SeekDirection::Forward => STEP_MS,
        souvlaki::SeekDirection::Backward => -STEP_MS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_step_has_opposite_signs() {
        assert!(seek_step_ms(souvlaki::SeekDirection::Forward) > 0);
        assert!(seek_step_ms(souvlaki::SeekDirection::Backward) < 0);
    }
}
