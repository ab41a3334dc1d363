//! User-space X11 global hotkey grabber.
//!
//! Falls back from [`super::evdev_listener::EvdevListener`] when the
//! process can't open `/dev/input/*` directly (not in the `input` group,
//! or evdev otherwise unavailable) but an X server is reachable. Uses
//! `XGrabKey` on the root window, which requires no special permissions
//! beyond an X11 connection, at the cost of only working under Xorg (or
//! XWayland's root window, which most Wayland compositors don't route
//! global input through — hence this being the fallback, not the default).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    ConnectionExt as _, GrabMode, Keycode, Keysym, ModMask,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use super::{HotkeyEvent, HotkeyListener, HotkeySpec};
use crate::error::HotkeyError;

/// The modifier bits this grabber understands. Mod1 is conventionally
/// Alt and Mod4 is conventionally Super on most Linux X11 setups; a
/// desktop that remaps them would need a different mask, which is a
/// known rough edge of this fallback path.
fn modifier_mask(name: &str) -> Option<u16> {
    match name {
        "ctrl" => Some(ModMask::CONTROL.into()),
        "shift" => Some(ModMask::SHIFT.into()),
        "alt" => Some(ModMask::M1.into()),
        "super" => Some(ModMask::M4.into()),
        _ => None,
    }
}

/// Lock-key combinations XGrabKey also needs to be grabbed with, to match
/// the target combo regardless of which lock/numlock state the user is in.
fn ignored_locks() -> [u16; 4] {
    let lock: u16 = ModMask::LOCK.into();
    let num_lock: u16 = ModMask::M2.into();
    [0, lock, num_lock, lock | num_lock]
}

struct Target {
    keysym: Keysym,
    mod_mask: u16,
}

pub struct X11Listener {
    target: Arc<Mutex<Target>>,
    paused: Arc<AtomicBool>,
    stop_signal: Option<oneshot::Sender<()>>,
    regrab_signal: Option<std::sync::mpsc::Sender<()>>,
}

impl X11Listener {
    pub fn new(hotkey: &str) -> Result<Self, HotkeyError> {
        let target = parse_target(hotkey)?;
        // Confirm an X connection is actually reachable before committing
        // to this backend.
        RustConnection::connect(None).map_err(|e| HotkeyError::X11(e.to_string()))?;

        Ok(Self {
            target: Arc::new(Mutex::new(target)),
            paused: Arc::new(AtomicBool::new(false)),
            stop_signal: None,
            regrab_signal: None,
        })
    }
}

#[async_trait::async_trait]
impl HotkeyListener for X11Listener {
    async fn start(&mut self) -> Result<mpsc::Receiver<HotkeyEvent>, HotkeyError> {
        let (tx, rx) = mpsc::channel(32);
        let (stop_tx, stop_rx) = oneshot::channel();
        let (regrab_tx, regrab_rx) = std::sync::mpsc::channel();
        self.stop_signal = Some(stop_tx);
        self.regrab_signal = Some(regrab_tx);

        let target = self.target.clone();
        let paused = self.paused.clone();

        tokio::task::spawn_blocking(move || {
            if let Err(e) = x11_listener_loop(target, paused, tx, stop_rx, regrab_rx) {
                tracing::error!("X11 hotkey listener failed: {}", e);
            }
        });

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), HotkeyError> {
        if let Some(stop) = self.stop_signal.take() {
            let _ = stop.send(());
        }
        Ok(())
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn update_hotkey(&self, new: &str) -> Result<(), HotkeyError> {
        let new_target = parse_target(new)?;
        *self.target.lock().unwrap() = new_target;
        if let Some(tx) = &self.regrab_signal {
            let _ = tx.send(());
        }
        Ok(())
    }
}

fn parse_target(hotkey: &str) -> Result<Target, HotkeyError> {
    let spec = HotkeySpec::parse(hotkey)?;
    let keysym = key_name_to_keysym(&spec.key)?;
    let mut mod_mask: u16 = 0;
    for m in &spec.modifiers {
        let bits = modifier_mask(m)
            .ok_or_else(|| HotkeyError::InvalidSpec(format!("unknown modifier '{}'", m)))?;
        mod_mask |= bits;
    }
    Ok(Target { keysym, mod_mask })
}

/// Re-grab the target key after the connection is (re)established or the
/// hotkey changes: release any prior grab, then grab the new combo across
/// every lock-state variant so Caps/Num Lock doesn't break matching.
fn grab(
    conn: &RustConnection,
    root: x11rb::protocol::xproto::Window,
    keycode: Keycode,
    mod_mask: u16,
) -> Result<(), HotkeyError> {
    for lock in ignored_locks() {
        conn.grab_key(
            true,
            root,
            mod_mask | lock,
            keycode,
            GrabMode::ASYNC,
            GrabMode::ASYNC,
        )
        .map_err(|e| HotkeyError::X11(e.to_string()))?;
    }
    conn.flush().map_err(|e| HotkeyError::X11(e.to_string()))?;
    Ok(())
}

fn ungrab_all(conn: &RustConnection, root: x11rb::protocol::xproto::Window) {
    let _ = conn.ungrab_key(0, root, ModMask::ANY);
    let _ = conn.flush();
}

fn x11_listener_loop(
    target: Arc<Mutex<Target>>,
    paused: Arc<AtomicBool>,
    tx: mpsc::Sender<HotkeyEvent>,
    mut stop_rx: oneshot::Receiver<()>,
    regrab_rx: std::sync::mpsc::Receiver<()>,
) -> Result<(), HotkeyError> {
    let (conn, screen_num) =
        RustConnection::connect(None).map_err(|e| HotkeyError::X11(e.to_string()))?;
    let screen = &conn.setup().roots[screen_num];
    let root = screen.root;

    let mut current_keycode = keysym_to_keycode(&conn, target.lock().unwrap().keysym)?;
    grab(&conn, root, current_keycode, target.lock().unwrap().mod_mask)?;

    loop {
        if stop_rx.try_recv().is_ok() {
            break;
        }
        if regrab_rx.try_recv().is_ok() {
            ungrab_all(&conn, root);
            let t = target.lock().unwrap();
            current_keycode = keysym_to_keycode(&conn, t.keysym)?;
            grab(&conn, root, current_keycode, t.mod_mask)?;
        }

        match conn.poll_for_event() {
            Ok(Some(Event::KeyPress(ev))) => {
                if paused.load(Ordering::SeqCst) {
                    continue;
                }
                let t = target.lock().unwrap();
                if ev.detail == current_keycode {
                    let lock_bits: u16 = ModMask::LOCK.into();
                    let num_lock_bits: u16 = ModMask::M2.into();
                    let active = ev.state & !(lock_bits | num_lock_bits);
                    if active & t.mod_mask == t.mod_mask {
                        tracing::debug!("X11 hotkey toggle fired");
                        if tx.blocking_send(HotkeyEvent::Toggle).is_err() {
                            break;
                        }
                    }
                }
            }
            Ok(Some(_)) => {}
            Ok(None) => std::thread::sleep(std::time::Duration::from_millis(15)),
            Err(e) => {
                tracing::error!("X11 connection error: {}", e);
                break;
            }
        }
    }

    ungrab_all(&conn, root);
    Ok(())
}

fn keysym_to_keycode(conn: &RustConnection, keysym: Keysym) -> Result<Keycode, HotkeyError> {
    let setup = conn.setup();
    let min = setup.min_keycode;
    let max = setup.max_keycode;
    let count = max - min + 1;

    let mapping = conn
        .get_keyboard_mapping(min, count)
        .map_err(|e| HotkeyError::X11(e.to_string()))?
        .reply()
        .map_err(|e| HotkeyError::X11(e.to_string()))?;

    let per_keycode = mapping.keysyms_per_keycode as usize;
    for (i, chunk) in mapping.keysyms.chunks(per_keycode).enumerate() {
        if chunk.iter().any(|&ks| ks == keysym) {
            return Ok(min + i as u8);
        }
    }

    Err(HotkeyError::UnknownKey(format!(
        "no keycode maps to keysym 0x{:x} on this X server",
        keysym
    )))
}

/// Map our cross-backend key names to X11 keysyms. Covers the same
/// surface as `evdev_listener::parse_key_name` (letters, F-keys, common
/// navigation/editing keys); keysym values are the standard `<X11/keysymdef.h>`
/// constants.
fn key_name_to_keysym(name: &str) -> Result<Keysym, HotkeyError> {
    let lower = name.to_lowercase();

    if lower.len() == 1 {
        if let Some(c) = lower.chars().next() {
            if c.is_ascii_alphanumeric() {
                return Ok(c as Keysym);
            }
        }
    }

    if let Some(rest) = lower.strip_prefix('f') {
        if let Ok(n) = rest.parse::<u32>() {
            if (1..=24).contains(&n) {
                return Ok(0xffbe + (n - 1));
            }
        }
    }

    let keysym = match lower.as_str() {
        "scrolllock" => 0xff14,
        "pause" => 0xff13,
        "capslock" => 0xffe5,
        "numlock" => 0xff7f,
        "insert" => 0xff63,
        "home" => 0xff50,
        "end" => 0xff57,
        "pageup" => 0xff55,
        "pagedown" => 0xff56,
        "delete" => 0xffff,
        "space" => 0x0020,
        "enter" | "return" => 0xff0d,
        "tab" => 0xff09,
        "backspace" => 0xff08,
        "escape" | "esc" => 0xff1b,
        "grave" | "backtick" => 0x0060,
        "up" | "arrowup" => 0xff52,
        "down" | "arrowdown" => 0xff54,
        "left" | "arrowleft" => 0xff51,
        "right" | "arrowright" => 0xff53,
        other => {
            return Err(HotkeyError::UnknownKey(format!(
                "{}. Try a single letter/digit, F1-F24, or a named key",
                other
            )))
        }
    };
    Ok(keysym)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_letter_keysym() {
        assert_eq!(key_name_to_keysym("f").unwrap(), 'f' as Keysym);
    }

    #[test]
    fn resolves_function_key_keysym() {
        assert_eq!(key_name_to_keysym("F1").unwrap(), 0xffbe);
        assert_eq!(key_name_to_keysym("f24").unwrap(), 0xffbe + 23);
    }

    #[test]
    fn parse_target_combines_modifier_masks() {
        let target = parse_target("<ctrl>+<alt>+f").unwrap();
        assert_eq!(target.keysym, 'f' as Keysym);
        assert_eq!(
            target.mod_mask,
            u16::from(ModMask::CONTROL) | u16::from(ModMask::M1)
        );
    }

    #[test]
    fn rejects_unknown_modifier() {
        assert!(parse_target("<hyper>+f").is_err());
    }
}
