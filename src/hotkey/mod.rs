//! Hotkey detection module
//!
//! Provides kernel-level key event detection using evdev. This approach
//! works on all Wayland compositors and X11 alike because it operates at
//! the Linux input subsystem level. Requires the user to be in the
//! 'input' group; falls back to a user-space X11 grabber otherwise.

#[cfg(target_os = "linux")]
pub mod evdev_listener;

#[cfg(target_os = "linux")]
pub mod x11_listener;

use crate::error::HotkeyError;
use tokio::sync::mpsc;

/// Events emitted by the hotkey listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The configured hotkey fired: toggle recording on/off.
    Toggle,
}

/// A parsed hotkey specification: one main key plus the exact set of
/// modifiers that must be held alongside it. Parsed from strings of the
/// form `<ctrl>+<alt>+f`.
#[derive(Debug, Clone)]
pub struct HotkeySpec {
    pub key: String,
    pub modifiers: Vec<String>,
}

impl HotkeySpec {
    /// Parse `"<ctrl>+<alt>+f"` into a main key (`"f"`) and modifier
    /// names (`["ctrl", "alt"]`), in the order they appeared. Bracketed
    /// tokens are modifiers; the one unbracketed token is the main key.
    /// Exactly one unbracketed token is required.
    pub fn parse(spec: &str) -> Result<Self, HotkeyError> {
        let mut modifiers = Vec::new();
        let mut key = None;

        for token in spec.split('+') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            if let Some(stripped) = token.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                modifiers.push(stripped.to_lowercase());
            } else if key.is_none() {
                key = Some(token.to_lowercase());
            } else {
                return Err(HotkeyError::InvalidSpec(format!(
                    "multiple main keys in hotkey spec '{}'",
                    spec
                )));
            }
        }

        let key = key.ok_or_else(|| {
            HotkeyError::InvalidSpec(format!("no main key in hotkey spec '{}'", spec))
        })?;

        Ok(Self { key, modifiers })
    }
}

/// Trait for hotkey detection implementations.
///
/// `pause`, `resume`, and `update_hotkey` are hot-reload operations: none
/// of them tear down the underlying listener thread, so a settings change
/// never drops an in-flight keystroke.
#[async_trait::async_trait]
pub trait HotkeyListener: Send + Sync {
    /// Start listening for hotkey events. Returns a channel receiver for
    /// events.
    async fn start(&mut self) -> Result<mpsc::Receiver<HotkeyEvent>, HotkeyError>;

    /// Stop listening and clean up.
    async fn stop(&mut self) -> Result<(), HotkeyError>;

    /// Temporarily ignore key events without stopping the listener
    /// thread (e.g. while the session controller is already recording
    /// and the toggle key should be inert to internal re-entrancy).
    fn pause(&self);

    /// Resume dispatching events after [`HotkeyListener::pause`].
    fn resume(&self);

    /// Hot-reload the target key/modifier set, e.g. after the settings
    /// store's `hotkey` key changes. Does not restart the listener.
    fn update_hotkey(&self, new: &str) -> Result<(), HotkeyError>;
}

/// Factory function to create the appropriate hotkey listener.
///
/// Tries evdev first, since it works uniformly across Wayland compositors
/// and X11 alike. If that fails (commonly: the user isn't in the `input`
/// group, or no keyboard device is found) and an X server is reachable,
/// falls back to a user-space `XGrabKey` listener. If neither is
/// available, evdev's error is the one surfaced, since it's the primary
/// backend and its error message carries the actionable fix.
#[cfg(target_os = "linux")]
pub fn create_listener(hotkey: &str) -> Result<Box<dyn HotkeyListener>, HotkeyError> {
    match evdev_listener::EvdevListener::new(hotkey) {
        Ok(listener) => Ok(Box::new(listener)),
        Err(evdev_err) => match x11_listener::X11Listener::new(hotkey) {
            Ok(listener) => {
                tracing::warn!(
                    "evdev hotkey listener unavailable ({}), falling back to X11",
                    evdev_err
                );
                Ok(Box::new(listener))
            }
            Err(_) => Err(evdev_err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modifiers_and_key_in_order() {
        let spec = HotkeySpec::parse("<ctrl>+<alt>+f").unwrap();
        assert_eq!(spec.key, "f");
        assert_eq!(spec.modifiers, vec!["ctrl", "alt"]);
    }

    #[test]
    fn parses_bare_key_with_no_modifiers() {
        let spec = HotkeySpec::parse("scrolllock").unwrap();
        assert_eq!(spec.key, "scrolllock");
        assert!(spec.modifiers.is_empty());
    }

    #[test]
    fn rejects_two_main_keys() {
        assert!(HotkeySpec::parse("f+g").is_err());
    }

    #[test]
    fn rejects_missing_main_key() {
        assert!(HotkeySpec::parse("<ctrl>+<alt>").is_err());
    }
}
