//! Desktop notifications for environmental/fatal errors (§7 error taxonomy).
//!
//! A thin wrapper around `notify-send` (libnotify). Failures here are
//! themselves best-effort: a missing `notify-send` binary degrades to a
//! debug log line rather than surfacing anywhere, since the caller has
//! already decided the user needs to see *something* and has no better
//! fallback channel than the one this module provides.

use std::process::Stdio;
use tokio::process::Command;

/// Send a desktop notification with the given title and body.
///
/// Async and non-blocking; notification failures are logged but never
/// propagate (notifications are best-effort, per the error taxonomy's
/// *environmental* category).
pub async fn send(title: &str, body: &str) {
    let result = Command::new("notify-send")
        .args(["--app-name=Voxtype", "--expire-time=2000", title, body])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Err(e) = result {
        tracing::debug!("failed to send notification: {}", e);
    }
}

/// Blocking variant, for early-startup warnings before the async runtime
/// is up (e.g. "no audio input device available" at process start).
pub fn send_sync(title: &str, body: &str) {
    let _ = std::process::Command::new("notify-send")
        .args(["--app-name=Voxtype", "--expire-time=5000", title, body])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
}
