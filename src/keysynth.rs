//! Key synthesis: types literal strings and key combinations into the
//! focused window, and reads the clipboard back for command substitution.
//!
//! Distinct from `output::output_with_fallback`, which commits the final
//! transcription text through a configured driver chain. This module is
//! the primitive the command engine calls directly to simulate keystrokes
//! (`okay copy`, macro `<ctrl>+c` tokens) and to read clipboard content
//! for nested substitution (`okay paste`).

use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::OutputError;

/// Longest line chunk sent to the typing backend in one call, matching
/// the conservative chunk size dotool/wtype handle without dropped input
/// on slower Wayland compositors.
const MAX_CHUNK_CHARS: usize = 50;

/// Pause between chunks so the typing backend's input queue can drain.
const CHUNK_DELAY: std::time::Duration = std::time::Duration::from_millis(10);

/// Type `text` into the focused window. Splits on newlines, sending an
/// Enter keypress between lines, and further splits long lines into
/// chunks to avoid dropped characters on some compositors.
pub async fn type_text(text: &str) -> Result<(), OutputError> {
    let lines: Vec<&str> = text.split('\n').collect();

    for (i, line) in lines.iter().enumerate() {
        let chunks = chunk_line(line, MAX_CHUNK_CHARS);
        for (j, chunk) in chunks.iter().enumerate() {
            type_chunk(chunk).await?;
            if j + 1 < chunks.len() {
                tokio::time::sleep(CHUNK_DELAY).await;
            }
        }
        if i + 1 < lines.len() {
            type_key("enter").await?;
        }
    }

    Ok(())
}

/// Split a line into chunks of at most `max_len` chars, breaking on the
/// nearest preceding whitespace when possible so words aren't split.
fn chunk_line(line: &str, max_len: usize) -> Vec<&str> {
    if line.chars().count() <= max_len {
        return vec![line];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let bytes_len = line.len();
    let char_indices: Vec<usize> = line.char_indices().map(|(i, _)| i).collect();
    let mut char_idx = 0;

    while char_idx < char_indices.len() {
        let remaining = char_indices.len() - char_idx;
        let take = remaining.min(max_len);
        let mut end_char = char_idx + take;

        if end_char < char_indices.len() {
            if let Some(break_at) = (char_idx..end_char)
                .rev()
                .find(|&i| line.as_bytes()[char_indices[i]] == b' ')
            {
                if break_at > char_idx {
                    end_char = break_at + 1;
                }
            }
        }

        let start_byte = char_indices[char_idx];
        let end_byte = char_indices.get(end_char).copied().unwrap_or(bytes_len);
        chunks.push(&line[start_byte..end_byte]);
        start = end_byte;
        char_idx = end_char;
        let _ = start;
    }

    chunks
}

async fn type_chunk(text: &str) -> Result<(), OutputError> {
    if text.is_empty() {
        return Ok(());
    }

    if try_wtype_text(text).await? {
        return Ok(());
    }
    if try_ydotool_text(text).await? {
        return Ok(());
    }

    Err(OutputError::AllMethodsFailed)
}

async fn try_wtype_text(text: &str) -> Result<bool, OutputError> {
    if !which_exists("wtype").await {
        return Ok(false);
    }
    let status = Command::new("wtype")
        .arg("--")
        .arg(text)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| OutputError::InjectionFailed(e.to_string()))?;
    Ok(status.success())
}

async fn try_ydotool_text(text: &str) -> Result<bool, OutputError> {
    if !which_exists("ydotool").await {
        return Ok(false);
    }
    let status = Command::new("ydotool")
        .args(["type", "--key-delay", "15", text])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| OutputError::InjectionFailed(e.to_string()))?;
    Ok(status.success())
}

/// Type a key or key combination, e.g. `"ctrl+c"`, `"alt+Tab"`, `"enter"`.
/// Accepts angle-bracket macro notation (`<ctrl+c>`) with brackets
/// stripped by the caller before this is reached.
pub async fn type_key(spec: &str) -> Result<(), OutputError> {
    let spec = resolve_key_spec(spec)?;

    if try_wtype_key(&spec).await? {
        return Ok(());
    }
    if try_ydotool_key(&spec).await? {
        return Ok(());
    }

    Err(OutputError::AllMethodsFailed)
}

/// Normalize a `<mod>+<mod>+...+key` spec, mapping known aliases to their
/// canonical key names. Returns the normalized `mod+mod+key` string, all
/// lowercase except for function keys, which stay as `F1`..`F12`.
fn resolve_key_spec(spec: &str) -> Result<String, OutputError> {
    let spec = spec.trim().trim_start_matches('<').trim_end_matches('>');
    if spec.is_empty() {
        return Err(OutputError::UnknownKeySpec(spec.to_string()));
    }

    let parts: Vec<&str> = spec.split('+').map(str::trim).filter(|s| !s.is_empty()).collect();
    if parts.is_empty() {
        return Err(OutputError::UnknownKeySpec(spec.to_string()));
    }

    let mut resolved = Vec::with_capacity(parts.len());
    for part in parts {
        resolved.push(normalize_key_name(part)?);
    }
    Ok(resolved.join("+"))
}

/// Map a key-name alias to its canonical xkb-style keysym name.
fn normalize_key_name(name: &str) -> Result<String, OutputError> {
    let lower = name.to_lowercase();
    let canonical = match lower.as_str() {
        "ctrl" | "control" => "ctrl",
        "shift" => "shift",
        "alt" => "alt",
        "super" | "meta" | "win" | "cmd" => "super",
        "enter" | "return" => "Return",
        "backspace" => "BackSpace",
        "tab" => "Tab",
        "escape" | "esc" => "Escape",
        "space" | "spacebar" => "space",
        "capslock" | "caps_lock" | "caps" => "Caps_Lock",
        "delete" | "del" => "Delete",
        "insert" | "ins" => "Insert",
        "home" => "Home",
        "end" => "End",
        "pageup" | "page_up" => "Page_Up",
        "pagedown" | "page_down" => "Page_Down",
        "up" | "arrowup" => "Up",
        "down" | "arrowdown" => "Down",
        "left" | "arrowleft" => "Left",
        "right" | "arrowright" => "Right",
        other if other.len() == 2 && other.starts_with('f') && other[1..].parse::<u8>().is_ok() => {
            return Ok(format!("F{}", &other[1..]));
        }
        other if other.len() == 3 && other.starts_with('f') && other[1..].parse::<u8>().is_ok() => {
            return Ok(format!("F{}", &other[1..]));
        }
        other if other.len() == 1 => return Ok(other.to_string()),
        other => return Err(OutputError::UnknownKeySpec(other.to_string())),
    };
    Ok(canonical.to_string())
}

async fn try_wtype_key(spec: &str) -> Result<bool, OutputError> {
    if !which_exists("wtype").await {
        return Ok(false);
    }

    let parts: Vec<&str> = spec.split('+').collect();
    let (modifiers, key) = parts.split_at(parts.len() - 1);
    let key = key[0];

    let mut args: Vec<String> = Vec::new();
    for m in modifiers {
        args.push("-M".to_string());
        args.push(m.to_string());
    }
    args.push("-k".to_string());
    args.push(key.to_string());
    for m in modifiers.iter().rev() {
        args.push("-m".to_string());
        args.push(m.to_string());
    }

    let status = Command::new("wtype")
        .args(&args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| OutputError::InjectionFailed(e.to_string()))?;
    Ok(status.success())
}

async fn try_ydotool_key(spec: &str) -> Result<bool, OutputError> {
    if !which_exists("ydotool").await {
        return Ok(false);
    }
    let status = Command::new("ydotool")
        .args(["key", spec])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| OutputError::InjectionFailed(e.to_string()))?;
    Ok(status.success())
}

/// Read the current clipboard text contents (`wl-paste`, falling back to
/// `xclip -o` on X11). Used by the command engine's nested-substitution
/// handling for `okay paste` inside another command's content.
pub async fn get_clipboard_text() -> Result<String, OutputError> {
    if which_exists("wl-paste").await {
        let output = Command::new("wl-paste")
            .arg("--no-newline")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| OutputError::ClipboardReadFailed(e.to_string()))?;
        if output.status.success() {
            return String::from_utf8(output.stdout)
                .map_err(|e| OutputError::ClipboardReadFailed(e.to_string()));
        }
    }

    if which_exists("xclip").await {
        let output = Command::new("xclip")
            .args(["-selection", "clipboard", "-o"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| OutputError::ClipboardReadFailed(e.to_string()))?;
        if output.status.success() {
            return String::from_utf8(output.stdout)
                .map_err(|e| OutputError::ClipboardReadFailed(e.to_string()));
        }
    }

    Err(OutputError::ClipboardReadFailed(
        "no clipboard reader (wl-paste, xclip) available".to_string(),
    ))
}

/// Blocking variant of [`get_clipboard_text`], used by the command engine's
/// synchronous pattern-scan pass (nested "okay paste" substitution), which
/// runs before the async finalize step that drives keystroke output.
pub fn get_clipboard_text_blocking() -> Result<String, OutputError> {
    use std::process::Command as StdCommand;

    let which = |bin: &str| {
        StdCommand::new("which")
            .arg(bin)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    };

    if which("wl-paste") {
        let output = StdCommand::new("wl-paste")
            .arg("--no-newline")
            .output()
            .map_err(|e| OutputError::ClipboardReadFailed(e.to_string()))?;
        if output.status.success() {
            return String::from_utf8(output.stdout)
                .map_err(|e| OutputError::ClipboardReadFailed(e.to_string()));
        }
    }

    if which("xclip") {
        let output = StdCommand::new("xclip")
            .args(["-selection", "clipboard", "-o"])
            .output()
            .map_err(|e| OutputError::ClipboardReadFailed(e.to_string()))?;
        if output.status.success() {
            return String::from_utf8(output.stdout)
                .map_err(|e| OutputError::ClipboardReadFailed(e.to_string()));
        }
    }

    Err(OutputError::ClipboardReadFailed(
        "no clipboard reader (wl-paste, xclip) available".to_string(),
    ))
}

async fn which_exists(bin: &str) -> bool {
    Command::new("which")
        .arg(bin)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_key_name_resolves_aliases() {
        assert_eq!(normalize_key_name("Enter").unwrap(), "Return");
        assert_eq!(normalize_key_name("esc").unwrap(), "Escape");
        assert_eq!(normalize_key_name("F5").unwrap(), "F5");
        assert_eq!(normalize_key_name("capslock").unwrap(), "Caps_Lock");
        assert_eq!(normalize_key_name("c").unwrap(), "c");
    }

    #[test]
    fn normalize_key_name_rejects_unknown() {
        assert!(normalize_key_name("bogus_key_zzz").is_err());
    }

    #[test]
    fn resolve_key_spec_handles_combos() {
        let resolved = resolve_key_spec("ctrl+shift+z").unwrap();
        assert_eq!(resolved, "ctrl+shift+z");

        let resolved = resolve_key_spec("<alt+Tab>").unwrap();
        assert_eq!(resolved, "alt+Tab");
    }

    #[test]
    fn chunk_line_splits_long_lines_on_whitespace() {
        let line = "the quick brown fox jumps over the lazy dog and keeps running far";
        let chunks = chunk_line(line, 20);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 20 || !c.contains(' '));
        }
        assert_eq!(chunks.concat(), line);
    }

    #[test]
    fn chunk_line_keeps_short_lines_whole() {
        let chunks = chunk_line("short line", 50);
        assert_eq!(chunks, vec!["short line"]);
    }
}
