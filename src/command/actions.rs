//! Side effects for matched commands: key synthesis, browser search, AI
//! queries, timed waits, and custom macro execution.
//!
//! Kept separate from the pure pattern-matching pass (`matcher.rs`) so
//! command *detection* stays a pure function of the transcript: deterministic
//! testing and the recursive nested/content-substitution semantics both
//! depend on scanning never having side effects.

use std::time::Duration;

use crate::ai::AiQueryService;
use crate::error::{CommandError, OutputError};
use crate::keysynth;
use crate::settings::SettingsStore;

use super::macros::{substitute_content, tokenize, MacroToken};
use super::registry::{Action, CommandDefinition};

/// Errors raised while evaluating a custom command's macro body.
#[derive(Debug, thiserror::Error)]
pub enum MacroError {
    #[error("key synthesis failed: {0}")]
    Output(#[from] OutputError),

    #[error("{0}")]
    Nested(#[from] Box<CommandError>),
}

/// Run the side effect of a single matched command (everything except the
/// content-substitution commands `delta` and `raw text`, which never reach
/// here — they're resolved inline during scanning via [`run_delta`]).
pub async fn run_action(
    def: &CommandDefinition,
    content: &str,
    registry: &[CommandDefinition],
) -> Result<(), CommandError> {
    match &def.action {
        Action::Key(spec) => keysynth::type_key(spec).await.map_err(Into::into),
        Action::BrowserSearch => run_browser_search(content).await,
        Action::Wait => {
            let secs = parse_wait_duration(content);
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
            Ok(())
        }
        Action::None => Ok(()),
        Action::Macro(body) => run_macro(body, content, registry)
            .await
            .map_err(CommandError::from),
    }
}

/// Open a browser search for `content` and focus it: URL-encode the query,
/// open the default browser, then synthesize Alt+Tab ~0.5s later so the
/// newly raised window gets keyboard focus.
///
/// Preserves a known rough edge from the source behavior: on multi-window
/// desktops the Alt+Tab may focus an unrelated window rather than the
/// freshly opened browser.
async fn run_browser_search(content: &str) -> Result<(), CommandError> {
    let query = urlencoding::encode(content.trim()).replace("%20", "+");
    let url = format!("https://www.google.com/search?q={}", query);
    open_url(&url).await?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    keysynth::type_key("alt+Tab").await.map_err(Into::into)
}

async fn open_url(url: &str) -> Result<(), OutputError> {
    use std::process::Stdio;
    tokio::process::Command::new("xdg-open")
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| OutputError::InjectionFailed(e.to_string()))?;
    Ok(())
}

/// Query the local AI service with `delta`'s recursively-cleaned content,
/// returning sanitized text that replaces the entire `okay delta ... okay
/// done` span in the transcript. Returns an empty string (no splice) if
/// the service is disabled or unreachable, so a failed query degrades to
/// silently dropping the command rather than typing an error message.
pub fn run_delta(ai: &AiQueryService, content: &str, settings: &SettingsStore) -> String {
    if !settings.get_bool("ollama_enabled").unwrap_or(false) {
        return String::new();
    }

    let model = settings.get_string("ollama_model");
    let custom_prompt_enabled = settings
        .get_bool("ollama_custom_prompt_enabled")
        .unwrap_or(false);
    let system_prompt = if custom_prompt_enabled {
        settings.get_string("ollama_system_prompt")
    } else {
        None
    };

    match ai.generate(content, model.as_deref(), system_prompt.as_deref()) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("delta command failed: {}", e);
            String::new()
        }
    }
}

/// Parse a voice-dictated duration for the `wait` command: digits, or
/// English number words up to "thousand"; trailing "seconds"/"ms"
/// stripped. Unparseable content defaults to 1s; results are capped at
/// 3600s (1 hour).
fn parse_wait_duration(content: &str) -> f64 {
    let text = content.trim().to_lowercase();
    if text.is_empty() {
        return 1.0;
    }

    let (number_part, is_ms) = if let Some(s) = text.strip_suffix("ms") {
        (s.trim(), true)
    } else if let Some(s) = text.strip_suffix("milliseconds") {
        (s.trim(), true)
    } else if let Some(s) = text.strip_suffix("millisecond") {
        (s.trim(), true)
    } else if let Some(s) = text.strip_suffix("seconds") {
        (s.trim(), false)
    } else if let Some(s) = text.strip_suffix("second") {
        (s.trim(), false)
    } else {
        (text.as_str(), false)
    };

    let value = if let Ok(n) = number_part.parse::<f64>() {
        n
    } else if let Some(n) = words_to_number(number_part) {
        n as f64
    } else {
        return 1.0;
    };

    let seconds = if is_ms { value / 1000.0 } else { value };
    seconds.clamp(0.0, 3600.0)
}

/// English number words up to "thousand" (e.g. "twenty five", "two
/// hundred", "three thousand"). No support for "and"-joined compounds.
fn words_to_number(text: &str) -> Option<u64> {
    const ONES: &[&str] = &[
        "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
        "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
        "nineteen",
    ];
    const TENS: &[&str] = &[
        "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
    ];

    let mut total: u64 = 0;
    let mut current: u64 = 0;
    let mut any = false;

    for word in text.split_whitespace() {
        any = true;
        if let Some(n) = ONES.iter().position(|w| *w == word) {
            current += n as u64;
        } else if let Some(n) = TENS.iter().position(|w| *w == word) {
            current += n as u64 * 10;
        } else if word == "hundred" {
            current = if current == 0 { 100 } else { current * 100 };
        } else if word == "thousand" {
            current = if current == 0 { 1000 } else { current * 1000 };
            total += current;
            current = 0;
        } else {
            return None;
        }
    }

    total += current;
    if any {
        Some(total)
    } else {
        None
    }
}

/// Run a custom command's macro body against the registry (for `@name`
/// references), typing plain text and key specs as they're encountered
/// and invoking other commands' actions in place.
pub async fn run_macro(
    body: &str,
    content: &str,
    registry: &[CommandDefinition],
) -> Result<(), MacroError> {
    let substituted = substitute_content(body, content);

    for token in tokenize(&substituted) {
        match token {
            MacroToken::Text(text) => keysynth::type_text(&text).await?,
            MacroToken::Key(spec) => keysynth::type_key(&spec).await?,
            MacroToken::CommandRef { name, arg } => {
                let Some(def) = registry
                    .iter()
                    .find(|c| c.trigger.eq_ignore_ascii_case(&name))
                else {
                    tracing::warn!("unknown macro command reference: @{}", name);
                    continue;
                };
                let ref_content = arg.unwrap_or_default();
                // `run_action` is the general action entry point and can in
                // turn reach another `Action::Macro`; box the call to break
                // the otherwise infinitely-sized mutual recursion.
                let fut = run_action(def, &ref_content, registry);
                Box::pin(fut)
                    .await
                    .map_err(|e| MacroError::Nested(Box::new(e)))?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_parses_digits() {
        assert_eq!(parse_wait_duration("5"), 5.0);
        assert_eq!(parse_wait_duration("5 seconds"), 5.0);
        assert_eq!(parse_wait_duration("500ms"), 0.5);
    }

    #[test]
    fn wait_parses_number_words() {
        assert_eq!(parse_wait_duration("ten"), 10.0);
        assert_eq!(parse_wait_duration("twenty five seconds"), 25.0);
        assert_eq!(parse_wait_duration("two hundred"), 200.0);
        assert_eq!(parse_wait_duration("three thousand"), 3000.0_f64.min(3600.0));
    }

    #[test]
    fn wait_defaults_to_one_second_when_unparseable() {
        assert_eq!(parse_wait_duration("banana"), 1.0);
        assert_eq!(parse_wait_duration(""), 1.0);
    }

    #[test]
    fn wait_caps_at_one_hour() {
        assert_eq!(parse_wait_duration("99999"), 3600.0);
        assert_eq!(parse_wait_duration("five thousand"), 3600.0);
    }
}
