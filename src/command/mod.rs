//! Voice command detection and execution.
//!
//! Detects "okay <action> [... okay done]" patterns inside a finalized
//! transcript, strips them from the text that gets typed, and carries out
//! their effects (key combos, clipboard paste, browser search, AI query,
//! custom macros). Detection never touches the transcript while recording
//! is in progress — it runs once, after the session controller finalizes
//! the merged confirmed+pending text.
//!
//! The matcher builds one combined regex alternation across every
//! registered trigger (longest trigger first, so e.g. "select all" is
//! tried before "select"), to avoid a shorter trigger eating a prefix of a
//! longer one.

mod actions;
mod macros;
mod matcher;
mod registry;

pub use actions::{run_macro, MacroError};
pub use registry::{CommandDefinition, ContentSubstitution, Substitution};

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use crate::ai::AiQueryService;
use crate::settings::SettingsStore;

/// A matched command occurrence within a scanned text.
#[derive(Debug, Clone)]
pub struct CommandMatch {
    pub trigger: String,
    pub content: String,
    pub full_match: String,
    pub requires_content: bool,
}

/// Parses transcripts for voice commands, strips and substitutes them, and
/// executes their side effects.
pub struct CommandEngine {
    commands: Vec<CommandDefinition>,
    executed_hashes: HashSet<u64>,
    ai: AiQueryService,
}

impl CommandEngine {
    /// Build the engine from the default built-in registry plus any custom
    /// commands and overrides/disables stored in `settings`.
    pub fn new(settings: &SettingsStore) -> Self {
        let commands = registry::build_commands(settings);
        Self {
            commands,
            executed_hashes: HashSet::new(),
            ai: AiQueryService::new(None, None),
        }
    }

    /// Reload the registry (e.g. after settings change custom commands).
    pub fn reload(&mut self, settings: &SettingsStore) {
        self.commands = registry::build_commands(settings);
    }

    /// Clear the per-session dedup set. Call once per new recording.
    pub fn reset(&mut self) {
        self.executed_hashes.clear();
    }

    /// Scan `text` for command patterns, returning the cleaned text (with
    /// commands and substitutions applied) and the list of matches whose
    /// side effects still need to be executed via [`CommandEngine::execute`].
    pub fn scan_text(&mut self, text: &str, settings: &SettingsStore) -> (String, Vec<CommandMatch>) {
        self.scan_text_inner(text, false, settings)
    }

    fn scan_text_inner(
        &mut self,
        text: &str,
        is_nested: bool,
        settings: &SettingsStore,
    ) -> (String, Vec<CommandMatch>) {
        if text.is_empty() {
            return (text.to_string(), Vec::new());
        }

        let found = matcher::find_matches(text, &self.commands);
        let mut matches = Vec::new();
        let mut replacements: Vec<(usize, usize, String)> = Vec::new();

        for occ in found {
            let hash = hash_str(&occ.full_match);
            if !self.executed_hashes.insert(hash) {
                continue;
            }

            let def = self
                .commands
                .iter()
                .find(|c| c.trigger == occ.trigger)
                .expect("matcher only returns registered triggers");

            if is_nested {
                if let Some(Substitution::Clipboard) = def.substitution_handler {
                    let text = crate::keysynth::get_clipboard_text_blocking().unwrap_or_default();
                    replacements.push((occ.start, occ.end, text));
                    continue;
                }
            }

            let mut content = occ.content.clone();

            if let Some(handler) = &def.content_substitution_handler {
                if !content.is_empty() && def.scan_content {
                    let (sub_cleaned, sub_matches) =
                        self.scan_text_inner(&content, true, settings);
                    matches.extend(sub_matches);
                    content = sub_cleaned.trim().to_string();
                }

                let replacement = match handler {
                    ContentSubstitution::Delta => actions::run_delta(&self.ai, &content, settings),
                    ContentSubstitution::RawTextPassthrough => content.trim().to_string(),
                };
                replacements.push((occ.start, occ.end, replacement));
                continue;
            }

            if !content.is_empty() {
                let (sub_cleaned, sub_matches) = self.scan_text_inner(&content, true, settings);
                if !sub_matches.is_empty() || sub_cleaned != content {
                    matches.extend(sub_matches);
                    content = sub_cleaned.trim().to_string();
                }
            }

            matches.push(CommandMatch {
                trigger: occ.trigger.clone(),
                content,
                full_match: occ.full_match.clone(),
                requires_content: def.requires_content,
            });
            replacements.push((occ.start, occ.end, String::new()));
        }

        replacements.sort_by(|a, b| b.0.cmp(&a.0));
        let mut cleaned = text.to_string();
        for (start, end, repl) in replacements {
            cleaned.replace_range(start..end, &repl);
        }

        let cleaned = collapse_spaces(&cleaned);
        (cleaned, matches)
    }

    /// Execute the side effects of every matched command, in order.
    pub async fn execute(&self, matches: &[CommandMatch]) {
        for m in matches {
            let def = self.commands.iter().find(|c| c.trigger == m.trigger);
            let Some(def) = def else { continue };
            if let Err(e) = actions::run_action(def, &m.content, &self.commands).await {
                tracing::warn!("command '{}' failed: {}", m.trigger, e);
            }
        }
    }
}

fn hash_str(s: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.chars() {
        if c == ' ' || c == '\t' {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_settings() -> SettingsStore {
        let dir = tempdir().unwrap();
        SettingsStore::load(dir.path().join("settings.json")).unwrap()
    }

    #[test]
    fn scan_text_strips_instant_command() {
        let settings = test_settings();
        let mut engine = CommandEngine::new(&settings);
        let (cleaned, matches) = engine.scan_text("hello okay copy world", &settings);
        assert_eq!(cleaned, "hello world");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].trigger, "copy");
    }

    #[test]
    fn scan_text_extracts_bracketed_content() {
        let settings = test_settings();
        let mut engine = CommandEngine::new(&settings);
        let (cleaned, matches) =
            engine.scan_text("okay search rust programming okay done", &settings);
        assert_eq!(cleaned, "");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].trigger, "search");
        assert_eq!(matches[0].content, "rust programming");
    }

    #[test]
    fn scan_text_dedupes_identical_matches_within_session() {
        let settings = test_settings();
        let mut engine = CommandEngine::new(&settings);
        let (_cleaned, matches) =
            engine.scan_text("okay copy hello okay copy world", &settings);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn reset_clears_dedup_between_sessions() {
        let settings = test_settings();
        let mut engine = CommandEngine::new(&settings);
        let (_c, m1) = engine.scan_text("okay copy", &settings);
        assert_eq!(m1.len(), 1);
        let (_c, m2) = engine.scan_text("okay copy", &settings);
        assert_eq!(m2.len(), 0);
        engine.reset();
        let (_c, m3) = engine.scan_text("okay copy", &settings);
        assert_eq!(m3.len(), 1);
    }

    #[test]
    fn raw_text_passthrough_skips_nested_command_scan() {
        let settings = test_settings();
        let mut engine = CommandEngine::new(&settings);
        let (cleaned, matches) = engine.scan_text(
            "okay raw text please ignore okay copy inside okay done",
            &settings,
        );
        assert!(cleaned.contains("please ignore okay copy inside"));
        assert!(matches.is_empty() || matches.iter().all(|m| m.trigger == "raw text"));
    }
}
