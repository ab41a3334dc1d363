//! Tolerant pattern matcher: locates "okay <command> [... okay done]"
//! phrases inside free-form transcribed prose.
//!
//! Triggers are compiled into one combined regex alternation (longest
//! trigger first, so e.g. "select all" wins over a bare "select"), with a
//! named capture group per command so a single pass over the transcript
//! recovers both the full match span and, for bracketed commands, the
//! captured content span.

use regex::Regex;

use super::registry::CommandDefinition;

/// The leading wake word. Longest-first so "okay"/"o.k." aren't shadowed
/// by a greedy match on the shorter "ok"/"o.k".
const WAKE_WORDS: &[&str] = &["okay", "o.k.", "o.k", "ok"];

/// Optionally consumed between the wake word and the command's own
/// trigger words.
const FILLER_WORDS: &[&str] = &[
    "and", "the", "a", "to", "uh", "um", "so", "please", "now",
];

/// Optional terminator for bracketed commands.
const END_WORDS: &[&str] = &[
    "done", "finished", "complete", "over", "stop", "end", "execute", "finish",
];

/// A located command phrase within a scanned transcript.
#[derive(Debug, Clone)]
pub struct Occurrence {
    pub start: usize,
    pub end: usize,
    pub trigger: String,
    pub content: String,
    pub full_match: String,
}

/// Any run of whitespace, or one of `.,!?` followed by optional
/// whitespace — tolerates punctuation an ASR model inserts mid-utterance.
fn sep() -> String {
    r"(?:\s+|[.,!?]\s*)".to_string()
}

fn wake_alt() -> String {
    WAKE_WORDS
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

fn filler_opt(sep: &str) -> String {
    format!(
        "(?:(?:{}){})?",
        FILLER_WORDS.join("|"),
        sep
    )
}

fn end_alt() -> String {
    END_WORDS.join("|")
}

/// Render a (possibly multi-word) trigger as a sequence of literal words
/// joined by the token separator, so ASR punctuation between the words of
/// e.g. "select all" doesn't break the match.
fn trigger_pattern(trigger: &str, sep: &str) -> String {
    trigger
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(sep)
}

/// Build the combined alternation and run it over `text`, returning every
/// non-overlapping occurrence in left-to-right order.
pub fn find_matches(text: &str, commands: &[CommandDefinition]) -> Vec<Occurrence> {
    if commands.is_empty() {
        return Vec::new();
    }

    // Longest trigger (by word count, then by character length) first, so
    // a combined alternation never lets a short trigger eat a prefix of a
    // longer one.
    let mut order: Vec<usize> = (0..commands.len()).collect();
    order.sort_by_key(|&i| {
        let words = commands[i].trigger.split_whitespace().count();
        (std::cmp::Reverse(words), std::cmp::Reverse(commands[i].trigger.len()))
    });

    let sep = sep();
    let wake = wake_alt();
    let filler = filler_opt(&sep);
    let end = end_alt();

    let mut alternatives = Vec::with_capacity(order.len());
    for (slot, &i) in order.iter().enumerate() {
        let def = &commands[i];
        let t = trigger_pattern(&def.trigger, &sep);
        let part = if def.requires_end {
            format!(
                "(?P<full_{slot}>\\b(?:{wake}){sep}{filler}{t}(?:{sep}(?P<content_{slot}>.*?))?{sep}(?:{wake}){sep}{filler}(?:{end}))",
                slot = slot,
                wake = wake,
                sep = sep,
                filler = filler,
                t = t,
                end = end,
            )
        } else {
            format!(
                "(?P<full_{slot}>\\b(?:{wake}){sep}{filler}{t})(?:[^[:alnum:]]|$)",
                slot = slot,
                wake = wake,
                sep = sep,
                filler = filler,
                t = t,
            )
        };
        alternatives.push((slot, i, part));
    }

    let pattern = format!(
        "(?i){}",
        alternatives
            .iter()
            .map(|(_, _, p)| p.clone())
            .collect::<Vec<_>>()
            .join("|")
    );

    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            tracing::error!("command matcher pattern failed to compile: {}", e);
            return Vec::new();
        }
    };

    let mut results = Vec::new();
    for caps in re.captures_iter(text) {
        for (slot, i, _) in &alternatives {
            let full_name = format!("full_{}", slot);
            if let Some(full) = caps.name(&full_name) {
                let content_name = format!("content_{}", slot);
                let content = caps
                    .name(&content_name)
                    .map(|c| c.as_str().to_string())
                    .unwrap_or_default();
                results.push(Occurrence {
                    start: full.start(),
                    end: full.end(),
                    trigger: commands[*i].trigger.clone(),
                    content,
                    full_match: full.as_str().to_string(),
                });
                break;
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::registry::Action;
    use crate::command::CommandDefinition;

    fn def(trigger: &str, requires_end: bool) -> CommandDefinition {
        CommandDefinition {
            trigger: trigger.to_string(),
            action: Action::None,
            requires_content: requires_end,
            requires_end,
            substitution_handler: None,
            content_substitution_handler: None,
            category: "general".to_string(),
            scan_content: true,
        }
    }

    #[test]
    fn matches_instant_command_mid_sentence() {
        let defs = vec![def("copy", false)];
        let occ = find_matches("before okay copy after", &defs);
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].trigger, "copy");
        assert_eq!(&"before okay copy after"[occ[0].start..occ[0].end], "okay copy");
    }

    #[test]
    fn matches_bracketed_command_with_content() {
        let defs = vec![def("search", true)];
        let occ = find_matches("okay search rust programming okay done", &defs);
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].content, "rust programming");
    }

    #[test]
    fn longest_trigger_wins_over_prefix() {
        let defs = vec![def("select", false), def("select all", false)];
        let occ = find_matches("okay select all", &defs);
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].trigger, "select all");
    }

    #[test]
    fn tolerates_filler_and_punctuation() {
        let defs = vec![def("search", true)];
        let occ = find_matches("okay, and search. what is rust okay stop", &defs);
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].content, "what is rust");
    }

    #[test]
    fn empty_content_is_allowed() {
        let defs = vec![def("search", true)];
        let occ = find_matches("okay search okay done", &defs);
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].content, "");
    }
}
