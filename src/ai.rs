//! Local AI query service client (Ollama-compatible).
//!
//! Backs the "delta" voice command: dictate a question, get a short plain-text
//! answer typed back in. Talks to a local Ollama-compatible server over HTTP
//! using the same `ureq` client the remote whisper backend uses.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AiServiceError;

pub const DEFAULT_OLLAMA_PROMPT: &str = "You are a helpful assistant for a speech-to-text application.\nRespond with plain text only. No markdown, no code blocks, no bullet points, no numbered lists.\nKeep responses concise and suitable for direct typing into any text field.\nDo not use special formatting characters like asterisks, backticks, or hashes.";

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2";

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct GenerateKeepAliveRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    keep_alive: &'a str,
}

/// Client for a local Ollama-compatible AI query service.
pub struct AiQueryService {
    endpoint: String,
    timeout: Duration,
}

impl AiQueryService {
    pub fn new(endpoint: Option<String>, timeout_secs: Option<u64>) -> Self {
        Self {
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            timeout: Duration::from_secs(timeout_secs.unwrap_or(30)),
        }
    }

    /// Quick ping: true if the server responds to a tags listing.
    pub fn is_available(&self) -> bool {
        self.list_models().is_ok()
    }

    /// Installed model names, sorted.
    pub fn list_models(&self) -> Result<Vec<String>, AiServiceError> {
        let url = format!("{}/api/tags", self.endpoint);
        let response = ureq::get(&url)
            .timeout(self.timeout)
            .call()
            .map_err(|e| AiServiceError::Unavailable(e.to_string()))?;

        let parsed: TagsResponse = response
            .into_json()
            .map_err(|e| AiServiceError::BadResponse(e.to_string()))?;

        let mut names: Vec<String> = parsed.models.into_iter().map(|m| m.name).collect();
        names.sort();
        Ok(names)
    }

    /// Pre-load a model by issuing a no-op generate with a long keep_alive.
    pub fn load_model(&self, model: &str) -> Result<(), AiServiceError> {
        self.keep_alive(model, "5m")
    }

    /// Unload the current model by issuing a no-op generate with keep_alive 0.
    pub fn unload_model(&self, model: &str) -> Result<(), AiServiceError> {
        self.keep_alive(model, "0")
    }

    fn keep_alive(&self, model: &str, keep_alive: &str) -> Result<(), AiServiceError> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = GenerateKeepAliveRequest {
            model,
            prompt: "",
            keep_alive,
        };
        ureq::post(&url)
            .timeout(self.timeout)
            .send_json(body)
            .map_err(|e| AiServiceError::RequestFailed(e.to_string()))?;
        Ok(())
    }

    /// Ask a question, returning a sanitized plain-text answer suitable for
    /// direct typing.
    pub fn generate(
        &self,
        prompt: &str,
        model: Option<&str>,
        system_prompt: Option<&str>,
    ) -> Result<String, AiServiceError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(String::new());
        }

        let model = model.unwrap_or(DEFAULT_MODEL);
        let system_prompt = system_prompt.unwrap_or(DEFAULT_OLLAMA_PROMPT);

        let url = format!("{}/api/chat", self.endpoint);
        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
            options: ChatOptions { temperature: 0.7 },
        };

        let response = ureq::post(&url)
            .timeout(self.timeout)
            .send_json(request)
            .map_err(|e| AiServiceError::RequestFailed(e.to_string()))?;

        let parsed: ChatResponse = response
            .into_json()
            .map_err(|e| AiServiceError::BadResponse(e.to_string()))?;

        let content = parsed
            .message
            .map(|m| m.content)
            .unwrap_or_default();

        Ok(sanitize_response(&content))
    }
}

/// Replace a character some models like to produce with its plain-ASCII
/// equivalent, so typed output never surprises an editor with an encoding
/// it doesn't expect.
fn ascii_fold(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{201b}' => '\'',
        '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{201f}' => '"',
        '\u{2013}' | '\u{2014}' => '-',
        '\u{2026}' => '.',
        other => other,
    }
}

/// Collapse runs of spaces/tabs within a single line to one space, without
/// touching the newlines that separate lines.
fn collapse_inline_whitespace(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last_was_space = false;
    for c in line.chars() {
        if c == ' ' || c == '\t' {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ascii_fold(c));
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

/// Strip common Markdown decoration so a chat response reads cleanly when
/// typed directly into a text field: fenced code blocks, bold/italic
/// markers, heading hashes, bullet dashes, and backtick spans. Newlines
/// between paragraphs/list items are preserved (only blank lines are
/// dropped); curly quotes, em/en-dashes, and ellipsis characters are
/// folded down to plain ASCII.
pub fn sanitize_response(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_code_fence = false;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            in_code_fence = !in_code_fence;
            continue;
        }
        if in_code_fence {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut line = trimmed.trim_start_matches('#').trim_start();
        if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            line = rest;
        }

        let cleaned: String = line.chars().filter(|c| *c != '*' && *c != '`').collect();
        result.push_str(&collapse_inline_whitespace(&cleaned));
        result.push('\n');
    }

    result
        .lines()
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_headings_and_bullets() {
        let input = "# Title\n- first point\n* second point";
        let result = sanitize_response(input);
        assert!(!result.contains('#'));
        assert!(!result.contains('-'));
        assert!(result.contains("Title"));
        assert!(result.contains("first point"));
    }

    #[test]
    fn sanitize_strips_code_fences_and_inline_markers() {
        let input = "Use `cargo build` to compile.\n```\nfn main() {}\n```\n**bold** text";
        let result = sanitize_response(input);
        assert!(!result.contains('`'));
        assert!(!result.contains('*'));
        assert!(result.contains("cargo build"));
        assert!(result.contains("bold"));
    }

    #[test]
    fn sanitize_drops_blank_lines_but_keeps_real_ones() {
        let input = "line one\n\n\nline two";
        let result = sanitize_response(input);
        assert_eq!(result, "line one\nline two");
    }

    #[test]
    fn sanitize_collapses_inline_whitespace_only() {
        let input = "too    many   spaces\tand a tab";
        let result = sanitize_response(input);
        assert_eq!(result, "too many spaces and a tab");
    }

    #[test]
    fn sanitize_folds_curly_quotes_and_dashes_to_ascii() {
        let input = "it\u{2019}s a \u{201c}test\u{201d} \u{2014} really\u{2026}";
        let result = sanitize_response(input);
        assert_eq!(result, "it's a \"test\" - really.");
    }

    #[test]
    fn default_service_targets_localhost_ollama() {
        let service = AiQueryService::new(None, None);
        assert_eq!(service.endpoint, "http://localhost:11434");
    }
}
