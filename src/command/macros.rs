//! Macro evaluator for custom command bodies.
//!
//! A macro string mixes plain text, key-combination specifiers `<...>`,
//! and references to other registered commands `@name` / `@name[arg]`.
//! Before tokenizing, the literal `{content}` is substituted with the
//! voice-captured content (empty string if the command had none).

/// One token in a tokenized macro body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroToken {
    /// `@name` or `@name[arg]` — look up and invoke another command.
    CommandRef { name: String, arg: Option<String> },
    /// `<ctrl+shift+t>` — a key or key-combination specifier.
    Key(String),
    /// Literal text to be typed.
    Text(String),
}

/// Substitute `{content}` occurrences with the captured voice content.
pub fn substitute_content(macro_str: &str, content: &str) -> String {
    macro_str.replace("{content}", content)
}

/// Tokenize a macro body (after `{content}` substitution) into an ordered
/// sequence of [`MacroToken`]s.
pub fn tokenize(macro_str: &str) -> Vec<MacroToken> {
    let mut tokens = Vec::new();
    let mut plain = String::new();
    let chars: Vec<char> = macro_str.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '@' {
            if let Some((name, arg, consumed)) = parse_command_ref(&chars[i + 1..]) {
                flush_plain(&mut plain, &mut tokens);
                tokens.push(MacroToken::CommandRef { name, arg });
                i += 1 + consumed;
                continue;
            }
        }

        if c == '<' {
            if let Some(end) = chars[i + 1..].iter().position(|&c| c == '>') {
                flush_plain(&mut plain, &mut tokens);
                let spec: String = chars[i + 1..i + 1 + end].iter().collect();
                tokens.push(MacroToken::Key(spec));
                i += end + 2;
                continue;
            }
        }

        plain.push(c);
        i += 1;
    }

    flush_plain(&mut plain, &mut tokens);
    tokens
}

fn flush_plain(plain: &mut String, tokens: &mut Vec<MacroToken>) {
    if !plain.is_empty() {
        tokens.push(MacroToken::Text(std::mem::take(plain)));
    }
}

/// Parse `name` or `name[arg]` starting right after the `@`. Returns the
/// name, optional arg, and number of chars consumed (not counting `@`).
fn parse_command_ref(rest: &[char]) -> Option<(String, Option<String>, usize)> {
    let ident_len = rest
        .iter()
        .position(|c| !(c.is_alphanumeric() || *c == '_'))
        .unwrap_or(rest.len());

    if ident_len == 0 {
        return None;
    }

    let name: String = rest[..ident_len].iter().collect();

    if rest.get(ident_len) == Some(&'[') {
        if let Some(close) = rest[ident_len..].iter().position(|&c| c == ']') {
            let arg: String = rest[ident_len + 1..ident_len + close].iter().collect();
            return Some((name, Some(arg), ident_len + close + 1));
        }
    }

    Some((name, None, ident_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_plain_text() {
        let tokens = tokenize("hello world");
        assert_eq!(tokens, vec![MacroToken::Text("hello world".to_string())]);
    }

    #[test]
    fn tokenizes_key_spec() {
        let tokens = tokenize("<ctrl+shift+t>");
        assert_eq!(tokens, vec![MacroToken::Key("ctrl+shift+t".to_string())]);
    }

    #[test]
    fn tokenizes_command_ref_with_arg() {
        let tokens = tokenize("@search[rust lang]");
        assert_eq!(
            tokens,
            vec![MacroToken::CommandRef {
                name: "search".to_string(),
                arg: Some("rust lang".to_string()),
            }]
        );
    }

    #[test]
    fn tokenizes_command_ref_without_arg() {
        let tokens = tokenize("@paste");
        assert_eq!(
            tokens,
            vec![MacroToken::CommandRef {
                name: "paste".to_string(),
                arg: None,
            }]
        );
    }

    #[test]
    fn tokenizes_mixed_sequence() {
        let tokens = tokenize("Hi <enter>@paste done");
        assert_eq!(
            tokens,
            vec![
                MacroToken::Text("Hi ".to_string()),
                MacroToken::Key("enter".to_string()),
                MacroToken::CommandRef { name: "paste".to_string(), arg: None },
                MacroToken::Text(" done".to_string()),
            ]
        );
    }

    #[test]
    fn substitutes_content_placeholder() {
        let out = substitute_content("typed: {content}!", "hello");
        assert_eq!(out, "typed: hello!");
    }

    #[test]
    fn plain_text_macro_round_trips_with_no_tokens() {
        let body = "just plain dictation, no markers";
        let tokens = tokenize(body);
        assert_eq!(tokens, vec![MacroToken::Text(body.to_string())]);
    }
}
