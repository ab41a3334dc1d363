//! Built-in and custom command registration.

use crate::settings::SettingsStore;

/// What a nested (nested inside another command's content) occurrence of
/// this trigger should be replaced with, instead of being treated as a
/// command execution. Used for e.g. "okay paste" inside "okay search ...".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substitution {
    Clipboard,
}

/// What a top-level occurrence of a content command should be replaced
/// with once its content has been resolved (recursively scanned, if
/// `scan_content` is set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSubstitution {
    /// Query the local AI service and substitute its response.
    Delta,
    /// Pass content through verbatim (command trigger words inside are
    /// not treated as commands even when nested matches are suppressed).
    RawTextPassthrough,
}

/// What running an (non content-substituting) command actually does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Type a key or key combination, e.g. "ctrl+c".
    Key(String),
    /// Open a browser search for the command content.
    BrowserSearch,
    /// Pause execution for a voice-specified duration.
    Wait,
    /// No independent effect — substitution handler already replaced
    /// the text (raw text, delta).
    None,
    /// Run a macro string (custom command body): tokens of
    /// plain text / `<key>` / `@trigger[arg]`, with `{content}`
    /// substituted from captured voice content.
    Macro(String),
}

#[derive(Debug, Clone)]
pub struct CommandDefinition {
    pub trigger: String,
    pub action: Action,
    pub requires_content: bool,
    pub requires_end: bool,
    pub substitution_handler: Option<Substitution>,
    pub content_substitution_handler: Option<ContentSubstitution>,
    pub category: String,
    pub scan_content: bool,
}

impl CommandDefinition {
    fn new(trigger: &str, action: Action) -> Self {
        Self {
            trigger: trigger.to_string(),
            action,
            requires_content: false,
            requires_end: true,
            substitution_handler: None,
            content_substitution_handler: None,
            category: "general".to_string(),
            scan_content: true,
        }
    }

    fn instant(mut self) -> Self {
        self.requires_end = false;
        self
    }

    fn content(mut self) -> Self {
        self.requires_content = true;
        self.requires_end = true;
        self
    }

    fn substitution(mut self, s: Substitution) -> Self {
        self.substitution_handler = Some(s);
        self
    }

    fn content_substitution(mut self, s: ContentSubstitution) -> Self {
        self.content_substitution_handler = Some(s);
        self
    }

    fn no_scan(mut self) -> Self {
        self.scan_content = false;
        self
    }

    fn category(mut self, c: &str) -> Self {
        self.category = c.to_string();
        self
    }
}

fn default_commands() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new("copy", Action::Key("ctrl+c".into())).instant(),
        CommandDefinition::new("paste", Action::Key("ctrl+v".into()))
            .instant()
            .substitution(Substitution::Clipboard),
        CommandDefinition::new("cut", Action::Key("ctrl+x".into())).instant(),
        CommandDefinition::new("undo", Action::Key("ctrl+z".into())).instant(),
        CommandDefinition::new("redo", Action::Key("ctrl+shift+z".into())).instant(),
        CommandDefinition::new("select all", Action::Key("ctrl+a".into())).instant(),
        CommandDefinition::new("backspace", Action::Key("backspace".into())).instant(),
        CommandDefinition::new("delete", Action::Key("ctrl+backspace".into())).instant(),
        CommandDefinition::new("new line", Action::Key("enter".into())).instant(),
        CommandDefinition::new("enter", Action::Key("enter".into())).instant(),
        CommandDefinition::new("super", Action::Key("super".into())).instant(),
        CommandDefinition::new("command prompt", Action::Key("alt+F2".into())).instant(),
        CommandDefinition::new("lock", Action::Key("super+l".into())).instant(),
        CommandDefinition::new("tab", Action::Key("alt+Tab".into())).instant(),
        CommandDefinition::new("new tab", Action::Key("ctrl+t".into())).instant(),
        CommandDefinition::new("new window", Action::Key("ctrl+n".into())).instant(),
        CommandDefinition::new("press tab", Action::Key("tab".into())).instant(),
        CommandDefinition::new("search", Action::BrowserSearch).content(),
        CommandDefinition::new("google", Action::BrowserSearch).content(),
        CommandDefinition::new("delta", Action::None)
            .content()
            .content_substitution(ContentSubstitution::Delta),
        CommandDefinition::new("wait", Action::Wait).content(),
        CommandDefinition::new("raw text", Action::None)
            .content()
            .content_substitution(ContentSubstitution::RawTextPassthrough)
            .no_scan(),
    ]
}

/// Build the effective command list: defaults (minus disabled, with
/// overrides renaming triggers) plus custom commands from settings.
pub fn build_commands(settings: &SettingsStore) -> Vec<CommandDefinition> {
    let disabled = settings.get_string_list("disabled_commands");
    let overrides = settings.get_string_map("builtin_overrides");

    let mut commands = Vec::new();

    for mut def in default_commands() {
        if disabled.iter().any(|d| d.eq_ignore_ascii_case(&def.trigger)) {
            continue;
        }
        if let Some(renamed) = overrides.get(&def.trigger) {
            let renamed = renamed.trim().to_lowercase();
            if renamed.is_empty() {
                continue;
            }
            def.trigger = renamed;
        }
        commands.push(def);
    }

    for custom in settings.get_string_list_of_objects("custom_commands") {
        let enabled = custom
            .get("enabled")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        if !enabled {
            continue;
        }
        let (Some(trigger), Some(value)) = (
            custom.get("trigger").and_then(|v| v.as_str()),
            custom.get("value").and_then(|v| v.as_str()),
        ) else {
            continue;
        };
        let requires_end = custom
            .get("requires_end")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if commands
            .iter()
            .any(|c| c.trigger.eq_ignore_ascii_case(trigger))
        {
            tracing::warn!(
                "Custom command trigger '{}' duplicates an existing command, ignoring it",
                trigger
            );
            continue;
        }

        let mut def = CommandDefinition::new(trigger, Action::Macro(value.to_string()))
            .category("custom");
        def.requires_content = requires_end;
        def.requires_end = requires_end;
        commands.push(def);
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_commands_include_copy_and_delta() {
        let defs = default_commands();
        assert!(defs.iter().any(|d| d.trigger == "copy" && !d.requires_end));
        assert!(defs.iter().any(|d| d.trigger == "delta" && d.requires_content));
    }

    #[test]
    fn build_commands_honors_disabled_list() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.json")).unwrap();
        store
            .set("disabled_commands", serde_json::json!(["copy"]))
            .unwrap();
        let commands = build_commands(&store);
        assert!(!commands.iter().any(|c| c.trigger == "copy"));
    }

    #[test]
    fn build_commands_honors_overrides() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.json")).unwrap();
        store
            .set(
                "builtin_overrides",
                serde_json::json!({"copy": "duplicate"}),
            )
            .unwrap();
        let commands = build_commands(&store);
        assert!(commands.iter().any(|c| c.trigger == "duplicate"));
        assert!(!commands.iter().any(|c| c.trigger == "copy"));
    }

    #[test]
    fn build_commands_rejects_duplicate_custom_trigger() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.json")).unwrap();
        store
            .set(
                "custom_commands",
                serde_json::json!([
                    {"trigger": "copy", "value": "<ctrl+shift+c>"},
                    {"trigger": "greet", "value": "hello"},
                    {"trigger": "Greet", "value": "hello again"},
                ]),
            )
            .unwrap();
        let commands = build_commands(&store);

        assert_eq!(commands.iter().filter(|c| c.trigger == "copy").count(), 1);
        assert!(matches!(
            commands.iter().find(|c| c.trigger == "copy").unwrap().action,
            Action::Key(_)
        ));
        assert_eq!(
            commands
                .iter()
                .filter(|c| c.trigger.eq_ignore_ascii_case("greet"))
                .count(),
            1
        );
    }
}
