use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

/// Built-in quick actions offered when no command list is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum QuickAction {
    /// Generate a UI from a screenshot
    Clone,
    /// Import a design from Figma
    Figma,
    /// Generate a new web page
    Page,
    /// Improve existing UI design
    Improve,
}

impl QuickAction {
    pub fn label(self) -> &'static str {
        match self {
            QuickAction::Clone => "Clone UI",
            QuickAction::Figma => "Import Figma",
            QuickAction::Page => "Create Page",
            QuickAction::Improve => "Improve",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            QuickAction::Clone => "Generate a UI from a screenshot",
            QuickAction::Figma => "Import a design from Figma",
            QuickAction::Page => "Generate a new web page",
            QuickAction::Improve => "Improve existing UI design",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// One entry of the slash-command palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSuggestion {
    /// Unique, starts with `/`
    pub prefix: String,
    pub label: String,
    pub description: String,
}

impl CommandSuggestion {
    pub fn new(
        prefix: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            label: label.into(),
            description: description.into(),
        }
    }

    /// Buffer contents after the suggestion is committed.
    pub fn committed_text(&self) -> String {
        format!("{} ", self.prefix)
    }
}

impl From<QuickAction> for CommandSuggestion {
    fn from(action: QuickAction) -> Self {
        CommandSuggestion::new(
            format!("/{}", action.command()),
            action.label(),
            action.description(),
        )
    }
}

/// Built-in command list, one entry per [`QuickAction`] in declaration order.
pub static DEFAULT_SUGGESTIONS: Lazy<Vec<CommandSuggestion>> =
    Lazy::new(|| QuickAction::iter().map(CommandSuggestion::from).collect());

pub fn default_suggestions() -> Vec<CommandSuggestion> {
    DEFAULT_SUGGESTIONS.clone()
}

/// A submitted message that begins with a known command prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub suggestion: &'a CommandSuggestion,
    pub argument: Option<String>,
}

/// Match a submitted message against the command list. The head must equal a prefix exactly.
pub fn parse_slash_command<'a>(
    input: &str,
    suggestions: &'a [CommandSuggestion],
) -> Option<ParsedCommand<'a>> {
    let input = input.trim_start();
    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input.split_whitespace();
    let head = parts.next()?;
    let suggestion = suggestions.iter().find(|s| s.prefix == head)?;

    let rest: Vec<&str> = parts.collect();
    let argument = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };

    Some(ParsedCommand {
        suggestion,
        argument,
    })
}

/// Get help text for all available commands
pub fn get_help_text(suggestions: &[CommandSuggestion]) -> String {
    let mut help = String::from("Available commands:\n\n");
    for suggestion in suggestions {
        help.push_str(&format!(
            "{:<10} {} - {}\n",
            suggestion.prefix, suggestion.label, suggestion.description
        ));
    }

    help.push_str("\nType / to open the palette, Up/Down to move, Tab or Enter to pick, Esc to close.");

    help
}
