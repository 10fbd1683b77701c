//! Per-chat output format preferences, kept for the life of the process.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::RwLock;

/// Reply when `!output` names an unsupported format.
pub const DEFAULT_OUTPUT_MESSAGE: &str = "Using messages by default.";

/// How lookup results are delivered to a chat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Inline reply (the default).
    #[default]
    Messages,
    /// `info.txt` attachment.
    Txt,
    /// `info.json` attachment.
    Json,
    /// Accepted and stored, delivered inline like `Messages`.
    Html,
}

impl OutputFormat {
    /// Parse a user choice; only the selectable formats are accepted.
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice {
            "txt" => Some(OutputFormat::Txt),
            "json" => Some(OutputFormat::Json),
            "html" => Some(OutputFormat::Html),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Messages => "messages",
            OutputFormat::Txt => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Html => "html",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The argument of an `!output` message: text after the first `"!output "`,
/// lower-cased and trimmed. Empty when there is no argument.
pub fn output_argument(raw_text: &str) -> String {
    raw_text
        .to_lowercase()
        .split_once("!output ")
        .map(|(_, rest)| rest.trim().to_string())
        .unwrap_or_default()
}

/// Chat id → preferred output format.
#[derive(Debug, Default)]
pub struct PreferenceStore {
    entries: RwLock<HashMap<i64, OutputFormat>>,
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle an `!output` message and return the confirmation text.
    ///
    /// Unsupported values leave any stored preference untouched.
    pub async fn set_preference(&self, chat_id: i64, raw_text: &str) -> String {
        let choice = output_argument(raw_text);
        match OutputFormat::from_choice(&choice) {
            Some(format) => {
                self.entries.write().await.insert(chat_id, format);
                tracing::info!(chat_id = %chat_id, format = %format, "output preference saved");
                format!("{} saved as your preferred output.", choice.to_uppercase())
            }
            None => {
                tracing::debug!(chat_id = %chat_id, choice = %choice, "unsupported output format");
                DEFAULT_OUTPUT_MESSAGE.to_string()
            }
        }
    }

    /// Stored preference, or `Messages` when none was set.
    pub async fn get_preference(&self, chat_id: i64) -> OutputFormat {
        self.entries
            .read()
            .await
            .get(&chat_id)
            .copied()
            .unwrap_or_default()
    }
}
