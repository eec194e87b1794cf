//! Chat transcript model and the surface abstraction that displays it.

use scraper::Html;
use serde::{Deserialize, Serialize};

pub const PENDING_PLACEHOLDER_TEXT: &str = "Thinking...";
pub const ASSISTANT_LABEL_MARKUP: &str = "<strong>ATFOOD:</strong> ";
pub const FALLBACK_MESSAGE: &str = "Sorry - something broke. Try again in a second.";

pub const CHAT_CONTAINER_CLASS: &str = "atfood-chat";
pub const MESSAGE_LIST_CLASS: &str = "atfood-chat-messages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: Role,
    pub content: String,
    /// `true` when `content` is already-sanitized markup, `false` for plain text
    /// the surface must display literally.
    pub is_markup: bool,
}

impl TranscriptMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            is_markup: false,
        }
    }

    pub fn pending() -> Self {
        Self {
            role: Role::Assistant,
            content: PENDING_PLACEHOLDER_TEXT.to_string(),
            is_markup: false,
        }
    }

    /// What a reader sees: the text of the parsed markup, trimmed.
    pub fn text_content(&self) -> String {
        if !self.is_markup {
            return self.content.trim().to_string();
        }
        Html::parse_fragment(&self.content)
            .root_element()
            .text()
            .collect::<String>()
            .trim()
            .to_string()
    }
}

/// Final markup for an assistant message: label followed by rendered content.
pub fn assistant_markup(rendered: &str) -> String {
    format!("{ASSISTANT_LABEL_MARKUP}{rendered}")
}

/// A place that can hold one chat per mount point.
///
/// `Chat` is a reference to an ensured chat's message list. `Handle` refers to
/// one appended message and is consumed by [`TranscriptSurface::replace_pending`],
/// so a placeholder can be overwritten at most once.
pub trait TranscriptSurface {
    type Chat;
    type Handle;

    /// Returns the chat under `mount_point_id`, building it (and discarding any
    /// foreign content) when it is missing. `None` when the mount point does
    /// not exist.
    fn ensure_chat(&self, mount_point_id: &str) -> Option<Self::Chat>;

    /// Appends at the end of the message list and, for scrollable mount points,
    /// scrolls to the new message.
    fn append_message(&self, chat: &Self::Chat, message: TranscriptMessage)
    -> Option<Self::Handle>;

    fn replace_pending(&self, handle: Self::Handle, markup: &str);

    fn scroll_into_view(&self, mount_point_id: &str);
}

/// Source of the free-text the user typed before clicking a trigger.
pub trait TextInput {
    /// Reads the input, clears it, and returns the trimmed text. `None` when
    /// the input is missing or blank.
    fn take_text(&self, input_id: &str) -> Option<String>;
}
