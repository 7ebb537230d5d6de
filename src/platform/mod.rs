pub mod telegram;

use crate::markup::{escape, MarkupMode};

/// An outgoing message, independent of the transport.
///
/// `text` is already in the dialect named by `markup`; use [`Reply::escaped`]
/// for plain text so the two escaping modes never mix on one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub markup: MarkupMode,
    /// Inline keyboard, one button per row.
    pub buttons: Vec<ReplyButton>,
    pub link_preview: bool,
}

/// An inline button that posts `data` back as a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyButton {
    pub label: String,
    pub data: String,
}

impl Reply {
    /// Text that is already valid markup for `markup`.
    pub fn formatted(markup: MarkupMode, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup,
            buttons: Vec::new(),
            link_preview: true,
        }
    }

    /// Plain text, escaped for `markup`.
    pub fn escaped(markup: MarkupMode, text: &str) -> Self {
        Self::formatted(markup, escape(markup, text))
    }

    pub fn with_button(mut self, label: &str, data: &str) -> Self {
        self.buttons.push(ReplyButton {
            label: label.to_string(),
            data: data.to_string(),
        });
        self
    }

    pub fn without_link_preview(mut self) -> Self {
        self.link_preview = false;
        self
    }
}
