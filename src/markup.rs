use teloxide::utils::markdown;

/// Telegram markup dialect declared on an outgoing reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupMode {
    MarkdownV2,
    /// Legacy `Markdown` mode, only used where links must stay clickable on
    /// older mobile clients.
    Markdown,
}

/// teloxide only ships MarkdownV2 helpers, so legacy mode keeps its own set.
const MARKDOWN_SPECIAL: &[char] = &['_', '*', '`', '['];

/// Escape `text` for the given markup mode.
pub fn escape(mode: MarkupMode, text: &str) -> String {
    match mode {
        MarkupMode::MarkdownV2 => markdown::escape(text),
        MarkupMode::Markdown => escape_with(text, MARKDOWN_SPECIAL),
    }
}

/// Escape the target of a MarkdownV2 inline link, `[label](url)`.
/// Telegram wants `)` and `\` escaped here.
pub fn escape_link_url(url: &str) -> String {
    escape_with(url, &[')', '\\'])
}

/// Escape text placed inside a MarkdownV2 `code` entity.
pub fn escape_code(text: &str) -> String {
    markdown::escape_code(text)
}

fn escape_with(text: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
