use teloxide::utils::command::BotCommands;
use tracing::info;

use crate::admin;
use crate::catalog::format_books;
use crate::channels::CHANNEL_MARKER;
use crate::markup::{escape, escape_code, MarkupMode};
use crate::membership::{self, ChatMembers};
use crate::platform::Reply;
use crate::reward;
use crate::state::AppState;

/// Callback data of the `/start` buttons.
pub const BOOK_CALLBACK: &str = "book";
pub const VPN_CALLBACK: &str = "vpn";

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Show welcome message and options
    Start,
    /// Show the command reference
    Help,
    /// Search for book recommendations
    Book(String),
    /// Update required channels
    Admin(String),
    /// Get a VPN code
    Vpn,
}

/// Route a parsed command to its handler and build the reply.
pub async fn handle_command(
    state: &AppState,
    members: &dyn ChatMembers,
    user_id: u64,
    command: Command,
) -> Reply {
    match command {
        Command::Start => start(user_id),
        Command::Help => help(),
        Command::Book(query) => book(state, &query).await,
        Command::Admin(args) => admin_update(state, members, user_id, &args).await,
        Command::Vpn => vpn(state, members, user_id).await,
    }
}

/// Reply for one of the `/start` buttons; unknown data gets none.
pub fn handle_callback(data: &str) -> Option<Reply> {
    let text = match data {
        BOOK_CALLBACK => "Enter a book query with /book <query>. Example: /book javascript",
        VPN_CALLBACK => "To get a VPN code, use /vpn",
        _ => return None,
    };
    Some(Reply::escaped(MarkupMode::MarkdownV2, text))
}

pub fn rate_limited() -> Reply {
    Reply::escaped(
        MarkupMode::MarkdownV2,
        "🚫 Too many requests. Please try again later.",
    )
}

/// Sent when a reply could not be delivered.
pub fn internal_error() -> Reply {
    Reply::escaped(
        MarkupMode::MarkdownV2,
        "⚠️ An error occurred. Please try again later.",
    )
}

fn start(user_id: u64) -> Reply {
    info!("Processing /start for user {}", user_id);
    Reply::escaped(
        MarkupMode::MarkdownV2,
        "👋 Welcome to the Book Advice Bot!\n\
         I can recommend books and provide VPN codes after channel subscriptions.\n\n\
         Choose an option below:",
    )
    .with_button("📚 Books", BOOK_CALLBACK)
    .with_button("🌐 VPN", VPN_CALLBACK)
}

fn help() -> Reply {
    let body = escape(
        MarkupMode::MarkdownV2,
        "/start - Show welcome message and options\n\
         /book <query> - Search for book recommendations (e.g., /book javascript)\n\
         /vpn - Get a VPN code (requires channel subscriptions)\n\
         /admin <password> <channels> - Update required channels (e.g., /admin <password> [\"@channel1\",\"@channel2\"])\n\
         /help - Show this message",
    );
    Reply::formatted(
        MarkupMode::MarkdownV2,
        format!("📖 *Book Advice Bot Commands* 📖\n\n{}", body),
    )
}

async fn book(state: &AppState, query: &str) -> Reply {
    let query = query.trim();
    if query.is_empty() {
        return Reply::escaped(
            MarkupMode::MarkdownV2,
            "Please provide a search query. Example: /book javascript",
        );
    }

    match state
        .catalog
        .search(query, state.catalog.max_results())
        .await
    {
        Ok(books) => {
            Reply::formatted(MarkupMode::MarkdownV2, format_books(&books)).without_link_preview()
        }
        Err(e) => Reply::escaped(
            MarkupMode::MarkdownV2,
            &format!("⚠️ {}. Please try again.", e),
        ),
    }
}

async fn admin_update(
    state: &AppState,
    members: &dyn ChatMembers,
    user_id: u64,
    args: &str,
) -> Reply {
    let text = match admin::update_channels(state, members, user_id, args).await {
        Ok(update) => format!(
            "✅ You are now an admin! Required channels updated from [{}] to [{}]",
            update.previous.join(", "),
            update.current.join(", ")
        ),
        Err(e) => e.to_string(),
    };
    Reply::escaped(MarkupMode::MarkdownV2, &text)
}

async fn vpn(state: &AppState, members: &dyn ChatMembers, user_id: u64) -> Reply {
    if state.admins.contains(user_id).await {
        info!("Processing /vpn for admin {}", user_id);
        return vpn_code("admin status");
    }

    let channels = state.channels.list().await;
    info!("Processing /vpn for user {}, channels={:?}", user_id, channels);

    let report = membership::check(members, user_id, &channels).await;
    if report.subscribed {
        return vpn_code("channel subscriptions");
    }

    let links: Vec<String> = report
        .failing
        .iter()
        .map(|channel| {
            format!(
                "{}: {}",
                escape(MarkupMode::Markdown, channel),
                escape(
                    MarkupMode::Markdown,
                    &join_link(&state.config.telegram.join_url_base, channel)
                )
            )
        })
        .collect();
    let response = format!(
        "Please subscribe to the following channels to get a VPN code:\n\n{}\n\n\
         After subscribing, try /vpn again.",
        links.join("\n")
    );
    info!("Sending /vpn response to user {}: {}", user_id, response);
    Reply::formatted(MarkupMode::Markdown, response)
}

fn vpn_code(reason: &str) -> Reply {
    let code = reward::generate();
    Reply::formatted(
        MarkupMode::MarkdownV2,
        format!(
            "🌐 *VPN Code* 🌐\n\nYour code: `{}`\n\n{}",
            escape_code(&code),
            escape(
                MarkupMode::MarkdownV2,
                &format!("Use it to activate your VPN!\n(Granted due to {})", reason)
            )
        ),
    )
}

/// Public join URL for a channel reference like `@name`.
pub fn join_link(base: &str, channel: &str) -> String {
    let name = channel.strip_prefix(CHANNEL_MARKER).unwrap_or(channel);
    format!("{}{}", base, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ChannelStore;
    use crate::config::Config;
    use crate::membership::{MemberStatus, StaticMembers};
    use crate::reward::is_well_formed;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BOT_ID: u64 = 999;
    const USER: u64 = 42;

    async fn test_state(dir: &tempfile::TempDir, catalog_url: Option<String>) -> AppState {
        let mut config = Config::default();
        config.admin.password = "secret".to_string();
        if let Some(url) = catalog_url {
            config.catalog.base_url = url;
        }
        let channels = ChannelStore::load(dir.path().join("channels.json")).await;
        AppState::new(config, channels, BOT_ID)
    }

    /// Text between the first pair of backticks.
    fn extract_code(text: &str) -> Option<&str> {
        let start = text.find('`')? + 1;
        let end = start + text[start..].find('`')?;
        Some(&text[start..end])
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/start", "bookbot").unwrap(), Command::Start);
        assert_eq!(Command::parse("/vpn", "bookbot").unwrap(), Command::Vpn);
        assert_eq!(
            Command::parse("/book rust in action", "bookbot").unwrap(),
            Command::Book("rust in action".to_string())
        );
        assert_eq!(
            Command::parse(r#"/admin secret ["@a", "@b"]"#, "bookbot").unwrap(),
            Command::Admin(r#"secret ["@a", "@b"]"#.to_string())
        );
        assert!(Command::parse("/unknown", "bookbot").is_err());
    }

    #[test]
    fn test_start_offers_two_buttons() {
        let reply = start(USER);
        let data: Vec<&str> = reply.buttons.iter().map(|b| b.data.as_str()).collect();
        assert_eq!(data, vec![BOOK_CALLBACK, VPN_CALLBACK]);
        assert_eq!(reply.markup, MarkupMode::MarkdownV2);
        assert!(reply.text.contains("Welcome to the Book Advice Bot\\!"));
    }

    #[test]
    fn test_callbacks() {
        let book = handle_callback(BOOK_CALLBACK).unwrap();
        assert!(book.text.contains("Example: /book javascript"));
        let vpn = handle_callback(VPN_CALLBACK).unwrap();
        assert!(vpn.text.contains("use /vpn"));
        assert!(handle_callback("other").is_none());
    }

    #[test]
    fn test_help_lists_commands() {
        let reply = help();
        for command in ["/start", "/book", "/vpn", "/admin", "/help"] {
            assert!(reply.text.contains(command), "missing {}", command);
        }
        assert!(reply.text.starts_with("📖 *Book Advice Bot Commands* 📖"));
    }

    #[test]
    fn test_join_link() {
        assert_eq!(join_link("https://t.me/", "@my_chan"), "https://t.me/my_chan");
    }

    #[tokio::test]
    async fn test_book_without_query_shows_usage() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, None).await;

        let reply = book(&state, "   ").await;
        assert_eq!(
            reply.text,
            "Please provide a search query\\. Example: /book javascript"
        );
    }

    #[tokio::test]
    async fn test_book_empty_result_says_no_books() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "totalItems": 0 })))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, Some(server.uri())).await;

        let reply = handle_command(
            &state,
            &StaticMembers::default(),
            USER,
            Command::Book("nothing matches".to_string()),
        )
        .await;

        assert_eq!(reply.text, "No books found\\. Try a different query\\.");
        assert!(!reply.link_preview);
    }

    #[tokio::test]
    async fn test_book_catalog_error_is_apologetic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, Some(server.uri())).await;

        let reply = book(&state, "rust").await;
        assert_eq!(
            reply.text,
            "⚠️ Failed to fetch books: 500\\. Please try again\\."
        );
    }

    #[tokio::test]
    async fn test_admin_wrong_password_reply() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, None).await;

        let reply = handle_command(
            &state,
            &StaticMembers::default(),
            USER,
            Command::Admin(r#"wrongpass ["@a"]"#.to_string()),
        )
        .await;

        assert_eq!(reply.text, "❌ Invalid password\\.");
        assert!(state.channels.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_admin_success_reply() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, None).await;
        let members = StaticMembers::default();
        members.set("@a", BOT_ID, MemberStatus::Administrator);
        members.set("@b", BOT_ID, MemberStatus::Administrator);

        let reply = handle_command(
            &state,
            &members,
            USER,
            Command::Admin(r#"secret ["@a","@b"]"#.to_string()),
        )
        .await;

        assert_eq!(
            reply.text,
            "✅ You are now an admin\\! Required channels updated from \\[\\] to \\[@a, @b\\]"
        );
        assert_eq!(state.channels.list().await, vec!["@a", "@b"]);
        assert!(state.admins.contains(USER).await);
    }

    #[tokio::test]
    async fn test_vpn_requires_subscription_then_grants() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, None).await;
        state.channels.replace(vec!["@a".to_string()]).await;
        let members = StaticMembers::default();
        members.set("@a", USER, MemberStatus::Left);

        let reply = handle_command(&state, &members, USER, Command::Vpn).await;
        assert_eq!(reply.markup, MarkupMode::Markdown);
        assert!(reply.text.contains("@a: https://t.me/a"));
        assert!(reply.text.contains("try /vpn again"));
        assert!(!reply.text.contains(reward::CODE_PREFIX));

        members.set("@a", USER, MemberStatus::Member);
        let reply = handle_command(&state, &members, USER, Command::Vpn).await;
        assert_eq!(reply.markup, MarkupMode::MarkdownV2);
        let code = extract_code(&reply.text).unwrap();
        assert!(is_well_formed(code), "bad code: {}", code);
        assert!(reply.text.contains("channel subscriptions"));
    }

    #[tokio::test]
    async fn test_vpn_lists_every_failing_channel_in_legacy_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, None).await;
        state
            .channels
            .replace(vec!["@news_feed".to_string(), "@ok".to_string(), "@gone".to_string()])
            .await;
        let members = StaticMembers::default();
        members.set("@ok", USER, MemberStatus::Member);
        members.set("@news_feed", USER, MemberStatus::Kicked);

        let reply = vpn(&state, &members, USER).await;

        assert!(reply
            .text
            .contains("@news\\_feed: https://t.me/news\\_feed\n@gone: https://t.me/gone"));
        assert!(!reply.text.contains("@ok"));
    }

    #[tokio::test]
    async fn test_vpn_join_links_have_no_open_underscores() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, None).await;
        state
            .channels
            .replace(vec!["@Turkmen_Shadowsocks".to_string()])
            .await;
        let members = StaticMembers::default();
        members.set("@Turkmen_Shadowsocks", USER, MemberStatus::Left);

        let reply = vpn(&state, &members, USER).await;

        assert_eq!(reply.markup, MarkupMode::Markdown);
        assert!(reply.text.contains("https://t.me/Turkmen\\_Shadowsocks"));
        let chars: Vec<char> = reply.text.chars().collect();
        let bare = chars
            .iter()
            .enumerate()
            .filter(|&(i, &c)| c == '_' && (i == 0 || chars[i - 1] != '\\'))
            .count();
        assert_eq!(bare, 0, "{}", reply.text);
    }

    #[tokio::test]
    async fn test_vpn_without_required_channels() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, None).await;

        let reply = vpn(&state, &StaticMembers::default(), USER).await;
        assert!(is_well_formed(extract_code(&reply.text).unwrap()));
    }

    #[tokio::test]
    async fn test_vpn_admin_skips_checks() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, None).await;
        state.channels.replace(vec!["@a".to_string()]).await;
        state.admins.grant(USER).await;

        // No membership data at all: any lookup would fail
        let reply = vpn(&state, &StaticMembers::default(), USER).await;

        assert!(is_well_formed(extract_code(&reply.text).unwrap()));
        assert!(reply.text.contains("admin status"));
    }

    #[test]
    fn test_rate_limited_notice() {
        assert_eq!(
            rate_limited().text,
            "🚫 Too many requests\\. Please try again later\\."
        );
    }
}
