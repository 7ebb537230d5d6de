use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::dispatching::ShutdownToken;
use teloxide::prelude::*;
use teloxide::types::{
    ChatMemberStatus, InlineKeyboardButton, InlineKeyboardMarkup, LinkPreviewOptions, ParseMode,
    Recipient,
};
use tracing::{debug, error, info, warn};

use crate::bot::{self, Command};
use crate::markup::MarkupMode;
use crate::membership::{ChatMembers, MemberStatus};
use crate::platform::Reply;
use crate::state::AppState;

#[async_trait]
impl ChatMembers for Bot {
    async fn member_status(&self, channel: &str, user_id: u64) -> Result<MemberStatus> {
        let member = self
            .get_chat_member(Recipient::ChannelUsername(channel.to_string()), UserId(user_id))
            .await?;
        Ok(MemberStatus::from(member.status()))
    }
}

impl From<ChatMemberStatus> for MemberStatus {
    fn from(status: ChatMemberStatus) -> Self {
        match status {
            ChatMemberStatus::Owner => MemberStatus::Creator,
            ChatMemberStatus::Administrator => MemberStatus::Administrator,
            ChatMemberStatus::Member => MemberStatus::Member,
            ChatMemberStatus::Restricted => MemberStatus::Restricted,
            ChatMemberStatus::Banned => MemberStatus::Kicked,
            _ => MemberStatus::Left,
        }
    }
}

#[allow(deprecated)]
fn parse_mode(markup: MarkupMode) -> ParseMode {
    match markup {
        MarkupMode::MarkdownV2 => ParseMode::MarkdownV2,
        MarkupMode::Markdown => ParseMode::Markdown,
    }
}

fn keyboard(reply: &Reply) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(reply.buttons.iter().map(|button| {
        vec![InlineKeyboardButton::callback(
            button.label.clone(),
            button.data.clone(),
        )]
    }))
}

async fn send_reply(bot: &Bot, chat_id: ChatId, reply: Reply) -> ResponseResult<Message> {
    let mut request = bot
        .send_message(chat_id, reply.text.clone())
        .parse_mode(parse_mode(reply.markup));
    if !reply.buttons.is_empty() {
        request = request.reply_markup(keyboard(&reply));
    }
    if !reply.link_preview {
        request = request.link_preview_options(LinkPreviewOptions {
            is_disabled: true,
            url: None,
            prefer_small_media: false,
            prefer_large_media: false,
            show_above_text: false,
        });
    }
    request.await
}

/// Send `reply`; if Telegram refuses it, log and fall back to a generic error.
async fn deliver(bot: &Bot, chat_id: ChatId, reply: Reply) -> ResponseResult<()> {
    if let Err(e) = send_reply(bot, chat_id, reply).await {
        error!("Failed to send reply to chat {}: {}", chat_id.0, e);
        send_reply(bot, chat_id, bot::internal_error()).await?;
    }
    Ok(())
}

/// Run the Telegram bot until Ctrl-C or SIGTERM.
pub async fn run(state: Arc<AppState>, bot: Bot) -> Result<()> {
    info!("Starting Telegram platform...");

    let handler = dptree::entry()
        .filter_async(rate_limit_gate)
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build();

    listen_for_sigterm(dispatcher.shutdown_token());
    dispatcher.dispatch().await;

    info!("Telegram platform stopped");
    Ok(())
}

#[cfg(unix)]
fn listen_for_sigterm(token: ShutdownToken) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                return;
            }
        };
        terminate.recv().await;
        info!("Received SIGTERM, stopping dispatcher");
        match token.shutdown() {
            Ok(done) => done.await,
            Err(_) => debug!("Dispatcher was not running"),
        }
    });
}

#[cfg(not(unix))]
fn listen_for_sigterm(_token: ShutdownToken) {}

/// Every update with a sender counts against that sender's limit. Rejected
/// updates get the notice and go no further.
async fn rate_limit_gate(bot: Bot, upd: Update, state: Arc<AppState>) -> bool {
    let Some(user) = upd.from() else {
        return true;
    };
    if state.rate_limiter.acquire(user.id.0).await {
        return true;
    }

    if let Some(chat) = upd.chat() {
        if let Err(e) = send_reply(&bot, chat.id, bot::rate_limited()).await {
            error!("Failed to send rate limit notice: {}", e);
        }
    }
    false
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let user_id = match msg.from.as_ref() {
        Some(user) => user.id.0,
        None => return Ok(()),
    };

    info!("Telegram command /{} from {}", cmd_name(&cmd), user_id);

    let reply = bot::handle_command(&state, &bot, user_id, cmd).await;
    deliver(&bot, msg.chat.id, reply).await
}

async fn handle_callback(bot: Bot, q: CallbackQuery) -> ResponseResult<()> {
    let reply = q.data.as_deref().and_then(bot::handle_callback);
    let chat_id = q.message.as_ref().map(|m| m.chat().id);

    if let (Some(reply), Some(chat_id)) = (reply, chat_id) {
        deliver(&bot, chat_id, reply).await?;
    }
    bot.answer_callback_query(q.id).await?;
    Ok(())
}

/// Command name for logs; `/admin` arguments carry the password.
fn cmd_name(cmd: &Command) -> &'static str {
    match cmd {
        Command::Start => "start",
        Command::Help => "help",
        Command::Book(_) => "book",
        Command::Admin(_) => "admin",
        Command::Vpn => "vpn",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            MemberStatus::from(ChatMemberStatus::Owner),
            MemberStatus::Creator
        );
        assert_eq!(
            MemberStatus::from(ChatMemberStatus::Banned),
            MemberStatus::Kicked
        );
        assert_eq!(MemberStatus::from(ChatMemberStatus::Left), MemberStatus::Left);
        assert!(MemberStatus::from(ChatMemberStatus::Member).is_subscribed());
    }

    #[test]
    fn test_keyboard_one_button_per_row() {
        let reply = Reply::escaped(MarkupMode::MarkdownV2, "pick")
            .with_button("A", "a")
            .with_button("B", "b");
        let markup = keyboard(&reply);
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert!(markup.inline_keyboard.iter().all(|row| row.len() == 1));
    }

    #[test]
    fn test_admin_args_not_logged() {
        assert_eq!(cmd_name(&Command::Admin("secret [\"@a\"]".to_string())), "admin");
    }
}
