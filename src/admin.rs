use serde_json::Value;
use tracing::{error, info};

use crate::channels::CHANNEL_MARKER;
use crate::error::BotError;
use crate::membership::ChatMembers;
use crate::state::AppState;

/// Result of a successful `/admin` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelUpdate {
    pub previous: Vec<String>,
    pub current: Vec<String>,
}

/// Run the `/admin <password> <json>` workflow for `caller`.
///
/// Steps run in order and the first failure aborts: argument split, JSON
/// parse, password, channel validation, bot privilege in every channel.
/// Only after all of them pass is the channel list replaced and the caller
/// made an admin.
pub async fn update_channels(
    state: &AppState,
    members: &dyn ChatMembers,
    caller: u64,
    args: &str,
) -> Result<ChannelUpdate, BotError> {
    let (password, raw_channels) = split_args(args)?;

    let candidate: Value = serde_json::from_str(raw_channels).map_err(|e| {
        error!("Invalid /admin input from user {}: {}", caller, e);
        BotError::Format
    })?;

    if password != state.config.admin.password {
        info!("Invalid password attempt for /admin by user {}", caller);
        return Err(BotError::Auth);
    }

    let channels = validate_channels(&candidate).inspect_err(|_| {
        info!("Invalid channels format by user {}: {}", caller, candidate);
    })?;

    verify_bot_privileges(members, state.bot_user_id, &channels).await?;

    let previous = state.channels.replace(channels.clone()).await;
    state.admins.grant(caller).await;
    info!(
        "Admin {} updated required channels from {:?} to {:?}",
        caller, previous, channels
    );

    Ok(ChannelUpdate {
        previous,
        current: channels,
    })
}

/// Split `<password><whitespace><rest>`.
fn split_args(args: &str) -> Result<(&str, &str), BotError> {
    let args = args.trim();
    if args.is_empty() {
        return Err(BotError::Usage);
    }

    let (password, rest) = args
        .split_once(char::is_whitespace)
        .ok_or(BotError::Format)?;
    let rest = rest.trim_start();
    if rest.is_empty() {
        return Err(BotError::Format);
    }
    Ok((password, rest))
}

/// Accept only an array of strings that all start with the marker.
/// Any bad element rejects the whole list.
pub fn validate_channels(candidate: &Value) -> Result<Vec<String>, BotError> {
    let items = candidate.as_array().ok_or(BotError::Validation)?;
    items
        .iter()
        .map(|item| match item.as_str() {
            Some(channel) if channel.starts_with(CHANNEL_MARKER) => Ok(channel.to_string()),
            _ => Err(BotError::Validation),
        })
        .collect()
}

/// The bot must be an administrator or the creator of every channel,
/// otherwise it cannot see who joined. Stops at the first failing channel.
async fn verify_bot_privileges(
    members: &dyn ChatMembers,
    bot_user_id: u64,
    channels: &[String],
) -> Result<(), BotError> {
    for channel in channels {
        match members.member_status(channel, bot_user_id).await {
            Ok(status) if status.is_privileged() => {}
            Ok(status) => {
                info!("Bot is not admin in {} ({:?})", channel, status);
                return Err(BotError::Privilege {
                    channel: channel.clone(),
                });
            }
            Err(e) => {
                error!("Failed to verify bot admin status in {}: {:#}", channel, e);
                return Err(BotError::PrivilegeCheck {
                    channel: channel.clone(),
                });
            }
        }
    }
    Ok(())
}
