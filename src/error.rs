use std::path::PathBuf;

/// Errors raised while handling a user request.
///
/// The `Display` text of the user-facing variants is what the bot replies
/// with, so keep them readable without the log context.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Please provide a password and channels. Example: /admin <password> [\"@channel1\",\"@channel2\"]")]
    Usage,

    #[error("❌ Invalid format. Use: /admin <password> [\"@channel1\",\"@channel2\"]")]
    Format,

    #[error("❌ Invalid password.")]
    Auth,

    #[error("❌ Channels must be an array of valid Telegram usernames starting with @.")]
    Validation,

    #[error("❌ Bot must be an admin in {channel}. Please add the bot as an admin and try again.")]
    Privilege { channel: String },

    #[error("❌ Error verifying bot admin status in {channel}. Ensure the channel is public and the bot is an admin.")]
    PrivilegeCheck { channel: String },

    #[error("Failed to fetch books: {status}")]
    Catalog { status: String },

    #[error("Failed to access {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid channel list in {}: {source}", path.display())]
    ChannelFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl BotError {
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_message_names_channel() {
        let err = BotError::Privilege {
            channel: "@news".to_string(),
        };
        assert!(err.to_string().contains("@news"));
    }

    #[test]
    fn test_persistence_message_includes_path() {
        let err = BotError::persistence(
            "channels.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let text = err.to_string();
        assert!(text.contains("channels.json"));
        assert!(text.contains("denied"));
    }
}
