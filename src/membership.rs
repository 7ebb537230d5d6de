use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

/// A user's standing in a chat, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MemberStatus {
    /// Counts as a subscriber of the channel.
    pub fn is_subscribed(self) -> bool {
        matches!(self, Self::Creator | Self::Administrator | Self::Member)
    }

    /// Holds elevated rights in the channel.
    pub fn is_privileged(self) -> bool {
        matches!(self, Self::Creator | Self::Administrator)
    }
}

/// Membership lookups against the messaging platform.
#[async_trait]
pub trait ChatMembers: Send + Sync {
    async fn member_status(&self, channel: &str, user_id: u64) -> Result<MemberStatus>;
}

/// Outcome of a subscription check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionReport {
    pub subscribed: bool,
    /// Channels the user is not subscribed to, in the order they were checked.
    pub failing: Vec<String>,
}

/// Check `user_id` against every channel in order.
///
/// A failed lookup counts as "not subscribed" for that channel and does not
/// stop the remaining checks. No channels means everyone passes.
pub async fn check(
    members: &dyn ChatMembers,
    user_id: u64,
    channels: &[String],
) -> SubscriptionReport {
    if channels.is_empty() {
        info!("No channels required; granting VPN code access");
        return SubscriptionReport {
            subscribed: true,
            failing: Vec::new(),
        };
    }

    let mut failing = Vec::new();
    for channel in channels {
        match members.member_status(channel, user_id).await {
            Ok(status) if status.is_subscribed() => {
                info!("User {} is subscribed to {}", user_id, channel);
            }
            Ok(status) => {
                info!(
                    "User {} is not subscribed to {} ({:?})",
                    user_id, channel, status
                );
                failing.push(channel.clone());
            }
            Err(e) => {
                error!("Failed to check subscription for {}: {:#}", channel, e);
                failing.push(channel.clone());
            }
        }
    }

    let report = SubscriptionReport {
        subscribed: failing.is_empty(),
        failing,
    };
    info!(
        "User {} subscription check: subscribed={}, failing={:?}",
        user_id, report.subscribed, report.failing
    );
    report
}

/// In-memory membership table for tests; unknown pairs fail the lookup.
#[cfg(test)]
#[derive(Default)]
pub struct StaticMembers {
    statuses: std::sync::Mutex<std::collections::HashMap<(String, u64), MemberStatus>>,
}

#[cfg(test)]
impl StaticMembers {
    pub fn set(&self, channel: &str, user_id: u64, status: MemberStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert((channel.to_string(), user_id), status);
    }
}

#[cfg(test)]
#[async_trait]
impl ChatMembers for StaticMembers {
    async fn member_status(&self, channel: &str, user_id: u64) -> Result<MemberStatus> {
        self.statuses
            .lock()
            .unwrap()
            .get(&(channel.to_string(), user_id))
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Bad Request: chat not found"))
    }
}
