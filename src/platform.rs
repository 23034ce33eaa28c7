use async_trait::async_trait;

use crate::{
    error::PlatformError,
    model::{Channel, ChannelId, GuildId, Member, Message, MessageId, User, UserId},
};

/// The chat platform as seen by the dispatch core.
///
/// Lookups are served from whatever the platform has cached and never block;
/// actions go over the wire.
#[async_trait]
pub trait Platform: Send + Sync + 'static {
    /// The application's own user, once known.
    fn current_user(&self) -> Option<User>;
    fn user(&self, id: &UserId) -> Option<User>;
    fn users(&self) -> Vec<User>;
    fn member(&self, guild: &GuildId, user: &UserId) -> Option<Member>;
    fn members(&self, guild: &GuildId) -> Vec<Member>;
    fn channels(&self, guild: &GuildId) -> Vec<Channel>;

    async fn send_message(&self, channel: &ChannelId, content: &str)
    -> Result<Message, PlatformError>;
    async fn edit_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        content: &str,
    ) -> Result<(), PlatformError>;
    async fn delete_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), PlatformError>;
    async fn add_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError>;
    async fn remove_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
        user: &UserId,
    ) -> Result<(), PlatformError>;
    async fn remove_all_reactions(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), PlatformError>;
}
