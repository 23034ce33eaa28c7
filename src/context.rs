use std::sync::Arc;

use crate::{
    commands::{Arguments, Command},
    dispatch::Framework,
    error::{PaginatorError, PlatformError},
    model::{ChannelId, GuildId, Member, Message, User},
    paginator::{PaginatorHandle, PaginatorOptions},
    platform::Platform,
};

/// Everything a handler or check needs to know about one invocation.
///
/// Created per dispatched message and dropped once the handler finishes.
#[derive(Clone)]
pub struct Context {
    /// The framework that dispatched this invocation
    pub framework: Framework,
    /// The message that invoked the command
    pub message: Arc<Message>,
    /// The command being run (the subcommand, for groups)
    pub command: Arc<Command>,
    /// Converted arguments; empty until argument parsing has run
    pub args: Arguments,
    /// The prefix exactly as it appeared in the message
    pub prefix: String,
    /// The caller as a guild member (None in private channels)
    pub member: Option<Member>,
}

impl Context {
    pub fn author(&self) -> &User {
        &self.message.author
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.message.channel_id
    }

    pub fn guild_id(&self) -> Option<&GuildId> {
        self.message.guild_id.as_ref()
    }

    pub fn in_guild(&self) -> bool {
        self.message.guild_id.is_some()
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        self.framework.platform()
    }

    /// The application's own membership in the invoking guild.
    pub fn app_member(&self) -> Option<Member> {
        let guild = self.guild_id()?;
        let me = self.platform().current_user()?;
        self.platform().member(guild, &me.id)
    }

    /// Sends a message to the invoking channel.
    pub async fn reply(&self, content: &str) -> Result<Message, PlatformError> {
        self.platform().send_message(self.channel_id(), content).await
    }

    pub async fn paginate(
        &self,
        options: PaginatorOptions,
    ) -> Result<PaginatorHandle, PaginatorError> {
        crate::paginator::start(self, options).await
    }

    pub fn usage(&self) -> String {
        self.command.usage(&self.prefix)
    }
}
