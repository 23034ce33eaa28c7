//! [`Platform`] over serenity's HTTP client and gateway cache.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::{
    all::{self as discord, Cache, EditMessage, Http, Permissions, ReactionType, RoleId},
    http::HttpError,
};

use crate::{
    error::PlatformError,
    model::{
        Channel, ChannelId, GuildId, Member, Message, MessageId, Permission, PermissionSet,
        ReactionEvent, User, UserId,
    },
    platform::Platform,
};

const PERMISSIONS: [(Permission, Permissions); 15] = [
    (Permission::Administrator, Permissions::ADMINISTRATOR),
    (Permission::ViewChannel, Permissions::VIEW_CHANNEL),
    (Permission::SendMessages, Permissions::SEND_MESSAGES),
    (Permission::ManageMessages, Permissions::MANAGE_MESSAGES),
    (Permission::EmbedLinks, Permissions::EMBED_LINKS),
    (Permission::AttachFiles, Permissions::ATTACH_FILES),
    (Permission::ReadMessageHistory, Permissions::READ_MESSAGE_HISTORY),
    (Permission::AddReactions, Permissions::ADD_REACTIONS),
    (Permission::MentionEveryone, Permissions::MENTION_EVERYONE),
    (Permission::KickMembers, Permissions::KICK_MEMBERS),
    (Permission::BanMembers, Permissions::BAN_MEMBERS),
    (Permission::ManageChannels, Permissions::MANAGE_CHANNELS),
    (Permission::ManageGuild, Permissions::MANAGE_GUILD),
    (Permission::ManageRoles, Permissions::MANAGE_ROLES),
    (Permission::ManageNicknames, Permissions::MANAGE_NICKNAMES),
];

pub struct SerenityPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl SerenityPlatform {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }

    fn guild_member(&self, guild: discord::GuildId, user: discord::UserId) -> Option<Member> {
        let guild = self.cache.guild(guild)?;
        let member = guild.members.get(&user)?;
        Some(convert_member(&guild, member))
    }
}

#[async_trait]
impl Platform for SerenityPlatform {
    fn current_user(&self) -> Option<User> {
        let me = self.cache.current_user();
        Some(convert_user(&me))
    }

    fn user(&self, id: &UserId) -> Option<User> {
        let user_id = discord::UserId::new(parse_id(id.as_str()).ok()?);
        if let Some(me) = self.current_user().filter(|me| me.id == *id) {
            return Some(me);
        }
        self.cache.guilds().into_iter().find_map(|guild| {
            let guild = self.cache.guild(guild)?;
            guild.members.get(&user_id).map(|m| convert_user(&m.user))
        })
    }

    fn users(&self) -> Vec<User> {
        let mut users: Vec<User> = vec![];
        for guild in self.cache.guilds() {
            let Some(guild) = self.cache.guild(guild) else {
                continue;
            };
            for member in guild.members.values() {
                let user = convert_user(&member.user);
                if !users.iter().any(|u| u.id == user.id) {
                    users.push(user);
                }
            }
        }
        users
    }

    fn member(&self, guild: &GuildId, user: &UserId) -> Option<Member> {
        let guild = discord::GuildId::new(parse_id(guild.as_str()).ok()?);
        let user = discord::UserId::new(parse_id(user.as_str()).ok()?);
        self.guild_member(guild, user)
    }

    fn members(&self, guild: &GuildId) -> Vec<Member> {
        let Ok(id) = parse_id(guild.as_str()) else {
            return vec![];
        };
        let Some(guild) = self.cache.guild(discord::GuildId::new(id)) else {
            return vec![];
        };
        guild
            .members
            .values()
            .map(|member| convert_member(&guild, member))
            .collect()
    }

    fn channels(&self, guild: &GuildId) -> Vec<Channel> {
        let Ok(id) = parse_id(guild.as_str()) else {
            return vec![];
        };
        let Some(guild) = self.cache.guild(discord::GuildId::new(id)) else {
            return vec![];
        };
        guild
            .channels
            .values()
            .map(|channel| Channel {
                id: ChannelId::new(channel.id.to_string()),
                name: channel.name.clone(),
                guild_id: Some(GuildId::new(channel.guild_id.to_string())),
            })
            .collect()
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        content: &str,
    ) -> Result<Message, PlatformError> {
        let sent = channel_id(channel)?
            .say(&self.http, content)
            .await
            .map_err(convert_error)?;
        Ok(convert_message(&sent))
    }

    async fn edit_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        content: &str,
    ) -> Result<(), PlatformError> {
        channel_id(channel)?
            .edit_message(
                &self.http,
                message_id(message)?,
                EditMessage::new().content(content),
            )
            .await
            .map_err(convert_error)?;
        Ok(())
    }

    async fn delete_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), PlatformError> {
        channel_id(channel)?
            .delete_message(&self.http, message_id(message)?)
            .await
            .map_err(convert_error)
    }

    async fn add_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        channel_id(channel)?
            .create_reaction(
                &self.http,
                message_id(message)?,
                ReactionType::Unicode(emoji.to_string()),
            )
            .await
            .map_err(convert_error)
    }

    async fn remove_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
        user: &UserId,
    ) -> Result<(), PlatformError> {
        let user = discord::UserId::new(parse_id(user.as_str())?);
        channel_id(channel)?
            .delete_reaction(
                &self.http,
                message_id(message)?,
                Some(user),
                ReactionType::Unicode(emoji.to_string()),
            )
            .await
            .map_err(convert_error)
    }

    async fn remove_all_reactions(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), PlatformError> {
        channel_id(channel)?
            .delete_reactions(&self.http, message_id(message)?)
            .await
            .map_err(convert_error)
    }
}

/// Discord ids are non-zero 64-bit integers.
fn parse_id(id: &str) -> Result<u64, PlatformError> {
    id.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| PlatformError::InvalidId(id.to_string()))
}

fn channel_id(id: &ChannelId) -> Result<discord::ChannelId, PlatformError> {
    Ok(discord::ChannelId::new(parse_id(id.as_str())?))
}

fn message_id(id: &MessageId) -> Result<discord::MessageId, PlatformError> {
    Ok(discord::MessageId::new(parse_id(id.as_str())?))
}

fn convert_error(err: serenity::Error) -> PlatformError {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) = &err {
        match response.status_code.as_u16() {
            403 => return PlatformError::Forbidden(response.error.message.clone()),
            404 => return PlatformError::NotFound(response.error.message.clone()),
            _ => {}
        }
    }
    PlatformError::Transport(err.to_string())
}

pub fn convert_user(user: &discord::User) -> User {
    User {
        id: UserId::new(user.id.to_string()),
        name: user.name.clone(),
        discriminator: user
            .discriminator
            .map_or_else(|| "0".to_string(), |d| format!("{d:04}")),
        display_name: user.global_name.clone(),
        bot: user.bot,
    }
}

fn convert_member(guild: &discord::Guild, member: &discord::Member) -> Member {
    Member {
        guild_id: GuildId::new(guild.id.to_string()),
        user: convert_user(&member.user),
        nick: member.nick.clone(),
        permissions: member_permissions(guild, member),
    }
}

/// Guild-level permissions from @everyone and the member's roles.
fn member_permissions(guild: &discord::Guild, member: &discord::Member) -> PermissionSet {
    if guild.owner_id == member.user.id {
        return PermissionSet::all();
    }

    let everyone = RoleId::new(guild.id.get());
    let mut bits = guild
        .roles
        .get(&everyone)
        .map_or_else(Permissions::empty, |role| role.permissions);
    for role in member.roles.iter().filter_map(|id| guild.roles.get(id)) {
        bits |= role.permissions;
    }

    PERMISSIONS
        .into_iter()
        .filter(|(_, flag)| bits.contains(*flag))
        .map(|(permission, _)| permission)
        .collect()
}

pub fn convert_message(message: &discord::Message) -> Message {
    Message {
        id: MessageId::new(message.id.to_string()),
        channel_id: ChannelId::new(message.channel_id.to_string()),
        guild_id: message.guild_id.map(|id| GuildId::new(id.to_string())),
        author: convert_user(&message.author),
        content: message.content.clone(),
    }
}

/// Only unicode reactions added by a known user are of interest.
pub fn convert_reaction(reaction: &discord::Reaction) -> Option<ReactionEvent> {
    let ReactionType::Unicode(emoji) = &reaction.emoji else {
        return None;
    };
    Some(ReactionEvent {
        channel_id: ChannelId::new(reaction.channel_id.to_string()),
        message_id: MessageId::new(reaction.message_id.to_string()),
        user_id: UserId::new(reaction.user_id?.to_string()),
        emoji: emoji.clone(),
    })
}
