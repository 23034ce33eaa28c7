//! Platform-neutral entity types.
//!
//! The dispatch core never sees a platform's own objects; the platform adapter
//! converts them into these plain values.

use std::{collections::BTreeSet, fmt};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Opaque identity of a user.
    UserId
);
string_id!(
    /// Opaque identity of a channel.
    ChannelId
);
string_id!(
    /// Opaque identity of a guild (a guild-scoped community).
    GuildId
);
string_id!(
    /// Opaque identity of a message.
    MessageId
);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Login name
    pub name: String,
    pub discriminator: String,
    /// Global display name, if the platform has one
    pub display_name: Option<String>,
    /// Whether this is an automated account
    pub bot: bool,
}

impl User {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            discriminator: "0".to_string(),
            display_name: None,
            bot: false,
        }
    }
}

/// `name#discriminator`
pub fn tag(user: &User) -> String {
    format!("{}#{}", user.name, user.discriminator)
}

/// A user as seen inside one guild.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub guild_id: GuildId,
    pub user: User,
    pub nick: Option<String>,
    /// Guild-level permissions, already resolved from the member's roles
    pub permissions: PermissionSet,
}

impl Member {
    pub fn id(&self) -> &UserId {
        &self.user.id
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub guild_id: Option<GuildId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    /// `None` for private channels
    pub guild_id: Option<GuildId>,
    pub author: User,
    pub content: String,
}

/// A reaction added to a message by a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactionEvent {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub emoji: String,
}

/// Permissions a command can require of its caller or of the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    Administrator,
    ViewChannel,
    SendMessages,
    ManageMessages,
    EmbedLinks,
    AttachFiles,
    ReadMessageHistory,
    AddReactions,
    MentionEveryone,
    KickMembers,
    BanMembers,
    ManageChannels,
    ManageGuild,
    ManageRoles,
    ManageNicknames,
}

impl Permission {
    pub const ALL: [Permission; 15] = [
        Permission::Administrator,
        Permission::ViewChannel,
        Permission::SendMessages,
        Permission::ManageMessages,
        Permission::EmbedLinks,
        Permission::AttachFiles,
        Permission::ReadMessageHistory,
        Permission::AddReactions,
        Permission::MentionEveryone,
        Permission::KickMembers,
        Permission::BanMembers,
        Permission::ManageChannels,
        Permission::ManageGuild,
        Permission::ManageRoles,
        Permission::ManageNicknames,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Permission::Administrator => "administrator",
            Permission::ViewChannel => "view_channel",
            Permission::SendMessages => "send_messages",
            Permission::ManageMessages => "manage_messages",
            Permission::EmbedLinks => "embed_links",
            Permission::AttachFiles => "attach_files",
            Permission::ReadMessageHistory => "read_message_history",
            Permission::AddReactions => "add_reactions",
            Permission::MentionEveryone => "mention_everyone",
            Permission::KickMembers => "kick_members",
            Permission::BanMembers => "ban_members",
            Permission::ManageChannels => "manage_channels",
            Permission::ManageGuild => "manage_guild",
            Permission::ManageRoles => "manage_roles",
            Permission::ManageNicknames => "manage_nicknames",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Permission::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, permission: Permission) {
        self.0.insert(permission);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Administrators implicitly hold every permission.
    pub fn has(&self, permission: Permission) -> bool {
        self.0.contains(&Permission::Administrator) || self.0.contains(&permission)
    }

    /// Permissions in `required` that this set does not grant, in order.
    pub fn missing(&self, required: &PermissionSet) -> Vec<Permission> {
        required.iter().filter(|p| !self.has(*p)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Permission; N]> for PermissionSet {
    fn from(permissions: [Permission; N]) -> Self {
        permissions.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag() {
        let mut user = User::new("100", "hibiscus");
        user.discriminator = "1234".to_string();
        assert_eq!(tag(&user), "hibiscus#1234");
    }

    #[test]
    fn test_missing_permissions() {
        let held = PermissionSet::from([Permission::SendMessages]);
        let required = PermissionSet::from([Permission::SendMessages, Permission::KickMembers]);
        assert_eq!(held.missing(&required), vec![Permission::KickMembers]);

        let admin = PermissionSet::from([Permission::Administrator]);
        assert!(admin.missing(&required).is_empty());
    }
}
