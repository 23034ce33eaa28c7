//! In-memory platform and observers shared by the unit tests.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::{
    commands::{Arguments, Command},
    context::Context,
    dispatch::{Framework, FrameworkOptions},
    error::{CommandError, PlatformError},
    events::Observer,
    model::{
        Channel, ChannelId, GuildId, Member, Message, MessageId, Permission, PermissionSet, User,
        UserId,
    },
    platform::Platform,
};

pub const GUILD_ID: &str = "100000000000000001";
pub const GENERAL_ID: &str = "200000000000000001";
pub const DM_ID: &str = "200000000000000002";
pub const ALICE_ID: &str = "300000000000000001";
pub const BOB_ID: &str = "300000000000000002";
pub const CAROL_ID: &str = "300000000000000003";
pub const BOT_ID: &str = "300000000000000004";
pub const APP_ID: &str = "300000000000000009";

static NEXT_MESSAGE: AtomicU64 = AtomicU64::new(1);

fn next_message_id() -> MessageId {
    MessageId::new((800_000_000_000_000_000 + NEXT_MESSAGE.fetch_add(1, Ordering::Relaxed)).to_string())
}

fn user(id: &str, name: &str, discriminator: &str, bot: bool) -> User {
    User {
        discriminator: discriminator.to_string(),
        bot,
        ..User::new(id, name)
    }
}

fn member(user: User, nick: Option<&str>, permissions: PermissionSet) -> Member {
    Member {
        guild_id: GuildId::new(GUILD_ID),
        user,
        nick: nick.map(str::to_string),
        permissions,
    }
}

/// Something the code under test asked the platform to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Send { channel: ChannelId, content: String },
    Edit { message: MessageId, content: String },
    Delete { message: MessageId },
    React { message: MessageId, emoji: String },
    Unreact { message: MessageId, emoji: String, user: UserId },
    ClearReactions { message: MessageId },
}

/// One guild with a single text channel, four users and the application.
pub struct MockPlatform {
    users: Vec<User>,
    members: Mutex<Vec<Member>>,
    channels: Vec<Channel>,
    actions: Mutex<Vec<Action>>,
    deny_clear_reactions: AtomicBool,
}

impl MockPlatform {
    pub fn new() -> Self {
        let mut alice = user(ALICE_ID, "alice", "0001", false);
        alice.display_name = Some("Alice A.".to_string());
        let bob = user(BOB_ID, "robert", "0002", false);
        let carol = user(CAROL_ID, "bob", "0003", false);
        let otter = user(BOT_ID, "otterbot", "0004", true);
        let app = user(APP_ID, "cordial", "0009", true);

        let members = vec![
            member(
                alice.clone(),
                Some("Ally"),
                PermissionSet::from([
                    Permission::SendMessages,
                    Permission::ManageMessages,
                    Permission::KickMembers,
                ]),
            ),
            member(
                bob.clone(),
                Some("bob"),
                PermissionSet::from([Permission::SendMessages]),
            ),
            member(carol.clone(), None, PermissionSet::from([Permission::SendMessages])),
            member(otter.clone(), None, PermissionSet::new()),
            member(
                app.clone(),
                None,
                PermissionSet::from([
                    Permission::SendMessages,
                    Permission::AddReactions,
                    Permission::ManageMessages,
                ]),
            ),
        ];

        Self {
            users: vec![alice, bob, carol, otter, app],
            members: Mutex::new(members),
            channels: vec![Channel {
                id: ChannelId::new(GENERAL_ID),
                name: "general".to_string(),
                guild_id: Some(GuildId::new(GUILD_ID)),
            }],
            actions: Mutex::new(vec![]),
            deny_clear_reactions: AtomicBool::new(false),
        }
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().clone()
    }

    pub fn sent(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Send { content, .. } => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn set_app_permissions(&self, permissions: PermissionSet) {
        self.set_permissions(APP_ID, permissions);
    }

    pub fn set_permissions(&self, user: &str, permissions: PermissionSet) {
        if let Some(member) = self
            .members
            .lock()
            .iter_mut()
            .find(|m| m.user.id.as_str() == user)
        {
            member.permissions = permissions;
        }
    }

    pub fn deny_clear_reactions(&self) {
        self.deny_clear_reactions.store(true, Ordering::SeqCst);
    }

    fn record(&self, action: Action) {
        self.actions.lock().push(action);
    }
}

#[async_trait]
impl Platform for MockPlatform {
    fn current_user(&self) -> Option<User> {
        self.user(&UserId::new(APP_ID))
    }

    fn user(&self, id: &UserId) -> Option<User> {
        self.users.iter().find(|u| u.id == *id).cloned()
    }

    fn users(&self) -> Vec<User> {
        self.users.clone()
    }

    fn member(&self, guild: &GuildId, user: &UserId) -> Option<Member> {
        self.members
            .lock()
            .iter()
            .find(|m| m.guild_id == *guild && m.user.id == *user)
            .cloned()
    }

    fn members(&self, guild: &GuildId) -> Vec<Member> {
        self.members
            .lock()
            .iter()
            .filter(|m| m.guild_id == *guild)
            .cloned()
            .collect()
    }

    fn channels(&self, guild: &GuildId) -> Vec<Channel> {
        self.channels
            .iter()
            .filter(|c| c.guild_id.as_ref() == Some(guild))
            .cloned()
            .collect()
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        content: &str,
    ) -> Result<Message, PlatformError> {
        self.record(Action::Send {
            channel: channel.clone(),
            content: content.to_string(),
        });
        let guild_id = self
            .channels
            .iter()
            .find(|c| c.id == *channel)
            .and_then(|c| c.guild_id.clone());
        Ok(Message {
            id: next_message_id(),
            channel_id: channel.clone(),
            guild_id,
            author: self
                .current_user()
                .ok_or_else(|| PlatformError::NotFound("application user".into()))?,
            content: content.to_string(),
        })
    }

    async fn edit_message(
        &self,
        _channel: &ChannelId,
        message: &MessageId,
        content: &str,
    ) -> Result<(), PlatformError> {
        self.record(Action::Edit {
            message: message.clone(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn delete_message(
        &self,
        _channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), PlatformError> {
        self.record(Action::Delete {
            message: message.clone(),
        });
        Ok(())
    }

    async fn add_reaction(
        &self,
        _channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        self.record(Action::React {
            message: message.clone(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn remove_reaction(
        &self,
        _channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
        user: &UserId,
    ) -> Result<(), PlatformError> {
        self.record(Action::Unreact {
            message: message.clone(),
            emoji: emoji.to_string(),
            user: user.clone(),
        });
        Ok(())
    }

    async fn remove_all_reactions(
        &self,
        _channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), PlatformError> {
        if self.deny_clear_reactions.load(Ordering::SeqCst) {
            return Err(PlatformError::Forbidden("manage messages".into()));
        }
        self.record(Action::ClearReactions {
            message: message.clone(),
        });
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Error {
        command: String,
        code: &'static str,
        message: String,
    },
    Before(String),
    Execute(String),
    After(String),
    Cooldown {
        command: String,
        remaining_secs: f64,
    },
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Error codes, in the order they were reported.
    pub fn errors(&self) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error { code, .. } => Some(code),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
    }
}

#[async_trait]
impl Observer for RecordingObserver {
    async fn command_error(&self, ctx: &Context, error: &CommandError) {
        self.push(Event::Error {
            command: ctx.command.qualified_name(),
            code: error.error_code(),
            message: error.to_string(),
        });
    }

    async fn before_command_execute(&self, ctx: &Context) {
        self.push(Event::Before(ctx.command.qualified_name()));
    }

    async fn command_execute(&self, ctx: &Context) {
        self.push(Event::Execute(ctx.command.qualified_name()));
    }

    async fn after_command_execute(&self, ctx: &Context, started: Instant) {
        assert!(started <= Instant::now());
        self.push(Event::After(ctx.command.qualified_name()));
    }

    async fn command_cooldown(&self, ctx: &Context, remaining_secs: f64) {
        self.push(Event::Cooldown {
            command: ctx.command.qualified_name(),
            remaining_secs,
        });
    }
}

/// A framework over a fresh mock platform, with alice as the only owner.
pub fn framework(options: FrameworkOptions) -> (Framework, Arc<MockPlatform>, Arc<RecordingObserver>) {
    let platform = Arc::new(MockPlatform::new());
    let options = FrameworkOptions {
        owner_ids: vec![UserId::new(ALICE_ID)],
        ..options
    };
    let framework = Framework::new(platform.clone(), options).unwrap();
    let observer = Arc::new(RecordingObserver::default());
    framework.add_observer(observer.clone());
    (framework, platform, observer)
}

/// A message from `author`, in the guild's general channel or a private one.
pub fn message_from(author: &str, content: &str, in_guild: bool) -> Message {
    let platform = MockPlatform::new();
    let author = platform
        .user(&UserId::new(author))
        .unwrap_or_else(|| User::new(author, "stranger"));
    let (channel_id, guild_id) = if in_guild {
        (ChannelId::new(GENERAL_ID), Some(GuildId::new(GUILD_ID)))
    } else {
        (ChannelId::new(DM_ID), None)
    };
    Message {
        id: next_message_id(),
        channel_id,
        guild_id,
        author,
        content: content.to_string(),
    }
}

fn context(framework: Framework, message: Message) -> Context {
    let member = message
        .guild_id
        .as_ref()
        .and_then(|guild| framework.platform().member(guild, &message.author.id));
    Context {
        framework,
        message: Arc::new(message),
        command: Arc::new(Command::new("test").handler(|_| async { Ok(()) })),
        args: Arguments::default(),
        prefix: "!".to_string(),
        member,
    }
}

/// Alice (an owner) invoking in the guild.
pub async fn guild_context(content: &str) -> Context {
    guild_context_with_platform(content).await.0
}

pub async fn guild_context_with_platform(content: &str) -> (Context, Arc<MockPlatform>) {
    let (framework, platform, _) = self::framework(FrameworkOptions::default());
    let ctx = context(framework, message_from(ALICE_ID, content, true));
    (ctx, platform)
}

/// Bob (not an owner) invoking in a private channel.
pub async fn private_context(content: &str) -> Context {
    let (framework, _, _) = framework(FrameworkOptions::default());
    context(framework, message_from(BOB_ID, content, false))
}
