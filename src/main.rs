use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use anyhow::Context as AnyhowContext;
use serenity::{
    Client,
    all::{Context as DiscordContext, EventHandler, Message, Reaction, Ready},
    async_trait,
    model::prelude::GatewayIntents,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cordial::{
    CommandError, Context, Framework, LoggingObserver, Observer,
    serenity_platform::{SerenityPlatform, convert_message, convert_reaction},
    util::format_duration,
};

mod config;
mod handlers;

use config::Configuration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = Configuration::load()?;
    let discord_token = config
        .authentication
        .discord_token
        .as_deref()
        .context("Expected authentication.discord_token to be filled in config")?;

    let framework_slot = Arc::new(OnceLock::new());
    let mut client = Client::builder(
        discord_token,
        GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::GUILD_MESSAGE_REACTIONS
            | GatewayIntents::DIRECT_MESSAGE_REACTIONS
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::GUILDS,
    )
    .event_handler(Handler {
        framework: framework_slot.clone(),
    })
    .await
    .context("Error creating client")?;

    let platform = Arc::new(SerenityPlatform::new(
        client.http.clone(),
        client.cache.clone(),
    ));
    let framework = Framework::new(platform, config.framework_options())?;
    framework.add_observer(Arc::new(LoggingObserver));
    framework.add_observer(Arc::new(ReplyObserver));
    handlers::register(&framework, &config.paginator)?;
    if framework_slot.set(framework).is_err() {
        anyhow::bail!("framework was initialised twice");
    }

    if let Err(why) = client.start().await {
        error!("Client error: {why:?}");
    }

    Ok(())
}

struct Handler {
    framework: Arc<OnceLock<Framework>>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: DiscordContext, ready: Ready) {
        info!("{} is connected; binding mention prefix", ready.user.name);
        if let Some(framework) = self.framework.get() {
            framework.bind_prefix();
        }
    }

    async fn message(&self, _ctx: DiscordContext, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(framework) = self.framework.get() else {
            return;
        };
        framework.handle_message(convert_message(&msg)).await;
    }

    async fn reaction_add(&self, _ctx: DiscordContext, reaction: Reaction) {
        let Some(framework) = self.framework.get() else {
            return;
        };
        if let Some(event) = convert_reaction(&reaction) {
            framework.handle_reaction(&event);
        }
    }
}

/// Tells the caller why their command did not run.
struct ReplyObserver;

#[async_trait]
impl Observer for ReplyObserver {
    async fn command_error(&self, ctx: &Context, error: &CommandError) {
        let reply = match error {
            CommandError::CheckFailed { .. } => {
                "You are not allowed to use this command.".to_string()
            }
            CommandError::MissingArguments { .. }
            | CommandError::TooManyArguments { .. }
            | CommandError::InvalidArgument { .. } => {
                format!("Sorry, {error}.\nUsage: `{}`", ctx.usage())
            }
            CommandError::Execution(_) => {
                "Something went wrong while running this command.".to_string()
            }
            _ => format!("Sorry, {error}."),
        };
        if let Err(err) = ctx.reply(&reply).await {
            warn!(error = %err, "failed to report command error");
        }
    }

    async fn command_cooldown(&self, ctx: &Context, remaining_secs: f64) {
        let remaining = format_duration(Duration::from_secs_f64(remaining_secs.max(0.0)));
        if let Err(err) = ctx
            .reply(&format!("Slow down! Try again in {remaining}."))
            .await
        {
            warn!(error = %err, "failed to report cooldown");
        }
    }
}
