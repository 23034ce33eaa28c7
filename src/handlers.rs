//! The demonstration bot's commands.

use std::{sync::Arc, time::Duration};

use anyhow::Context as _;
use cordial::{
    ArgumentKind, ArgumentSpec, Category, Command, Framework, PaginatorMode, PaginatorOptions,
    RegistryError, Source, commands::check::is_owner, model::tag,
};

use crate::config;

const HELP_PAGE_SIZE: usize = 5;

pub fn register(framework: &Framework, paginator: &config::Paginator) -> Result<(), RegistryError> {
    framework.add_command(ping())?;
    framework.add_command(help(paginator.clone()))?;
    framework.load_category(utility())?;
    framework.load_category(owner()?)?;
    Ok(())
}

/// Rebuilds the built-in categories on reload.
struct Builtin;

impl Source for Builtin {
    fn location(&self) -> &str {
        "builtin"
    }

    fn load_category(&self, name: &str) -> anyhow::Result<Category> {
        match name {
            "utility" => Ok(utility()),
            "owner" => Ok(owner()?),
            _ => anyhow::bail!("no built-in category named `{name}`"),
        }
    }
}

fn ping() -> Command {
    Command::new("ping")
        .aliases(["p"])
        .description("Checks that the bot is alive")
        .cooldown(Duration::from_secs(3))
        .handler(|ctx| async move {
            ctx.reply("Pong!").await?;
            Ok(())
        })
}

fn help(settings: config::Paginator) -> Command {
    Command::new("help")
        .aliases(["commands"])
        .description("Lists every command")
        .argument(ArgumentSpec::optional("command", ArgumentKind::String).rest())
        .handler(move |ctx| {
            let settings = settings.clone();
            async move {
                if let Some(query) = ctx.args.str("command") {
                    let reply = match ctx.framework.get_command(query) {
                        Some(command) => format!(
                            "`{}`\n{}",
                            command.usage(&ctx.prefix),
                            command.description.as_deref().unwrap_or("No description.")
                        ),
                        None => format!("No command named `{query}`."),
                    };
                    ctx.reply(&reply).await?;
                    return Ok(());
                }

                let mut lines: Vec<String> = {
                    let registry = ctx.framework.registry();
                    registry
                        .commands()
                        .filter(|c| !c.hidden)
                        .map(|c| {
                            format!(
                                "`{}` {}",
                                c.usage(&ctx.prefix),
                                c.description.as_deref().unwrap_or_default()
                            )
                        })
                        .collect()
                };
                lines.sort();

                let total = lines.len().div_ceil(HELP_PAGE_SIZE);
                let pages: Vec<String> = lines
                    .chunks(HELP_PAGE_SIZE)
                    .enumerate()
                    .map(|(i, chunk)| format!("{}\n\nPage {}/{total}", chunk.join("\n"), i + 1))
                    .collect();

                let mode = if ctx.in_guild() {
                    PaginatorMode::Reaction
                } else {
                    PaginatorMode::Message
                };
                ctx.paginate(
                    PaginatorOptions::new(pages)
                        .mode(mode)
                        .timeout(settings.timeout())
                        .author_only(settings.author_only),
                )
                .await?;
                Ok(())
            }
        })
}

fn utility() -> Category {
    Category::new("utility")
        .source(Arc::new(Builtin))
        .command(
            Command::new("echo")
                .aliases(["say"])
                .description("Repeats a message")
                .argument(ArgumentSpec::required("text", ArgumentKind::String).rest())
                .handler(|ctx| async move {
                    let text = ctx.args.str("text").unwrap_or_default();
                    ctx.reply(text).await?;
                    Ok(())
                }),
        )
        .command(
            Command::new("add")
                .aliases(["sum"])
                .description("Adds two numbers")
                .argument(ArgumentSpec::required("a", ArgumentKind::Number))
                .argument(ArgumentSpec::required("b", ArgumentKind::Number))
                .handler(|ctx| async move {
                    let a = ctx.args.number("a").unwrap_or_default();
                    let b = ctx.args.number("b").unwrap_or_default();
                    ctx.reply(&format!("{a} + {b} = {}", a + b)).await?;
                    Ok(())
                }),
        )
        .command(
            Command::new("whois")
                .description("Shows who a member is")
                .guild_only(true)
                .argument(ArgumentSpec::optional("member", ArgumentKind::Member))
                .handler(|ctx| async move {
                    let member = ctx
                        .args
                        .member("member")
                        .or(ctx.member.as_ref())
                        .context("caller is not a guild member")?;
                    let permissions = member
                        .permissions
                        .iter()
                        .map(|p| p.name())
                        .collect::<Vec<_>>()
                        .join(", ");
                    ctx.reply(&format!(
                        "{} ({})\nPermissions: {}",
                        tag(&member.user),
                        member.nick.as_deref().unwrap_or("no nickname"),
                        if permissions.is_empty() { "none" } else { &permissions }
                    ))
                    .await?;
                    Ok(())
                }),
        )
        .command(
            Command::new("topic")
                .description("Links a channel")
                .guild_only(true)
                .argument(ArgumentSpec::required("channel", ArgumentKind::Channel))
                .handler(|ctx| async move {
                    let channel = ctx.args.channel("channel").context("channel missing")?;
                    ctx.reply(&format!("<#{}> is called #{}", channel.id, channel.name))
                        .await?;
                    Ok(())
                }),
        )
}

fn owner() -> Result<Category, RegistryError> {
    let admin = Command::group("admin")
        .description("Bot owner tools")
        .hidden(true)
        .subcommand(
            Command::new("reload")
                .description("Reloads a category")
                .argument(ArgumentSpec::required("category", ArgumentKind::String))
                .handler(|ctx| async move {
                    let name = ctx.args.str("category").unwrap_or_default();
                    let reply = match ctx.framework.reload_category(name) {
                        Ok(()) => format!("Reloaded `{name}`."),
                        Err(err) => format!("Could not reload `{name}`: {err}"),
                    };
                    ctx.reply(&reply).await?;
                    Ok(())
                }),
        )?
        .subcommand(
            Command::new("stats")
                .description("Shows registry statistics")
                .cooldown(Duration::from_secs(10))
                .handler(|ctx| async move {
                    let reply = {
                        let registry = ctx.framework.registry();
                        format!(
                            "{} commands in {} categories ({} uncategorized), {} interactive sessions",
                            registry.commands().count(),
                            registry.categories().count(),
                            registry.uncategorized().count(),
                            ctx.framework.inputs().len(),
                        )
                    };
                    ctx.reply(&reply).await?;
                    Ok(())
                }),
        )?;

    Ok(Category::new("owner")
        .source(Arc::new(Builtin))
        .check(is_owner())
        .command(admin))
}
