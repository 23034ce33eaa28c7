//! Resolves raw argument tokens into platform entities.
//!
//! Rules are tried in a fixed order and stop at the first one whose pattern
//! matches: id, mention, `name#discriminator` tag, then plain names.
//! A token that matches a rule but names nothing is "not found", never an
//! error.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::{
    context::Context,
    model::{Channel, ChannelId, Member, User, UserId, tag},
};

static ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{15,21}$").unwrap());
static MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^<@!?(\d{15,21})>$").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^.{2,32}#\d{4}$").unwrap());
static CHANNEL_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<#(\d{15,21})>$").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("no guild found in context")]
    NoGuild,
}

/// ID > mention > tag > nickname > username > display name
pub fn member(ctx: &Context, query: &str) -> Result<Option<Member>, ConversionError> {
    let guild = ctx.guild_id().ok_or(ConversionError::NoGuild)?;
    let platform = ctx.platform();

    if let Some(id) = snowflake(query) {
        return Ok(platform.member(guild, &UserId::new(id)));
    }

    let members = platform.members(guild);
    if TAG.is_match(query) {
        return Ok(members.into_iter().find(|m| tag(&m.user) == query));
    }

    let by_nick = members
        .iter()
        .find(|m| m.nick.as_deref() == Some(query))
        .or_else(|| members.iter().find(|m| m.user.name == query))
        .or_else(|| {
            members
                .iter()
                .find(|m| m.user.display_name.as_deref() == Some(query))
        });
    Ok(by_nick.cloned())
}

/// ID > mention > tag > username > display name
pub fn user(ctx: &Context, query: &str) -> Option<User> {
    let platform = ctx.platform();

    if let Some(id) = snowflake(query) {
        return platform.user(&UserId::new(id));
    }

    let users = platform.users();
    if TAG.is_match(query) {
        return users.into_iter().find(|u| tag(u) == query);
    }

    users
        .iter()
        .find(|u| u.name == query)
        .or_else(|| users.iter().find(|u| u.display_name.as_deref() == Some(query)))
        .cloned()
}

/// ID > channel mention > name
pub fn channel(ctx: &Context, query: &str) -> Result<Option<Channel>, ConversionError> {
    let guild = ctx.guild_id().ok_or(ConversionError::NoGuild)?;
    let channels = ctx.platform().channels(guild);

    let id = if ID.is_match(query) {
        Some(query)
    } else {
        CHANNEL_MENTION
            .captures(query)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    };

    Ok(match id {
        Some(id) => {
            let id = ChannelId::new(id);
            channels.into_iter().find(|c| c.id == id)
        }
        None => channels.into_iter().find(|c| c.name == query),
    })
}

/// The id carried by a bare id or a user mention.
fn snowflake(query: &str) -> Option<&str> {
    if ID.is_match(query) {
        return Some(query);
    }
    MENTION
        .captures(query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ALICE_ID, BOB_ID, GENERAL_ID};

    #[tokio::test]
    async fn test_member_resolution_order() {
        let ctx = testing::guild_context("!whois").await;

        for query in [
            ALICE_ID.to_string(),
            format!("<@{ALICE_ID}>"),
            format!("<@!{ALICE_ID}>"),
            "alice#0001".to_string(),
            "Ally".to_string(),
            "alice".to_string(),
        ] {
            let found = member(&ctx, &query).unwrap();
            assert_eq!(found.map(|m| m.user.name), Some("alice".to_string()), "{query}");
        }

        // A nickname wins over another member's username.
        let found = member(&ctx, "bob").unwrap().unwrap();
        assert_eq!(found.user.id.as_str(), BOB_ID);
        let found = member(&ctx, "robert").unwrap().unwrap();
        assert_eq!(found.user.id.as_str(), BOB_ID);

        assert_eq!(member(&ctx, "999999999999999999").unwrap(), None);
        assert_eq!(member(&ctx, "nobody#1234").unwrap(), None);
    }

    #[tokio::test]
    async fn test_member_needs_guild() {
        let ctx = testing::private_context("!whois").await;
        assert_eq!(member(&ctx, "alice"), Err(ConversionError::NoGuild));
        assert_eq!(channel(&ctx, "general"), Err(ConversionError::NoGuild));
    }

    #[tokio::test]
    async fn test_user_works_in_private() {
        let ctx = testing::private_context("!whois").await;
        assert_eq!(user(&ctx, &format!("<@{BOB_ID}>")).map(|u| u.name), Some("robert".into()));
        assert_eq!(user(&ctx, "Alice A.").map(|u| u.name), Some("alice".into()));
        assert!(user(&ctx, "ghost").is_none());
    }

    #[tokio::test]
    async fn test_channel_resolution() {
        let ctx = testing::guild_context("!topic").await;
        for query in [GENERAL_ID.to_string(), format!("<#{GENERAL_ID}>"), "general".into()] {
            let found = channel(&ctx, &query).unwrap();
            assert_eq!(found.map(|c| c.name), Some("general".to_string()), "{query}");
        }
        assert_eq!(channel(&ctx, "random").unwrap(), None);
    }
}
