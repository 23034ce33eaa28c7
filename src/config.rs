use std::{num::NonZeroUsize, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use cordial::{
    FrameworkOptions, Prefix,
    constant::{framework, paginator},
    model::UserId,
};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Configuration {
    pub authentication: Authentication,
    pub commands: Commands,
    pub paginator: Paginator,
}
impl Configuration {
    const FILENAME: &str = "config.toml";

    pub fn load() -> anyhow::Result<Self> {
        let config = if let Ok(file) = std::fs::read_to_string(Self::FILENAME) {
            Self::parse(&file)?
        } else {
            Self::default()
        };
        config.save()?;

        Ok(config)
    }

    fn parse(file: &str) -> anyhow::Result<Self> {
        toml::from_str(file).context("failed to load config")
    }

    fn save(&self) -> anyhow::Result<()> {
        Ok(std::fs::write(
            Self::FILENAME,
            toml::to_string_pretty(self)?,
        )?)
    }

    pub fn framework_options(&self) -> FrameworkOptions {
        let commands = &self.commands;
        let base = commands.prefix.literals();
        FrameworkOptions {
            prefix: if commands.when_mentioned {
                Prefix::when_mentioned_or(base)
            } else {
                Prefix::List(base)
            },
            use_prefix_spaces: commands.use_prefix_spaces,
            owner_ids: commands.owner_ids.iter().cloned().map(UserId::new).collect(),
            prefix_cache_size: NonZeroUsize::new(commands.prefix_cache_size)
                .unwrap_or(framework::PREFIX_CACHE_SIZE),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Authentication {
    pub discord_token: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum PrefixSetting {
    Single(String),
    Many(Vec<String>),
}
impl PrefixSetting {
    fn literals(&self) -> Vec<String> {
        match self {
            PrefixSetting::Single(prefix) => vec![prefix.clone()],
            PrefixSetting::Many(prefixes) => prefixes.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Commands {
    pub prefix: PrefixSetting,
    /// Also respond to messages starting with a mention of the bot
    pub when_mentioned: bool,
    /// Allow whitespace between the prefix and the command name
    pub use_prefix_spaces: bool,
    /// Users allowed to run owner-only commands
    pub owner_ids: Vec<String>,
    pub prefix_cache_size: usize,
}
impl Default for Commands {
    fn default() -> Self {
        Self {
            prefix: PrefixSetting::Single(framework::DEFAULT_PREFIX.to_string()),
            when_mentioned: true,
            use_prefix_spaces: false,
            owner_ids: vec![],
            prefix_cache_size: framework::PREFIX_CACHE_SIZE.get(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Paginator {
    pub timeout_secs: u64,
    /// Only the invoking user may turn pages
    pub author_only: bool,
}
impl Paginator {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
impl Default for Paginator {
    fn default() -> Self {
        Self {
            timeout_secs: paginator::DEFAULT_TIMEOUT.as_secs(),
            author_only: true,
        }
    }
}
