use std::{fmt, future::Future, sync::Arc, time::Duration};

use futures::future::BoxFuture;

use crate::{
    context::Context,
    error::RegistryError,
    model::{Permission, PermissionSet},
};

pub mod argument;
pub mod category;
pub mod check;
pub mod registry;

pub use argument::{ArgumentKind, ArgumentSpec, ArgumentValue, Arguments};
pub use category::Category;
pub use check::Check;
pub use registry::{CommandMap, Registry, Source};

pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;
pub type Handler = Arc<dyn Fn(Context) -> HandlerFuture + Send + Sync>;

/// A named, invocable unit. A command with subcommands is a group.
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    pub handler: Option<Handler>,
    pub arguments: Vec<ArgumentSpec>,
    pub checks: Vec<Check>,
    pub cooldown: Option<Duration>,
    pub caller_permissions: PermissionSet,
    pub app_permissions: PermissionSet,
    pub guild_only: bool,
    pub hidden: bool,
    pub category: Option<String>,
    /// Set on subcommands to the owning group's name
    pub parent: Option<String>,
    pub source: Option<Arc<dyn Source>>,
    pub subcommands: Option<CommandMap>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: vec![],
            description: None,
            handler: None,
            arguments: vec![],
            checks: vec![],
            cooldown: None,
            caller_permissions: PermissionSet::new(),
            app_permissions: PermissionSet::new(),
            guild_only: false,
            hidden: false,
            category: None,
            parent: None,
            source: None,
            subcommands: None,
        }
    }

    /// A command that owns a namespace of subcommands.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            subcommands: Some(CommandMap::default()),
            ..Self::new(name)
        }
    }

    pub fn handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |ctx| Box::pin(handler(ctx))));
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn argument(mut self, argument: ArgumentSpec) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn arguments(mut self, arguments: Vec<ArgumentSpec>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn caller_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.caller_permissions = permissions.into_iter().collect();
        self
    }

    pub fn app_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.app_permissions = permissions.into_iter().collect();
        self
    }

    pub fn guild_only(mut self, guild_only: bool) -> Self {
        self.guild_only = guild_only;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn source(mut self, source: Arc<dyn Source>) -> Self {
        self.source = Some(source);
        self
    }

    /// Adds a subcommand, turning this command into a group if it is not
    /// one already. Names and aliases must be unique within the group.
    pub fn subcommand(mut self, mut command: Command) -> Result<Self, RegistryError> {
        command.parent = Some(self.name.clone());
        self.subcommands
            .get_or_insert_with(CommandMap::default)
            .insert(command)?;
        Ok(self)
    }

    pub fn is_group(&self) -> bool {
        self.subcommands.is_some()
    }

    pub fn get_subcommand(&self, query: &str) -> Option<Arc<Command>> {
        self.subcommands.as_ref()?.get(query).cloned()
    }

    /// `name`, or `parent name` for subcommands. Cooldowns are tracked per
    /// qualified name.
    pub fn qualified_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{parent} {}", self.name),
            None => self.name.clone(),
        }
    }

    /// `prefix[name|alias] <required> [optional]`
    pub fn usage(&self, prefix: &str) -> String {
        let mut usage = prefix.to_string();
        if let Some(parent) = &self.parent {
            usage.push_str(parent);
            usage.push(' ');
        }
        if self.aliases.is_empty() {
            usage.push_str(&self.name);
        } else {
            usage.push_str(&format!("[{}|{}]", self.name, self.aliases.join("|")));
        }
        if !self.arguments.is_empty() {
            usage.push(' ');
            usage.push_str(&argument::usage(&self.arguments));
        }
        usage
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("arguments", &self.arguments)
            .field("checks", &self.checks)
            .field("cooldown", &self.cooldown)
            .field("guild_only", &self.guild_only)
            .field("category", &self.category)
            .field("parent", &self.parent)
            .field(
                "subcommands",
                &self
                    .subcommands
                    .as_ref()
                    .map(|s| s.iter().map(|c| c.name.clone()).collect::<Vec<_>>()),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage() {
        let cmd = Command::new("ban")
            .aliases(["b"])
            .argument(ArgumentSpec::required("who", ArgumentKind::Member))
            .argument(ArgumentSpec::optional("reason", ArgumentKind::String).rest());
        assert_eq!(cmd.usage("!"), "![ban|b] <who> [reason]");
        assert_eq!(Command::new("ping").usage("?"), "?ping");
    }

    #[test]
    fn test_subcommand_namespace() {
        let group = Command::group("config")
            .subcommand(Command::new("get").aliases(["show"]).handler(|_| async { Ok(()) }))
            .unwrap();

        let sub = group.get_subcommand("SHOW").unwrap();
        assert_eq!(sub.name, "get");
        assert_eq!(sub.qualified_name(), "config get");

        let err = group
            .subcommand(Command::new("show").handler(|_| async { Ok(()) }))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(_)));
    }
}
