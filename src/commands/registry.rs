use std::{collections::HashMap, sync::Arc};

use tracing::{info, warn};

use super::{Category, Command, Handler};
use crate::{cooldown::CooldownTracker, error::RegistryError};

/// Where a command or category came from, so it can be loaded again.
///
/// The embedding application owns the loading mechanism; the registry only
/// asks for a fresh definition and tells the source when its cached state
/// is stale.
pub trait Source: Send + Sync {
    /// Human-readable location, used in logs.
    fn location(&self) -> &str;

    /// Called whenever a definition from this source is removed.
    fn invalidate(&self) {}

    fn load_command(&self, name: &str) -> anyhow::Result<Command> {
        anyhow::bail!("{} does not provide command `{name}`", self.location())
    }

    fn load_category(&self, name: &str) -> anyhow::Result<Category> {
        anyhow::bail!("{} does not provide category `{name}`", self.location())
    }
}

/// Case-insensitive name and alias lookup over a set of commands.
#[derive(Clone, Default)]
pub struct CommandMap {
    commands: HashMap<String, Arc<Command>>,
    aliases: HashMap<String, String>,
}

impl CommandMap {
    pub fn get(&self, query: &str) -> Option<&Arc<Command>> {
        let key = query.to_lowercase();
        let name = self.aliases.get(&key).unwrap_or(&key);
        self.commands.get(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.commands.values()
    }

    /// Validates and adds a command. Leaves the map untouched on error.
    pub fn insert(&mut self, command: Command) -> Result<Arc<Command>, RegistryError> {
        let command = Arc::new(self.validate(command)?);
        self.insert_unchecked(command.clone());
        Ok(command)
    }

    pub fn remove(&mut self, query: &str) -> Option<Arc<Command>> {
        let key = self.get(query)?.name.to_lowercase();
        let command = self.commands.remove(&key)?;
        self.aliases.retain(|_, name| *name != key);
        Some(command)
    }

    fn contains_key(&self, key: &str) -> bool {
        self.commands.contains_key(key) || self.aliases.contains_key(key)
    }

    fn insert_unchecked(&mut self, command: Arc<Command>) {
        let key = command.name.to_lowercase();
        for alias in &command.aliases {
            self.aliases.insert(alias.to_lowercase(), key.clone());
        }
        self.commands.insert(key, command);
    }

    fn validate(&self, mut command: Command) -> Result<Command, RegistryError> {
        if command.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let key = command.name.to_lowercase();
        if self.contains_key(&key) {
            return Err(RegistryError::DuplicateName(command.name));
        }

        let mut seen = vec![key];
        for alias in &command.aliases {
            let alias_key = alias.to_lowercase();
            if self.contains_key(&alias_key) || seen.contains(&alias_key) {
                return Err(RegistryError::DuplicateAlias(alias.clone()));
            }
            seen.push(alias_key);
        }

        if command.handler.is_none() {
            match &command.subcommands {
                Some(subcommands) if !subcommands.is_empty() => {
                    command.handler = Some(list_subcommands(subcommands));
                }
                _ => return Err(RegistryError::MissingHandler(command.name)),
            }
        }

        let last = command.arguments.len().saturating_sub(1);
        if let Some((_, spec)) = command
            .arguments
            .iter()
            .enumerate()
            .find(|(i, spec)| spec.rest && *i != last)
        {
            return Err(RegistryError::InvalidArgumentSpec {
                command: command.name.clone(),
                argument: spec.name.clone(),
            });
        }

        Ok(command)
    }
}

/// Handler given to groups that have subcommands but no handler of their own.
fn list_subcommands(subcommands: &CommandMap) -> Handler {
    let mut names: Vec<String> = subcommands
        .iter()
        .filter(|c| !c.hidden)
        .map(|c| format!("`{}`", c.name))
        .collect();
    names.sort();
    let listing = format!("Subcommands: {}", names.join(", "));

    Arc::new(move |ctx| {
        let listing = listing.clone();
        Box::pin(async move {
            ctx.reply(&listing).await?;
            Ok(())
        })
    })
}

/// The flat command namespace plus loaded categories.
pub struct Registry {
    commands: CommandMap,
    categories: HashMap<String, Category>,
    cooldowns: CooldownTracker,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(CooldownTracker::default())
    }
}

impl Registry {
    pub fn new(cooldowns: CooldownTracker) -> Self {
        Self {
            commands: CommandMap::default(),
            categories: HashMap::new(),
            cooldowns,
        }
    }

    pub fn add_command(&mut self, command: Command) -> Result<(), RegistryError> {
        let command = self.commands.insert(command)?;
        self.prepare_cooldowns(&command);
        info!(command = %command.name, aliases = ?command.aliases, "registered command");
        Ok(())
    }

    /// Removes a command by name or alias. Does nothing if it is not found.
    pub fn remove_command(&mut self, name: &str) -> Option<Arc<Command>> {
        let command = self.detach_command(name)?;
        self.forget_cooldowns(&command);
        info!(command = %command.name, "removed command");
        Some(command)
    }

    /// Takes a command out of the namespace, keeping its cooldown state.
    fn detach_command(&mut self, name: &str) -> Option<Arc<Command>> {
        let command = self.commands.remove(name)?;
        if let Some(source) = &command.source {
            source.invalidate();
        }
        Some(command)
    }

    /// Replaces a command with a fresh definition from its source. On any
    /// failure the previous definition stays registered.
    pub fn reload_command(&mut self, name: &str) -> Result<(), RegistryError> {
        let previous = self
            .commands
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownCommand(name.to_string()))?;
        let source = previous
            .source
            .clone()
            .ok_or_else(|| RegistryError::NoReloadSource(previous.name.clone()))?;

        self.detach_command(&previous.name);

        let result = source
            .load_command(&previous.name)
            .map_err(|source| RegistryError::Reload {
                name: previous.name.clone(),
                source,
            })
            .and_then(|mut command| {
                command.category = command.category.or_else(|| previous.category.clone());
                command.source = command.source.or_else(|| Some(source.clone()));
                self.add_command(command)
            });

        if let Err(err) = result {
            warn!(command = %previous.name, error = %err, "reload failed; restoring previous definition");
            self.prepare_cooldowns(&previous);
            self.commands.insert_unchecked(previous);
            return Err(err);
        }

        if self.commands.get(&previous.name).is_none() {
            self.forget_cooldowns(&previous);
        }
        info!(command = %previous.name, location = source.location(), "reloaded command");
        Ok(())
    }

    /// Registers a category and all of its commands, or nothing at all.
    pub fn load_category(&mut self, category: Category) -> Result<(), RegistryError> {
        if self.categories.contains_key(&category.name) {
            return Err(RegistryError::DuplicateCategory(category.name));
        }

        let mut staged = self.commands.clone();
        let mut added = Vec::with_capacity(category.commands.len());
        for command in &category.commands {
            let mut command = command.clone();
            command.category = Some(category.name.clone());
            if command.source.is_none() {
                command.source = category.source.clone();
            }
            added.push(staged.insert(command)?);
        }

        self.commands = staged;
        for command in &added {
            self.prepare_cooldowns(command);
        }
        info!(category = %category.name, commands = added.len(), "loaded category");
        self.categories.insert(category.name.clone(), category);
        Ok(())
    }

    /// Removes a category and every command registered under it.
    pub fn unload_category(&mut self, name: &str) -> Option<Category> {
        let (category, removed) = self.detach_category(name)?;
        for command in &removed {
            self.forget_cooldowns(command);
        }
        info!(category = %name, "unloaded category");
        Some(category)
    }

    /// Takes a category and its commands out of the registry, keeping their
    /// cooldown state.
    fn detach_category(&mut self, name: &str) -> Option<(Category, Vec<Arc<Command>>)> {
        let category = self.categories.remove(name)?;

        let members: Vec<String> = self
            .commands
            .iter()
            .filter(|c| c.category.as_deref() == Some(name))
            .map(|c| c.name.clone())
            .collect();
        let removed = members
            .iter()
            .filter_map(|command| self.commands.remove(command))
            .collect();

        if let Some(source) = &category.source {
            source.invalidate();
        }
        Some((category, removed))
    }

    /// Replaces a category with a fresh definition from its source. On any
    /// failure the previous category is loaded again.
    pub fn reload_category(&mut self, name: &str) -> Result<(), RegistryError> {
        let previous = self
            .categories
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownCategory(name.to_string()))?;
        let source = previous
            .source
            .clone()
            .ok_or_else(|| RegistryError::NoReloadSource(name.to_string()))?;

        let detached = self
            .detach_category(name)
            .map(|(_, removed)| removed)
            .unwrap_or_default();

        let result = source
            .load_category(name)
            .map_err(|source| RegistryError::Reload {
                name: name.to_string(),
                source,
            })
            .and_then(|mut category| {
                category.source = category.source.or_else(|| Some(source.clone()));
                self.load_category(category)
            });

        if let Err(err) = result {
            warn!(category = %name, error = %err, "reload failed; restoring previous definition");
            if let Err(restore_err) = self.load_category(previous) {
                warn!(category = %name, error = %restore_err, "could not restore category");
            }
            return Err(err);
        }

        for command in detached
            .iter()
            .filter(|c| self.commands.get(&c.name).is_none())
        {
            self.forget_cooldowns(command);
        }
        info!(category = %name, location = source.location(), "reloaded category");
        Ok(())
    }

    /// Resolves `name` or `parent child`, returning the most specific match.
    pub fn get_command(&self, query: &str) -> Option<Arc<Command>> {
        let mut tokens = query.split_whitespace();
        let command = self.commands.get(tokens.next()?)?.clone();
        match tokens.next() {
            Some(child) => Some(command.get_subcommand(child).unwrap_or(command)),
            None => Some(command),
        }
    }

    pub fn get_category(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    pub fn commands(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.commands.iter()
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    /// Registered commands belonging to `category`.
    pub fn category_commands<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a Arc<Command>> + 'a {
        self.commands
            .iter()
            .filter(move |c| c.category.as_deref() == Some(category))
    }

    pub fn uncategorized(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.commands.iter().filter(|c| c.category.is_none())
    }

    fn prepare_cooldowns(&self, command: &Command) {
        if command.cooldown.is_some() {
            self.cooldowns.prepare(&command.qualified_name());
        }
        for sub in command.subcommands.iter().flat_map(CommandMap::iter) {
            self.prepare_cooldowns(sub);
        }
    }

    fn forget_cooldowns(&self, command: &Command) {
        self.cooldowns.forget(&command.qualified_name());
        for sub in command.subcommands.iter().flat_map(CommandMap::iter) {
            self.forget_cooldowns(sub);
        }
    }
}
