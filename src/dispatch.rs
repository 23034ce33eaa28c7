//! Turns incoming messages into command invocations.

use std::{num::NonZeroUsize, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt as _;
use lru::LruCache;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::{
    commands::{Arguments, Category, Command, Registry, argument},
    constant,
    context::Context,
    cooldown::{CooldownStatus, CooldownTracker},
    error::{CommandError, FrameworkError, RegistryError},
    events::Observer,
    input::InputHub,
    model::{Message, ReactionEvent, UserId},
    platform::Platform,
    prefix::{Prefix, PrefixMatch, PrefixMatcher},
};

#[derive(Clone, Debug)]
pub struct FrameworkOptions {
    pub prefix: Prefix,
    /// Allow whitespace between the prefix and the command name
    pub use_prefix_spaces: bool,
    pub owner_ids: Vec<UserId>,
    /// Compiled matchers kept for prefixes computed per message
    pub prefix_cache_size: NonZeroUsize,
}

impl Default for FrameworkOptions {
    fn default() -> Self {
        Self {
            prefix: Prefix::from(constant::framework::DEFAULT_PREFIX),
            use_prefix_spaces: false,
            owner_ids: vec![],
            prefix_cache_size: constant::framework::PREFIX_CACHE_SIZE,
        }
    }
}

impl FrameworkOptions {
    pub fn new(prefix: impl Into<Prefix>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn use_prefix_spaces(mut self, use_prefix_spaces: bool) -> Self {
        self.use_prefix_spaces = use_prefix_spaces;
        self
    }

    pub fn owner_ids(mut self, owner_ids: impl IntoIterator<Item = UserId>) -> Self {
        self.owner_ids = owner_ids.into_iter().collect();
        self
    }
}

/// A message matched to a command, before any guard has run.
#[derive(Clone, Debug)]
pub struct Invocation {
    /// The prefix as it appeared in the message
    pub prefix: String,
    /// The effective command (the subcommand, for groups)
    pub command: Arc<Command>,
    /// The category whose checks apply
    pub category: Option<String>,
    /// Tokens left for argument parsing
    pub tokens: Vec<String>,
}

struct FrameworkInner {
    platform: Arc<dyn Platform>,
    options: FrameworkOptions,
    prefix: RwLock<Prefix>,
    matchers: Mutex<LruCache<Vec<String>, Arc<PrefixMatcher>>>,
    registry: RwLock<Registry>,
    cooldowns: CooldownTracker,
    observers: RwLock<Vec<Arc<dyn Observer>>>,
    inputs: Arc<InputHub>,
}

/// The dispatch core: registry, prefix, cooldowns and lifecycle observers.
///
/// Cheap to clone; every clone shares the same state.
#[derive(Clone)]
pub struct Framework {
    inner: Arc<FrameworkInner>,
}

impl Framework {
    pub fn new(
        platform: Arc<dyn Platform>,
        options: FrameworkOptions,
    ) -> Result<Self, FrameworkError> {
        if options.prefix.is_empty() {
            return Err(FrameworkError::EmptyPrefix);
        }

        let cooldowns = CooldownTracker::default();
        Ok(Self {
            inner: Arc::new(FrameworkInner {
                platform,
                prefix: RwLock::new(options.prefix.clone()),
                matchers: Mutex::new(LruCache::new(options.prefix_cache_size)),
                registry: RwLock::new(Registry::new(cooldowns.clone())),
                cooldowns,
                observers: RwLock::new(vec![]),
                inputs: Arc::new(InputHub::default()),
                options,
            }),
        })
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.inner.platform
    }

    pub fn options(&self) -> &FrameworkOptions {
        &self.inner.options
    }

    pub fn inputs(&self) -> &Arc<InputHub> {
        &self.inner.inputs
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.inner.cooldowns
    }

    pub fn is_owner(&self, user: &UserId) -> bool {
        self.inner.options.owner_ids.contains(user)
    }

    /// The prefix currently in use.
    pub fn prefix(&self) -> Prefix {
        self.inner.prefix.read().clone()
    }

    pub fn set_prefix(&self, prefix: impl Into<Prefix>) -> Result<(), FrameworkError> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(FrameworkError::EmptyPrefix);
        }
        *self.inner.prefix.write() = prefix;
        Ok(())
    }

    /// Evaluates a deferred prefix once and keeps the result. Call once the
    /// platform knows the application user.
    pub fn bind_prefix(&self) {
        let Prefix::Deferred(resolver) = self.prefix() else {
            return;
        };
        let bound = resolver(self);
        debug!(prefix = ?bound, "bound prefix");
        *self.inner.prefix.write() = bound;
    }

    pub fn add_observer(&self, observer: Arc<dyn Observer>) {
        self.inner.observers.write().push(observer);
    }

    fn observers(&self) -> Vec<Arc<dyn Observer>> {
        self.inner.observers.read().clone()
    }

    pub fn registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner.registry.read()
    }

    pub fn add_command(&self, command: Command) -> Result<(), RegistryError> {
        self.inner.registry.write().add_command(command)
    }

    pub fn remove_command(&self, name: &str) -> Option<Arc<Command>> {
        self.inner.registry.write().remove_command(name)
    }

    pub fn reload_command(&self, name: &str) -> Result<(), RegistryError> {
        self.inner.registry.write().reload_command(name)
    }

    pub fn load_category(&self, category: Category) -> Result<(), RegistryError> {
        self.inner.registry.write().load_category(category)
    }

    pub fn unload_category(&self, name: &str) -> Option<Category> {
        self.inner.registry.write().unload_category(name)
    }

    pub fn reload_category(&self, name: &str) -> Result<(), RegistryError> {
        self.inner.registry.write().reload_category(name)
    }

    pub fn get_command(&self, query: &str) -> Option<Arc<Command>> {
        self.inner.registry.read().get_command(query)
    }

    pub fn get_category(&self, name: &str) -> Option<Category> {
        self.inner.registry.read().get_category(name).cloned()
    }

    /// Routes a reaction to an interactive session, if one is waiting on it.
    pub fn handle_reaction(&self, reaction: &ReactionEvent) -> bool {
        self.inner
            .inputs
            .offer_reaction(self.inner.platform.as_ref(), reaction)
    }

    /// Processes one incoming message. Never fails: every outcome is
    /// reported to the observers.
    pub async fn handle_message(&self, message: Message) {
        if message.author.bot {
            return;
        }
        if self
            .inner
            .inputs
            .offer_message(self.inner.platform.as_ref(), &message)
        {
            trace!(message = %message.id, "message consumed by session");
            return;
        }

        let message = Arc::new(message);
        let Some(invocation) = self.resolve(&message).await else {
            return;
        };
        self.dispatch(message, invocation).await;
    }

    /// Matches the prefix and command of a message without running anything.
    pub async fn resolve(&self, message: &Arc<Message>) -> Option<Invocation> {
        let Some(found) = self.match_prefix(message).await else {
            trace!(message = %message.id, "no prefix");
            return None;
        };

        let rest = &message.content[found.len..];
        if !self.inner.options.use_prefix_spaces && rest.starts_with(char::is_whitespace) {
            return None;
        }

        let mut tokens = rest.split_whitespace().map(str::to_string);
        let name = tokens.next()?.to_lowercase();
        let mut tokens: Vec<String> = tokens.collect();

        let Some(command) = self.get_command(&name) else {
            trace!(command = %name, "unknown command");
            return None;
        };

        let mut category = command.category.clone();
        let mut effective = command;
        if effective.is_group()
            && let Some(sub) = tokens.first().and_then(|t| effective.get_subcommand(t))
        {
            tokens.remove(0);
            category = sub.category.clone().or(category);
            effective = sub;
        }

        Some(Invocation {
            prefix: found.prefix,
            command: effective,
            category,
            tokens,
        })
    }

    async fn match_prefix(&self, message: &Arc<Message>) -> Option<PrefixMatch> {
        let literals = match self.prefix().literals(self, message).await {
            Ok(literals) => literals,
            Err(err) => {
                warn!(message = %message.id, error = %err, "failed to resolve prefix");
                return None;
            }
        };
        self.matcher(literals)?.find(&message.content)
    }

    fn matcher(&self, literals: Vec<String>) -> Option<Arc<PrefixMatcher>> {
        let mut matchers = self.inner.matchers.lock();
        if let Some(matcher) = matchers.get(&literals) {
            return Some(matcher.clone());
        }

        match PrefixMatcher::new(&literals, self.inner.options.use_prefix_spaces) {
            Ok(matcher) => {
                let matcher = Arc::new(matcher);
                matchers.put(literals, matcher.clone());
                Some(matcher)
            }
            Err(err) => {
                warn!(?literals, error = %err, "failed to compile prefix");
                None
            }
        }
    }

    async fn dispatch(&self, message: Arc<Message>, invocation: Invocation) {
        let member = message
            .guild_id
            .as_ref()
            .and_then(|guild| self.inner.platform.member(guild, &message.author.id));
        let mut ctx = Context {
            framework: self.clone(),
            message,
            command: invocation.command,
            args: Arguments::default(),
            prefix: invocation.prefix,
            member,
        };
        let observers = self.observers();

        let guarded = match self.guard(&ctx, invocation.category.as_deref()).await {
            Ok(()) => argument::parse(&ctx, &ctx.command.arguments, &invocation.tokens),
            Err(err) => Err(err),
        };
        match guarded {
            Ok(args) => ctx.args = args,
            Err(err) => {
                debug!(command = %ctx.command.qualified_name(), code = err.error_code(), "command rejected");
                for observer in &observers {
                    observer.command_error(&ctx, &err).await;
                }
                return;
            }
        }

        if let Some(cooldown) = ctx.command.cooldown
            && let CooldownStatus::Cooling { remaining } = self.inner.cooldowns.check_and_record(
                &ctx.command.qualified_name(),
                &ctx.author().id,
                cooldown,
            )
        {
            for observer in &observers {
                observer
                    .command_cooldown(&ctx, remaining.as_secs_f64())
                    .await;
            }
            return;
        }

        self.execute(ctx, &observers).await;
    }

    /// Guild-only, permissions, then category and command checks.
    async fn guard(&self, ctx: &Context, category: Option<&str>) -> Result<(), CommandError> {
        let command = &ctx.command;
        if command.guild_only && !ctx.in_guild() {
            return Err(CommandError::NoPrivateContext);
        }

        if ctx.in_guild() {
            if !command.app_permissions.is_empty() {
                let held = ctx.app_member().map(|m| m.permissions).unwrap_or_default();
                let missing = held.missing(&command.app_permissions);
                if !missing.is_empty() {
                    return Err(CommandError::MissingApplicationPermissions(missing));
                }
            }
            if !command.caller_permissions.is_empty() {
                let held = ctx
                    .member
                    .as_ref()
                    .map(|m| m.permissions.clone())
                    .unwrap_or_default();
                let missing = held.missing(&command.caller_permissions);
                if !missing.is_empty() {
                    return Err(CommandError::MissingCallerPermissions(missing));
                }
            }
        }

        let category_checks = category
            .and_then(|name| {
                self.registry()
                    .get_category(name)
                    .map(|category| category.checks.clone())
            })
            .unwrap_or_default();

        for check in category_checks.iter().chain(&command.checks) {
            let outcome = match AssertUnwindSafe(check.evaluate(ctx)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => Err(anyhow::anyhow!(
                    "check panicked: {}",
                    panic_message(panic.as_ref())
                )),
            };
            match outcome {
                Ok(true) => {}
                Ok(false) => {
                    return Err(CommandError::CheckFailed {
                        check: check.name().to_string(),
                        source: None,
                    });
                }
                Err(err) => {
                    return Err(CommandError::CheckFailed {
                        check: check.name().to_string(),
                        source: Some(err),
                    });
                }
            }
        }

        Ok(())
    }

    async fn execute(&self, ctx: Context, observers: &[Arc<dyn Observer>]) {
        let Some(handler) = ctx.command.handler.clone() else {
            warn!(command = %ctx.command.qualified_name(), "registered command has no handler");
            return;
        };

        let started = Instant::now();
        for observer in observers {
            observer.before_command_execute(&ctx).await;
        }
        for observer in observers {
            observer.command_execute(&ctx).await;
        }

        // The handler closure may panic before returning its future.
        let result = match AssertUnwindSafe(async { handler(ctx.clone()).await })
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(anyhow::anyhow!(
                "command panicked: {}",
                panic_message(panic.as_ref())
            )),
        };

        match result {
            Ok(()) => {
                for observer in observers {
                    observer.after_command_execute(&ctx, started).await;
                }
            }
            Err(err) => {
                let err = CommandError::Execution(err);
                for observer in observers {
                    observer.command_error(&ctx, &err).await;
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
