//! A message-driven command dispatch core for chat bots.
//!
//! Incoming messages pass through prefix resolution, command lookup, guards,
//! argument conversion and cooldowns before a handler runs. Every outcome is
//! reported to [`Observer`]s; nothing is ever returned to the receive loop.

pub mod commands;
pub mod constant;
pub mod context;
pub mod converter;
pub mod cooldown;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod input;
pub mod model;
pub mod paginator;
pub mod platform;
pub mod prefix;
pub mod serenity_platform;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use commands::{ArgumentKind, ArgumentSpec, Category, Check, Command, Registry, Source};
pub use context::Context;
pub use dispatch::{Framework, FrameworkOptions, Invocation};
pub use error::{CommandError, FrameworkError, PaginatorError, PlatformError, RegistryError};
pub use events::{LoggingObserver, Observer};
pub use paginator::{PaginatorHandle, PaginatorMode, PaginatorOptions};
pub use platform::Platform;
pub use prefix::Prefix;
