use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{context::Context, error::CommandError};

/// Subscriber for command lifecycle notifications.
///
/// Every dispatched message produces at most one terminal notification:
/// `command_error`, `command_cooldown`, or `after_command_execute`.
#[async_trait]
pub trait Observer: Send + Sync {
    async fn command_error(&self, _ctx: &Context, _error: &CommandError) {}

    async fn before_command_execute(&self, _ctx: &Context) {}

    async fn command_execute(&self, _ctx: &Context) {}

    /// `started` is taken right before the handler was invoked.
    async fn after_command_execute(&self, _ctx: &Context, _started: Instant) {}

    async fn command_cooldown(&self, _ctx: &Context, _remaining_secs: f64) {}
}

/// Writes lifecycle notifications to the tracing subscriber.
pub struct LoggingObserver;

#[async_trait]
impl Observer for LoggingObserver {
    async fn command_error(&self, ctx: &Context, error: &CommandError) {
        let command = ctx.command.qualified_name();
        match error {
            CommandError::Execution(cause) => {
                warn!(%command, user = %ctx.author().id, error = ?cause, "command failed")
            }
            _ => debug!(
                %command,
                user = %ctx.author().id,
                code = error.error_code(),
                "command rejected: {error}"
            ),
        }
    }

    async fn command_execute(&self, ctx: &Context) {
        debug!(command = %ctx.command.qualified_name(), user = %ctx.author().id, "executing command");
    }

    async fn after_command_execute(&self, ctx: &Context, started: Instant) {
        info!(
            command = %ctx.command.qualified_name(),
            user = %ctx.author().id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "command finished"
        );
    }

    async fn command_cooldown(&self, ctx: &Context, remaining_secs: f64) {
        debug!(
            command = %ctx.command.qualified_name(),
            user = %ctx.author().id,
            remaining_secs,
            "command on cooldown"
        );
    }
}
