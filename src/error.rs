//! Error types for the dispatch core.
//!
//! Dispatch failures ([`CommandError`]) are never returned from message
//! handling; they are delivered to observers through `command_error`.
//! Registry failures ([`RegistryError`]) are programmer mistakes and are
//! returned directly to whoever is registering commands.

use thiserror::Error;

use crate::model::Permission;

fn join_permissions(permissions: &[Permission]) -> String {
    permissions
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reasons a dispatched command did not run to completion.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("this command cannot be used in private messages")]
    NoPrivateContext,

    #[error("the application is missing permissions: {}", join_permissions(.0))]
    MissingApplicationPermissions(Vec<Permission>),

    #[error("the caller is missing permissions: {}", join_permissions(.0))]
    MissingCallerPermissions(Vec<Permission>),

    #[error("check `{check}` failed")]
    CheckFailed {
        check: String,
        /// Set when the check errored rather than returning false
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("missing arguments: {required} required, {received} given")]
    MissingArguments { required: usize, received: usize },

    #[error("too many arguments: {accepted} accepted, {received} given")]
    TooManyArguments { accepted: usize, received: usize },

    #[error("invalid value for argument `{name}`")]
    InvalidArgument { name: String },

    #[error("command failed: {0}")]
    Execution(#[source] anyhow::Error),
}

impl CommandError {
    /// Static label for logging and metrics.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoPrivateContext => "no_private_context",
            Self::MissingApplicationPermissions(_) => "missing_application_permissions",
            Self::MissingCallerPermissions(_) => "missing_caller_permissions",
            Self::CheckFailed { .. } => "check_failed",
            Self::MissingArguments { .. } => "missing_arguments",
            Self::TooManyArguments { .. } => "too_many_arguments",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::Execution(_) => "execution_error",
        }
    }
}

/// Errors raised by registry mutations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("command name must not be empty")]
    EmptyName,

    #[error("name `{0}` is already registered")]
    DuplicateName(String),

    #[error("alias `{0}` is already registered or repeated")]
    DuplicateAlias(String),

    #[error("category `{0}` is already loaded")]
    DuplicateCategory(String),

    #[error("command `{0}` has no handler")]
    MissingHandler(String),

    #[error("command `{command}`: only the last argument may consume the rest (`{argument}`)")]
    InvalidArgumentSpec { command: String, argument: String },

    #[error("no command named `{0}`")]
    UnknownCommand(String),

    #[error("no category named `{0}`")]
    UnknownCategory(String),

    #[error("`{0}` has no source to reload from")]
    NoReloadSource(String),

    #[error("failed to reload `{name}`: {source}")]
    Reload {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors constructing or reconfiguring a framework.
#[derive(Debug, Error)]
pub enum FrameworkError {
    #[error("the prefix must contain at least one non-empty string")]
    EmptyPrefix,
}

/// Failures reported by the platform collaborator.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Failures starting an interactive paginator.
#[derive(Debug, Error)]
pub enum PaginatorError {
    #[error("a paginator needs at least one page")]
    NoPages,

    #[error("the application is missing permissions: {}", join_permissions(.0))]
    MissingApplicationPermissions(Vec<Permission>),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_codes() {
        assert_eq!(CommandError::NoPrivateContext.error_code(), "no_private_context");
        assert_eq!(
            CommandError::InvalidArgument {
                name: "amount".into()
            }
            .error_code(),
            "invalid_argument"
        );
        assert_eq!(
            CommandError::Execution(anyhow::anyhow!("boom")).error_code(),
            "execution_error"
        );
    }

    #[test]
    fn test_permission_messages() {
        let err = CommandError::MissingCallerPermissions(vec![
            Permission::KickMembers,
            Permission::BanMembers,
        ]);
        assert_eq!(
            err.to_string(),
            "the caller is missing permissions: kick_members, ban_members"
        );
    }
}
