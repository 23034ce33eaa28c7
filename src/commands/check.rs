use std::{fmt, future::Future, sync::Arc};

use futures::future::BoxFuture;

use crate::context::Context;

type SyncCheck = Arc<dyn Fn(&Context) -> anyhow::Result<bool> + Send + Sync>;
type AsyncCheck = Arc<dyn Fn(Context) -> BoxFuture<'static, anyhow::Result<bool>> + Send + Sync>;

#[derive(Clone)]
enum CheckFn {
    Sync(SyncCheck),
    Async(AsyncCheck),
}

/// A named predicate that must pass before a command runs.
///
/// `false` and `Err` both fail the check; the error is kept as the cause.
#[derive(Clone)]
pub struct Check {
    name: String,
    check: CheckFn,
}

impl Check {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        Self::try_new(name, move |ctx| Ok(check(ctx)))
    }

    pub fn try_new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Context) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: CheckFn::Sync(Arc::new(check)),
        }
    }

    pub fn new_async<F, Fut>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        Self {
            name: name.into(),
            check: CheckFn::Async(Arc::new(move |ctx| Box::pin(check(ctx)))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn evaluate(&self, ctx: &Context) -> anyhow::Result<bool> {
        match &self.check {
            CheckFn::Sync(check) => check(ctx),
            CheckFn::Async(check) => check(ctx.clone()).await,
        }
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check").field("name", &self.name).finish()
    }
}

/// Passes when the caller is one of the configured owners.
pub fn is_owner() -> Check {
    Check::new("is_owner", |ctx| {
        ctx.framework.is_owner(&ctx.author().id)
    })
}
