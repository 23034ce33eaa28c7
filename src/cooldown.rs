//! Per-command, per-caller cooldowns.
//!
//! Each command (or subcommand, keyed by its qualified name) owns a namespace
//! mapping callers to the instant of their last successful invocation.
//! Entries remove themselves once the cooldown has elapsed.

use std::{sync::Arc, time::Duration};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::time::Instant;
use tracing::trace;

use crate::model::UserId;

type Namespace = Arc<DashMap<UserId, Instant>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CooldownStatus {
    /// The invocation was recorded.
    Ready,
    /// The caller must wait before invoking again.
    Cooling { remaining: Duration },
}

impl CooldownStatus {
    pub fn remaining_secs(&self) -> f64 {
        match self {
            Self::Ready => 0.0,
            Self::Cooling { remaining } => remaining.as_secs_f64(),
        }
    }
}

#[derive(Clone, Default)]
pub struct CooldownTracker {
    namespaces: Arc<DashMap<String, Namespace>>,
}

impl CooldownTracker {
    pub fn prepare(&self, command: &str) {
        self.namespace(command);
    }

    pub fn forget(&self, command: &str) {
        self.namespaces.remove(&command.to_lowercase());
    }

    /// Checks the caller's last invocation and, if the cooldown has passed,
    /// records a new one.
    pub fn check_and_record(
        &self,
        command: &str,
        caller: &UserId,
        cooldown: Duration,
    ) -> CooldownStatus {
        let times = self.namespace(command);
        let now = Instant::now();

        match times.entry(caller.clone()) {
            Entry::Occupied(mut entry) => {
                let expires = *entry.get() + cooldown;
                if now < expires {
                    return CooldownStatus::Cooling {
                        remaining: expires - now,
                    };
                }
                entry.insert(now);
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
            }
        }

        self.schedule_expiry(&times, caller.clone(), now, cooldown);
        CooldownStatus::Ready
    }

    /// Time left for `caller` without recording anything.
    pub fn remaining(&self, command: &str, caller: &UserId, cooldown: Duration) -> Option<Duration> {
        let times = self.namespaces.get(&command.to_lowercase())?.clone();
        let last = *times.get(caller)?;
        (last + cooldown).checked_duration_since(Instant::now())
    }

    pub fn len(&self, command: &str) -> usize {
        self.namespaces
            .get(&command.to_lowercase())
            .map_or(0, |times| times.len())
    }

    fn namespace(&self, command: &str) -> Namespace {
        self.namespaces
            .entry(command.to_lowercase())
            .or_default()
            .clone()
    }

    fn schedule_expiry(&self, times: &Namespace, caller: UserId, recorded: Instant, cooldown: Duration) {
        // Outside a runtime, expired entries are simply overwritten on the next check.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let times = Arc::downgrade(times);
        runtime.spawn(async move {
            tokio::time::sleep(cooldown).await;
            if let Some(times) = times.upgrade()
                && times.remove_if(&caller, |_, last| *last == recorded).is_some()
            {
                trace!(user = %caller, "cooldown expired");
            }
        });
    }
}
