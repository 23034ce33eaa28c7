//! Multi-page responses driven by reactions or keyword messages.
//!
//! Each session runs in its own task and receives input through a channel
//! fed by the framework's [`InputHub`](crate::input::InputHub).

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, warn};

use crate::{
    constant::paginator::{DEFAULT_TIMEOUT, EMOJI, HINT, KEYWORDS, VARIATION_SELECTOR},
    context::Context,
    error::PaginatorError,
    input::{ListenerGuard, Target},
    model::{ChannelId, MessageId, Permission, PermissionSet, UserId},
    platform::Platform,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaginatorMode {
    #[default]
    Reaction,
    Message,
}

#[derive(Clone, Debug)]
pub struct PaginatorOptions {
    pub pages: Vec<String>,
    pub mode: PaginatorMode,
    /// Inactivity timeout; reset by every accepted input
    pub timeout: Duration,
    pub author_only: bool,
}

impl PaginatorOptions {
    pub fn new<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
            mode: PaginatorMode::Reaction,
            timeout: DEFAULT_TIMEOUT,
            author_only: true,
        }
    }

    pub fn mode(mut self, mode: PaginatorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn author_only(mut self, author_only: bool) -> Self {
        self.author_only = author_only;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    First,
    Previous,
    Stop,
    Next,
    Last,
}

impl Navigation {
    pub const ALL: [Navigation; 5] = [
        Navigation::First,
        Navigation::Previous,
        Navigation::Stop,
        Navigation::Next,
        Navigation::Last,
    ];

    fn position(self) -> usize {
        self as usize
    }

    pub fn emoji(self) -> &'static str {
        EMOJI[self.position()]
    }

    pub fn keyword(self) -> &'static str {
        KEYWORDS[self.position()]
    }

    pub fn from_emoji(emoji: &str) -> Option<Self> {
        let emoji: String = emoji.chars().filter(|c| *c != VARIATION_SELECTOR).collect();
        Self::ALL.into_iter().find(|n| n.emoji() == emoji)
    }

    pub fn from_keyword(content: &str) -> Option<Self> {
        let content = content.trim().to_lowercase();
        Self::ALL.into_iter().find(|n| n.keyword() == content)
    }
}

/// Outcome of applying one navigation input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Render(usize),
    Unchanged,
    Stop,
}

/// Position within a non-empty list of pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageCursor {
    index: usize,
    len: usize,
    stopped: bool,
}

impl PageCursor {
    pub fn new(len: usize) -> Option<Self> {
        (len > 0).then_some(Self {
            index: 0,
            len,
            stopped: false,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn apply(&mut self, navigation: Navigation) -> Step {
        if self.stopped {
            return Step::Unchanged;
        }

        let last = self.len - 1;
        let next = match navigation {
            Navigation::Stop => {
                self.stopped = true;
                return Step::Stop;
            }
            Navigation::First => 0,
            Navigation::Last => last,
            Navigation::Previous if self.index == 0 => return Step::Unchanged,
            Navigation::Previous => self.index - 1,
            Navigation::Next if self.index == last => return Step::Unchanged,
            Navigation::Next => self.index + 1,
        };
        self.index = next;
        Step::Render(next)
    }
}

/// Where a navigation input came from, so it can be cleaned up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSource {
    /// The reaction emoji, as reported by the platform
    Reaction(String),
    /// The keyword message
    Message(MessageId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationInput {
    pub navigation: Navigation,
    pub user_id: UserId,
    pub source: InputSource,
}

pub enum SessionInput {
    Navigate(NavigationInput),
    Close,
}

/// Handle to a paginator running in its own task
pub struct PaginatorHandle {
    tx: flume::Sender<SessionInput>,
    message_id: MessageId,
    join_handle: JoinHandle<usize>,
}

impl PaginatorHandle {
    /// The message showing the current page
    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    pub fn close(&self) {
        let _ = self.tx.send(SessionInput::Close);
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }

    /// Waits for the session to end, returning the last page shown.
    pub async fn wait(self) -> anyhow::Result<usize> {
        drop(self.tx);
        Ok(self.join_handle.await?)
    }
}

pub(crate) async fn start(
    ctx: &Context,
    options: PaginatorOptions,
) -> Result<PaginatorHandle, PaginatorError> {
    let cursor = PageCursor::new(options.pages.len()).ok_or(PaginatorError::NoPages)?;
    let platform = ctx.platform().clone();
    let channel = ctx.channel_id().clone();

    if options.mode == PaginatorMode::Reaction && ctx.in_guild() {
        let held = ctx.app_member().map(|m| m.permissions).unwrap_or_default();
        let missing = held.missing(&PermissionSet::from([Permission::AddReactions]));
        if !missing.is_empty() {
            return Err(PaginatorError::MissingApplicationPermissions(missing));
        }
    }

    let message = platform.send_message(&channel, &options.pages[0]).await?;
    let author = options.author_only.then(|| ctx.author().id.clone());
    let (tx, rx) = flume::unbounded();

    let (hint, guard) = match options.mode {
        PaginatorMode::Reaction => {
            let guard = ctx.framework.inputs().listen(
                Target::Reactions(message.id.clone()),
                author,
                tx.clone(),
            );
            for navigation in Navigation::ALL {
                platform
                    .add_reaction(&channel, &message.id, navigation.emoji())
                    .await?;
            }
            (None, guard)
        }
        PaginatorMode::Message => {
            let hint = platform.send_message(&channel, HINT).await?;
            let guard =
                ctx.framework
                    .inputs()
                    .listen(Target::Messages(channel.clone()), author, tx.clone());
            (Some(hint.id), guard)
        }
    };

    let message_id = message.id.clone();
    let session = Session {
        platform,
        channel,
        message: message.id,
        hint,
        mode: options.mode,
        pages: options.pages,
        cursor,
        timeout: options.timeout,
        _guard: guard,
    };
    let join_handle = tokio::spawn(session.run(rx));

    Ok(PaginatorHandle {
        tx,
        message_id,
        join_handle,
    })
}

struct Session {
    platform: Arc<dyn Platform>,
    channel: ChannelId,
    message: MessageId,
    hint: Option<MessageId>,
    mode: PaginatorMode,
    pages: Vec<String>,
    cursor: PageCursor,
    timeout: Duration,
    _guard: ListenerGuard,
}

impl Session {
    async fn run(mut self, rx: flume::Receiver<SessionInput>) -> usize {
        // Only inputs that change the page restart the inactivity timer.
        let mut deadline = Instant::now() + self.timeout;
        loop {
            let input = match tokio::time::timeout_at(deadline, rx.recv_async()).await {
                Ok(Ok(SessionInput::Navigate(input))) => input,
                Ok(Ok(SessionInput::Close)) | Ok(Err(_)) => break,
                Err(_) => {
                    debug!(message = %self.message, "paginator timed out");
                    break;
                }
            };

            match self.cursor.apply(input.navigation) {
                Step::Render(index) => {
                    if let Err(err) = self
                        .platform
                        .edit_message(&self.channel, &self.message, &self.pages[index])
                        .await
                    {
                        warn!(message = %self.message, error = %err, "failed to render page");
                    }
                    self.consume(&input).await;
                    deadline = Instant::now() + self.timeout;
                }
                Step::Unchanged => {}
                Step::Stop => {
                    if self.mode == PaginatorMode::Message {
                        self.consume(&input).await;
                    }
                    break;
                }
            }
        }

        // Inputs arriving during cleanup are no longer consumed.
        drop(rx);
        let index = self.cursor.index();
        self.finish().await;
        index
    }

    /// Removes the reaction or message that carried an input.
    async fn consume(&self, input: &NavigationInput) {
        let result = match &input.source {
            InputSource::Reaction(emoji) => {
                self.platform
                    .remove_reaction(&self.channel, &self.message, emoji, &input.user_id)
                    .await
            }
            InputSource::Message(id) => self.platform.delete_message(&self.channel, id).await,
        };
        if let Err(err) = result {
            debug!(message = %self.message, error = %err, "could not remove navigation input");
        }
    }

    async fn finish(self) {
        match self.mode {
            PaginatorMode::Reaction => {
                if self
                    .platform
                    .remove_all_reactions(&self.channel, &self.message)
                    .await
                    .is_err()
                    && let Err(err) = self
                        .platform
                        .delete_message(&self.channel, &self.message)
                        .await
                {
                    warn!(message = %self.message, error = %err, "failed to clean up paginator");
                }
            }
            PaginatorMode::Message => {
                if let Some(hint) = &self.hint
                    && let Err(err) = self.platform.delete_message(&self.channel, hint).await
                {
                    warn!(message = %self.message, error = %err, "failed to delete paginator hint");
                }
            }
        }
    }
}
