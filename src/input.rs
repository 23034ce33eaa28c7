//! Routes user input to interactive sessions waiting on it.

use std::sync::{
    Arc, Weak,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;
use tracing::trace;

use crate::{
    model::{ChannelId, Message, MessageId, ReactionEvent, UserId},
    paginator::{InputSource, Navigation, NavigationInput, SessionInput},
    platform::Platform,
};

/// What a session is listening to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Reactions added to one message
    Reactions(MessageId),
    /// Keyword messages in one channel
    Messages(ChannelId),
}

struct Listener {
    id: u64,
    target: Target,
    /// Only this user may drive the session; otherwise any human may
    author: Option<UserId>,
    tx: flume::Sender<SessionInput>,
}

#[derive(Default)]
pub struct InputHub {
    listeners: Mutex<Vec<Listener>>,
    next_id: AtomicU64,
}

impl InputHub {
    /// Registers a listener; it stays registered until the guard is dropped.
    pub fn listen(
        self: &Arc<Self>,
        target: Target,
        author: Option<UserId>,
        tx: flume::Sender<SessionInput>,
    ) -> ListenerGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push(Listener {
            id,
            target,
            author,
            tx,
        });
        ListenerGuard {
            hub: Arc::downgrade(self),
            id,
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if a session consumed the message.
    pub fn offer_message(&self, platform: &dyn Platform, message: &Message) -> bool {
        let Some(navigation) = Navigation::from_keyword(&message.content) else {
            return false;
        };
        let target = Target::Messages(message.channel_id.clone());
        let input = NavigationInput {
            navigation,
            user_id: message.author.id.clone(),
            source: InputSource::Message(message.id.clone()),
        };
        self.deliver(platform, &target, input)
    }

    /// Returns true if a session consumed the reaction.
    pub fn offer_reaction(&self, platform: &dyn Platform, reaction: &ReactionEvent) -> bool {
        let Some(navigation) = Navigation::from_emoji(&reaction.emoji) else {
            return false;
        };
        let target = Target::Reactions(reaction.message_id.clone());
        let input = NavigationInput {
            navigation,
            user_id: reaction.user_id.clone(),
            source: InputSource::Reaction(reaction.emoji.clone()),
        };
        self.deliver(platform, &target, input)
    }

    fn deliver(&self, platform: &dyn Platform, target: &Target, input: NavigationInput) -> bool {
        if platform
            .current_user()
            .is_some_and(|me| me.id == input.user_id)
        {
            return false;
        }

        let listeners = self.listeners.lock();
        // Newest session first.
        for listener in listeners.iter().rev().filter(|l| l.target == *target) {
            let accepted = match &listener.author {
                Some(author) => *author == input.user_id,
                None => !platform.user(&input.user_id).is_some_and(|u| u.bot),
            };
            if accepted && listener.tx.send(SessionInput::Navigate(input.clone())).is_ok() {
                trace!(listener = listener.id, user = %input.user_id, "delivered session input");
                return true;
            }
        }
        false
    }

    fn remove(&self, id: u64) {
        self.listeners.lock().retain(|l| l.id != id);
    }
}

pub struct ListenerGuard {
    hub: Weak<InputHub>,
    id: u64,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ALICE_ID, APP_ID, BOB_ID, BOT_ID, GENERAL_ID, MockPlatform, message_from};

    fn reaction(user: &str, emoji: &str) -> ReactionEvent {
        ReactionEvent {
            channel_id: ChannelId::new(GENERAL_ID),
            message_id: MessageId::new("900000000000000002"),
            user_id: UserId::new(user),
            emoji: emoji.to_string(),
        }
    }

    #[test]
    fn test_author_only_filter() {
        let hub = Arc::new(InputHub::default());
        let platform = MockPlatform::new();
        let (tx, rx) = flume::unbounded();
        let _guard = hub.listen(
            Target::Messages(ChannelId::new(GENERAL_ID)),
            Some(UserId::new(ALICE_ID)),
            tx,
        );

        assert!(!hub.offer_message(&platform, &message_from(BOB_ID, "next", true)));
        assert!(!hub.offer_message(&platform, &message_from(ALICE_ID, "hello", true)));
        assert!(hub.offer_message(&platform, &message_from(ALICE_ID, " NEXT ", true)));

        let Ok(SessionInput::Navigate(input)) = rx.try_recv() else {
            panic!("expected navigation input");
        };
        assert_eq!(input.navigation, Navigation::Next);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_open_sessions_ignore_bots_and_self() {
        let hub = Arc::new(InputHub::default());
        let platform = MockPlatform::new();
        let (tx, rx) = flume::unbounded();
        let _guard = hub.listen(
            Target::Reactions(MessageId::new("900000000000000002")),
            None,
            tx,
        );

        assert!(!hub.offer_reaction(&platform, &reaction(APP_ID, "▶")));
        assert!(!hub.offer_reaction(&platform, &reaction(BOT_ID, "▶")));
        assert!(!hub.offer_reaction(&platform, &reaction(BOB_ID, "👍")));
        assert!(hub.offer_reaction(&platform, &reaction(BOB_ID, "▶\u{fe0f}")));
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_guard_unregisters() {
        let hub = Arc::new(InputHub::default());
        let (tx, _rx) = flume::unbounded();
        let guard = hub.listen(Target::Messages(ChannelId::new(GENERAL_ID)), None, tx);
        assert_eq!(hub.len(), 1);
        drop(guard);
        assert!(hub.is_empty());
    }
}
