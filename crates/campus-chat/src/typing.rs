//! Typing indicators.
//!
//! Two independent timer tables live here: [`TypingPresence`] holds one
//! expiry deadline per remote peer, [`TypingDebounce`] holds the single
//! deadline for the local user's automatic stop signal. Neither spawns
//! anything; the driver sleeps until the earliest deadline and calls back.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use campus_types::{ChannelRef, UserId};

#[derive(Debug, Clone)]
struct TypingEntry {
    display_name: String,
    deadline: Instant,
}

/// Peers currently typing in the active channel, keyed by identity.
///
/// Stop signals carry only an identity, so the display name is kept in the
/// entry and removal is always by id.
#[derive(Debug)]
pub struct TypingPresence {
    entries: HashMap<UserId, TypingEntry>,
    expiry: Duration,
}

impl TypingPresence {
    pub fn new(expiry: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            expiry,
        }
    }

    /// Add `user` or refresh their deadline. Returns true if newly added.
    pub fn start(&mut self, user: UserId, display_name: String, now: Instant) -> bool {
        let deadline = now + self.expiry;
        match self.entries.get_mut(&user) {
            Some(entry) => {
                entry.deadline = deadline;
                entry.display_name = display_name;
                false
            }
            None => {
                self.entries.insert(
                    user,
                    TypingEntry {
                        display_name,
                        deadline,
                    },
                );
                true
            }
        }
    }

    /// Remove `user` and cancel their pending expiry.
    pub fn stop(&mut self, user: &UserId) -> Option<String> {
        self.entries.remove(user).map(|entry| entry.display_name)
    }

    /// Drop every entry whose deadline has passed and return their names.
    pub fn expire(&mut self, now: Instant) -> Vec<String> {
        let mut expired = Vec::new();
        self.entries.retain(|_, entry| {
            if entry.deadline <= now {
                expired.push(entry.display_name.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|entry| entry.deadline).min()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, user: &UserId) -> bool {
        self.entries.contains_key(user)
    }

    /// Display names, sorted for stable rendering.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .values()
            .map(|entry| entry.display_name.clone())
            .collect();
        names.sort();
        names
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The local user's pending stop signal.
#[derive(Debug)]
pub struct TypingDebounce {
    window: Duration,
    armed: Option<(ChannelRef, Instant)>,
}

impl TypingDebounce {
    pub fn new(window: Duration) -> Self {
        Self { window, armed: None }
    }

    /// Arm the timer, replacing any pending one.
    pub fn arm(&mut self, channel: ChannelRef, now: Instant) {
        self.armed = Some((channel, now + self.window));
    }

    /// Cancel the timer. Returns the channel it was armed for, if any.
    pub fn cancel(&mut self) -> Option<ChannelRef> {
        self.armed.take().map(|(channel, _)| channel)
    }

    /// Disarm and return the channel if the deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<ChannelRef> {
        let due = matches!(&self.armed, Some((_, deadline)) if *deadline <= now);
        if due { self.cancel() } else { None }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.as_ref().map(|(_, deadline)| *deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    #[test]
    fn entry_expires_after_window() {
        let t0 = Instant::now();
        let mut presence = TypingPresence::new(Duration::from_secs(3));
        presence.start(user("u1"), "Ada".into(), t0);

        assert!(presence.expire(t0 + Duration::from_millis(2999)).is_empty());
        assert_eq!(presence.expire(t0 + Duration::from_secs(3)), ["Ada"]);
        assert!(presence.is_empty());
    }

    #[test]
    fn refresh_pushes_deadline_out() {
        let t0 = Instant::now();
        let mut presence = TypingPresence::new(Duration::from_secs(3));
        assert!(presence.start(user("u1"), "Ada".into(), t0));
        assert!(!presence.start(user("u1"), "Ada".into(), t0 + Duration::from_secs(2)));

        assert!(presence.expire(t0 + Duration::from_secs(4)).is_empty());
        assert_eq!(presence.next_deadline(), Some(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn stop_removes_by_identity_even_with_shared_names() {
        let t0 = Instant::now();
        let mut presence = TypingPresence::new(Duration::from_secs(3));
        presence.start(user("u1"), "Sam".into(), t0);
        presence.start(user("u2"), "Sam".into(), t0);

        assert_eq!(presence.stop(&user("u2")), Some("Sam".to_string()));
        assert!(presence.contains(&user("u1")));
        assert_eq!(presence.names(), ["Sam"]);
    }

    #[test]
    fn next_deadline_is_earliest_entry() {
        let t0 = Instant::now();
        let mut presence = TypingPresence::new(Duration::from_secs(3));
        presence.start(user("late"), "B".into(), t0 + Duration::from_secs(1));
        presence.start(user("early"), "A".into(), t0);

        assert_eq!(presence.next_deadline(), Some(t0 + Duration::from_secs(3)));
    }

    #[test]
    fn debounce_rearm_replaces_deadline() {
        let t0 = Instant::now();
        let mut debounce = TypingDebounce::new(Duration::from_secs(2));
        debounce.arm(ChannelRef::Forum, t0);
        debounce.arm(ChannelRef::Forum, t0 + Duration::from_secs(1));

        assert_eq!(debounce.take_due(t0 + Duration::from_secs(2)), None);
        assert_eq!(debounce.take_due(t0 + Duration::from_secs(3)), Some(ChannelRef::Forum));
        assert_eq!(debounce.deadline(), None);
    }
}
