// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory conversational session registry.
//!
//! One live session per user, keyed by user id. The registry is owned by the
//! application state and passed into event handlers; state is process-local
//! and a restart drops every in-flight conversation by design.
//!
//! Per-user serialization: mutations go through dashmap's entry locks, so no
//! two read-modify-write transitions for the same user can interleave even
//! when different users' events are handled concurrently.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::types::UserId;

/// Single-slot-per-user finite-state-machine store.
///
/// The flow-specific state type `S` carries both the named state and the
/// partial answers collected so far.
#[derive(Debug)]
pub struct SessionRegistry<S> {
    slots: DashMap<UserId, S>,
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SessionRegistry<S> {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Starts a flow for a user, displacing any prior session.
    ///
    /// Returns the displaced session, if any.
    pub fn start(&self, user: UserId, state: S) -> Option<S> {
        self.slots.insert(user, state)
    }

    /// Replaces the state of an existing session.
    ///
    /// Returns `false` if the user has no live session (the flow was
    /// cancelled or never started); the caller should treat the event as
    /// stale and fall through.
    pub fn advance(&self, user: UserId, state: S) -> bool {
        match self.slots.entry(user) {
            Entry::Occupied(mut slot) => {
                slot.insert(state);
                true
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Applies a read-modify-write transition under the per-user entry lock.
    ///
    /// Returns `false` if the user has no live session.
    pub fn update(&self, user: UserId, f: impl FnOnce(&mut S)) -> bool {
        match self.slots.get_mut(&user) {
            Some(mut slot) => {
                f(slot.value_mut());
                true
            }
            None => false,
        }
    }

    /// Removes and returns the session, if any (terminal submission).
    pub fn take(&self, user: UserId) -> Option<S> {
        self.slots.remove(&user).map(|(_, state)| state)
    }

    /// Unconditional clear, triggered by the reserved cancel command.
    pub fn cancel(&self, user: UserId) -> bool {
        self.slots.remove(&user).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<S: Clone> SessionRegistry<S> {
    /// Returns a snapshot of the user's session state, or `None` if absent.
    pub fn get(&self, user: UserId) -> Option<S> {
        self.slots.get(&user).map(|slot| slot.value().clone())
    }
}
