//! Per-key single-flight memoization.
//!
//! # State Transitions
//! ```text
//! (absent) → Pending: first caller inserts a shared creation future
//! Pending  → Ready:   creation succeeded (published once)
//! Pending  → (absent): creation failed; nothing is cached
//! Ready/Pending → (absent): explicit invalidation
//! ```
//!
//! Each creation runs on its own task and settles its slot when it finishes,
//! whether or not anyone is still waiting. Concurrent callers for the same
//! key await one shared handle to that task and see the same value or the
//! same error. Shard locks are never held across an `.await`. A slot is only
//! settled by the flight that created it (matched by ticket), so an
//! invalidated or replaced flight cannot overwrite newer state.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinError;

type Flight<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

enum Slot<V, E> {
    Ready(V),
    Pending { ticket: u64, flight: Flight<V, E> },
}

/// How a lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Value was already published.
    Hit,
    /// Joined a creation started by another caller.
    Joined,
    /// This caller started the creation.
    Created,
}

impl Lookup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lookup::Hit => "hit",
            Lookup::Joined => "joined",
            Lookup::Created => "created",
        }
    }
}

/// A concurrent map whose values are created at most once per key at a time.
pub struct SingleFlight<K, V, E> {
    slots: Arc<DashMap<K, Slot<V, E>>>,
    next_ticket: AtomicU64,
}

impl<K, V, E> SingleFlight<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<JoinError> + 'static,
{
    pub fn new() -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Published value for `key`, if any. Never waits.
    pub fn get(&self, key: &K) -> Option<V> {
        match self.slots.get(key)?.value() {
            Slot::Ready(value) => Some(value.clone()),
            Slot::Pending { .. } => None,
        }
    }

    /// Return the value for `key`, creating it with `init` if nobody has.
    ///
    /// `init` is only called when this caller starts the creation, and its
    /// future is spawned onto the runtime. Dropping the returned future never
    /// cancels or stalls the creation; a panicking creation surfaces as the
    /// `JoinError` conversion of `E`.
    pub async fn get_or_try_init<F, Fut>(&self, key: &K, init: F) -> (Result<V, E>, Lookup)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        if let Some(value) = self.get(key) {
            return (Ok(value), Lookup::Hit);
        }

        let (flight, lookup) = match self.slots.entry(key.clone()) {
            Entry::Occupied(entry) => match entry.get() {
                Slot::Ready(value) => return (Ok(value.clone()), Lookup::Hit),
                Slot::Pending { flight, .. } => (flight.clone(), Lookup::Joined),
            },
            Entry::Vacant(entry) => {
                let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                let creation = init();
                let slots = self.slots.clone();
                let owned_key = key.clone();
                let task = tokio::spawn(async move {
                    let outcome = creation.await;
                    settle(&slots, &owned_key, ticket, &outcome);
                    outcome
                });

                let slots = self.slots.clone();
                let owned_key = key.clone();
                let flight = async move {
                    match task.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            let outcome = Err(E::from(e));
                            settle(&slots, &owned_key, ticket, &outcome);
                            outcome
                        }
                    }
                }
                .boxed()
                .shared();
                entry.insert(Slot::Pending {
                    ticket,
                    flight: flight.clone(),
                });
                (flight, Lookup::Created)
            }
        };

        (flight.await, lookup)
    }

    /// Drop the entry for `key`. Returns whether anything was removed.
    pub fn invalidate(&self, key: &K) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Number of published values.
    pub fn ready_len(&self) -> usize {
        self.slots
            .iter()
            .filter(|r| matches!(r.value(), Slot::Ready(_)))
            .count()
    }

    /// Keys with a published value.
    pub fn ready_keys(&self) -> Vec<K> {
        self.slots
            .iter()
            .filter(|r| matches!(r.value(), Slot::Ready(_)))
            .map(|r| r.key().clone())
            .collect()
    }
}

impl<K, V, E> Default for SingleFlight<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<JoinError> + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Publish or discard the outcome of flight `ticket`, if it still owns the slot.
fn settle<K, V, E>(slots: &DashMap<K, Slot<V, E>>, key: &K, ticket: u64, outcome: &Result<V, E>)
where
    K: Eq + Hash,
    V: Clone,
{
    let owns = |slot: &Slot<V, E>| matches!(slot, Slot::Pending { ticket: t, .. } if *t == ticket);

    match outcome {
        Ok(value) => {
            if let Some(mut slot) = slots.get_mut(key) {
                if owns(slot.value()) {
                    *slot.value_mut() = Slot::Ready(value.clone());
                }
            }
        }
        Err(_) => {
            slots.remove_if(key, |_, slot| owns(slot));
        }
    }
}
