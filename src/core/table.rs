//! # Subscription tables: lifetime-aware subscriber → handler stores.
//!
//! One [`SubscriptionTable`] exists per `(message type, channel type, channel value)`.
//! Tables for one [`ChannelKey`](crate::channels::ChannelKey) are grouped in a
//! [`ChannelTables`], which the registry keeps type-erased behind [`ChannelMap`].
//!
//! ## Rules
//! - Entries are kept in insertion order; `live_handlers` yields that order.
//! - A dead entry (subscriber dropped) is never returned.
//! - Dead entries are evicted lazily when touched by a lookup or enumeration;
//!   `purge` is only driven by an explicit registry cleanup.
//! - The entry lock is never held across an `.await`, and no entry is dropped
//!   while it is held.
//! - Removal is idempotent.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::channels::{Channel, Message};
use crate::core::subscriber::{SubscriberId, SubscriberRef};
use crate::handlers::HandlerRef;

/// One subscription: weak subscriber, owned handler.
struct Entry<M: Message> {
    subscriber: SubscriberRef,
    handler: HandlerRef<M>,
    /// Registration serial; lets a stale handle skip a newer entry.
    serial: u64,
}

/// Lifetime-aware store for one channel value.
pub(crate) struct SubscriptionTable<M: Message> {
    entries: Mutex<Vec<Entry<M>>>,
}

impl<M: Message> SubscriptionTable<M> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry<M>>> {
        // Handlers never run under this lock, so a poisoned guard still holds consistent data.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the handler for a live subscriber, evicting the entry if it is dead.
    pub(crate) fn try_get(&self, id: SubscriberId) -> Option<HandlerRef<M>> {
        let mut entries = self.lock();
        let pos = entries.iter().position(|e| e.subscriber.id() == id)?;

        if entries[pos].subscriber.is_alive() {
            return Some(Arc::clone(&entries[pos].handler));
        }

        let evicted = entries.remove(pos);
        drop(entries);
        trace!(message_type = std::any::type_name::<M>(), "evicted dead subscription");
        drop(evicted);
        None
    }

    /// Inserts an entry, replacing any existing one for the same subscriber in place.
    ///
    /// Uniqueness is the registry's job; this never fails.
    pub(crate) fn add_or_update(
        &self,
        subscriber: SubscriberRef,
        handler: HandlerRef<M>,
        serial: u64,
    ) {
        let mut entries = self.lock();
        let existing = entries
            .iter_mut()
            .find(|e| e.subscriber.id() == subscriber.id());
        let replaced = match existing {
            Some(entry) => {
                entry.subscriber = subscriber;
                entry.serial = serial;
                Some(std::mem::replace(&mut entry.handler, handler))
            }
            None => {
                entries.push(Entry {
                    subscriber,
                    handler,
                    serial,
                });
                None
            }
        };
        drop(entries);
        drop(replaced);
    }

    /// Removes the subscriber's entry if present.
    pub(crate) fn remove(&self, id: SubscriberId) -> bool {
        self.remove_where(|e| e.subscriber.id() == id)
    }

    /// Removes the subscriber's entry only if it was created by registration `serial`.
    pub(crate) fn remove_entry(&self, id: SubscriberId, serial: u64) -> bool {
        self.remove_where(|e| e.subscriber.id() == id && e.serial == serial)
    }

    fn remove_where(&self, pred: impl Fn(&Entry<M>) -> bool) -> bool {
        let mut entries = self.lock();
        let Some(pos) = entries.iter().position(pred) else {
            return false;
        };
        let removed = entries.remove(pos);
        drop(entries);
        drop(removed);
        true
    }

    /// Snapshot of handlers whose subscriber is alive now, in insertion order.
    ///
    /// Dead entries discovered during the walk are purged.
    pub(crate) fn live_handlers(&self) -> LiveHandlers<M> {
        let mut entries = self.lock();
        let dead = Self::split_dead(&mut entries);
        let handlers = entries
            .iter()
            .map(|e| Arc::clone(&e.handler))
            .collect::<Vec<_>>();
        drop(entries);

        if !dead.is_empty() {
            trace!(
                message_type = std::any::type_name::<M>(),
                evicted = dead.len(),
                "evicted dead subscriptions"
            );
        }
        drop(dead);

        LiveHandlers {
            inner: handlers.into_iter(),
        }
    }

    /// Drops every dead entry; returns how many were removed.
    pub(crate) fn purge(&self) -> usize {
        let mut entries = self.lock();
        let dead = Self::split_dead(&mut entries);
        drop(entries);
        dead.len()
    }

    /// Moves dead entries out of `entries`, keeping live ones in order.
    ///
    /// The caller drops the result after unlocking: a dropped handler may own a
    /// `Registration` whose release locks this table again.
    fn split_dead(entries: &mut Vec<Entry<M>>) -> Vec<Entry<M>> {
        if entries.iter().all(|e| e.subscriber.is_alive()) {
            return Vec::new();
        }
        let (live, dead): (Vec<_>, Vec<_>) = std::mem::take(entries)
            .into_iter()
            .partition(|e| e.subscriber.is_alive());
        *entries = live;
        dead
    }

    /// Number of entries with a live subscriber (does not evict).
    pub(crate) fn len(&self) -> usize {
        self.lock().iter().filter(|e| e.subscriber.is_alive()).count()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Finite, non-restartable sequence of live handlers taken by
/// [`SubscriptionTable::live_handlers`].
pub(crate) struct LiveHandlers<M: Message> {
    inner: std::vec::IntoIter<HandlerRef<M>>,
}

impl<M: Message> LiveHandlers<M> {
    pub(crate) fn empty() -> Self {
        Self {
            inner: Vec::new().into_iter(),
        }
    }
}

impl<M: Message> Iterator for LiveHandlers<M> {
    type Item = HandlerRef<M>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<M: Message> ExactSizeIterator for LiveHandlers<M> {}

/// Entry removal seam used by [`Registration`](crate::Registration), which is
/// not generic over the message type.
pub(crate) trait RemoveEntry: Send + Sync {
    fn remove_entry(&self, id: SubscriberId, serial: u64) -> bool;
}

impl<M: Message> RemoveEntry for SubscriptionTable<M> {
    fn remove_entry(&self, id: SubscriberId, serial: u64) -> bool {
        SubscriptionTable::remove_entry(self, id, serial)
    }
}

/// All tables of one channel key, indexed by channel value.
pub(crate) struct ChannelTables<M: Message, C: Channel> {
    tables: HashMap<C, Arc<SubscriptionTable<M>>>,
    table_capacity: usize,
}

impl<M: Message, C: Channel> ChannelTables<M, C> {
    pub(crate) fn new(table_capacity: usize) -> Self {
        Self {
            tables: HashMap::new(),
            table_capacity,
        }
    }

    pub(crate) fn get(&self, channel: &C) -> Option<&Arc<SubscriptionTable<M>>> {
        self.tables.get(channel)
    }

    /// Returns the table for `channel`, creating it on first use. Tables are never removed.
    pub(crate) fn get_or_create(&mut self, channel: &C) -> &Arc<SubscriptionTable<M>> {
        let capacity = self.table_capacity;
        self.tables
            .entry(channel.clone())
            .or_insert_with(|| Arc::new(SubscriptionTable::with_capacity(capacity)))
    }
}

/// Type-erased view of a [`ChannelTables`] for registry-wide operations.
pub(crate) trait ChannelMap: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Removes the subscriber from every table; returns how many entries went away.
    fn remove_subscriber(&self, id: SubscriberId) -> usize;

    /// Purges dead entries from every table; returns how many went away.
    fn purge(&self) -> usize;
}

impl<M: Message, C: Channel> ChannelMap for ChannelTables<M, C> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove_subscriber(&self, id: SubscriberId) -> usize {
        self.tables.values().filter(|t| t.remove(id)).count()
    }

    fn purge(&self) -> usize {
        self.tables.values().map(|t| t.purge()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registration::Registration;
    use crate::error::HandlerError;
    use crate::handlers::{Handler, HandlerFn};
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::time::Duration;

    fn named(name: &'static str) -> HandlerRef<u32> {
        HandlerFn::arc(name, |_: u32| async { Ok::<(), HandlerError>(()) })
    }

    fn names(handlers: LiveHandlers<u32>) -> Vec<String> {
        handlers.map(|h| h.name().to_string()).collect()
    }

    #[test]
    fn test_try_get_live_and_missing() {
        let table = SubscriptionTable::<u32>::with_capacity(4);
        let sub = Arc::new(());
        let other = Arc::new(());

        table.add_or_update(SubscriberRef::new(&sub), named("a"), 1);

        let h = table.try_get(SubscriberId::of(&sub)).unwrap();
        assert_eq!(h.name(), "a");
        assert!(table.try_get(SubscriberId::of(&other)).is_none());
    }

    #[test]
    fn test_try_get_evicts_dead_entry() {
        let table = SubscriptionTable::<u32>::with_capacity(4);
        let sub = Arc::new(());
        let id = SubscriberId::of(&sub);
        table.add_or_update(SubscriberRef::new(&sub), named("a"), 1);

        drop(sub);
        assert!(table.try_get(id).is_none());
        assert_eq!(table.lock().len(), 0);
    }

    #[test]
    fn test_live_handlers_in_insertion_order_and_purges() {
        let table = SubscriptionTable::<u32>::with_capacity(1);
        let s1 = Arc::new(1u8);
        let s2 = Arc::new(2u8);
        let s3 = Arc::new(3u8);
        table.add_or_update(SubscriberRef::new(&s1), named("first"), 1);
        table.add_or_update(SubscriberRef::new(&s2), named("second"), 2);
        table.add_or_update(SubscriberRef::new(&s3), named("third"), 3);

        assert_eq!(names(table.live_handlers()), ["first", "second", "third"]);

        drop(s2);
        let live = table.live_handlers();
        assert_eq!(live.len(), 2);
        assert_eq!(names(live), ["first", "third"]);
        assert_eq!(table.lock().len(), 2);
    }

    #[test]
    fn test_add_or_update_replaces_in_place() {
        let table = SubscriptionTable::<u32>::with_capacity(4);
        let s1 = Arc::new(());
        let s2 = Arc::new(());
        table.add_or_update(SubscriberRef::new(&s1), named("old"), 1);
        table.add_or_update(SubscriberRef::new(&s2), named("other"), 2);
        table.add_or_update(SubscriberRef::new(&s1), named("new"), 3);

        assert_eq!(names(table.live_handlers()), ["new", "other"]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let table = SubscriptionTable::<u32>::with_capacity(4);
        let sub = Arc::new(());
        let id = SubscriberId::of(&sub);
        table.add_or_update(SubscriberRef::new(&sub), named("a"), 1);

        assert!(table.remove(id));
        assert!(!table.remove(id));
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_entry_checks_serial() {
        let table = SubscriptionTable::<u32>::with_capacity(4);
        let sub = Arc::new(());
        let id = SubscriberId::of(&sub);
        table.add_or_update(SubscriberRef::new(&sub), named("a"), 7);

        assert!(!table.remove_entry(id, 6));
        assert_eq!(table.len(), 1);
        assert!(table.remove_entry(id, 7));
        assert!(table.is_empty());
    }

    #[test]
    fn test_purge_counts_dead_entries() {
        let table = SubscriptionTable::<u32>::with_capacity(4);
        let keep = Arc::new(());
        table.add_or_update(SubscriberRef::new(&keep), named("keep"), 1);
        for serial in 2..5 {
            let gone = Arc::new(());
            table.add_or_update(SubscriberRef::new(&gone), named("gone"), serial);
        }

        assert_eq!(table.len(), 1);
        assert_eq!(table.purge(), 3);
        assert_eq!(table.purge(), 0);
    }

    /// Runs `f` on its own thread; a relock of the entry mutex would hang it.
    fn finishes_within(limit: Duration, f: impl FnOnce() + Send + 'static) {
        let (done_tx, done_rx) = mpsc::channel();
        std::thread::spawn(move || {
            f();
            let _ = done_tx.send(());
        });
        match done_rx.recv_timeout(limit) {
            Ok(()) => {}
            Err(RecvTimeoutError::Timeout) => panic!("table relocked while dropping an entry"),
            Err(RecvTimeoutError::Disconnected) => panic!("scenario panicked"),
        }
    }

    /// Table where `a`'s handler owns the handle of `b`'s entry.
    fn nested(a: &Arc<u8>, b: &Arc<u8>) -> Arc<SubscriptionTable<u32>> {
        let table = Arc::new(SubscriptionTable::<u32>::with_capacity(2));
        table.add_or_update(SubscriberRef::new(b), named("b"), 1);
        let erased: Arc<dyn RemoveEntry> = table.clone();
        let held = Registration::new(erased, SubscriberRef::new(b), 1, "u32", "test");
        let holder: HandlerRef<u32> = HandlerFn::arc("a", move |_: u32| {
            let _held = &held;
            async { Ok::<(), HandlerError>(()) }
        });
        table.add_or_update(SubscriberRef::new(a), holder, 2);
        table
    }

    #[test]
    fn test_try_get_eviction_releases_nested_handle() {
        finishes_within(Duration::from_secs(5), || {
            let a = Arc::new(1u8);
            let b = Arc::new(2u8);
            let id = SubscriberId::of(&a);
            let table = nested(&a, &b);

            drop(a);
            assert!(table.try_get(id).is_none());
            assert!(table.try_get(SubscriberId::of(&b)).is_none());
            assert!(table.is_empty());
        });
    }

    #[test]
    fn test_replacing_handler_releases_nested_handle() {
        finishes_within(Duration::from_secs(5), || {
            let a = Arc::new(1u8);
            let b = Arc::new(2u8);
            let table = nested(&a, &b);

            table.add_or_update(SubscriberRef::new(&a), named("a2"), 3);
            assert_eq!(names(table.live_handlers()), ["a2"]);
        });
    }

    #[test]
    fn test_purge_releases_nested_handle() {
        finishes_within(Duration::from_secs(5), || {
            let a = Arc::new(1u8);
            let b = Arc::new(2u8);
            let table = nested(&a, &b);

            drop(a);
            assert_eq!(table.purge(), 1);
            assert!(table.is_empty());
            assert_eq!(table.lock().len(), 0);
        });
    }

    #[test]
    fn test_channel_tables_create_once() {
        let mut tables = ChannelTables::<u32, &'static str>::new(2);
        let a = Arc::clone(tables.get_or_create(&"a"));
        let again = Arc::clone(tables.get_or_create(&"a"));
        assert!(Arc::ptr_eq(&a, &again));
        assert!(tables.get(&"b").is_none());

        let sub = Arc::new(());
        a.add_or_update(SubscriberRef::new(&sub), named("x"), 1);
        tables
            .get_or_create(&"b")
            .add_or_update(SubscriberRef::new(&sub), named("y"), 2);

        assert_eq!(tables.remove_subscriber(SubscriberId::of(&sub)), 2);
        assert_eq!(tables.remove_subscriber(SubscriberId::of(&sub)), 0);
    }
}
