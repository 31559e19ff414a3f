//! # Registration handle: scoped release of one subscription.
//!
//! [`Registration`] is returned by every `register*` call. It refers to exactly
//! one `(table, subscriber)` pair:
//!
//! ```text
//! register() ──► Registration ──► release() / drop
//!                                    ├─ both refs set ─► table.remove_entry(id, serial)
//!                                    └─ always        ─► clear refs
//! ```
//!
//! ## Rules
//! - Release is idempotent; only the first call can remove anything.
//! - The handle holds the subscriber weakly and clears it on release, so keeping
//!   a handle around never keeps a subscriber alive.
//! - Only the entry created by this registration is removed: if the subscriber
//!   was unregistered and registered again, the newer entry is left alone.
//! - [`Registration::detach`] gives the handle up without removing the entry.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::core::subscriber::SubscriberRef;
use crate::core::table::RemoveEntry;

/// Scoped-release token for one subscription.
///
/// Dropping the handle releases the subscription.
#[must_use = "dropping a Registration releases the subscription; call `detach` to keep it"]
pub struct Registration {
    table: Option<Arc<dyn RemoveEntry>>,
    subscriber: Option<SubscriberRef>,
    serial: u64,
    message: &'static str,
    channel: &'static str,
}

impl Registration {
    pub(crate) fn new(
        table: Arc<dyn RemoveEntry>,
        subscriber: SubscriberRef,
        serial: u64,
        message: &'static str,
        channel: &'static str,
    ) -> Self {
        Self {
            table: Some(table),
            subscriber: Some(subscriber),
            serial,
            message,
            channel,
        }
    }

    /// Removes the subscription this handle was created for.
    ///
    /// Returns `true` if an entry was removed. Subsequent calls do nothing and return `false`.
    pub fn release(&mut self) -> bool {
        let table = self.table.take();
        let subscriber = self.subscriber.take();

        match (table, subscriber) {
            (Some(table), Some(subscriber)) => {
                let removed = table.remove_entry(subscriber.id(), self.serial);
                debug!(
                    message_type = self.message,
                    channel_type = self.channel,
                    removed,
                    "registration released"
                );
                removed
            }
            _ => false,
        }
    }

    /// Gives up the handle while keeping the subscription.
    ///
    /// The entry then lives until it is unregistered or its subscriber is dropped.
    pub fn detach(mut self) {
        self.table = None;
        self.subscriber = None;
    }

    /// True until the handle is released or detached.
    pub fn is_active(&self) -> bool {
        self.table.is_some() && self.subscriber.is_some()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("message", &self.message)
            .field("channel", &self.channel)
            .field("serial", &self.serial)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::subscriber::SubscriberId;
    use crate::core::table::SubscriptionTable;
    use crate::error::HandlerError;
    use crate::handlers::HandlerFn;

    fn table_with(sub: &Arc<u8>, serial: u64) -> Arc<SubscriptionTable<u32>> {
        let table = Arc::new(SubscriptionTable::with_capacity(1));
        table.add_or_update(
            SubscriberRef::new(sub),
            HandlerFn::arc("noop", |_: u32| async { Ok::<(), HandlerError>(()) }),
            serial,
        );
        table
    }

    fn handle(table: &Arc<SubscriptionTable<u32>>, sub: &Arc<u8>, serial: u64) -> Registration {
        let table: Arc<dyn RemoveEntry> = table.clone();
        Registration::new(table, SubscriberRef::new(sub), serial, "u32", "test")
    }

    #[test]
    fn test_release_once() {
        let sub = Arc::new(1u8);
        let table = table_with(&sub, 1);
        let mut reg = handle(&table, &sub, 1);

        assert!(reg.is_active());
        assert!(reg.release());
        assert!(!reg.is_active());
        assert!(!reg.release());
        assert!(table.try_get(SubscriberId::of(&sub)).is_none());
    }

    #[test]
    fn test_drop_releases() {
        let sub = Arc::new(1u8);
        let table = table_with(&sub, 1);
        drop(handle(&table, &sub, 1));
        assert!(table.try_get(SubscriberId::of(&sub)).is_none());
    }

    #[test]
    fn test_detach_keeps_entry() {
        let sub = Arc::new(1u8);
        let table = table_with(&sub, 1);
        handle(&table, &sub, 1).detach();
        assert!(table.try_get(SubscriberId::of(&sub)).is_some());
    }

    #[test]
    fn test_stale_handle_leaves_newer_entry() {
        let sub = Arc::new(1u8);
        let table = table_with(&sub, 2);
        let mut stale = handle(&table, &sub, 1);

        assert!(!stale.release());
        assert!(table.try_get(SubscriberId::of(&sub)).is_some());
    }

    #[test]
    fn test_handle_does_not_anchor_subscriber() {
        let sub = Arc::new(1u8);
        let table = table_with(&sub, 1);
        let reg = handle(&table, &sub, 1);

        assert_eq!(Arc::strong_count(&sub), 1);
        let id = SubscriberId::of(&sub);
        drop(sub);
        assert!(table.try_get(id).is_none());
        drop(reg);
    }
}
