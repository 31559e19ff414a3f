//! # Non-owning subscriber references.
//!
//! Subscribers are identified by the address of their `Arc` allocation and held
//! through a type-erased [`Weak`]. The registry never owns a subscriber: once the
//! last `Arc` elsewhere is dropped, every entry for it reads as absent.
//!
//! A stored `Weak` keeps the *allocation* (not the value) alive, so an address
//! cannot be handed to a new subscriber while any entry still refers to it.

use std::any::Any;
use std::sync::{Arc, Weak};

/// Identity of a subscriber (allocation address).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct SubscriberId(usize);

impl SubscriberId {
    pub(crate) fn of<S: ?Sized>(subscriber: &Arc<S>) -> Self {
        Self(Arc::as_ptr(subscriber).cast::<()>() as usize)
    }
}

/// Weak, type-erased reference to a subscriber plus its identity.
#[derive(Clone)]
pub(crate) struct SubscriberRef {
    id: SubscriberId,
    weak: Weak<dyn Any + Send + Sync>,
}

impl SubscriberRef {
    pub(crate) fn new<S>(subscriber: &Arc<S>) -> Self
    where
        S: Send + Sync + 'static,
    {
        let weak: Weak<S> = Arc::downgrade(subscriber);
        Self {
            id: SubscriberId::of(subscriber),
            weak,
        }
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    /// True while at least one strong reference exists outside the registry.
    pub(crate) fn is_alive(&self) -> bool {
        self.weak.strong_count() > 0
    }
}
