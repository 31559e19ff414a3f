//! # Channels: partitioning messages into independent delivery groups.
//!
//! A channel is any value that supports total equality and hashing. Subscriptions
//! for the same message type are split first by the channel **type**, then by the
//! channel **value**:
//!
//! ```text
//! ChannelKey(M, C) ──► ChannelTables<M, C>
//!                        ├─ "orders"  ──► SubscriptionTable<M>
//!                        ├─ "billing" ──► SubscriptionTable<M>
//!                        └─ ...
//! ```
//!
//! Channel-less calls use [`DefaultChannel`], which gets its own partition and
//! never collides with user channels.

mod default;
mod key;

pub use default::DefaultChannel;
pub(crate) use key::ChannelKey;

use std::hash::Hash;

/// Values usable as channels.
///
/// Implemented automatically for every `Eq + Hash + Clone + Send + Sync + 'static` type.
pub trait Channel: Eq + Hash + Clone + Send + Sync + 'static {}

impl<T> Channel for T where T: Eq + Hash + Clone + Send + Sync + 'static {}

/// Types usable as messages.
///
/// Implemented automatically for every `Send + Sync + 'static` type.
pub trait Message: Send + Sync + 'static {}

impl<T> Message for T where T: Send + Sync + 'static {}
