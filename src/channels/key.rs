//! # Channel key: the (message type, channel type) pair.
//!
//! Identity is the pair of [`TypeId`]s. Type names ride along for logs and
//! error messages only and are ignored by `Eq`/`Hash`.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Locates the channel-partitioned store for one subscription family.
#[derive(Clone, Copy)]
pub(crate) struct ChannelKey {
    message: TypeId,
    channel: TypeId,
    message_name: &'static str,
    channel_name: &'static str,
}

impl ChannelKey {
    /// Key for message type `M` on channel type `C`.
    pub(crate) fn of<M: 'static, C: 'static>() -> Self {
        Self {
            message: TypeId::of::<M>(),
            channel: TypeId::of::<C>(),
            message_name: type_name::<M>(),
            channel_name: type_name::<C>(),
        }
    }

    pub(crate) fn message_name(&self) -> &'static str {
        self.message_name
    }

    pub(crate) fn channel_name(&self) -> &'static str {
        self.channel_name
    }
}

impl PartialEq for ChannelKey {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message && self.channel == other.channel
    }
}

impl Eq for ChannelKey {}

impl Hash for ChannelKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.message.hash(state);
        self.channel.hash(state);
    }
}

impl fmt::Debug for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelKey")
            .field("message", &self.message_name)
            .field("channel", &self.channel_name)
            .finish()
    }
}
