/// Channel used when the caller does not name one.
///
/// Every instance compares equal to every other instance, so all channel-less
/// registrations for a message type share one partition. Because the channel
/// key includes the channel *type*, this partition is distinct from any user
/// channel, even a unit-like one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefaultChannel;
