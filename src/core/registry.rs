//! # Registry: typed publish/subscribe with weak subscribers.
//!
//! The registry keeps a table-of-tables:
//!
//! ```text
//! ChannelKey(M, C) ──► ChannelTables<M, C> ──► channel value ──► SubscriptionTable<M>
//!                                                                  subscriber (weak) → handler
//! ```
//!
//! ## Architecture
//! ```text
//! register_on(sub, ch, h) ─┐
//! unregister_on(sub, ch)  ─┼─► [structural section] ─► locate/create table ─► mutate
//! is_registered_on(...)   ─┘
//!
//! send_with(msg, ch, token)
//!     ├─► [structural section] ─► table.live_handlers()   (snapshot, evicts dead)
//!     └─► for handler in snapshot:                          (no lock held)
//!            ├─ token cancelled? ─► Err(SendError::Canceled)
//!            └─ invoke(handler)   ─► Err(e) collected, continue
//! ```
//!
//! ## Rules
//! - One structural section per registry serializes every table lookup/creation,
//!   duplicate check, insertion and removal.
//! - Handlers are invoked after the section is released; a handler may register
//!   or unregister without deadlocking.
//! - `send` delivers to the snapshot taken at call time. A registration removed
//!   mid-dispatch can still receive that one message.
//! - Missing channels and subscribers are never errors.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::channels::{Channel, ChannelKey, DefaultChannel, Message};
use crate::core::config::Config;
use crate::core::dispatch;
use crate::core::registration::Registration;
use crate::core::subscriber::{SubscriberId, SubscriberRef};
use crate::core::table::{ChannelMap, ChannelTables, LiveHandlers, SubscriptionTable};
use crate::error::{HandlerError, RegistryError, SendError};
use crate::handlers::HandlerRef;

type TableMap = HashMap<ChannelKey, Box<dyn ChannelMap>>;

/// Publish/subscribe registry holding subscribers by weak reference.
pub struct Registry {
    cfg: Config,
    tables: Mutex<TableMap>,
    next_serial: AtomicU64,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            tables: Mutex::new(HashMap::new()),
            next_serial: AtomicU64::new(1),
        }
    }

    /// Process-wide registry with the default [`Config`].
    pub fn shared() -> &'static Registry {
        static SHARED: OnceLock<Registry> = OnceLock::new();
        SHARED.get_or_init(Registry::default)
    }

    /// Registry configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    // ---------------------------
    // Default channel
    // ---------------------------

    /// Returns true if `subscriber` has a live registration for `M` on the default channel.
    pub async fn is_registered<M, S>(&self, subscriber: &Arc<S>) -> bool
    where
        M: Message,
        S: Send + Sync + 'static,
    {
        self.is_registered_on::<M, DefaultChannel, S>(subscriber, &DefaultChannel)
            .await
    }

    /// Registers `handler` for `M` on the default channel.
    ///
    /// Dropping the returned [`Registration`] unsubscribes immediately; call
    /// [`Registration::detach`] to keep the subscription until unregister or the
    /// subscriber's death.
    pub async fn register<M, S>(
        &self,
        subscriber: &Arc<S>,
        handler: HandlerRef<M>,
    ) -> Result<Registration, RegistryError>
    where
        M: Message,
        S: Send + Sync + 'static,
    {
        self.register_on(subscriber, DefaultChannel, handler).await
    }

    /// Removes the subscriber's registration for `M` on the default channel, if any.
    pub async fn unregister<M, S>(&self, subscriber: &Arc<S>) -> bool
    where
        M: Message,
        S: Send + Sync + 'static,
    {
        self.unregister_on::<M, DefaultChannel, S>(subscriber, &DefaultChannel)
            .await
    }

    /// Sends `message` on the default channel. Never cancelled.
    pub async fn send<M>(&self, message: M) -> Result<Vec<HandlerError>, SendError>
    where
        M: Message,
    {
        self.send_on(message, DefaultChannel).await
    }

    // ---------------------------
    // Explicit channel
    // ---------------------------

    /// Returns true if `subscriber` has a live registration for `M` on `channel`.
    pub async fn is_registered_on<M, C, S>(&self, subscriber: &Arc<S>, channel: &C) -> bool
    where
        M: Message,
        C: Channel,
        S: Send + Sync + 'static,
    {
        let id = SubscriberId::of(subscriber);
        let map = self.tables.lock().await;
        Self::find_table::<M, C>(&map, channel)
            .and_then(|table| table.try_get(id))
            .is_some()
    }

    /// Registers `handler` for `M` on `channel`.
    ///
    /// Fails with [`RegistryError::DuplicateRegistration`] if the subscriber already
    /// has a live registration for the same message type, channel type and value; the
    /// existing handler is kept.
    ///
    /// The returned [`Registration`] owns the subscription: dropping it, even as an
    /// unbound temporary, removes the entry at once. Use [`Registration::detach`] to
    /// keep the subscription alive for as long as the subscriber is.
    pub async fn register_on<M, C, S>(
        &self,
        subscriber: &Arc<S>,
        channel: C,
        handler: HandlerRef<M>,
    ) -> Result<Registration, RegistryError>
    where
        M: Message,
        C: Channel,
        S: Send + Sync + 'static,
    {
        let key = ChannelKey::of::<M, C>();
        let sub = SubscriberRef::new(subscriber);

        let mut map = self.tables.lock().await;
        let table = Arc::clone(
            Self::channel_tables_mut::<M, C>(&mut map, self.cfg.table_capacity_clamped())
                .get_or_create(&channel),
        );

        if table.try_get(sub.id()).is_some() {
            return Err(RegistryError::DuplicateRegistration {
                message_type: key.message_name(),
                channel_type: key.channel_name(),
            });
        }

        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        debug!(
            message_type = key.message_name(),
            channel_type = key.channel_name(),
            handler = handler.name(),
            serial,
            "subscriber registered"
        );
        table.add_or_update(sub.clone(), handler, serial);
        drop(map);

        Ok(Registration::new(
            table,
            sub,
            serial,
            key.message_name(),
            key.channel_name(),
        ))
    }

    /// Removes the subscriber's registration for `M` on `channel`.
    ///
    /// Returns `true` if an entry was removed; absent entries are a no-op.
    pub async fn unregister_on<M, C, S>(&self, subscriber: &Arc<S>, channel: &C) -> bool
    where
        M: Message,
        C: Channel,
        S: Send + Sync + 'static,
    {
        let key = ChannelKey::of::<M, C>();
        let id = SubscriberId::of(subscriber);

        let removed = {
            let map = self.tables.lock().await;
            Self::find_table::<M, C>(&map, channel).is_some_and(|table| table.remove(id))
        };

        if removed {
            debug!(
                message_type = key.message_name(),
                channel_type = key.channel_name(),
                "subscriber unregistered"
            );
        }
        removed
    }

    /// Sends `message` on `channel`. Never cancelled.
    pub async fn send_on<M, C>(
        &self,
        message: M,
        channel: C,
    ) -> Result<Vec<HandlerError>, SendError>
    where
        M: Message,
        C: Channel,
    {
        self.send_with(message, channel, &CancellationToken::new())
            .await
    }

    /// Sends `message` on `channel` to every live handler, in registration order.
    ///
    /// - Handler errors (and caught panics) are collected; dispatch continues.
    /// - `token` is checked on entry and before each handler. Once cancelled the call
    ///   returns [`SendError::Canceled`] and the remaining handlers are skipped.
    ///   Handlers that already ran are not rolled back.
    pub async fn send_with<M, C>(
        &self,
        message: M,
        channel: C,
        token: &CancellationToken,
    ) -> Result<Vec<HandlerError>, SendError>
    where
        M: Message,
        C: Channel,
    {
        let key = ChannelKey::of::<M, C>();
        if token.is_cancelled() {
            debug!(
                message_type = key.message_name(),
                channel_type = key.channel_name(),
                "send cancelled before dispatch"
            );
            return Err(SendError::Canceled);
        }

        let handlers = self.snapshot::<M, C>(&channel).await;
        let mut failures = Vec::new();

        for handler in handlers {
            if token.is_cancelled() {
                debug!(
                    message_type = key.message_name(),
                    channel_type = key.channel_name(),
                    "send cancelled during dispatch"
                );
                return Err(SendError::Canceled);
            }

            if let Err(err) =
                dispatch::invoke(handler.as_ref(), &message, self.cfg.isolate_panics).await
            {
                warn!(
                    message_type = key.message_name(),
                    channel_type = key.channel_name(),
                    handler = handler.name(),
                    error = %err,
                    label = err.as_label(),
                    "handler failed"
                );
                failures.push(err);
            }
        }

        Ok(failures)
    }

    // ---------------------------
    // Registry-wide
    // ---------------------------

    /// Removes `subscriber` from every message type and channel.
    ///
    /// Returns the number of entries removed.
    pub async fn unregister_all<S>(&self, subscriber: &Arc<S>) -> usize
    where
        S: Send + Sync + 'static,
    {
        let id = SubscriberId::of(subscriber);
        let removed: usize = {
            let map = self.tables.lock().await;
            map.values().map(|tables| tables.remove_subscriber(id)).sum()
        };

        debug!(removed, "subscriber unregistered from all channels");
        removed
    }

    /// Drops every entry whose subscriber is gone, across all tables.
    ///
    /// Lookups and sends already evict lazily; this is for callers that want
    /// the memory back without touching each channel.
    pub async fn cleanup(&self) -> usize {
        let purged: usize = {
            let map = self.tables.lock().await;
            map.values().map(|tables| tables.purge()).sum()
        };

        debug!(purged, "registry cleanup");
        purged
    }

    /// Number of live registrations for `M` on `channel`.
    pub async fn subscription_count<M, C>(&self, channel: &C) -> usize
    where
        M: Message,
        C: Channel,
    {
        let map = self.tables.lock().await;
        Self::find_table::<M, C>(&map, channel).map_or(0, |table| table.len())
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    /// Takes the live-handler snapshot under the structural section.
    async fn snapshot<M, C>(&self, channel: &C) -> LiveHandlers<M>
    where
        M: Message,
        C: Channel,
    {
        let map = self.tables.lock().await;
        match Self::find_table::<M, C>(&map, channel) {
            Some(table) => table.live_handlers(),
            None => LiveHandlers::empty(),
        }
    }

    fn find_table<'a, M, C>(map: &'a TableMap, channel: &C) -> Option<&'a Arc<SubscriptionTable<M>>>
    where
        M: Message,
        C: Channel,
    {
        map.get(&ChannelKey::of::<M, C>())?
            .as_any()
            .downcast_ref::<ChannelTables<M, C>>()?
            .get(channel)
    }

    fn channel_tables_mut<M, C>(map: &mut TableMap, table_capacity: usize) -> &mut ChannelTables<M, C>
    where
        M: Message,
        C: Channel,
    {
        let slot = map
            .entry(ChannelKey::of::<M, C>())
            .or_insert_with(|| Box::new(ChannelTables::<M, C>::new(table_capacity)));

        match slot.as_any_mut().downcast_mut::<ChannelTables<M, C>>() {
            Some(tables) => tables,
            None => unreachable!("channel key is derived from the stored table's type"),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
