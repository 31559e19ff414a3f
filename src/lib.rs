//! # weakbus
//!
//! **weakbus** is an in-process publish/subscribe registry for Rust.
//!
//! Publishers send typed messages; subscribers receive them through handlers,
//! and neither side holds a reference to the other. The registry keeps each
//! subscriber only by [`Weak`](std::sync::Weak) reference: dropping the last
//! `Arc` to a subscriber ends all of its subscriptions, without an explicit
//! unregister and without leaking.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   register_on(&sub, channel, handler)            send_with(msg, channel, &token)
//!              │                                              │
//!              ▼                                              ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │  Registry                                                             │
//! │  - structural section (one async mutex)                               │
//! │  - ChannelKey(M, C) ──► channel value ──► SubscriptionTable<M>        │
//! │                                            weak(sub) → handler        │
//! └──────┬──────────────────────────────────────────────────────┬─────────┘
//!        ▼                                                      ▼
//!   Registration                                     snapshot of live handlers
//!   (release / drop removes the entry)               (dead subscribers evicted)
//!                                                               │
//!                                                  ┌────────────┼────────────┐
//!                                                  ▼            ▼            ▼
//!                                              handler 1    handler 2    handler N
//!                                           (errors and panics collected, token
//!                                            checked before each invocation)
//! ```
//!
//! ### Partitioning
//! Subscriptions are partitioned by message type, channel type and channel value.
//! A handler registered on `"orders"` never sees messages sent on `"billing"`,
//! on `5i32`, or on the [`DefaultChannel`] used by the channel-less methods.
//!
//! ### Lifetime
//! Cleanup is tied to how the caller holds the subscriber: entries for an
//! `Arc`-held subscriber disappear once the last strong reference is dropped.
//! [`Registration::release`], dropping the [`Registration`], or an explicit
//! unregister end a subscription deterministically. Handlers are owned by the
//! registry and must not capture a strong reference to their own subscriber.
//!
//! Every `register*` call returns a [`Registration`], and dropping it releases the
//! subscription immediately, including a temporary dropped at the end of the
//! statement (`registry.register(..).await?;`). Bind it for as long as delivery
//! is wanted, or call [`Registration::detach`] to leave the subscription tied to
//! the subscriber's lifetime alone.
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                       |
//! |-------------------|---------------------------------------------------------------|------------------------------------------|
//! | **Registry**      | Register, unregister, query and send per type and channel.    | [`Registry`]                             |
//! | **Handlers**      | Async handlers as trait impls or closures.                    | [`Handler`], [`HandlerFn`], [`HandlerRef`] |
//! | **Handles**       | Scoped release of a single subscription.                      | [`Registration`]                         |
//! | **Channels**      | Any `Eq + Hash` value partitions delivery.                    | [`Channel`], [`DefaultChannel`]          |
//! | **Errors**        | Typed errors for registration, sending and handlers.          | [`RegistryError`], [`SendError`], [`HandlerError`] |
//! | **Configuration** | Panic isolation and table sizing.                             | [`Config`]                               |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use weakbus::{HandlerFn, Registry};
//!
//! struct Dashboard;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::default();
//!     let total = Arc::new(AtomicI64::new(0));
//!
//!     let dashboard = Arc::new(Dashboard);
//!     let sink = Arc::clone(&total);
//!     // Keep the handle bound: dropping it unsubscribes at once.
//!     let _registration = registry
//!         .register_on(&dashboard, "prices", HandlerFn::arc("sum", move |price: i64| {
//!             let sink = Arc::clone(&sink);
//!             async move {
//!                 sink.fetch_add(price, Ordering::SeqCst);
//!                 Ok(())
//!             }
//!         }))
//!         .await?;
//!
//!     registry.send_on(3i64, "prices").await?;
//!     registry.send_on(7i64, "prices").await?;
//!     assert_eq!(total.load(Ordering::SeqCst), 10);
//!
//!     // The subscriber goes away: no more deliveries, no unregister needed.
//!     drop(dashboard);
//!     let failures = registry.send_on(5i64, "prices").await?;
//!     assert!(failures.is_empty());
//!     assert_eq!(total.load(Ordering::SeqCst), 10);
//!     Ok(())
//! }
//! ```
mod channels;
mod core;
mod error;
mod handlers;

// ---- Public re-exports ----

pub use channels::{Channel, DefaultChannel, Message};
pub use core::{Config, Registration, Registry};
pub use error::{HandlerError, RegistryError, SendError};
pub use handlers::{Handler, HandlerFn, HandlerRef};
