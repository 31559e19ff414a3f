//! # Core handler trait
//!
//! `Handler<M>` is the callback a subscription invokes for each message of type
//! `M` sent on its channel. The registry owns the handler strongly, so a handler
//! must **not** capture a strong reference to its subscriber: doing so keeps the
//! subscriber alive and defeats automatic cleanup. Capture a `Weak` instead.
//!
//! ## Contract
//! - Handlers run sequentially within one `send`, outside of any registry lock.
//! - Errors are collected by `send`; they never stop delivery to other handlers.
//! - A handler may itself register or unregister subscriptions.

use std::sync::Arc;

use async_trait::async_trait;

use crate::channels::Message;
use crate::error::HandlerError;

/// Contract for message handlers.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use weakbus::{Handler, HandlerError};
///
/// struct Audit;
///
/// #[async_trait]
/// impl Handler<String> for Audit {
///     async fn handle(&self, message: &String) -> Result<(), HandlerError> {
///         if message.is_empty() {
///             return Err(HandlerError::fail("empty record"));
///         }
///         // write audit record...
///         Ok(())
///     }
///
///     fn name(&self) -> &str { "audit" }
/// }
/// ```
#[async_trait]
pub trait Handler<M>: Send + Sync + 'static
where
    M: Message,
{
    /// Handle a single message.
    async fn handle(&self, message: &M) -> Result<(), HandlerError>;

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared handle to a handler for messages of type `M`.
pub type HandlerRef<M> = Arc<dyn Handler<M>>;
