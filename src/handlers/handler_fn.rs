//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(M) -> Fut`, producing a fresh future per
//! message. Each call receives its own clone of the message, so the future can
//! be `'static` and own everything it touches.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use weakbus::{Handler, HandlerFn, HandlerRef};
//!
//! let total = Arc::new(AtomicU64::new(0));
//! let sink = Arc::clone(&total);
//! let h: HandlerRef<u64> = HandlerFn::arc("sum", move |value: u64| {
//!     let sink = Arc::clone(&sink);
//!     async move {
//!         sink.fetch_add(value, Ordering::Relaxed);
//!         Ok(())
//!     }
//! });
//!
//! assert_eq!(h.name(), "sum");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::channels::Message;
use crate::error::HandlerError;
use crate::handlers::handler::{Handler, HandlerRef};

/// Function-backed handler implementation.
pub struct HandlerFn<M, F> {
    name: Cow<'static, str>,
    f: F,
    _message: PhantomData<fn(M)>,
}

impl<M, F, Fut> HandlerFn<M, F>
where
    M: Message + Clone,
    F: Fn(M) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            _message: PhantomData,
        }
    }

    /// Creates the handler and returns it as a shared handle (`Arc<dyn Handler<M>>`).
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> HandlerRef<M> {
        Arc::new(Self::new(name, f))
    }
}

impl<M, F> fmt::Debug for HandlerFn<M, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<M, F, Fut> Handler<M> for HandlerFn<M, F>
where
    M: Message + Clone,
    F: Fn(M) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, message: &M) -> Result<(), HandlerError> {
        (self.f)(message.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
