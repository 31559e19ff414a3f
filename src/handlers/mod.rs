//! # Message handlers.
//!
//! This module provides the handler-related types:
//! - [`Handler`] - trait for async message handlers
//! - [`HandlerFn`] - closure-backed handler implementation
//! - [`HandlerRef`] - shared reference to a handler (`Arc<dyn Handler<M>>`)

mod handler;
mod handler_fn;

pub use handler::{Handler, HandlerRef};
pub use handler_fn::HandlerFn;
