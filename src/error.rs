//! Error types used by the registry and by message handlers.
//!
//! This module defines three enums:
//!
//! - [`RegistryError`] — errors raised by structural registry operations.
//! - [`SendError`] — errors that abort a whole `send` call.
//! - [`HandlerError`] — errors raised by (or caught around) a single handler.
//!
//! All of them provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! Handler errors never abort dispatch; they are collected into the list returned by `send`.

use std::fmt::Display;
use thiserror::Error;

/// # Errors produced by structural registry operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A live entry already exists for this subscriber, message type and channel.
    #[error("subscriber already registered for message {message_type} on channel {channel_type}")]
    DuplicateRegistration {
        /// Type name of the message.
        message_type: &'static str,
        /// Type name of the channel.
        channel_type: &'static str,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use weakbus::RegistryError;
    ///
    /// let err = RegistryError::DuplicateRegistration { message_type: "u32", channel_type: "&str" };
    /// assert_eq!(err.as_label(), "registry_duplicate_registration");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::DuplicateRegistration { .. } => "registry_duplicate_registration",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RegistryError::DuplicateRegistration {
                message_type,
                channel_type,
            } => format!("duplicate registration: message={message_type} channel={channel_type}"),
        }
    }
}

/// # Errors that abort a `send` call.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The cancellation token fired before a handler was invoked.
    #[error("send cancelled")]
    Canceled,
}

impl SendError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SendError::Canceled => "send_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SendError::Canceled => "send cancelled".to_string(),
        }
    }
}

/// # Errors produced by a single handler invocation.
///
/// Returned by [`Handler::handle`](crate::Handler::handle) or synthesized by the
/// registry when a handler panics and panic isolation is enabled.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler reported a failure.
    #[error("handler failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// The handler panicked; the panic was caught.
    #[error("handler {handler} panicked: {info}")]
    Panicked {
        /// Name of the handler that panicked.
        handler: String,
        /// Panic payload, if it was a string.
        info: String,
    },
}

impl HandlerError {
    /// Builds a [`HandlerError::Failed`] from anything displayable.
    ///
    /// # Example
    /// ```
    /// use weakbus::HandlerError;
    ///
    /// let err = HandlerError::fail("connection refused");
    /// assert_eq!(err.as_message(), "error: connection refused");
    /// ```
    pub fn fail(error: impl Display) -> Self {
        HandlerError::Failed {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Failed { .. } => "handler_failed",
            HandlerError::Panicked { .. } => "handler_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HandlerError::Failed { error } => format!("error: {error}"),
            HandlerError::Panicked { handler, info } => format!("panic in {handler}: {info}"),
        }
    }
}
