//! Registry core: subscription storage, registration handles and dispatch.
//!
//! The public API from this module is [`Registry`], [`Registration`] and [`Config`].
//!
//! Internal modules:
//! - [`subscriber`]: weak, identity-compared subscriber references;
//! - [`table`]: lifetime-aware subscription tables and the per-key table map;
//! - [`registration`]: scoped-release handle returned by `register*`;
//! - [`dispatch`]: single-handler invocation with panic isolation;
//! - [`registry`]: the orchestrator (structural section, register/unregister/send).

mod config;
mod dispatch;
mod registration;
mod registry;
mod subscriber;
mod table;

pub use config::Config;
pub use registration::Registration;
pub use registry::Registry;
