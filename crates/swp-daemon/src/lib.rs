//! SWP reference server.
//!
//! Wires the core protocol stack to a TCP listener:
//!
//! ```text
//! bytes → framing → envelope decode → validate → connection policy
//!       → router → profile handler (backends) → reply envelopes → bytes
//! ```
//!
//! # Module Overview
//!
//! - [`server`]: listener, per-connection worker, close-on-error policy.
//! - [`conn_policy`]: sliding-window frame-rate limit and duplicate msg-id
//!   window, per connection.
//! - [`backends`]: backend traits, the in-memory reference implementations,
//!   and [`backends::RuntimeBackends`] for per-server injection.
//! - [`handlers`]: the twelve profile state machines.
//! - [`telemetry`]: lifecycle event emission through the events backend.
//!
//! # Error policy
//!
//! A connection never survives a frame whose framing, validation, or policy
//! is invalid: the worker logs the failure and closes the socket. Profile
//! handlers may instead answer with a profile-level error message (discovery
//! not-found, artifact ordering, credential revocation, relay duplicate);
//! those replies are ordinary envelopes and the connection continues.

pub mod backends;
pub mod conn_policy;
pub mod handlers;
pub mod server;
pub mod telemetry;

pub use backends::RuntimeBackends;
pub use conn_policy::{ConnPolicy, PolicyViolation};
pub use server::{ProtocolServer, ServerConfig};
