//! Profile dispatch.
//!
//! Handlers form a polymorphic set behind [`ProfileHandler`]; the [`Router`]
//! maps `profile_id` to a handler and is immutable once the daemon has
//! registered its twelve profiles. A handler returns zero or more reply
//! envelopes — zero is legal (notifications and fire-and-forget messages).

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::envelope::Envelope;
use crate::error::{ErrorCode, ProtocolError, ProtocolResult};

/// Correlation identifiers snapshotted from the observability document when
/// a frame is dispatched, used to enrich emitted events.
#[derive(Debug, Clone, Default)]
pub struct Correlation {
    pub traceparent: String,
    pub tracestate: String,
    pub msg_id: Vec<u8>,
    pub task_id: Vec<u8>,
    pub rpc_id: Vec<u8>,
}

/// Per-request context passed to handlers.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Profile the inbound envelope was addressed to.
    pub profile_id: u64,
    /// Inbound message id; replies echo it.
    pub msg_id: Vec<u8>,
    /// Correlation snapshot taken at dispatch time.
    pub correlation: Correlation,
}

/// A profile's message handler.
pub trait ProfileHandler: Send + Sync {
    /// Applies the profile's state machine to a validated envelope.
    ///
    /// # Errors
    ///
    /// Decode failures, unsupported message types, and lifecycle invariant
    /// violations, mapped per the profile's error table.
    fn handle(&self, ctx: &RequestContext, env: &Envelope) -> ProtocolResult<Vec<Envelope>>;
}

/// Profile-id → handler table.
#[derive(Default)]
pub struct Router {
    handlers: HashMap<u64, Arc<dyn ProfileHandler>>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a profile id, replacing any previous entry.
    pub fn register(&mut self, profile_id: u64, handler: Arc<dyn ProfileHandler>) {
        self.handlers.insert(profile_id, handler);
    }

    /// Dispatches an envelope to its profile handler.
    ///
    /// # Errors
    ///
    /// `UNKNOWN_PROFILE` when no handler is registered; otherwise whatever
    /// the handler returns.
    pub fn dispatch(&self, ctx: &RequestContext, env: &Envelope) -> ProtocolResult<Vec<Envelope>> {
        let handler = self.handlers.get(&env.profile_id).ok_or_else(|| {
            ProtocolError::new(
                ErrorCode::UnknownProfile,
                format!("unknown profile_id {}", env.profile_id),
            )
        })?;
        trace!(profile_id = env.profile_id, msg_type = env.msg_type, "dispatch");
        handler.handle(ctx, env)
    }

    /// Registered profile ids, for startup logging.
    #[must_use]
    pub fn profile_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.handlers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("profiles", &self.profile_ids())
            .finish()
    }
}
