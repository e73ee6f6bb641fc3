//! Profile handlers.
//!
//! One [`ProfileHandler`] implementation per profile. Every reply envelope
//! echoes the inbound msg_id, carries the handler's profile id, version 1,
//! and a timestamp from the injected clock. Handlers close over the server's
//! [`RuntimeBackends`]; nothing is process-global.

pub mod a2a;
pub mod agdisc;
pub mod artifact;
pub mod cred;
pub mod events;
pub mod mcpmap;
pub mod obs;
pub mod policyhint;
pub mod relay;
pub mod rpc;
pub mod state;
pub mod tooldisc;

use std::sync::Arc;

use swp_core::{Clock, Envelope, ProfileId, Router, PROTOCOL_VERSION};

use crate::backends::RuntimeBackends;

/// Builds a reply envelope in the shape every handler uses.
pub(crate) fn reply_envelope(
    profile_id: u64,
    msg_id: &[u8],
    msg_type: u64,
    ts_unix_ms: u64,
    payload: Vec<u8>,
) -> Envelope {
    Envelope {
        version: PROTOCOL_VERSION,
        profile_id,
        msg_type,
        flags: 0,
        ts_unix_ms,
        msg_id: msg_id.to_vec(),
        extensions: Vec::new(),
        payload,
    }
}

/// Registers all twelve profile handlers against the backend set.
#[must_use]
pub fn build_router(backends: &RuntimeBackends, clock: Arc<dyn Clock>) -> Router {
    let mut router = Router::new();
    router.register(
        ProfileId::MCP_MAP,
        Arc::new(mcpmap::McpMapHandler::new(Arc::clone(&clock))),
    );
    router.register(
        ProfileId::A2A,
        Arc::new(a2a::A2aHandler::new(backends.clone(), Arc::clone(&clock))),
    );
    router.register(
        ProfileId::AGDISC,
        Arc::new(agdisc::AgdiscHandler::new(backends.clone(), Arc::clone(&clock))),
    );
    router.register(
        ProfileId::TOOL_DISC,
        Arc::new(tooldisc::ToolDiscHandler::new(backends.clone(), Arc::clone(&clock))),
    );
    router.register(
        ProfileId::RPC,
        Arc::new(rpc::RpcHandler::new(backends.clone(), Arc::clone(&clock))),
    );
    router.register(
        ProfileId::EVENTS,
        Arc::new(events::EventsHandler::new(backends.clone(), Arc::clone(&clock))),
    );
    router.register(
        ProfileId::ARTIFACT,
        Arc::new(artifact::ArtifactHandler::new(backends.clone(), Arc::clone(&clock))),
    );
    router.register(
        ProfileId::CRED,
        Arc::new(cred::CredHandler::new(backends.clone(), Arc::clone(&clock))),
    );
    router.register(
        ProfileId::POLICY_HINT,
        Arc::new(policyhint::PolicyHintHandler::new(backends.clone(), Arc::clone(&clock))),
    );
    router.register(
        ProfileId::STATE,
        Arc::new(state::StateHandler::new(backends.clone(), Arc::clone(&clock))),
    );
    router.register(
        ProfileId::OBS,
        Arc::new(obs::ObsHandler::new(backends.clone(), Arc::clone(&clock))),
    );
    router.register(
        ProfileId::RELAY,
        Arc::new(relay::RelayHandler::new(backends.clone(), clock)),
    );
    router
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use swp_core::{Clock, Envelope, ManualClock, RequestContext, PROTOCOL_VERSION};

    /// Fixed test epoch.
    pub const NOW_MS: u64 = 1_720_000_000_000;

    pub fn clock() -> Arc<dyn Clock> {
        Arc::new(ManualClock::new(NOW_MS))
    }

    pub fn request(profile_id: u64, msg_type: u64, payload: Vec<u8>) -> Envelope {
        Envelope {
            version: PROTOCOL_VERSION,
            profile_id,
            msg_type,
            flags: 0,
            ts_unix_ms: NOW_MS,
            msg_id: b"12345678abcdefgh".to_vec(),
            extensions: Vec::new(),
            payload,
        }
    }

    pub fn ctx_for(env: &Envelope) -> RequestContext {
        RequestContext {
            profile_id: env.profile_id,
            msg_id: env.msg_id.clone(),
            correlation: Default::default(),
        }
    }

    /// Asserts the reply-shape invariant: same profile, echoed msg_id,
    /// version 1.
    pub fn assert_reply_shape(request: &Envelope, replies: &[Envelope]) {
        for reply in replies {
            assert_eq!(reply.version, PROTOCOL_VERSION);
            assert_eq!(reply.profile_id, request.profile_id);
            assert_eq!(reply.msg_id, request.msg_id);
        }
    }
}
