//! Backend capability traits and the per-server backend set.
//!
//! Every lifecycle-bearing record is owned by a backend; handlers borrow
//! access through these traits. The in-memory reference implementations live
//! in [`memory`]. A server owns one [`RuntimeBackends`] value built at
//! construction, so two servers in one process can never observe each
//! other's state; tests inject fakes through the `with_*` builders.

pub mod memory;

use std::sync::Arc;

use swp_core::payload::agdisc::AgdiscDoc;
use swp_core::payload::artifact::{ArtChunk, ArtOffer};
use swp_core::payload::events::EventRecord;
use swp_core::payload::obs::ObsDoc;
use swp_core::payload::policyhint::Constraint;
use swp_core::payload::rpc::{RpcErr, RpcReq, RpcResp, RpcStreamItem};
use swp_core::payload::state::StatePut;
use swp_core::payload::tooldisc::ToolDescriptor;
use thiserror::Error;

/// Generic backend fault; handlers map it to `INTERNAL_ERROR`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("backend fault: {0}")]
pub struct BackendError(pub String);

// =============================================================================
// A2A
// =============================================================================

/// Stored task lifecycle state. Tasks are never deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct A2aTaskRecord {
    pub kind: String,
    pub input: Vec<u8>,
    pub terminal: bool,
    pub terminal_ok: bool,
    pub terminal_output: Vec<u8>,
    pub terminal_error: String,
}

/// A2A lifecycle faults surfaced to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum A2aError {
    #[error("unknown task")]
    UnknownTask,
    #[error("conflicting duplicate task")]
    TaskConflict,
    #[error("conflicting duplicate terminal result")]
    TerminalConflict,
}

pub trait A2aBackend: Send + Sync {
    /// Creates the task, or recognizes an idempotent duplicate.
    ///
    /// Returns `true` when the task was created, `false` when an identical
    /// task already existed.
    ///
    /// # Errors
    ///
    /// [`A2aError::TaskConflict`] when the task exists with divergent
    /// fields.
    fn upsert_task(&self, task_id: &[u8], kind: &str, input: &[u8]) -> Result<bool, A2aError>;

    fn get_task(&self, task_id: &[u8]) -> Option<A2aTaskRecord>;

    /// Records the terminal result.
    ///
    /// # Errors
    ///
    /// [`A2aError::UnknownTask`] for an unknown id;
    /// [`A2aError::TerminalConflict`] when a divergent terminal result was
    /// already recorded. Identical repeats are idempotent.
    fn set_terminal(
        &self,
        task_id: &[u8],
        ok: bool,
        output: &[u8],
        error_message: &str,
    ) -> Result<(), A2aError>;
}

// =============================================================================
// Artifact
// =============================================================================

/// Accumulated upload state for one artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub offer: ArtOffer,
    pub data: Vec<u8>,
    pub next_chunk_index: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArtifactError {
    /// Chunk index differs from the expected next index.
    #[error("chunk ordering violation")]
    ChunkOrdering,
}

pub trait ArtifactBackend: Send + Sync {
    /// Records an offer, resetting any prior accumulation for the id.
    fn put_offer(&self, offer: ArtOffer);

    fn get_artifact(&self, artifact_id: &str) -> Option<ArtifactRecord>;

    /// Appends a chunk; the index must equal the record's next index.
    ///
    /// # Errors
    ///
    /// [`ArtifactError::ChunkOrdering`] on any gap or repeat.
    fn append_chunk(&self, chunk: &ArtChunk) -> Result<ArtifactRecord, ArtifactError>;
}

// =============================================================================
// State
// =============================================================================

pub trait StateBackend: Send + Sync {
    fn put_state(&self, put: StatePut);
    fn get_state(&self, state_id: &[u8]) -> Option<StatePut>;
    fn has_state(&self, state_id: &[u8]) -> bool;
}

// =============================================================================
// Discovery
// =============================================================================

pub trait AgentCardBackend: Send + Sync {
    fn get_agent_card(&self, agent_id: &str) -> Option<AgdiscDoc>;
}

pub trait ToolCatalogBackend: Send + Sync {
    fn list_tools(&self) -> Vec<ToolDescriptor>;
    /// Empty `version` matches any version of the tool.
    fn get_tool(&self, tool_id: &str, version: &str) -> Option<ToolDescriptor>;
}

// =============================================================================
// RPC
// =============================================================================

/// One reply message produced by the RPC backend, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcReply {
    Resp(RpcResp),
    Err(RpcErr),
    StreamItem(RpcStreamItem),
}

pub trait RpcBackend: Send + Sync {
    /// Evaluates a request; stream items precede the terminal response.
    ///
    /// # Errors
    ///
    /// Backend faults only; unknown methods are an `Err` reply, not a
    /// fault.
    fn handle_request(&self, req: &RpcReq) -> Result<Vec<RpcReply>, BackendError>;

    /// Produces the error message answering a cancel.
    fn handle_cancel(&self) -> RpcErr;
}

// =============================================================================
// Events
// =============================================================================

pub trait EventsBackend: Send + Sync {
    /// # Errors
    ///
    /// Backend faults only; the event is already validated.
    fn publish(&self, event: EventRecord) -> Result<(), BackendError>;

    /// # Errors
    ///
    /// Backend faults only.
    fn subscribe(&self, filter: &str) -> Result<Vec<EventRecord>, BackendError>;

    /// # Errors
    ///
    /// Backend faults only; unknown subscription ids are a no-op.
    fn unsubscribe(&self, subscription_id: &str) -> Result<(), BackendError>;
}

// =============================================================================
// Credentials
// =============================================================================

pub trait CredBackend: Send + Sync {
    /// Ensures a chain record exists (depth 1) for a non-empty id.
    fn ensure_chain(&self, chain_id: &[u8]);
    /// Increments and returns the chain depth.
    fn increment_chain_depth(&self, chain_id: &[u8]) -> u32;
    fn is_revoked(&self, chain_id: &[u8]) -> bool;
    fn revoke(&self, chain_id: &[u8]);
}

// =============================================================================
// Policy hints
// =============================================================================

pub trait PolicyHintBackend: Send + Sync {
    fn get_constraint(&self, key: &str) -> Option<Constraint>;
    fn set_constraint(&self, constraint: Constraint);
}

// =============================================================================
// Relay
// =============================================================================

/// Current state of one relay delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryStatus {
    pub attempt_count: u32,
    pub state: String,
}

pub trait RelayBackend: Send + Sync {
    /// Creates the delivery on first publish.
    ///
    /// Returns `(created, attempt_count, state)`; when `created` is false
    /// the returned values describe the existing delivery.
    fn create_delivery(&self, delivery_id: &[u8]) -> (bool, u32, String);
    fn mark_ack(&self, delivery_id: &[u8]);
    /// Increments attempts and transitions to `retry` or `dead-letter`.
    fn mark_nack(&self, delivery_id: &[u8], retryable: bool) -> DeliveryStatus;
    fn get_delivery(&self, delivery_id: &[u8]) -> Option<DeliveryStatus>;
}

// =============================================================================
// Observability
// =============================================================================

pub trait ObsBackend: Send + Sync {
    fn set_doc(&self, doc: ObsDoc);
    fn get_doc(&self) -> ObsDoc;
}

// =============================================================================
// Runtime backend set
// =============================================================================

/// The backends a server instance owns.
///
/// `default()` wires the in-memory reference implementations; the `with_*`
/// builders replace individual slots for tests and embedders.
#[derive(Clone)]
pub struct RuntimeBackends {
    pub a2a: Arc<dyn A2aBackend>,
    pub artifact: Arc<dyn ArtifactBackend>,
    pub state: Arc<dyn StateBackend>,
    pub agent_cards: Arc<dyn AgentCardBackend>,
    pub tool_catalog: Arc<dyn ToolCatalogBackend>,
    pub rpc: Arc<dyn RpcBackend>,
    pub events: Arc<dyn EventsBackend>,
    pub cred: Arc<dyn CredBackend>,
    pub policy_hints: Arc<dyn PolicyHintBackend>,
    pub relay: Arc<dyn RelayBackend>,
    pub obs: Arc<dyn ObsBackend>,
}

impl Default for RuntimeBackends {
    fn default() -> Self {
        Self {
            a2a: Arc::new(memory::InMemoryA2aBackend::default()),
            artifact: Arc::new(memory::InMemoryArtifactBackend::default()),
            state: Arc::new(memory::InMemoryStateBackend::default()),
            agent_cards: Arc::new(memory::InMemoryAgentCardBackend::with_demo_card()),
            tool_catalog: Arc::new(memory::InMemoryToolCatalogBackend::with_demo_tools()),
            rpc: Arc::new(memory::InMemoryRpcBackend),
            events: Arc::new(memory::InMemoryEventsBackend::default()),
            cred: Arc::new(memory::InMemoryCredBackend::default()),
            policy_hints: Arc::new(memory::InMemoryPolicyHintBackend::default()),
            relay: Arc::new(memory::InMemoryRelayBackend::default()),
            obs: Arc::new(memory::InMemoryObsBackend::default()),
        }
    }
}

impl RuntimeBackends {
    #[must_use]
    pub fn with_a2a(mut self, backend: Arc<dyn A2aBackend>) -> Self {
        self.a2a = backend;
        self
    }

    #[must_use]
    pub fn with_artifact(mut self, backend: Arc<dyn ArtifactBackend>) -> Self {
        self.artifact = backend;
        self
    }

    #[must_use]
    pub fn with_state(mut self, backend: Arc<dyn StateBackend>) -> Self {
        self.state = backend;
        self
    }

    #[must_use]
    pub fn with_agent_cards(mut self, backend: Arc<dyn AgentCardBackend>) -> Self {
        self.agent_cards = backend;
        self
    }

    #[must_use]
    pub fn with_tool_catalog(mut self, backend: Arc<dyn ToolCatalogBackend>) -> Self {
        self.tool_catalog = backend;
        self
    }

    #[must_use]
    pub fn with_rpc(mut self, backend: Arc<dyn RpcBackend>) -> Self {
        self.rpc = backend;
        self
    }

    #[must_use]
    pub fn with_events(mut self, backend: Arc<dyn EventsBackend>) -> Self {
        self.events = backend;
        self
    }

    #[must_use]
    pub fn with_cred(mut self, backend: Arc<dyn CredBackend>) -> Self {
        self.cred = backend;
        self
    }

    #[must_use]
    pub fn with_policy_hints(mut self, backend: Arc<dyn PolicyHintBackend>) -> Self {
        self.policy_hints = backend;
        self
    }

    #[must_use]
    pub fn with_relay(mut self, backend: Arc<dyn RelayBackend>) -> Self {
        self.relay = backend;
        self
    }

    #[must_use]
    pub fn with_obs(mut self, backend: Arc<dyn ObsBackend>) -> Self {
        self.obs = backend;
        self
    }
}

impl std::fmt::Debug for RuntimeBackends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeBackends").finish_non_exhaustive()
    }
}
