//! In-memory reference backends.
//!
//! All maps live behind an `RwLock`; writes happen under the write lock and
//! reads hand out owned clones so callers never observe later mutation. The
//! events buffer is bounded with oldest-first eviction.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use serde_json::json;
use swp_core::payload::agdisc::AgdiscDoc;
use swp_core::payload::artifact::{ArtChunk, ArtOffer};
use swp_core::payload::events::EventRecord;
use swp_core::payload::obs::ObsDoc;
use swp_core::payload::policyhint::Constraint;
use swp_core::payload::rpc::{RpcErr, RpcReq, RpcResp, RpcStreamItem};
use swp_core::payload::state::StatePut;
use swp_core::payload::tooldisc::ToolDescriptor;

use super::{
    A2aBackend, A2aError, A2aTaskRecord, AgentCardBackend, ArtifactBackend, ArtifactError,
    ArtifactRecord, BackendError, CredBackend, DeliveryStatus, EventsBackend, ObsBackend,
    PolicyHintBackend, RelayBackend, RpcBackend, RpcReply, StateBackend, ToolCatalogBackend,
};

/// Cap on buffered events; oldest entries are evicted first.
pub const MAX_BUFFERED_EVENTS: usize = 1024;

/// Hard cap on items in a `demo.stream.count` stream.
const MAX_STREAM_COUNT: usize = 100;

// =============================================================================
// A2A
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryA2aBackend {
    tasks: RwLock<HashMap<Vec<u8>, A2aTaskRecord>>,
}

impl A2aBackend for InMemoryA2aBackend {
    fn upsert_task(&self, task_id: &[u8], kind: &str, input: &[u8]) -> Result<bool, A2aError> {
        let mut tasks = self.tasks.write().expect("lock poisoned");
        if let Some(existing) = tasks.get(task_id) {
            if existing.kind == kind && existing.input == input {
                return Ok(false);
            }
            return Err(A2aError::TaskConflict);
        }
        tasks.insert(
            task_id.to_vec(),
            A2aTaskRecord {
                kind: kind.to_string(),
                input: input.to_vec(),
                ..A2aTaskRecord::default()
            },
        );
        Ok(true)
    }

    fn get_task(&self, task_id: &[u8]) -> Option<A2aTaskRecord> {
        self.tasks.read().expect("lock poisoned").get(task_id).cloned()
    }

    fn set_terminal(
        &self,
        task_id: &[u8],
        ok: bool,
        output: &[u8],
        error_message: &str,
    ) -> Result<(), A2aError> {
        let mut tasks = self.tasks.write().expect("lock poisoned");
        let record = tasks.get_mut(task_id).ok_or(A2aError::UnknownTask)?;
        if record.terminal {
            if record.terminal_ok == ok
                && record.terminal_output == output
                && record.terminal_error == error_message
            {
                return Ok(());
            }
            return Err(A2aError::TerminalConflict);
        }
        record.terminal = true;
        record.terminal_ok = ok;
        record.terminal_output = output.to_vec();
        record.terminal_error = error_message.to_string();
        Ok(())
    }
}

// =============================================================================
// Artifact
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryArtifactBackend {
    records: RwLock<HashMap<String, ArtifactRecord>>,
}

impl ArtifactBackend for InMemoryArtifactBackend {
    fn put_offer(&self, offer: ArtOffer) {
        let mut records = self.records.write().expect("lock poisoned");
        records.insert(
            offer.artifact_id.clone(),
            ArtifactRecord {
                offer,
                data: Vec::new(),
                next_chunk_index: 0,
            },
        );
    }

    fn get_artifact(&self, artifact_id: &str) -> Option<ArtifactRecord> {
        self.records
            .read()
            .expect("lock poisoned")
            .get(artifact_id)
            .cloned()
    }

    fn append_chunk(&self, chunk: &ArtChunk) -> Result<ArtifactRecord, ArtifactError> {
        let mut records = self.records.write().expect("lock poisoned");
        let record = records.entry(chunk.artifact_id.clone()).or_default();
        if chunk.chunk_index != record.next_chunk_index {
            return Err(ArtifactError::ChunkOrdering);
        }
        record.data.extend_from_slice(&chunk.data);
        record.next_chunk_index += 1;
        Ok(record.clone())
    }
}

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryStateBackend {
    states: RwLock<HashMap<Vec<u8>, StatePut>>,
}

impl StateBackend for InMemoryStateBackend {
    fn put_state(&self, put: StatePut) {
        self.states
            .write()
            .expect("lock poisoned")
            .insert(put.state_id.clone(), put);
    }

    fn get_state(&self, state_id: &[u8]) -> Option<StatePut> {
        self.states.read().expect("lock poisoned").get(state_id).cloned()
    }

    fn has_state(&self, state_id: &[u8]) -> bool {
        self.states.read().expect("lock poisoned").contains_key(state_id)
    }
}

// =============================================================================
// Discovery
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryAgentCardBackend {
    cards: RwLock<HashMap<String, AgdiscDoc>>,
}

impl InMemoryAgentCardBackend {
    /// Seeds the demo card shipped by the reference server.
    #[must_use]
    pub fn with_demo_card() -> Self {
        let backend = Self::default();
        backend.put_card(AgdiscDoc {
            agent_id: "agent.demo".to_string(),
            schema_revision: "v1".to_string(),
            card_payload: br#"{"name":"Demo Agent","capabilities":["echo","count"]}"#.to_vec(),
            etag: "etag-agent-demo-v1".to_string(),
            max_age_ms: 60_000,
        });
        backend
    }

    pub fn put_card(&self, card: AgdiscDoc) {
        self.cards
            .write()
            .expect("lock poisoned")
            .insert(card.agent_id.clone(), card);
    }
}

impl AgentCardBackend for InMemoryAgentCardBackend {
    fn get_agent_card(&self, agent_id: &str) -> Option<AgdiscDoc> {
        self.cards.read().expect("lock poisoned").get(agent_id).cloned()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryToolCatalogBackend {
    tools: RwLock<Vec<ToolDescriptor>>,
}

impl InMemoryToolCatalogBackend {
    /// Seeds the demo catalog (echo + counter).
    #[must_use]
    pub fn with_demo_tools() -> Self {
        Self {
            tools: RwLock::new(vec![
                ToolDescriptor {
                    tool_id: "echo".to_string(),
                    name: "Echo".to_string(),
                    version: "1.0.0".to_string(),
                    schema_ref: "swp://schemas/tools/echo/v1".to_string(),
                    descriptor_payload: Vec::new(),
                },
                ToolDescriptor {
                    tool_id: "count".to_string(),
                    name: "Counter".to_string(),
                    version: "1.0.0".to_string(),
                    schema_ref: "swp://schemas/tools/count/v1".to_string(),
                    descriptor_payload: Vec::new(),
                },
            ]),
        }
    }
}

impl ToolCatalogBackend for InMemoryToolCatalogBackend {
    fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools.read().expect("lock poisoned").clone()
    }

    fn get_tool(&self, tool_id: &str, version: &str) -> Option<ToolDescriptor> {
        self.tools
            .read()
            .expect("lock poisoned")
            .iter()
            .find(|t| t.tool_id == tool_id && (version.is_empty() || t.version == version))
            .cloned()
    }
}

// =============================================================================
// RPC
// =============================================================================

/// Demo RPC backend: `demo.echo`, `demo.stream.count`, `demo.fail`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryRpcBackend;

impl RpcBackend for InMemoryRpcBackend {
    fn handle_request(&self, req: &RpcReq) -> Result<Vec<RpcReply>, BackendError> {
        match req.method.as_str() {
            "demo.echo" => Ok(vec![RpcReply::Resp(RpcResp {
                rpc_id: req.rpc_id.clone(),
                result: req.params.clone(),
            })]),

            "demo.stream.count" => {
                let mut count = 5usize;
                if !req.params.is_empty() {
                    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&req.params) {
                        if let Some(n) = value.get("count").and_then(serde_json::Value::as_u64) {
                            if n > 0 {
                                count = n as usize;
                            }
                        }
                    }
                }
                count = count.min(MAX_STREAM_COUNT);

                let mut out = Vec::with_capacity(count + 1);
                for seq_no in 1..=count as u64 {
                    out.push(RpcReply::StreamItem(RpcStreamItem {
                        rpc_id: req.rpc_id.clone(),
                        seq_no,
                        item: seq_no.to_string().into_bytes(),
                        is_terminal: false,
                    }));
                }
                let terminal = json!({ "count": count, "done": true });
                out.push(RpcReply::Resp(RpcResp {
                    rpc_id: req.rpc_id.clone(),
                    result: serde_json::to_vec(&terminal)
                        .map_err(|e| BackendError(format!("encode terminal result: {e}")))?,
                }));
                Ok(out)
            }

            "demo.fail" => Ok(vec![RpcReply::Err(RpcErr {
                rpc_id: req.rpc_id.clone(),
                error_code: "internal".to_string(),
                retryable: false,
                error_message: "forced failure".to_string(),
            })]),

            _ => Ok(vec![RpcReply::Err(RpcErr {
                rpc_id: req.rpc_id.clone(),
                error_code: "unknown_method".to_string(),
                retryable: false,
                error_message: "unknown method".to_string(),
            })]),
        }
    }

    fn handle_cancel(&self) -> RpcErr {
        RpcErr {
            rpc_id: Vec::new(),
            error_code: "cancelled".to_string(),
            retryable: false,
            error_message: "cancel received".to_string(),
        }
    }
}

// =============================================================================
// Events
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryEventsBackend {
    buffer: RwLock<VecDeque<EventRecord>>,
}

impl EventsBackend for InMemoryEventsBackend {
    fn publish(&self, event: EventRecord) -> Result<(), BackendError> {
        let mut buffer = self.buffer.write().expect("lock poisoned");
        while buffer.len() >= MAX_BUFFERED_EVENTS {
            buffer.pop_front();
        }
        buffer.push_back(event);
        Ok(())
    }

    fn subscribe(&self, filter: &str) -> Result<Vec<EventRecord>, BackendError> {
        let buffer = self.buffer.read().expect("lock poisoned");
        let filter = filter.trim().to_ascii_lowercase();
        Ok(buffer
            .iter()
            .filter(|e| filter.is_empty() || e.event_type.to_ascii_lowercase().contains(&filter))
            .cloned()
            .collect())
    }

    fn unsubscribe(&self, _subscription_id: &str) -> Result<(), BackendError> {
        Ok(())
    }
}

// =============================================================================
// Credentials
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryCredBackend {
    chains: RwLock<HashMap<Vec<u8>, u32>>,
    revoked: RwLock<HashMap<Vec<u8>, bool>>,
}

impl CredBackend for InMemoryCredBackend {
    fn ensure_chain(&self, chain_id: &[u8]) {
        if chain_id.is_empty() {
            return;
        }
        let mut chains = self.chains.write().expect("lock poisoned");
        chains.entry(chain_id.to_vec()).or_insert(1);
    }

    fn increment_chain_depth(&self, chain_id: &[u8]) -> u32 {
        let mut chains = self.chains.write().expect("lock poisoned");
        let depth = chains.entry(chain_id.to_vec()).or_insert(0);
        *depth += 1;
        *depth
    }

    fn is_revoked(&self, chain_id: &[u8]) -> bool {
        self.revoked
            .read()
            .expect("lock poisoned")
            .get(chain_id)
            .copied()
            .unwrap_or(false)
    }

    fn revoke(&self, chain_id: &[u8]) {
        self.revoked
            .write()
            .expect("lock poisoned")
            .insert(chain_id.to_vec(), true);
    }
}

// =============================================================================
// Policy hints
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryPolicyHintBackend {
    constraints: RwLock<HashMap<String, Constraint>>,
}

impl PolicyHintBackend for InMemoryPolicyHintBackend {
    fn get_constraint(&self, key: &str) -> Option<Constraint> {
        self.constraints.read().expect("lock poisoned").get(key).cloned()
    }

    fn set_constraint(&self, constraint: Constraint) {
        self.constraints
            .write()
            .expect("lock poisoned")
            .insert(constraint.key.clone(), constraint);
    }
}

// =============================================================================
// Relay
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryRelayBackend {
    deliveries: RwLock<HashMap<Vec<u8>, DeliveryStatus>>,
}

impl RelayBackend for InMemoryRelayBackend {
    fn create_delivery(&self, delivery_id: &[u8]) -> (bool, u32, String) {
        let mut deliveries = self.deliveries.write().expect("lock poisoned");
        if let Some(existing) = deliveries.get(delivery_id) {
            return (false, existing.attempt_count, existing.state.clone());
        }
        deliveries.insert(
            delivery_id.to_vec(),
            DeliveryStatus {
                attempt_count: 1,
                state: "queued".to_string(),
            },
        );
        (true, 1, "queued".to_string())
    }

    fn mark_ack(&self, delivery_id: &[u8]) {
        let mut deliveries = self.deliveries.write().expect("lock poisoned");
        if let Some(delivery) = deliveries.get_mut(delivery_id) {
            delivery.state = "acked".to_string();
        }
    }

    fn mark_nack(&self, delivery_id: &[u8], retryable: bool) -> DeliveryStatus {
        let mut deliveries = self.deliveries.write().expect("lock poisoned");
        let delivery = deliveries
            .entry(delivery_id.to_vec())
            .or_insert_with(|| DeliveryStatus {
                attempt_count: 0,
                state: String::new(),
            });
        delivery.attempt_count += 1;
        delivery.state = if retryable { "retry" } else { "dead-letter" }.to_string();
        delivery.clone()
    }

    fn get_delivery(&self, delivery_id: &[u8]) -> Option<DeliveryStatus> {
        self.deliveries
            .read()
            .expect("lock poisoned")
            .get(delivery_id)
            .cloned()
    }
}

// =============================================================================
// Observability
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryObsBackend {
    doc: RwLock<ObsDoc>,
}

impl ObsBackend for InMemoryObsBackend {
    fn set_doc(&self, doc: ObsDoc) {
        *self.doc.write().expect("lock poisoned") = doc;
    }

    fn get_doc(&self) -> ObsDoc {
        self.doc.read().expect("lock poisoned").clone()
    }
}
