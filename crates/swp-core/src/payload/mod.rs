//! Per-profile payload message types and codecs.
//!
//! Every profile payload is a one-of wrapper over the wire subset in
//! [`crate::wire`]: the outer field number selects the variant and equals the
//! envelope `msg_type` for that profile. Unknown inner fields are ignored; a
//! known field with the wrong wire type is a decode error.
//!
//! MCPMap (profile 1) is absent here on purpose — its payload is UTF-8
//! JSON-RPC, handled with `serde_json` in the daemon.

pub mod a2a;
pub mod agdisc;
pub mod artifact;
pub mod cred;
pub mod events;
pub mod fixture;
pub mod obs;
pub mod policyhint;
pub mod relay;
pub mod rpc;
pub mod state;
pub mod tooldisc;
