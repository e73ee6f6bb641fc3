//! RPC handler (profile 12): request/response with streaming.
//!
//! Requests are evaluated by the RPC backend; for a streaming method the
//! stream items are emitted before the single terminal response, in order.
//! A cancel is answered with an error message carrying code `cancelled`.

use std::sync::Arc;

use swp_core::payload::rpc;
use swp_core::{
    Clock, Envelope, ErrorCode, ProfileHandler, ProfileId, ProtocolError, ProtocolResult,
    RequestContext,
};

use super::reply_envelope;
use crate::backends::{RpcReply, RuntimeBackends};

pub struct RpcHandler {
    backends: RuntimeBackends,
    clock: Arc<dyn Clock>,
}

impl RpcHandler {
    #[must_use]
    pub fn new(backends: RuntimeBackends, clock: Arc<dyn Clock>) -> Self {
        Self { backends, clock }
    }

    fn reply(&self, env: &Envelope, msg_type: u64, payload: Vec<u8>) -> Envelope {
        reply_envelope(
            ProfileId::RPC,
            &env.msg_id,
            msg_type,
            self.clock.now_unix_ms(),
            payload,
        )
    }
}

impl ProfileHandler for RpcHandler {
    fn handle(&self, _ctx: &RequestContext, env: &Envelope) -> ProtocolResult<Vec<Envelope>> {
        match env.msg_type {
            rpc::MSG_CANCEL => {
                let payload = rpc::encode_err(&self.backends.rpc.handle_cancel());
                Ok(vec![self.reply(env, rpc::MSG_ERR, payload)])
            }

            rpc::MSG_REQ => {
                let req = rpc::decode_req(&env.payload)
                    .map_err(|e| e.context("invalid RPC request payload"))?;

                let replies = self
                    .backends
                    .rpc
                    .handle_request(&req)
                    .map_err(|e| ProtocolError::internal(e.to_string()))?;

                Ok(replies
                    .into_iter()
                    .map(|reply| match reply {
                        RpcReply::Resp(resp) => {
                            self.reply(env, rpc::MSG_RESP, rpc::encode_resp(&resp))
                        }
                        RpcReply::Err(err) => self.reply(env, rpc::MSG_ERR, rpc::encode_err(&err)),
                        RpcReply::StreamItem(item) => {
                            self.reply(env, rpc::MSG_STREAM_ITEM, rpc::encode_stream_item(&item))
                        }
                    })
                    .collect())
            }

            // Server-emitted variants are not accepted inbound.
            rpc::MSG_RESP | rpc::MSG_ERR | rpc::MSG_STREAM_ITEM => Err(
                ProtocolError::invalid_envelope(format!("invalid RPC msg_type {}", env.msg_type)),
            ),

            other => Err(ProtocolError::new(
                ErrorCode::UnsupportedMsgType,
                format!("invalid RPC msg_type {other}"),
            )),
        }
    }
}
