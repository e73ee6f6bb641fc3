//! Tool-catalog discovery handler (profile 11).
//!
//! List requests filter by case-insensitive substring over tool id and name,
//! then paginate with a numeric-offset page token and a page size clamped to
//! [`MAX_PAGE_SIZE`]. Get requests resolve by id plus optional version.

use std::sync::Arc;

use swp_core::payload::tooldisc::{
    self, TooldiscErr, TooldiscGetResp, TooldiscListReq, TooldiscListResp, ToolDescriptor,
};
use swp_core::{
    Clock, Envelope, ErrorCode, ProfileHandler, ProfileId, ProtocolError, ProtocolResult,
    RequestContext,
};

use super::reply_envelope;
use crate::backends::RuntimeBackends;

/// Page-size clamp for list responses.
pub const MAX_PAGE_SIZE: usize = 100;

pub struct ToolDiscHandler {
    backends: RuntimeBackends,
    clock: Arc<dyn Clock>,
}

impl ToolDiscHandler {
    #[must_use]
    pub fn new(backends: RuntimeBackends, clock: Arc<dyn Clock>) -> Self {
        Self { backends, clock }
    }

    fn reply(&self, env: &Envelope, msg_type: u64, payload: Vec<u8>) -> Vec<Envelope> {
        vec![reply_envelope(
            ProfileId::TOOL_DISC,
            &env.msg_id,
            msg_type,
            self.clock.now_unix_ms(),
            payload,
        )]
    }
}

impl ProfileHandler for ToolDiscHandler {
    fn handle(&self, _ctx: &RequestContext, env: &Envelope) -> ProtocolResult<Vec<Envelope>> {
        match env.msg_type {
            tooldisc::MSG_LIST_REQ => {
                let req = tooldisc::decode_list_req(&env.payload)
                    .map_err(|e| e.context("invalid TOOLDISC list request payload"))?;
                let resp = paginate(&req, self.backends.tool_catalog.list_tools());
                Ok(self.reply(env, tooldisc::MSG_LIST_RESP, tooldisc::encode_list_resp(&resp)))
            }

            tooldisc::MSG_GET_REQ => {
                let req = tooldisc::decode_get_req(&env.payload)
                    .map_err(|e| e.context("invalid TOOLDISC get request payload"))?;
                match self.backends.tool_catalog.get_tool(&req.tool_id, &req.version) {
                    Some(tool) => Ok(self.reply(
                        env,
                        tooldisc::MSG_GET_RESP,
                        tooldisc::encode_get_resp(&TooldiscGetResp { tool }),
                    )),
                    None => Ok(self.reply(
                        env,
                        tooldisc::MSG_ERR,
                        tooldisc::encode_err(&TooldiscErr {
                            code: "NOT_FOUND".to_string(),
                            message: "tool not found".to_string(),
                        }),
                    )),
                }
            }

            // Server-emitted variants are not accepted inbound.
            tooldisc::MSG_LIST_RESP | tooldisc::MSG_GET_RESP | tooldisc::MSG_ERR => {
                Err(ProtocolError::invalid_envelope(format!(
                    "invalid TOOLDISC msg_type {}",
                    env.msg_type
                )))
            }

            other => Err(ProtocolError::new(
                ErrorCode::UnsupportedMsgType,
                format!("invalid TOOLDISC msg_type {other}"),
            )),
        }
    }
}

fn paginate(req: &TooldiscListReq, tools: Vec<ToolDescriptor>) -> TooldiscListResp {
    let filtered = filter_tools(&req.filter, tools);

    let mut start = 0usize;
    if !req.page_token.is_empty() {
        if let Ok(offset) = req.page_token.parse::<usize>() {
            start = offset;
        }
    }
    start = start.min(filtered.len());

    let mut page_size = req.page_size as usize;
    if page_size == 0 {
        page_size = filtered.len();
    }
    page_size = page_size.min(MAX_PAGE_SIZE);

    let end = (start + page_size).min(filtered.len());
    let next_page_token = if end < filtered.len() {
        end.to_string()
    } else {
        String::new()
    };

    TooldiscListResp {
        tools: filtered[start..end].to_vec(),
        next_page_token,
    }
}

fn filter_tools(filter: &str, tools: Vec<ToolDescriptor>) -> Vec<ToolDescriptor> {
    let needle = filter.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return tools;
    }
    tools
        .into_iter()
        .filter(|t| {
            t.tool_id.to_ascii_lowercase().contains(&needle)
                || t.name.to_ascii_lowercase().contains(&needle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testutil::{assert_reply_shape, clock, ctx_for, request};
    use swp_core::payload::tooldisc::TooldiscGetReq;

    fn handle(msg_type: u64, payload: Vec<u8>) -> Vec<Envelope> {
        let handler = ToolDiscHandler::new(RuntimeBackends::default(), clock());
        let env = request(ProfileId::TOOL_DISC, msg_type, payload);
        let replies = handler.handle(&ctx_for(&env), &env).unwrap();
        assert_reply_shape(&env, &replies);
        replies
    }

    #[test]
    fn list_returns_seeded_catalog() {
        let replies = handle(
            tooldisc::MSG_LIST_REQ,
            tooldisc::encode_list_req(&TooldiscListReq::default()),
        );
        let resp = tooldisc::decode_list_resp(&replies[0].payload).unwrap();
        assert_eq!(resp.tools.len(), 2);
        assert!(resp.next_page_token.is_empty());
    }

    #[test]
    fn pagination_with_numeric_offset_token() {
        let first = handle(
            tooldisc::MSG_LIST_REQ,
            tooldisc::encode_list_req(&TooldiscListReq {
                page_size: 1,
                page_token: String::new(),
                filter: String::new(),
            }),
        );
        let resp = tooldisc::decode_list_resp(&first[0].payload).unwrap();
        assert_eq!(resp.tools.len(), 1);
        assert_eq!(resp.next_page_token, "1");

        let second = handle(
            tooldisc::MSG_LIST_REQ,
            tooldisc::encode_list_req(&TooldiscListReq {
                page_size: 1,
                page_token: resp.next_page_token,
                filter: String::new(),
            }),
        );
        let resp = tooldisc::decode_list_resp(&second[0].payload).unwrap();
        assert_eq!(resp.tools.len(), 1);
        assert!(resp.next_page_token.is_empty());
    }

    #[test]
    fn filter_matches_id_and_name_case_insensitively() {
        let replies = handle(
            tooldisc::MSG_LIST_REQ,
            tooldisc::encode_list_req(&TooldiscListReq {
                page_size: 0,
                page_token: String::new(),
                filter: "COUNT".to_string(),
            }),
        );
        let resp = tooldisc::decode_list_resp(&replies[0].payload).unwrap();
        assert_eq!(resp.tools.len(), 1);
        assert_eq!(resp.tools[0].tool_id, "count");
    }

    #[test]
    fn get_by_id_and_version() {
        let replies = handle(
            tooldisc::MSG_GET_REQ,
            tooldisc::encode_get_req(&TooldiscGetReq {
                tool_id: "echo".to_string(),
                version: "1.0.0".to_string(),
            }),
        );
        assert_eq!(replies[0].msg_type, tooldisc::MSG_GET_RESP);
        let resp = tooldisc::decode_get_resp(&replies[0].payload).unwrap();
        assert_eq!(resp.tool.name, "Echo");
    }

    #[test]
    fn get_missing_tool_returns_not_found_err() {
        let replies = handle(
            tooldisc::MSG_GET_REQ,
            tooldisc::encode_get_req(&TooldiscGetReq {
                tool_id: "missing".to_string(),
                version: String::new(),
            }),
        );
        assert_eq!(replies[0].msg_type, tooldisc::MSG_ERR);
        let err = tooldisc::decode_err(&replies[0].payload).unwrap();
        assert_eq!(err.code, "NOT_FOUND");
    }

    #[test]
    fn page_size_is_clamped() {
        let many: Vec<ToolDescriptor> = (0..250)
            .map(|n| ToolDescriptor {
                tool_id: format!("tool-{n:03}"),
                name: format!("Tool {n}"),
                version: "1.0.0".to_string(),
                schema_ref: String::new(),
                descriptor_payload: Vec::new(),
            })
            .collect();
        let resp = paginate(
            &TooldiscListReq {
                page_size: 1000,
                page_token: String::new(),
                filter: String::new(),
            },
            many,
        );
        assert_eq!(resp.tools.len(), MAX_PAGE_SIZE);
        assert_eq!(resp.next_page_token, "100");
    }
}
