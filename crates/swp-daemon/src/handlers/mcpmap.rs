//! MCPMap handler (profile 1): JSON-RPC over the envelope payload.
//!
//! The payload must be valid UTF-8 and valid JSON. Inbound message types are
//! request (1) and notification (3); the server emits responses (2) itself
//! and does not accept them on the wire. Known methods: `tools/list` and
//! `tools/call`; anything else earns a JSON-RPC −32601 error response.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use swp_core::{
    Clock, Envelope, ErrorCode, ProfileHandler, ProfileId, ProtocolError, ProtocolResult,
    RequestContext,
};

use super::reply_envelope;

pub const MSG_REQUEST: u64 = 1;
pub const MSG_RESPONSE: u64 = 2;
pub const MSG_NOTIFICATION: u64 = 3;

/// JSON-RPC "method not found".
const METHOD_NOT_FOUND: i64 = -32601;

pub struct McpMapHandler {
    clock: Arc<dyn Clock>,
}

impl McpMapHandler {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl ProfileHandler for McpMapHandler {
    fn handle(&self, _ctx: &RequestContext, env: &Envelope) -> ProtocolResult<Vec<Envelope>> {
        match env.msg_type {
            MSG_REQUEST | MSG_NOTIFICATION => {}
            MSG_RESPONSE => {
                return Err(ProtocolError::invalid_envelope(
                    "inbound MCP responses are not accepted",
                ));
            }
            other => {
                return Err(ProtocolError::new(
                    ErrorCode::UnsupportedMsgType,
                    format!("invalid MCP msg_type {other}"),
                ));
            }
        }

        let obj = parse_payload(&env.payload)?;

        if env.msg_type == MSG_NOTIFICATION {
            if !obj.contains_key("method") {
                return Err(ProtocolError::new(
                    ErrorCode::InvalidMcpPayload,
                    "notification missing method",
                ));
            }
            return Ok(vec![]);
        }

        if !(obj.contains_key("jsonrpc") && obj.contains_key("method") && obj.contains_key("id")) {
            return Err(ProtocolError::new(
                ErrorCode::InvalidMcpPayload,
                "request missing jsonrpc/method/id",
            ));
        }

        let id = obj.get("id").cloned().unwrap_or(Value::Null);
        let method = obj.get("method").and_then(Value::as_str).unwrap_or_default();
        let params = obj.get("params").cloned().unwrap_or(Value::Null);

        let mut response = json!({ "jsonrpc": "2.0", "id": id });
        match method {
            "tools/list" => {
                response["result"] = json!({
                    "tools": [{
                        "name": "echo",
                        "description": "Echo tool for the SWP reference server",
                        "inputSchema": {
                            "type": "object",
                            "properties": { "text": { "type": "string" } },
                            "required": ["text"],
                        },
                    }],
                });
            }
            "tools/call" => {
                let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
                if name == "echo" {
                    let text = params
                        .get("arguments")
                        .and_then(|a| a.get("text"))
                        .cloned()
                        .unwrap_or(Value::Null);
                    response["result"] = json!({
                        "content": [{ "type": "text", "text": format!("echo: {}", render(&text)) }],
                    });
                } else {
                    response["error"] =
                        json!({ "code": METHOD_NOT_FOUND, "message": "tool not found" });
                }
            }
            _ => {
                response["error"] =
                    json!({ "code": METHOD_NOT_FOUND, "message": "method not found" });
            }
        }

        let payload = serde_json::to_vec(&response)
            .map_err(|e| ProtocolError::internal(format!("marshal MCP response: {e}")))?;
        Ok(vec![reply_envelope(
            ProfileId::MCP_MAP,
            &env.msg_id,
            MSG_RESPONSE,
            self.clock.now_unix_ms(),
            payload,
        )])
    }
}

/// Parses the payload as a UTF-8 JSON object.
fn parse_payload(payload: &[u8]) -> ProtocolResult<Map<String, Value>> {
    let text = std::str::from_utf8(payload).map_err(|_| {
        ProtocolError::new(ErrorCode::InvalidMcpPayload, "payload is not valid UTF-8")
    })?;
    let value: Value = serde_json::from_str(text).map_err(|_| {
        ProtocolError::new(ErrorCode::InvalidMcpPayload, "payload is not valid JSON")
    })?;
    match value {
        Value::Object(obj) => Ok(obj),
        _ => Err(ProtocolError::new(
            ErrorCode::InvalidMcpPayload,
            "payload is not a JSON object",
        )),
    }
}

/// Renders a JSON value the way a text echo should read (strings unquoted).
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testutil::{assert_reply_shape, clock, ctx_for, request};

    fn handler() -> McpMapHandler {
        McpMapHandler::new(clock())
    }

    fn handle(msg_type: u64, payload: &str) -> ProtocolResult<Vec<Envelope>> {
        let env = request(ProfileId::MCP_MAP, msg_type, payload.as_bytes().to_vec());
        let replies = handler().handle(&ctx_for(&env), &env)?;
        assert_reply_shape(&env, &replies);
        Ok(replies)
    }

    #[test]
    fn tools_list_returns_echo_catalog() {
        let replies = handle(
            MSG_REQUEST,
            r#"{"jsonrpc":"2.0","id":"1","method":"tools/list","params":{}}"#,
        )
        .unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].msg_type, MSG_RESPONSE);

        let body: Value = serde_json::from_slice(&replies[0].payload).unwrap();
        let tools = body["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "echo");
    }

    #[test]
    fn tools_call_echo_returns_text_content() {
        let replies = handle(
            MSG_REQUEST,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"echo","arguments":{"text":"hi"}}}"#,
        )
        .unwrap();
        let body: Value = serde_json::from_slice(&replies[0].payload).unwrap();
        assert_eq!(body["result"]["content"][0]["type"], "text");
        assert_eq!(body["result"]["content"][0]["text"], "echo: hi");
    }

    #[test]
    fn unknown_method_gets_jsonrpc_error() {
        let replies = handle(
            MSG_REQUEST,
            r#"{"jsonrpc":"2.0","id":"3","method":"no/such","params":{}}"#,
        )
        .unwrap();
        let body: Value = serde_json::from_slice(&replies[0].payload).unwrap();
        assert_eq!(body["error"]["code"], METHOD_NOT_FOUND);
    }

    #[test]
    fn unknown_tool_gets_jsonrpc_error() {
        let replies = handle(
            MSG_REQUEST,
            r#"{"jsonrpc":"2.0","id":"4","method":"tools/call","params":{"name":"bogus"}}"#,
        )
        .unwrap();
        let body: Value = serde_json::from_slice(&replies[0].payload).unwrap();
        assert_eq!(body["error"]["code"], METHOD_NOT_FOUND);
    }

    #[test]
    fn notification_produces_no_reply() {
        let replies = handle(MSG_NOTIFICATION, r#"{"method":"notify/me"}"#).unwrap();
        assert!(replies.is_empty());
    }

    #[test]
    fn invalid_payloads_rejected() {
        let err = handle(MSG_REQUEST, "not json").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidMcpPayload);

        let env = request(ProfileId::MCP_MAP, MSG_REQUEST, vec![0xff, 0xfe]);
        let err = handler().handle(&ctx_for(&env), &env).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidMcpPayload);

        // Request missing the id member.
        let err = handle(MSG_REQUEST, r#"{"jsonrpc":"2.0","method":"tools/list"}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidMcpPayload);
    }

    #[test]
    fn inbound_response_and_out_of_set_types_rejected() {
        let err = handle(MSG_RESPONSE, r#"{"id":"1","result":{}}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidEnvelope);

        let err = handle(9, "{}").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedMsgType);
    }
}
