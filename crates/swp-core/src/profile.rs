//! Profile identifiers and per-profile supported message types.

/// Numbered profile namespaces carried in `profile_id`.
#[derive(Debug, Clone, Copy)]
pub struct ProfileId;

impl ProfileId {
    pub const MCP_MAP: u64 = 1;
    pub const A2A: u64 = 2;
    pub const AGDISC: u64 = 10;
    pub const TOOL_DISC: u64 = 11;
    pub const RPC: u64 = 12;
    pub const EVENTS: u64 = 13;
    pub const ARTIFACT: u64 = 14;
    pub const CRED: u64 = 15;
    pub const POLICY_HINT: u64 = 16;
    pub const STATE: u64 = 17;
    pub const OBS: u64 = 18;
    pub const RELAY: u64 = 19;
}

/// All profile ids this implementation routes.
#[must_use]
pub fn known_profiles() -> Vec<u64> {
    vec![
        ProfileId::MCP_MAP,
        ProfileId::A2A,
        ProfileId::AGDISC,
        ProfileId::TOOL_DISC,
        ProfileId::RPC,
        ProfileId::EVENTS,
        ProfileId::ARTIFACT,
        ProfileId::CRED,
        ProfileId::POLICY_HINT,
        ProfileId::STATE,
        ProfileId::OBS,
        ProfileId::RELAY,
    ]
}

/// Short lowercase profile name as used in vector categories and fixture
/// payload markers.
#[must_use]
pub fn profile_name(profile_id: u64) -> Option<&'static str> {
    match profile_id {
        ProfileId::MCP_MAP => Some("mcp"),
        ProfileId::A2A => Some("a2a"),
        ProfileId::AGDISC => Some("agdisc"),
        ProfileId::TOOL_DISC => Some("tooldisc"),
        ProfileId::RPC => Some("rpc"),
        ProfileId::EVENTS => Some("events"),
        ProfileId::ARTIFACT => Some("artifact"),
        ProfileId::CRED => Some("cred"),
        ProfileId::POLICY_HINT => Some("policyhint"),
        ProfileId::STATE => Some("state"),
        ProfileId::OBS => Some("obs"),
        ProfileId::RELAY => Some("relay"),
        _ => None,
    }
}

/// The message types a profile supports on the wire.
///
/// Empty for unknown profiles; callers reject those with `UNKNOWN_PROFILE`
/// before consulting this table.
#[must_use]
pub fn supported_msg_types(profile_id: u64) -> &'static [u64] {
    match profile_id {
        ProfileId::MCP_MAP => &[1, 2, 3],
        ProfileId::A2A => &[1, 2, 3, 4],
        ProfileId::AGDISC => &[1, 2, 3, 4],
        ProfileId::TOOL_DISC => &[1, 2, 3, 4, 5],
        ProfileId::RPC => &[1, 2, 3, 4, 5],
        ProfileId::EVENTS => &[1, 2, 3, 4, 5],
        ProfileId::ARTIFACT => &[1, 2, 3, 4, 5],
        ProfileId::CRED => &[1, 2, 3, 4],
        ProfileId::POLICY_HINT => &[1, 2, 3, 4],
        ProfileId::STATE => &[1, 2, 3, 4],
        ProfileId::OBS => &[1, 2, 3, 4],
        ProfileId::RELAY => &[1, 2, 3, 4, 5],
        _ => &[],
    }
}
