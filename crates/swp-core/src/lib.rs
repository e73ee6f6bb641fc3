//! Core wire-protocol library for SWP.
//!
//! SWP is a multi-profile, length-prefixed wire protocol carrying
//! heterogeneous application payloads over a single framed transport. This
//! crate implements the transport-independent layers:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │        Profile payload codecs            │  payload (protobuf wire subset)
//! ├──────────────────────────────────────────┤
//! │        Router / ProfileHandler           │  router
//! ├──────────────────────────────────────────┤
//! │        Envelope validation               │  validate
//! ├──────────────────────────────────────────┤
//! │        Envelope codec                    │  envelope + varint
//! ├──────────────────────────────────────────┤
//! │        Length-prefixed framing           │  framing
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Module Overview
//!
//! - [`framing`]: 4-byte big-endian length-prefixed frame codec
//!   ([`FrameCodec`]), usable with [`tokio_util::codec::Framed`] and as plain
//!   byte-slice helpers.
//! - [`varint`]: unsigned LEB128 with a 10-byte bound and overflow rejection.
//! - [`envelope`]: the fixed-order envelope record ([`Envelope`]) and its
//!   codec.
//! - [`validate`]: envelope validation policy ([`Validator`]).
//! - [`router`]: profile dispatch ([`Router`], [`ProfileHandler`]).
//! - [`error`]: the internal error-code set and its canonical `ERR_*`
//!   mapping.
//! - [`payload`]: per-profile payload message types and codecs.
//! - [`clock`]: injectable time source so validation and policy never read a
//!   global clock.
//!
//! # Rejection discipline
//!
//! Frame and envelope structure violations map to `INVALID_FRAME`; size-limit
//! violations discovered after structural decode map to `INVALID_ENVELOPE`.
//! Every rejection carries exactly one internal code, and every internal code
//! canonicalizes to exactly one public `ERR_*` code (see [`error`]).

pub mod clock;
pub mod envelope;
pub mod error;
pub mod framing;
pub mod limits;
pub mod payload;
pub mod profile;
pub mod router;
pub mod validate;
pub mod varint;
pub mod wire;

pub use clock::{Clock, ManualClock, SystemClock};
pub use envelope::{Envelope, Extension};
pub use error::{CanonicalCode, ErrorCode, ProtocolError, ProtocolResult};
pub use framing::{read_frame, write_frame, FrameCodec};
pub use limits::{
    Limits, DEFAULT_MAX_CLOCK_SKEW_MS, MAX_EXT_BYTES, MAX_FRAME_BYTES, MAX_MSG_ID_BYTES,
    MIN_MSG_ID_BYTES, PROTOCOL_VERSION,
};
pub use profile::{known_profiles, profile_name, supported_msg_types, ProfileId};
pub use router::{Correlation, ProfileHandler, RequestContext, Router};
pub use validate::Validator;
