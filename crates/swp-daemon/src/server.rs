//! TCP server and per-connection worker.
//!
//! One task per accepted connection; within a connection, frames are
//! processed strictly serially and every reply for frame N is flushed
//! before frame N+1 is read. The worker closes the connection on any
//! framing, validation, policy, or handler failure — a peer that violates
//! the protocol is not negotiated with. Cancellation stops each worker
//! after the frame it is processing.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use swp_core::{
    Clock, Envelope, FrameCodec, Limits, RequestContext, Router, SystemClock, Validator,
};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backends::RuntimeBackends;
use crate::conn_policy::ConnPolicy;
use crate::handlers::build_router;

/// Server construction parameters.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address; use port 0 for an ephemeral port in tests.
    pub bind_addr: SocketAddr,
    /// Frame/envelope size limits.
    pub limits: Limits,
    /// Enforce timestamp freshness on inbound envelopes.
    pub enforce_timestamp: bool,
    /// Accept a zero producer timestamp when freshness is enforced.
    pub allow_zero_ts: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7411".parse().expect("static addr"),
            limits: Limits::default(),
            enforce_timestamp: false,
            allow_zero_ts: true,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

/// The protocol server: listener plus the immutable dispatch stack.
pub struct ProtocolServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    shared: Arc<ConnectionShared>,
}

/// State shared by all connection workers; immutable after construction.
struct ConnectionShared {
    limits: Limits,
    validator: Validator,
    router: Router,
    backends: RuntimeBackends,
    clock: Arc<dyn Clock>,
}

impl ProtocolServer {
    /// Binds a server with default backends and the system clock.
    ///
    /// # Errors
    ///
    /// Socket bind failures.
    pub async fn bind(config: ServerConfig) -> std::io::Result<Self> {
        Self::bind_with(config, RuntimeBackends::default(), Arc::new(SystemClock)).await
    }

    /// Binds a server with injected backends and clock.
    ///
    /// # Errors
    ///
    /// Socket bind failures.
    pub async fn bind_with(
        config: ServerConfig,
        backends: RuntimeBackends,
        clock: Arc<dyn Clock>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let local_addr = listener.local_addr()?;

        let mut validator = Validator::default().with_clock(Arc::clone(&clock));
        validator.limits = config.limits;
        validator.enforce_timestamp = config.enforce_timestamp;
        validator.allow_zero_ts = config.allow_zero_ts;

        let router = build_router(&backends, Arc::clone(&clock));
        info!(%local_addr, profiles = ?router.profile_ids(), "swp server listening");

        Ok(Self {
            listener,
            local_addr,
            shared: Arc::new(ConnectionShared {
                limits: config.limits,
                validator,
                router,
                backends,
                clock,
            }),
        })
    }

    /// The bound address (useful with an ephemeral port).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until the token is cancelled.
    ///
    /// # Errors
    ///
    /// Accept failures other than cancellation.
    pub async fn serve(self, cancel: CancellationToken) -> std::io::Result<()> {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("server shutdown requested");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    let shared = Arc::clone(&self.shared);
                    let conn_cancel = cancel.child_token();
                    tokio::spawn(async move {
                        handle_connection(stream, peer, shared, conn_cancel).await;
                    });
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    shared: Arc<ConnectionShared>,
    cancel: CancellationToken,
) {
    debug!(%peer, "connection accepted");
    let codec = FrameCodec::with_max_frame_bytes(shared.limits.max_frame_bytes);
    let mut framed = Framed::new(stream, codec);
    let mut policy = ConnPolicy::new(shared.clock.now_instant());

    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => {
                debug!(%peer, "connection worker cancelled");
                return;
            }
            frame = framed.next() => frame,
        };

        let frame = match frame {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => {
                warn!(%peer, %err, "read frame error");
                return;
            }
            None => {
                debug!(%peer, "connection closed by peer");
                return;
            }
        };

        let envelope = match Envelope::decode(&frame, &shared.limits) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(%peer, %err, "decode envelope error");
                return;
            }
        };

        if let Err(err) = shared.validator.validate(&envelope) {
            warn!(%peer, %err, "validate envelope error");
            return;
        }

        if let Err(violation) = policy.check(shared.clock.now_instant(), &envelope.msg_id) {
            warn!(%peer, %violation, "connection policy violation");
            return;
        }

        let doc = shared.backends.obs.get_doc();
        let ctx = RequestContext {
            profile_id: envelope.profile_id,
            msg_id: envelope.msg_id.clone(),
            correlation: swp_core::Correlation {
                traceparent: doc.traceparent,
                tracestate: doc.tracestate,
                msg_id: doc.msg_id,
                task_id: doc.task_id,
                rpc_id: doc.rpc_id,
            },
        };

        let replies = match shared.router.dispatch(&ctx, &envelope) {
            Ok(replies) => replies,
            Err(err) => {
                warn!(%peer, %err, "dispatch error");
                return;
            }
        };

        // Flush every reply for this frame before reading the next one.
        for reply in replies {
            let body = reply.encode();
            if let Err(err) = framed.send(Bytes::from(body)).await {
                warn!(%peer, %err, "write response error");
                return;
            }
        }
    }
}
