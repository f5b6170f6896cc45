// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The Listener runs in a spawned task, accepting connections and handing
//! each request to the engine on its own task, so a long image build never
//! blocks other clients.

mod simulators;
mod workspaces;

use std::sync::Arc;
use std::time::Instant;

use sim_adapters::RuntimeAdapter;
use sim_engine::{EngineError, Orchestrator};
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::protocol::{self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// Listener task for accepting socket connections.
pub struct Listener<R> {
    socket: UnixListener,
    ctx: Arc<ListenCtx<R>>,
}

/// Shared state every connection handler needs.
pub struct ListenCtx<R> {
    pub engine: Arc<Orchestrator<R>>,
    pub start_time: Instant,
    pub shutdown: Arc<Notify>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

impl<R: RuntimeAdapter> Listener<R> {
    pub fn new(socket: UnixListener, ctx: ListenCtx<R>) -> Self {
        Self {
            socket,
            ctx: Arc::new(ctx),
        }
    }

    /// Run the listener loop until shutdown, spawning tasks for each connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &ctx).await {
                            match e {
                                ConnectionError::Protocol(
                                    protocol::ProtocolError::ConnectionClosed,
                                ) => debug!("Client disconnected"),
                                ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
                                    warn!("Connection timeout")
                                }
                                _ => error!("Connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection<R: RuntimeAdapter>(
    stream: UnixStream,
    ctx: &ListenCtx<R>,
) -> Result<(), ConnectionError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;

    // Polling requests at debug level, everything else at info
    if is_poll(&request) {
        debug!(request = ?request, "received query");
    } else {
        info!(request = ?request, "received request");
    }

    let response = handle_request(request, ctx).await;

    debug!("Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;

    Ok(())
}

fn is_poll(request: &Request) -> bool {
    matches!(
        request,
        Request::Ping
            | Request::Hello { .. }
            | Request::Status
            | Request::SimulatorStatus { .. }
            | Request::ListWorkspaces
            | Request::GetWorkspace { .. }
    )
}

/// Handle a single request and return a response.
pub(crate) async fn handle_request<R: RuntimeAdapter>(
    request: Request,
    ctx: &ListenCtx<R>,
) -> Response {
    let engine = ctx.engine.as_ref();
    let result = match request {
        Request::Ping => Ok(Response::Pong),

        Request::Hello { version } => {
            if version != PROTOCOL_VERSION {
                warn!(client = %version, daemon = PROTOCOL_VERSION, "client version mismatch");
            }
            Ok(Response::Hello {
                version: PROTOCOL_VERSION.to_string(),
            })
        }

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Ok(Response::ShuttingDown)
        }

        Request::Status => Ok(handle_status(ctx)),

        Request::CreateWorkspace { name, display_name } => {
            workspaces::handle_create(engine, &name, display_name.as_deref())
        }

        Request::ListWorkspaces => Ok(workspaces::handle_list(engine)),

        Request::GetWorkspace { name } => workspaces::handle_get(engine, &name),

        Request::RenameWorkspace { name, display_name } => {
            workspaces::handle_rename(engine, &name, &display_name)
        }

        Request::DeleteWorkspace { name } => workspaces::handle_delete(engine, &name).await,

        Request::AddVersion {
            workspace,
            source,
            kind,
            name,
        } => workspaces::handle_add_version(engine, &workspace, &source, kind, name.as_deref()),

        Request::DeleteVersion { workspace, version } => {
            workspaces::handle_delete_version(engine, &workspace, &version).await
        }

        Request::Start { workspace, version } => {
            simulators::handle_start(engine, &workspace, &version).await
        }

        Request::Stop { workspace, version } => engine
            .stop(&workspace, &version)
            .await
            .map(|()| Response::Ok),

        Request::SimulatorStatus { workspace, version } => {
            simulators::handle_status(engine, &workspace, &version).await
        }

        Request::Kubeconfig { workspace, version } => {
            simulators::handle_kubeconfig(engine, &workspace, &version).await
        }

        Request::Clean { scope } => return simulators::handle_clean(engine, &scope).await,

        Request::Instances => simulators::handle_instances(engine).await,

        Request::Kubectl { workspace, args } => {
            simulators::handle_kubectl(engine, &workspace, &args).await
        }
    };

    result.unwrap_or_else(|e| error_response(&e))
}

fn handle_status<R: RuntimeAdapter>(ctx: &ListenCtx<R>) -> Response {
    let workspaces = ctx.engine.list_workspaces();
    Response::Status {
        uptime_secs: ctx.start_time.elapsed().as_secs(),
        workspaces: workspaces.len(),
        versions: workspaces.iter().map(|w| w.versions.len()).sum(),
        monitors_active: ctx.engine.lifecycle().monitors().active_count(),
    }
}

fn error_response(e: &EngineError) -> Response {
    debug!(error = %e, "request failed");
    Response::Error {
        message: e.to_string(),
    }
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
