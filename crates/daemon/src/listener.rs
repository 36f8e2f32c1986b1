// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane listener.
//!
//! Accepts TCP connections and serves each on its own task, so no
//! supervision operation ever blocks the accept loop. Slow transitions
//! (stop, recycle) are validated synchronously, then dispatched in the
//! background — the response acknowledges acceptance, not completion.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use goku_engine::{EngineError, ProcessSet, Registry};

use crate::protocol::{self, Request, Response, BUILD, DEFAULT_TIMEOUT, VERSION};

/// Shared daemon context for request handlers.
pub struct ListenCtx {
    pub registry: Arc<Registry>,
}

/// Accept loop over the control socket.
pub struct Listener {
    socket: TcpListener,
    ctx: Arc<ListenCtx>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

impl Listener {
    pub fn new(socket: TcpListener, ctx: Arc<ListenCtx>) -> Self {
        Self { socket, ctx }
    }

    /// Run until the socket dies, spawning a task per connection.
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
                                ) => debug!("client disconnected"),
                                ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
                                    warn!("connection timeout")
                                }
                                _ => error!("connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
    }
}

/// One request/response exchange per connection.
async fn handle_connection(stream: TcpStream, ctx: &ListenCtx) -> Result<(), ConnectionError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;

    if matches!(request, Request::List | Request::Version) {
        debug!(request = ?request, "received query");
    } else {
        info!(request = ?request, "received request");
    }

    let response = handle_request(request, ctx).await;
    debug!(response = ?response, "sending response");

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;
    Ok(())
}

/// Dispatch one control request onto the registry.
pub(crate) async fn handle_request(request: Request, ctx: &ListenCtx) -> Response {
    match request {
        Request::Version => Response::Version {
            version: VERSION.to_string(),
            build: BUILD.to_string(),
        },

        Request::List => Response::Sets {
            sets: ctx.registry.snapshots().await,
        },

        Request::Load { config } => match ctx.registry.load(&config).await {
            Ok(set) => Response::Set { set },
            Err(err) => reject(err),
        },

        Request::Start { name } => match find(ctx, &name).await {
            Ok(set) => match set.start().await {
                Ok(()) => Response::Ok,
                Err(err) => reject(err),
            },
            Err(err) => reject(err),
        },

        Request::Stop { name } => match find(ctx, &name).await {
            Ok(set) => {
                // validate the precondition here, run the slow sequence
                // detached
                if set.snapshot().await.active.is_none() {
                    return reject(EngineError::NotStarted);
                }
                tokio::spawn(async move {
                    if let Err(err) = set.stop().await {
                        error!(name = set.name(), error = %err, "stop failed");
                    }
                });
                Response::Ok
            }
            Err(err) => reject(err),
        },

        Request::Reload { name } => match find(ctx, &name).await {
            Ok(set) => match set.reload().await {
                Ok(()) => Response::Ok,
                Err(err) => reject(err),
            },
            Err(err) => reject(err),
        },

        Request::Recycle { name } => match find(ctx, &name).await {
            Ok(set) => {
                if set.snapshot().await.active.is_none() {
                    return reject(EngineError::NotStarted);
                }
                tokio::spawn(async move {
                    if let Err(err) = set.recycle().await {
                        error!(name = set.name(), error = %err, "recycle failed");
                    }
                });
                Response::Ok
            }
            Err(err) => reject(err),
        },
    }
}

async fn find(ctx: &ListenCtx, name: &str) -> Result<Arc<ProcessSet>, EngineError> {
    ctx.registry
        .find(name)
        .await
        .ok_or_else(|| EngineError::ProcessNotFound(name.to_string()))
}

fn reject(err: EngineError) -> Response {
    Response::Error {
        message: err.to_string(),
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
