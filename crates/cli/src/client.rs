// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane client: one request/response exchange per connection.

use thiserror::Error;
use tokio::net::TcpStream;

use goku_core::ProcessSetSnapshot;
use goku_daemon::protocol::{self, ProtocolError, Request, Response, DEFAULT_TIMEOUT};

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot reach gokud at {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Rejected(String),

    #[error("unexpected response from daemon")]
    UnexpectedResponse,
}

/// Talks to `gokud` over its TCP control socket.
pub struct RpcClient {
    addr: String,
}

impl RpcClient {
    pub fn new(addr: String) -> Self {
        Self { addr }
    }

    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        let (mut reader, mut writer) = stream.into_split();

        let data = protocol::encode(request)?;
        tokio::time::timeout(DEFAULT_TIMEOUT, protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let bytes = tokio::time::timeout(DEFAULT_TIMEOUT, protocol::read_message(&mut reader))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        Ok(protocol::decode(&bytes)?)
    }

    async fn send_simple(&self, request: &Request) -> Result<(), ClientError> {
        match self.send(request).await? {
            Response::Ok => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn version(&self) -> Result<(String, String), ClientError> {
        match self.send(&Request::Version).await? {
            Response::Version { version, build } => Ok((version, build)),
            other => Self::reject(other),
        }
    }

    pub async fn list(&self) -> Result<Vec<ProcessSetSnapshot>, ClientError> {
        match self.send(&Request::List).await? {
            Response::Sets { sets } => Ok(sets),
            other => Self::reject(other),
        }
    }

    pub async fn load(&self, config: &str) -> Result<ProcessSetSnapshot, ClientError> {
        let request = Request::Load {
            config: config.to_string(),
        };
        match self.send(&request).await? {
            Response::Set { set } => Ok(set),
            other => Self::reject(other),
        }
    }

    pub async fn start(&self, name: &str) -> Result<(), ClientError> {
        self.send_simple(&Request::Start {
            name: name.to_string(),
        })
        .await
    }

    pub async fn stop(&self, name: &str) -> Result<(), ClientError> {
        self.send_simple(&Request::Stop {
            name: name.to_string(),
        })
        .await
    }

    pub async fn reload(&self, name: &str) -> Result<(), ClientError> {
        self.send_simple(&Request::Reload {
            name: name.to_string(),
        })
        .await
    }

    pub async fn recycle(&self, name: &str) -> Result<(), ClientError> {
        self.send_simple(&Request::Recycle {
            name: name.to_string(),
        })
        .await
    }

    fn reject<T>(response: Response) -> Result<T, ClientError> {
        match response {
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}
