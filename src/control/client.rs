//! Management client for the control plane.
//!
//! Issues request frames and recovers from transport loss with exponential
//! backoff. The interactive UI around it is out of scope; this is the
//! connection-handling core it would sit on.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::control::protocol::{Request, Response, MAX_FRAME_LEN};

/// Default number of connection attempts before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Client-side control-channel failures.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport dropped mid-exchange.
    #[error("connection lost: {0}")]
    ConnectionLost(#[source] std::io::Error),

    /// Every backoff attempt failed; fatal and user-visible.
    #[error("failed to connect after {attempts} attempt(s)")]
    RetriesExhausted { attempts: u32 },

    /// The peer sent an undecodable frame.
    #[error("malformed response frame: {0}")]
    Protocol(#[from] serde_json::Error),
}

/// A control-plane client with reconnect-and-retry semantics.
pub struct ControlClient {
    addr: SocketAddr,
    stream: Option<TcpStream>,
    max_retries: u32,
}

impl ControlClient {
    /// Create a client for the given server address.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            stream: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the connection attempt limit.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Establish a connection, waiting `2^attempt` seconds between failures.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        let mut attempt: u32 = 0;
        while attempt < self.max_retries {
            match TcpStream::connect(self.addr).await {
                Ok(stream) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::debug!(error = %e, "Failed to set nodelay");
                    }
                    tracing::info!(addr = %self.addr, "Connected to control plane");
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) => {
                    let wait = Duration::from_secs(1u64 << attempt.min(16));
                    tracing::warn!(
                        attempt = attempt + 1,
                        error = %e,
                        wait_secs = wait.as_secs(),
                        "Connection attempt failed"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
        Err(ClientError::RetriesExhausted {
            attempts: self.max_retries,
        })
    }

    /// Send one request and read its acknowledgement.
    ///
    /// On transport loss the client reconnects with backoff and retries the
    /// send once; a second loss (or exhausted retries) surfaces to the
    /// caller.
    pub async fn request(&mut self, request: &Request) -> Result<Response, ClientError> {
        match self.try_request(request).await {
            Ok(response) => Ok(response),
            Err(ClientError::ConnectionLost(e)) => {
                tracing::warn!(error = %e, "Connection lost, attempting to reconnect");
                self.stream = None;
                self.connect().await?;
                self.try_request(request).await
            }
            Err(e) => Err(e),
        }
    }

    async fn try_request(&mut self, request: &Request) -> Result<Response, ClientError> {
        let payload = serde_json::to_vec(request)?;
        let stream = self.stream.as_mut().ok_or_else(|| {
            ClientError::ConnectionLost(std::io::Error::new(
                ErrorKind::NotConnected,
                "not connected",
            ))
        })?;

        stream
            .write_all(&payload)
            .await
            .map_err(ClientError::ConnectionLost)?;

        let mut buf = vec![0u8; MAX_FRAME_LEN];
        let len = stream
            .read(&mut buf)
            .await
            .map_err(ClientError::ConnectionLost)?;
        if len == 0 {
            self.stream = None;
            return Err(ClientError::ConnectionLost(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                "server closed the connection",
            )));
        }

        Ok(serde_json::from_slice(&buf[..len])?)
    }
}

impl std::fmt::Debug for ControlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlClient")
            .field("addr", &self.addr)
            .field("connected", &self.stream.is_some())
            .finish()
    }
}
