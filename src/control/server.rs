//! Control-plane TCP server.
//!
//! One task owns the listening socket and every accepted client connection,
//! multiplexing accept-readiness against client readability in a single
//! `select!` loop. Dispatch runs inline in that loop, so management
//! operations are observed in the order they arrive, exactly as a
//! single-threaded readiness poll would order them. A blocking `stop_task`
//! therefore stalls the loop for at most one probe call plus a frequency
//! sleep.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::select_all;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::control::protocol::{Action, Request, Response, MAX_FRAME_LEN};
use crate::probe::ProbeCatalogue;
use crate::scheduler::{TaskRegistry, TaskSpec};

/// The control-plane server: listener, clients, and dispatch targets.
pub struct ControlServer {
    listener: TcpListener,
    registry: Arc<TaskRegistry>,
    catalogue: Arc<ProbeCatalogue>,
}

impl ControlServer {
    /// Bind the control listener.
    pub async fn bind(
        addr: SocketAddr,
        registry: Arc<TaskRegistry>,
        catalogue: Arc<ProbeCatalogue>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "Control plane listening");
        Ok(Self {
            listener,
            registry,
            catalogue,
        })
    }

    /// The bound address (useful when binding port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept-and-dispatch loop. Never returns under normal
    /// operation; per-connection failures only ever close that connection.
    pub async fn run(self) {
        let mut clients: Vec<TcpStream> = Vec::new();

        loop {
            // All pending reads drop before the event is handled, releasing
            // their borrows of the client set.
            let event = tokio::select! {
                accepted = self.listener.accept() => Event::Accepted(accepted),
                (index, outcome) = next_ready(&mut clients) => Event::Frame(index, outcome),
            };

            match event {
                Event::Accepted(Ok((stream, peer))) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::debug!(peer = %peer, error = %e, "Failed to set nodelay");
                    }
                    tracing::info!(peer = %peer, "Client connected");
                    clients.push(stream);
                }
                Event::Accepted(Err(e)) => {
                    tracing::warn!(error = %e, "Accept failed");
                }
                Event::Frame(index, Ok(frame)) if frame.is_empty() => {
                    tracing::info!("Client disconnected");
                    drop(clients.swap_remove(index));
                }
                Event::Frame(index, Ok(frame)) => {
                    self.handle_frame(&mut clients, index, &frame).await;
                }
                Event::Frame(index, Err(e)) => {
                    tracing::warn!(error = %e, "Client read failed, closing connection");
                    drop(clients.swap_remove(index));
                }
            }
        }
    }

    /// Decode and dispatch one frame, answering on the originating socket.
    ///
    /// An undecodable frame closes that connection alone; a decodable but
    /// unsupported request keeps it open and answers with a structured
    /// error. Response write failures are logged only.
    async fn handle_frame(&self, clients: &mut Vec<TcpStream>, index: usize, frame: &[u8]) {
        let request: Request = match serde_json::from_slice(frame) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Undecodable frame, closing connection");
                drop(clients.swap_remove(index));
                return;
            }
        };

        let response = self.dispatch(request).await;
        match serde_json::to_vec(&response) {
            Ok(payload) => {
                if let Err(e) = clients[index].write_all(&payload).await {
                    tracing::warn!(error = %e, "Failed to send response");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode response");
            }
        }
    }

    async fn dispatch(&self, request: Request) -> Response {
        let service_id = request.service_id.clone();
        let Ok(action) = Action::from_str(&request.action) else {
            tracing::warn!(action = %request.action, "Unsupported action");
            return Response::error(
                &request.action,
                format!("Action [{}] is not supported.", request.action),
            );
        };

        let outcome = match action {
            Action::AddTask => self.add_task(request).await,
            Action::PauseTask => self
                .registry
                .pause(&service_id)
                .await
                .map_err(|e| e.to_string()),
            Action::ResumeTask => self
                .registry
                .resume(&service_id)
                .await
                .map_err(|e| e.to_string()),
            Action::StopTask => self
                .registry
                .stop(&service_id)
                .await
                .map_err(|e| e.to_string()),
        };

        match outcome {
            Ok(()) => Response::processed(action.as_ref(), &service_id),
            Err(message) => {
                tracing::warn!(action = %action, service_id = %service_id, %message, "Dispatch failed");
                Response::error(action.as_ref(), message)
            }
        }
    }

    async fn add_task(&self, request: Request) -> Result<(), String> {
        if request.service_id.is_empty() {
            return Err("service_id must not be empty".to_string());
        }
        let task = request
            .task
            .ok_or_else(|| "add_task requires a [task] field".to_string())?;
        let frequency = request
            .frequency
            .filter(|f| *f > 0)
            .ok_or_else(|| "frequency must be a positive integer".to_string())?;
        let configuration = request.configuration.unwrap_or_default();

        let probe = self
            .catalogue
            .resolve(&task, &configuration)
            .map_err(|e| e.to_string())?;
        self.registry
            .add(
                &request.service_id,
                probe,
                TaskSpec {
                    probe: task,
                    frequency,
                    configuration,
                },
            )
            .await
            .map_err(|e| e.to_string())
    }
}

/// One readiness outcome from the multiplexed loop.
enum Event {
    Accepted(std::io::Result<(TcpStream, SocketAddr)>),
    Frame(usize, std::io::Result<Vec<u8>>),
}

/// Resolve to the first client with readable data (or a read error).
///
/// Pends forever while no clients are connected, letting the accept branch
/// drive the loop. Each pending read is dropped when another branch wins;
/// tokio reads are cancel-safe, so no client data is lost.
async fn next_ready(clients: &mut [TcpStream]) -> (usize, std::io::Result<Vec<u8>>) {
    if clients.is_empty() {
        return std::future::pending().await;
    }

    let reads = clients.iter_mut().enumerate().map(|(index, stream)| {
        Box::pin(async move {
            let mut buf = vec![0u8; MAX_FRAME_LEN];
            match stream.read(&mut buf).await {
                Ok(len) => {
                    buf.truncate(len);
                    (index, Ok(buf))
                }
                Err(e) => (index, Err(e)),
            }
        })
    });

    let (ready, _, _) = select_all(reads).await;
    ready
}
