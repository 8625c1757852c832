//! TCP and UDP port checkers.

use std::io::ErrorKind;
use std::time::Duration;

use serde_json::json;
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use crate::probe::catalogue::{CatalogueError, ProbeCheck, ResultMap};
use crate::probe::ProbeError;

/// Connection/receive deadline for port checks.
const PORT_TIMEOUT: Duration = Duration::from_secs(3);

fn validate_host_port(name: &str, args: &[String]) -> Result<(), CatalogueError> {
    if args.len() != 2 {
        return Err(CatalogueError::InvalidArguments {
            name: name.to_string(),
            reason: format!("expected [host, port], got {} argument(s)", args.len()),
        });
    }
    args[1]
        .parse::<u16>()
        .map_err(|_| CatalogueError::InvalidArguments {
            name: name.to_string(),
            reason: format!("port must be an integer in 0-65535, got [{}]", args[1]),
        })?;
    Ok(())
}

fn parse_port(args: &[String]) -> Result<u16, ProbeError> {
    args[1]
        .parse::<u16>()
        .map_err(|e| ProbeError::Internal(format!("port re-parse failed: {e}")))
}

fn port_result(host: &str, port: u16, status: bool, description: String) -> ResultMap {
    let mut map = ResultMap::new();
    map.insert(
        host.to_string(),
        json!({ "port": port, "status": status, "description": description }),
    );
    map
}

/// TCP connect checker: the port is open when a connection is accepted.
pub struct TcpPortCheck;

#[async_trait::async_trait]
impl ProbeCheck for TcpPortCheck {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn validate(&self, args: &[String]) -> Result<(), CatalogueError> {
        validate_host_port(self.name(), args)
    }

    async fn check(&self, args: &[String]) -> Result<ResultMap, ProbeError> {
        let host = args[0].as_str();
        let port = parse_port(args)?;

        let (status, description) =
            match timeout(PORT_TIMEOUT, TcpStream::connect((host, port))).await {
                Ok(Ok(_stream)) => (true, format!("Port {port} on {host} is open.")),
                Ok(Err(e)) => (
                    false,
                    format!("Port {port} on {host} is closed or not reachable: {e}"),
                ),
                Err(_) => (false, format!("Port {port} on {host} timed out.")),
            };

        Ok(port_result(host, port, status, description))
    }
}

/// UDP probe checker.
///
/// UDP is connectionless, so only a closed port is definite: an ICMP
/// port-unreachable surfaces as a refused receive on the connected socket.
/// Silence means open or filtered; an answering datagram means something is
/// listening.
pub struct UdpPortCheck;

#[async_trait::async_trait]
impl ProbeCheck for UdpPortCheck {
    fn name(&self) -> &'static str {
        "udp"
    }

    fn validate(&self, args: &[String]) -> Result<(), CatalogueError> {
        validate_host_port(self.name(), args)
    }

    async fn check(&self, args: &[String]) -> Result<ResultMap, ProbeError> {
        let host = args[0].as_str();
        let port = parse_port(args)?;

        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        if let Err(e) = socket.connect((host, port)).await {
            return Ok(port_result(
                host,
                port,
                false,
                format!("Failed to check UDP port {port} on {host}: {e}"),
            ));
        }
        if let Err(e) = socket.send(b"").await {
            return Ok(port_result(
                host,
                port,
                false,
                format!("Failed to check UDP port {port} on {host}: {e}"),
            ));
        }

        let mut buf = [0u8; 1024];
        let (status, description) = match timeout(PORT_TIMEOUT, socket.recv(&mut buf)).await {
            Ok(Ok(_)) => (true, format!("Port {port} on {host} responded.")),
            Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => {
                (false, format!("Port {port} on {host} is closed."))
            }
            Ok(Err(e)) => (
                false,
                format!("Failed to check UDP port {port} on {host}: {e}"),
            ),
            Err(_) => (
                true,
                format!("Port {port} on {host} is open or no response received."),
            ),
        };

        Ok(port_result(host, port, status, description))
    }
}
