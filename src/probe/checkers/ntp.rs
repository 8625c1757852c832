//! NTP server checker.
//!
//! Performs a minimal SNTP v3 client exchange: one 48-byte request, one
//! response, reading the server's transmit timestamp.

use std::time::Duration;

use chrono::DateTime;
use serde_json::{json, Value};
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::probe::catalogue::{CatalogueError, ProbeCheck, ResultMap};
use crate::probe::ProbeError;

const NTP_PORT: u16 = 123;
const NTP_TIMEOUT: Duration = Duration::from_secs(3);
const NTP_PACKET_LEN: usize = 48;
/// First request byte: LI = 0, version = 3, mode = 3 (client).
const NTP_CLIENT_HEADER: u8 = 0x1b;
/// Offset of the transmit timestamp within the response.
const NTP_TRANSMIT_OFFSET: usize = 40;
/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
const NTP_UNIX_EPOCH_OFFSET: i64 = 2_208_988_800;

/// SNTP checker: reports whether the server answered and its clock reading.
pub struct NtpCheck;

fn ntp_result(server: &str, status: bool, time: Value) -> ResultMap {
    let mut map = ResultMap::new();
    map.insert(server.to_string(), json!({ "status": status, "time": time }));
    map
}

#[async_trait::async_trait]
impl ProbeCheck for NtpCheck {
    fn name(&self) -> &'static str {
        "ntp"
    }

    fn validate(&self, args: &[String]) -> Result<(), CatalogueError> {
        if args.len() != 1 {
            return Err(CatalogueError::InvalidArguments {
                name: self.name().to_string(),
                reason: format!("expected [server], got {} argument(s)", args.len()),
            });
        }
        Ok(())
    }

    async fn check(&self, args: &[String]) -> Result<ResultMap, ProbeError> {
        let server = args[0].as_str();

        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let mut request = [0u8; NTP_PACKET_LEN];
        request[0] = NTP_CLIENT_HEADER;

        if let Err(e) = socket.send_to(&request, (server, NTP_PORT)).await {
            tracing::warn!(server = %server, error = %e, "NTP request failed");
            return Ok(ntp_result(server, false, Value::Null));
        }

        let mut response = [0u8; NTP_PACKET_LEN];
        let len = match timeout(NTP_TIMEOUT, socket.recv(&mut response)).await {
            Ok(Ok(len)) => len,
            Ok(Err(e)) => {
                tracing::warn!(server = %server, error = %e, "NTP receive failed");
                return Ok(ntp_result(server, false, Value::Null));
            }
            Err(_) => {
                tracing::warn!(server = %server, "NTP request timed out");
                return Ok(ntp_result(server, false, Value::Null));
            }
        };

        match transmit_time(&response[..len]) {
            Some(time) => Ok(ntp_result(server, true, json!(time))),
            None => Ok(ntp_result(server, false, Value::Null)),
        }
    }
}

/// Extract the transmit timestamp and render it at second precision.
fn transmit_time(response: &[u8]) -> Option<String> {
    if response.len() < NTP_TRANSMIT_OFFSET + 8 {
        return None;
    }
    let secs = u32::from_be_bytes([
        response[NTP_TRANSMIT_OFFSET],
        response[NTP_TRANSMIT_OFFSET + 1],
        response[NTP_TRANSMIT_OFFSET + 2],
        response[NTP_TRANSMIT_OFFSET + 3],
    ]);
    let unix_secs = i64::from(secs) - NTP_UNIX_EPOCH_OFFSET;
    let time = DateTime::from_timestamp(unix_secs, 0)?;
    Some(time.format("%Y-%m-%d %H:%M:%S").to_string())
}
