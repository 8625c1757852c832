//! Raw-socket ICMP echo exchanges.
//!
//! Each exchange opens its own raw socket, sends one Echo Request, and waits
//! for a frame it can attribute to that request. Timeouts are ordinary
//! outcomes; only unexpected socket failures surface as errors.

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};

use crate::probe::icmp::{self, EchoPacket};
use crate::probe::ProbeError;

/// Default TTL for echo requests.
pub const DEFAULT_TTL: u32 = 64;

/// Default receive deadline for one echo exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Receive buffer size; comfortably holds any echo reply we send for.
const RECV_BUF_LEN: usize = 1024;

/// Outcome of a single echo exchange.
///
/// A timeout is a valid observation, not an error: callers match on the
/// variant instead of unwinding through an error path.
#[derive(Debug, Clone, PartialEq)]
pub enum EchoReply {
    /// A reply arrived from `addr` after `rtt`.
    Reply { addr: IpAddr, rtt: Duration },
    /// The deadline elapsed without an attributable reply.
    Timeout,
}

/// Resolve a host name or dotted quad to an IPv4 address.
pub fn resolve_ipv4(host: &str) -> Result<Ipv4Addr, ProbeError> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(ip);
    }
    let addrs = (host, 0u16)
        .to_socket_addrs()
        .map_err(|_| ProbeError::Resolve(host.to_string()))?;
    addrs
        .filter_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| ProbeError::Resolve(host.to_string()))
}

/// Send one Echo Request to `target` and wait for an attributable reply.
///
/// The raw ICMP socket is scoped to this call and closed on every exit path
/// when it drops. The socket receives a copy of all inbound ICMP traffic, so
/// frames that do not carry this call's identifier are skipped until the
/// deadline elapses.
pub fn send_echo(
    target: Ipv4Addr,
    ttl: u32,
    timeout: Duration,
    sequence: u16,
) -> Result<EchoReply, ProbeError> {
    let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4)).map_err(|e| {
        if e.kind() == ErrorKind::PermissionDenied {
            ProbeError::Permission(e)
        } else {
            ProbeError::Network(e)
        }
    })?;
    socket.set_ttl(ttl)?;
    socket.set_read_timeout(Some(timeout))?;
    // The raw fd has datagram semantics; the std wrapper gives us safe reads.
    let socket: UdpSocket = socket.into();

    let request = EchoPacket::request(sequence, icmp::DEFAULT_PAYLOAD_SIZE);
    socket.send_to(&request.to_bytes(), SocketAddrV4::new(target, 0))?;

    let start = Instant::now();
    let deadline = start + timeout;
    let mut buf = [0u8; RECV_BUF_LEN];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(EchoReply::Timeout);
        }
        socket.set_read_timeout(Some(remaining))?;
        match socket.recv_from(&mut buf) {
            Ok((len, from)) => {
                if frame_matches(&buf[..len], request.identifier) {
                    return Ok(EchoReply::Reply {
                        addr: from.ip(),
                        rtt: start.elapsed(),
                    });
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                return Ok(EchoReply::Timeout);
            }
            Err(e) => return Err(ProbeError::Network(e)),
        }
    }
}

/// Issue `count` sequential echo exchanges against `host`.
///
/// Each exchange opens and closes its own socket; there is no concurrency
/// between them. The first transport error aborts the invocation.
pub fn ping(
    host: &str,
    ttl: u32,
    timeout: Duration,
    sequence: u16,
    count: u32,
) -> Result<Vec<EchoReply>, ProbeError> {
    let target = resolve_ipv4(host)?;
    let mut replies = Vec::with_capacity(count as usize);
    for _ in 0..count {
        replies.push(send_echo(target, ttl, timeout, sequence)?);
    }
    Ok(replies)
}

/// Decide whether a received IP datagram answers the request with `identifier`.
///
/// Accepts an Echo Reply bearing our identifier, or a Time Exceeded /
/// Destination Unreachable notice whose quoted datagram carries it. A quote
/// too short to check is accepted, since those notices are what TTL probing
/// is after.
fn frame_matches(datagram: &[u8], identifier: u16) -> bool {
    let Some(frame) = strip_ip_header(datagram) else {
        return false;
    };
    let Some(packet) = EchoPacket::parse(frame) else {
        return false;
    };
    match packet.packet_type {
        icmp::ECHO_REPLY => packet.identifier == identifier,
        icmp::TIME_EXCEEDED | icmp::DEST_UNREACHABLE => {
            // The notice quotes the offending datagram after its header: the
            // original IP header followed by the leading bytes of our echo.
            match strip_ip_header(&packet.payload).and_then(EchoPacket::parse) {
                Some(quoted) => quoted.identifier == identifier,
                None => true,
            }
        }
        _ => false,
    }
}

/// Skip an IPv4 header, honoring its IHL field.
fn strip_ip_header(datagram: &[u8]) -> Option<&[u8]> {
    let ihl = usize::from(datagram.first()? & 0x0f) * 4;
    if ihl < 20 || datagram.len() < ihl {
        return None;
    }
    Some(&datagram[ihl..])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal IPv4 header (IHL = 5) in front of an ICMP frame.
    fn wrap_ip(frame: &[u8]) -> Vec<u8> {
        let mut datagram = vec![0u8; 20];
        datagram[0] = 0x45;
        datagram.extend_from_slice(frame);
        datagram
    }

    fn echo_frame(packet_type: u8, identifier: u16) -> Vec<u8> {
        let packet = EchoPacket {
            packet_type,
            code: 0,
            checksum: 0,
            identifier,
            sequence: 1,
            payload: Vec::new(),
        };
        packet.to_bytes()
    }

    #[test]
    fn test_resolve_dotted_quad() {
        assert_eq!(resolve_ipv4("127.0.0.1").unwrap(), Ipv4Addr::LOCALHOST);
    }

    #[test]
    fn test_resolve_unknown_host() {
        let err = resolve_ipv4("unreachable.invalid").unwrap_err();
        assert!(matches!(err, ProbeError::Resolve(_)));
    }

    #[test]
    fn test_frame_matches_echo_reply() {
        let datagram = wrap_ip(&echo_frame(icmp::ECHO_REPLY, 0x1234));
        assert!(frame_matches(&datagram, 0x1234));
        assert!(!frame_matches(&datagram, 0x4321));
    }

    #[test]
    fn test_frame_matches_time_exceeded_with_quote() {
        // Time Exceeded notice quoting our echo request.
        let quoted = wrap_ip(&echo_frame(icmp::ECHO_REQUEST, 0xbeef));
        let mut notice = vec![icmp::TIME_EXCEEDED, 0, 0, 0, 0, 0, 0, 0];
        notice.extend_from_slice(&quoted);
        let datagram = wrap_ip(&notice);

        assert!(frame_matches(&datagram, 0xbeef));
        assert!(!frame_matches(&datagram, 0x0001));
    }

    #[test]
    fn test_frame_matches_ignores_foreign_requests() {
        // Another process's echo request must not be read as our reply.
        let datagram = wrap_ip(&echo_frame(icmp::ECHO_REQUEST, 0x1234));
        assert!(!frame_matches(&datagram, 0x1234));
    }

    #[test]
    fn test_strip_ip_header_rejects_truncated() {
        assert!(strip_ip_header(&[0x45, 0, 0]).is_none());
        assert!(strip_ip_header(&[]).is_none());
    }

    #[test]
    fn test_send_echo_loopback() {
        // Raw sockets need elevated privileges; skip where unavailable.
        match send_echo(Ipv4Addr::LOCALHOST, DEFAULT_TTL, DEFAULT_TIMEOUT, 1) {
            Ok(EchoReply::Reply { addr, rtt }) => {
                assert_eq!(addr, IpAddr::V4(Ipv4Addr::LOCALHOST));
                assert!(rtt <= DEFAULT_TIMEOUT);
            }
            Ok(EchoReply::Timeout) => {
                // Loopback may legitimately drop ICMP in some sandboxes.
            }
            Err(ProbeError::Permission(_)) => {}
            Err(e) => panic!("unexpected probe error: {e}"),
        }
    }
}
