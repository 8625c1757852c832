//! ICMP echo frame construction.
//!
//! Builds the byte-exact ICMP Echo Request frames the probe engine sends and
//! interprets the replies it receives. The checksum is the standard RFC 1071
//! ones'-complement sum over 16-bit big-endian words.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::Rng;

/// ICMP message type for an Echo Request.
pub const ECHO_REQUEST: u8 = 8;
/// ICMP message type for an Echo Reply.
pub const ECHO_REPLY: u8 = 0;
/// ICMP message type for Destination Unreachable.
pub const DEST_UNREACHABLE: u8 = 3;
/// ICMP message type for Time Exceeded (elicited by expired TTLs).
pub const TIME_EXCEEDED: u8 = 11;

/// Length of the ICMP header (type, code, checksum, identifier, sequence).
pub const HEADER_LEN: usize = 8;

/// Default echo payload size in bytes.
pub const DEFAULT_PAYLOAD_SIZE: usize = 192;

/// Compute the RFC 1071 internet checksum over `data`.
///
/// Sums the input as 16-bit big-endian words, folds any carry back into the
/// low 16 bits, and complements the result. An odd trailing byte is treated
/// as the high byte of a zero-padded final word.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let Some(&last) = chunks.remainder().first() {
        sum += u32::from(last) << 8;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

/// Derive the 16-bit echo identifier for the current execution context.
///
/// Hashes the process id together with the current thread id, so replies can
/// be attributed to the issuing probe call. Stable for the lifetime of one
/// call; not globally unique across processes.
pub fn echo_identifier() -> u16 {
    let mut hasher = DefaultHasher::new();
    std::process::id().hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);
    (hasher.finish() & 0xffff) as u16
}

/// A decoded ICMP echo frame.
///
/// Used both to build outgoing Echo Requests and to interpret the echo
/// portion of received frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoPacket {
    pub packet_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
    pub payload: Vec<u8>,
}

impl EchoPacket {
    /// Build an Echo Request with the given sequence number and payload size.
    ///
    /// The payload is a single random alphanumeric byte repeated
    /// `payload_size` times. The checksum is computed over the full frame
    /// with the checksum field zeroed, then inserted in network byte order.
    pub fn request(sequence: u16, payload_size: usize) -> Self {
        let filler = rand::thread_rng().sample(rand::distributions::Alphanumeric);
        let payload = vec![filler; payload_size];

        let mut packet = Self {
            packet_type: ECHO_REQUEST,
            code: 0,
            checksum: 0,
            identifier: echo_identifier(),
            sequence,
            payload,
        };
        packet.checksum = checksum(&packet.to_bytes());
        packet
    }

    /// Serialize the frame: 8-byte header followed by the payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.payload.len());
        bytes.push(self.packet_type);
        bytes.push(self.code);
        bytes.extend_from_slice(&self.checksum.to_be_bytes());
        bytes.extend_from_slice(&self.identifier.to_be_bytes());
        bytes.extend_from_slice(&self.sequence.to_be_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Decode an ICMP frame from raw bytes, if long enough to carry a header.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        Some(Self {
            packet_type: bytes[0],
            code: bytes[1],
            checksum: u16::from_be_bytes([bytes[2], bytes[3]]),
            identifier: u16::from_be_bytes([bytes[4], bytes[5]]),
            sequence: u16::from_be_bytes([bytes[6], bytes[7]]),
            payload: bytes[HEADER_LEN..].to_vec(),
        })
    }
}
