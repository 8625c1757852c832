//! TTL-escalating traceroute built on the echo exchange.

use std::net::IpAddr;
use std::time::Duration;

use serde::Serialize;

use crate::probe::ping::{resolve_ipv4, send_echo, EchoReply, DEFAULT_TIMEOUT};
use crate::probe::ProbeError;

/// Default hop ceiling.
pub const DEFAULT_MAX_HOPS: u8 = 30;

/// Default number of echo batches per hop.
pub const DEFAULT_PINGS_PER_HOP: u32 = 1;

/// Aggregated observations for one TTL value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TracerouteHop {
    /// 1-based TTL of this hop; rows are contiguous.
    pub ttl: u8,
    /// Replying address, or `None` when the hop stayed silent.
    pub address: Option<IpAddr>,
    pub min_ms: Option<f64>,
    pub avg_ms: Option<f64>,
    pub max_ms: Option<f64>,
    /// Successful samples out of `sent` attempts.
    pub received: u32,
    pub sent: u32,
}

/// Walk toward `host`, recording one row per TTL.
///
/// Each hop sends `pings_per_hop` batches of `query_count` echoes with the
/// sequence number set to the TTL. The scan stops inclusively once a hop's
/// replying address equals the resolved target; a hop with no replies is
/// recorded with a `None` address and the scan continues.
pub fn traceroute(
    host: &str,
    max_hops: u8,
    pings_per_hop: u32,
    query_count: u32,
) -> Result<Vec<TracerouteHop>, ProbeError> {
    let target = resolve_ipv4(host)?;
    let mut hops = Vec::new();

    for ttl in 1..=max_hops.max(1) {
        // Hop-scoped: a silent hop must never inherit an earlier address.
        let mut hop_addr: Option<IpAddr> = None;
        let mut samples: Vec<f64> = Vec::new();
        let sent = pings_per_hop * query_count;

        for _ in 0..pings_per_hop {
            for _ in 0..query_count {
                match send_echo(target, u32::from(ttl), DEFAULT_TIMEOUT, u16::from(ttl))? {
                    EchoReply::Reply { addr, rtt } => {
                        samples.push(rtt_millis(rtt));
                        hop_addr = Some(addr);
                    }
                    EchoReply::Timeout => {}
                }
            }
        }

        hops.push(summarize_hop(ttl, hop_addr, &samples, sent));

        if hop_addr == Some(IpAddr::V4(target)) {
            break;
        }
    }

    Ok(hops)
}

fn rtt_millis(rtt: Duration) -> f64 {
    rtt.as_secs_f64() * 1000.0
}

/// Fold one hop's samples into a row.
fn summarize_hop(ttl: u8, address: Option<IpAddr>, samples: &[f64], sent: u32) -> TracerouteHop {
    if samples.is_empty() {
        return TracerouteHop {
            ttl,
            address,
            min_ms: None,
            avg_ms: None,
            max_ms: None,
            received: 0,
            sent,
        };
    }
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = samples.iter().sum::<f64>() / samples.len() as f64;
    TracerouteHop {
        ttl,
        address,
        min_ms: Some(min),
        avg_ms: Some(avg),
        max_ms: Some(max),
        received: samples.len() as u32,
        sent,
    }
}
