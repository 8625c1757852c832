//! Standard checker plugins for the probe catalogue.
//!
//! Each checker implements [`ProbeCheck`](crate::probe::ProbeCheck) with the
//! uniform contract: positional string arguments, one result mapping per
//! check. Unreachable targets and timeouts are encoded as `status: false`
//! fields in the mapping; only infrastructure failures surface as errors.

pub mod dns;
pub mod http;
pub mod ntp;
pub mod port;

pub use dns::DnsCheck;
pub use http::{HttpCheck, HttpsCheck};
pub use ntp::NtpCheck;
pub use port::{TcpPortCheck, UdpPortCheck};

use std::sync::Arc;
use std::time::Duration;

use crate::probe::{ProbeCatalogue, ProbeError};

/// Request timeout shared by the HTTP checkers.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a catalogue with every standard checker registered.
pub fn standard_catalogue() -> Result<ProbeCatalogue, ProbeError> {
    let client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| ProbeError::Internal(e.to_string()))?;

    let mut catalogue = ProbeCatalogue::new();
    catalogue.register(Arc::new(HttpCheck::new(client.clone())));
    catalogue.register(Arc::new(HttpsCheck::new(client)));
    catalogue.register(Arc::new(NtpCheck));
    catalogue.register(Arc::new(DnsCheck));
    catalogue.register(Arc::new(TcpPortCheck));
    catalogue.register(Arc::new(UdpPortCheck));
    Ok(catalogue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalogue_resolves_checkers() {
        let catalogue = standard_catalogue().unwrap();
        for (name, args) in [
            ("http", vec!["http://example.com".to_string()]),
            ("https", vec!["https://example.com".to_string()]),
            ("ntp", vec!["pool.ntp.org".to_string()]),
            (
                "dns",
                vec!["8.8.8.8".to_string(), "example.com".to_string(), "A".to_string()],
            ),
            ("tcp", vec!["127.0.0.1".to_string(), "22".to_string()]),
            ("udp", vec!["127.0.0.1".to_string(), "53".to_string()]),
        ] {
            catalogue
                .resolve(name, &args)
                .unwrap_or_else(|e| panic!("checker [{name}] failed to resolve: {e}"));
        }
    }
}
