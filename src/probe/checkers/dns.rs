//! DNS record checker backed by a caller-chosen name server.

use std::net::IpAddr;
use std::str::FromStr;

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;
use serde_json::json;

use crate::probe::catalogue::{CatalogueError, ProbeCheck, ResultMap};
use crate::probe::ProbeError;

/// Queries `[server, domain, record_type]` against the given name server.
pub struct DnsCheck;

impl DnsCheck {
    fn parse_args(&self, args: &[String]) -> Result<(IpAddr, RecordType), CatalogueError> {
        if args.len() != 3 {
            return Err(CatalogueError::InvalidArguments {
                name: self.name().to_string(),
                reason: format!(
                    "expected [server, domain, record_type], got {} argument(s)",
                    args.len()
                ),
            });
        }
        let server: IpAddr = args[0]
            .parse()
            .map_err(|_| CatalogueError::InvalidArguments {
                name: self.name().to_string(),
                reason: format!("server must be an IP address, got [{}]", args[0]),
            })?;
        let record_type = RecordType::from_str(&args[2].to_uppercase()).map_err(|_| {
            CatalogueError::InvalidArguments {
                name: self.name().to_string(),
                reason: format!("unknown record type [{}]", args[2]),
            }
        })?;
        Ok((server, record_type))
    }
}

#[async_trait::async_trait]
impl ProbeCheck for DnsCheck {
    fn name(&self) -> &'static str {
        "dns"
    }

    fn validate(&self, args: &[String]) -> Result<(), CatalogueError> {
        self.parse_args(args).map(|_| ())
    }

    async fn check(&self, args: &[String]) -> Result<ResultMap, ProbeError> {
        let (server, record_type) = self
            .parse_args(args)
            .map_err(|e| ProbeError::Internal(e.to_string()))?;
        let domain = args[1].as_str();

        let name_servers = NameServerConfigGroup::from_ips_clear(&[server], 53, true);
        let config = ResolverConfig::from_parts(None, Vec::new(), name_servers);
        let resolver = TokioAsyncResolver::tokio(config, ResolverOpts::default());

        let (status, query_results) = match resolver.lookup(domain, record_type).await {
            Ok(lookup) => {
                let records: Vec<String> = lookup.iter().map(|r| r.to_string()).collect();
                (true, json!(records))
            }
            Err(e) => {
                tracing::warn!(domain = %domain, server = %server, error = %e, "DNS check failed");
                (false, json!(e.to_string()))
            }
        };

        let mut map = ResultMap::new();
        map.insert(
            format!("{domain}_{server}_{record_type}", record_type = args[2]),
            json!({ "status": status, "query_results": query_results }),
        );
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_validate_accepts_standard_query() {
        let check = DnsCheck;
        assert!(check
            .validate(&args(&["8.8.8.8", "www.example.com", "A"]))
            .is_ok());
        assert!(check
            .validate(&args(&["2001:4860:4860::8888", "example.com", "aaaa"]))
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_server_or_type() {
        let check = DnsCheck;
        assert!(check
            .validate(&args(&["not-an-ip", "example.com", "A"]))
            .is_err());
        assert!(check
            .validate(&args(&["8.8.8.8", "example.com", "BOGUS"]))
            .is_err());
        assert!(check.validate(&args(&["8.8.8.8"])).is_err());
    }
}
