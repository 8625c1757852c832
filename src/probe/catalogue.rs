//! Probe catalogue: name-to-probe resolution with add-time validation.
//!
//! The catalogue holds a closed set of built-in probes (`ping`,
//! `traceroute`) backed by the raw-packet engine, plus an open plugin table
//! of [`ProbeCheck`] implementations for the application and transport layer
//! checkers. Resolution validates the probe name and its positional
//! arguments once, when a task is added, never per iteration.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;

use crate::probe::ping::{self, EchoReply};
use crate::probe::traceroute;
use crate::probe::ProbeError;

/// A probe's result payload: string keys to JSON scalars and lists.
pub type ResultMap = serde_json::Map<String, Value>;

/// Errors raised while resolving a probe name against the catalogue.
#[derive(Debug, Error)]
pub enum CatalogueError {
    /// The probe name is neither a builtin nor a registered plugin.
    #[error("probe [{0}] is not supported")]
    UnsupportedProbe(String),

    /// The positional arguments do not match the probe's signature.
    #[error("invalid arguments for probe [{name}]: {reason}")]
    InvalidArguments { name: String, reason: String },
}

/// A pluggable checker with a uniform contract.
///
/// `validate` runs at registration/add time so a malformed configuration is
/// rejected before a task ever starts; `check` performs one diagnostic and
/// returns a result mapping. Checker-level failures (unreachable target,
/// timeout) are encoded inside the mapping, not as errors.
#[async_trait::async_trait]
pub trait ProbeCheck: Send + Sync {
    /// Catalogue key for this checker.
    fn name(&self) -> &'static str;

    /// Validate positional arguments against the checker's signature.
    fn validate(&self, args: &[String]) -> Result<(), CatalogueError>;

    /// Perform one check with pre-validated arguments.
    async fn check(&self, args: &[String]) -> Result<ResultMap, ProbeError>;
}

enum Bound {
    Ping { host: String, count: u32 },
    Traceroute { host: String, query_count: u32 },
    Plugin { check: Arc<dyn ProbeCheck>, args: Vec<String> },
}

/// A probe resolved and validated against the catalogue, ready to run.
pub struct BoundProbe {
    probe: String,
    bound: Bound,
}

impl BoundProbe {
    /// The catalogue name this probe was resolved from.
    pub fn probe_name(&self) -> &str {
        &self.probe
    }

    /// Execute one probe iteration.
    ///
    /// Builtins drive the blocking raw-socket engine under `spawn_blocking`.
    pub async fn run(&self) -> Result<ResultMap, ProbeError> {
        match &self.bound {
            Bound::Ping { host, count } => {
                let target = host.clone();
                let count = *count;
                let replies = tokio::task::spawn_blocking(move || {
                    ping::ping(&target, ping::DEFAULT_TTL, ping::DEFAULT_TIMEOUT, 1, count)
                })
                .await
                .map_err(|e| ProbeError::Internal(e.to_string()))??;

                let mut map = ResultMap::new();
                map.insert(host.clone(), ping_outcomes(&replies));
                Ok(map)
            }
            Bound::Traceroute { host, query_count } => {
                let target = host.clone();
                let query_count = *query_count;
                let hops = tokio::task::spawn_blocking(move || {
                    traceroute::traceroute(
                        &target,
                        traceroute::DEFAULT_MAX_HOPS,
                        traceroute::DEFAULT_PINGS_PER_HOP,
                        query_count,
                    )
                })
                .await
                .map_err(|e| ProbeError::Internal(e.to_string()))??;

                let mut map = ResultMap::new();
                map.insert(
                    host.clone(),
                    serde_json::to_value(hops).map_err(|e| ProbeError::Internal(e.to_string()))?,
                );
                Ok(map)
            }
            Bound::Plugin { check, args } => check.check(args).await,
        }
    }
}

impl std::fmt::Debug for BoundProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundProbe")
            .field("probe", &self.probe)
            .finish_non_exhaustive()
    }
}

fn ping_outcomes(replies: &[EchoReply]) -> Value {
    let outcomes: Vec<Value> = replies
        .iter()
        .map(|reply| match reply {
            EchoReply::Reply { addr, rtt } => json!({
                "query": addr.to_string(),
                "time_ms": rtt.as_secs_f64() * 1000.0,
            }),
            EchoReply::Timeout => json!({
                "error": "request timed out or no reply received",
            }),
        })
        .collect();
    Value::Array(outcomes)
}

/// Name-to-probe table consulted when tasks are added.
#[derive(Default)]
pub struct ProbeCatalogue {
    plugins: HashMap<&'static str, Arc<dyn ProbeCheck>>,
}

impl ProbeCatalogue {
    /// An empty catalogue with only the builtins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin checker under its own name.
    ///
    /// A plugin cannot shadow the builtins; `resolve` consults those first.
    pub fn register(&mut self, check: Arc<dyn ProbeCheck>) {
        self.plugins.insert(check.name(), check);
    }

    /// Resolve a probe name and validate its arguments.
    pub fn resolve(&self, name: &str, args: &[String]) -> Result<BoundProbe, CatalogueError> {
        let bound = match name {
            "ping" => {
                let (host, count) = host_and_count(name, args, "count")?;
                Bound::Ping { host, count }
            }
            "traceroute" => {
                let (host, query_count) = host_and_count(name, args, "query_count")?;
                Bound::Traceroute { host, query_count }
            }
            other => {
                let check = self
                    .plugins
                    .get(other)
                    .ok_or_else(|| CatalogueError::UnsupportedProbe(other.to_string()))?;
                check.validate(args)?;
                Bound::Plugin {
                    check: Arc::clone(check),
                    args: args.to_vec(),
                }
            }
        };
        Ok(BoundProbe {
            probe: name.to_string(),
            bound,
        })
    }
}

impl std::fmt::Debug for ProbeCatalogue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeCatalogue")
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Shared `[host, <positive integer>]` signature of the builtins.
fn host_and_count(
    name: &str,
    args: &[String],
    count_field: &str,
) -> Result<(String, u32), CatalogueError> {
    if args.len() != 2 {
        return Err(CatalogueError::InvalidArguments {
            name: name.to_string(),
            reason: format!("expected [host, {count_field}], got {} argument(s)", args.len()),
        });
    }
    let count: u32 = args[1]
        .parse()
        .ok()
        .filter(|c| *c > 0)
        .ok_or_else(|| CatalogueError::InvalidArguments {
            name: name.to_string(),
            reason: format!("{count_field} must be a positive integer, got [{}]", args[1]),
        })?;
    Ok((args[0].clone(), count))
}
