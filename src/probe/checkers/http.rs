//! HTTP and HTTPS endpoint checkers.

use reqwest::{Client, Url};
use serde_json::{json, Value};

use crate::probe::catalogue::{CatalogueError, ProbeCheck, ResultMap};
use crate::probe::ProbeError;

fn validate_url(name: &str, args: &[String], scheme: &str) -> Result<(), CatalogueError> {
    if args.len() != 1 {
        return Err(CatalogueError::InvalidArguments {
            name: name.to_string(),
            reason: format!("expected [url], got {} argument(s)", args.len()),
        });
    }
    let url = Url::parse(&args[0]).map_err(|e| CatalogueError::InvalidArguments {
        name: name.to_string(),
        reason: format!("invalid url [{}]: {e}", args[0]),
    })?;
    if url.scheme() != scheme {
        return Err(CatalogueError::InvalidArguments {
            name: name.to_string(),
            reason: format!("url must use the {scheme} scheme, got [{}]", url.scheme()),
        });
    }
    Ok(())
}

/// Plain HTTP checker: GET the URL, report reachability and status code.
pub struct HttpCheck {
    client: Client,
}

impl HttpCheck {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ProbeCheck for HttpCheck {
    fn name(&self) -> &'static str {
        "http"
    }

    fn validate(&self, args: &[String]) -> Result<(), CatalogueError> {
        validate_url(self.name(), args, "http")
    }

    async fn check(&self, args: &[String]) -> Result<ResultMap, ProbeError> {
        let url = args[0].as_str();
        let entry = match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                json!({ "status": status.is_success(), "code": status.as_u16() })
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "HTTP check failed");
                json!({ "status": false, "code": Value::Null })
            }
        };

        let mut map = ResultMap::new();
        map.insert(url.to_string(), entry);
        Ok(map)
    }
}

/// HTTPS checker: like [`HttpCheck`] but over TLS, with the status reason.
pub struct HttpsCheck {
    client: Client,
}

impl HttpsCheck {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ProbeCheck for HttpsCheck {
    fn name(&self) -> &'static str {
        "https"
    }

    fn validate(&self, args: &[String]) -> Result<(), CatalogueError> {
        validate_url(self.name(), args, "https")
    }

    async fn check(&self, args: &[String]) -> Result<ResultMap, ProbeError> {
        let url = args[0].as_str();
        let entry = match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                json!({
                    "status": status.is_success(),
                    "code": status.as_u16(),
                    "description": status.canonical_reason().unwrap_or("unknown"),
                })
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "HTTPS check failed");
                json!({ "status": false, "code": Value::Null, "description": e.to_string() })
            }
        };

        let mut map = ResultMap::new();
        map.insert(url.to_string(), entry);
        Ok(map)
    }
}
