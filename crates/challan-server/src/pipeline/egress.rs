//! Public egress IP discovery
//!
//! The challan lookup service allow-lists callers by their public IP, which
//! has to be sent with every request. The resolver asks an IP echo service
//! and remembers the last answer so an unreachable echo service degrades to
//! the previous value, then to a configured constant.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::config::EgressConfig;

#[derive(Debug, Error)]
pub enum EgressError {
    #[error("IP lookup request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IP lookup returned HTTP {0}")]
    Status(StatusCode),

    #[error("IP lookup returned an unusable body: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct IpEcho {
    ip: String,
}

pub struct EgressResolver {
    client: Client,
    config: EgressConfig,
    last_known: RwLock<Option<String>>,
}

impl EgressResolver {
    pub fn new(config: EgressConfig) -> Result<Self, EgressError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("challan-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            config,
            last_known: RwLock::new(None),
        })
    }

    /// Current public IP. Never fails: falls back to the last successful
    /// lookup, then to the configured fallback address.
    #[instrument(skip(self))]
    pub async fn resolve(&self) -> String {
        match self.lookup().await {
            Ok(ip) => {
                debug!(ip = %ip, "Resolved egress IP");
                *self.last_known.write().await = Some(ip.clone());
                ip
            },
            Err(e) => {
                let ip = self
                    .last_known
                    .read()
                    .await
                    .clone()
                    .unwrap_or_else(|| self.config.fallback_ip.clone());
                warn!(error = %e, ip = %ip, "Egress IP lookup failed, using fallback");
                ip
            },
        }
    }

    /// Last IP the echo service returned, if any.
    pub async fn last_known(&self) -> Option<String> {
        self.last_known.read().await.clone()
    }

    async fn lookup(&self) -> Result<String, EgressError> {
        let response = self.client.get(&self.config.lookup_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EgressError::Status(status));
        }

        let body = response.text().await?;
        let echo: IpEcho =
            serde_json::from_str(&body).map_err(|e| EgressError::Malformed(e.to_string()))?;

        let ip = echo.ip.trim();
        if ip.is_empty() {
            return Err(EgressError::Malformed("empty ip".to_string()));
        }

        Ok(ip.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver_for(server: &MockServer) -> EgressResolver {
        EgressResolver::new(EgressConfig {
            lookup_url: format!("{}/ip", server.uri()),
            fallback_ip: "14.142.186.142".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_returns_and_caches_echoed_ip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ip": "203.0.113.7"
            })))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        assert_eq!(resolver.resolve().await, "203.0.113.7");
        assert_eq!(resolver.last_known().await.as_deref(), Some("203.0.113.7"));
    }

    #[tokio::test]
    async fn test_resolve_uses_fallback_when_never_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        assert_eq!(resolver.resolve().await, "14.142.186.142");
        assert_eq!(resolver.last_known().await, None);
    }

    #[tokio::test]
    async fn test_resolve_prefers_cached_ip_over_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ip": "198.51.100.4" })),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        assert_eq!(resolver.resolve().await, "198.51.100.4");
        assert_eq!(resolver.resolve().await, "198.51.100.4");
    }

    #[tokio::test]
    async fn test_resolve_survives_unreachable_service() {
        let resolver = EgressResolver::new(EgressConfig {
            lookup_url: "http://127.0.0.1:9/ip".to_string(),
            fallback_ip: "10.1.2.3".to_string(),
            timeout_secs: 1,
        })
        .unwrap();

        assert_eq!(resolver.resolve().await, "10.1.2.3");
    }
}
