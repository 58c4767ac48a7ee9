use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use crate::error::DiscoveryError;

/// Backoff settings for transient HTTP failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1), capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// HTTP client that only talks to approved evidence-source hosts.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
    retry: RetryPolicy,
}

impl SandboxClient {
    /// Creates a client with the default allowlist of evidence sources.
    pub fn new() -> Result<Self, DiscoveryError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DiscoveryError> {
        let domains = [
            "www.disgenet.org",              // DisGeNET
            "api.disgenet.com",              // DisGeNET v7+
            "www.ebi.ac.uk",                 // GWAS Catalog, QuickGO
            "eutils.ncbi.nlm.nih.gov",       // PubMed
            "rest.uniprot.org",              // UniProt
            "reactome.org",                  // Reactome ContentService
            "search.rcsb.org",               // PDB search
            "pubchem.ncbi.nlm.nih.gov",      // PubChem
            "api.platform.opentargets.org",  // OpenTargets GraphQL
            "storage.googleapis.com",        // HGNC complete set
            "rest.genenames.org",            // HGNC REST
        ];
        let allowlist = domains.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("targetscout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DiscoveryError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist, retry: RetryPolicy::default() })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Exact match or subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn check(&self, url: &str) -> Result<(), DiscoveryError> {
        if self.is_allowed(url) {
            Ok(())
        } else {
            Err(DiscoveryError::Security(format!("domain not in allowlist for URL {}", url)))
        }
    }

    pub fn get(&self, url: &str) -> Result<RequestBuilder, DiscoveryError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> Result<RequestBuilder, DiscoveryError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }

    /// Sends a request, retrying timeouts, connection failures, 429 and 5xx.
    /// Other 4xx responses are returned as errors immediately.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, DiscoveryError> {
        let mut attempt = 1;
        loop {
            let Some(this_try) = request.try_clone() else {
                // Streaming bodies cannot be replayed.
                return Ok(request.send().await?.error_for_status()?);
            };

            match this_try.send().await {
                Ok(resp) if is_retryable_status(resp.status()) && attempt < self.retry.max_attempts => {
                    warn!(status = %resp.status(), attempt, "Transient HTTP status, retrying");
                }
                Ok(resp) => return Ok(resp.error_for_status()?),
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.retry.max_attempts => {
                    warn!(error = %e, attempt, "HTTP request failed, retrying");
                }
                Err(e) => return Err(e.into()),
            }

            let delay = self.retry.delay_for(attempt);
            debug!(?delay, "Backing off");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    pub async fn get_text(&self, url: &str) -> Result<String, DiscoveryError> {
        let resp = self.send(self.get(url)?).await?;
        Ok(resp.text().await?)
    }

    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value, DiscoveryError> {
        let resp = self.send(self.get(url)?.header("Accept", "application/json")).await?;
        Ok(resp.json().await?)
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowlist_matches_exact_and_subdomain() {
        let client = SandboxClient::new().unwrap();
        assert!(client.is_allowed("https://rest.uniprot.org/uniprotkb/search?query=x"));
        assert!(client.is_allowed("https://www.ebi.ac.uk/gwas/rest/api/efoTraits"));
        assert!(client.is_allowed("https://api.reactome.org/x"));
        assert!(!client.is_allowed("https://example.com/"));
        assert!(!client.is_allowed("not a url"));
    }

    #[test]
    fn test_allow_domain_extends_policy() {
        let mut client = SandboxClient::new().unwrap();
        assert!(!client.is_allowed("http://localhost:8080/x"));
        client.allow_domain("localhost");
        assert!(client.is_allowed("http://localhost:8080/x"));
    }

    #[test]
    fn test_blocked_url_is_security_error() {
        let client = SandboxClient::new().unwrap();
        let err = client.get("https://evil.example.org/").unwrap_err();
        assert!(matches!(err, DiscoveryError::Security(_)));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(1), Duration::from_secs(2));
        assert_eq!(p.delay_for(2), Duration::from_secs(4));
        assert_eq!(p.delay_for(3), Duration::from_secs(8));
        assert_eq!(p.delay_for(4), Duration::from_secs(10));
    }
}
