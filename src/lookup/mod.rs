//! Domain and IP metadata lookup
//!
//! Registry data (registrar, creation date, AS owner) comes from external
//! services the scanner treats as an opaque collaborator. The bundled
//! [`DnsLookup`] only resolves the IP address. Lookups never fail a scan: the
//! caller bounds them with a timeout and falls back to an empty record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Metadata about the scanned domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInfo {
    pub domain: String,
    pub registrar: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub as_owner: Option<String>,
}

impl DomainInfo {
    /// A record carrying only the domain name
    pub fn empty(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("lookup timed out")]
    Timeout,

    #[error("resolution failed: {0}")]
    Resolve(String),
}

/// Resolves metadata for a domain
#[async_trait]
pub trait DomainLookup: Send + Sync {
    async fn lookup(&self, domain: &str) -> Result<DomainInfo, LookupError>;
}

/// Resolves the domain's first IP address through the system resolver
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsLookup;

#[async_trait]
impl DomainLookup for DnsLookup {
    async fn lookup(&self, domain: &str) -> Result<DomainInfo, LookupError> {
        let mut addrs = tokio::net::lookup_host((domain, 0))
            .await
            .map_err(|e| LookupError::Resolve(e.to_string()))?;

        let ip = addrs
            .next()
            .map(|addr| addr.ip().to_string())
            .ok_or_else(|| LookupError::Resolve(format!("no addresses for {}", domain)))?;

        Ok(DomainInfo {
            ip_address: Some(ip),
            ..DomainInfo::empty(domain)
        })
    }
}

/// Runs a lookup under `timeout`, degrading every failure to an empty record
pub async fn lookup_or_empty(
    lookup: &dyn DomainLookup,
    domain: &str,
    timeout: Duration,
) -> DomainInfo {
    let result = match tokio::time::timeout(timeout, lookup.lookup(domain)).await {
        Ok(result) => result,
        Err(_) => Err(LookupError::Timeout),
    };

    match result {
        Ok(info) => info,
        Err(e) => {
            tracing::warn!("Domain lookup for {} failed: {}", domain, e);
            DomainInfo::empty(domain)
        }
    }
}
