//! Request signing configuration

use serde::{Deserialize, Serialize};

use crate::errors::{CurlError, Result};

/// Provider tuple for SigV4-style signing, as given to `--aws-sigv4`
///
/// `provider1` names the algorithm and key-derivation prefix (`aws` gives
/// `AWS4-HMAC-SHA256`), `provider2` names the `x-{provider2}-*` headers and
/// falls back to `provider1`. Region and service fall back to values taken
/// from the target host at signing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningConfig {
    pub provider1: String,
    pub provider2: Option<String>,
    pub region: Option<String>,
    pub service: Option<String>,
}

impl SigningConfig {
    /// Build a config for `provider1` with every optional field unset
    pub fn new(provider1: impl Into<String>) -> Self {
        Self { provider1: provider1.into(), provider2: None, region: None, service: None }
    }

    /// Parse `provider1[:provider2[:region[:service]]]`
    ///
    /// Empty segments after the first are treated as unset.
    pub fn parse(param: &str) -> Result<Self> {
        let param = param.trim();
        if param.is_empty() {
            return Err(CurlError::malformed("--aws-sigv4", "signing parameter is empty"));
        }

        let parts: Vec<&str> = param.split(':').collect();
        if parts.len() > 4 {
            return Err(CurlError::malformed(
                param,
                "expected provider1[:provider2[:region[:service]]]",
            ));
        }

        let provider1 = parts[0].trim();
        if provider1.is_empty() {
            return Err(CurlError::malformed(param, "provider1 is required"));
        }

        let optional = |index: usize| {
            parts
                .get(index)
                .map(|part| part.trim())
                .filter(|part| !part.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            provider1: provider1.to_string(),
            provider2: optional(1),
            region: optional(2),
            service: optional(3),
        })
    }

    /// `provider2`, defaulting to `provider1`
    pub fn header_provider(&self) -> &str {
        self.provider2.as_deref().unwrap_or(&self.provider1)
    }

    pub fn with_provider2(mut self, provider2: impl Into<String>) -> Self {
        self.provider2 = Some(provider2.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}

impl std::str::FromStr for SigningConfig {
    type Err = CurlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
