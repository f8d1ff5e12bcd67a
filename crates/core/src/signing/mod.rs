//! Provider-parameterized Signature Version 4
//!
//! Implements the SigV4 scheme with the provider names lifted into
//! parameters: `provider1` drives the algorithm name, the key-derivation
//! prefix and the credential-scope terminator; `provider2` drives the
//! `x-{provider2}-date` and `x-{provider2}-content-sha256` header names.
//!
//! ```text
//! canonical request = METHOD \n URI \n QUERY \n HEADERS \n SIGNED_HEADERS \n HEX(SHA256(body))
//! string to sign    = ALGORITHM \n DATE \n SCOPE \n HEX(SHA256(canonical request))
//! signing key       = HMAC(HMAC(HMAC(HMAC(P1 + "4" + secret, day), region), service), p1 + "4_request")
//! signature         = HEX(HMAC(signing key, string to sign))
//! ```

pub mod canonical;
pub mod scope;

use std::time::UNIX_EPOCH;

use chrono::{DateTime, Utc};
use curlkit_common::{Clock, SystemClock};
use curlkit_domain::constants::{
    HEADER_AUTHORIZATION, HEADER_HOST, SIGNING_ALGORITHM_SUFFIX, SIGNING_DATE_FORMAT,
    SIGNING_DATE_STAMP_FORMAT, SIGNING_REQUEST_SUFFIX,
};
use curlkit_domain::{Credentials, CurlError, Result, SigningConfig};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::ports::PlannedRequest;

type HmacSha256 = Hmac<Sha256>;

/// Everything the signer produced, for verbose output and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureOutput {
    pub authorization: String,
    pub signature: String,
    pub signed_headers: String,
    pub credential_scope: String,
    pub canonical_request: String,
    pub string_to_sign: String,
}

/// Signs planned requests in place, reading the time from `C`
#[derive(Debug, Clone, Default)]
pub struct SigV4Signer<C: Clock = SystemClock> {
    clock: C,
}

impl SigV4Signer<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> SigV4Signer<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Sign `request` using `-u access:secret` as the key pair
    ///
    /// # Errors
    ///
    /// [`CurlError::SigningPrecondition`] naming the missing input: the
    /// signing config, the access key, the secret key, or a usable
    /// timestamp. These are configuration defects and are never retried.
    pub fn sign(
        &self,
        request: &mut PlannedRequest,
        config: Option<&SigningConfig>,
        credentials: Option<&Credentials>,
    ) -> Result<SignatureOutput> {
        let config = config.ok_or_else(|| CurlError::signing_precondition("signing config"))?;
        let credentials =
            credentials.ok_or_else(|| CurlError::signing_precondition("access key"))?;

        let now = self.clock.system_time();
        if now.duration_since(UNIX_EPOCH).is_err() {
            return Err(CurlError::signing_precondition("timestamp"));
        }

        sign_request(request, config, &credentials.username, &credentials.password, now.into())
    }
}

/// Sign `request` at a fixed `timestamp`
///
/// Adds the date, content-hash, `Host` (if absent) and `Authorization`
/// headers. Identical inputs always produce identical output.
pub fn sign_request(
    request: &mut PlannedRequest,
    config: &SigningConfig,
    access_key: &str,
    secret_key: &str,
    timestamp: DateTime<Utc>,
) -> Result<SignatureOutput> {
    if access_key.is_empty() {
        return Err(CurlError::signing_precondition("access key"));
    }
    if secret_key.is_empty() {
        return Err(CurlError::signing_precondition("secret key"));
    }

    let host = request
        .url
        .host_str()
        .ok_or_else(|| CurlError::signing_precondition("request host"))?
        .to_string();
    let provider1 = config.provider1.to_ascii_lowercase();
    let provider2 = config.header_provider().to_ascii_lowercase();
    let region = config.region.clone().unwrap_or_else(|| scope::region_from_host(&host));
    let service = match &config.service {
        Some(service) => service.clone(),
        None => scope::service_from_host(&host)
            .ok_or_else(|| CurlError::signing_precondition("service"))?,
    };

    let algorithm = format!("{}{SIGNING_ALGORITHM_SUFFIX}", provider1.to_ascii_uppercase());
    let date = timestamp.format(SIGNING_DATE_FORMAT).to_string();
    let day = timestamp.format(SIGNING_DATE_STAMP_FORMAT).to_string();
    let payload_hash = hex::encode(Sha256::digest(request.body_bytes()));

    request.headers.remove(HEADER_AUTHORIZATION);
    request.headers.set(format!("x-{provider2}-date"), date.clone());
    request.headers.set(format!("x-{provider2}-content-sha256"), payload_hash.clone());
    let host_header = match request.url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    };
    request.headers.set_if_absent(HEADER_HOST, host_header);

    let (header_block, signed_headers) = canonical::canonical_headers(&request.headers);
    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        canonical::canonical_uri(&request.url),
        canonical::canonical_query(&request.url),
        header_block,
        signed_headers,
        payload_hash,
    );

    let credential_scope = format!("{day}/{region}/{service}/{provider1}{SIGNING_REQUEST_SUFFIX}");
    let string_to_sign = format!(
        "{algorithm}\n{date}\n{credential_scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let key = signing_key(&provider1, secret_key, &day, &region, &service);
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));
    let authorization = format!(
        "{algorithm} Credential={access_key}/{credential_scope}, \
         SignedHeaders={signed_headers}, Signature={signature}"
    );
    request.headers.set(HEADER_AUTHORIZATION, authorization.clone());

    debug!(%algorithm, %credential_scope, %signed_headers, "signed request");

    Ok(SignatureOutput {
        authorization,
        signature,
        signed_headers,
        credential_scope,
        canonical_request,
        string_to_sign,
    })
}

/// Derive the per-day signing key
pub fn signing_key(
    provider1: &str,
    secret_key: &str,
    day: &str,
    region: &str,
    service: &str,
) -> Vec<u8> {
    let provider1 = provider1.to_ascii_lowercase();
    let seed = format!("{}4{secret_key}", provider1.to_ascii_uppercase());
    let day_key = hmac_sha256(seed.as_bytes(), day.as_bytes());
    let region_key = hmac_sha256(&day_key, region.as_bytes());
    let service_key = hmac_sha256(&region_key, service.as_bytes());
    hmac_sha256(&service_key, format!("{provider1}{SIGNING_REQUEST_SUFFIX}").as_bytes())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
