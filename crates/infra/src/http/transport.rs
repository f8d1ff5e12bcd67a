use async_trait::async_trait;
use curlkit_core::{PlannedRequest, RawResponse, Transport, TransportSettings};
use curlkit_domain::{CurlError, HeaderList, Result};
use dashmap::DashMap;
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Proxy};
use tracing::debug;

use crate::errors::IntoCurlError;

/// Clients kept alive at once by [`ReqwestTransport::new`]
pub const DEFAULT_MAX_CLIENTS: usize = 16;

/// [`Transport`] over a bounded pool of reqwest clients.
///
/// Redirect, TLS, proxy and decompression behaviour are fixed when a reqwest
/// client is built, so one client is kept per distinct
/// [`TransportSettings`] and reused across requests. Once `max_clients`
/// distinct settings are pooled, building another client evicts an existing
/// one along with its connections.
#[derive(Debug)]
pub struct ReqwestTransport {
    clients: DashMap<TransportSettings, Client>,
    max_clients: usize,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::with_max_clients(DEFAULT_MAX_CLIENTS)
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that keeps at most `max_clients` clients (at least one)
    pub fn with_max_clients(max_clients: usize) -> Self {
        Self { clients: DashMap::new(), max_clients: max_clients.max(1) }
    }

    /// Number of distinct clients currently pooled.
    pub fn pooled_clients(&self) -> usize {
        self.clients.len()
    }

    fn client_for(&self, settings: &TransportSettings) -> Result<Client> {
        if let Some(client) = self.clients.get(settings) {
            return Ok(client.value().clone());
        }

        let client = build_client(settings)?;
        debug!(?settings, "built HTTP client");
        while self.clients.len() >= self.max_clients {
            // The key is cloned out so no shard guard is held across the removal
            let Some(evicted) = self.clients.iter().next().map(|entry| entry.key().clone()) else {
                break;
            };
            self.clients.remove(&evicted);
            debug!(settings = ?evicted, "evicted pooled HTTP client");
        }
        Ok(self.clients.entry(settings.clone()).or_insert(client).value().clone())
    }
}

fn build_client(settings: &TransportSettings) -> Result<Client> {
    let redirect = if settings.follow_redirects {
        Policy::limited(settings.max_redirects as usize)
    } else {
        Policy::none()
    };

    let mut builder = Client::builder()
        .use_rustls_tls()
        .redirect(redirect)
        .connect_timeout(settings.connect_timeout)
        .danger_accept_invalid_certs(settings.insecure)
        .gzip(settings.compressed)
        .brotli(settings.compressed)
        .deflate(settings.compressed);

    builder = match &settings.proxy {
        Some(proxy) => builder.proxy(
            Proxy::all(proxy.as_str())
                .map_err(|e| CurlError::malformed(proxy.as_str(), e.to_string()))?,
        ),
        None => builder.no_proxy(),
    };

    builder.build().map_err(|e| CurlError::malformed("transport", e.to_string()))
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &PlannedRequest) -> Result<RawResponse> {
        let client = self.client_for(&request.settings)?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| CurlError::malformed(request.method.as_str(), e.to_string()))?;

        let mut builder = client.request(method, request.url.clone());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        debug!(method = %request.method, url = %request.url, "sending HTTP request");
        let response = builder.send().await.map_err(|e| e.into_curl(request))?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let mut headers = HeaderList::new();
        for (name, value) in response.headers() {
            headers.append(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }

        let body = response.bytes().await.map_err(|e| e.into_curl(request))?.to_vec();
        debug!(status, url = %url, bytes = body.len(), "received HTTP response");

        Ok(RawResponse { status, headers, url, body })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use url::Url;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn settings() -> TransportSettings {
        TransportSettings {
            follow_redirects: false,
            max_redirects: 50,
            insecure: false,
            proxy: None,
            connect_timeout: Duration::from_secs(5),
            compressed: false,
        }
    }

    fn request(method: &str, url: String) -> PlannedRequest {
        PlannedRequest {
            method: method.into(),
            url: Url::parse(&url).unwrap(),
            headers: HeaderList::new(),
            body: None,
            settings: settings(),
            timeout: None,
        }
    }

    #[tokio::test]
    async fn sends_method_headers_and_exact_body() {
        let server = MockServer::start().await;
        let payload: Vec<u8> = (0..=255u8).collect();
        Mock::given(method("PUT"))
            .and(path("/upload"))
            .and(header("x-trace", "abc"))
            .and(body_bytes(payload.clone()))
            .respond_with(ResponseTemplate::new(201).insert_header("X-Id", "7"))
            .expect(1)
            .mount(&server)
            .await;

        let mut req = request("PUT", format!("{}/upload", server.uri()));
        req.headers.set("X-Trace", "abc");
        req.body = Some(payload);

        let response = ReqwestTransport::new().send(&req).await.unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.headers.get("x-id"), Some("7"));
    }

    #[tokio::test]
    async fn repeated_headers_are_all_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut req = request("GET", server.uri());
        req.headers.append("X-Tag", "a");
        req.headers.append("X-Tag", "b");
        ReqwestTransport::new().send(&req).await.unwrap();

        let received = server.received_requests().await.unwrap();
        let tags: Vec<_> = received[0].headers.get_all("x-tag").iter().collect();
        assert_eq!(tags.len(), 2);
    }

    #[tokio::test]
    async fn custom_methods_pass_through() {
        let server = MockServer::start().await;
        Mock::given(method("PURGE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let response =
            ReqwestTransport::new().send(&request("PURGE", server.uri())).await.unwrap();

        assert_eq!(response.status, 204);
    }

    #[tokio::test]
    async fn redirects_are_not_followed_unless_enabled() {
        let server = MockServer::start().await;
        Mock::given(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
            .mount(&server)
            .await;
        Mock::given(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&server)
            .await;
        let transport = ReqwestTransport::new();

        let plain = request("GET", format!("{}/old", server.uri()));
        assert_eq!(transport.send(&plain).await.unwrap().status, 301);

        let mut following = plain.clone();
        following.settings.follow_redirects = true;
        let response = transport.send(&following).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"moved");
        assert!(response.url.ends_with("/new"));
        assert_eq!(transport.pooled_clients(), 2);
    }

    #[tokio::test]
    async fn clients_are_reused_for_equal_settings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let transport = ReqwestTransport::new();

        for _ in 0..3 {
            transport.send(&request("GET", server.uri())).await.unwrap();
        }

        assert_eq!(transport.pooled_clients(), 1);
    }

    #[tokio::test]
    async fn pool_never_exceeds_its_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let transport = ReqwestTransport::with_max_clients(2);

        for limit in 1..=5 {
            let mut req = request("GET", server.uri());
            req.settings.max_redirects = limit;
            assert_eq!(transport.send(&req).await.unwrap().status, 200);
            assert!(transport.pooled_clients() <= 2);
        }
        assert_eq!(transport.pooled_clients(), 2);

        let fresh = ReqwestTransport::with_max_clients(0);
        fresh.send(&request("GET", server.uri())).await.unwrap();
        assert_eq!(fresh.pooled_clients(), 1);
    }

    #[tokio::test]
    async fn invalid_method_is_a_malformed_command() {
        let err = ReqwestTransport::new()
            .send(&request("BAD METHOD", "http://127.0.0.1:9/".into()))
            .await
            .unwrap_err();

        assert_eq!(err.curl_code(), 2);
    }
}
