//! Conversions from external infrastructure errors into curl errors.

use std::error::Error as StdError;

use curlkit_core::PlannedRequest;
use curlkit_domain::CurlError;
use reqwest::Error as HttpError;

/// Maps a client failure onto the curl taxonomy.
///
/// The request supplies what the client error does not carry: the budget
/// that ran out and the target host.
pub trait IntoCurlError {
    fn into_curl(self, request: &PlannedRequest) -> CurlError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CurlError */
/* -------------------------------------------------------------------------- */

impl IntoCurlError for HttpError {
    fn into_curl(self, request: &PlannedRequest) -> CurlError {
        let chain = source_chain(&self);

        if self.is_builder() {
            return CurlError::malformed(request.url.as_str(), chain);
        }

        if self.is_timeout() {
            let duration = request.timeout.unwrap_or(request.settings.connect_timeout);
            return CurlError::TimedOut { duration };
        }

        if self.is_redirect() {
            return CurlError::TooManyRedirects { message: chain };
        }

        let lower = chain.to_ascii_lowercase();
        if looks_like_tls(&lower) {
            return CurlError::TlsVerificationFailed { message: chain };
        }

        let host = request.url.host_str().unwrap_or_default().to_string();
        if self.is_connect() && looks_like_dns(&lower) {
            return CurlError::HostUnresolvable { host };
        }

        CurlError::ConnectionFailed {
            host,
            port: request.url.port_or_known_default().unwrap_or(80),
            message: chain,
        }
    }
}

fn source_chain(err: &HttpError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn looks_like_tls(lower: &str) -> bool {
    ["certificate", "tls", "ssl", "handshake"].iter().any(|needle| lower.contains(needle))
}

fn looks_like_dns(lower: &str) -> bool {
    ["dns error", "failed to lookup address", "name or service not known", "no such host"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use curlkit_core::TransportSettings;
    use curlkit_domain::HeaderList;
    use reqwest::redirect::Policy;
    use reqwest::Client;
    use url::Url;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::errors::ConfigError;

    fn planned(url: &str, timeout: Option<Duration>) -> PlannedRequest {
        PlannedRequest {
            method: "GET".into(),
            url: Url::parse(url).unwrap(),
            headers: HeaderList::new(),
            body: None,
            settings: TransportSettings {
                follow_redirects: false,
                max_redirects: 50,
                insecure: false,
                proxy: None,
                connect_timeout: Duration::from_secs(5),
                compressed: false,
            },
            timeout,
        }
    }

    #[tokio::test]
    async fn timeout_maps_to_timed_out_with_request_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;
        let request = planned(&server.uri(), Some(Duration::from_millis(50)));

        let err = Client::builder()
            .no_proxy()
            .build()
            .unwrap()
            .get(server.uri())
            .timeout(Duration::from_millis(50))
            .send()
            .await
            .unwrap_err();

        let mapped = err.into_curl(&request);
        assert_eq!(mapped, CurlError::TimedOut { duration: Duration::from_millis(50) });
        assert_eq!(mapped.curl_code(), 28);
    }

    #[tokio::test]
    async fn redirect_limit_maps_to_too_many_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/again"))
            .mount(&server)
            .await;
        let request = planned(&server.uri(), None);

        let err = Client::builder()
            .no_proxy()
            .redirect(Policy::limited(2))
            .build()
            .unwrap()
            .get(server.uri())
            .send()
            .await
            .unwrap_err();

        assert_eq!(err.into_curl(&request).curl_code(), 47);
    }

    #[tokio::test]
    async fn refused_connection_maps_to_connection_failed() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let url = format!("http://127.0.0.1:{port}/");
        let request = planned(&url, None);

        let err = Client::builder().no_proxy().build().unwrap().get(&url).send().await.unwrap_err();

        match err.into_curl(&request) {
            CurlError::ConnectionFailed { host, port: mapped, .. } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(mapped, port);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn tls_and_dns_text_is_recognised() {
        assert!(looks_like_tls("invalid peer certificate: unknownissuer"));
        assert!(!looks_like_tls("connection reset by peer"));
        assert!(looks_like_dns("dns error: failed to lookup address information"));
        assert!(!looks_like_dns("connection refused"));
    }

    #[test]
    fn config_errors_become_malformed_commands() {
        let domain: CurlError = ConfigError::Invalid("bad".into()).into();

        assert_eq!(domain.curl_code(), 2);
        assert!(domain.to_string().contains("bad"));
    }
}
