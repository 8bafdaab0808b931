//! Direct-request transport

use tracing::warn;

use crate::probe::error::TransportError;
use crate::transport::{ProbeReport, Transport};

/// Direct-request strategy: a plain JSON GET through the HTTP client.
///
/// Failures keep the client's own discriminator as the error kind, so a
/// caller can tell a timeout from a refused connection from a 500.
pub struct DirectTransport {
    client: reqwest::Client,
}

impl DirectTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("tls-probe")
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

impl Default for DirectTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for DirectTransport {
    async fn fetch(&self, url: &str) -> Result<ProbeReport, TransportError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            warn!("Attestation endpoint returned status {}: {}", status, url);
            return Err(TransportError::Request {
                kind: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
                detail: format!("Unexpected status: {}", status),
            });
        }

        response.json().await.map_err(|e| {
            warn!("Failed to parse attestation response: {}", e);
            request_error(e)
        })
    }
}

/// Maps an HTTP client failure into the transport taxonomy, preserving
/// the client's discriminator as the kind.
fn request_error(e: reqwest::Error) -> TransportError {
    let kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_decode() {
        "decode"
    } else {
        "request"
    };

    TransportError::Request {
        kind: kind.to_string(),
        detail: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn fetch_returns_parsed_report_for_success() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/a/check")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tls_version": "TLS 1.2", "rating": "Probably Okay"}"#)
            .create_async()
            .await;

        let transport = DirectTransport::new();
        let report = transport
            .fetch(&format!("{}/a/check", server.url()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(report.tls_version.as_deref(), Some("TLS 1.2"));
        assert_eq!(report.rating.as_deref(), Some("Probably Okay"));
    }

    #[tokio::test]
    async fn fetch_surfaces_status_text_for_server_error() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/a/check")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let transport = DirectTransport::new();
        let err = transport
            .fetch(&format!("{}/a/check", server.url()))
            .await
            .unwrap_err();

        mock.assert_async().await;
        match err {
            TransportError::Request { kind, .. } => assert_eq!(kind, "Internal Server Error"),
            other => panic!("expected Request error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn fetch_maps_unparsable_body_to_decode_kind() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/a/check")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json at all")
            .create_async()
            .await;

        let transport = DirectTransport::new();
        let err = transport
            .fetch(&format!("{}/a/check", server.url()))
            .await
            .unwrap_err();

        mock.assert_async().await;
        match err {
            TransportError::Request { kind, .. } => assert_eq!(kind, "decode"),
            other => panic!("expected Request error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn fetch_maps_connection_failure_to_connect_kind() {
        // Nothing listens on the reserved tcpmux port
        let transport = DirectTransport::new();
        let err = transport
            .fetch("http://127.0.0.1:1/a/check")
            .await
            .unwrap_err();

        match err {
            TransportError::Request { kind, .. } => assert_eq!(kind, "connect"),
            other => panic!("expected Request error, got {:?}", other),
        }
    }
}
