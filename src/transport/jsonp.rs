//! Callback-wrapped (JSONP) transport

use tracing::warn;
use uuid::Uuid;

use crate::probe::error::TransportError;
use crate::transport::{ProbeReport, Transport};

/// Script-injection fallback strategy rendered over plain HTTP: the
/// payload is requested with a uniquely named `callback` query parameter
/// and arrives wrapped in a call to that name.
///
/// The generated name lives only for the one request that carries it and
/// is matched exactly once against the response, so nothing outlives the
/// call on either the success or the failure path.
pub struct JsonpTransport {
    client: reqwest::Client,
}

impl JsonpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("tls-probe")
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Generates a one-shot callback name for a single request.
    fn callback_name() -> String {
        format!("tls{}", Uuid::new_v4().simple())
    }

    async fn fetch_as(&self, url: &str, callback: &str) -> Result<ProbeReport, TransportError> {
        // Callback names are plain hex and ride the query string as-is.
        let url = format!("{url}?callback={callback}");
        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!("Callback request failed to load: {}", e);
            TransportError::JsonpLoad(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Callback request returned status {}: {}", status, url);
            return Err(TransportError::JsonpLoad(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let body = response.text().await.map_err(|e| {
            warn!("Failed to read callback response: {}", e);
            TransportError::JsonpLoad(e.to_string())
        })?;

        let Some(json) = unwrap_callback(&body, callback) else {
            warn!("Response never invoked callback {}", callback);
            return Err(TransportError::CallbackNotInvoked);
        };

        serde_json::from_str(json).map_err(|e| {
            warn!("Callback argument is not valid JSON: {}", e);
            TransportError::CallbackNotInvoked
        })
    }
}

impl Default for JsonpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for JsonpTransport {
    async fn fetch(&self, url: &str) -> Result<ProbeReport, TransportError> {
        let callback = Self::callback_name();
        self.fetch_as(url, &callback).await
    }
}

/// Extracts the JSON argument from a `name(json)` body. Tolerates the
/// `/**/` anti-sniffing prefix some endpoints emit, surrounding
/// whitespace, and a trailing semicolon. Returns `None` when the body
/// never invokes `name`.
fn unwrap_callback<'a>(body: &'a str, name: &str) -> Option<&'a str> {
    let trimmed = body.trim();
    let trimmed = trimmed
        .strip_prefix("/**/")
        .map(str::trim_start)
        .unwrap_or(trimmed);

    let rest = trimmed.strip_prefix(name)?;
    let rest = rest.trim_start().strip_prefix('(')?;

    let rest = rest.trim_end();
    let rest = rest.strip_suffix(';').map(str::trim_end).unwrap_or(rest);
    let json = rest.strip_suffix(')')?;

    Some(json.trim())
}
