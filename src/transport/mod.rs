//! Transport strategies for reaching the attestation endpoint
//!
//! Two interchangeable strategies satisfy the same contract: a plain JSON
//! GET ([`direct`]) and a callback-wrapped GET for hosts that only speak
//! the JSONP convention ([`jsonp`]). Which one a checker uses is decided
//! once at construction via [`TransportChoice`], never per call.

#[cfg(test)]
use mockall::automock;

use serde::Deserialize;

use crate::probe::error::TransportError;

pub mod direct;
pub mod jsonp;

pub use direct::DirectTransport;
pub use jsonp::JsonpTransport;

/// Payload returned by the attestation endpoint.
///
/// Only the fields the checker needs; everything else in the response is
/// ignored.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct ProbeReport {
    /// Negotiated protocol version, e.g. "TLS 1.2".
    pub tls_version: Option<String>,
    /// The endpoint's own summary rating, logged beside the verdict.
    pub rating: Option<String>,
}

/// One asynchronous fetch of the attestation payload
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Fetches and parses the payload from `url`.
    ///
    /// Settles exactly once; every failure mode maps to a
    /// [`TransportError`] variant rather than escaping the call.
    async fn fetch(&self, url: &str) -> Result<ProbeReport, TransportError>;
}

/// Which transport strategy to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportChoice {
    /// Plain JSON GET through the HTTP client.
    #[default]
    Direct,
    /// Callback-wrapped GET (the JSONP convention).
    Jsonp,
}

impl TransportChoice {
    /// Returns the string representation of the transport choice
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportChoice::Direct => "direct",
            TransportChoice::Jsonp => "jsonp",
        }
    }
}

impl std::str::FromStr for TransportChoice {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(TransportChoice::Direct),
            "jsonp" => Ok(TransportChoice::Jsonp),
            _ => Err(()),
        }
    }
}
