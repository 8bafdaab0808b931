use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

use crate::transport::TransportChoice;

// =============================================================================
// Check constants
// =============================================================================

/// Attestation endpoint reporting the negotiated TLS version
pub const DEFAULT_ENDPOINT: &str = "https://www.howsmyssl.com/a/check";

/// Default verdict time-to-live in milliseconds (3 days)
pub const DEFAULT_TTL_MS: i64 = 3 * 24 * 60 * 60 * 1000;

/// Protocol versions accepted as compatible
pub const APPROVED_TLS_VERSIONS: &[&str] = &["TLS 1.2", "TLS 1.1"];

/// Checker configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProbeConfig {
    /// Attestation endpoint URL. Overriding it is a construction-time
    /// affordance for debugging; there is no runtime setter.
    pub endpoint: String,
    /// Verdict time-to-live in milliseconds
    pub ttl_ms: i64,
    /// Transport strategy to construct
    pub transport: TransportChoice,
    /// Verdict database file; defaults to a file under the data directory
    pub db_path: Option<PathBuf>,
    /// Environment hint: `Some(true)` pre-seeds an incompatible verdict,
    /// anything else leaves the verdict unknown
    pub maybe_incompatible: Option<bool>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            ttl_ms: DEFAULT_TTL_MS,
            transport: TransportChoice::default(),
            db_path: None,
            maybe_incompatible: None,
        }
    }
}

impl ProbeConfig {
    /// Default configuration with the environment hints applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlays the environment hints onto `self`, leaving fields
    /// untouched when a variable is absent: `TLS_PROBE_MAYBE_INCOMPATIBLE`
    /// pre-seeds a negative verdict, `TLS_PROBE_TRANSPORT` picks the
    /// transport strategy.
    pub fn apply_env(&mut self) {
        self.apply_env_values(
            std::env::var("TLS_PROBE_MAYBE_INCOMPATIBLE").ok(),
            std::env::var("TLS_PROBE_TRANSPORT").ok(),
        );
    }

    fn apply_env_values(&mut self, maybe_incompatible: Option<String>, transport: Option<String>) {
        if let Some(raw) = maybe_incompatible {
            self.maybe_incompatible = Some(parse_boolish(&raw));
        }

        if let Some(raw) = transport {
            self.transport = raw.parse().unwrap_or_else(|()| {
                warn!("Unknown transport {:?}, using direct", raw);
                TransportChoice::Direct
            });
        }
    }
}

/// Boolean-ish environment parse: `1`, `true`, and `yes` (any case) are
/// truthy; any other present value is falsy.
fn parse_boolish(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Returns the path to the data directory for tls-probe.
/// Uses $XDG_DATA_HOME/tls-probe if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/tls-probe,
/// or ./tls-probe if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the verdict database file.
pub fn db_path() -> PathBuf {
    data_dir().join("verdict.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("tls-probe.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("tls-probe")
}
