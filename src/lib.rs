//! Cached TLS compatibility checking against a remote attestation
//! endpoint.
//!
//! Some upstream services reject clients that cannot negotiate a modern
//! TLS version. Rather than letting every request discover that the
//! hard way, a [`TlsChecker`] asks an attestation endpoint once,
//! evaluates the negotiated protocol against the approved list, and
//! remembers the answer in memory and on disk for a sliding freshness
//! window.
//!
//! ```no_run
//! use tls_probe::{ProbeConfig, TlsChecker};
//!
//! # async fn run() -> Result<(), tls_probe::CheckError> {
//! let checker = TlsChecker::new(&ProbeConfig::from_env());
//! if checker.check().await? {
//!     println!("modern TLS negotiated");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod global;
pub mod probe;
pub mod transport;

pub use config::ProbeConfig;
pub use probe::checker::TlsChecker;
pub use probe::error::{CheckError, TransportError};
pub use probe::verdict::Verdict;
pub use transport::{Transport, TransportChoice};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
