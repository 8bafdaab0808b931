//! Pure payload-to-verdict evaluation

use crate::transport::ProbeReport;

/// Returns true iff `report` carries a non-empty protocol version that
/// exactly matches one entry of `approved`.
///
/// Membership is order-independent string equality: no version ordering,
/// no prefix matching. An absent or empty version evaluates to false,
/// never an error.
pub fn is_tls_compatible(report: &ProbeReport, approved: &[&str]) -> bool {
    match report.tls_version.as_deref() {
        Some(version) if !version.is_empty() => approved.contains(&version),
        _ => false,
    }
}
