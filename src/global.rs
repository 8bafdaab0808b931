//! Process-wide checker handle
//!
//! One checker can be installed for the whole process so distant call
//! sites share a verdict without threading a handle through. Displaced
//! instances are handed back to the installer, which may restore them.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::info;

use crate::probe::checker::TlsChecker;

static GLOBAL: RwLock<Option<TlsChecker>> = RwLock::new(None);

/// Installs `checker` as the process-wide instance and returns the one
/// it displaced, if any.
pub fn install(checker: TlsChecker) -> Option<TlsChecker> {
    let previous = write_slot().replace(checker);
    info!("Installed process-wide TLS checker");
    previous
}

/// Puts a previously displaced instance back, or clears the slot, and
/// returns the handle that had been installed so the caller can keep
/// using it under a local name.
pub fn restore(previous: Option<TlsChecker>) -> Option<TlsChecker> {
    std::mem::replace(&mut *write_slot(), previous)
}

/// A handle to the installed instance, if any. The handle shares state
/// with the installed checker.
pub fn current() -> Option<TlsChecker> {
    read_slot().clone()
}

fn write_slot() -> RwLockWriteGuard<'static, Option<TlsChecker>> {
    GLOBAL
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_slot() -> RwLockReadGuard<'static, Option<TlsChecker>> {
    GLOBAL
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
