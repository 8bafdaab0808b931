//! Compatibility probing layer
//!
//! This module answers compatibility queries from memory, from the
//! persisted record, or from the network, with at most one remote check
//! in flight at a time and a sticky error until an explicit re-check.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Transport  │◀────│   Checker   │────▶│    Store    │
//! │   (fetch)   │     │(orchestrate)│     │  (persist)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │  Evaluator  │
//!                     │ (approved?) │
//!                     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`checker`]: Check orchestration and the public check/re-check API
//! - [`error`]: Error taxonomy for checks and transports
//! - [`evaluator`]: Pure payload-to-verdict evaluation
//! - [`store`]: SQLite-backed best-effort verdict persistence
//! - [`verdict`]: The tri-state verdict and its persisted encoding

pub mod checker;
pub mod error;
pub mod evaluator;
pub mod store;
pub mod verdict;
