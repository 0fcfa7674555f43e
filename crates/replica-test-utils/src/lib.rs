//! Shared test utilities for the replica-sync workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`] - bare remotes and direct commits that bypass the reconciler

pub mod git;
