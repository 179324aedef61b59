//! Core business logic for Outlay.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Everything the approval workflow decides is computed here; persistence and
//! locking belong to `outlay-db`.
//!
//! # Modules
//!
//! - `workflow` - Approval rosters, policy evaluation and expense status transitions

pub mod workflow;
