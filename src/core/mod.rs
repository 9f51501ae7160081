//! core
//!
//! Core domain types, configuration, and locking.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, ContentPath, Author
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for the working copy
//! - [`ops`] - Exclusive working copy lock
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod ops;
pub mod paths;
pub mod types;
