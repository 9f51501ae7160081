//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All user-facing output of the `bp` binary goes through this module so
//! quiet mode and JSON output behave the same everywhere. Diagnostics go
//! through `tracing` instead.

pub mod output;
