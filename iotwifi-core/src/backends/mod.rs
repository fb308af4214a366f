//! Adapter manager implementations.
//!
//! `wpa_cli` drives a real interface; `mock` simulates one for local
//! development and tests.

pub mod mock;
pub mod utils;
pub mod wpa_cli;
