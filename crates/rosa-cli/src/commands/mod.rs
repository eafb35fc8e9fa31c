//! CLI command implementations.

pub mod hooks;
pub mod layout;
