//! # rosa-core
//!
//! Core library of the Rosa server extension shim.
//!
//! This crate provides:
//! - Host layout resolution via offsets and code signatures
//! - Code patching with scoped bypass of installed redirects
//! - The hook registry and the native trampolines feeding it
//! - Views over the host's fixed record arrays with offset-derived identity
//! - Per-entity side storage, the outbound HTTP queue and the Lua environment

pub mod config;
pub mod entity;
pub mod error;
pub mod fs;
pub mod game;
pub mod hook;
pub mod host;
pub mod memory;
pub mod network;
pub mod offset;
pub mod patch;
pub mod runtime;
pub mod script;
pub mod storage;

pub use config::Config;
pub use entity::{Category, World};
pub use error::{Error, Result};
pub use hook::{HookId, HookRegistry, Phase};
pub use host::{Host, HostFunction};
pub use memory::{Arena, EntityRef, ProcessImage};
pub use network::{Network, UreqTransport, Worker};
pub use offset::{HostLayout, ResolvedLayout, Scanner};
pub use runtime::{ResetReason, Runtime};
