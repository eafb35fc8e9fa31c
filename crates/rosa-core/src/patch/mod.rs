//! Binary patch engine
//!
//! Installs redirects from host functions to replacement functions and lifts
//! them for scoped call-throughs to the original code.

mod redirect;
mod site;

pub use redirect::{Bypass, Redirect};
pub use site::{DispatchSlot, InlineJump, PatchSite, encode_jump};
