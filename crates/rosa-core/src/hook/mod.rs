//! Hook catalog, registry and the trampolines installed over host functions

mod id;
mod registry;
mod trampoline;

pub use id::{HookId, Phase};
pub use registry::HookRegistry;
pub(crate) use trampoline::intercept;
pub use trampoline::trampoline_address;
