mod layout;
mod signature;

pub use layout::{HostLayout, Location, ResolvedLayout};
pub use signature::{CodeSignature, Scanner, format_pattern, parse_pattern};
