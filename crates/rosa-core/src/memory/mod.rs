pub mod arena;
mod image;
pub mod layout;
mod place;
pub mod raw;

pub use arena::{Arena, EntityRef, Extent, Liveness, Record};
pub use image::ProcessImage;
pub use place::Place;
