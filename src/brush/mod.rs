//! Brush footprints: falloff curves and the stamp compositor.

pub mod falloff;
pub mod stamp;

pub use falloff::*;
pub use stamp::*;
