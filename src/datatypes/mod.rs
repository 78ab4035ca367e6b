pub mod grid;
pub mod rect;

pub use grid::*;
pub use rect::*;
