////////////////////////////////////////////////
/// Terrafield
/// * Heightfield editing primitives for tiled landscapes.
///
/// * Grids of 16-bit heights and 8-bit layer weights, addressed
///   by inclusive integer rectangles.
/// ** Brushes produce weight stamps that are blended into grids.
/// ** The gizmo copies a region out of the landscape, resamples it to a
///    preview texture and moves it through the clipboard.
/// ** Re-tiling expands, crops and resizes grids when the component
///    layout of a landscape changes.
/// ** Heightmaps and weightmaps load from and save to .png and raw files.
////////////////////////////////////////////////
pub mod brush;
pub mod datatypes;
pub mod file_format;
pub mod gizmo;
pub mod retile;
pub mod sampling;
pub mod settings;
pub mod utils;

pub use datatypes::*;
pub use utils::error;
pub use utils::error::{ImportErr, TerrafieldError};
