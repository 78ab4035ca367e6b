use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    datatypes::{HeightGrid, IntPoint, IntRect, WeightGrid},
    error::TerrafieldError,
};

/// Quads per subsection the renderer supports.
pub const SECTION_SIZES: [usize; 6] = [7, 15, 31, 63, 127, 255];
/// Subsections per component, per axis.
pub const NUM_SECTIONS: [usize; 2] = [1, 2];
/// Components per axis.
pub const MAX_COMPONENTS: usize = 32;

/// How a landscape is split into components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentLayout {
    pub components_x: usize,
    pub components_y: usize,
    pub subsections: usize,
    pub subsection_quads: usize,
}

impl Default for ComponentLayout {
    fn default() -> Self {
        Self {
            components_x: 8,
            components_y: 8,
            subsections: 1,
            subsection_quads: 63,
        }
    }
}

impl ComponentLayout {
    pub fn component_quads(&self) -> usize {
        self.subsections * self.subsection_quads
    }

    /// Vertex counts along X and Y.
    pub fn verts(&self) -> (usize, usize) {
        let quads = self.component_quads();
        (
            self.components_x * quads + 1,
            self.components_y * quads + 1,
        )
    }

    pub fn validate(&self) -> Result<(), TerrafieldError> {
        if self.components_x == 0
            || self.components_y == 0
            || self.subsections == 0
            || self.subsection_quads == 0
        {
            return Err(TerrafieldError::InvalidLayout(format!(
                "every count must be positive: {self:?}"
            )));
        }
        if self.components_x > MAX_COMPONENTS || self.components_y > MAX_COMPONENTS {
            return Err(TerrafieldError::InvalidLayout(format!(
                "{}x{} components exceeds {MAX_COMPONENTS} per axis",
                self.components_x, self.components_y
            )));
        }
        Ok(())
    }

    fn clamp_size(mut self) -> Self {
        self.components_x = self.components_x.clamp(1, MAX_COMPONENTS);
        self.components_y = self.components_y.clamp(1, MAX_COMPONENTS);
        self
    }
}

/// Picks a component layout for a `width` x `height` vertex heightmap.
///
/// An exact fit is preferred, largest sections first. Failing that the
/// section size grows (keeping `current`'s subsection count) until the map
/// fits in [`MAX_COMPONENTS`]; very large maps get the largest layout.
pub fn choose_best_component_layout(
    width: usize,
    height: usize,
    current: &ComponentLayout,
) -> Option<ComponentLayout> {
    if width == 0 || height == 0 {
        return None;
    }
    let (quads_x, quads_y) = (width - 1, height - 1);

    for &size in SECTION_SIZES.iter().rev() {
        for &sections in NUM_SECTIONS.iter().rev() {
            let step = size * sections;
            if quads_x % step == 0
                && quads_x / step <= MAX_COMPONENTS
                && quads_y % step == 0
                && quads_y / step <= MAX_COMPONENTS
            {
                return Some(
                    ComponentLayout {
                        components_x: quads_x / step,
                        components_y: quads_y / step,
                        subsections: sections,
                        subsection_quads: size,
                    }
                    .clamp_size(),
                );
            }
        }
    }

    for &size in SECTION_SIZES
        .iter()
        .filter(|&&s| s >= current.subsection_quads)
    {
        let step = size * current.subsections.max(1);
        let components_x = quads_x.div_ceil(step);
        let components_y = quads_y.div_ceil(step);
        if components_x <= MAX_COMPONENTS && components_y <= MAX_COMPONENTS {
            return Some(
                ComponentLayout {
                    components_x,
                    components_y,
                    subsections: current.subsections.max(1),
                    subsection_quads: size,
                }
                .clamp_size(),
            );
        }
    }

    let size = SECTION_SIZES[SECTION_SIZES.len() - 1];
    let sections = NUM_SECTIONS[NUM_SECTIONS.len() - 1];
    Some(
        ComponentLayout {
            components_x: quads_x.div_ceil(size * sections),
            components_y: quads_y.div_ceil(size * sections),
            subsections: sections,
            subsection_quads: size,
        }
        .clamp_size(),
    )
}

/// Heights and paint layers of a landscape. The height grid's rectangle is
/// the landscape extent; every layer covers the same rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct LandscapeData {
    pub component_quads: usize,
    pub heights: HeightGrid,
    pub layers: Vec<(String, WeightGrid)>,
}

impl LandscapeData {
    pub fn extent(&self) -> IntRect {
        self.heights.rect()
    }

    fn validate(&self) -> Result<(), TerrafieldError> {
        let extent = self.extent();
        if extent.is_empty() {
            return Err(TerrafieldError::DegenerateRect(extent));
        }
        if self.component_quads == 0 {
            return Err(TerrafieldError::InvalidLayout(
                "landscape has zero quads per component".to_string(),
            ));
        }
        if let Some((_, grid)) = self.layers.iter().find(|(_, g)| g.rect() != extent) {
            return Err(TerrafieldError::size_mismatch(extent.area(), grid.rect().area()));
        }
        Ok(())
    }
}

/// Landscape rebuilt for a new component layout.
#[derive(Clone, Debug, PartialEq)]
pub struct ResizedLandscape {
    pub data: LandscapeData,
    /// Shift of the new origin in old quads (crop/extend only).
    pub offset_quads: IntPoint,
    /// XY scale multiplier for the new landscape (resample only).
    pub scale_factor: f32,
}

/// Rebuilds `source` for `layout`.
///
/// With `resample` the whole landscape is stretched to the new vertex
/// counts. Otherwise the new extent is centred on the old one, cropped or
/// edge-extended, and re-based at the origin.
pub fn change_component_setting(
    source: &LandscapeData,
    layout: &ComponentLayout,
    resample: bool,
) -> Result<ResizedLandscape, TerrafieldError> {
    layout.validate()?;
    source.validate()?;

    let old = source.extent();
    let new_quads = layout.component_quads();
    let (new_verts_x, new_verts_y) = layout.verts();

    let resized = if resample {
        let new_min_x = old.min.x / source.component_quads as i32 * new_quads as i32;
        let new_min_y = old.min.y / source.component_quads as i32 * new_quads as i32;
        let rebase = |grid_rect: IntRect| {
            IntRect::new(
                new_min_x,
                new_min_y,
                new_min_x + grid_rect.width() as i32 - 1,
                new_min_y + grid_rect.height() as i32 - 1,
            )
        };

        let resampled = source.heights.resampled(new_verts_x, new_verts_y)?;
        let heights = HeightGrid::from_vec(rebase(resampled.rect()), resampled.into_vec())?;
        let layers = source
            .layers
            .iter()
            .map(|(name, grid)| {
                let resampled = grid.resampled(new_verts_x, new_verts_y)?;
                let grid = WeightGrid::from_vec(rebase(resampled.rect()), resampled.into_vec())?;
                Ok((name.clone(), grid))
            })
            .collect::<Result<Vec<_>, TerrafieldError>>()?;

        ResizedLandscape {
            data: LandscapeData {
                component_quads: new_quads,
                heights,
                layers,
            },
            offset_quads: IntPoint::default(),
            scale_factor: source.component_quads as f32 / new_quads as f32,
        }
    } else {
        let new_min_x = old.min.x + (old.width() as i32 - new_verts_x as i32) / 2;
        let new_min_y = old.min.y + (old.height() as i32 - new_verts_y as i32) / 2;
        let target = IntRect::new(
            new_min_x,
            new_min_y,
            new_min_x + new_verts_x as i32 - 1,
            new_min_y + new_verts_y as i32 - 1,
        );
        let requested = old.clip(&target);
        let rebased = IntRect::from_size(new_verts_x, new_verts_y);

        let heights = source.heights.crop(requested)?.expanded(target)?;
        let heights = HeightGrid::from_vec(rebased, heights.into_vec())?;
        let layers = source
            .layers
            .iter()
            .map(|(name, grid)| {
                let grid = grid.crop(requested)?.expanded(target)?;
                Ok((name.clone(), WeightGrid::from_vec(rebased, grid.into_vec())?))
            })
            .collect::<Result<Vec<_>, TerrafieldError>>()?;

        ResizedLandscape {
            data: LandscapeData {
                component_quads: new_quads,
                heights,
                layers,
            },
            offset_quads: target.min,
            scale_factor: 1.0,
        }
    };

    info!(
        resource = "landscape",
        old = %old,
        new = %resized.data.extent(),
        resample,
        layers = resized.data.layers.len(),
        "changed component layout"
    );
    Ok(resized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::Grid;

    fn landscape(verts: usize, component_quads: usize) -> LandscapeData {
        let rect = IntRect::from_size(verts, verts);
        let heights = (0..rect.area()).map(|i| (i * 10) as u16).collect();
        let weights = (0..rect.area()).map(|i| (i % 256) as u8).collect();
        LandscapeData {
            component_quads,
            heights: Grid::from_vec(rect, heights).unwrap(),
            layers: vec![("grass".to_string(), Grid::from_vec(rect, weights).unwrap())],
        }
    }

    #[test]
    fn exact_layout_prefers_large_sections() {
        let layout = choose_best_component_layout(505, 505, &ComponentLayout::default()).unwrap();
        assert_eq!(
            layout,
            ComponentLayout {
                components_x: 4,
                components_y: 4,
                subsections: 2,
                subsection_quads: 63,
            }
        );
        assert_eq!(layout.verts(), (505, 505));
    }

    #[test]
    fn inexact_layout_grows_section_size() {
        let layout = choose_best_component_layout(100, 100, &ComponentLayout::default()).unwrap();
        assert_eq!(layout.subsection_quads, 63);
        assert_eq!(layout.subsections, 1);
        assert_eq!((layout.components_x, layout.components_y), (2, 2));
    }

    #[test]
    fn huge_maps_fall_back_to_largest_layout() {
        let layout =
            choose_best_component_layout(20000, 20000, &ComponentLayout::default()).unwrap();
        assert_eq!(
            layout,
            ComponentLayout {
                components_x: 32,
                components_y: 32,
                subsections: 2,
                subsection_quads: 255,
            }
        );
        assert!(choose_best_component_layout(0, 10, &ComponentLayout::default()).is_none());
    }

    #[test]
    fn layout_validation() {
        assert!(ComponentLayout::default().validate().is_ok());
        let too_many = ComponentLayout { components_x: 33, ..Default::default() };
        assert!(too_many.validate().is_err());
        let empty = ComponentLayout { subsections: 0, ..Default::default() };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn resample_keeps_corners_and_scales() {
        let source = landscape(15, 7);
        let layout = ComponentLayout {
            components_x: 1,
            components_y: 1,
            subsections: 1,
            subsection_quads: 7,
        };
        let resized = change_component_setting(&source, &layout, true).unwrap();
        let heights = &resized.data.heights;
        assert_eq!(heights.rect(), IntRect::new(0, 0, 7, 7));
        assert_eq!(heights.get(0, 0), source.heights.get(0, 0));
        assert_eq!(heights.get(7, 7), source.heights.get(14, 14));
        assert_eq!(resized.scale_factor, 1.0);
        assert_eq!(resized.data.layers[0].1.rect(), heights.rect());
    }

    #[test]
    fn resample_rescales_min_corner() {
        let mut source = landscape(15, 7);
        let rect = IntRect::new(14, 14, 28, 28);
        source.heights = Grid::from_vec(rect, source.heights.into_vec()).unwrap();
        source.layers.clear();
        let layout = ComponentLayout {
            components_x: 1,
            components_y: 1,
            subsections: 1,
            subsection_quads: 15,
        };
        let resized = change_component_setting(&source, &layout, true).unwrap();
        assert_eq!(resized.data.extent(), IntRect::new(30, 30, 45, 45));
        assert_eq!(resized.scale_factor, 7.0 / 15.0);
    }

    #[test]
    fn grow_without_resample_centres_and_clamps() {
        let source = landscape(8, 7);
        let layout = ComponentLayout {
            components_x: 2,
            components_y: 2,
            subsections: 1,
            subsection_quads: 7,
        };
        let resized = change_component_setting(&source, &layout, false).unwrap();
        assert_eq!(resized.offset_quads, IntPoint::new(-3, -3));
        let heights = &resized.data.heights;
        assert_eq!(heights.rect(), IntRect::new(0, 0, 14, 14));
        assert_eq!(heights.get(0, 0), source.heights.get(0, 0));
        assert_eq!(heights.get(3, 3), source.heights.get(0, 0));
        assert_eq!(heights.get(5, 4), source.heights.get(2, 1));
        assert_eq!(heights.get(14, 14), source.heights.get(7, 7));
        let grass = &resized.data.layers[0].1;
        assert_eq!(grass.get(5, 4), source.layers[0].1.get(2, 1));
    }

    #[test]
    fn shrink_without_resample_crops_centre() {
        let source = landscape(15, 7);
        let layout = ComponentLayout {
            components_x: 1,
            components_y: 1,
            subsections: 1,
            subsection_quads: 7,
        };
        let resized = change_component_setting(&source, &layout, false).unwrap();
        assert_eq!(resized.offset_quads, IntPoint::new(3, 3));
        assert_eq!(resized.data.heights.get(0, 0), source.heights.get(3, 3));
        assert_eq!(resized.data.heights.get(7, 7), source.heights.get(10, 10));
    }

    #[test]
    fn mismatched_layers_are_rejected() {
        let mut source = landscape(8, 7);
        source.layers[0].1 = Grid::new(IntRect::from_size(4, 4), 0);
        assert!(change_component_setting(&source, &ComponentLayout::default(), true).is_err());
    }
}
