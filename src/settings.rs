use std::{collections::HashMap, path::Path};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    brush::{Falloff, FalloffParams, PatternMapping, SelectionMask},
    datatypes::IntPoint,
    error::TerrafieldError,
    retile::ComponentLayout,
    sampling::AlphaChannel,
};

fn default_brush_radius() -> f32 {
    2048.0
}

fn default_brush_falloff() -> f32 {
    0.5
}

fn default_tool_strength() -> f32 {
    0.3
}

fn default_alpha_scale() -> f32 {
    0.5
}

fn default_alpha_pan() -> f32 {
    0.5
}

fn default_draw_scale() -> Vec3 {
    Vec3::splat(100.0)
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushSettings {
    /// World units.
    #[serde(default = "default_brush_radius")]
    pub radius: f32,
    /// Fraction of the radius used for the taper.
    #[serde(default = "default_brush_falloff")]
    pub falloff: f32,
    #[serde(default)]
    pub curve: Falloff,
    #[serde(default = "default_tool_strength")]
    pub strength: f32,
    #[serde(default = "default_alpha_scale")]
    pub alpha_scale: f32,
    #[serde(default = "default_true")]
    pub alpha_auto_rotate: bool,
    /// Degrees.
    #[serde(default)]
    pub alpha_rotation: f32,
    #[serde(default = "default_alpha_pan")]
    pub alpha_pan_u: f32,
    #[serde(default = "default_alpha_pan")]
    pub alpha_pan_v: f32,
    #[serde(default)]
    pub alpha_channel: AlphaChannel,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            radius: default_brush_radius(),
            falloff: default_brush_falloff(),
            curve: Falloff::default(),
            strength: default_tool_strength(),
            alpha_scale: default_alpha_scale(),
            alpha_auto_rotate: true,
            alpha_rotation: 0.0,
            alpha_pan_u: default_alpha_pan(),
            alpha_pan_v: default_alpha_pan(),
            alpha_channel: AlphaChannel::default(),
        }
    }
}

impl BrushSettings {
    /// Brush size in grid units for a landscape drawn at `scale_xy`.
    pub fn falloff_params(&self, scale_xy: f32) -> FalloffParams {
        let scale_xy = scale_xy.abs();
        let total = if scale_xy > 0.0 {
            self.radius / scale_xy
        } else {
            0.0
        };
        FalloffParams::from_total(total, self.falloff)
    }

    pub fn pattern_mapping(&self) -> PatternMapping {
        PatternMapping {
            scale: self.alpha_scale,
            pan_u: self.alpha_pan_u,
            pan_v: self.alpha_pan_v,
            rotation: self.alpha_rotation,
        }
    }
}

/// Editor options persisted between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    #[serde(default)]
    pub brush: BrushSettings,
    #[serde(default = "default_true")]
    pub use_selected_region: bool,
    #[serde(default = "default_true")]
    pub use_negative_mask: bool,
    #[serde(default = "default_true")]
    pub smooth_gizmo_brush: bool,
    #[serde(default = "default_draw_scale")]
    pub draw_scale: Vec3,
    #[serde(default)]
    pub layout: ComponentLayout,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            brush: BrushSettings::default(),
            use_selected_region: true,
            use_negative_mask: true,
            smooth_gizmo_brush: true,
            draw_scale: default_draw_scale(),
            layout: ComponentLayout::default(),
        }
    }
}

impl EditorSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TerrafieldError> {
        let path = path.as_ref();
        let settings: EditorSettings = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        info!(resource = "settings", path = %path.display());
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TerrafieldError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn falloff_params(&self) -> FalloffParams {
        self.brush.falloff_params(self.draw_scale.x)
    }

    /// Wraps painted region values in a mask, or `None` when region
    /// selection is switched off.
    pub fn selection_mask(&self, values: HashMap<IntPoint, f32>) -> Option<SelectionMask> {
        self.use_selected_region
            .then(|| SelectionMask::new(values, self.use_negative_mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: EditorSettings =
            serde_json::from_str(r#"{ "brush": { "radius": 500.0, "curve": "tip" } }"#).unwrap();
        assert_eq!(settings.brush.radius, 500.0);
        assert_eq!(settings.brush.curve, Falloff::Tip);
        assert_eq!(settings.brush.falloff, 0.5);
        assert!(settings.smooth_gizmo_brush);
        assert_eq!(settings.draw_scale, Vec3::splat(100.0));

        let empty: EditorSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, EditorSettings::default());
    }

    #[test]
    fn brush_size_in_grid_units() {
        let brush = BrushSettings {
            radius: 1000.0,
            falloff: 0.25,
            ..Default::default()
        };
        let params = brush.falloff_params(-100.0);
        assert_eq!(params.extent(), 10.0);
        assert_eq!(params.radius, 7.5);
        assert_eq!(params.falloff_width, 2.5);
        assert_eq!(brush.falloff_params(0.0).extent(), 0.0);
    }

    #[test]
    fn selection_follows_flags() {
        let mut settings = EditorSettings::default();
        let mask = settings.selection_mask(HashMap::new()).unwrap();
        assert!(mask.negate);
        settings.use_selected_region = false;
        assert!(settings.selection_mask(HashMap::new()).is_none());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.json");
        let mut settings = EditorSettings::default();
        settings.brush.curve = Falloff::Spherical;
        settings.layout.components_x = 4;
        settings.save(&path).unwrap();
        assert_eq!(EditorSettings::load(&path).unwrap(), settings);
        assert!(EditorSettings::load(dir.path().join("missing.json")).is_err());
    }
}
