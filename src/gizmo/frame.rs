use serde::{Deserialize, Serialize};

use super::GizmoData;
use crate::datatypes::{HeightSample, local_height, local_to_sample};

const MIN_LENGTH_Z: f32 = 1.0e-4;

/// Placement of the gizmo box relative to the landscape.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GizmoFrame {
    /// Gizmo origin Z in landscape-local space.
    pub local_z: f32,
    /// World-space height of the gizmo box.
    pub length_z: f32,
    /// Landscape Z draw scale.
    pub draw_scale_z: f32,
}

impl Default for GizmoFrame {
    fn default() -> Self {
        Self {
            local_z: 0.0,
            length_z: 1.0,
            draw_scale_z: 1.0,
        }
    }
}

impl GizmoFrame {
    fn has_length(&self) -> bool {
        self.length_z > MIN_LENGTH_Z
    }

    /// Height of a landscape sample as a fraction of the gizmo box.
    pub fn normalized_height(&self, sample: HeightSample) -> f32 {
        if !self.has_length() {
            return 0.0;
        }
        (((local_height(sample) - self.local_z) * self.draw_scale_z) / self.length_z).clamp(0.0, 1.0)
    }

    pub fn world_height(&self, normalized: f32) -> f32 {
        if !self.has_length() {
            return 0.0;
        }
        normalized * self.length_z + self.local_z * self.draw_scale_z
    }

    /// Landscape-local height for a stored gizmo height, after the gizmo's
    /// relative Z window is applied.
    pub fn landscape_height(&self, gizmo: &GizmoData, normalized: f32) -> f32 {
        if self.draw_scale_z == 0.0 {
            return 0.0;
        }
        let normalized = (normalized - gizmo.min_relative_z()) * gizmo.relative_scale_z();
        self.world_height(normalized) / self.draw_scale_z
    }

    /// Sample to write when pasting a stored gizmo height.
    pub fn paste_sample(&self, gizmo: &GizmoData, normalized: f32) -> HeightSample {
        local_to_sample(self.landscape_height(gizmo, normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::HEIGHT_ZERO;

    fn frame() -> GizmoFrame {
        GizmoFrame {
            local_z: -64.0,
            length_z: 128.0,
            draw_scale_z: 1.0,
        }
    }

    #[test]
    fn normalizes_inside_the_box() {
        let frame = frame();
        assert_eq!(frame.normalized_height(HEIGHT_ZERO), 0.5);
        assert_eq!(frame.normalized_height(0), 0.0);
        assert_eq!(frame.normalized_height(u16::MAX), 1.0);
    }

    #[test]
    fn flat_box_maps_to_zero() {
        let frame = GizmoFrame { length_z: 0.0, ..frame() };
        assert_eq!(frame.normalized_height(40000), 0.0);
        assert_eq!(frame.world_height(0.7), 0.0);
    }

    #[test]
    fn paste_inverts_normalize() {
        let frame = frame();
        let gizmo = GizmoData::new();
        for sample in [HEIGHT_ZERO, 26000, 39000] {
            let n = frame.normalized_height(sample);
            assert_eq!(frame.paste_sample(&gizmo, n), sample);
        }
    }
}
