use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::falloff::{Falloff, FalloffParams};
use crate::{
    datatypes::{Grid, IntPoint, IntRect, Sample},
    sampling::AlphaTexture,
};

/// Strokes longer than this are thinned before compositing.
pub const MAX_STROKE_POINTS: usize = 10;

/// Dense per-vertex brush weights over a bounding rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct BrushStamp {
    weights: Grid<f32>,
}

impl BrushStamp {
    pub fn new(rect: IntRect) -> Self {
        Self {
            weights: Grid::new(rect, 0.0),
        }
    }

    pub fn empty() -> Self {
        Self {
            weights: Grid::empty(),
        }
    }

    pub fn rect(&self) -> IntRect {
        self.weights.rect()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weight at `(x, y)`; 0 outside the stamp.
    pub fn weight(&self, x: i32, y: i32) -> f32 {
        self.weights.get(x, y).unwrap_or(0.0)
    }

    /// Raises the weight at `(x, y)` to `weight` if it is larger.
    pub fn merge_max(&mut self, x: i32, y: i32, weight: f32) {
        if let Some(slot) = self.weights.get_mut(x, y) {
            if weight > *slot {
                *slot = weight;
            }
        }
    }

    pub fn grid(&self) -> &Grid<f32> {
        &self.weights
    }

    pub fn into_grid(self) -> Grid<f32> {
        self.weights
    }

    /// Vertices carrying a non-zero weight, row-major.
    pub fn painted(&self) -> impl Iterator<Item = (IntPoint, f32)> + '_ {
        self.rect()
            .points()
            .zip(self.weights.data().iter().copied())
            .filter(|(_, w)| *w > 0.0)
    }
}

/// Region selection painted by the mask tool.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionMask {
    pub values: HashMap<IntPoint, f32>,
    #[serde(default)]
    pub negate: bool,
}

impl SelectionMask {
    pub fn new(values: HashMap<IntPoint, f32>, negate: bool) -> Self {
        Self { values, negate }
    }

    /// An empty selection does not mask anything.
    pub fn is_enabled(&self) -> bool {
        !self.values.is_empty()
    }

    /// Multiplier at `(x, y)`. Unselected vertices read 0 (1 when negated).
    pub fn factor(&self, x: i32, y: i32) -> f32 {
        let value = self
            .values
            .get(&IntPoint::new(x, y))
            .copied()
            .unwrap_or(0.0);
        if self.negate { 1.0 - value } else { value }
    }
}

/// Texture placement for pattern brushes, in heightfield-local space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternMapping {
    /// Heightfield vertices per texel.
    pub scale: f32,
    pub pan_u: f32,
    pub pan_v: f32,
    /// Degrees.
    pub rotation: f32,
}

impl Default for PatternMapping {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pan_u: 0.0,
            pan_v: 0.0,
            rotation: 0.0,
        }
    }
}

impl PatternMapping {
    fn texel(&self, texture: &AlphaTexture, x: f32, y: f32) -> Vec2 {
        let inv_scale = if self.scale.abs() > f32::EPSILON {
            1.0 / self.scale
        } else {
            1.0
        };
        let bias = Vec2::new(
            texture.width() as f32 * self.pan_u,
            texture.height() as f32 * self.pan_v,
        );
        let position = Vec2::new(x, y) * inv_scale + bias;
        Vec2::from_angle(self.rotation.to_radians()).rotate(position)
    }
}

/// Brush footprint shape.
#[derive(Clone, Copy, Debug)]
pub enum BrushKind<'a> {
    Circle(Falloff),
    /// Tiled texture multiplied into a circular falloff.
    Pattern {
        curve: Falloff,
        texture: &'a AlphaTexture,
        mapping: PatternMapping,
    },
    /// Texture stamped once per point, fitted inside the brush radius.
    Alpha {
        texture: &'a AlphaTexture,
        /// Radians.
        angle: f32,
    },
}

/// Everything needed to turn stroke points into a [`BrushStamp`].
#[derive(Clone, Copy, Debug)]
pub struct BrushStroke<'a> {
    pub kind: BrushKind<'a>,
    pub falloff: FalloffParams,
    pub selection: Option<&'a SelectionMask>,
}

impl<'a> BrushStroke<'a> {
    pub fn circle(curve: Falloff, falloff: FalloffParams) -> Self {
        Self {
            kind: BrushKind::Circle(curve),
            falloff,
            selection: None,
        }
    }

    pub fn with_selection(mut self, selection: &'a SelectionMask) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Composites every stroke point into one stamp clipped to `extent`.
    ///
    /// Overlapping points keep the larger weight per vertex, so point order
    /// never changes the result.
    pub fn apply(&self, points: &[Vec2], extent: IntRect) -> BrushStamp {
        let points = decimate_points(points);
        let reach = self.falloff.extent();

        let bounds = points
            .iter()
            .map(|p| spot_bounds(*p, reach))
            .fold(IntRect::empty(), |acc, spot| acc.union(&spot))
            .clip(&extent);
        if points.is_empty() || bounds.is_empty() {
            return BrushStamp::empty();
        }

        let mut stamp = BrushStamp::new(bounds);
        let selection = self.selection.filter(|mask| mask.is_enabled());

        for point in &points {
            let spot = spot_bounds(*point, reach).clip(&bounds);
            for vertex in spot.points() {
                if stamp.weight(vertex.x, vertex.y) >= 1.0 {
                    continue;
                }
                let mut weight = self.vertex_weight(*point, vertex);
                if weight <= 0.0 {
                    continue;
                }
                if let Some(mask) = selection {
                    weight *= mask.factor(vertex.x, vertex.y);
                }
                stamp.merge_max(vertex.x, vertex.y, weight);
            }
        }

        debug!(
            brush = self.kind_name(),
            points = points.len(),
            bounds = %bounds,
            "composited brush stamp"
        );
        stamp
    }

    fn vertex_weight(&self, center: Vec2, vertex: IntPoint) -> f32 {
        let position = Vec2::new(vertex.x as f32, vertex.y as f32);
        let distance = center.distance(position);
        let FalloffParams {
            radius,
            falloff_width,
        } = self.falloff;

        match self.kind {
            BrushKind::Circle(curve) => curve.weight(distance, radius, falloff_width),
            BrushKind::Pattern {
                curve,
                texture,
                mapping,
            } => {
                let texel = mapping.texel(texture, position.x, position.y);
                curve.weight(distance, radius, falloff_width) * texture.sample_tiled(texel.x, texel.y)
            }
            BrushKind::Alpha { texture, angle } => {
                let size = Vec2::new(texture.width() as f32, texture.height() as f32);
                let reach = self.falloff.extent();
                let fit = 2.0 * (reach * reach / 2.0).sqrt() / size.max_element();
                if fit <= 0.0 {
                    return 0.0;
                }
                let local = (position - center) / fit;
                let texel = Vec2::from_angle(angle).rotate(local) + size * 0.5;
                if texel.x < 0.0 || texel.y < 0.0 || texel.x > size.x - 1.0 || texel.y > size.y - 1.0 {
                    return 0.0;
                }
                texture.sample(texel.x, texel.y)
            }
        }
    }

    fn kind_name(&self) -> &'static str {
        match self.kind {
            BrushKind::Circle(curve) => curve.name(),
            BrushKind::Pattern { .. } => "pattern",
            BrushKind::Alpha { .. } => "alpha",
        }
    }
}

/// Vertices a stamp centred on `point` may touch.
fn spot_bounds(point: Vec2, reach: f32) -> IntRect {
    IntRect::new(
        (point.x - reach).floor() as i32,
        (point.y - reach).floor() as i32,
        ((point.x + reach).ceil() - 1.0) as i32,
        ((point.y + reach).ceil() - 1.0) as i32,
    )
}

/// Thins a stroke to [`MAX_STROKE_POINTS`] evenly spaced samples, always
/// keeping the first and last point.
pub fn decimate_points(points: &[Vec2]) -> Vec<Vec2> {
    if points.len() <= MAX_STROKE_POINTS {
        return points.to_vec();
    }
    let last = points.len() - 1;
    (0..MAX_STROKE_POINTS)
        .map(|i| points[i * last / (MAX_STROKE_POINTS - 1)])
        .collect()
}

/// Rotated rectangle in grid units used by the gizmo brush.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GizmoRegion {
    pub center: Vec2,
    pub width: f32,
    pub height: f32,
    /// Degrees.
    pub yaw: f32,
}

impl GizmoRegion {
    /// Vertices the rotated rectangle may cover.
    pub fn bounds(&self) -> IntRect {
        let half = Vec2::new(self.width, self.height) * 0.5;
        let rotation = Vec2::from_angle(self.yaw.to_radians());
        let corners = [
            Vec2::new(-half.x, -half.y),
            Vec2::new(half.x, -half.y),
            Vec2::new(half.x, half.y),
            Vec2::new(-half.x, half.y),
        ]
        .map(|c| rotation.rotate(c) + self.center);
        let min = corners.iter().copied().reduce(Vec2::min).unwrap_or(self.center);
        let max = corners.iter().copied().reduce(Vec2::max).unwrap_or(self.center);
        IntRect::new(
            min.x.floor() as i32,
            min.y.floor() as i32,
            max.x.ceil() as i32,
            max.y.ceil() as i32,
        )
    }

    /// Position relative to the rectangle's corner, in its own axes.
    fn local(&self, position: Vec2) -> Vec2 {
        let inverse = Vec2::from_angle(-self.yaw.to_radians());
        inverse.rotate(position - self.center) + Vec2::new(self.width, self.height) * 0.5
    }
}

/// Stamp covering a gizmo rectangle.
///
/// With `smooth` set, weights fade towards the rectangle edges over
/// `falloff_fraction` of the half width and are smoothstepped.
pub fn gizmo_brush(
    region: &GizmoRegion,
    falloff_fraction: f32,
    smooth: bool,
    selection: Option<&SelectionMask>,
    extent: IntRect,
) -> BrushStamp {
    let bounds = region.bounds().clip(&extent);
    if bounds.is_empty() || region.width <= 0.0 || region.height <= 0.0 {
        return BrushStamp::empty();
    }

    let mut stamp = BrushStamp::new(bounds);
    let selection = selection.filter(|mask| mask.is_enabled());
    let (w, h) = (region.width, region.height);
    let (lw, lh) = (w * 0.5, h * 0.5);

    for vertex in bounds.points() {
        let local = region.local(Vec2::new(vertex.x as f32, vertex.y as f32));
        if !(local.x > 0.0 && local.x < w && local.y > 0.0 && local.y < h) {
            continue;
        }

        let mut weight = 1.0;
        if smooth {
            let offset = Vec2::new((local.x - lw).abs(), (local.y - lh).abs() * (w / h));
            let falloff_radius = lw * falloff_fraction.clamp(0.0, 1.0);
            let square_radius = lw - falloff_radius;
            let length = offset.length();
            let ratio = if length > square_radius && length > 0.0 {
                let cos = offset.x / length;
                let sin = offset.y / length;
                let edge = |along: f32, axis: f32| {
                    if falloff_radius > 0.0 {
                        1.0 - ((along - axis * square_radius) / falloff_radius).clamp(0.0, 1.0)
                    } else {
                        1.0
                    }
                };
                edge(offset.x, cos) * edge(offset.y, sin)
            } else {
                1.0
            };
            weight = ratio * ratio * (3.0 - 2.0 * ratio);
        }

        if weight > 0.0 {
            if let Some(mask) = selection {
                weight *= mask.factor(vertex.x, vertex.y);
            }
            stamp.merge_max(vertex.x, vertex.y, weight);
        }
    }

    stamp
}

impl<T: Sample> Grid<T> {
    /// Moves every stamped vertex towards `target` by `weight * strength`.
    pub fn blend_toward(&mut self, stamp: &BrushStamp, target: f32, strength: f32) {
        let strength = strength.clamp(0.0, 1.0);
        for (vertex, weight) in stamp.painted() {
            if let Some(slot) = self.get_mut(vertex.x, vertex.y) {
                let current = slot.to_f32();
                *slot = T::from_f32(current + (target - current) * weight * strength);
            }
        }
    }
}
