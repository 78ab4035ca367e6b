//! Copy/paste region captured by the landscape gizmo.
//!
//! Selected vertices live in a sparse map keyed by grid coordinate. For
//! preview and paste the map is resampled into fixed [`DATA_TEX_SIZE`]
//! square buffers: a preview mask, a height sample per texel and the
//! reconstructed vertex normals.

pub mod clipboard;
pub mod frame;

pub use clipboard::*;
pub use frame::*;

use std::{collections::BTreeMap, ops::BitOr, path::Path};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    datatypes::{FileResolution, HeightSample, IntPoint, IntRect, Sample, WeightSample},
    error::TerrafieldError,
    file_format::{HeightmapFileFormat, RawHeightmapFormat, RawWeightmapFormat, WeightmapFileFormat},
    sampling::bilerp,
};

/// Side length of the gizmo sample buffers.
pub const DATA_TEX_SIZE: usize = 128;

const DATA_TEX_TEXELS: usize = DATA_TEX_SIZE * DATA_TEX_SIZE;
const MIN_HEIGHT_RANGE: f32 = 1.0e-4;

/// Channels held by a gizmo. Flags combine with `|`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GizmoDataType(u8);

impl GizmoDataType {
    pub const NONE: Self = Self(0);
    pub const HEIGHT: Self = Self(1);
    pub const WEIGHT: Self = Self(2);
    pub const ALL: Self = Self(3);

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Unknown bits are dropped.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for GizmoDataType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One selected vertex.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GizmoSelectData {
    /// Selection strength in [0, 1].
    pub ratio: f32,
    /// Height normalized to [0, 1] over the full sample range.
    pub height: f32,
    /// Layer name to raw weight (0-255 scale).
    pub weights: BTreeMap<String, f32>,
}

/// A weight layer handed to [`GizmoData::import`].
#[derive(Clone, Copy, Debug)]
pub struct GizmoLayer<'a> {
    pub name: &'a str,
    pub weights: &'a [WeightSample],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GizmoData {
    data_type: GizmoDataType,
    selected: BTreeMap<IntPoint, GizmoSelectData>,
    layers: Vec<String>,
    sample_size_x: usize,
    sample_size_y: usize,
    texture_scale: Vec2,
    sampled_height: Vec<Vec3>,
    sampled_normal: Vec<Vec3>,
    preview: Vec<u8>,
    cached_width: f32,
    cached_height: f32,
    cached_scale_xy: f32,
    min_relative_z: f32,
    relative_scale_z: f32,
}

impl Default for GizmoData {
    fn default() -> Self {
        Self {
            data_type: GizmoDataType::NONE,
            selected: BTreeMap::new(),
            layers: Vec::new(),
            sample_size_x: 0,
            sample_size_y: 0,
            texture_scale: Vec2::ONE,
            sampled_height: vec![Vec3::ZERO; DATA_TEX_TEXELS],
            sampled_normal: vec![Vec3::ZERO; DATA_TEX_TEXELS],
            preview: vec![u8::MAX; DATA_TEX_TEXELS],
            cached_width: 0.0,
            cached_height: 0.0,
            cached_scale_xy: 1.0,
            min_relative_z: 0.0,
            relative_scale_z: 1.0,
        }
    }
}

impl GizmoData {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn data_type(&self) -> GizmoDataType {
        self.data_type
    }

    pub fn set_data_type(&mut self, data_type: GizmoDataType) {
        self.data_type = data_type;
    }

    pub fn selected(&self) -> &BTreeMap<IntPoint, GizmoSelectData> {
        &self.selected
    }

    /// Stores `data` at `point`, registering any layers its weights name.
    pub fn select(&mut self, point: IntPoint, data: GizmoSelectData) {
        for name in data.weights.keys() {
            self.add_layer(name);
        }
        self.selected.insert(point, data);
    }

    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    /// Registers a weight layer, returning its index.
    pub fn add_layer(&mut self, name: &str) -> usize {
        match self.layers.iter().position(|l| l == name) {
            Some(idx) => idx,
            None => {
                self.layers.push(name.to_string());
                self.layers.len() - 1
            }
        }
    }

    pub fn sample_size(&self) -> (usize, usize) {
        (self.sample_size_x, self.sample_size_y)
    }

    pub fn texture_scale(&self) -> Vec2 {
        self.texture_scale
    }

    /// Captured width, height and XY draw scale at import time.
    pub fn cached_size(&self) -> (f32, f32, f32) {
        (self.cached_width, self.cached_height, self.cached_scale_xy)
    }

    pub fn min_relative_z(&self) -> f32 {
        self.min_relative_z
    }

    pub fn relative_scale_z(&self) -> f32 {
        self.relative_scale_z
    }

    pub fn sampled_height(&self, x: usize, y: usize) -> Option<Vec3> {
        Self::texel_index(x, y).map(|i| self.sampled_height[i])
    }

    pub fn sampled_normal(&self, x: usize, y: usize) -> Option<Vec3> {
        Self::texel_index(x, y).map(|i| self.sampled_normal[i])
    }

    /// Inverted selection mask: 0 where fully selected, 255 where not.
    pub fn preview(&self) -> &[u8] {
        &self.preview
    }

    fn texel_index(x: usize, y: usize) -> Option<usize> {
        (x < DATA_TEX_SIZE && y < DATA_TEX_SIZE).then_some(x + y * DATA_TEX_SIZE)
    }

    /// Drops the selection and its layers.
    pub fn clear(&mut self) {
        self.data_type = GizmoDataType::NONE;
        self.selected.clear();
        self.layers.clear();
    }

    /// Bounding rectangle of the selected vertices.
    pub fn selected_extent(&self) -> Option<IntRect> {
        self.selected
            .keys()
            .map(|p| IntRect::new(p.x, p.y, p.x, p.y))
            .reduce(|acc, r| acc.union(&r))
    }

    /// Resamples the selection of a `size_x` x `size_y` region into the
    /// fixed sample buffers.
    pub fn sample_data(&mut self, size_x: usize, size_y: usize) {
        let tex_size_x = DATA_TEX_SIZE.min(size_x);
        let tex_size_y = DATA_TEX_SIZE.min(size_y);
        self.sample_size_x = tex_size_x;
        self.sample_size_y = tex_size_y;
        if tex_size_x == 0 || tex_size_y == 0 {
            return;
        }

        self.texture_scale = Vec2::new(
            size_x as f32 / DATA_TEX_SIZE.max(size_x) as f32,
            size_y as f32 / DATA_TEX_SIZE.max(size_y) as f32,
        );
        let with_height = self.data_type.contains(GizmoDataType::HEIGHT);

        for y in 0..tex_size_y {
            for x in 0..tex_size_x {
                let tex_x = x as f32 * size_x as f32 / tex_size_x as f32;
                let tex_y = y as f32 * size_y as f32 / tex_size_y as f32;
                let lx = tex_x.floor() as i32;
                let ly = tex_y.floor() as i32;
                let fx = tex_x - lx as f32;
                let fy = tex_y - ly as f32;

                let corners = [(0, 0), (1, 0), (0, 1), (1, 1)]
                    .map(|(dx, dy)| self.selected.get(&IntPoint::new(lx + dx, ly + dy)));
                let blend = |field: fn(&GizmoSelectData) -> f32| {
                    let [v00, v10, v01, v11] = corners.map(|c| c.map(field).unwrap_or(0.0));
                    bilerp(v00, v10, v01, v11, fx, fy)
                };

                let idx = x + y * DATA_TEX_SIZE;
                self.preview[idx] = (255.0 - blend(|d| d.ratio) * 255.0) as u8;
                if with_height {
                    self.sampled_height[idx] = Vec3::new(lx as f32, ly as f32, blend(|d| d.height));
                }
            }
        }

        if with_height {
            self.calc_normal();
        }

        debug!(
            size_x,
            size_y,
            samples_x = tex_size_x,
            samples_y = tex_size_y,
            "sampled gizmo data"
        );
    }

    /// Rebuilds vertex normals from the sampled heights.
    ///
    /// Each quad contributes its two face normals to its corners; sums are
    /// normalized at the end.
    pub fn calc_normal(&mut self) {
        let (size_x, size_y) = (self.sample_size_x, self.sample_size_y);
        if size_x == 0 || size_y == 0 {
            return;
        }
        self.sampled_normal.fill(Vec3::ZERO);

        let at = |x: usize, y: usize| x + y * DATA_TEX_SIZE;
        for y in 0..size_y - 1 {
            for x in 0..size_x - 1 {
                let v00 = self.sampled_height[at(x, y)];
                let v01 = self.sampled_height[at(x, y + 1)];
                let v10 = self.sampled_height[at(x + 1, y)];
                let v11 = self.sampled_height[at(x + 1, y + 1)];

                let face1 = (v00 - v10).cross(v10 - v11).normalize_or_zero();
                let face2 = (v11 - v01).cross(v01 - v00).normalize_or_zero();

                self.sampled_normal[at(x, y)] += face1;
                self.sampled_normal[at(x, y + 1)] += face2;
                self.sampled_normal[at(x + 1, y)] += face1 + face2;
                self.sampled_normal[at(x + 1, y + 1)] += face1 + face2;
            }
        }

        for y in 0..size_y {
            for x in 0..size_x {
                let n = &mut self.sampled_normal[at(x, y)];
                *n = n.normalize_or_zero();
            }
        }
    }

    /// Replaces the selection with a full `verts_x` x `verts_y` block of
    /// heights and optional weight layers.
    pub fn import(
        &mut self,
        verts_x: usize,
        verts_y: usize,
        heights: &[HeightSample],
        layers: &[GizmoLayer<'_>],
        scale_xy: f32,
    ) -> Result<(), TerrafieldError> {
        let rect = IntRect::from_size(verts_x, verts_y);
        if rect.is_empty() {
            return Err(TerrafieldError::DegenerateRect(rect));
        }
        let count = rect.area();
        if heights.len() != count {
            return Err(TerrafieldError::size_mismatch(count, heights.len()));
        }
        if let Some(bad) = layers.iter().find(|l| l.weights.len() != count) {
            return Err(TerrafieldError::size_mismatch(count, bad.weights.len()));
        }

        self.clear();
        self.cached_scale_xy = scale_xy;
        self.cached_width = scale_xy * verts_x as f32;
        self.cached_height = scale_xy * verts_y as f32;

        self.data_type = GizmoDataType::HEIGHT;
        if !layers.is_empty() {
            self.data_type = self.data_type | GizmoDataType::WEIGHT;
        }

        for (idx, point) in rect.points().enumerate() {
            let weights = layers
                .iter()
                .map(|l| (l.name.to_string(), l.weights[idx] as f32))
                .collect();
            self.selected.insert(
                point,
                GizmoSelectData {
                    ratio: 1.0,
                    height: heights[idx] as f32 / HeightSample::MAX as f32,
                    weights,
                },
            );
        }

        self.sample_data(verts_x, verts_y);
        for layer in layers {
            self.add_layer(layer.name);
        }

        info!(
            resource = "gizmo",
            verts_x,
            verts_y,
            layers = layers.len(),
            "imported gizmo data"
        );
        Ok(())
    }

    /// Flattens the selection into dense arrays over its bounding rectangle.
    /// Unselected vertices inside the rectangle export as 0.
    pub fn export(&self) -> Option<GizmoExport> {
        let rect = self.selected_extent()?;
        let mut heights = vec![0 as HeightSample; rect.area()];
        let mut layers: Vec<(String, Vec<WeightSample>)> = self
            .layers
            .iter()
            .map(|name| (name.clone(), vec![0; rect.area()]))
            .collect();

        for (point, data) in &self.selected {
            let Some(idx) = rect.index_of(point.x, point.y) else {
                continue;
            };
            heights[idx] = HeightSample::from_f32(data.height * HeightSample::MAX as f32);
            for (name, weights) in layers.iter_mut() {
                let weight = data.weights.get(name).copied().unwrap_or(0.0);
                weights[idx] = WeightSample::from_f32(weight);
            }
        }

        Some(GizmoExport {
            rect,
            heights,
            layers,
        })
    }

    /// Sets the relative Z window to the stored height range. Returns false
    /// when the range is too flat to fit.
    pub fn fit_min_max_height(&mut self) -> bool {
        let (min, max) = self
            .selected
            .values()
            .fold((f32::MAX, f32::MIN), |(lo, hi), d| (lo.min(d.height), hi.max(d.height)));
        if self.selected.is_empty() || max <= min + MIN_HEIGHT_RANGE {
            return false;
        }
        self.min_relative_z = min;
        self.relative_scale_z = 1.0 / (max - min);
        true
    }

    pub fn reset_relative_z(&mut self) {
        self.min_relative_z = 0.0;
        self.relative_scale_z = 1.0;
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TerrafieldError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TerrafieldError> {
        let data: GizmoData = bincode::deserialize(bytes)?;
        for buffer_len in [
            data.sampled_height.len(),
            data.sampled_normal.len(),
            data.preview.len(),
        ] {
            if buffer_len != DATA_TEX_TEXELS {
                return Err(TerrafieldError::size_mismatch(DATA_TEX_TEXELS, buffer_len));
            }
        }
        if data.sample_size_x > DATA_TEX_SIZE || data.sample_size_y > DATA_TEX_SIZE {
            return Err(TerrafieldError::Snapshot(format!(
                "sample size {}x{} exceeds {DATA_TEX_SIZE}",
                data.sample_size_x, data.sample_size_y
            )));
        }
        Ok(data)
    }
}

/// Dense copy of a gizmo selection.
#[derive(Clone, Debug, PartialEq)]
pub struct GizmoExport {
    pub rect: IntRect,
    pub heights: Vec<HeightSample>,
    pub layers: Vec<(String, Vec<WeightSample>)>,
}

impl GizmoExport {
    pub fn resolution(&self) -> FileResolution {
        FileResolution::new(self.rect.width() as u32, self.rect.height() as u32)
    }

    /// Writes heights and one file per layer as raw little-endian samples.
    pub fn write_raw<P: AsRef<Path>>(
        &self,
        height_path: impl AsRef<Path>,
        layer_paths: &[P],
    ) -> Result<(), TerrafieldError> {
        if layer_paths.len() != self.layers.len() {
            return Err(TerrafieldError::size_mismatch(
                self.layers.len(),
                layer_paths.len(),
            ));
        }
        let resolution = self.resolution();
        RawHeightmapFormat.export(height_path.as_ref(), &self.heights, resolution)?;
        for ((_, weights), path) in self.layers.iter().zip(layer_paths) {
            RawWeightmapFormat.export(path.as_ref(), weights, resolution)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imported(verts_x: usize, verts_y: usize, heights: &[u16]) -> GizmoData {
        let mut gizmo = GizmoData::new();
        gizmo
            .import(verts_x, verts_y, heights, &[], 1.0)
            .expect("import");
        gizmo
    }

    #[test]
    fn flat_heights_give_up_normals() {
        let gizmo = imported(4, 4, &[40000; 16]);
        for y in 0..4 {
            for x in 0..4 {
                let n = gizmo.sampled_normal(x, y).unwrap();
                assert!((n - Vec3::Z).length() < 1e-6, "({x}, {y}) -> {n}");
            }
        }
        assert_eq!(gizmo.sampled_normal(4, 0), Some(Vec3::ZERO));
    }

    #[test]
    fn sloped_heights_tilt_normals() {
        let heights: Vec<u16> = (0..9).map(|i| (i % 3) as u16 * 30000).collect();
        let gizmo = imported(3, 3, &heights);
        let n = gizmo.sampled_normal(1, 1).unwrap();
        assert!(n.x < 0.0 && n.z > 0.0, "{n}");
        assert!((n.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn import_export_round_trip() {
        let heights: Vec<u16> = vec![0, 1, 32768, 40000, 65534, 65535];
        let grass = [0u8, 10, 20, 128, 254, 255];
        let rock = [255u8, 0, 1, 2, 3, 4];
        let mut gizmo = GizmoData::new();
        gizmo
            .import(
                3,
                2,
                &heights,
                &[
                    GizmoLayer { name: "grass", weights: &grass },
                    GizmoLayer { name: "rock", weights: &rock },
                ],
                2.0,
            )
            .unwrap();
        assert_eq!(gizmo.data_type(), GizmoDataType::ALL);
        assert_eq!(gizmo.cached_size(), (6.0, 4.0, 2.0));

        let export = gizmo.export().unwrap();
        assert_eq!(export.rect, IntRect::new(0, 0, 2, 1));
        assert_eq!(export.heights, heights);
        assert_eq!(export.layers[0], ("grass".to_string(), grass.to_vec()));
        assert_eq!(export.layers[1], ("rock".to_string(), rock.to_vec()));
    }

    #[test]
    fn import_rejects_short_buffers() {
        let mut gizmo = GizmoData::new();
        assert!(gizmo.import(2, 2, &[0; 3], &[], 1.0).is_err());
        let layer = GizmoLayer { name: "grass", weights: &[0; 2] };
        assert!(gizmo.import(2, 2, &[0; 4], &[layer], 1.0).is_err());
        assert!(gizmo.import(0, 2, &[], &[], 1.0).is_err());
        assert!(gizmo.selected().is_empty());
    }

    #[test]
    fn preview_marks_selection_and_blends_missing_as_zero() {
        let mut gizmo = GizmoData::new();
        gizmo.set_data_type(GizmoDataType::HEIGHT);
        gizmo.select(
            IntPoint::new(1, 0),
            GizmoSelectData { ratio: 1.0, height: 0.5, ..Default::default() },
        );
        // 192 vertices over 128 texels puts texel 1 halfway between vertices 1 and 2.
        gizmo.sample_data(192, 192);
        assert_eq!(gizmo.sample_size(), (128, 128));
        assert_eq!(gizmo.texture_scale(), Vec2::ONE);
        assert_eq!(gizmo.preview()[1], 127);
        assert_eq!(gizmo.sampled_height(1, 0), Some(Vec3::new(1.0, 0.0, 0.25)));
        assert_eq!(gizmo.preview()[0], 255);
    }

    #[test]
    fn small_regions_sample_one_to_one() {
        let gizmo = imported(2, 3, &[100, 200, 300, 400, 500, 600]);
        assert_eq!(gizmo.sample_size(), (2, 3));
        assert_eq!(gizmo.texture_scale(), Vec2::new(2.0 / 128.0, 3.0 / 128.0));
        assert_eq!(gizmo.preview()[0], 0);
        assert_eq!(gizmo.preview()[1 + 2 * DATA_TEX_SIZE], 0);
        let z = gizmo.sampled_height(1, 2).unwrap().z;
        assert_eq!(z, 600.0 / 65535.0);
    }

    #[test]
    fn fit_min_max_needs_a_height_range() {
        let mut flat = imported(2, 1, &[1000, 1000]);
        assert!(!flat.fit_min_max_height());
        assert_eq!(flat.relative_scale_z(), 1.0);

        let mut gizmo = imported(2, 1, &[0, 65535]);
        assert!(gizmo.fit_min_max_height());
        assert_eq!(gizmo.min_relative_z(), 0.0);
        assert_eq!(gizmo.relative_scale_z(), 1.0);
    }

    #[test]
    fn extent_and_clear() {
        let mut gizmo = GizmoData::new();
        assert_eq!(gizmo.selected_extent(), None);
        assert!(gizmo.export().is_none());
        gizmo.select(IntPoint::new(3, -2), GizmoSelectData::default());
        gizmo.select(IntPoint::new(-1, 5), GizmoSelectData::default());
        assert_eq!(gizmo.selected_extent(), Some(IntRect::new(-1, -2, 3, 5)));
        gizmo.add_layer("grass");
        gizmo.clear();
        assert!(gizmo.selected().is_empty());
        assert!(gizmo.layers().is_empty());
        assert!(gizmo.data_type().is_none());
    }

    #[test]
    fn binary_snapshot_round_trip() {
        let grass = [7u8; 4];
        let mut gizmo = GizmoData::new();
        gizmo
            .import(2, 2, &[1, 2, 3, 4], &[GizmoLayer { name: "grass", weights: &grass }], 1.0)
            .unwrap();
        let bytes = gizmo.to_bytes().unwrap();
        assert_eq!(GizmoData::from_bytes(&bytes).unwrap(), gizmo);
        assert!(GizmoData::from_bytes(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn snapshot_rejects_oversized_samples() {
        let mut gizmo = imported(2, 2, &[1, 2, 3, 4]);
        gizmo.sample_size_x = DATA_TEX_SIZE + 72;
        gizmo.sample_size_y = DATA_TEX_SIZE + 72;
        let bytes = bincode::serialize(&gizmo).unwrap();
        assert!(matches!(
            GizmoData::from_bytes(&bytes),
            Err(TerrafieldError::Snapshot(_))
        ));

        gizmo.sample_size_x = DATA_TEX_SIZE;
        gizmo.sample_size_y = DATA_TEX_SIZE;
        let restored = GizmoData::from_bytes(&gizmo.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.sample_size(), (DATA_TEX_SIZE, DATA_TEX_SIZE));
    }

    #[test]
    fn select_registers_weight_layers() {
        let mut gizmo = GizmoData::new();
        gizmo.add_layer("grass");
        gizmo.select(
            IntPoint::new(1, 1),
            GizmoSelectData {
                ratio: 1.0,
                height: 0.5,
                weights: [("rock".to_string(), 3.0), ("grass".to_string(), 1.0)].into(),
            },
        );
        assert_eq!(gizmo.layers(), &["grass".to_string(), "rock".to_string()]);
    }

    #[test]
    fn data_type_flags() {
        let both = GizmoDataType::HEIGHT | GizmoDataType::WEIGHT;
        assert_eq!(both, GizmoDataType::ALL);
        assert!(both.contains(GizmoDataType::WEIGHT));
        assert!(!GizmoDataType::HEIGHT.contains(GizmoDataType::WEIGHT));
        assert_eq!(GizmoDataType::from_bits(0xff), GizmoDataType::ALL);
    }
}
