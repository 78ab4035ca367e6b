use serde::{Deserialize, Serialize};

use super::rect::IntRect;
use crate::error::TerrafieldError;

/// Height value that represents zero elevation.
pub const HEIGHT_ZERO: u16 = 32768;

/// Local-space height range covered by the full `u16` sample domain.
pub const LOCAL_HEIGHT_RANGE: f32 = 256.0;

pub type HeightSample = u16;
pub type WeightSample = u8;

/// Fixed-width channel value stored in a heightfield grid.
pub trait Sample: Copy + Default + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    const MAX: f32;

    fn to_f32(self) -> f32;

    /// Rounds to the nearest representable value, saturating at the channel range.
    fn from_f32(value: f32) -> Self;
}

impl Sample for u16 {
    const MAX: f32 = u16::MAX as f32;

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_f32(value: f32) -> Self {
        value.round().clamp(0.0, <Self as Sample>::MAX) as u16
    }
}

impl Sample for u8 {
    const MAX: f32 = u8::MAX as f32;

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_f32(value: f32) -> Self {
        value.round().clamp(0.0, <Self as Sample>::MAX) as u8
    }
}

/// Height relative to [`HEIGHT_ZERO`], in [-1, 1).
pub fn signed_unit_height(sample: HeightSample) -> f32 {
    (sample as f32 - HEIGHT_ZERO as f32) / HEIGHT_ZERO as f32
}

/// Heightfield-local elevation of a sample.
pub fn local_height(sample: HeightSample) -> f32 {
    signed_unit_height(sample) * LOCAL_HEIGHT_RANGE
}

/// Inverse of [`local_height`], saturating at the sample range.
pub fn local_to_sample(local: f32) -> HeightSample {
    HeightSample::from_f32(local / LOCAL_HEIGHT_RANGE * HEIGHT_ZERO as f32 + HEIGHT_ZERO as f32)
}

/// Row-major 2D block of values addressed by absolute heightfield coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "GridParts<T>",
    bound(deserialize = "T: Copy + Deserialize<'de>")
)]
pub struct Grid<T> {
    rect: IntRect,
    data: Vec<T>,
}

/// Unchecked wire form of a [`Grid`].
#[derive(Deserialize)]
struct GridParts<T> {
    rect: IntRect,
    data: Vec<T>,
}

impl<T: Copy> TryFrom<GridParts<T>> for Grid<T> {
    type Error = TerrafieldError;

    fn try_from(parts: GridParts<T>) -> Result<Self, Self::Error> {
        Grid::from_vec(parts.rect, parts.data)
    }
}

pub type HeightGrid = Grid<HeightSample>;
pub type WeightGrid = Grid<WeightSample>;

impl<T: Copy> Grid<T> {
    pub fn new(rect: IntRect, fill: T) -> Self {
        Self {
            rect,
            data: vec![fill; rect.area()],
        }
    }

    pub fn from_vec(rect: IntRect, data: Vec<T>) -> Result<Self, TerrafieldError> {
        if data.len() != rect.area() {
            return Err(TerrafieldError::size_mismatch(rect.area(), data.len()));
        }
        Ok(Self { rect, data })
    }

    pub fn empty() -> Self {
        Self {
            rect: IntRect::empty(),
            data: Vec::new(),
        }
    }

    pub fn rect(&self) -> IntRect {
        self.rect
    }

    pub fn width(&self) -> usize {
        self.rect.width()
    }

    pub fn height(&self) -> usize {
        self.rect.height()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn get(&self, x: i32, y: i32) -> Option<T> {
        self.rect.index_of(x, y).map(|idx| self.data[idx])
    }

    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut T> {
        let idx = self.rect.index_of(x, y)?;
        self.data.get_mut(idx)
    }

    /// Writes `value` at `(x, y)`. Returns false when outside the grid.
    pub fn set(&mut self, x: i32, y: i32, value: T) -> bool {
        match self.get_mut(x, y) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn row(&self, y: i32) -> Option<&[T]> {
        if y < self.rect.min.y || y > self.rect.max.y {
            return None;
        }
        let width = self.width();
        let start = (y - self.rect.min.y) as usize * width;
        self.data.get(start..start + width)
    }

    /// Copies the part of the grid covered by `rect`.
    pub fn crop(&self, rect: IntRect) -> Result<Self, TerrafieldError> {
        let clipped = self.rect.clip(&rect);
        if clipped != rect || rect.is_empty() {
            return Err(TerrafieldError::DegenerateRect(rect));
        }
        let data = rect
            .points()
            .filter_map(|p| self.get(p.x, p.y))
            .collect::<Vec<_>>();
        Self::from_vec(rect, data)
    }
}
