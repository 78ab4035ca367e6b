//! Bilinear point sampling over row-major sample buffers.
//!
//! Point sampling clamps coordinates to the buffer edge. Tiling lookups that
//! wrap live in [`alpha`].

pub mod alpha;

pub use alpha::*;

use crate::datatypes::{Grid, Sample};

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Blends four corner values; `fx` runs from the `x0` to the `x1` column.
#[inline]
pub fn bilerp(v00: f32, v10: f32, v01: f32, v11: f32, fx: f32, fy: f32) -> f32 {
    lerp(lerp(v00, v10, fx), lerp(v01, v11, fx), fy)
}

/// Samples a `width` x `height` buffer at fractional `(x, y)`.
///
/// Coordinates are clamped to `[0, width - 1]` and `[0, height - 1]`, so
/// integer coordinates return the stored value exactly. An empty buffer
/// samples as 0.
pub fn sample_bilinear<T: Sample>(data: &[T], width: usize, height: usize, x: f32, y: f32) -> f32 {
    if width == 0 || height == 0 || data.len() < width * height {
        return 0.0;
    }

    let x = x.clamp(0.0, (width - 1) as f32);
    let y = y.clamp(0.0, (height - 1) as f32);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    bilerp(
        data[y0 * width + x0].to_f32(),
        data[y0 * width + x1].to_f32(),
        data[y1 * width + x0].to_f32(),
        data[y1 * width + x1].to_f32(),
        fx,
        fy,
    )
}

impl<T: Sample> Grid<T> {
    /// Bilinear sample at absolute heightfield coordinates, clamped to the grid.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let rect = self.rect();
        sample_bilinear(
            self.data(),
            self.width(),
            self.height(),
            x - rect.min.x as f32,
            y - rect.min.y as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::IntRect;

    fn two_by_two() -> Grid<u16> {
        Grid::from_vec(IntRect::new(0, 0, 1, 1), vec![10, 20, 30, 40]).unwrap()
    }

    #[test]
    fn integer_coordinates_are_exact() {
        let grid = two_by_two();
        assert_eq!(grid.sample(0.0, 0.0), 10.0);
        assert_eq!(grid.sample(1.0, 0.0), 20.0);
        assert_eq!(grid.sample(0.0, 1.0), 30.0);
        assert_eq!(grid.sample(1.0, 1.0), 40.0);
    }

    #[test]
    fn fractional_coordinates_blend() {
        let grid = two_by_two();
        assert_eq!(grid.sample(0.5, 0.0), 15.0);
        assert_eq!(grid.sample(0.0, 0.5), 20.0);
        assert_eq!(grid.sample(0.5, 0.5), 25.0);
    }

    #[test]
    fn out_of_range_clamps_to_edge() {
        let grid = two_by_two();
        assert_eq!(grid.sample(-3.0, -3.0), 10.0);
        assert_eq!(grid.sample(9.0, 9.0), 40.0);
    }

    #[test]
    fn offset_grids_sample_in_absolute_coordinates() {
        let grid = Grid::from_vec(IntRect::new(4, 7, 5, 8), vec![1u8, 3, 5, 7]).unwrap();
        assert_eq!(grid.sample(4.0, 7.0), 1.0);
        assert_eq!(grid.sample(5.0, 8.0), 7.0);
        assert_eq!(grid.sample(4.5, 7.5), 4.0);
    }
}
