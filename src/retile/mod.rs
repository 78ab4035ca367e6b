//! Grid re-tiling: placing a block into a new rectangle and bilinear resize.
//!
//! Both operations read only inside the source; anything past its edge
//! repeats the nearest edge row or column.

pub mod resize;

pub use resize::*;

use tracing::debug;

use crate::{
    datatypes::{Grid, IntRect, Sample},
    error::TerrafieldError,
    sampling::bilerp,
};

/// Copies `source` (laid out over `src_rect`) into a new buffer covering
/// `dst_rect`. Destination cells outside `src_rect` take the nearest source
/// edge value.
pub fn expand_data<T: Copy>(
    source: &[T],
    src_rect: IntRect,
    dst_rect: IntRect,
) -> Result<Vec<T>, TerrafieldError> {
    if src_rect.is_empty() {
        return Err(TerrafieldError::DegenerateRect(src_rect));
    }
    if dst_rect.is_empty() {
        return Err(TerrafieldError::DegenerateRect(dst_rect));
    }
    if source.len() != src_rect.area() {
        return Err(TerrafieldError::size_mismatch(src_rect.area(), source.len()));
    }

    let src_width = src_rect.width();
    let data = dst_rect
        .points()
        .map(|p| {
            let sx = p.x.clamp(src_rect.min.x, src_rect.max.x) - src_rect.min.x;
            let sy = p.y.clamp(src_rect.min.y, src_rect.max.y) - src_rect.min.y;
            source[sy as usize * src_width + sx as usize]
        })
        .collect();

    debug!(from = %src_rect, to = %dst_rect, "expanded grid data");
    Ok(data)
}

fn resample_scale(old: usize, new: usize) -> f32 {
    if new > 1 {
        (old - 1) as f32 / (new - 1) as f32
    } else {
        0.0
    }
}

/// Bilinear resize of a `old_width` x `old_height` buffer. The corner
/// samples map onto each other; a new dimension of 1 snaps to the source
/// origin on that axis.
pub fn resample_data<T: Sample>(
    source: &[T],
    old_width: usize,
    old_height: usize,
    new_width: usize,
    new_height: usize,
) -> Result<Vec<T>, TerrafieldError> {
    if old_width == 0 || old_height == 0 {
        return Err(TerrafieldError::DegenerateRect(IntRect::from_size(old_width, old_height)));
    }
    if new_width == 0 || new_height == 0 {
        return Err(TerrafieldError::DegenerateRect(IntRect::from_size(new_width, new_height)));
    }
    if source.len() != old_width * old_height {
        return Err(TerrafieldError::size_mismatch(old_width * old_height, source.len()));
    }

    let scale_x = resample_scale(old_width, new_width);
    let scale_y = resample_scale(old_height, new_height);
    let at = |x: usize, y: usize| source[y * old_width + x].to_f32();

    let mut data = Vec::with_capacity(new_width * new_height);
    for y in 0..new_height {
        let old_y = y as f32 * scale_y;
        let y0 = (old_y.floor() as usize).min(old_height - 1);
        let y1 = (y0 + 1).min(old_height - 1);
        let fy = old_y - y0 as f32;
        for x in 0..new_width {
            let old_x = x as f32 * scale_x;
            let x0 = (old_x.floor() as usize).min(old_width - 1);
            let x1 = (x0 + 1).min(old_width - 1);
            let fx = old_x - x0 as f32;
            let value = bilerp(at(x0, y0), at(x1, y0), at(x0, y1), at(x1, y1), fx, fy);
            data.push(T::from_f32(value));
        }
    }

    debug!(old_width, old_height, new_width, new_height, "resampled grid data");
    Ok(data)
}

impl<T: Copy> Grid<T> {
    /// This grid's content placed over `rect`, edge-clamped.
    pub fn expanded(&self, rect: IntRect) -> Result<Grid<T>, TerrafieldError> {
        let data = expand_data(self.data(), self.rect(), rect)?;
        Grid::from_vec(rect, data)
    }
}

impl<T: Sample> Grid<T> {
    /// This grid resized to `width` x `height`, keeping its minimum corner.
    pub fn resampled(&self, width: usize, height: usize) -> Result<Grid<T>, TerrafieldError> {
        let data = resample_data(self.data(), self.width(), self.height(), width, height)?;
        let min = self.rect().min;
        let rect = IntRect::new(
            min.x,
            min.y,
            min.x + width as i32 - 1,
            min.y + height as i32 - 1,
        );
        Grid::from_vec(rect, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_clamps_to_source_edges() {
        let src = IntRect::new(0, 0, 1, 1);
        let dst = IntRect::new(-1, -1, 2, 2);
        let out = expand_data(&[1u16, 2, 3, 4], src, dst).unwrap();
        #[rustfmt::skip]
        assert_eq!(out, vec![
            1, 1, 2, 2,
            1, 1, 2, 2,
            3, 3, 4, 4,
            3, 3, 4, 4,
        ]);
    }

    #[test]
    fn expand_into_smaller_rect_crops() {
        let src = IntRect::new(0, 0, 2, 2);
        let data: Vec<u8> = (1..=9).collect();
        let out = expand_data(&data, src, IntRect::new(1, 1, 2, 2)).unwrap();
        assert_eq!(out, vec![5, 6, 8, 9]);
    }

    #[test]
    fn expand_rejects_bad_input() {
        assert!(expand_data(&[1u8; 3], IntRect::new(0, 0, 1, 1), IntRect::new(0, 0, 1, 1)).is_err());
        assert!(expand_data(&[1u8; 4], IntRect::new(0, 0, 1, 1), IntRect::empty()).is_err());
        assert!(expand_data::<u8>(&[], IntRect::empty(), IntRect::new(0, 0, 1, 1)).is_err());
    }

    #[test]
    fn resample_to_same_size_is_identity() {
        let data: Vec<u16> = (0..20).map(|i| i * 3000 + 7).collect();
        assert_eq!(resample_data(&data, 5, 4, 5, 4).unwrap(), data);
        let weights: Vec<u8> = (0..12).map(|i| i * 21).collect();
        assert_eq!(resample_data(&weights, 4, 3, 4, 3).unwrap(), weights);
    }

    #[test]
    fn resample_upscale_interpolates() {
        let out = resample_data(&[0u16, 100], 2, 1, 5, 1).unwrap();
        assert_eq!(out, vec![0, 25, 50, 75, 100]);
        let out = resample_data(&[0u8, 100, 200], 3, 1, 2, 1).unwrap();
        assert_eq!(out, vec![0, 200]);
    }

    #[test]
    fn resample_to_single_sample_snaps_to_origin() {
        let out = resample_data(&[10u16, 20, 30, 40], 2, 2, 1, 1).unwrap();
        assert_eq!(out, vec![10]);
        let out = resample_data(&[10u16, 20, 30, 40], 2, 2, 3, 1).unwrap();
        assert_eq!(out, vec![10, 15, 20]);
    }

    #[test]
    fn resample_rejects_degenerate_sizes() {
        assert!(resample_data(&[1u8; 4], 2, 2, 0, 3).is_err());
        assert!(resample_data(&[1u8; 4], 2, 3, 4, 4).is_err());
        assert!(resample_data::<u8>(&[], 0, 0, 2, 2).is_err());
    }

    #[test]
    fn grid_helpers_keep_min_corner() {
        let grid = Grid::from_vec(IntRect::new(4, 4, 5, 5), vec![0u16, 100, 200, 300]).unwrap();
        let bigger = grid.resampled(3, 3).unwrap();
        assert_eq!(bigger.rect(), IntRect::new(4, 4, 6, 6));
        assert_eq!(bigger.get(5, 5), Some(150));
        let expanded = grid.expanded(IntRect::new(3, 4, 6, 4)).unwrap();
        assert_eq!(expanded.data(), &[0, 0, 100, 100]);
    }
}
