use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

/// Integer vertex coordinate in heightfield space.
///
/// Ordering is row-major (Y first, then X) so ordered maps keyed by
/// `IntPoint` iterate in the same order grids are stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntPoint {
    pub x: i32,
    pub y: i32,
}

impl IntPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Ord for IntPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.y.cmp(&other.y).then(self.x.cmp(&other.x))
    }
}

impl PartialOrd for IntPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for IntPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Inclusive integer rectangle: both `min` and `max` are addressable vertices.
///
/// A rectangle whose `max` is below its `min` on either axis is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntRect {
    pub min: IntPoint,
    pub max: IntPoint,
}

impl IntRect {
    pub const fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min: IntPoint::new(min_x, min_y),
            max: IntPoint::new(max_x, max_y),
        }
    }

    /// Rectangle anchored at the origin covering `width` x `height` vertices.
    pub fn from_size(width: usize, height: usize) -> Self {
        Self::new(0, 0, width as i32 - 1, height as i32 - 1)
    }

    pub const fn empty() -> Self {
        Self::new(0, 0, -1, -1)
    }

    pub fn width(&self) -> usize {
        (self.max.x as i64 - self.min.x as i64 + 1).max(0) as usize
    }

    pub fn height(&self) -> usize {
        (self.max.y as i64 - self.min.y as i64 + 1).max(0) as usize
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min.x && x <= self.max.x && y >= self.min.y && y <= self.max.y
    }

    /// Row-major offset of `(x, y)` inside the rectangle.
    pub fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if !self.contains(x, y) {
            return None;
        }
        let local_x = (x as i64 - self.min.x as i64) as usize;
        let local_y = (y as i64 - self.min.y as i64) as usize;
        Some(local_y * self.width() + local_x)
    }

    /// Intersection with `other`. The result may be empty.
    pub fn clip(&self, other: &IntRect) -> IntRect {
        IntRect::new(
            self.min.x.max(other.min.x),
            self.min.y.max(other.min.y),
            self.max.x.min(other.max.x),
            self.max.y.min(other.max.y),
        )
    }

    /// Smallest rectangle covering both. Empty inputs are ignored.
    pub fn union(&self, other: &IntRect) -> IntRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        IntRect::new(
            self.min.x.min(other.min.x),
            self.min.y.min(other.min.y),
            self.max.x.max(other.max.x),
            self.max.y.max(other.max.y),
        )
    }

    /// Vertices in row-major order.
    pub fn points(self) -> impl Iterator<Item = IntPoint> {
        let (min_x, max_x) = (self.min.x, self.max.x);
        (self.min.y..=self.max.y)
            .flat_map(move |y| (min_x..=max_x).map(move |x| IntPoint::new(x, y)))
    }
}

impl Default for IntRect {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for IntRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}]..[{}, {}]",
            self.min.x, self.min.y, self.max.x, self.max.y
        )
    }
}

/// Width/height pair of a heightmap or weightmap file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileResolution {
    pub width: u32,
    pub height: u32,
}

impl FileResolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn rect(&self) -> IntRect {
        IntRect::from_size(self.width as usize, self.height as usize)
    }
}

impl fmt::Display for FileResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_order_is_row_major() {
        let mut a = IntPoint::new(5, 0);
        let b = IntPoint::new(0, 1);
        assert!(a < b);
        a.y = 1;
        assert!(a > b);
    }

    #[test]
    fn clip_and_union() {
        let a = IntRect::new(0, 0, 9, 9);
        let b = IntRect::new(5, -3, 14, 4);
        assert_eq!(a.clip(&b), IntRect::new(5, 0, 9, 4));
        assert_eq!(a.union(&b), IntRect::new(0, -3, 14, 9));
        assert!(a.clip(&IntRect::new(20, 20, 30, 30)).is_empty());
        assert_eq!(IntRect::empty().union(&a), a);
    }

    #[test]
    fn index_of_is_relative_to_min() {
        let rect = IntRect::new(-2, 3, 1, 5);
        assert_eq!(rect.width(), 4);
        assert_eq!(rect.height(), 3);
        assert_eq!(rect.index_of(-2, 3), Some(0));
        assert_eq!(rect.index_of(1, 5), Some(11));
        assert_eq!(rect.index_of(2, 5), None);
        assert_eq!(rect.points().count(), 12);
        assert_eq!(rect.points().nth(4), Some(IntPoint::new(-2, 4)));
    }

    #[test]
    fn empty_rect_has_no_area() {
        let rect = IntRect::empty();
        assert!(rect.is_empty());
        assert_eq!(rect.area(), 0);
        assert_eq!(rect.points().count(), 0);
    }

    #[test]
    fn extreme_bounds_do_not_overflow() {
        let wide = IntRect::new(i32::MIN, 0, i32::MAX, 0);
        assert_eq!(wide.width(), 1usize << 32);
        assert_eq!(wide.index_of(i32::MAX, 0), Some((1usize << 32) - 1));
        assert!(IntRect::new(i32::MAX, 0, i32::MIN, 0).is_empty());
        assert_eq!(IntRect::new(i32::MAX, 0, i32::MIN, 0).width(), 0);
    }
}
