use std::path::Path;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TerrafieldError;

use super::{bilerp, lerp};

/// Colour channel an alpha texture is read from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlphaChannel {
    #[default]
    Red,
    Green,
    Blue,
    Alpha,
}

impl AlphaChannel {
    fn index(self) -> usize {
        match self {
            AlphaChannel::Red => 0,
            AlphaChannel::Green => 1,
            AlphaChannel::Blue => 2,
            AlphaChannel::Alpha => 3,
        }
    }
}

/// Tileable 8-bit mask sampled by alpha and pattern brushes.
#[derive(Clone, Debug, PartialEq)]
pub struct AlphaTexture {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl AlphaTexture {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, TerrafieldError> {
        if width == 0 || height == 0 || data.len() != width * height {
            return Err(TerrafieldError::size_mismatch(width * height, data.len()));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_image(image: &DynamicImage, channel: AlphaChannel) -> Result<Self, TerrafieldError> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let data = rgba.pixels().map(|p| p.0[channel.index()]).collect();
        Self::new(width as usize, height as usize, data)
    }

    pub fn load(path: impl AsRef<Path>, channel: AlphaChannel) -> Result<Self, TerrafieldError> {
        let path = path.as_ref();
        let image = image::open(path)?;
        let texture = Self::from_image(&image, channel)?;
        debug!(
            resource = "alpha_texture",
            path = %path.display(),
            width = texture.width,
            height = texture.height
        );
        Ok(texture)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn texel(&self, x: usize, y: usize) -> f32 {
        self.data[x + y * self.width] as f32 / 255.0
    }

    /// Bilinear lookup in texel units. Indices wrap modulo the texture size,
    /// so the result is in [0, 1] for any finite `(u, v)`.
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        let u_floor = u.floor();
        let v_floor = v.floor();
        let x0 = (u_floor as i64).rem_euclid(self.width as i64) as usize;
        let y0 = (v_floor as i64).rem_euclid(self.height as i64) as usize;
        let x1 = (x0 + 1) % self.width;
        let y1 = (y0 + 1) % self.height;

        bilerp(
            self.texel(x0, y0),
            self.texel(x1, y0),
            self.texel(x0, y1),
            self.texel(x1, y1),
            u - u_floor,
            v - v_floor,
        )
    }

    /// Like [`AlphaTexture::sample`] but first folds `(u, v)` into `[0, size)`.
    pub fn sample_tiled(&self, u: f32, v: f32) -> f32 {
        self.sample(
            wrap_coordinate(u, self.width as f32),
            wrap_coordinate(v, self.height as f32),
        )
    }
}

fn wrap_coordinate(value: f32, size: f32) -> f32 {
    let wrapped = value % size;
    if wrapped < 0.0 { wrapped + size } else { wrapped }
}

/// Smoothed brush angle that follows the stroke direction.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AutoRotate {
    angle: f32,
    anchor: Option<glam::Vec2>,
    last_sample_time: f64,
}

impl AutoRotate {
    const MIN_MOVE: f32 = 0.5;

    /// Radians, as last updated.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn is_primed(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feeds a new brush position sampled at `now` seconds.
    pub fn update(&mut self, position: glam::Vec2, now: f64) {
        let Some(anchor) = self.anchor else {
            self.anchor = Some(position);
            self.angle = 0.0;
            self.last_sample_time = now;
            return;
        };

        let delta = position - anchor;
        if delta.length_squared() < Self::MIN_MOVE * Self::MIN_MOVE {
            return;
        }

        let dt = (now - self.last_sample_time) as f32;
        let direction = delta.normalize_or_zero();
        let target = (-direction.y).atan2(direction.x);
        self.angle = lerp(self.angle, target, (10.0 * dt).min(1.0));
        self.last_sample_time = now;
        self.anchor = Some(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn checker() -> AlphaTexture {
        AlphaTexture::new(2, 2, vec![0, 255, 255, 0]).unwrap()
    }

    #[test]
    fn texel_centres_are_exact() {
        let tex = checker();
        assert_eq!(tex.sample(0.0, 0.0), 0.0);
        assert_eq!(tex.sample(1.0, 0.0), 1.0);
        assert_eq!(tex.sample(0.0, 1.0), 1.0);
        assert_eq!(tex.sample(1.0, 1.0), 0.0);
    }

    #[test]
    fn sampling_wraps_at_edges() {
        let tex = checker();
        assert_eq!(tex.sample(2.0, 0.0), tex.sample(0.0, 0.0));
        assert_eq!(tex.sample(-1.0, 0.0), tex.sample(1.0, 0.0));
        // Halfway between the last column and the wrapped first column.
        assert_eq!(tex.sample(1.5, 0.0), 0.5);
        assert_eq!(tex.sample_tiled(-0.5, 4.0), tex.sample(1.5, 0.0));
    }

    #[test]
    fn rejects_mismatched_buffers() {
        assert!(AlphaTexture::new(3, 3, vec![0; 8]).is_err());
        assert!(AlphaTexture::new(0, 3, vec![]).is_err());
    }

    #[test]
    fn reads_requested_channel() {
        let mut img = image::RgbaImage::new(1, 1);
        img.put_pixel(0, 0, image::Rgba([10, 20, 30, 40]));
        let dynamic = DynamicImage::ImageRgba8(img);
        let green = AlphaTexture::from_image(&dynamic, AlphaChannel::Green).unwrap();
        let alpha = AlphaTexture::from_image(&dynamic, AlphaChannel::Alpha).unwrap();
        assert_eq!(green.data(), &[20]);
        assert_eq!(alpha.data(), &[40]);
    }

    #[test]
    fn auto_rotate_ignores_small_moves() {
        let mut rotate = AutoRotate::default();
        rotate.update(Vec2::new(0.0, 0.0), 0.0);
        assert!(rotate.is_primed());
        rotate.update(Vec2::new(0.2, 0.0), 1.0);
        assert_eq!(rotate.angle(), 0.0);

        // A full-weight update snaps to the stroke direction (moving -Y is +90 degrees).
        rotate.update(Vec2::new(0.0, -4.0), 2.0);
        assert!((rotate.angle() - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }
}
