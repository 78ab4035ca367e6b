use serde::{Deserialize, Serialize};

/// Edge taper applied between the flat radius and the outer brush extent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Falloff {
    Linear,
    /// Smoothstepped linear taper.
    #[default]
    Smooth,
    /// Quarter ellipse: drops quickly next to the radius, slowly at the edge.
    Spherical,
    /// Inverse quarter ellipse: drops slowly next to the radius, quickly at the edge.
    Tip,
}

impl Falloff {
    pub const ALL: [Falloff; 4] = [
        Falloff::Linear,
        Falloff::Smooth,
        Falloff::Spherical,
        Falloff::Tip,
    ];

    pub fn weight(self, distance: f32, radius: f32, falloff_width: f32) -> f32 {
        match self {
            Falloff::Linear => linear(distance, radius, falloff_width),
            Falloff::Smooth => smooth(distance, radius, falloff_width),
            Falloff::Spherical => spherical(distance, radius, falloff_width),
            Falloff::Tip => tip(distance, radius, falloff_width),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Falloff::Linear => "linear",
            Falloff::Smooth => "smooth",
            Falloff::Spherical => "spherical",
            Falloff::Tip => "tip",
        }
    }
}

impl std::str::FromStr for Falloff {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Falloff::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown falloff curve: {s}"))
    }
}

pub fn linear(distance: f32, radius: f32, falloff_width: f32) -> f32 {
    if distance < radius {
        1.0
    } else if falloff_width > 0.0 {
        (1.0 - (distance - radius) / falloff_width).max(0.0)
    } else {
        0.0
    }
}

pub fn smooth(distance: f32, radius: f32, falloff_width: f32) -> f32 {
    let y = linear(distance, radius, falloff_width);
    y * y * (3.0 - 2.0 * y)
}

pub fn spherical(distance: f32, radius: f32, falloff_width: f32) -> f32 {
    if distance <= radius {
        return 1.0;
    }
    if distance > radius + falloff_width {
        return 0.0;
    }
    let t = (distance - radius) / falloff_width;
    (1.0 - t * t).max(0.0).sqrt()
}

pub fn tip(distance: f32, radius: f32, falloff_width: f32) -> f32 {
    if distance <= radius {
        return 1.0;
    }
    if distance > radius + falloff_width {
        return 0.0;
    }
    let t = (falloff_width + radius - distance) / falloff_width;
    1.0 - (1.0 - t * t).max(0.0).sqrt()
}

/// Flat radius and taper width, both in grid units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FalloffParams {
    pub radius: f32,
    pub falloff_width: f32,
}

impl FalloffParams {
    pub fn new(radius: f32, falloff_width: f32) -> Self {
        Self {
            radius: radius.max(0.0),
            falloff_width: falloff_width.max(0.0),
        }
    }

    /// Splits a total brush radius: `fraction` of it becomes taper.
    pub fn from_total(total_radius: f32, fraction: f32) -> Self {
        let total_radius = total_radius.max(0.0);
        let fraction = fraction.clamp(0.0, 1.0);
        Self::new((1.0 - fraction) * total_radius, fraction * total_radius)
    }

    pub fn extent(&self) -> f32 {
        self.radius + self.falloff_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_weight_at_centre_and_zero_past_extent() {
        for curve in Falloff::ALL {
            assert_eq!(curve.weight(0.0, 2.0, 3.0), 1.0, "{curve:?}");
            assert_eq!(curve.weight(5.0, 2.0, 3.0), 0.0, "{curve:?}");
            assert_eq!(curve.weight(9.0, 2.0, 3.0), 0.0, "{curve:?}");
        }
    }

    #[test]
    fn weight_never_increases_across_the_taper() {
        for curve in Falloff::ALL {
            let mut previous = 1.0f32;
            for step in 0..=100 {
                let distance = 2.0 + 3.0 * step as f32 / 100.0;
                let w = curve.weight(distance, 2.0, 3.0);
                assert!((0.0..=1.0).contains(&w), "{curve:?} {w}");
                assert!(w <= previous + 1e-6, "{curve:?} rose at {distance}");
                previous = w;
            }
        }
    }

    #[test]
    fn zero_width_taper_is_a_hard_edge() {
        for curve in Falloff::ALL {
            assert_eq!(curve.weight(1.0, 2.0, 0.0), 1.0);
            assert_eq!(curve.weight(2.5, 2.0, 0.0), 0.0);
        }
    }

    #[test]
    fn curve_shapes_at_midpoint() {
        assert_eq!(linear(3.0, 2.0, 2.0), 0.5);
        assert_eq!(smooth(3.0, 2.0, 2.0), 0.5);
        assert!((spherical(3.0, 2.0, 2.0) - 0.75f32.sqrt()).abs() < 1e-6);
        assert!((tip(3.0, 2.0, 2.0) - (1.0 - 0.75f32.sqrt())).abs() < 1e-6);
    }

    #[test]
    fn split_total_radius() {
        let params = FalloffParams::from_total(10.0, 0.25);
        assert_eq!(params.radius, 7.5);
        assert_eq!(params.falloff_width, 2.5);
        assert_eq!(params.extent(), 10.0);
        assert_eq!("Tip".parse::<Falloff>(), Ok(Falloff::Tip));
        assert!("cone".parse::<Falloff>().is_err());
    }
}
