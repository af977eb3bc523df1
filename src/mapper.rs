//! Bounding-volume normalization from sensor space onto the unit surface.
//!
//! X and Z map `[min, max]` onto `[0, 1]`. Y is inverted (`[max, min]` onto
//! `[0, 1]`) so that height above the sensor reads as a top-down surface axis.
//! Results are always clamped; a zero-width axis saturates instead of dividing
//! by zero.
//!
//! In [`Calibration::Adaptive`] mode the volume grows to include every point
//! before it is mapped. Output for a given position keeps shifting until the
//! volume has stopped growing, i.e. until the user has swept the whole
//! interaction area once. That is a property of the mode, not a bug.

use crate::frame::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn component(self, v: &Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    fn inverted(self) -> bool {
        matches!(self, Axis::Y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingVolume {
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Inverted sentinels; the first `include` collapses it onto that point.
    pub const fn empty() -> Self {
        Self {
            min: Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn include(&mut self, p: &Vec3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Position of `p` along `axis`, 0 at the near end and 1 at the far end.
    pub fn normalize(&self, p: &Vec3, axis: Axis) -> f32 {
        let t = unit_interval(
            axis.component(p),
            axis.component(&self.min),
            axis.component(&self.max),
        );
        if axis.inverted() { 1.0 - t } else { t }
    }
}

/// Clamped linear map of `value` from `[lo, hi]` onto `[0, 1]`.
///
/// A span that is zero, negative or non-finite has no slope: values past `hi`
/// saturate to 1, everything else (NaN included) to 0.
fn unit_interval(value: f32, lo: f32, hi: f32) -> f32 {
    let span = hi - lo;
    if !(span > 0.0 && span.is_finite()) {
        return if value > hi { 1.0 } else { 0.0 };
    }
    let t = (value - lo) / span;
    if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Calibration {
    /// Constant volume measured ahead of time.
    Fixed(BoundingVolume),
    /// Running min/max of every observed fingertip.
    Adaptive,
}

#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    volume: BoundingVolume,
    adaptive: bool,
}

impl CoordinateMapper {
    pub fn new(calibration: Calibration) -> Self {
        match calibration {
            Calibration::Fixed(volume) => Self {
                volume,
                adaptive: false,
            },
            Calibration::Adaptive => Self {
                volume: BoundingVolume::empty(),
                adaptive: true,
            },
        }
    }

    pub fn volume(&self) -> &BoundingVolume {
        &self.volume
    }

    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    pub fn normalize(&self, p: &Vec3, axis: Axis) -> f32 {
        self.volume.normalize(p, axis)
    }

    /// Grow the volume (adaptive mode only), then map `p` onto the unit cube.
    pub fn map(&mut self, p: &Vec3) -> Vec3 {
        if self.adaptive {
            self.volume.include(p);
        }
        Vec3::new(
            self.normalize(p, Axis::X),
            self.normalize(p, Axis::Y),
            self.normalize(p, Axis::Z),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> BoundingVolume {
        BoundingVolume::new(
            Vec3::new(-180.0, 100.0, -350.0),
            Vec3::new(180.0, 450.0, 100.0),
        )
    }

    #[test]
    fn test_centre_maps_to_half() {
        let v = reference();
        let p = Vec3::new(0.0, 275.0, -125.0);
        assert!((v.normalize(&p, Axis::X) - 0.5).abs() < 1e-6);
        assert!((v.normalize(&p, Axis::Y) - 0.5).abs() < 1e-6);
        assert!((v.normalize(&p, Axis::Z) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_y_axis_is_inverted() {
        let v = reference();
        assert_eq!(v.normalize(&Vec3::new(0.0, 450.0, 0.0), Axis::Y), 0.0);
        assert_eq!(v.normalize(&Vec3::new(0.0, 100.0, 0.0), Axis::Y), 1.0);
    }

    #[test]
    fn test_monotonic_inside_volume() {
        let v = reference();
        let mut last_x = -1.0;
        let mut last_y = 2.0;
        for i in 0..=100 {
            let t = i as f32 / 100.0;
            let p = Vec3::new(-180.0 + 360.0 * t, 100.0 + 350.0 * t, 0.0);
            let x = v.normalize(&p, Axis::X);
            let y = v.normalize(&p, Axis::Y);
            assert!((0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y));
            assert!(x >= last_x, "x not increasing at step {i}");
            assert!(y <= last_y, "y not decreasing at step {i}");
            last_x = x;
            last_y = y;
        }
    }

    #[test]
    fn test_outside_volume_clamps() {
        let v = reference();
        let far = Vec3::new(1e6, 1e6, 1e6);
        let near = Vec3::new(-1e6, -1e6, -1e6);
        assert_eq!(v.normalize(&far, Axis::X), 1.0);
        assert_eq!(v.normalize(&far, Axis::Y), 0.0);
        assert_eq!(v.normalize(&far, Axis::Z), 1.0);
        assert_eq!(v.normalize(&near, Axis::X), 0.0);
        assert_eq!(v.normalize(&near, Axis::Y), 1.0);
        assert_eq!(v.normalize(&near, Axis::Z), 0.0);
    }

    #[test]
    fn test_degenerate_axis_saturates() {
        let flat = BoundingVolume::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(5.0, 5.0, 5.0));
        for p in [
            Vec3::new(4.0, 4.0, 4.0),
            Vec3::new(5.0, 5.0, 5.0),
            Vec3::new(6.0, 6.0, 6.0),
            Vec3::new(f32::NAN, f32::INFINITY, f32::NEG_INFINITY),
        ] {
            for axis in [Axis::X, Axis::Y, Axis::Z] {
                let n = flat.normalize(&p, axis);
                assert!(n == 0.0 || n == 1.0, "{axis:?} -> {n}");
            }
        }
        assert_eq!(flat.normalize(&Vec3::new(6.0, 6.0, 6.0), Axis::X), 1.0);
        assert_eq!(flat.normalize(&Vec3::new(6.0, 6.0, 6.0), Axis::Y), 0.0);
        assert_eq!(flat.normalize(&Vec3::new(4.0, 4.0, 4.0), Axis::X), 0.0);
    }

    #[test]
    fn test_empty_volume_never_yields_nan() {
        let v = BoundingVolume::empty();
        assert!(v.is_empty());
        let n = v.normalize(&Vec3::new(1.0, 2.0, 3.0), Axis::X);
        assert!(n.is_finite());
    }

    #[test]
    fn test_fixed_mapper_does_not_grow() {
        let mut m = CoordinateMapper::new(Calibration::Fixed(reference()));
        let out = m.map(&Vec3::new(1000.0, 0.0, 0.0));
        assert_eq!(out.x, 1.0);
        assert_eq!(*m.volume(), reference());
    }

    #[test]
    fn test_adaptive_mapper_grows() {
        let mut m = CoordinateMapper::new(Calibration::Adaptive);
        assert!(m.volume().is_empty());

        let first = m.map(&Vec3::new(10.0, 200.0, 0.0));
        assert!(first.x == 0.0 || first.x == 1.0);
        assert!(!m.volume().is_empty());

        m.map(&Vec3::new(-10.0, 100.0, -20.0));
        let mid = m.map(&Vec3::new(0.0, 150.0, -10.0));
        assert!((mid.x - 0.5).abs() < 1e-6);
        assert!((mid.y - 0.5).abs() < 1e-6);
        assert_eq!(m.volume().min, Vec3::new(-10.0, 100.0, -20.0));
        assert_eq!(m.volume().max, Vec3::new(10.0, 200.0, 0.0));
    }
}
