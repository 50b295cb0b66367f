use glam::Vec3;

use crate::shape::{VolumeSphere, to_shape_coords};

/// Safety margin applied to the bounding radius.
const RADIUS_MARGIN: f32 = 1.1;

/// Axis-aligned world-space bounds of every exported point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    lower: Vec3,
    upper: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            lower: Vec3::splat(f32::INFINITY),
            upper: Vec3::splat(f32::NEG_INFINITY),
        }
    }
}

impl Bounds {
    pub fn include(&mut self, point: Vec3) {
        self.lower = self.lower.min(point);
        self.upper = self.upper.max(point);
    }

    pub fn is_empty(&self) -> bool {
        self.lower.x > self.upper.x
    }

    pub fn lower(&self) -> Vec3 {
        self.lower
    }

    pub fn upper(&self) -> Vec3 {
        self.upper
    }

    /// Sphere around `center` reaching the farther of the two corners.
    pub fn bounding_sphere(&self, center: Vec3) -> VolumeSphere {
        let radius = if self.is_empty() {
            0.0
        } else {
            self.upper
                .distance(center)
                .max(self.lower.distance(center))
        };
        VolumeSphere {
            center: to_shape_coords(center),
            radius: radius * RADIUS_MARGIN,
        }
    }
}
