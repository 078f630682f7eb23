use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Always normalized, so ray parameters are world-space distances.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Ray {
        Ray {
            origin,
            direction: direction.normalize(),
        }
    }

    #[cfg(test)]
    pub fn from_points(origin: Vec3, through: Vec3) -> Ray {
        Ray::new(origin, through - origin)
    }

    #[cfg(test)]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Parameter of the point on the ray closest to `point`, clamped to the ray start.
    #[cfg(test)]
    pub fn closest_parameter(&self, point: Vec3) -> f32 {
        (point - self.origin).dot(self.direction).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_is_normalized() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -10.0));
        assert!((ray.direction.length() - 1.0).abs() < 1e-6);
        assert!(ray.at(3.0).abs_diff_eq(Vec3::new(0.0, 0.0, -3.0), 1e-6));
    }

    #[test]
    fn closest_parameter_clamps_behind_origin() {
        let ray = Ray::from_points(Vec3::ZERO, Vec3::X);
        assert_eq!(ray.closest_parameter(Vec3::new(4.0, 2.0, 0.0)), 4.0);
        assert_eq!(ray.closest_parameter(Vec3::new(-4.0, 2.0, 0.0)), 0.0);
    }
}
