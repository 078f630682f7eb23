use glam::{Mat4, Vec3};

use crate::math::ray::Ray;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> BoundingSphere {
        BoundingSphere { center, radius }
    }

    pub fn transform(&self, matrix: &Mat4) -> BoundingSphere {
        let center = matrix.transform_point3(self.center);
        let scale = matrix.to_scale_rotation_translation().0;
        let radius = self.radius * scale.max_element();
        BoundingSphere { center, radius }
    }

    #[cfg(test)]
    pub fn contains_point(&self, point: Vec3) -> bool {
        (point - self.center).length_squared() <= self.radius * self.radius
    }

    /// Distance along `ray` to the first intersection with the sphere.
    ///
    /// When the ray starts inside the sphere the exit point is returned. Spheres
    /// entirely behind the ray origin are never hit.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let to_center = self.center - ray.origin;
        let t_center = to_center.dot(ray.direction);
        let distance_sq = to_center.length_squared() - t_center * t_center;
        let radius_sq = self.radius * self.radius;

        if distance_sq > radius_sq {
            return None;
        }

        let half_chord = (radius_sq - distance_sq).sqrt();
        let t_enter = t_center - half_chord;
        let t_exit = t_center + half_chord;

        if t_exit < 0.0 {
            return None;
        }

        Some(if t_enter >= 0.0 { t_enter } else { t_exit })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn new(point1: Vec3, point2: Vec3) -> AABB {
        let min = point1.min(point2);
        let max = point1.max(point2);
        AABB { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<AABB> {
        let mut points = points.into_iter();
        let first = points.next()?;

        Some(points.fold(AABB::new(first, first), |aabb, point| AABB {
            min: aabb.min.min(point),
            max: aabb.max.max(point),
        }))
    }

    pub fn union(&self, other: &AABB) -> AABB {
        AABB {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Axis-aligned box enclosing this box after `transform`.
    pub fn transform(&self, transform: &Mat4) -> AABB {
        let corners = self
            .corners()
            .map(|corner| transform.transform_point3(corner));

        // Eight corners, never empty
        AABB::from_points(corners).unwrap_or(*self)
    }

    #[cfg(test)]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;

    #[test]
    fn ray_hits_sphere_front_surface() {
        let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        let t = sphere.intersect_ray(&ray).unwrap();
        assert!((t - 9.0).abs() < 1e-5);
    }

    #[test]
    fn ray_misses_offset_sphere() {
        let sphere = BoundingSphere::new(Vec3::new(2.0, 0.0, -10.0), 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        assert_eq!(sphere.intersect_ray(&ray), None);
    }

    #[test]
    fn sphere_behind_ray_is_ignored() {
        let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, 10.0), 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        assert_eq!(sphere.intersect_ray(&ray), None);
    }

    #[test]
    fn ray_from_inside_returns_exit() {
        let sphere = BoundingSphere::new(Vec3::ZERO, 2.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        let t = sphere.intersect_ray(&ray).unwrap();
        assert!((t - 2.0).abs() < 1e-5);
        assert!(sphere.contains_point(ray.origin));
    }

    #[test]
    fn grazing_ray_still_hits() {
        let sphere = BoundingSphere::new(Vec3::new(1.0, 0.0, -5.0), 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        let t = sphere.intersect_ray(&ray).unwrap();
        assert!((t - 5.0).abs() < 1e-3);
    }

    #[test]
    fn transform_moves_center_and_scales_radius() {
        let sphere = BoundingSphere::new(Vec3::ZERO, 0.5);
        let matrix = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::IDENTITY,
            Vec3::new(1.0, 2.0, 3.0),
        );

        let moved = sphere.transform(&matrix);
        assert!(moved.center.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-5));
        assert!((moved.radius - 1.0).abs() < 1e-5);
    }

    #[test]
    fn aabb_from_points_and_transform() {
        let aabb = AABB::from_points([
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(-1.0, 1.0, 2.0),
            Vec3::ZERO,
        ])
        .unwrap();

        assert_eq!(aabb.min, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 1.0, 2.0));
        assert_eq!(aabb.center(), Vec3::new(0.0, 0.0, 1.0));

        let moved = aabb.transform(&Mat4::from_translation(Vec3::Y * 5.0));
        assert_eq!(moved.min, Vec3::new(-1.0, 4.0, 0.0));
        assert!(moved.contains_point(Vec3::new(0.0, 5.0, 1.0)));
        assert!(AABB::from_points(std::iter::empty()).is_none());
    }
}
