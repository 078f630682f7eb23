use glam::{Mat4, UVec2, Vec2, Vec3};
use wgpu::util::DeviceExt;

use crate::math::ray::Ray;

#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn get_vp_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Zero-sized surfaces (minimized windows) leave the aspect ratio untouched.
    pub fn set_viewport_size(&mut self, size: UVec2) {
        if size.x > 0 && size.y > 0 {
            self.aspect = size.x as f32 / size.y as f32;
        }
    }

    /// Ray from the eye through a point given in normalized device coordinates.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        // Built from the view basis rather than the inverse projection, which loses
        // precision with a far plane this distant.
        let half_height = (self.fov_y * 0.5).tan();
        let view_direction = Vec3::new(
            ndc.x * half_height * self.aspect,
            ndc.y * half_height,
            -1.0,
        );
        let direction = self
            .view_matrix()
            .inverse()
            .transform_vector3(view_direction);

        Ray::new(self.eye, direction)
    }

    /// Projects a world-space point to pixel coordinates on a surface of `size`.
    ///
    /// Returns `None` for points behind the camera.
    #[cfg(test)]
    pub fn world_to_screen(&self, point: Vec3, size: UVec2) -> Option<Vec2> {
        let clip = self.get_vp_matrix() * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }

        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * size.x as f32,
            (1.0 - ndc.y) * 0.5 * size.y as f32,
        ))
    }
}

/// Converts a cursor position in surface pixels to normalized device coordinates.
pub fn screen_to_ndc(cursor: Vec2, size: UVec2) -> Option<Vec2> {
    if size.x == 0 || size.y == 0 {
        return None;
    }

    Some(Vec2::new(
        (cursor.x / size.x as f32) * 2.0 - 1.0,
        -(cursor.y / size.y as f32) * 2.0 + 1.0,
    ))
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Default)]
pub struct CameraUniform {
    view_proj: Mat4,
    eye: [f32; 4],
}

impl CameraUniform {
    pub fn update(&mut self, camera: &Camera) {
        self.view_proj = camera.get_vp_matrix();
        self.eye = camera.eye.extend(1.0).to_array();
    }

    pub fn create_buffer(&self, device: &wgpu::Device) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: bytemuck::cast_slice(&[*self]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
    }

    pub fn update_buffer(&self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[*self]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_camera() -> Camera {
        Camera {
            eye: Vec3::new(10.0, -1.0, 18.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 75f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    #[test]
    fn screen_center_maps_to_ndc_origin() {
        let ndc = screen_to_ndc(Vec2::new(640.0, 360.0), UVec2::new(1280, 720)).unwrap();
        assert!(ndc.abs_diff_eq(Vec2::ZERO, 1e-6));

        let top_left = screen_to_ndc(Vec2::ZERO, UVec2::new(1280, 720)).unwrap();
        assert_eq!(top_left, Vec2::new(-1.0, 1.0));
    }

    #[test]
    fn zero_sized_surface_has_no_ndc() {
        assert_eq!(screen_to_ndc(Vec2::ZERO, UVec2::new(0, 720)), None);
    }

    #[test]
    fn center_ray_points_at_target() {
        let camera = test_camera();
        let ray = camera.ray_from_ndc(Vec2::ZERO);

        let expected = (camera.target - camera.eye).normalize();
        assert!(ray.direction.abs_diff_eq(expected, 1e-4));
        assert_eq!(ray.origin, camera.eye);
    }

    #[test]
    fn projected_point_unprojects_onto_the_same_ray() {
        let camera = test_camera();
        let size = UVec2::new(1280, 720);
        let point = Vec3::new(2.0, 1.5, -21.0);

        let screen = camera.world_to_screen(point, size).unwrap();
        let ray = camera.ray_from_ndc(screen_to_ndc(screen, size).unwrap());

        let closest = ray.at(ray.closest_parameter(point));
        assert!(closest.distance(point) < 1e-2);
    }

    #[test]
    fn viewport_size_updates_aspect() {
        let mut camera = test_camera();
        camera.set_viewport_size(UVec2::new(800, 800));
        assert_eq!(camera.aspect, 1.0);

        camera.set_viewport_size(UVec2::new(0, 0));
        assert_eq!(camera.aspect, 1.0);
    }

    #[test]
    fn points_behind_camera_do_not_project() {
        let camera = test_camera();
        let behind = camera.eye + (camera.eye - camera.target);
        assert_eq!(camera.world_to_screen(behind, UVec2::new(100, 100)), None);
    }
}
