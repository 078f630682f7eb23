use std::f32::consts::{PI, TAU};

use glam::{UVec2, Vec2, Vec3};

use crate::camera::Camera;

const EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Pan,
}

/// Damped orbit camera controls around a target point, Y up.
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    theta_delta: f32,
    phi_delta: f32,
    scale: f32,
    pan_offset: Vec3,
    drag: Option<(DragMode, Vec2)>,
}

impl OrbitControls {
    pub fn new(camera: &Camera) -> Self {
        Self {
            target: camera.target,
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            theta_delta: 0.0,
            phi_delta: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            drag: None,
        }
    }

    pub fn begin_drag(&mut self, mode: DragMode, cursor: Vec2) {
        self.drag = Some((mode, cursor));
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    #[cfg(test)]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Feeds a cursor move. Ignored unless a drag is in progress.
    pub fn drag_to(&mut self, cursor: Vec2, camera: &Camera, viewport: UVec2) {
        let Some((mode, last)) = self.drag else {
            return;
        };
        self.drag = Some((mode, cursor));

        if viewport.y == 0 {
            return;
        }

        let delta = cursor - last;
        let height = viewport.y as f32;

        match mode {
            DragMode::Rotate => {
                self.rotate_left(TAU * delta.x / height * self.rotate_speed);
                self.rotate_up(TAU * delta.y / height * self.rotate_speed);
            }
            DragMode::Pan => self.pan(delta * self.pan_speed, camera, height),
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.theta_delta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.phi_delta -= angle;
    }

    /// Positive `lines` (wheel away from the user) moves the camera closer.
    pub fn zoom(&mut self, lines: f32) {
        let zoom_scale = 0.95f32.powf(self.zoom_speed * lines.abs());

        if lines > 0.0 {
            self.scale *= zoom_scale;
        } else if lines < 0.0 {
            self.scale /= zoom_scale;
        }
    }

    fn pan(&mut self, delta: Vec2, camera: &Camera, height: f32) {
        let offset = camera.eye - self.target;
        let target_distance = offset.length() * (camera.fov_y * 0.5).tan();

        let forward = (self.target - camera.eye).normalize_or_zero();
        let right = forward.cross(camera.up).normalize_or_zero();
        let up = right.cross(forward);

        self.pan_offset += right * (-2.0 * delta.x * target_distance / height);
        self.pan_offset += up * (2.0 * delta.y * target_distance / height);
    }

    /// Applies pending motion to the camera. Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.eye - self.target;

        let mut radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        let step = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };

        theta += self.theta_delta * step;
        phi += self.phi_delta * step;
        phi = phi.clamp(EPSILON, PI - EPSILON);

        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);
        self.target += self.pan_offset * step;

        let new_offset = Vec3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );

        let new_eye = self.target + new_offset;
        let moved = new_eye.distance_squared(camera.eye) > EPSILON
            || camera.target.distance_squared(self.target) > EPSILON;

        camera.eye = new_eye;
        camera.target = self.target;

        if self.enable_damping {
            self.theta_delta *= 1.0 - self.damping_factor;
            self.phi_delta *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.theta_delta = 0.0;
            self.phi_delta = 0.0;
            self.pan_offset = Vec3::ZERO;
        }

        self.scale = 1.0;

        moved
    }
}
