use glam::{Mat4, Quat, Vec3};
use std::cell::{Cell, Ref, RefCell};

/// Translation, rotation and uniform scale of a scene object, with cached local
/// and world matrices.
#[derive(Debug, Clone)]
pub struct Transform {
    translation: Vec3,
    rotation: Quat,
    scale: f32,

    local_matrix: RefCell<Mat4>,
    world_matrix: RefCell<Mat4>,
    local_dirty: Cell<bool>,
    world_dirty: Cell<bool>,
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY, 1.0)
    }

    pub fn new(translation: Vec3, rotation: Quat, scale: f32) -> Self {
        Self {
            translation,
            rotation,
            scale,
            local_matrix: RefCell::new(Mat4::IDENTITY),
            world_matrix: RefCell::new(Mat4::IDENTITY),
            local_dirty: Cell::new(true),
            world_dirty: Cell::new(true),
        }
    }

    pub fn get_local_matrix(&self) -> Ref<Mat4> {
        if self.local_dirty.get() {
            let matrix = Mat4::from_scale_rotation_translation(
                Vec3::splat(self.scale),
                self.rotation,
                self.translation,
            );

            self.local_matrix.replace(matrix);
            self.local_dirty.set(false);
            self.invalidate_world();
        }

        self.local_matrix.borrow()
    }

    /// Only meaningful after the owning scene has updated its transforms.
    pub fn get_world_matrix(&self) -> Ref<Mat4> {
        self.world_matrix.borrow()
    }

    pub fn set_world_matrix(&self, world_matrix: Mat4) {
        self.world_matrix.replace(world_matrix);
        self.world_dirty.set(false);
    }

    pub fn invalidate_local(&self) {
        self.local_dirty.set(true);
        self.world_dirty.set(true);
    }

    pub fn invalidate_world(&self) {
        self.world_dirty.set(true);
    }

    pub fn is_world_dirty(&self) -> bool {
        self.world_dirty.get()
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
        self.invalidate_local();
    }

    pub fn set_transform(&mut self, translation: Vec3, rotation: Quat, scale: f32) {
        self.translation = translation;
        self.rotation = rotation;
        self.scale = scale;
        self.invalidate_local();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_matrix_is_rebuilt_after_change() {
        let mut transform = Transform::from_translation(Vec3::X);
        assert_eq!(
            transform.get_local_matrix().transform_point3(Vec3::ZERO),
            Vec3::X
        );

        transform.set_translation(Vec3::Y);
        assert!(transform.is_world_dirty());
        assert_eq!(
            transform.get_local_matrix().transform_point3(Vec3::ZERO),
            Vec3::Y
        );
    }

    #[test]
    fn setting_world_matrix_clears_dirty_flag() {
        let transform = Transform::new(Vec3::ZERO, Quat::IDENTITY, 2.0);
        transform.set_world_matrix(Mat4::from_scale(Vec3::splat(2.0)));

        assert!(!transform.is_world_dirty());
        assert_eq!(
            transform.get_world_matrix().transform_point3(Vec3::ONE),
            Vec3::splat(2.0)
        );
    }
}
