use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient {
        color: Vec3,
        intensity: f32,
    },
    /// Shines from `position` toward the origin.
    Directional {
        color: Vec3,
        intensity: f32,
        position: Vec3,
    },
}

impl Light {
    pub fn radiance(&self) -> Vec3 {
        match *self {
            Light::Ambient { color, intensity } => color * intensity,
            Light::Directional {
                color, intensity, ..
            } => color * intensity,
        }
    }
}
