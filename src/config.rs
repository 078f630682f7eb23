use std::path::PathBuf;

use anyhow::Context;
use glam::Vec3;

use crate::hotpoints::{default_hotpoints, HotpointConfig, HotpointStyle};

#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub asset_path: PathBuf,
    pub start_location: String,
    pub open_with: Option<String>,
    pub max_frames: Option<u64>,
    pub background: Vec3,
    pub camera: CameraConfig,
    pub hotpoint_style: HotpointStyle,
    pub placeholder_color: Vec3,
    /// Pointer travel in pixels beyond which a press-release is a drag, not a click.
    pub click_tolerance: f32,
    pub hotpoints: Vec<HotpointConfig>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_path: PathBuf::from("ASSETS/building_model.glb"),
            start_location: "index.html".to_string(),
            open_with: None,
            max_frames: None,
            background: srgb_hex(0x87CEEB),
            camera: CameraConfig {
                eye: Vec3::new(10.0, -1.0, 18.0),
                target: Vec3::ZERO,
                fov_y_degrees: 75.0,
                near: 0.1,
                far: 1000.0,
            },
            hotpoint_style: HotpointStyle {
                radius: 0.35,
                segments: 16,
                color: srgb_hex(0xFF2200),
            },
            placeholder_color: srgb_hex(0x00FF00),
            click_tolerance: 5.0,
            hotpoints: default_hotpoints(),
        }
    }
}

impl ViewerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `HOTPOINT_*` overrides looked up through `lookup`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        if let Some(asset_path) = lookup("HOTPOINT_ASSET") {
            self.asset_path = PathBuf::from(asset_path);
        }

        if let Some(start_location) = lookup("HOTPOINT_START_LOCATION") {
            self.start_location = start_location;
        }

        if let Some(open_with) = lookup("HOTPOINT_OPEN_WITH") {
            self.open_with = Some(open_with).filter(|program| !program.is_empty());
        }

        if let Some(max_frames) = lookup("HOTPOINT_MAX_FRAMES") {
            let max_frames = max_frames
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid HOTPOINT_MAX_FRAMES: {:?}", max_frames))?;
            self.max_frames = Some(max_frames);
        }

        Ok(self)
    }
}

/// Converts a `0xRRGGBB` sRGB colour to linear RGB.
pub fn srgb_hex(hex: u32) -> Vec3 {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xFF) as f32 / 255.0);
    Vec3::new(channel(16), channel(8), channel(0))
}

fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}
