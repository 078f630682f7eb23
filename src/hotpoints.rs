//! Clickable markers placed over the model, and hit-testing against them.

use glam::Vec3;

use crate::math::ray::Ray;
use crate::model::{Model, Shading};
use crate::scene_graph::object3d::{Object3D, ObjectId};
use crate::scene_graph::scene::Scene;
use crate::scene_graph::scene_model::{SceneModel, SceneModelId};

#[derive(Debug, Clone, PartialEq)]
pub struct HotpointConfig {
    /// World-space position of the marker centre.
    pub position: Vec3,
    pub url: Option<String>,
    pub name: String,
}

impl HotpointConfig {
    pub fn new(position: Vec3, url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            position,
            url: Some(url.into()),
            name: name.into(),
        }
    }
}

pub fn default_hotpoints() -> Vec<HotpointConfig> {
    vec![
        HotpointConfig::new(
            Vec3::new(2.0, 10.0, -25.5),
            "panorama.html?view=room1",
            "Data Center",
        ),
        HotpointConfig::new(
            Vec3::new(2.0, 1.5, -21.0),
            "panorama.html?view=server_hall_A",
            "Entrance Facilities",
        ),
    ]
}

/// Metadata carried by a marker object.
#[derive(Debug, Clone, PartialEq)]
pub struct HotpointLink {
    pub url: Option<String>,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct HotpointStyle {
    pub radius: f32,
    pub segments: u32,
    pub color: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HotpointHit {
    pub object_id: ObjectId,
    pub distance: f32,
    pub link: HotpointLink,
}

/// Markers in the order they were placed.
#[derive(Default)]
pub struct HotpointRegistry {
    markers: Vec<ObjectId>,
    sphere_model: Option<SceneModelId>,
}

impl HotpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    #[cfg(test)]
    pub fn markers(&self) -> &[ObjectId] {
        &self.markers
    }

    /// Inserts a marker object for `config` into the scene and registers it.
    /// All markers share one sphere model.
    pub fn add(
        &mut self,
        scene: &mut Scene,
        style: &HotpointStyle,
        config: &HotpointConfig,
    ) -> ObjectId {
        let sphere_model = *self.sphere_model.get_or_insert_with(|| {
            scene.add_model(SceneModel::new(Model::uv_sphere(
                "Hotpoint",
                style.radius,
                style.segments,
                style.segments,
                style.color,
                Shading::Unlit,
            )))
        });

        let mut object = Object3D::named(config.name.clone());
        object.transform.set_translation(config.position);
        object.model_id = Some(sphere_model);
        object.link = Some(HotpointLink {
            url: config.url.clone(),
            label: config.name.clone(),
        });

        let object_id = scene.add_object(object);
        self.markers.push(object_id);

        object_id
    }

    /// Nearest marker whose bounding sphere the ray passes through.
    ///
    /// World transforms must be current. On exactly equal distances the marker
    /// registered first wins.
    pub fn pick(&self, scene: &Scene, ray: &Ray) -> Option<HotpointHit> {
        let mut nearest: Option<(ObjectId, f32)> = None;

        for &object_id in &self.markers {
            let Some(sphere) = scene.world_bounding_sphere(object_id) else {
                continue;
            };

            if let Some(distance) = sphere.intersect_ray(ray) {
                if nearest.is_none_or(|(_, best)| distance < best) {
                    nearest = Some((object_id, distance));
                }
            }
        }

        let (object_id, distance) = nearest?;
        let link = scene.get_object(object_id)?.link.clone()?;

        Some(HotpointHit {
            object_id,
            distance,
            link,
        })
    }
}
