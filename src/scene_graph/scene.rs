use glam::{Mat4, Vec3};
use id_arena::Arena;
use std::collections::HashMap;

use crate::asset_loader::{AssetNode, LoadedAsset};
use crate::math::bounds::{BoundingSphere, AABB};
use crate::scene_graph::light::Light;
use crate::scene_graph::object3d::{Object3D, ObjectId};
use crate::scene_graph::scene_model::{SceneModel, SceneModelId};

pub struct Scene {
    pub objects: Arena<Object3D>,
    pub models: Arena<SceneModel>,
    pub background: Vec3,
    lights: Vec<Light>,
}

impl Scene {
    pub fn new(background: Vec3) -> Self {
        Self {
            objects: Arena::new(),
            models: Arena::new(),
            background,
            lights: Vec::new(),
        }
    }

    pub fn add_object(&mut self, object: Object3D) -> ObjectId {
        self.objects.alloc(object)
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    #[cfg(test)]
    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, object)| object.name == name)
            .map(|(id, _)| id)
    }

    #[cfg(test)]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn add_model(&mut self, model: SceneModel) -> SceneModelId {
        self.models.alloc(model)
    }

    pub fn get_model(&self, id: SceneModelId) -> Option<&SceneModel> {
        self.models.get(id)
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Adds the decoded asset under a new root object and returns the root.
    pub fn spawn_asset(&mut self, root_name: &str, asset: LoadedAsset) -> ObjectId {
        let root_id = self.add_object(Object3D::named(root_name));

        let mut mesh_to_model: HashMap<usize, SceneModelId> = HashMap::new();
        for (mesh_index, model) in asset.meshes.into_iter().enumerate() {
            if let Some(model) = model {
                let model_id = self.add_model(SceneModel::new(model));
                mesh_to_model.insert(mesh_index, model_id);
            }
        }

        for &node_index in &asset.roots {
            self.spawn_asset_node(&asset.nodes, node_index, root_id, &mesh_to_model);
        }

        root_id
    }

    fn spawn_asset_node(
        &mut self,
        nodes: &[AssetNode],
        node_index: usize,
        parent: ObjectId,
        mesh_to_model: &HashMap<usize, SceneModelId>,
    ) {
        let Some(node) = nodes.get(node_index) else {
            log::warn!("Asset refers to missing node {}", node_index);
            return;
        };

        let mut object = Object3D::named(node.name.clone());
        object
            .transform
            .set_transform(node.translation, node.rotation, node.scale);
        object.model_id = node
            .mesh
            .and_then(|mesh_index| mesh_to_model.get(&mesh_index).copied());

        let object_id = self.add_object(object);
        self.set_object_parent(object_id, Some(parent));

        for &child_index in &node.children {
            self.spawn_asset_node(nodes, child_index, object_id, mesh_to_model);
        }
    }

    /// Updates all object transforms in hierarchical order
    pub fn update_transforms(&self) {
        let root_objects = self.objects.iter().filter_map(|(id, object)| {
            if object.parent_id.is_none() {
                Some(id)
            } else {
                None
            }
        });

        for root_id in root_objects {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY);
        }
    }

    fn update_object_transform_recursive(&self, object_id: ObjectId, parent_world_matrix: Mat4) {
        if let Some(object) = self.objects.get(object_id) {
            if object.transform.is_world_dirty() {
                let local_matrix = *object.transform.get_local_matrix();
                let world_matrix = parent_world_matrix * local_matrix;
                object.transform.set_world_matrix(world_matrix);
            }

            let world_matrix = *object.transform.get_world_matrix();
            for &child_id in &object.child_ids {
                self.update_object_transform_recursive(child_id, world_matrix);
            }
        }
    }

    /// Invalidates world transforms for an object and all its descendants
    pub fn invalidate_object_hierarchy(&self, object_id: ObjectId) {
        if let Some(object) = self.objects.get(object_id) {
            object.transform.invalidate_world();

            for &child_id in &object.child_ids {
                self.invalidate_object_hierarchy(child_id);
            }
        }
    }

    /// Sets the parent of an object and updates child relationships
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        if let Some(child) = self.objects.get(child_id) {
            if let Some(old_parent_id) = child.parent_id {
                if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                    old_parent.child_ids.retain(|&id| id != child_id);
                }
            }
        }

        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;

            if let Some(new_parent_id) = new_parent_id {
                if let Some(new_parent) = self.objects.get_mut(new_parent_id) {
                    new_parent.child_ids.push(child_id);
                }
            }
        }

        self.invalidate_object_hierarchy(child_id);
    }

    pub fn set_object_translation(&mut self, object_id: ObjectId, translation: Vec3) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_translation(translation);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    #[cfg(test)]
    /// World matrix as of the last transform update.
    pub fn world_matrix(&self, object_id: ObjectId) -> Option<Mat4> {
        self.objects
            .get(object_id)
            .map(|object| *object.transform.get_world_matrix())
    }

    /// Bounding sphere of the object's own model in world space.
    pub fn world_bounding_sphere(&self, object_id: ObjectId) -> Option<BoundingSphere> {
        let object = self.objects.get(object_id)?;
        let model = self.models.get(object.model_id?)?;
        let sphere = model.bounding_sphere?;

        Some(sphere.transform(&object.transform.get_world_matrix()))
    }

    /// World-space box around every model in the subtree rooted at `object_id`.
    pub fn subtree_bounds(&self, object_id: ObjectId) -> Option<AABB> {
        let object = self.objects.get(object_id)?;

        let own_bounds = object
            .model_id
            .and_then(|model_id| self.models.get(model_id))
            .and_then(|model| model.model.bounds())
            .map(|bounds| bounds.transform(&object.transform.get_world_matrix()));

        object
            .child_ids
            .iter()
            .filter_map(|&child_id| self.subtree_bounds(child_id))
            .fold(own_bounds, |acc, bounds| match acc {
                Some(acc) => Some(acc.union(&bounds)),
                None => Some(bounds),
            })
    }

    pub fn late_update(&mut self) {
        self.update_transforms();
    }
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;
    use crate::model::{Model, Shading};

    fn cube_asset() -> LoadedAsset {
        LoadedAsset {
            source: "test".to_string(),
            meshes: vec![Some(Model::cuboid(
                "Wall",
                Vec3::splat(2.0),
                Vec3::ONE,
                Shading::Lit,
            ))],
            nodes: vec![
                AssetNode {
                    name: "Building".to_string(),
                    translation: Vec3::new(0.0, 0.0, -10.0),
                    rotation: Quat::IDENTITY,
                    scale: 1.0,
                    mesh: None,
                    children: vec![1],
                },
                AssetNode {
                    name: "Wall".to_string(),
                    translation: Vec3::new(5.0, 0.0, 0.0),
                    rotation: Quat::IDENTITY,
                    scale: 2.0,
                    mesh: Some(0),
                    children: vec![],
                },
            ],
            roots: vec![0],
        }
    }

    #[test]
    fn spawned_asset_keeps_hierarchy() {
        let mut scene = Scene::new(Vec3::ZERO);
        let root = scene.spawn_asset("model", cube_asset());

        assert_eq!(scene.object_count(), 3);
        assert_eq!(scene.models.len(), 1);

        let building = scene.get_object_by_name("Building").unwrap();
        let wall = scene.get_object_by_name("Wall").unwrap();
        assert_eq!(scene.get_object(building).unwrap().parent_id, Some(root));

        let wall_object = scene.get_object(wall).unwrap();
        assert_eq!(wall_object.parent(&scene).unwrap().name, "Building");
        let root_children: Vec<_> = scene
            .get_object(root)
            .unwrap()
            .child_ids
            .iter()
            .filter_map(|&id| scene.get_object(id))
            .map(|child| child.name.as_str())
            .collect();
        assert_eq!(root_children, vec!["Building"]);
    }

    #[test]
    fn world_transforms_compose_through_parents() {
        let mut scene = Scene::new(Vec3::ZERO);
        let root = scene.spawn_asset("model", cube_asset());
        scene.update_transforms();

        let wall = scene.get_object_by_name("Wall").unwrap();
        let origin = scene.world_matrix(wall).unwrap().transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(5.0, 0.0, -10.0), 1e-5));

        let bounds = scene.subtree_bounds(root).unwrap();
        assert!(bounds.min.abs_diff_eq(Vec3::new(3.0, -2.0, -12.0), 1e-5));
        assert!(bounds.max.abs_diff_eq(Vec3::new(7.0, 2.0, -8.0), 1e-5));

        scene.set_object_translation(root, Vec3::Y);
        scene.update_transforms();
        let origin = scene.world_matrix(wall).unwrap().transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(5.0, 1.0, -10.0), 1e-5));
    }

    #[test]
    fn world_bounding_sphere_follows_object() {
        let mut scene = Scene::new(Vec3::ZERO);
        let model_id = scene.add_model(SceneModel::new(Model::uv_sphere(
            "Marker",
            0.5,
            8,
            8,
            Vec3::ONE,
            Shading::Unlit,
        )));

        let mut object = Object3D::named("Marker");
        object.model_id = Some(model_id);
        object.transform.set_translation(Vec3::new(1.0, 2.0, 3.0));
        let id = scene.add_object(object);
        scene.update_transforms();

        let sphere = scene.world_bounding_sphere(id).unwrap();
        assert!(sphere.center.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-4));
        assert!((sphere.radius - 0.5).abs() < 1e-4);
    }
}
