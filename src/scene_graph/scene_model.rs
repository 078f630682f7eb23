use id_arena::Id;

use crate::math::bounds::BoundingSphere;
use crate::model::Model;
use crate::rendering::render_model::RenderModelId;

pub type SceneModelId = Id<SceneModel>;

pub struct SceneModel {
    pub model: Model,
    /// Local-space bounds, used for picking.
    pub bounding_sphere: Option<BoundingSphere>,
    /// Set once the renderer has uploaded the model to the GPU.
    pub render_model: Option<RenderModelId>,
}

impl SceneModel {
    pub fn new(model: Model) -> Self {
        let bounding_sphere = model.bounding_sphere();

        Self {
            model,
            bounding_sphere,
            render_model: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.model.name
    }
}
