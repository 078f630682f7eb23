//! Scene state owned by the application: bootstrap, hotpoint placement and
//! click resolution, independent of any window or GPU.

use glam::{UVec2, Vec2, Vec3};

use crate::{
    asset_loader::AssetLoadResult,
    camera::{screen_to_ndc, Camera},
    config::ViewerConfig,
    hotpoints::{HotpointConfig, HotpointHit, HotpointRegistry, HotpointStyle},
    model::{Model, Shading},
    navigation::Navigator,
    orbit_controls::OrbitControls,
    scene_graph::{
        light::Light,
        object3d::{Object3D, ObjectId},
        scene::Scene,
        scene_model::SceneModel,
    },
};

pub const MODEL_ROOT_NAME: &str = "model";
pub const PLACEHOLDER_NAME: &str = "Placeholder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    /// Markers not placed yet; clicks never hit.
    AwaitingAsset,
    /// Markers placed; clicks may hit.
    Ready,
}

pub struct ViewerContext {
    pub scene: Scene,
    pub camera: Camera,
    pub controls: OrbitControls,
    hotpoints: HotpointRegistry,
    hotpoint_style: HotpointStyle,
    hotpoint_configs: Vec<HotpointConfig>,
    placeholder_color: Vec3,
    model: Option<ObjectId>,
    state: InteractionState,
}

impl ViewerContext {
    pub fn new(config: &ViewerConfig, viewport: UVec2) -> Self {
        let mut scene = Scene::new(config.background);
        scene.add_light(Light::Ambient {
            color: Vec3::ONE,
            intensity: 0.6,
        });
        scene.add_light(Light::Directional {
            color: Vec3::ONE,
            intensity: 0.8,
            position: Vec3::new(5.0, 10.0, 7.5),
        });

        let mut camera = Camera {
            eye: config.camera.eye,
            target: config.camera.target,
            up: Vec3::Y,
            fov_y: config.camera.fov_y_degrees.to_radians(),
            aspect: 1.0,
            near: config.camera.near,
            far: config.camera.far,
        };
        camera.set_viewport_size(viewport);

        let controls = OrbitControls::new(&camera);

        Self {
            scene,
            camera,
            controls,
            hotpoints: HotpointRegistry::new(),
            hotpoint_style: config.hotpoint_style.clone(),
            hotpoint_configs: config.hotpoints.clone(),
            placeholder_color: config.placeholder_color,
            model: None,
            state: InteractionState::AwaitingAsset,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> InteractionState {
        self.state
    }

    #[cfg(test)]
    pub fn model(&self) -> Option<ObjectId> {
        self.model
    }

    #[cfg(test)]
    pub fn hotpoints(&self) -> &HotpointRegistry {
        &self.hotpoints
    }

    /// Reacts to the completion of the asset load. Successful loads add the
    /// model and place the configured hotpoints; failures add a placeholder.
    pub fn asset_loaded(&mut self, result: AssetLoadResult) {
        let asset = match result {
            Ok(asset) => asset,
            Err(error) => {
                log::error!("An error happened while loading the model: {:#}", error);
                self.add_placeholder();
                return;
            }
        };

        if self.model.is_some() {
            log::warn!("Ignoring second model load from {}", asset.source);
            return;
        }

        let source = asset.source.clone();
        let mesh_count = asset.mesh_count();
        let root = self.scene.spawn_asset(MODEL_ROOT_NAME, asset);
        self.model = Some(root);
        self.scene.update_transforms();

        log::info!("Model loaded successfully: {} ({} meshes)", source, mesh_count);
        if let Some(bounds) = self.scene.subtree_bounds(root) {
            log::info!(
                "Model bounds: min {:?}, max {:?}, center {:?}, size {:?}",
                bounds.min,
                bounds.max,
                bounds.center(),
                bounds.size()
            );
        }

        let configs = std::mem::take(&mut self.hotpoint_configs);
        self.place_hotpoints(&configs);
        self.hotpoint_configs = configs;
    }

    fn add_placeholder(&mut self) -> ObjectId {
        let model_id = self.scene.add_model(SceneModel::new(Model::cuboid(
            PLACEHOLDER_NAME,
            Vec3::splat(2.0),
            self.placeholder_color,
            Shading::Lit,
        )));

        let mut object = Object3D::named(PLACEHOLDER_NAME);
        object.model_id = Some(model_id);

        let placeholder = self.scene.add_object(object);
        self.scene
            .set_object_translation(placeholder, Vec3::new(0.0, 1.0, 0.0));
        placeholder
    }

    /// Places one marker per config. Skipped with a warning when the model is
    /// not loaded yet or markers were already placed. Returns the number placed.
    pub fn place_hotpoints(&mut self, configs: &[HotpointConfig]) -> usize {
        if self.model.is_none() {
            log::warn!("Model not loaded yet, cannot add hotpoints.");
            return 0;
        }

        if self.state == InteractionState::Ready {
            log::warn!("Hotpoints already placed, ignoring {} more", configs.len());
            return 0;
        }

        for config in configs {
            self.hotpoints
                .add(&mut self.scene, &self.hotpoint_style, config);
            log::info!(
                "Added hotpoint: {} at {:?}",
                config.name,
                config.position
            );
        }

        self.scene.update_transforms();
        self.state = InteractionState::Ready;
        log::debug!("{} hotpoints registered", self.hotpoints.len());

        configs.len()
    }

    pub fn resize(&mut self, viewport: UVec2) {
        self.camera.set_viewport_size(viewport);
    }

    /// Per-frame update: damped controls, then world transforms.
    pub fn update(&mut self) {
        self.controls.update(&mut self.camera);
        self.scene.late_update();
    }

    /// Hit-tests a click at `cursor` (pixels, relative to a surface of
    /// `viewport` size) against the placed hotpoints.
    pub fn resolve_click(&self, cursor: Vec2, viewport: UVec2) -> Option<HotpointHit> {
        if self.state != InteractionState::Ready {
            return None;
        }

        let ndc = screen_to_ndc(cursor, viewport)?;
        let ray = self.camera.ray_from_ndc(ndc);

        self.scene.update_transforms();
        self.hotpoints.pick(&self.scene, &ray)
    }

    /// Resolves a click and navigates to the hit hotpoint's URL, if it has one.
    /// Returns whether navigation happened.
    pub fn handle_click(
        &self,
        cursor: Vec2,
        viewport: UVec2,
        navigator: &mut impl Navigator,
    ) -> bool {
        let Some(hit) = self.resolve_click(cursor, viewport) else {
            return false;
        };

        let Some(url) = hit.link.url.as_deref() else {
            return false;
        };

        log::info!(
            "Clicked hotpoint: {}, navigating to: {}",
            hit.link.label,
            url
        );
        log::debug!("Hit {:?} at distance {:.3}", hit.object_id, hit.distance);
        navigator.navigate(url);

        true
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        asset_loader::{tests::TRIANGLE_GLTF, LoadedAsset},
        navigation::tests::RecordingNavigator,
    };

    use super::*;

    const VIEWPORT: UVec2 = UVec2::new(1280, 720);

    fn loaded_asset() -> AssetLoadResult {
        LoadedAsset::from_slice("triangle.gltf", TRIANGLE_GLTF.as_bytes())
    }

    fn config_with(hotpoints: Vec<HotpointConfig>) -> ViewerConfig {
        ViewerConfig {
            hotpoints,
            ..ViewerConfig::default()
        }
    }

    fn ready_viewer(hotpoints: Vec<HotpointConfig>) -> ViewerContext {
        let mut viewer = ViewerContext::new(&config_with(hotpoints), VIEWPORT);
        viewer.asset_loaded(loaded_asset());
        viewer
    }

    fn screen_position(viewer: &ViewerContext, point: Vec3, viewport: UVec2) -> Vec2 {
        viewer.camera.world_to_screen(point, viewport).unwrap()
    }

    fn marker_count(viewer: &ViewerContext) -> usize {
        viewer
            .scene
            .objects
            .iter()
            .filter(|(_, object)| object.link.is_some())
            .count()
    }

    #[test]
    fn markers_are_placed_once_after_load() {
        let mut viewer = ViewerContext::new(&ViewerConfig::default(), VIEWPORT);
        assert_eq!(viewer.state(), InteractionState::AwaitingAsset);
        assert_eq!(marker_count(&viewer), 0);

        viewer.asset_loaded(loaded_asset());

        assert_eq!(viewer.state(), InteractionState::Ready);
        assert_eq!(viewer.hotpoints().len(), 2);
        assert_eq!(marker_count(&viewer), 2);
        assert!(viewer.scene.get_object_by_name(MODEL_ROOT_NAME).is_some());

        // Neither an explicit call nor a second load adds markers again
        assert_eq!(viewer.place_hotpoints(&ViewerConfig::default().hotpoints), 0);
        viewer.asset_loaded(loaded_asset());
        assert_eq!(marker_count(&viewer), 2);
    }

    #[test]
    fn placing_before_load_is_skipped() {
        let mut viewer = ViewerContext::new(&ViewerConfig::default(), VIEWPORT);

        let placed = viewer.place_hotpoints(&ViewerConfig::default().hotpoints);

        assert_eq!(placed, 0);
        assert_eq!(marker_count(&viewer), 0);
        assert_eq!(viewer.state(), InteractionState::AwaitingAsset);
        assert_eq!(viewer.scene.object_count(), 0);
    }

    #[test]
    fn click_on_marker_navigates_to_its_url() {
        let target = Vec3::new(2.0, 1.5, -21.0);
        let viewer = ready_viewer(vec![HotpointConfig::new(
            target,
            "panorama.html?view=server_hall_A",
            "Entrance Facilities",
        )]);
        let mut navigator = RecordingNavigator::default();

        let cursor = screen_position(&viewer, target, VIEWPORT);
        assert!(viewer.handle_click(cursor, VIEWPORT, &mut navigator));

        assert_eq!(navigator.visited, vec!["panorama.html?view=server_hall_A"]);
    }

    #[test]
    fn click_elsewhere_does_not_navigate() {
        let viewer = ready_viewer(vec![HotpointConfig::new(
            Vec3::new(2.0, 1.5, -21.0),
            "panorama.html?view=server_hall_A",
            "Entrance Facilities",
        )]);
        let mut navigator = RecordingNavigator::default();

        assert!(!viewer.handle_click(Vec2::new(5.0, 5.0), VIEWPORT, &mut navigator));
        assert!(!viewer.handle_click(Vec2::new(1200.0, 700.0), VIEWPORT, &mut navigator));
        assert!(navigator.visited.is_empty());
    }

    #[test]
    fn overlapping_markers_resolve_to_the_nearest() {
        let near = Vec3::new(2.0, 1.5, -21.0);
        let eye = ViewerConfig::default().camera.eye;
        let far = near + (near - eye).normalize() * 5.0;

        let viewer = ready_viewer(vec![
            HotpointConfig::new(far, "far.html", "Far"),
            HotpointConfig::new(near, "near.html", "Near"),
        ]);
        let mut navigator = RecordingNavigator::default();

        let cursor = screen_position(&viewer, near, VIEWPORT);
        assert!(viewer.handle_click(cursor, VIEWPORT, &mut navigator));

        assert_eq!(navigator.visited, vec!["near.html"]);
    }

    #[test]
    fn click_before_load_never_navigates() {
        let viewer = ViewerContext::new(&ViewerConfig::default(), VIEWPORT);
        let mut navigator = RecordingNavigator::default();

        for hotpoint in &ViewerConfig::default().hotpoints {
            if let Some(cursor) = viewer.camera.world_to_screen(hotpoint.position, VIEWPORT) {
                assert!(!viewer.handle_click(cursor, VIEWPORT, &mut navigator));
            }
        }
        assert_eq!(viewer.resolve_click(Vec2::new(640.0, 360.0), VIEWPORT), None);

        assert!(navigator.visited.is_empty());
    }

    #[test]
    fn failed_load_adds_placeholder_and_no_markers() {
        let mut viewer = ViewerContext::new(&ViewerConfig::default(), VIEWPORT);

        viewer.asset_loaded(Err(anyhow::anyhow!("404 Not Found")));

        assert!(viewer.scene.get_object_by_name(PLACEHOLDER_NAME).is_some());
        assert_eq!(marker_count(&viewer), 0);
        assert_eq!(viewer.model(), None);
        assert_eq!(viewer.state(), InteractionState::AwaitingAsset);

        let placeholder = viewer.scene.get_object_by_name(PLACEHOLDER_NAME).unwrap();
        viewer.scene.update_transforms();
        let bounds = viewer.scene.subtree_bounds(placeholder).unwrap();
        assert!(bounds.center().abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-5));
        assert!(bounds.size().abs_diff_eq(Vec3::splat(2.0), 1e-5));
    }

    #[test]
    fn marker_without_url_is_ignored() {
        let position = Vec3::new(2.0, 1.5, -21.0);
        let viewer = ready_viewer(vec![HotpointConfig {
            position,
            url: None,
            name: "Unlinked".to_string(),
        }]);
        let mut navigator = RecordingNavigator::default();

        let cursor = screen_position(&viewer, position, VIEWPORT);
        assert!(viewer.resolve_click(cursor, VIEWPORT).is_some());
        assert!(!viewer.handle_click(cursor, VIEWPORT, &mut navigator));
        assert!(navigator.visited.is_empty());
    }

    #[test]
    fn picks_stay_aligned_after_resize() {
        let target = Vec3::new(2.0, 1.5, -21.0);
        let mut viewer = ready_viewer(vec![HotpointConfig::new(
            target,
            "panorama.html?view=server_hall_A",
            "Entrance Facilities",
        )]);

        let portrait = UVec2::new(600, 1000);
        viewer.resize(portrait);
        let mut navigator = RecordingNavigator::default();

        let cursor = screen_position(&viewer, target, portrait);
        assert!(viewer.handle_click(cursor, portrait, &mut navigator));
        assert_eq!(navigator.visited.len(), 1);
    }

    #[test]
    fn zero_sized_viewport_never_hits() {
        let viewer = ready_viewer(ViewerConfig::default().hotpoints);

        assert_eq!(viewer.resolve_click(Vec2::ZERO, UVec2::ZERO), None);
    }

    #[test]
    fn markers_follow_orbiting_camera() {
        let target = Vec3::new(2.0, 1.5, -21.0);
        let mut viewer = ready_viewer(vec![HotpointConfig::new(target, "a.html", "A")]);

        viewer.controls.rotate_left(0.3);
        for _ in 0..10 {
            viewer.update();
        }

        let cursor = screen_position(&viewer, target, VIEWPORT);
        let hit = viewer.resolve_click(cursor, VIEWPORT).unwrap();
        assert_eq!(hit.link.label, "A");
    }
}
