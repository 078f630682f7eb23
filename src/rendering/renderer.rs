use std::sync::Arc;

use anyhow::Context;
use id_arena::Arena;
use wgpu::CommandEncoderDescriptor;
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    camera::CameraUniform,
    model::Shading,
    rendering::{
        instance::Instance,
        lighting_uniform::LightingUniformState,
        passes::{
            pass::Pass,
            scene_pass::{ScenePass, ScenePassTarget},
        },
        render_common::{surface_configuration, RenderCommon},
        render_model::RenderModel,
        shader_loader::{PipelineCacheBuilder, ShaderLoader},
        texture::DepthTexture,
    },
    scene_graph::scene::Scene,
    viewer::ViewerContext,
};

pub struct Renderer {
    pub window: Arc<Window>,
    pub size: PhysicalSize<u32>,

    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,

    common: Arc<RenderCommon>,
    depth_texture: DepthTexture,
    render_models: Arena<RenderModel>,

    camera_uniform: CameraUniform,

    shader_loader: ShaderLoader,
    scene_pass: ScenePass,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, viewer: &ViewerContext) -> anyhow::Result<Renderer> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create render surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable graphics adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create graphics device")?;

        let surface_config = surface_configuration(&surface, &adapter, size.width, size.height)?;
        surface.configure(&device, &surface_config);

        let mut camera_uniform = CameraUniform::default();
        camera_uniform.update(&viewer.camera);
        let camera_buffer = camera_uniform.create_buffer(&device);

        let common = Arc::new(RenderCommon::new(
            &device,
            surface_config.format,
            camera_buffer,
            LightingUniformState::from_lights(viewer.scene.lights()),
        ));

        let depth_texture = DepthTexture::new(&device, &surface_config, "Depth Texture");

        let mut cache_builder = PipelineCacheBuilder::new();
        let scene_pass = ScenePass::create(&device, common.clone(), &mut cache_builder)?;
        let shader_loader = ShaderLoader::new(device.clone(), cache_builder)?;

        log::info!(
            "Renderer ready: {}x{} {:?}",
            size.width,
            size.height,
            surface_config.format
        );

        Ok(Self {
            window,
            size,
            surface,
            device,
            queue,
            surface_config,
            common,
            depth_texture,
            render_models: Arena::new(),
            camera_uniform,
            shader_loader,
            scene_pass,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.surface_config.width = new_size.width;
            self.surface_config.height = new_size.height;
            self.surface.configure(&self.device, &self.surface_config);
            self.depth_texture
                .resize(&self.device, &self.surface_config);
        }
    }

    /// Uploads scene models that have no GPU counterpart yet.
    fn sync_models(&mut self, scene: &mut Scene) {
        for (_id, scene_model) in scene.models.iter_mut() {
            if scene_model.render_model.is_some() {
                continue;
            }

            let render_model = RenderModel::from_model(&self.device, &scene_model.model);
            scene_model.render_model = Some(self.render_models.alloc(render_model));
            log::debug!(
                "Uploaded model {} with {} primitives, {} vertices",
                scene_model.name(),
                scene_model.model.primitives.len(),
                scene_model.model.vertex_count()
            );
        }
    }

    fn gather_instances(&mut self, scene: &Scene) {
        for (_id, render_model) in self.render_models.iter_mut() {
            render_model.instances.clear();
        }

        for (_id, object) in scene.objects.iter() {
            let Some(render_model_id) = object
                .model_id
                .and_then(|model_id| scene.get_model(model_id))
                .and_then(|scene_model| scene_model.render_model)
            else {
                continue;
            };

            if let Some(render_model) = self.render_models.get_mut(render_model_id) {
                render_model.instances.add(Instance {
                    model: *object.transform.get_world_matrix(),
                });
            }
        }

        for (_id, render_model) in self.render_models.iter_mut() {
            render_model.instances.upload(&self.device, &self.queue);
        }
    }

    pub fn render(&mut self, viewer: &mut ViewerContext) -> Result<(), wgpu::SurfaceError> {
        self.shader_loader.load_pending_shaders();

        self.camera_uniform.update(&viewer.camera);
        self.camera_uniform
            .update_buffer(&self.queue, &self.common.camera_uniform_buffer);
        self.common.lighting.update(
            &self.queue,
            LightingUniformState::from_lights(viewer.scene.lights()),
        );

        self.sync_models(&mut viewer.scene);
        self.gather_instances(&viewer.scene);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let background = viewer.scene.background;
        let pipeline_cache = &self.shader_loader.cache;
        let render_models = &self.render_models;
        let scene_pass = &self.scene_pass;

        scene_pass.render(
            &ScenePassTarget {
                color: view,
                depth: self.depth_texture.view().clone(),
                clear_color: wgpu::Color {
                    r: background.x as f64,
                    g: background.y as f64,
                    b: background.z as f64,
                    a: 1.0,
                },
            },
            &mut encoder,
            pipeline_cache,
            |render_pass| {
                for shading in [Shading::Lit, Shading::Unlit] {
                    let Some(pipeline) = pipeline_cache.get(scene_pass.pipeline_for(shading))
                    else {
                        continue;
                    };

                    render_pass.set_pipeline(pipeline);

                    for (_id, render_model) in render_models.iter() {
                        if render_model.shading == shading {
                            render_model.draw(render_pass);
                        }
                    }
                }
            },
        );

        self.queue.submit([encoder.finish()]);
        output.present();

        Ok(())
    }
}
