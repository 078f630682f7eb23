use std::sync::Arc;

use wgpu::{
    DepthBiasState, Device, MultisampleState, PipelineCompilationOptions, RenderPass,
    RenderPassDescriptor, ShaderSource, StencilState,
};

use crate::{
    model::Shading,
    rendering::{
        instance::Instance,
        passes::pass::Pass,
        render_common::RenderCommon,
        render_model::RENDER_MODEL_VBL,
        shader_loader::{PipelineCache, PipelineCacheBuilder, PipelineId, ShaderDefinition},
        texture::DepthTexture,
    },
};

/// Forward pass drawing every model, cleared to the scene background.
pub struct ScenePass {
    lit_pipeline: PipelineId,
    unlit_pipeline: PipelineId,
    camera_bind_group: wgpu::BindGroup,
    lighting_bind_group: wgpu::BindGroup,
}

pub struct ScenePassTarget {
    pub color: wgpu::TextureView,
    pub depth: wgpu::TextureView,
    pub clear_color: wgpu::Color,
}

const SCENE_SHADER_FILE: &str = "scene.wgsl";
const SCENE_SHADER_SOURCE: &str = include_str!("../../shaders/scene.wgsl");

const LIT_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Lit scene shader",
    path: SCENE_SHADER_FILE,
    embedded_source: SCENE_SHADER_SOURCE,
};

const UNLIT_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Unlit scene shader",
    path: SCENE_SHADER_FILE,
    embedded_source: SCENE_SHADER_SOURCE,
};

impl ScenePass {
    pub fn pipeline_for(&self, shading: Shading) -> PipelineId {
        match shading {
            Shading::Lit => self.lit_pipeline,
            Shading::Unlit => self.unlit_pipeline,
        }
    }
}

impl Pass for ScenePass {
    type Target = ScenePassTarget;

    fn create(
        device: &wgpu::Device,
        common: Arc<RenderCommon>,
        cache_builder: &mut PipelineCacheBuilder,
    ) -> anyhow::Result<Self> {
        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("camera_bind_group_layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_bind_group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: common.camera_uniform_buffer.as_entire_binding(),
            }],
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Scene Pipeline Layout"),
                bind_group_layouts: &[
                    &camera_bind_group_layout,
                    &common.lighting.bind_group_layout,
                ],
                push_constant_ranges: &[],
            });

        let surface_format = common.surface_format;

        let lit_pipeline = cache_builder.add_shader(
            LIT_SHADER,
            pipeline_factory(render_pipeline_layout.clone(), surface_format, "fs_lit"),
        );
        let unlit_pipeline = cache_builder.add_shader(
            UNLIT_SHADER,
            pipeline_factory(render_pipeline_layout, surface_format, "fs_unlit"),
        );

        Ok(ScenePass {
            lit_pipeline,
            unlit_pipeline,
            camera_bind_group,
            lighting_bind_group: common.lighting.bind_group.clone(),
        })
    }

    fn render<'a, F>(
        &self,
        target: &Self::Target,
        encoder: &mut wgpu::CommandEncoder,
        _pipeline_cache: &PipelineCache,
        render_callback: F,
    ) where
        F: FnOnce(&mut RenderPass) + 'a,
    {
        let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(target.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &target.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
        render_pass.set_bind_group(1, &self.lighting_bind_group, &[]);

        render_callback(&mut render_pass);
    }
}

fn pipeline_factory(
    layout: wgpu::PipelineLayout,
    surface_format: wgpu::TextureFormat,
    fragment_entry: &'static str,
) -> Box<
    dyn Sync
        + Send
        + Fn(&Device, &ShaderDefinition, &str) -> anyhow::Result<wgpu::RenderPipeline>,
> {
    Box::new(
        move |device: &Device, shader_def: &ShaderDefinition, source: &str| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(shader_def.name),
                source: ShaderSource::Wgsl(source.into()),
            });

            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(shader_def.name),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[RENDER_MODEL_VBL, Instance::descriptor()],
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fragment_entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // Building meshes are often single-sided planes
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DepthTexture::DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: StencilState::default(),
                    bias: DepthBiasState::default(),
                }),
                multisample: MultisampleState::default(),
                multiview: None,
                cache: None,
            });

            Ok(pipeline)
        },
    )
}
