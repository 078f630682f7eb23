use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::scene_graph::light::Light;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable, PartialEq)]
pub struct LightingUniformState {
    pub ambient: [f32; 4],
    pub light_direction: [f32; 4],
    pub light_color: [f32; 4],
}

impl LightingUniformState {
    /// Sums ambient lights; the first directional light is the only one shaded.
    pub fn from_lights(lights: &[Light]) -> Self {
        let mut ambient = Vec3::ZERO;
        let mut directional = None;

        for light in lights {
            match *light {
                Light::Ambient { .. } => ambient += light.radiance(),
                Light::Directional { position, .. } => {
                    if directional.is_none() {
                        directional = Some((-position.normalize_or(Vec3::Y), light.radiance()));
                    }
                }
            }
        }

        let (direction, color) = directional.unwrap_or((Vec3::NEG_Y, Vec3::ZERO));

        Self {
            ambient: ambient.extend(1.0).to_array(),
            light_direction: direction.extend(0.0).to_array(),
            light_color: color.extend(1.0).to_array(),
        }
    }
}

pub struct LightingUniform {
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightingUniform {
    pub fn new(device: &wgpu::Device, initial_state: LightingUniformState) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lighting uniform buffer"),
            contents: bytemuck::cast_slice(&[initial_state]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Lighting uniform bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lighting uniform bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, state: LightingUniformState) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[state]));
    }
}
