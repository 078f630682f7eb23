use crate::rendering::lighting_uniform::{LightingUniform, LightingUniformState};

/// GPU state shared by every pass.
pub struct RenderCommon {
    pub surface_format: wgpu::TextureFormat,
    pub camera_uniform_buffer: wgpu::Buffer,
    pub lighting: LightingUniform,
}

impl RenderCommon {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        camera_uniform_buffer: wgpu::Buffer,
        lighting: LightingUniformState,
    ) -> Self {
        Self {
            surface_format,
            camera_uniform_buffer,
            lighting: LightingUniform::new(device, lighting),
        }
    }
}

/// Picks an sRGB surface format so linear shader output is encoded on write.
pub fn surface_configuration(
    surface: &wgpu::Surface,
    adapter: &wgpu::Adapter,
    width: u32,
    height: u32,
) -> anyhow::Result<wgpu::SurfaceConfiguration> {
    let surface_caps = surface.get_capabilities(adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .or_else(|| surface_caps.formats.first())
        .copied()
        .ok_or_else(|| anyhow::anyhow!("Surface is not supported by the adapter"))?;

    Ok(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: width.max(1),
        height: height.max(1),
        present_mode: surface_caps
            .present_modes
            .first()
            .copied()
            .unwrap_or(wgpu::PresentMode::Fifo),
        alpha_mode: surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    })
}
