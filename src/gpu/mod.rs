//! wgpu renderer for a mounted [`EffectsLayer`].
//!
//! Frame layout:
//!
//! 1. Scene pass into an HDR offscreen target: stars, terrain, particles.
//! 2. Post-processing: bright pass, separable blur, composite to the surface.
//! 3. Optional host content (the debug HUD).
//! 4. Cursor overlay, drawn last with its own blend modes.
//!
//! The renderer only reads the layer. All simulation happens in
//! [`EffectsLayer::update`].

mod overlay;
mod particles;
mod post_process;
mod stars;
mod terrain;

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::error::GpuError;
use crate::scene::EffectsLayer;
use crate::starfield::MAX_POINT_LIGHTS;

use overlay::OverlayPass;
use particles::ParticlePass;
use post_process::PostProcessState;
use stars::StarPass;
use terrain::TerrainPass;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub(crate) const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Host drawing hook run between post-processing and the cursor overlay.
pub type ContentLayer<'a> =
    &'a mut dyn FnMut(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView);

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct GpuPointLight {
    /// xyz = position, w = intensity.
    pub position: [f32; 4],
    pub color: [f32; 4],
}

/// Group 0 block shared by the 3D passes. Mirrors `Scene` in `common.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub background: [f32; 4],
    pub fog: [f32; 4],
    pub ambient: [f32; 4],
    pub lights: [GpuPointLight; MAX_POINT_LIGHTS],
    pub viewport: [f32; 4],
    pub time: f32,
    pub light_count: u32,
    pub _pad: [u32; 2],
}

impl SceneUniforms {
    /// Snapshot of `layer` for a surface of `width × height` physical pixels.
    pub fn from_layer(layer: &EffectsLayer, width: u32, height: u32, scale_factor: f32) -> Self {
        let config = layer.config();
        let camera = layer.camera();
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let view = camera.view_matrix();
        let proj = camera.projection_matrix(aspect);

        let lighting = &config.lighting;
        let mut lights = [GpuPointLight::default(); MAX_POINT_LIGHTS];
        for (slot, light) in lights.iter_mut().zip(&lighting.point_lights) {
            *slot = GpuPointLight {
                position: light.position.extend(light.intensity).to_array(),
                color: light.color.with_alpha(1.0),
            };
        }
        let fog = &lighting.fog;

        Self {
            view_proj: (proj * view).to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            camera_pos: camera.position().extend(1.0).to_array(),
            background: config.theme.background.with_alpha(1.0),
            fog: [fog.near, fog.far, if fog.enabled { 1.0 } else { 0.0 }, 0.0],
            ambient: [lighting.ambient_intensity, 0.0, 0.0, 0.0],
            lights,
            viewport: [width as f32, height as f32, scale_factor, 0.0],
            time: layer.elapsed(),
            light_count: lighting.point_lights.len().min(MAX_POINT_LIGHTS) as u32,
            _pad: [0; 2],
        }
    }
}

/// GPU state for one window.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    scene_layout: wgpu::BindGroupLayout,
    terrain: TerrainPass,
    particles: ParticlePass,
    stars: StarPass,
    post: PostProcessState,
    overlay: OverlayPass,
    clear_color: wgpu::Color,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, layer: &EffectsLayer) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("Using GPU adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Backdrop Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let scene_uniforms =
            SceneUniforms::from_layer(layer, config.width, config.height, window.scale_factor() as f32);
        let scene_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Uniform Buffer"),
            contents: bytemuck::bytes_of(&scene_uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
        });
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &scene_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        });

        let terrain = TerrainPass::new(&device, &scene_layout, layer.terrain());
        let particles = ParticlePass::new(&device, &scene_layout, layer);
        let stars = StarPass::new(&device, &scene_layout, layer.starfield());
        let post = PostProcessState::new(&device, &queue, &layer.config().post, config.width, config.height, surface_format);
        let overlay = OverlayPass::new(&device, surface_format, layer.config().cursor.trail_capacity + 2);

        let [r, g, b] = layer.config().theme.background.linear();
        let clear_color = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        };

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            scene_buffer,
            scene_bind_group,
            scene_layout,
            terrain,
            particles,
            stars,
            post,
            overlay,
            clear_color,
        })
    }

    /// Rebuild the per-mount buffers for a freshly mounted layer.
    pub fn load_scene(&mut self, layer: &EffectsLayer) {
        self.terrain = TerrainPass::new(&self.device, &self.scene_layout, layer.terrain());
        self.particles = ParticlePass::new(&self.device, &self.scene_layout, layer);
        self.stars = StarPass::new(&self.device, &self.scene_layout, layer.starfield());
        log::debug!("Reloaded GPU buffers for a new mount");
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.post.resize(&self.device, &self.queue, width, height);
    }

    /// Reconfigure the surface at its current size after `Lost`/`Outdated`.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Draw one frame of `layer`.
    pub fn render(
        &mut self,
        layer: &EffectsLayer,
        content: Option<ContentLayer<'_>>,
    ) -> Result<(), wgpu::SurfaceError> {
        let (width, height) = self.size();
        if width == 0 || height == 0 {
            return Ok(());
        }
        let scale_factor = self.window.scale_factor() as f32;

        let uniforms = SceneUniforms::from_layer(layer, width, height, scale_factor);
        self.queue.write_buffer(&self.scene_buffer, 0, bytemuck::bytes_of(&uniforms));
        self.terrain.update(&self.queue, layer.terrain());
        self.particles.update(&self.queue, layer.particles());
        self.post.update(&self.queue, &layer.config().post, layer.elapsed());
        self.overlay.update(
            &self.device,
            &self.queue,
            layer.cursor(),
            width as f32 / scale_factor,
            height as f32 / scale_factor,
        );

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.post.scene_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.post.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // Stars first: they sit behind everything and never write depth.
            self.stars.draw(&mut pass, &self.scene_bind_group);
            self.terrain.draw(&mut pass, &self.scene_bind_group);
            self.particles.draw(&mut pass, &self.scene_bind_group);
        }

        self.post.execute(&mut encoder, &view);

        if let Some(content) = content {
            content(&self.device, &self.queue, &mut encoder, &view);
        }

        self.overlay.draw(&mut encoder, &view);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub(crate) fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Uniform buffer plus a one-entry bind group for it.
pub(crate) fn uniform_bind_group<T: Pod>(
    device: &wgpu::Device,
    label: &str,
    value: &T,
    visibility: wgpu::ShaderStages,
) -> (wgpu::Buffer, wgpu::BindGroupLayout, wgpu::BindGroup) {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(value),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[uniform_entry(0, visibility)],
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: &layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });
    (buffer, layout, bind_group)
}

/// Settings that differ between the three scene pipelines.
pub(crate) struct ScenePipeline<'a> {
    pub label: &'a str,
    pub source: &'a str,
    pub buffers: &'a [wgpu::VertexBufferLayout<'a>],
    pub blend: wgpu::BlendState,
    pub depth_write: bool,
}

impl ScenePipeline<'_> {
    pub fn build(
        &self,
        device: &wgpu::Device,
        scene_layout: &wgpu::BindGroupLayout,
        pass_layout: &wgpu::BindGroupLayout,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(self.label),
            source: wgpu::ShaderSource::Wgsl(self.source.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(self.label),
            bind_group_layouts: &[scene_layout, pass_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(self.label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: self.buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: Some(self.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: self.depth_write,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}

/// Additive blend used by the starfield.
pub(crate) const ADDITIVE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent::OVER,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EffectsConfig;

    #[test]
    fn test_scene_uniform_layout() {
        // Must match the WGSL `Scene` struct.
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 416);
        assert_eq!(std::mem::size_of::<GpuPointLight>(), 32);
    }

    #[test]
    fn test_scene_uniforms_from_layer() {
        let layer = EffectsLayer::mount(EffectsConfig::default().with_seed(3)).unwrap();
        let u = SceneUniforms::from_layer(&layer, 1280, 720, 2.0);
        assert_eq!(u.light_count, 2);
        assert_eq!(u.fog, [8.0, 25.0, 1.0, 0.0]);
        assert_eq!(u.viewport, [1280.0, 720.0, 2.0, 0.0]);
        assert!((u.lights[0].position[3] - 0.3).abs() < 1e-6);
        assert!((u.camera_pos[1] - 5.0).abs() < 1e-4);
    }
}
