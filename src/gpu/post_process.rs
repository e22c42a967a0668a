//! Post-processing: bloom and film noise.
//!
//! The scene is rendered into an HDR offscreen texture. A bright pass and
//! two blur passes build the bloom at reduced resolution, then a fullscreen
//! composite writes scene + bloom + noise to the surface.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::{uniform_entry, DEPTH_FORMAT, HDR_FORMAT};
use crate::post::{gaussian_weights, PostConfig};
use crate::shaders;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct BrightUniforms {
    params: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct BlurUniforms {
    direction: [f32; 2],
    center_weight: f32,
    _pad: f32,
    weights: [f32; 4],
}

impl BlurUniforms {
    fn new(direction: [f32; 2]) -> Self {
        let w = gaussian_weights();
        Self {
            direction,
            center_weight: w[0],
            _pad: 0.0,
            weights: [w[1], w[2], w[3], w[4]],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct CompositeUniforms {
    bloom: [f32; 4],
    noise: [f32; 4],
}

/// An offscreen color target.
struct Target {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl Target {
    fn new(device: &wgpu::Device, label: &str, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Size-dependent resources, rebuilt on resize.
struct Targets {
    scene: Target,
    depth: Target,
    bloom_a: Target,
    bloom_b: Target,
    bright_bind_group: wgpu::BindGroup,
    blur_h_bind_group: wgpu::BindGroup,
    blur_v_bind_group: wgpu::BindGroup,
    composite_bind_group: wgpu::BindGroup,
}

/// Size-independent resources the targets are bound against.
struct Shared {
    sampler: wgpu::Sampler,
    source_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    bright_buffer: wgpu::Buffer,
    blur_h_buffer: wgpu::Buffer,
    blur_v_buffer: wgpu::Buffer,
    composite_buffer: wgpu::Buffer,
}

/// GPU resources for post-processing.
pub(crate) struct PostProcessState {
    shared: Shared,
    targets: Targets,
    bright_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    config: PostConfig,
}

impl PostProcessState {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: &PostConfig,
        width: u32,
        height: u32,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Post-Process Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let source_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Post-Process Source Layout"),
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Post-Process Composite Layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                sampler_entry(2),
                uniform_entry(3, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let bright_pipeline = fullscreen_pipeline(
            device,
            "Bloom Bright Pass",
            shaders::POST_BRIGHT,
            &source_layout,
            HDR_FORMAT,
        );
        let blur_pipeline = fullscreen_pipeline(
            device,
            "Bloom Blur Pass",
            shaders::POST_BLUR,
            &source_layout,
            HDR_FORMAT,
        );
        let composite_pipeline = fullscreen_pipeline(
            device,
            "Composite Pass",
            shaders::POST_COMPOSITE,
            &composite_layout,
            surface_format,
        );

        let bright_buffer = uniform_buffer(device, "Bright Uniforms", &BrightUniforms { params: [0.0; 4] });
        let blur_h_buffer = uniform_buffer(device, "Blur H Uniforms", &BlurUniforms::new([0.0, 0.0]));
        let blur_v_buffer = uniform_buffer(device, "Blur V Uniforms", &BlurUniforms::new([0.0, 0.0]));
        let composite_buffer = uniform_buffer(
            device,
            "Composite Uniforms",
            &CompositeUniforms {
                bloom: [0.0; 4],
                noise: [0.0; 4],
            },
        );

        let shared = Shared {
            sampler,
            source_layout,
            composite_layout,
            bright_buffer,
            blur_h_buffer,
            blur_v_buffer,
            composite_buffer,
        };
        let targets = shared.build_targets(device, queue, config, width, height);

        Self {
            shared,
            targets,
            bright_pipeline,
            blur_pipeline,
            composite_pipeline,
            config: config.clone(),
        }
    }

    /// Recreate textures and bind groups after a window resize.
    pub fn resize(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, width: u32, height: u32) {
        self.targets = self
            .shared
            .build_targets(device, queue, &self.config, width, height);
    }

    pub fn scene_view(&self) -> &wgpu::TextureView {
        &self.targets.scene.view
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.targets.depth.view
    }

    /// Upload per-frame parameters. `time` reseeds the noise.
    pub fn update(&mut self, queue: &wgpu::Queue, config: &PostConfig, time: f32) {
        self.config = config.clone();
        let bloom = &config.bloom;
        let noise = &config.noise;

        queue.write_buffer(
            &self.shared.bright_buffer,
            0,
            bytemuck::bytes_of(&BrightUniforms {
                params: [bloom.threshold, bloom.smoothing, 0.0, 0.0],
            }),
        );
        queue.write_buffer(
            &self.shared.composite_buffer,
            0,
            bytemuck::bytes_of(&CompositeUniforms {
                bloom: [bloom.intensity, flag(bloom.enabled), 0.0, 0.0],
                noise: [noise.opacity, flag(noise.enabled), time % 97.0, 0.0],
            }),
        );
    }

    /// Record bloom and composite passes, writing the final image to `output`.
    pub fn execute(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        let t = &self.targets;
        if self.config.bloom.enabled {
            fullscreen_pass(encoder, "Bloom Bright Pass", &t.bloom_a.view, &self.bright_pipeline, &t.bright_bind_group);
            fullscreen_pass(encoder, "Bloom Blur H", &t.bloom_b.view, &self.blur_pipeline, &t.blur_h_bind_group);
            fullscreen_pass(encoder, "Bloom Blur V", &t.bloom_a.view, &self.blur_pipeline, &t.blur_v_bind_group);
        }
        fullscreen_pass(encoder, "Composite Pass", output, &self.composite_pipeline, &t.composite_bind_group);
    }
}

impl Shared {
    fn build_targets(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: &PostConfig,
        width: u32,
        height: u32,
    ) -> Targets {
        let (bw, bh) = config.bloom_extent(width, height);
        let scene = Target::new(device, "Scene HDR Target", HDR_FORMAT, width, height);
        let depth = depth_target(device, width, height);
        let bloom_a = Target::new(device, "Bloom Target A", HDR_FORMAT, bw, bh);
        let bloom_b = Target::new(device, "Bloom Target B", HDR_FORMAT, bw, bh);

        // Blur steps are one texel of the bloom target and only change with size.
        let h = BlurUniforms::new([1.0 / bw as f32, 0.0]);
        let v = BlurUniforms::new([0.0, 1.0 / bh as f32]);
        queue.write_buffer(&self.blur_h_buffer, 0, bytemuck::bytes_of(&h));
        queue.write_buffer(&self.blur_v_buffer, 0, bytemuck::bytes_of(&v));

        let source_group = |label: &str, view: &wgpu::TextureView, buffer: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.source_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: buffer.as_entire_binding(),
                    },
                ],
            })
        };

        let bright_bind_group = source_group("Bright Bind Group", &scene.view, &self.bright_buffer);
        let blur_h_bind_group = source_group("Blur H Bind Group", &bloom_a.view, &self.blur_h_buffer);
        let blur_v_bind_group = source_group("Blur V Bind Group", &bloom_b.view, &self.blur_v_buffer);

        let composite_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Bind Group"),
            layout: &self.composite_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&scene.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&bloom_a.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.composite_buffer.as_entire_binding(),
                },
            ],
        });

        Targets {
            scene,
            depth,
            bloom_a,
            bloom_b,
            bright_bind_group,
            blur_h_bind_group,
            blur_v_bind_group,
            composite_bind_group,
        }
    }
}

fn depth_target(device: &wgpu::Device, width: u32, height: u32) -> Target {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Scene Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Target {
        _texture: texture,
        view,
    }
}

fn flag(enabled: bool) -> f32 {
    if enabled {
        1.0
    } else {
        0.0
    }
}

fn uniform_buffer<T: Pod>(device: &wgpu::Device, label: &str, value: &T) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(value),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}
