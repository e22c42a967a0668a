//! Cursor overlay pass.
//!
//! Draws the trail, ring and dot as instanced quads directly onto the
//! surface, after every other pass. Alpha-blended shapes go first, then the
//! difference-blended dot.

use bytemuck::{Pod, Zeroable};

use super::uniform_bind_group;
use crate::cursor::{CursorTrail, OverlayBlend, OverlayShape, ShapeKind};
use crate::shaders;

const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    0 => Float32x2,
    1 => Float32,
    2 => Float32,
    3 => Float32x4,
    4 => Uint32,
];

/// Inverts the destination where the source is opaque; close to a CSS
/// `difference` blend for saturated accents.
const DIFFERENCE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::OneMinusDst,
        dst_factor: wgpu::BlendFactor::OneMinusSrc,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent::OVER,
};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct OverlayInstance {
    center: [f32; 2],
    radius: f32,
    width: f32,
    color: [f32; 4],
    kind: u32,
    _pad: [u32; 3],
}

impl From<&OverlayShape> for OverlayInstance {
    fn from(shape: &OverlayShape) -> Self {
        Self {
            center: shape.center.to_array(),
            radius: shape.radius,
            width: shape.width,
            color: shape.color,
            kind: match shape.kind {
                ShapeKind::Disc => 0,
                ShapeKind::Ring => 1,
                ShapeKind::Glow => 2,
            },
            _pad: [0; 3],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct OverlayUniforms {
    viewport: [f32; 4],
}

pub(crate) struct OverlayPass {
    alpha_pipeline: wgpu::RenderPipeline,
    difference_pipeline: wgpu::RenderPipeline,
    instance_buffer: wgpu::Buffer,
    capacity: usize,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// Reused every frame; alpha shapes then difference shapes.
    instances: Vec<OverlayInstance>,
    alpha_count: u32,
    difference_count: u32,
}

impl OverlayPass {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let instance_buffer = create_instance_buffer(device, capacity);

        let (uniform_buffer, layout, bind_group) = uniform_bind_group(
            device,
            "Overlay Uniforms",
            &OverlayUniforms { viewport: [1.0, 1.0, 0.0, 0.0] },
            wgpu::ShaderStages::VERTEX,
        );

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Overlay Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::OVERLAY.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = |label: &str, entry_point: &str, blend: wgpu::BlendState| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<OverlayInstance>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &INSTANCE_ATTRIBUTES,
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry_point),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: Some(blend),
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
        };

        let alpha_pipeline = pipeline("Overlay Alpha Pipeline", "fs_alpha", wgpu::BlendState::ALPHA_BLENDING);
        let difference_pipeline =
            pipeline("Overlay Difference Pipeline", "fs_difference", DIFFERENCE_BLENDING);

        Self {
            alpha_pipeline,
            difference_pipeline,
            instance_buffer,
            capacity,
            uniform_buffer,
            bind_group,
            instances: Vec::with_capacity(capacity),
            alpha_count: 0,
            difference_count: 0,
        }
    }

    /// Collect this frame's shapes. `width`/`height` are in logical pixels.
    pub fn update(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        cursor: &CursorTrail,
        width: f32,
        height: f32,
    ) {
        self.instances.clear();
        self.instances.extend(
            cursor
                .shapes()
                .filter(|s| s.blend == OverlayBlend::Alpha)
                .map(|s| OverlayInstance::from(&s)),
        );
        self.alpha_count = self.instances.len() as u32;
        self.instances.extend(
            cursor
                .shapes()
                .filter(|s| s.blend == OverlayBlend::Difference)
                .map(|s| OverlayInstance::from(&s)),
        );
        self.difference_count = self.instances.len() as u32 - self.alpha_count;

        if self.instances.is_empty() {
            return;
        }
        if self.instances.len() > self.capacity {
            self.capacity = self.instances.len().next_power_of_two();
            self.instance_buffer = create_instance_buffer(device, self.capacity);
        }

        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&self.instances));
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&OverlayUniforms {
                viewport: [width.max(1.0), height.max(1.0), 0.0, 0.0],
            }),
        );
    }

    pub fn draw(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        if self.instances.is_empty() {
            return;
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Cursor Overlay Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.instance_buffer.slice(..));

        if self.alpha_count > 0 {
            pass.set_pipeline(&self.alpha_pipeline);
            pass.draw(0..6, 0..self.alpha_count);
        }
        if self.difference_count > 0 {
            let start = self.alpha_count;
            pass.set_pipeline(&self.difference_pipeline);
            pass.draw(0..6, start..start + self.difference_count);
        }
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Overlay Instance Buffer"),
        size: (capacity * std::mem::size_of::<OverlayInstance>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
