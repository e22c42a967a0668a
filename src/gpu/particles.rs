//! Particle sprite pass.
//!
//! Positions are simulated on the CPU and re-uploaded every frame; the
//! buffer is sized once per mount.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::{uniform_bind_group, ScenePipeline};
use crate::particles::{ParticleField, ParticleInstance};
use crate::scene::EffectsLayer;
use crate::shaders;

const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct ParticleUniforms {
    color: [f32; 4],
    params: [f32; 4],
}

pub(crate) struct ParticlePass {
    pipeline: wgpu::RenderPipeline,
    instance_buffer: wgpu::Buffer,
    count: u32,
    // Kept alive for the bind group.
    _uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl ParticlePass {
    pub fn new(device: &wgpu::Device, scene_layout: &wgpu::BindGroupLayout, layer: &EffectsLayer) -> Self {
        let field = layer.particles();
        let config = &layer.config().particles;

        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Instance Buffer"),
            contents: field.as_bytes(),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let uniforms = ParticleUniforms {
            color: config.color.with_alpha(config.opacity),
            params: [config.size, 0.0, 0.0, 0.0],
        };
        let (uniform_buffer, layout, bind_group) = uniform_bind_group(
            device,
            "Particle Uniforms",
            &uniforms,
            wgpu::ShaderStages::VERTEX_FRAGMENT,
        );

        let pipeline = ScenePipeline {
            label: "Particle Pipeline",
            source: shaders::PARTICLES,
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<ParticleInstance>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &INSTANCE_ATTRIBUTES,
            }],
            blend: wgpu::BlendState::ALPHA_BLENDING,
            depth_write: false,
        }
        .build(device, scene_layout, &layout);

        Self {
            pipeline,
            instance_buffer,
            count: field.len() as u32,
            _uniform_buffer: uniform_buffer,
            bind_group,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, field: &ParticleField) {
        if field.len() as u32 != self.count {
            return;
        }
        queue.write_buffer(&self.instance_buffer, 0, field.as_bytes());
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, scene: &wgpu::BindGroup) {
        if self.count == 0 {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, scene, &[]);
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
        pass.draw(0..6, 0..self.count);
    }
}
