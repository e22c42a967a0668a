//! Starfield pass. Static instance data, additive blending, no fog.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::{uniform_bind_group, ScenePipeline, ADDITIVE_BLENDING};
use crate::shaders;
use crate::starfield::{Star, Starfield};

const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32, 2 => Float32x4];

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct StarUniforms {
    params: [f32; 4],
}

pub(crate) struct StarPass {
    pipeline: wgpu::RenderPipeline,
    instance_buffer: wgpu::Buffer,
    count: u32,
    _uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl StarPass {
    pub fn new(device: &wgpu::Device, scene_layout: &wgpu::BindGroupLayout, starfield: &Starfield) -> Self {
        // A zero-sized vertex buffer cannot be bound; keep one dummy star.
        let placeholder = [Star {
            position: [0.0; 3],
            size: 0.0,
            color: [0.0; 4],
        }];
        let contents = if starfield.is_empty() {
            bytemuck::cast_slice(&placeholder)
        } else {
            starfield.as_bytes()
        };
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Star Instance Buffer"),
            contents,
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniforms = StarUniforms {
            params: [
                if starfield.fade() { 1.0 } else { 0.0 },
                starfield.speed(),
                0.0,
                0.0,
            ],
        };
        let (uniform_buffer, layout, bind_group) = uniform_bind_group(
            device,
            "Star Uniforms",
            &uniforms,
            wgpu::ShaderStages::VERTEX_FRAGMENT,
        );

        let pipeline = ScenePipeline {
            label: "Star Pipeline",
            source: shaders::STARS,
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Star>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &INSTANCE_ATTRIBUTES,
            }],
            blend: ADDITIVE_BLENDING,
            depth_write: false,
        }
        .build(device, scene_layout, &layout);

        Self {
            pipeline,
            instance_buffer,
            count: starfield.len() as u32,
            _uniform_buffer: uniform_buffer,
            bind_group,
        }
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
