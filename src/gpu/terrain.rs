//! Terrain grid pass.

use wgpu::util::DeviceExt;

use super::{uniform_bind_group, ScenePipeline};
use crate::shaders;
use crate::terrain::{Terrain, TerrainMesh, TerrainVertex};

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

pub(crate) struct TerrainPass {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl TerrainPass {
    pub fn new(device: &wgpu::Device, scene_layout: &wgpu::BindGroupLayout, terrain: &Terrain) -> Self {
        let mesh = TerrainMesh::from_config(terrain.config());

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Terrain Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Terrain Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let (uniform_buffer, layout, bind_group) = uniform_bind_group(
            device,
            "Terrain Uniforms",
            &terrain.uniforms(),
            wgpu::ShaderStages::VERTEX_FRAGMENT,
        );

        let pipeline = ScenePipeline {
            label: "Terrain Pipeline",
            source: shaders::TERRAIN,
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<TerrainVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
            blend: wgpu::BlendState::ALPHA_BLENDING,
            depth_write: true,
        }
        .build(device, scene_layout, &layout);

        Self {
            pipeline,
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            uniform_buffer,
            bind_group,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, terrain: &Terrain) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&terrain.uniforms()));
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, scene: &wgpu::BindGroup) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, scene, &[]);
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}
