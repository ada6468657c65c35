//! Display pass: draws the current state texture to the swapchain
//! through the forward view matrix.

use petri_core::{Slot, ViewTransform};
use wgpu::{
    BindGroup, BindGroupLayout, Buffer, BufferUsages, Device, Queue, RenderPass, RenderPipeline,
    Sampler, TextureFormat,
};

use super::state::StateField;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ViewUniform {
    // mat3x3<f32> uniform layout: three 16-byte-aligned columns.
    matrix: [[f32; 4]; 3],
}

pub struct DisplayPipeline {
    pipeline: RenderPipeline,
    layout: BindGroupLayout,
    sampler: Sampler,
    view_buffer: Buffer,
    /// Indexed by the slot being displayed.
    bind_groups: [BindGroup; 2],
}

impl DisplayPipeline {
    pub fn new(device: &Device, surface_format: TextureFormat, field: &StateField) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("display.wgsl"),
            source: wgpu::ShaderSource::Wgsl(include_str!("display.wgsl").into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("display-bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("display-pl"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("display-pipeline"),
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
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
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
            cache: None,
            multiview_mask: None,
        });

        // Cells are rendered as crisp squares; clamp because the quad
        // already covers exactly one torus tile.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("display-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let view_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("display-view"),
            size: std::mem::size_of::<ViewUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_groups = Self::create_bind_groups(device, &layout, &sampler, &view_buffer, field);

        Self {
            pipeline,
            layout,
            sampler,
            view_buffer,
            bind_groups,
        }
    }

    fn create_bind_groups(
        device: &Device,
        layout: &BindGroupLayout,
        sampler: &Sampler,
        view_buffer: &Buffer,
        field: &StateField,
    ) -> [BindGroup; 2] {
        [Slot::A, Slot::B].map(|shown| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("display-bg"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(field.view(shown)),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: view_buffer.as_entire_binding(),
                    },
                ],
            })
        })
    }

    /// Rebinds the freshly allocated textures after a field resize.
    pub fn rebuild(&mut self, device: &Device, field: &StateField) {
        self.bind_groups =
            Self::create_bind_groups(device, &self.layout, &self.sampler, &self.view_buffer, field);
    }

    /// Draws the active state texture into the given pass.
    pub fn render(
        &self,
        queue: &Queue,
        pass: &mut RenderPass<'_>,
        view: &ViewTransform,
        active: Slot,
    ) {
        let uniform = ViewUniform {
            matrix: view.gpu_columns(),
        };
        queue.write_buffer(&self.view_buffer, 0, bytemuck::bytes_of(&uniform));

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_groups[active.index()], &[]);
        pass.draw(0..6, 0..1);
    }
}
