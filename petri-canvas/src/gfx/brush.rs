//! Brush pass: stamps a blended circle into the inactive state texture.
//!
//! While the user is drawing, this pass replaces the transition step for
//! the frame — it reads the active texture (so everything outside the
//! stamp is carried over unchanged) and writes the inactive one, followed
//! by the same single role swap a step would perform.

use glam::Vec2;
use petri_core::Slot;
use wgpu::{
    BindGroup, BindGroupLayout, Buffer, BufferUsages, CommandEncoder, Device, Queue,
    RenderPipeline, Sampler,
};

use super::state::{STATE_FORMAT, StateField};

/// Default stamp radius, in cells.
const BRUSH_CELLS: f32 = 10.0;

/// Stamp radius for a grid of the given width, as a fraction of grid
/// width. Size-relative, so it must be recomputed on every grid resize.
fn default_radius(width: u32) -> f32 {
    BRUSH_CELLS / width.max(1) as f32
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct BrushUniform {
    size: [f32; 2],
    center: [f32; 2],
    radius: f32,
    hue: f32,
    _pad: [f32; 2],
}

pub struct BrushPipeline {
    pipeline: RenderPipeline,
    layout: BindGroupLayout,
    sampler: Sampler,
    uniform_buffer: Buffer,
    /// Indexed by the slot being *read*.
    bind_groups: [BindGroup; 2],
    /// Stamp radius as a fraction of grid width (`BRUSH_CELLS / width`).
    radius: f32,
    /// Current stroke hue in [0,1); re-rolled per stroke, constant
    /// mid-stroke.
    hue: f32,
}

impl BrushPipeline {
    pub fn new(device: &Device, field: &StateField) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("brush.wgsl"),
            source: wgpu::ShaderSource::Wgsl(include_str!("brush.wgsl").into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("brush-bgl"),
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
                    visibility: wgpu::ShaderStages::FRAGMENT,
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
            label: Some("brush-pl"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("brush-pipeline"),
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
                    format: STATE_FORMAT,
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
            cache: None,
            multiview_mask: None,
        });

        let sampler = StateField::create_torus_sampler(device);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("brush-uniform"),
            size: std::mem::size_of::<BrushUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_groups =
            Self::create_bind_groups(device, &layout, &sampler, &uniform_buffer, field);

        Self {
            pipeline,
            layout,
            sampler,
            uniform_buffer,
            bind_groups,
            radius: default_radius(field.width()),
            hue: 0.0,
        }
    }

    fn create_bind_groups(
        device: &Device,
        layout: &BindGroupLayout,
        sampler: &Sampler,
        uniform_buffer: &Buffer,
        field: &StateField,
    ) -> [BindGroup; 2] {
        [Slot::A, Slot::B].map(|read| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("brush-bg"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(field.view(read)),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                ],
            })
        })
    }

    /// Recomputes size-derived parameters and rebinds the new textures.
    /// Must run whenever the field's size changed, before the next stamp.
    pub fn rebuild(&mut self, device: &Device, field: &StateField) {
        self.radius = default_radius(field.width());
        self.bind_groups =
            Self::create_bind_groups(device, &self.layout, &self.sampler, &self.uniform_buffer, field);
    }

    /// A fresh stroke gets a fresh color so consecutive strokes stay
    /// distinguishable.
    pub fn reroll_hue(&mut self) {
        self.hue = rand::random::<f32>();
        tracing::debug!(hue = self.hue, "stroke hue re-rolled");
    }

    /// Stamp radius as a fraction of grid width.
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn hue(&self) -> f32 {
        self.hue
    }

    /// Encodes the stamp at `center` (texture space, [0,1]^2) and toggles
    /// the roles so the painted texture becomes the visible one.
    pub fn paint(
        &self,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        field: &mut StateField,
        center: Vec2,
    ) {
        let uniform = BrushUniform {
            size: [field.width() as f32, field.height() as f32],
            center: [center.x, center.y],
            radius: self.radius,
            hue: self.hue,
            _pad: [0.0; 2],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("brush-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: field.view(field.inactive()),
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_groups[field.active().index()], &[]);
            pass.draw(0..3, 0..1);
        }
        field.swap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_is_size_relative() {
        // Ten cells of a 256-wide grid.
        assert!((default_radius(256) - 10.0 / 256.0).abs() < 1e-7);
        // Doubling the grid width halves the texture-space radius, so the
        // stamp keeps covering the same number of cells.
        assert!((default_radius(512) - default_radius(256) / 2.0).abs() < 1e-7);
    }

    #[test]
    fn test_radius_in_absolute_cells_tracks_width() {
        for width in [64u32, 128, 1024] {
            let cells = default_radius(width) * width as f32;
            assert!((cells - 10.0).abs() < 1e-3);
        }
    }
}
