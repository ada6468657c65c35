//! Double-buffered state textures and the transition pass.
//!
//! `StateField` owns the two equally-sized state textures; which one is
//! the readable "current" state is tracked by an explicit
//! [`SlotPair`](petri_core::SlotPair), never by shuffling references.
//! `StepPipeline` advances the automaton one tick: a fullscreen fragment
//! pass that reads the active texture and writes the inactive one, then
//! toggles the roles exactly once.

use petri_core::rules::{RULE_CHANNELS, STATE_BANDS};
use petri_core::{RuleSet, Slot, SlotPair};
use wgpu::{
    BindGroup, BindGroupLayout, Buffer, BufferUsages, CommandEncoder, Device, Queue,
    RenderPipeline, Sampler, Texture, TextureView,
};

/// Cell texel format. R = hue, G = energy, 8 bits each are plenty for a
/// painted automaton and keep the textures renderable and sampleable
/// everywhere.
pub const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// ════════════════════════════════════════════════════════════════════
// State Field (the texture pair)
// ════════════════════════════════════════════════════════════════════

/// The two GPU-resident state textures plus the role tracker.
pub struct StateField {
    width: u32,
    height: u32,
    views: [TextureView; 2],
    pair: SlotPair,
}

impl StateField {
    /// Allocates both textures. Contents start zeroed (a blank dish);
    /// dimensions are validated upstream by `SimConfig::validate`, and an
    /// allocation failure here is fatal by design.
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let views = [
            Self::create_texture_view(device, width, height, "petri-state-a"),
            Self::create_texture_view(device, width, height, "petri-state-b"),
        ];
        Self {
            width,
            height,
            views,
            pair: SlotPair::new(),
        }
    }

    /// Reallocates both textures at the new size. Existing state is
    /// discarded — a resize is a destructive reset — and every consumer
    /// caching size-derived resources (bind groups, brush radius, aspect
    /// ratio) must be rebuilt immediately after.
    pub fn resize(&mut self, device: &Device, width: u32, height: u32) {
        tracing::info!(width, height, "state field resize (destructive)");
        *self = Self::new(device, width, height);
    }

    fn create_texture_view(
        device: &Device,
        width: u32,
        height: u32,
        label: &str,
    ) -> TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: STATE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn view(&self, slot: Slot) -> &TextureView {
        &self.views[slot.index()]
    }

    /// The readable "current" state.
    pub fn active(&self) -> Slot {
        self.pair.active()
    }

    /// The write target of the next pass.
    pub fn inactive(&self) -> Slot {
        self.pair.inactive()
    }

    /// Role toggle; called exactly once per step or brush pass.
    pub fn swap(&mut self) {
        self.pair.swap();
    }

    pub fn swaps(&self) -> u64 {
        self.pair.swaps()
    }

    /// Wraparound nearest-neighbor sampler shared by the simulation
    /// passes: the automaton lives on a torus.
    pub fn create_torus_sampler(device: &Device) -> Sampler {
        device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("petri-torus-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        })
    }
}

// ════════════════════════════════════════════════════════════════════
// Grid Uniform
// ════════════════════════════════════════════════════════════════════

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct GridUniform {
    size: [f32; 2],
    _pad: [f32; 2],
}

// ════════════════════════════════════════════════════════════════════
// Step Pipeline
// ════════════════════════════════════════════════════════════════════

/// One-tick transition pass, parameterized by the encoded rule texture.
pub struct StepPipeline {
    pipeline: RenderPipeline,
    layout: BindGroupLayout,
    sampler: Sampler,
    grid_buffer: Buffer,
    rules_view: TextureView,
    rules_texture: Texture,
    current_rules: RuleSet,
    /// Indexed by the slot being *read*.
    bind_groups: [BindGroup; 2],
}

impl StepPipeline {
    pub fn new(device: &Device, queue: &Queue, rules: &RuleSet, field: &StateField) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("step.wgsl"),
            source: wgpu::ShaderSource::Wgsl(include_str!("step.wgsl").into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("step-bgl"),
            entries: &[
                // previous state
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
                // rule bands (RGBA32F, read via textureLoad)
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
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
            label: Some("step-pl"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("step-pipeline"),
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

        let grid_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("step-grid"),
            size: std::mem::size_of::<GridUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let rules_texture = create_rule_texture(device);
        let rules_view = rules_texture.create_view(&wgpu::TextureViewDescriptor::default());
        upload_rules(queue, &rules_texture, rules);

        let bind_groups =
            Self::create_bind_groups(device, &layout, &sampler, &rules_view, &grid_buffer, field);

        let step = Self {
            pipeline,
            layout,
            sampler,
            grid_buffer,
            rules_view,
            rules_texture,
            current_rules: *rules,
            bind_groups,
        };
        step.write_grid_uniform(queue, field);
        step
    }

    fn create_bind_groups(
        device: &Device,
        layout: &BindGroupLayout,
        sampler: &Sampler,
        rules_view: &TextureView,
        grid_buffer: &Buffer,
        field: &StateField,
    ) -> [BindGroup; 2] {
        [Slot::A, Slot::B].map(|read| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("step-bg"),
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
                        resource: wgpu::BindingResource::TextureView(rules_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: grid_buffer.as_entire_binding(),
                    },
                ],
            })
        })
    }

    fn write_grid_uniform(&self, queue: &Queue, field: &StateField) {
        let grid = GridUniform {
            size: [field.width() as f32, field.height() as f32],
            _pad: [0.0; 2],
        };
        queue.write_buffer(&self.grid_buffer, 0, bytemuck::bytes_of(&grid));
    }

    /// Rebinds the freshly allocated textures after a field resize.
    pub fn rebuild(&mut self, device: &Device, queue: &Queue, field: &StateField) {
        self.bind_groups = Self::create_bind_groups(
            device,
            &self.layout,
            &self.sampler,
            &self.rules_view,
            &self.grid_buffer,
            field,
        );
        self.write_grid_uniform(queue, field);
    }

    /// Swaps in a new rule set. Cached by value: re-uploads only when the
    /// set actually changed, and takes effect on the next step.
    pub fn set_rules(&mut self, queue: &Queue, rules: &RuleSet) {
        if self.current_rules == *rules {
            return;
        }
        tracing::info!("rule set changed, re-encoding");
        upload_rules(queue, &self.rules_texture, rules);
        self.current_rules = *rules;
    }

    /// Encodes one transition tick: read the active texture, write the
    /// inactive one, toggle the roles. The read and write targets are
    /// distinct textures by construction.
    pub fn advance(&self, encoder: &mut CommandEncoder, field: &mut StateField) {
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("step-pass"),
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

// ════════════════════════════════════════════════════════════════════
// Rule Texture Encoding
// ════════════════════════════════════════════════════════════════════

/// One RGBA32F texel per rule band, 9x1. The channel layout is the
/// convention shared with `step.wgsl`; nothing else decodes it.
fn create_rule_texture(device: &Device) -> Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("petri-rules"),
        size: wgpu::Extent3d {
            width: STATE_BANDS as u32,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba32Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn upload_rules(queue: &Queue, texture: &Texture, rules: &RuleSet) {
    let data = rules.texel_data();
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(&data),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some((STATE_BANDS * RULE_CHANNELS * 4) as u32),
            rows_per_image: Some(1),
        },
        wgpu::Extent3d {
            width: STATE_BANDS as u32,
            height: 1,
            depth_or_array_layers: 1,
        },
    );
}
