//! wgpu device/surface lifecycle and per-frame orchestration.
//!
//! GpuState owns the device, queue, surface, config, the state texture
//! pair, and the three pipelines. Each frame it encodes at most one
//! simulation pass (step or brush, never both) and optionally the display
//! pass into the swapchain texture.

use std::sync::Arc;

use anyhow::Context;
use glam::Vec2;
use petri_core::{RuleSet, SimConfig, ViewTransform};
use wgpu::{
    Backends, Device, DeviceDescriptor, Instance, InstanceDescriptor, PowerPreference, Queue,
    RequestAdapterOptions, Surface, SurfaceConfiguration, TextureFormat, TextureUsages,
    TextureViewDescriptor,
};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::brush::BrushPipeline;
use super::display::DisplayPipeline;
use super::state::{StateField, StepPipeline};
use crate::shell::FramePlan;

/// Owns all GPU state. Created once per window.
pub struct GpuState {
    pub surface: Surface<'static>,
    pub device: Device,
    pub queue: Queue,
    pub config: SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    pub format: TextureFormat,

    // Simulation resources
    pub field: StateField,
    pub step: StepPipeline,
    pub brush: BrushPipeline,
    pub display: DisplayPipeline,
}

impl GpuState {
    /// Initialize wgpu with the given window. Blocks until the adapter is
    /// ready. Adapter, device, and texture acquisition failures are fatal
    /// — the simulation cannot run without its state textures.
    pub fn new(window: Arc<Window>, sim: &SimConfig, rules: &RuleSet) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let instance = Instance::new(&InstanceDescriptor {
            backends: Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
            power_preference: PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no suitable GPU adapter found")?;

        tracing::info!(
            "GPU adapter: {} ({:?})",
            adapter.get_info().name,
            adapter.get_info().backend
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&DeviceDescriptor {
            label: Some("petri-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        }))
        .context("GPU device request failed")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let field = StateField::new(&device, sim.width, sim.height);
        let step = StepPipeline::new(&device, &queue, rules, &field);
        let brush = BrushPipeline::new(&device, &field);
        let display = DisplayPipeline::new(&device, format, &field);

        tracing::info!(
            grid_w = sim.width,
            grid_h = sim.height,
            "simulation pipelines ready"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size: PhysicalSize::new(width, height),
            format,
            field,
            step,
            brush,
            display,
        })
    }

    /// Handle window resize.
    pub fn resize_surface(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Reallocates the state textures at a new grid size and rebuilds
    /// everything that caches size-derived resources, in one synchronized
    /// path. Destroys the simulation contents.
    pub fn resize_grid(&mut self, width: u32, height: u32) {
        self.field.resize(&self.device, width, height);
        self.step.rebuild(&self.device, &self.queue, &self.field);
        self.brush.rebuild(&self.device, &self.field);
        self.display.rebuild(&self.device, &self.field);
    }

    /// Swaps in a new rule set; takes effect on the next step.
    pub fn set_rules(&mut self, rules: &RuleSet) {
        self.step.set_rules(&self.queue, rules);
    }

    /// Executes one frame plan. `brush_center` is the stamp position in
    /// texture space when the plan includes a brush pass.
    ///
    /// Returns Ok(true) if the display pass was presented, Ok(false) if
    /// rendering was skipped (nothing to show, or the surface needed
    /// reconfiguring — simulation work is still submitted in that case).
    pub fn frame(
        &mut self,
        plan: FramePlan,
        brush_center: Option<Vec2>,
        view: &ViewTransform,
    ) -> anyhow::Result<bool> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        if let (true, Some(center)) = (plan.brush, brush_center) {
            self.brush
                .paint(&self.queue, &mut encoder, &mut self.field, center);
        } else if plan.step {
            self.step.advance(&mut encoder, &mut self.field);
        }

        if !plan.render {
            self.queue.submit(std::iter::once(encoder.finish()));
            return Ok(false);
        }

        let output = match self.surface.get_current_texture() {
            Ok(tex) => tex,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // Keep the simulation tick; only the presentation is skipped.
                self.queue.submit(std::iter::once(encoder.finish()));
                self.surface.configure(&self.device, &self.config);
                return Ok(false);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow::anyhow!("GPU out of memory"));
            }
            Err(e) => {
                self.queue.submit(std::iter::once(encoder.finish()));
                tracing::warn!("surface error: {:?}", e);
                return Ok(false);
            }
        };

        let surface_view = output.texture.create_view(&TextureViewDescriptor::default());

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("display-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
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

            self.display
                .render(&self.queue, &mut pass, view, self.field.active());
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(true)
    }
}
