//! Application state and winit event loop.
//!
//! The per-frame contract: at most one simulation pass per frame (brush
//! while drawing, transition step while running — drawing wins), each
//! ending in exactly one role swap; the display pass runs only when
//! something is worth showing. While paused and idle the loop goes
//! quiescent and input events wake it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use glam::Vec2;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use petri_core::{
    ButtonMapping, GestureFrame, GestureIntent, PointerTracker, Rule, RuleSet, SimConfig,
    ViewTransform,
};

use crate::gfx::GpuState;

/// Grid-resize bounds for the bracket-key shortcuts.
pub const MIN_GRID: u32 = 32;
pub const MAX_GRID: u32 = 4096;

// ════════════════════════════════════════════════════════════════════
// Frame Planning
// ════════════════════════════════════════════════════════════════════

/// What this frame does. Produced by [`plan_frame`], consumed by
/// [`GpuState::frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePlan {
    /// Advance the automaton one tick.
    pub step: bool,
    /// Stamp the brush instead of stepping.
    pub brush: bool,
    /// Draw the current state to the window.
    pub render: bool,
}

impl FramePlan {
    /// Nothing to simulate, nothing to show.
    pub fn is_idle(&self) -> bool {
        !self.step && !self.brush && !self.render
    }
}

/// Pure frame decision:
/// - drawing stamps the brush and suppresses the step for that frame;
/// - rendering happens while running or mid-gesture, or once after a
///   paused zoom/pan left the view dirty.
pub fn plan_frame(running: bool, frame: &GestureFrame, view_dirty: bool) -> FramePlan {
    let brush = frame.draw;
    let step = running && !brush;
    let render = running || frame.draw || frame.drag || view_dirty;
    FramePlan { step, brush, render }
}

/// Aspect correction between the cell grid and the drawable surface:
/// `(grid_h / surface_h) * (surface_w / grid_w)`. Recomputed whenever
/// either size changes; feeding an unchanged value back into the view
/// transform is a no-op.
pub fn aspect_ratio(grid_w: u32, grid_h: u32, surface: PhysicalSize<u32>) -> f32 {
    (grid_h as f32 / surface.height.max(1) as f32)
        * (surface.width.max(1) as f32 / grid_w as f32)
}

// ════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════

/// Parses and validates a rules file: a JSON array of exactly nine
/// descriptors.
pub fn load_rules(path: &Path) -> anyhow::Result<RuleSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading rules file {}", path.display()))?;
    let rules: Vec<Rule> = serde_json::from_str(&text).context("parsing rules file")?;
    let set = RuleSet::from_rules(rules)?;
    Ok(set)
}

/// The Petri application. Owns all state.
pub struct PetriApp {
    pub config: SimConfig,
    pub rules: RuleSet,
    /// Where the active rule set came from, for the R-key reload.
    pub rules_path: Option<PathBuf>,
    pub running: bool,

    // ── Window + GPU ──
    pub window: Option<Arc<Window>>,
    pub gpu: Option<GpuState>,

    // ── Interaction ──
    pub tracker: PointerTracker,
    pub view: ViewTransform,
    /// Set by zoom/pan intents and resizes; an edge-triggered request for
    /// one render while paused. Cleared after the render happens.
    pub view_dirty: bool,
}

impl PetriApp {
    pub fn new(config: SimConfig, rules: RuleSet, rules_path: Option<PathBuf>) -> Self {
        Self {
            running: config.running,
            tracker: PointerTracker::new(ButtonMapping::default(), 1.0, 1.0),
            view: ViewTransform::scaling(1.0),
            view_dirty: true,
            config,
            rules,
            rules_path,
            window: None,
            gpu: None,
        }
    }

    /// Request a window redraw.
    pub fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    pub fn toggle_running(&mut self) {
        self.running = !self.running;
        tracing::info!(running = self.running, "simulation toggled");
        self.request_redraw();
    }

    /// Window resize: reconfigure the surface, renormalize the tracker,
    /// and recompute the aspect correction.
    pub fn surface_resized(&mut self, new_size: PhysicalSize<u32>) {
        if let Some(gpu) = &mut self.gpu {
            gpu.resize_surface(new_size);
        }
        self.tracker
            .set_surface_size(new_size.width as f32, new_size.height as f32);
        self.view.set_aspect_ratio(aspect_ratio(
            self.config.width,
            self.config.height,
            new_size,
        ));
        self.view_dirty = true;
        self.request_redraw();
    }

    /// Grid resize: a synchronized, destructive reset. The field is
    /// reallocated and every size-derived parameter (bind groups, brush
    /// radius, aspect ratio) is recomputed before the next frame.
    pub fn resize_grid(&mut self, width: u32, height: u32) {
        let candidate = SimConfig {
            width,
            height,
            ..self.config
        };
        if let Err(e) = candidate.validate() {
            tracing::warn!("grid resize rejected: {e}");
            return;
        }
        self.config = candidate;

        if let Some(gpu) = &mut self.gpu {
            gpu.resize_grid(width, height);
            self.view
                .set_aspect_ratio(aspect_ratio(width, height, gpu.size));
        }
        self.view_dirty = true;
        self.request_redraw();
    }

    /// Re-reads the rules file, if one was given. A bad file keeps the
    /// current set; a changed set is re-encoded and applies on the next
    /// step.
    pub fn reload_rules(&mut self) {
        let Some(path) = self.rules_path.clone() else {
            tracing::info!("no rules file to reload");
            return;
        };
        match load_rules(&path) {
            Ok(set) => {
                self.rules = set;
                if let Some(gpu) = &mut self.gpu {
                    gpu.set_rules(&set);
                }
                self.request_redraw();
            }
            Err(e) => {
                tracing::warn!("rules reload failed, keeping current set: {:#}", e);
            }
        }
    }

    /// One frame: drain gesture intents, plan, encode, schedule.
    pub fn redraw(&mut self) -> anyhow::Result<()> {
        for intent in self.tracker.drain_intents() {
            match intent {
                GestureIntent::StrokeStarted => {
                    if let Some(gpu) = &mut self.gpu {
                        gpu.brush.reroll_hue();
                    }
                }
                GestureIntent::TranslateBy(delta) => {
                    self.view.translate(delta);
                    self.view_dirty = true;
                }
                GestureIntent::ZoomBy { factor, pivot } => {
                    self.view.zoom_into(factor, pivot);
                    self.view_dirty = true;
                }
            }
        }

        let frame = self.tracker.sample();
        let plan = plan_frame(self.running, &frame, self.view_dirty);
        if plan.is_idle() {
            return Ok(());
        }

        // Brush placement: cursor through the inverse view, then into
        // texture space. A singular view is a bug, not a runtime case —
        // erroring beats stamping a guessed coordinate.
        let brush_center = if plan.brush {
            let quad = self.view.unproject(frame.position_ndc)?;
            Some((quad + Vec2::ONE) / 2.0)
        } else {
            None
        };

        if let Some(gpu) = &mut self.gpu {
            let rendered = gpu.frame(plan, brush_center, &self.view)?;
            if rendered {
                self.view_dirty = false;
            }
        }

        // Keep the loop hot while something moves; otherwise sleep until
        // the next input event wakes us.
        if self.running || frame.draw || frame.drag {
            self.request_redraw();
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════
// ApplicationHandler
// ════════════════════════════════════════════════════════════════════

impl ApplicationHandler for PetriApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already created
        }

        let desired_w = (self.config.width as f64 * self.config.cell_size as f64).clamp(320.0, 1600.0);
        let desired_h = (self.config.height as f64 * self.config.cell_size as f64).clamp(240.0, 1000.0);
        let attrs = WindowAttributes::default()
            .with_title("Petri /// Culture Dish")
            .with_inner_size(LogicalSize::new(desired_w, desired_h));

        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                match GpuState::new(window.clone(), &self.config, &self.rules) {
                    Ok(gpu) => {
                        let size = window.inner_size();
                        self.tracker
                            .set_surface_size(size.width as f32, size.height as f32);

                        // Initial view: on-screen cell width matches the
                        // configured pixel size.
                        let scale = self.config.cell_size * self.config.width as f32
                            / size.width.max(1) as f32;
                        self.view = ViewTransform::scaling(scale);
                        self.view.set_aspect_ratio(aspect_ratio(
                            self.config.width,
                            self.config.height,
                            size,
                        ));
                        self.view_dirty = true;

                        self.gpu = Some(gpu);
                        self.window = Some(window);
                        tracing::info!("window + GPU initialized");
                        self.request_redraw();
                    }
                    Err(e) => {
                        tracing::error!("GPU init failed: {:#}", e);
                        event_loop.exit();
                    }
                }
            }
            Err(e) => {
                tracing::error!("window creation failed: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Delegate to the events module
        super::events::handle_window_event(self, event_loop, event);
    }
}

// ════════════════════════════════════════════════════════════════════
// Entry Point
// ════════════════════════════════════════════════════════════════════

/// Run the Petri application. Tracing is initialized once in the binary
/// entry point, not here.
pub fn run(
    config: SimConfig,
    rules: RuleSet,
    rules_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = PetriApp::new(config, rules, rules_path);
    event_loop.run_app(&mut app)?;

    Ok(())
}

// ════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_frame() -> GestureFrame {
        GestureFrame {
            draw: false,
            drag: false,
            position_ndc: Vec2::ZERO,
        }
    }

    #[test]
    fn test_running_frame_steps_and_renders() {
        let plan = plan_frame(true, &idle_frame(), false);
        assert_eq!(plan, FramePlan { step: true, brush: false, render: true });
    }

    #[test]
    fn test_drawing_replaces_step() {
        let frame = GestureFrame { draw: true, ..idle_frame() };
        let plan = plan_frame(true, &frame, false);
        assert!(plan.brush);
        assert!(!plan.step, "brush and step are mutually exclusive per frame");
        assert!(plan.render);
    }

    #[test]
    fn test_paused_idle_does_nothing() {
        let plan = plan_frame(false, &idle_frame(), false);
        assert!(plan.is_idle());
    }

    #[test]
    fn test_paused_zoom_renders_exactly_once() {
        // A wheel tick while paused marks the view dirty: one render, no
        // step.
        let plan = plan_frame(false, &idle_frame(), true);
        assert_eq!(plan, FramePlan { step: false, brush: false, render: true });

        // After that render clears the flag, the loop is idle again.
        let plan = plan_frame(false, &idle_frame(), false);
        assert!(plan.is_idle());
    }

    #[test]
    fn test_paused_drawing_still_paints_and_renders() {
        let frame = GestureFrame { draw: true, ..idle_frame() };
        let plan = plan_frame(false, &frame, false);
        assert_eq!(plan, FramePlan { step: false, brush: true, render: true });
    }

    #[test]
    fn test_paused_drag_renders_without_stepping() {
        let frame = GestureFrame { drag: true, ..idle_frame() };
        let plan = plan_frame(false, &frame, false);
        assert_eq!(plan, FramePlan { step: false, brush: false, render: true });
    }

    #[test]
    fn test_aspect_ratio_square_everything_is_one() {
        let ratio = aspect_ratio(256, 256, PhysicalSize::new(512, 512));
        assert!((ratio - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_aspect_ratio_wide_surface() {
        // 2:1 surface over a square grid needs cells twice as tall in
        // NDC y to stay square on screen.
        let ratio = aspect_ratio(128, 128, PhysicalSize::new(1024, 512));
        assert!((ratio - 2.0).abs() < 1e-6);
    }
}
