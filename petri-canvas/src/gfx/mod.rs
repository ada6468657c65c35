//! GPU Rendering Subsystem.
//!
//! Manages the wgpu device, surface, and the three pipelines of the
//! simulation. Sub-modules:
//!   renderer — wgpu device/surface lifecycle, frame orchestration
//!   state    — double-buffered state textures + the transition pass
//!   brush    — circular stamp pass into the inactive state texture
//!   display  — renders the current state through the view transform

mod brush;
mod display;
mod renderer;
mod state;

pub use brush::BrushPipeline;
pub use display::DisplayPipeline;
pub use renderer::GpuState;
pub use state::{StateField, StepPipeline};
