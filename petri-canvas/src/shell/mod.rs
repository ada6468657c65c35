//! Application shell.
//!
//! Sub-modules:
//!   app    — application state, frame planning, winit event loop entry
//!   events — WindowEvent translation into tracker/app actions

mod app;
mod events;

pub use app::{FramePlan, PetriApp, aspect_ratio, load_rules, plan_frame, run};
