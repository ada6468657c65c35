pub mod config;
pub mod gesture;
pub mod rules;
pub mod slot;
pub mod view;

// Re-export the types the canvas wires together every frame
pub use config::SimConfig;
pub use gesture::{ButtonMapping, GestureFrame, GestureIntent, PointerButton, PointerTracker};
pub use rules::{Rule, RuleSet};
pub use slot::{Slot, SlotPair};
pub use view::ViewTransform;
