//! Simulation configuration and boundary validation.
//!
//! Bad dimensions are rejected here, before any GPU allocation is
//! attempted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound per grid axis. Matches the guaranteed minimum 2D texture
/// dimension limit of the GPU backend.
pub const MAX_GRID_DIM: u32 = 8192;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("grid dimensions must be non-zero, got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },

    #[error("grid dimensions exceed the {MAX_GRID_DIM} per-axis limit: {width}x{height}")]
    Oversized { width: u32, height: u32 },

    #[error("cell size must be positive, got {cell_size}")]
    NonPositiveCellSize { cell_size: f32 },
}

/// Host-facing configuration for one canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Logical cell grid width.
    pub width: u32,
    /// Logical cell grid height.
    pub height: u32,
    /// Whether the automaton advances every frame (pause/resume).
    pub running: bool,
    /// Initial on-screen width of one cell, in pixels.
    pub cell_size: f32,
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroDimension {
                width: self.width,
                height: self.height,
            });
        }
        if self.width > MAX_GRID_DIM || self.height > MAX_GRID_DIM {
            return Err(ConfigError::Oversized {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.cell_size > 0.0) {
            return Err(ConfigError::NonPositiveCellSize {
                cell_size: self.cell_size,
            });
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            running: true,
            cell_size: 4.0,
        }
    }
}
