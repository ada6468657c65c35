//! Winit event handling.
//!
//! Translates WindowEvent into tracker/app actions. Bindings:
//!   Left drag    → paint (default mapping; right button pans)
//!   Wheel        → zoom about the cursor
//!   Space        → pause/resume
//!   R            → reload the rules file
//!   C            → clear the dish (destructive reset)
//!   [ / ]        → halve / double the grid
//!   Escape       → exit

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key, NamedKey};

use petri_core::PointerButton;

use super::app::{MAX_GRID, MIN_GRID, PetriApp};

fn map_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}

/// Wheel delta in "ticks"; positive zooms in. Pixel deltas from trackpads
/// are scaled down to comparable magnitudes — only the sign matters to
/// the tracker.
fn wheel_amount(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
    }
}

pub fn handle_window_event(
    app: &mut PetriApp,
    event_loop: &ActiveEventLoop,
    event: WindowEvent,
) {
    match event {
        // ── Window lifecycle ──────────────────────────────────────
        WindowEvent::CloseRequested => {
            tracing::info!("window close requested");
            event_loop.exit();
        }

        WindowEvent::Resized(new_size) => {
            app.surface_resized(new_size);
        }

        // ── Pointer ──────────────────────────────────────────────
        WindowEvent::CursorMoved { position, .. } => {
            app.tracker
                .moved(Vec2::new(position.x as f32, position.y as f32));
            // A stroke or drag must render even while paused.
            if app.tracker.drawing() || app.tracker.dragging() {
                app.request_redraw();
            }
        }

        WindowEvent::MouseInput { state, button, .. } => {
            let Some(button) = map_button(button) else {
                return;
            };
            match state {
                ElementState::Pressed => app.tracker.button_pressed(button),
                ElementState::Released => app.tracker.button_released(button),
            }
            // Flush a frame either way: a press paints immediately, a
            // release still shows the final stroke position.
            app.request_redraw();
        }

        WindowEvent::MouseWheel { delta, .. } => {
            app.tracker.wheel(wheel_amount(delta));
            app.request_redraw();
        }

        // ── Keyboard ─────────────────────────────────────────────
        WindowEvent::KeyboardInput { event, .. } => {
            if event.state != ElementState::Pressed {
                return;
            }
            match &event.logical_key {
                Key::Named(NamedKey::Space) => {
                    app.toggle_running();
                }
                Key::Named(NamedKey::Escape) => {
                    event_loop.exit();
                }
                Key::Character(c) if c.as_str() == "r" => {
                    app.reload_rules();
                }
                Key::Character(c) if c.as_str() == "c" => {
                    // Same-size reallocation: the documented destructive
                    // reset path.
                    app.resize_grid(app.config.width, app.config.height);
                }
                Key::Character(c) if c.as_str() == "[" => {
                    app.resize_grid(
                        (app.config.width / 2).max(MIN_GRID),
                        (app.config.height / 2).max(MIN_GRID),
                    );
                }
                Key::Character(c) if c.as_str() == "]" => {
                    app.resize_grid(
                        (app.config.width * 2).min(MAX_GRID),
                        (app.config.height * 2).min(MAX_GRID),
                    );
                }
                _ => {}
            }
        }

        // ── Redraw ───────────────────────────────────────────────
        WindowEvent::RedrawRequested => {
            if let Err(e) = app.redraw() {
                // Resource exhaustion and singular-transform bugs are
                // fatal; there is no degraded mode.
                tracing::error!("frame failed: {:#}", e);
                event_loop.exit();
            }
        }

        _ => {}
    }
}
