//! Pointer gesture classification.
//!
//! `PointerTracker` folds raw pointer/button/wheel events into a small
//! state machine and emits immutable [`GestureIntent`] values. The frame
//! loop drains the intents and applies them to the view transform itself —
//! gesture code never touches shared state.
//!
//! Events arrive whenever the host delivers them; the loop observes a
//! consistent snapshot exactly once per frame via [`PointerTracker::sample`].

use glam::Vec2;

/// Zoom speed per wheel tick.
pub const ZOOM_INTENSITY: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Which physical button drives which gesture. Hosts that prefer
/// pan-on-primary can swap the assignment instead of patching the state
/// machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonMapping {
    pub draw: PointerButton,
    pub pan: PointerButton,
}

impl Default for ButtonMapping {
    fn default() -> Self {
        Self {
            draw: PointerButton::Primary,
            pan: PointerButton::Secondary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GesturePhase {
    Idle,
    Drawing,
    Dragging,
}

/// Immutable movement/zoom message for the frame loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureIntent {
    /// The draw button went down: a new stroke begins (re-roll the hue).
    StrokeStarted,
    /// Pan by this NDC delta.
    TranslateBy(Vec2),
    /// Zoom by `factor` about `pivot` (cursor position, NDC).
    ZoomBy { factor: f32, pivot: Vec2 },
}

/// Per-frame snapshot of the gesture flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureFrame {
    pub draw: bool,
    pub drag: bool,
    /// Cursor position in NDC (y up).
    pub position_ndc: Vec2,
}

/// State machine over raw pointer events.
pub struct PointerTracker {
    mapping: ButtonMapping,
    /// Drawable surface size in physical pixels, for NDC normalization.
    surface: Vec2,
    phase: GesturePhase,
    /// Button released mid-frame: the phase survives until the next
    /// `sample()` so the frame in flight still sees the final stroke
    /// position. A press/release pair between two frames paints once.
    release_pending: bool,
    /// Last cursor position, physical pixels, y down.
    position: Vec2,
    /// NDC delta of the most recent move.
    last_movement: Vec2,
    intents: Vec<GestureIntent>,
}

impl PointerTracker {
    pub fn new(mapping: ButtonMapping, surface_w: f32, surface_h: f32) -> Self {
        Self {
            mapping,
            surface: Vec2::new(surface_w.max(1.0), surface_h.max(1.0)),
            phase: GesturePhase::Idle,
            release_pending: false,
            position: Vec2::ZERO,
            last_movement: Vec2::ZERO,
            intents: Vec::new(),
        }
    }

    /// Keeps NDC normalization in sync with the drawable size.
    pub fn set_surface_size(&mut self, surface_w: f32, surface_h: f32) {
        self.surface = Vec2::new(surface_w.max(1.0), surface_h.max(1.0));
    }

    pub fn button_pressed(&mut self, button: PointerButton) {
        let next = if button == self.mapping.draw {
            self.intents.push(GestureIntent::StrokeStarted);
            GesturePhase::Drawing
        } else if button == self.mapping.pan {
            GesturePhase::Dragging
        } else {
            return;
        };
        tracing::debug!(from = ?self.phase, to = ?next, "gesture phase change");
        self.phase = next;
        self.release_pending = false;
    }

    pub fn button_released(&mut self, button: PointerButton) {
        let matches_phase = match self.phase {
            GesturePhase::Drawing => button == self.mapping.draw,
            GesturePhase::Dragging => button == self.mapping.pan,
            GesturePhase::Idle => false,
        };
        if matches_phase {
            // Deferred: cleared by the next sample(), not here.
            self.release_pending = true;
        }
    }

    /// Cursor moved to `to` (physical pixels, y down).
    pub fn moved(&mut self, to: Vec2) {
        let delta_px = to - self.position;
        self.position = to;
        // Pixel delta over half the surface, y flipped into NDC.
        self.last_movement = Vec2::new(
            2.0 * delta_px.x / self.surface.x,
            -2.0 * delta_px.y / self.surface.y,
        );
        if self.phase == GesturePhase::Dragging && !self.release_pending {
            self.intents.push(GestureIntent::TranslateBy(self.last_movement));
        }
    }

    /// Wheel tick; positive `amount` is scroll-up and zooms in. Zoom does
    /// not participate in the press/drag state machine and fires in any
    /// phase.
    pub fn wheel(&mut self, amount: f32) {
        if amount == 0.0 {
            return;
        }
        let factor = (amount.signum() * ZOOM_INTENSITY).exp();
        self.intents.push(GestureIntent::ZoomBy {
            factor,
            pivot: self.position_ndc(),
        });
    }

    /// The per-frame snapshot. Clears a pending release *after* reporting,
    /// so the last stroke/drag position still reaches this frame's render.
    pub fn sample(&mut self) -> GestureFrame {
        let frame = GestureFrame {
            draw: self.phase == GesturePhase::Drawing,
            drag: self.phase == GesturePhase::Dragging,
            position_ndc: self.position_ndc(),
        };
        if self.release_pending {
            tracing::debug!(from = ?self.phase, "gesture released");
            self.phase = GesturePhase::Idle;
            self.release_pending = false;
        }
        frame
    }

    /// Takes all intents queued since the last drain.
    pub fn drain_intents(&mut self) -> Vec<GestureIntent> {
        std::mem::take(&mut self.intents)
    }

    /// True while the draw button is held (false as soon as it is
    /// released, independent of the frame-deferred `sample` flag).
    pub fn drawing(&self) -> bool {
        self.phase == GesturePhase::Drawing && !self.release_pending
    }

    pub fn dragging(&self) -> bool {
        self.phase == GesturePhase::Dragging && !self.release_pending
    }

    /// Last raw cursor position, physical pixels.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Last cursor position in NDC (y up).
    pub fn position_ndc(&self) -> Vec2 {
        Vec2::new(
            2.0 * self.position.x / self.surface.x - 1.0,
            1.0 - 2.0 * self.position.y / self.surface.y,
        )
    }

    /// NDC delta of the most recent move event.
    pub fn last_movement(&self) -> Vec2 {
        self.last_movement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> PointerTracker {
        PointerTracker::new(ButtonMapping::default(), 200.0, 100.0)
    }

    #[test]
    fn test_drawing_spans_press_to_release() {
        let mut t = tracker();
        t.moved(Vec2::new(10.0, 10.0));

        t.button_pressed(PointerButton::Primary);
        assert!(t.drawing());

        t.moved(Vec2::new(15.0, 10.0));
        assert!(t.drawing());
        t.moved(Vec2::new(15.0, 15.0));
        assert!(t.drawing());

        t.button_released(PointerButton::Primary);
        assert!(!t.drawing());
    }

    #[test]
    fn test_movement_sums_to_net_displacement() {
        let mut t = tracker();
        t.moved(Vec2::new(10.0, 10.0));
        t.button_pressed(PointerButton::Primary);

        let mut sum = Vec2::ZERO;
        for to in [Vec2::new(15.0, 10.0), Vec2::new(15.0, 15.0)] {
            t.moved(to);
            sum += t.last_movement();
        }

        // Net displacement (5, 5) px on a 200x100 surface, y flipped.
        assert!((sum - Vec2::new(0.05, -0.1)).length() < 1e-6);
    }

    #[test]
    fn test_release_clears_on_next_sample_not_synchronously() {
        let mut t = tracker();
        t.button_pressed(PointerButton::Primary);
        t.button_released(PointerButton::Primary);

        // The frame in flight still paints the final stroke position.
        assert!(t.sample().draw);
        // The one after does not.
        assert!(!t.sample().draw);
    }

    #[test]
    fn test_stroke_start_emitted_on_draw_press_only() {
        let mut t = tracker();
        t.button_pressed(PointerButton::Secondary);
        assert!(t.drain_intents().is_empty());

        t.button_pressed(PointerButton::Primary);
        assert_eq!(t.drain_intents(), vec![GestureIntent::StrokeStarted]);
    }

    #[test]
    fn test_drag_emits_translate_intents() {
        let mut t = tracker();
        t.moved(Vec2::new(100.0, 50.0));
        t.button_pressed(PointerButton::Secondary);
        assert!(t.dragging());

        t.moved(Vec2::new(110.0, 50.0));
        t.moved(Vec2::new(110.0, 60.0));

        let intents = t.drain_intents();
        assert_eq!(
            intents,
            vec![
                GestureIntent::TranslateBy(Vec2::new(0.1, 0.0)),
                GestureIntent::TranslateBy(Vec2::new(0.0, -0.2)),
            ]
        );
    }

    #[test]
    fn test_drawing_does_not_emit_translate() {
        let mut t = tracker();
        t.button_pressed(PointerButton::Primary);
        t.drain_intents();

        t.moved(Vec2::new(50.0, 50.0));
        assert!(t.drain_intents().is_empty());
    }

    #[test]
    fn test_wheel_zoom_factor_and_pivot() {
        let mut t = tracker();
        // Center of a 200x100 surface is NDC origin.
        t.moved(Vec2::new(100.0, 50.0));
        t.drain_intents();

        t.wheel(1.0);
        t.wheel(-3.0);
        t.wheel(0.0); // ignored

        let intents = t.drain_intents();
        assert_eq!(intents.len(), 2);
        match intents[0] {
            GestureIntent::ZoomBy { factor, pivot } => {
                assert!((factor - ZOOM_INTENSITY.exp()).abs() < 1e-6);
                assert!(pivot.length() < 1e-6);
            }
            _ => panic!("expected ZoomBy"),
        }
        match intents[1] {
            GestureIntent::ZoomBy { factor, .. } => {
                assert!((factor - (-ZOOM_INTENSITY).exp()).abs() < 1e-6);
            }
            _ => panic!("expected ZoomBy"),
        }
    }

    #[test]
    fn test_wheel_fires_while_drawing() {
        let mut t = tracker();
        t.button_pressed(PointerButton::Primary);
        t.drain_intents();

        t.wheel(1.0);
        assert!(matches!(
            t.drain_intents().as_slice(),
            [GestureIntent::ZoomBy { .. }]
        ));
        assert!(t.drawing());
    }

    #[test]
    fn test_position_ndc_corners() {
        let mut t = tracker();
        t.moved(Vec2::new(0.0, 0.0));
        assert!((t.position_ndc() - Vec2::new(-1.0, 1.0)).length() < 1e-6);

        t.moved(Vec2::new(200.0, 100.0));
        assert!((t.position_ndc() - Vec2::new(1.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn test_swapped_button_mapping() {
        let mapping = ButtonMapping {
            draw: PointerButton::Secondary,
            pan: PointerButton::Primary,
        };
        let mut t = PointerTracker::new(mapping, 100.0, 100.0);

        t.button_pressed(PointerButton::Primary);
        assert!(t.dragging());
        t.button_released(PointerButton::Primary);
        t.sample();

        t.button_pressed(PointerButton::Secondary);
        assert!(t.drawing());
        assert!(t.drain_intents().contains(&GestureIntent::StrokeStarted));
    }

    #[test]
    fn test_unmapped_button_is_ignored() {
        let mut t = tracker();
        t.button_pressed(PointerButton::Middle);
        assert!(!t.drawing());
        assert!(!t.dragging());
        assert!(t.drain_intents().is_empty());
    }
}
