//! Pointer-driven logo dragging.
//!
//! Idle -> Dragging on a pointer-down inside the logo's hit box,
//! Dragging -> Idle on pointer-up or when the pointer leaves the surface.
//! Single pointer only.

use crate::placement::{ContainerSize, PlacementModel};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        /// Pointer minus logo center at grab time, in pixels.
        offset_x: f64,
        offset_y: f64,
    },
}

#[derive(Debug, Clone)]
pub struct DragController {
    state: DragState,
    base_display_size: f64,
}

impl DragController {
    pub fn new(base_display_size: f64) -> Self {
        Self {
            state: DragState::Idle,
            base_display_size,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Square hit box of side `base * scale` centered on the logo, edges inclusive.
    pub fn hit_test(&self, model: &PlacementModel, container: ContainerSize, px: f64, py: f64) -> bool {
        let (lx, ly) = model.logo_center(container);
        let half = model.display_side(self.base_display_size) / 2.0;
        (px - lx).abs() <= half && (py - ly).abs() <= half
    }

    /// Starts a drag when a logo is active and the pointer hits it. Misses are no-ops.
    pub fn pointer_down(
        &mut self,
        model: &PlacementModel,
        logo_active: bool,
        container: ContainerSize,
        px: f64,
        py: f64,
    ) -> bool {
        if !logo_active || !self.hit_test(model, container, px, py) {
            return false;
        }
        let (lx, ly) = model.logo_center(container);
        self.state = DragState::Dragging {
            offset_x: px - lx,
            offset_y: py - ly,
        };
        true
    }

    /// Moves the logo while dragging. Returns whether the model was updated.
    pub fn pointer_move(&mut self, model: &mut PlacementModel, container: ContainerSize, px: f64, py: f64) -> bool {
        let DragState::Dragging { offset_x, offset_y } = self.state else {
            return false;
        };
        match model.position_from_pixel(container, px - offset_x, py - offset_y) {
            Some((x, y)) => {
                model.set_position(x, y);
                true
            }
            None => false,
        }
    }

    pub fn pointer_up(&mut self) {
        self.state = DragState::Idle;
    }

    pub fn pointer_leave(&mut self) {
        self.state = DragState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PrintArea;
    use crate::placement::ScaleBounds;

    const CONTAINER: ContainerSize = ContainerSize {
        width: 500.0,
        height: 500.0,
    };

    fn model() -> PlacementModel {
        PlacementModel::new(
            PrintArea {
                name: "center_chest".into(),
                label: "Midt bryst".into(),
                x: 30.0,
                y: 20.0,
                width: 40.0,
                height: 40.0,
                max_width_cm: 25.0,
                max_height_cm: 20.0,
            },
            ScaleBounds::default(),
        )
    }

    #[test]
    fn test_grab_at_center_starts_drag() {
        let mut drag = DragController::new(80.0);
        assert!(drag.pointer_down(&model(), true, CONTAINER, 250.0, 200.0));
        assert_eq!(
            drag.state(),
            DragState::Dragging {
                offset_x: 0.0,
                offset_y: 0.0
            }
        );
    }

    #[test]
    fn test_no_drag_without_logo_or_outside_box() {
        let mut drag = DragController::new(80.0);
        assert!(!drag.pointer_down(&model(), false, CONTAINER, 250.0, 200.0));
        assert!(!drag.pointer_down(&model(), true, CONTAINER, 250.0 + 40.5, 200.0));
        assert!(!drag.is_dragging());
        assert!(drag.pointer_down(&model(), true, CONTAINER, 290.0, 210.0));
    }

    #[test]
    fn test_hit_box_follows_scale() {
        let mut m = model();
        m.set_scale(1.0);
        let drag = DragController::new(80.0);
        assert!(drag.hit_test(&m, CONTAINER, 250.0 + 79.0, 200.0));
        assert!(!drag.hit_test(&m, CONTAINER, 250.0 + 81.0, 200.0));
    }

    #[test]
    fn test_move_preserves_grab_offset() {
        let mut m = model();
        let mut drag = DragController::new(80.0);
        assert!(drag.pointer_down(&m, true, CONTAINER, 260.0, 190.0));

        // 200px area: +20px pointer motion is +10%.
        assert!(drag.pointer_move(&mut m, CONTAINER, 280.0, 210.0));
        assert!((m.transform().pos_x - 60.0).abs() < 1e-9);
        assert!((m.transform().pos_y - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_move_clamps_and_release_stops() {
        let mut m = model();
        let mut drag = DragController::new(80.0);
        drag.pointer_down(&m, true, CONTAINER, 250.0, 200.0);
        drag.pointer_move(&mut m, CONTAINER, 10_000.0, -10_000.0);
        assert_eq!((m.transform().pos_x, m.transform().pos_y), (100.0, 0.0));

        drag.pointer_leave();
        assert!(!drag.pointer_move(&mut m, CONTAINER, 250.0, 200.0));
        assert_eq!((m.transform().pos_x, m.transform().pos_y), (100.0, 0.0));
    }
}
