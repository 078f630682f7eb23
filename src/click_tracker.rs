use glam::Vec2;

/// Tells clicks apart from drags of the same button.
pub struct ClickTracker {
    /// Pointer travel in pixels from which a press-release counts as a drag.
    tolerance: f32,
    pressed_at: Option<Vec2>,
}

impl ClickTracker {
    pub fn new(tolerance: f32) -> Self {
        Self {
            tolerance,
            pressed_at: None,
        }
    }

    pub fn press(&mut self, cursor: Vec2) {
        self.pressed_at = Some(cursor);
    }

    /// Returns the click position if the pointer stayed within tolerance
    /// since the matching press.
    pub fn release(&mut self, cursor: Vec2) -> Option<Vec2> {
        let pressed_at = self.pressed_at.take()?;

        (pressed_at.distance(cursor) < self.tolerance).then_some(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_movement_is_a_click() {
        let mut tracker = ClickTracker::new(5.0);

        tracker.press(Vec2::new(100.0, 100.0));
        assert_eq!(
            tracker.release(Vec2::new(104.9, 100.0)),
            Some(Vec2::new(104.9, 100.0))
        );
    }

    #[test]
    fn movement_at_tolerance_is_a_drag() {
        let mut tracker = ClickTracker::new(5.0);

        tracker.press(Vec2::new(100.0, 100.0));
        assert_eq!(tracker.release(Vec2::new(103.0, 104.0)), None);
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut tracker = ClickTracker::new(5.0);

        assert_eq!(tracker.release(Vec2::ZERO), None);
    }

    #[test]
    fn each_press_yields_at_most_one_click() {
        let mut tracker = ClickTracker::new(5.0);

        tracker.press(Vec2::ZERO);
        assert!(tracker.release(Vec2::ZERO).is_some());
        assert_eq!(tracker.release(Vec2::ZERO), None);
    }
}
