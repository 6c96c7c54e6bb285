use glam::Vec2;

/// Per-body collision record, rebuilt by every `move_by` call.
///
/// [`ContactState::reset`] clears the per-move flags and slope data but
/// keeps `face_direction`, `falling_through_platform` and `move_amount_old`.
/// `slope_angle_old` keeps the previous tick's angle so the slope code can
/// tell when the body moved onto a slope of a different grade.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactState {
    pub above: bool,
    pub below: bool,
    pub left: bool,
    pub right: bool,

    pub climbing_slope: bool,
    pub descending_slope: bool,
    pub sliding_down_slope: bool,
    /// Degrees from world up.
    pub slope_angle: f32,
    pub slope_angle_old: f32,
    pub slope_normal: Vec2,

    /// +1 facing right, -1 facing left.
    pub face_direction: i8,
    /// Set when dropping through a one-way surface, cleared by a scheduled event.
    pub falling_through_platform: bool,
    pub can_wall_slide: bool,
    /// Displacement requested for this move, before any slope adjustment.
    pub move_amount_old: Vec2,
}

impl Default for ContactState {
    fn default() -> Self {
        Self {
            above: false,
            below: false,
            left: false,
            right: false,
            climbing_slope: false,
            descending_slope: false,
            sliding_down_slope: false,
            slope_angle: 0.0,
            slope_angle_old: 0.0,
            slope_normal: Vec2::ZERO,
            face_direction: 1,
            falling_through_platform: false,
            can_wall_slide: false,
            move_amount_old: Vec2::ZERO,
        }
    }
}

impl ContactState {
    pub fn reset(&mut self) {
        self.above = false;
        self.below = false;
        self.left = false;
        self.right = false;
        self.climbing_slope = false;
        self.descending_slope = false;
        self.sliding_down_slope = false;
        self.can_wall_slide = false;
        self.slope_angle_old = self.slope_angle;
        self.slope_angle = 0.0;
        self.slope_normal = Vec2::ZERO;
    }

    #[inline]
    pub fn touching_wall(&self) -> bool {
        self.left || self.right
    }

    /// -1 for a wall on the left, +1 otherwise.
    #[inline]
    pub fn wall_direction(&self) -> i8 {
        if self.left { -1 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_carries_slope_angle_forward() {
        let mut c = ContactState {
            below: true,
            left: true,
            climbing_slope: true,
            slope_angle: 30.0,
            slope_normal: Vec2::new(-0.5, 0.866),
            face_direction: -1,
            falling_through_platform: true,
            can_wall_slide: true,
            ..ContactState::default()
        };
        c.reset();

        assert!(!c.below && !c.left && !c.climbing_slope && !c.can_wall_slide);
        assert_eq!(c.slope_angle, 0.0);
        assert_eq!(c.slope_angle_old, 30.0);
        assert_eq!(c.slope_normal, Vec2::ZERO);
        assert_eq!(c.face_direction, -1);
        assert!(c.falling_through_platform);
    }
}
