//! Per-tick input as delivered by the host.

use glam::Vec2;

bitflags::bitflags! {
    #[repr(transparent)]
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Buttons: u8 {
        const LEFT  = 1 << 0;
        const RIGHT = 1 << 1;
        const DOWN  = 1 << 2;
        const UP    = 1 << 3;
        const JUMP  = 1 << 4;
    }
}

impl Buttons {
    /// Raw (unsmoothed) directional axes, each in {-1, 0, 1}.
    pub fn direction(self) -> Vec2 {
        let x = self.contains(Buttons::RIGHT) as i32 - self.contains(Buttons::LEFT) as i32;
        let y = self.contains(Buttons::UP) as i32 - self.contains(Buttons::DOWN) as i32;
        Vec2::new(x as f32, y as f32)
    }
}

/// One tick of player input, with jump edges relative to the previous tick.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct InputFrame {
    pub direction: Vec2,
    pub jump_held: bool,
    pub jump_pressed: bool,
    pub jump_released: bool,
}

impl InputFrame {
    pub fn new(current: Buttons, previous: Buttons) -> Self {
        let now = current.contains(Buttons::JUMP);
        let before = previous.contains(Buttons::JUMP);
        Self {
            direction: current.direction(),
            jump_held: now,
            jump_pressed: now && !before,
            jump_released: !now && before,
        }
    }
}
