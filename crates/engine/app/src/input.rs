//! Per-frame input state accumulated by the runner

use glam::Vec2;
use std::collections::HashSet;
use winit::keyboard::KeyCode;

/// Mouse button state flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseButtons {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

/// Keyboard and mouse state for one frame
///
/// Deltas are accumulated between frames and reset after each redraw.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Currently held keys
    pub keys: HashSet<KeyCode>,
    /// Keys that went down since the previous frame
    pub pressed: HashSet<KeyCode>,
    /// Mouse position in window coordinates
    pub mouse_pos: Option<Vec2>,
    /// Cursor movement since last frame
    pub mouse_delta: Vec2,
    /// Scroll since last frame, in lines
    pub scroll_delta: Vec2,
    pub mouse_buttons: MouseButtons,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    /// True only on the frame the key went down
    #[inline]
    pub fn was_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    pub fn any_key_pressed(&self, keys: &[KeyCode]) -> bool {
        keys.iter().any(|k| self.pressed.contains(k))
    }

    pub(crate) fn key_down(&mut self, key: KeyCode) {
        // Auto-repeat delivers repeated presses while held
        if self.keys.insert(key) {
            self.pressed.insert(key);
        }
    }

    pub(crate) fn key_up(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    /// Clear per-frame deltas and edge-triggered keys
    pub(crate) fn end_frame(&mut self) {
        self.pressed.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
    }
}
