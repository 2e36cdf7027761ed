use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{InputEvent, Key, KeyState};

/// Current input state for the window.
#[derive(Debug, Default)]
pub struct InputState {
    /// Whether the window is focused.
    pub focused: bool,

    /// Pointer position in logical pixels, `None` once the pointer leaves the window.
    pub pointer_pos: Option<(f32, f32)>,

    /// Currently held keys.
    pub keys_down: HashSet<Key>,
}

impl InputState {
    /// Applies an event to the current state and records the transition in `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::PointerMoved { x, y } => {
                self.pointer_pos = Some((*x, *y));
                frame.pointer_moved = true;
            }

            InputEvent::PointerLeft => {
                self.pointer_pos = None;
            }

            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Releases are not delivered to unfocused windows.
                    self.keys_down.clear();
                }
            }

            InputEvent::Key { key, state, .. } => match state {
                KeyState::Pressed => {
                    if self.keys_down.insert(*key) {
                        frame.keys_pressed.insert(*key);
                    }
                }
                KeyState::Released => {
                    if self.keys_down.remove(key) {
                        frame.keys_released.insert(*key);
                    }
                }
            },
        }

        frame.events.push(ev);
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, state: KeyState) -> InputEvent {
        InputEvent::Key { key, state, repeat: false }
    }

    #[test]
    fn pointer_move_updates_position_and_flags_frame() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, InputEvent::PointerMoved { x: 12.0, y: 34.0 });

        assert_eq!(state.pointer_pos, Some((12.0, 34.0)));
        assert!(frame.pointer_moved);
        assert_eq!(frame.events.len(), 1);
    }

    #[test]
    fn pointer_left_clears_position() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, InputEvent::PointerMoved { x: 1.0, y: 1.0 });
        state.apply_event(&mut frame, InputEvent::PointerLeft);

        assert_eq!(state.pointer_pos, None);
    }

    #[test]
    fn repeated_press_is_reported_once() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::Escape, KeyState::Pressed));
        frame.clear();
        state.apply_event(&mut frame, key(Key::Escape, KeyState::Pressed));

        assert!(state.key_down(Key::Escape));
        assert!(!frame.key_pressed(Key::Escape));
    }

    #[test]
    fn release_records_transition() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::Space, KeyState::Pressed));
        state.apply_event(&mut frame, key(Key::Space, KeyState::Released));

        assert!(!state.key_down(Key::Space));
        assert!(frame.keys_released.contains(&Key::Space));
    }

    #[test]
    fn focus_loss_drops_held_keys() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::Enter, KeyState::Pressed));
        state.apply_event(&mut frame, InputEvent::Focused(false));

        assert!(state.keys_down.is_empty());
        assert!(!state.focused);
    }

    #[test]
    fn clear_resets_frame_deltas() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, InputEvent::PointerMoved { x: 0.0, y: 0.0 });
        frame.clear();

        assert!(!frame.pointer_moved);
        assert!(frame.events.is_empty());
        assert_eq!(state.pointer_pos, Some((0.0, 0.0)));
    }
}
