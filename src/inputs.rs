//! Translates raw keyboard/mouse events into [`Action`]s: a small
//! press/held/released state machine per key, plus mouse-motion deltas
//! passed straight through as [`Action::Look`].

use std::collections::HashMap;

use log::{debug, trace};
use winit::keyboard::KeyCode;

use crate::action::Action;

/// A key's state since the last [`InputHandler::collect_actions`] call.
pub enum InputState {
    /// The key was pressed this frame (fires both pressed and held actions).
    Pressed,
    /// The key has been held since a prior frame (fires held actions).
    Held,
    /// The key was released this frame (fires released actions).
    Released,
    /// The key was pressed and released within the same frame, before
    /// being consumed (fires pressed, held, and released actions).
    PressedReleased,
}

/// Tracks every currently-relevant key's state and the action bound to it
/// in each of the three input states.
pub struct InputHandler {
    key_states: HashMap<KeyCode, InputState>,
    pressed_action: HashMap<KeyCode, Action>,
    held_action: HashMap<KeyCode, Action>,
    released_action: HashMap<KeyCode, Action>,
}

impl Default for InputHandler {
    fn default() -> Self {
        InputHandler::new()
    }
}

impl InputHandler {
    /// Builds an input handler with the default key bindings.
    pub fn new() -> InputHandler {
        let mut input_handler = InputHandler {
            key_states: HashMap::new(),
            pressed_action: HashMap::new(),
            held_action: HashMap::new(),
            released_action: HashMap::new(),
        };
        input_handler.setup_default_bindings();
        input_handler
    }

    /// Binds `key_code`'s `input_state` transition to `action`.
    fn bind(&mut self, input_state: InputState, key_code: KeyCode, action: Action) {
        match input_state {
            InputState::Pressed => {
                self.pressed_action.insert(key_code, action);
            }
            InputState::Held => {
                self.held_action.insert(key_code, action);
            }
            InputState::Released => {
                self.released_action.insert(key_code, action);
            }
            InputState::PressedReleased => {}
        }
    }

    /// Collects every action that should fire this frame from the current
    /// key states, advancing `Pressed` keys to `Held` and dropping
    /// `Released`/`PressedReleased` keys afterward.
    pub fn collect_actions(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        let mut keys_to_delete = Vec::new();

        for (k, v) in self.key_states.iter_mut() {
            match v {
                InputState::Held => {
                    if let Some(action) = self.held_action.get(k) {
                        actions.push(*action);
                    }
                }
                InputState::Released => {
                    if let Some(action) = self.released_action.get(k) {
                        actions.push(*action);
                    }
                    keys_to_delete.push(*k);
                }
                InputState::Pressed => {
                    if let Some(action) = self.pressed_action.get(k) {
                        actions.push(*action);
                    } else if let Some(action) = self.held_action.get(k) {
                        actions.push(*action);
                    }
                    *v = InputState::Held;
                }
                InputState::PressedReleased => {
                    if let Some(action) = self.pressed_action.get(k) {
                        actions.push(*action);
                    } else if let Some(action) = self.held_action.get(k) {
                        actions.push(*action);
                    }
                    if let Some(action) = self.released_action.get(k) {
                        actions.push(*action);
                    }
                    keys_to_delete.push(*k);
                }
            }
        }

        for key in &keys_to_delete {
            self.key_states.remove(key);
        }
        actions
    }

    /// Builds a [`Action::Look`] from a raw mouse-motion delta, scaled by
    /// `sensitivity` (radians per pixel of motion).
    pub fn look_action(&self, dx: f64, dy: f64, sensitivity: f32) -> Action {
        Action::Look { yaw_delta: dx as f32 * sensitivity, pitch_delta: -dy as f32 * sensitivity }
    }

    /// Registers a key-down event.
    pub fn press_key(&mut self, key_code: KeyCode) {
        if !self.key_states.contains_key(&key_code) {
            self.key_states.insert(key_code, InputState::Pressed);
            trace!("key {key_code:?} pressed");
        }
    }

    /// Registers a key-up event.
    pub fn release_key(&mut self, key_code: KeyCode) {
        let Some(state) = self.key_states.get_mut(&key_code) else {
            debug!("key {key_code:?} released without being pressed");
            return;
        };
        match state {
            InputState::Pressed => *state = InputState::PressedReleased,
            InputState::Held => *state = InputState::Released,
            InputState::Released | InputState::PressedReleased => {}
        }
        trace!("key {key_code:?} released");
    }

    fn setup_default_bindings(&mut self) {
        self.bind(InputState::Held, KeyCode::ArrowLeft, Action::YawLeft);
        self.bind(InputState::Held, KeyCode::ArrowRight, Action::YawRight);
        self.bind(InputState::Held, KeyCode::ArrowUp, Action::PitchUp);
        self.bind(InputState::Held, KeyCode::ArrowDown, Action::PitchDown);

        self.bind(InputState::Held, KeyCode::KeyA, Action::OrbitLightLeft);
        self.bind(InputState::Held, KeyCode::KeyD, Action::OrbitLightRight);
        self.bind(InputState::Held, KeyCode::KeyW, Action::OrbitLightUp);
        self.bind(InputState::Held, KeyCode::KeyS, Action::OrbitLightDown);

        self.bind(InputState::Pressed, KeyCode::Equal, Action::FovIncrease);
        self.bind(InputState::Pressed, KeyCode::Minus, Action::FovDecrease);

        self.bind(InputState::Pressed, KeyCode::KeyF, Action::ToggleWireframe);
        self.bind(InputState::Pressed, KeyCode::KeyT, Action::ToggleTileBorders);
        self.bind(InputState::Pressed, KeyCode::KeyL, Action::ToggleLightMarker);
        self.bind(InputState::Pressed, KeyCode::Escape, Action::Quit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_key_fires_held_action_and_becomes_held() {
        let mut handler = InputHandler::new();
        handler.press_key(KeyCode::ArrowLeft);
        let actions = handler.collect_actions();
        assert_eq!(actions, vec![Action::YawLeft]);

        // Second poll: still held, fires again, key not dropped.
        let actions = handler.collect_actions();
        assert_eq!(actions, vec![Action::YawLeft]);
    }

    #[test]
    fn released_key_fires_once_then_is_forgotten() {
        let mut handler = InputHandler::new();
        handler.press_key(KeyCode::Escape);
        handler.collect_actions(); // consume the press -> held transition
        handler.release_key(KeyCode::Escape);
        let actions = handler.collect_actions();
        assert!(actions.is_empty()); // no released-binding for Escape
        assert!(handler.collect_actions().is_empty());
    }

    #[test]
    fn press_and_release_within_one_frame_fires_pressed_action() {
        let mut handler = InputHandler::new();
        handler.press_key(KeyCode::KeyF);
        handler.release_key(KeyCode::KeyF);
        let actions = handler.collect_actions();
        assert_eq!(actions, vec![Action::ToggleWireframe]);
        assert!(handler.collect_actions().is_empty());
    }

    #[test]
    fn look_action_scales_motion_by_sensitivity() {
        let handler = InputHandler::new();
        let action = handler.look_action(10.0, -4.0, 0.01);
        assert_eq!(action, Action::Look { yaw_delta: 0.1, pitch_delta: 0.04 });
    }
}
