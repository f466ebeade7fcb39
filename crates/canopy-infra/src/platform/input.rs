// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Translates `winit` window events into scene [`InputEvent`]s.

use canopy_core::math::{Extent2D, Vec2};
use canopy_scene::{InputEvent, Key, MouseButton};
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::Key as WinitKey;

// Pixels per wheel "line" for touchpads reporting pixel deltas.
const PIXELS_PER_LINE: f32 = 40.0;

/// Stateful translator: `winit` reports button presses without a position, so
/// the last cursor position is remembered and attached to them.
#[derive(Debug, Default, Clone)]
pub struct WinitInputTranslator {
    cursor: Vec2,
}

impl WinitInputTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known cursor position in window pixels.
    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    /// Returns `None` for events the scene does not react to.
    pub fn translate(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                Some(InputEvent::MouseMoved {
                    position: self.cursor,
                })
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = map_mouse_button(*button)?;
                let position = self.cursor;
                Some(match state {
                    ElementState::Pressed => InputEvent::MousePressed { button, position },
                    ElementState::Released => InputEvent::MouseReleased { button, position },
                })
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
                };
                (delta != 0.0).then_some(InputEvent::MouseWheel { delta })
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let key = map_key(&event.logical_key)?;
                match event.state {
                    ElementState::Pressed if !event.repeat => Some(InputEvent::KeyPressed(key)),
                    ElementState::Released => Some(InputEvent::KeyReleased(key)),
                    _ => None,
                }
            }
            WindowEvent::Resized(size) => {
                Some(InputEvent::Resized(Extent2D::new(size.width, size.height)))
            }
            _ => None,
        }
    }
}

fn map_mouse_button(button: WinitMouseButton) -> Option<MouseButton> {
    match button {
        WinitMouseButton::Left => Some(MouseButton::Left),
        WinitMouseButton::Middle => Some(MouseButton::Middle),
        WinitMouseButton::Right => Some(MouseButton::Right),
        _ => None,
    }
}

fn map_key(key: &WinitKey) -> Option<Key> {
    match key {
        WinitKey::Character(text) => Some(Key::Character(text.to_string())),
        WinitKey::Named(named) => Some(Key::Named(format!("{named:?}"))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::NamedKey;

    #[test]
    fn test_named_keys_use_their_variant_name() {
        assert_eq!(
            map_key(&WinitKey::Named(NamedKey::Escape)),
            Some(Key::Named("Escape".to_string()))
        );
        assert_eq!(
            map_key(&WinitKey::Character("a".into())),
            Some(Key::Character("a".to_string()))
        );
    }

    #[test]
    fn test_side_buttons_are_ignored() {
        assert_eq!(map_mouse_button(WinitMouseButton::Back), None);
        assert_eq!(map_mouse_button(WinitMouseButton::Right), Some(MouseButton::Right));
    }
}
