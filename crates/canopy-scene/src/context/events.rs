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

//! Input events and the context that dispatches them.

use crate::context::PhaseContext;
use canopy_core::math::{Extent2D, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// A keyboard key, by the character it produces or its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Character(String),
    Named(String),
}

/// A window-system event, independent of the windowing library.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    MousePressed { button: MouseButton, position: Vec2 },
    MouseReleased { button: MouseButton, position: Vec2 },
    /// Cursor position in window pixels.
    MouseMoved { position: Vec2 },
    /// Scroll amount in lines; positive is away from the user.
    MouseWheel { delta: f32 },
    KeyPressed(Key),
    KeyReleased(Key),
    Resized(Extent2D),
}

/// Carries one event through the tree.
#[derive(Debug)]
pub struct EventHandler<'a> {
    event: &'a InputEvent,
    redraw_requested: bool,
    state: (),
}

impl PhaseContext for EventHandler<'_> {
    type State = ();

    fn state_mut(&mut self) -> &mut Self::State {
        &mut self.state
    }
}

impl<'a> EventHandler<'a> {
    pub fn new(event: &'a InputEvent) -> Self {
        Self {
            event,
            redraw_requested: false,
            state: (),
        }
    }

    pub fn event(&self) -> &InputEvent {
        self.event
    }

    /// Asks the caller to redraw once the event has been dispatched.
    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    pub fn redraw_requested(&self) -> bool {
        self.redraw_requested
    }
}
