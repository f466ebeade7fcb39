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

//! An orbiting perspective camera.

use crate::context::{Allocator, EventHandler, InputEvent, MouseButton, SceneRenderer};
use crate::error::SceneError;
use crate::node::{typed_node, Node, NodeKind};
use canopy_core::math::{Aabb, Mat3, Mat4, Vec2, Vec3, EPSILON};

/// Scale from cursor pixels to camera motion.
const DRAG_SCALE: f32 = 0.01;

/// A perspective camera looking at a focal point.
///
/// The orientation columns are the camera's right, up and backward axes; the
/// focal point sits `focal_distance` in front of the camera. During Render it
/// publishes its view and projection matrices. Mouse drags orbit (left
/// button), pan (middle) and zoom (right).
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub orientation: Mat3,
    pub focal_distance: f32,
    /// Vertical field of view in radians.
    pub field_of_view: f32,
    pub aspect_ratio: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    // Button held and last cursor position of the current drag.
    drag: Option<(MouseButton, Vec2)>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 1.0),
            orientation: Mat3::IDENTITY,
            focal_distance: 1.0,
            field_of_view: 0.7,
            aspect_ratio: 4.0 / 3.0,
            near_plane: 0.1,
            far_plane: 1000.0,
            drag: None,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focal_point(&self) -> Vec3 {
        self.position - self.orientation.z_axis * self.focal_distance
    }

    /// Moves along the viewing axis; positive `dy` moves away from the focal point.
    pub fn zoom(&mut self, dy: f32) {
        let focal_point = self.focal_point();
        self.position += self.orientation.z_axis * dy;
        self.focal_distance = (self.position - focal_point).length();
    }

    /// Moves in the image plane.
    pub fn pan(&mut self, delta: Vec2) {
        self.position += self.orientation.x_axis * delta.x + self.orientation.y_axis * -delta.y;
    }

    /// Rotates around the focal point.
    pub fn orbit(&mut self, delta: Vec2) {
        let focal_point = self.focal_point();
        let rotation = Mat4::from_mat3(self.orientation)
            * Mat4::from_rotation_x(delta.y)
            * Mat4::from_rotation_y(delta.x);
        let look = Mat3::from_mat4(rotation) * Vec3::new(0.0, 0.0, self.focal_distance);
        self.position = focal_point + look;
        self.look_at(focal_point);
    }

    /// Turns the camera towards `focal_point`, keeping its up axis as close as
    /// possible. Does nothing if the camera is at `focal_point`.
    pub fn look_at(&mut self, focal_point: Vec3) {
        let offset = self.position - focal_point;
        if offset.length() < EPSILON {
            return;
        }
        let z = offset.normalize();
        let x = self.orientation.y_axis.cross(z).normalize_or_zero();
        if x == Vec3::ZERO {
            return;
        }
        let y = z.cross(x).normalize();
        self.orientation = Mat3::from_cols(x, y, z);
        self.focal_distance = offset.length();
    }

    /// Places the camera so that `bounds` fills the view. Invalid bounds are ignored.
    pub fn view_all(&mut self, bounds: &Aabb) {
        if !bounds.is_valid() {
            return;
        }
        let focal_point = bounds.center();
        self.focal_distance = bounds.diagonal().max(EPSILON);
        self.position = focal_point + self.orientation.z_axis * self.focal_distance;
        self.look_at(focal_point);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_mat3(self.orientation.transpose()) * Mat4::from_translation(-self.position)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.field_of_view,
            self.aspect_ratio,
            self.near_plane,
            self.far_plane,
        )
    }

    fn update_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect_ratio = width as f32 / height as f32;
        }
    }
}

impl Node for Camera {
    fn kind(&self) -> NodeKind {
        NodeKind::Camera
    }

    fn alloc(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        let extent = allocator.extent();
        self.update_aspect(extent.width, extent.height);
        Ok(())
    }

    fn resize(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        let extent = allocator.extent();
        self.update_aspect(extent.width, extent.height);
        Ok(())
    }

    fn render(&mut self, renderer: &mut SceneRenderer<'_>) -> Result<(), SceneError> {
        renderer.state.view_matrix = self.view_matrix();
        renderer.state.projection_matrix = self.projection_matrix();
        Ok(())
    }

    fn handle_event(&mut self, handler: &mut EventHandler<'_>) -> Result<(), SceneError> {
        let event = handler.event().clone();
        match event {
            InputEvent::MousePressed { button, position } => {
                self.drag = Some((button, position));
            }
            InputEvent::MouseReleased { button, .. } => {
                if self.drag.is_some_and(|(held, _)| held == button) {
                    self.drag = None;
                }
            }
            InputEvent::MouseMoved { position } => {
                if let Some((button, last)) = self.drag {
                    let delta = (position - last) * DRAG_SCALE;
                    match button {
                        MouseButton::Left => self.orbit(delta),
                        MouseButton::Middle => self.pan(delta),
                        MouseButton::Right => self.zoom(delta.y),
                    }
                    self.drag = Some((button, position));
                    handler.request_redraw();
                }
            }
            InputEvent::MouseWheel { delta } => {
                self.zoom(-delta * self.focal_distance * 0.1);
                handler.request_redraw();
            }
            _ => {}
        }
        Ok(())
    }
}

typed_node!(Camera, Camera);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zoom_moves_along_view_axis() {
        let mut camera = Camera::new();
        camera.zoom(2.0);
        assert_relative_eq!(camera.position.z, 3.0);
        assert_relative_eq!(camera.focal_distance, 3.0);
        assert_relative_eq!(camera.focal_point().z, 0.0);
    }

    #[test]
    fn test_pan_keeps_orientation() {
        let mut camera = Camera::new();
        camera.pan(Vec2::new(1.0, 1.0));
        assert_relative_eq!(camera.position.x, 1.0);
        assert_relative_eq!(camera.position.y, -1.0);
        assert_eq!(camera.orientation, Mat3::IDENTITY);
    }

    #[test]
    fn test_orbit_preserves_focal_distance() {
        let mut camera = Camera::new();
        let focal_point = camera.focal_point();
        camera.orbit(Vec2::new(0.5, 0.25));
        assert_relative_eq!(camera.focal_distance, 1.0, epsilon = 1e-5);
        let new_focal = camera.focal_point();
        assert_relative_eq!(new_focal.x, focal_point.x, epsilon = 1e-5);
        assert_relative_eq!(new_focal.y, focal_point.y, epsilon = 1e-5);
        assert_relative_eq!(new_focal.z, focal_point.z, epsilon = 1e-5);
    }

    #[test]
    fn test_view_all_centers_bounds() {
        let mut camera = Camera::new();
        let bounds = Aabb::from_min_max(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(3.0, 1.0, 1.0));
        camera.view_all(&bounds);
        let focal_point = camera.focal_point();
        assert_relative_eq!(focal_point.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(focal_point.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(camera.focal_distance, bounds.diagonal(), epsilon = 1e-5);
    }

    #[test]
    fn test_view_matrix_maps_focal_point_onto_axis() {
        let camera = Camera::new();
        let eye_space = camera.view_matrix().transform_point3(camera.focal_point());
        assert_relative_eq!(eye_space.x, 0.0);
        assert_relative_eq!(eye_space.y, 0.0);
        assert_relative_eq!(eye_space.z, -1.0);
    }

    #[test]
    fn test_drag_with_left_button_orbits() {
        let mut camera = Camera::new();
        let press = InputEvent::MousePressed {
            button: MouseButton::Left,
            position: Vec2::ZERO,
        };
        let drag = InputEvent::MouseMoved {
            position: Vec2::new(50.0, 0.0),
        };
        camera.handle_event(&mut EventHandler::new(&press)).unwrap();
        let mut handler = EventHandler::new(&drag);
        camera.handle_event(&mut handler).unwrap();

        assert!(handler.redraw_requested());
        assert!(camera.position.x.abs() > 0.1);
        assert_relative_eq!(camera.focal_distance, 1.0, epsilon = 1e-5);
    }
}
