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

use crate::context::{BoundingBoxQuery, SceneRenderer};
use crate::error::SceneError;
use crate::node::{typed_node, Node, NodeKind};
use canopy_core::math::{Mat4, Quat, Vec3};

/// Post-multiplies the current model matrix.
///
/// Affects everything after it up to the end of the enclosing
/// [`Separator`](crate::Separator).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Default::default()
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Default::default()
        }
    }

    /// Translation, then rotation, then scale, applied to incoming points in
    /// reverse order.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Node for Transform {
    fn kind(&self) -> NodeKind {
        NodeKind::Transform
    }

    fn render(&mut self, renderer: &mut SceneRenderer<'_>) -> Result<(), SceneError> {
        renderer.state.model_matrix *= self.matrix();
        Ok(())
    }

    fn bounding_box(&self, query: &mut BoundingBoxQuery) {
        query.state.model_matrix *= self.matrix();
    }
}

typed_node!(Transform, Transform);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Separator;
    use crate::nodes::BufferData;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_moves_bounds() {
        let scene = Separator::new()
            .with(Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)))
            .with(BufferData::positions(&[Vec3::ZERO, Vec3::ONE]));
        let bounds = crate::search::bounding_box(&scene);
        assert_relative_eq!(bounds.min.x, 10.0);
        assert_relative_eq!(bounds.max.x, 11.0);
        assert_relative_eq!(bounds.max.y, 1.0);
    }

    #[test]
    fn test_transform_is_scoped_by_separator() {
        let scene = Separator::new()
            .with(Separator::new().with(Transform::from_scale(Vec3::splat(4.0))))
            .with(BufferData::positions(&[Vec3::ONE]));
        let bounds = crate::search::bounding_box(&scene);
        assert_relative_eq!(bounds.max.x, 1.0);
    }
}
