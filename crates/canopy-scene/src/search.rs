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

//! Queries over a scene tree.

use crate::context::BoundingBoxQuery;
use crate::node::{Node, TypedNode};
use canopy_core::math::Aabb;

/// Depth-first search for the first node of type `T`.
pub fn find_first_of_type<T: TypedNode>(node: &dyn Node) -> Option<&T> {
    if node.kind() == T::KIND {
        return node.as_any().downcast_ref::<T>();
    }
    node.children()
        .iter()
        .find_map(|child| find_first_of_type::<T>(child.as_ref()))
}

/// Mutable variant of [`find_first_of_type`].
pub fn find_first_of_type_mut<T: TypedNode>(node: &mut dyn Node) -> Option<&mut T> {
    if node.kind() == T::KIND {
        return node.as_any_mut().downcast_mut::<T>();
    }
    for child in node.children_mut()?.iter_mut() {
        if let Some(found) = find_first_of_type_mut::<T>(child.as_mut()) {
            return Some(found);
        }
    }
    None
}

/// World-space bounds of everything under `node`; [`Aabb::INVALID`] if empty.
pub fn bounding_box(node: &dyn Node) -> Aabb {
    let mut query = BoundingBoxQuery::new();
    node.bounding_box(&mut query);
    query.bounds()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{Group, Separator};
    use crate::nodes::{Camera, DrawCommand, Transform};
    use canopy_core::math::Vec3;

    #[test]
    fn test_find_first_of_type_descends_into_groups() {
        let mut scene = Separator::new()
            .with(Transform::default())
            .with(Group::new().with(Camera::new()).with(Camera::new()));

        let camera = find_first_of_type_mut::<Camera>(&mut scene).unwrap();
        camera.position = Vec3::new(1.0, 2.0, 3.0);

        let first = find_first_of_type::<Camera>(&scene).unwrap();
        assert_eq!(first.position, Vec3::new(1.0, 2.0, 3.0));
        assert!(find_first_of_type::<DrawCommand>(&scene).is_none());
    }

    #[test]
    fn test_empty_scene_has_invalid_bounds() {
        assert!(!bounding_box(&Group::new()).is_valid());
    }
}
