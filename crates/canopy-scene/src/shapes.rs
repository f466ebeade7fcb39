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

//! Ready-made geometry.

use crate::group::Group;
use crate::nodes::{
    BufferData, DeviceBuffer, HostBuffer, IndexBufferDescription, VertexAttribute, VertexBinding,
};
use canopy_core::math::Vec3;
use canopy_core::renderer::api::{BufferUsage, IndexFormat, VertexFormat};

/// Triangles of the unit cube, counter-clockwise seen from outside.
const CUBE_INDICES: [u32; 36] = [
    0, 2, 1, 1, 2, 3, // -z
    4, 5, 6, 5, 7, 6, // +z
    0, 1, 4, 1, 5, 4, // -y
    2, 6, 3, 3, 6, 7, // +y
    0, 4, 2, 2, 4, 6, // -x
    1, 3, 5, 3, 7, 5, // +x
];

/// An indexed unit cube centered on the origin.
///
/// Uploads positions into a device-local vertex buffer bound at `binding`
/// and read at attribute `location`, then sets up a device-local index
/// buffer. Returns a plain [`Group`] so that a following
/// [`DrawCommand`](crate::nodes::DrawCommand) sees both buffers.
pub fn cube(binding: u32, location: u32) -> Group {
    let positions: Vec<Vec3> = (0..8)
        .map(|corner| {
            Vec3::new(
                if corner & 1 == 0 { -0.5 } else { 0.5 },
                if corner & 2 == 0 { -0.5 } else { 0.5 },
                if corner & 4 == 0 { -0.5 } else { 0.5 },
            )
        })
        .collect();

    Group::new()
        .with(BufferData::positions(&positions))
        .with(HostBuffer::new(BufferUsage::VERTEX))
        .with(DeviceBuffer::new(BufferUsage::VERTEX))
        .with(VertexBinding::new(binding, VertexFormat::Float32x3.size()))
        .with(VertexAttribute::new(location, binding, VertexFormat::Float32x3, 0))
        .with(BufferData::new(&CUBE_INDICES))
        .with(HostBuffer::new(BufferUsage::INDEX))
        .with(DeviceBuffer::new(BufferUsage::INDEX))
        .with(IndexBufferDescription::new(IndexFormat::Uint32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::bounding_box;
    use approx::assert_relative_eq;

    #[test]
    fn test_cube_bounds() {
        let bounds = bounding_box(&cube(0, 0));
        assert_relative_eq!(bounds.min.x, -0.5);
        assert_relative_eq!(bounds.max.z, 0.5);
        assert_relative_eq!(bounds.diagonal(), 3.0_f32.sqrt());
    }
}
