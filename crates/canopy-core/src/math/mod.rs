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

//! Math types used by the scene engine.
//!
//! Linear algebra comes from `glam` and is re-exported here so that downstream
//! crates share one version of it. This module adds the integer extents used to
//! size images and surfaces, and the axis-aligned bounding box used by
//! view-all queries.

pub mod bounds;
pub mod dimension;

pub use self::bounds::Aabb;
pub use self::dimension::{Extent2D, Extent3D};
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

/// A small constant for floating-point comparisons.
pub const EPSILON: f32 = 1e-5;
