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

//! Global settings for the rendering system.

use crate::math::Extent2D;
use serde::{Deserialize, Serialize};

/// How the allocator turns the memory requests of one traversal into device memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// One memory block per memory type, shared by every resource of the pass.
    #[default]
    Pooled,
    /// One memory block per resource.
    Dedicated,
}

/// A collection of global settings that affect how a scene is built and drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Color the color attachment is cleared to at the start of each frame.
    pub clear_color: [f32; 4],
    /// Value the depth attachment is cleared to at the start of each frame.
    pub clear_depth: f32,
    /// Upper bound for every fence wait, in milliseconds.
    pub fence_timeout_ms: u64,
    /// Memory allocation strategy used at the end of an Allocate pass.
    pub allocation: AllocationStrategy,
    /// If `true`, one pipeline cache object is shared by every pipeline build.
    pub use_pipeline_cache: bool,
    /// Extent used until the window reports its first size.
    pub initial_extent: Extent2D,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 0.0],
            clear_depth: 1.0,
            fence_timeout_ms: 5_000,
            allocation: AllocationStrategy::Pooled,
            use_pipeline_cache: true,
            initial_extent: Extent2D::new(512, 512),
        }
    }
}

impl RenderSettings {
    /// Parses settings from JSON. Missing fields take their default value.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The fence timeout in nanoseconds, as device wait calls expect it.
    pub fn fence_timeout_ns(&self) -> u64 {
        self.fence_timeout_ms.saturating_mul(1_000_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings =
            RenderSettings::from_json(r#"{ "allocation": "dedicated", "clear_depth": 0.0 }"#)
                .unwrap();
        assert_eq!(settings.allocation, AllocationStrategy::Dedicated);
        assert_eq!(settings.clear_depth, 0.0);
        assert_eq!(settings.fence_timeout_ms, 5_000);
        assert!(settings.use_pipeline_cache);
    }

    #[test]
    fn test_fence_timeout_ns() {
        let settings = RenderSettings {
            fence_timeout_ms: 2,
            ..Default::default()
        };
        assert_eq!(settings.fence_timeout_ns(), 2_000_000);
    }
}
