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

//! # Canopy Agents
//!
//! The orchestration layer. A [`RenderManager`] owns the scene root, the
//! resource table and the per-frame synchronization objects, and drives the
//! traversal phases of `canopy-scene` in dependency order:
//!
//! - `init` runs Allocate, Stage, BuildPipeline and Record.
//! - `resize` recreates the surface, runs Resize, Stage, BuildPipeline and
//!   Record, then draws one frame.
//! - `redraw` runs Render, submits the frame and runs Present, recovering
//!   from a stale surface with a single resize.

pub mod render_agent;

pub use render_agent::{FrameOutcome, FrameStats, ManagerError, ManagerState, RenderManager};
