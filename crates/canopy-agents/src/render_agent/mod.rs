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

//! Acts as the **[A]gent** for rendering: the [`RenderManager`] decides when
//! each traversal phase runs, and the scene nodes decide what it does.
//!
//! The manager is single-threaded. Every build phase blocks on a fence until
//! the device has finished the work it submitted, and each frame reuses one
//! primary command buffer guarded by the frame fence.

mod error;
mod frame_sync;
mod manager;
mod stats;

pub use error::ManagerError;
pub use manager::{ManagerState, RenderManager};
pub use stats::{FrameOutcome, FrameStats};
