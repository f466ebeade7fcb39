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

//! # Canopy Scene
//!
//! The traversal engine. A scene is a tree of [`Node`]s; every build or frame
//! step is one depth-first walk of that tree with a phase-specific context:
//!
//! | Phase | Context | Runs |
//! |---|---|---|
//! | Allocate | [`Allocator`] | once, and again on rebuild |
//! | Resize | [`Allocator`] | after the surface changes size |
//! | Stage | [`Stager`] | after every Allocate or Resize |
//! | BuildPipeline | [`PipelineCreator`] | after every Stage |
//! | Record | [`CommandRecorder`] | after every BuildPipeline |
//! | Render | [`SceneRenderer`] | every frame |
//! | Present | [`Presenter`] | every frame |
//!
//! Each context carries a mutable state record that producer nodes write and
//! later consumer nodes read. A [`Separator`] saves the record before visiting
//! its children and restores it afterwards.
//!
//! Nodes own only handle IDs. Every device object created through a context
//! is registered in the [`ResourceTable`], which the orchestrator owns and
//! which releases everything at teardown.

pub mod context;
pub mod error;
pub mod group;
pub mod node;
pub mod nodes;
pub mod resources;
pub mod search;
pub mod shapes;
pub mod state;

pub use context::{
    AllocationReport, Allocator, BoundingBoxQuery, CommandRecorder, EventHandler, InputEvent,
    Key, MouseButton, PhaseContext, PipelineCreator, Presenter, RenderBatches, SceneRenderer, Stager,
};
pub use error::SceneError;
pub use group::{Group, Separator};
pub use node::{Node, NodeKind, Phase, TypedNode};
pub use resources::{DeviceObject, LiveHandles, ResourceTable};
pub use search::{bounding_box, find_first_of_type, find_first_of_type_mut};
