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

//! The [`Node`] trait every scene element implements.

use crate::context::{
    Allocator, BoundingBoxQuery, CommandRecorder, EventHandler, PipelineCreator, Presenter,
    SceneRenderer, Stager,
};
use crate::error::SceneError;
use std::any::Any;
use std::fmt::Debug;

/// The traversal phases, in the order a full build runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Create device resources and bind memory.
    Allocate,
    /// Recreate surface-dependent resources.
    Resize,
    /// Upload host data into device resources.
    Stage,
    /// Build descriptor sets and pipelines.
    BuildPipeline,
    /// Record secondary command buffers.
    Record,
    /// Per-frame uniform updates and command execution.
    Render,
    /// Contribute to presentation.
    Present,
}

/// A runtime tag identifying the concrete type of a node.
///
/// Used by [`find_first_of_type`](crate::search::find_first_of_type) to locate
/// nodes without relying on the traversal order of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Group,
    Separator,
    BufferData,
    HostBuffer,
    DeviceBuffer,
    TransformBuffer,
    DescriptorBinding,
    VertexBinding,
    VertexAttribute,
    IndexBuffer,
    Shader,
    Image,
    Sampler,
    Rasterization,
    DrawCommand,
    DispatchCommand,
    Transform,
    Camera,
    /// A node defined outside this crate.
    Custom(&'static str),
}

/// Type-erasure helpers, implemented for every `'static` type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An element of the scene graph.
///
/// Every phase method defaults to doing nothing; a node overrides the phases
/// it takes part in. Nodes communicate through the `state` record of the
/// context they are handed: producers write it, later consumers read it.
pub trait Node: AsAny + Debug + Send {
    /// Runtime type tag.
    fn kind(&self) -> NodeKind;

    /// Child nodes in traversal order. Leaves have none.
    fn children(&self) -> &[Box<dyn Node>] {
        &[]
    }

    /// Mutable access to the child list, for nodes that have one.
    fn children_mut(&mut self) -> Option<&mut Vec<Box<dyn Node>>> {
        None
    }

    fn alloc(&mut self, _allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        Ok(())
    }

    fn resize(&mut self, _allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        Ok(())
    }

    fn stage(&mut self, _stager: &mut Stager<'_>) -> Result<(), SceneError> {
        Ok(())
    }

    fn pipeline(&mut self, _creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        Ok(())
    }

    fn record(&mut self, _recorder: &mut CommandRecorder<'_>) -> Result<(), SceneError> {
        Ok(())
    }

    fn render(&mut self, _renderer: &mut SceneRenderer<'_>) -> Result<(), SceneError> {
        Ok(())
    }

    fn present(&mut self, _presenter: &mut Presenter<'_>) -> Result<(), SceneError> {
        Ok(())
    }

    fn handle_event(&mut self, _handler: &mut EventHandler<'_>) -> Result<(), SceneError> {
        Ok(())
    }

    /// Contributes to the bounding box of the scene. Read-only.
    fn bounding_box(&self, _query: &mut BoundingBoxQuery) {}
}

/// A node type that can be searched for by kind.
pub trait TypedNode: Node + Sized + 'static {
    const KIND: NodeKind;
}

/// Implements [`TypedNode`] for built-in node types.
macro_rules! typed_node {
    ($ty:ty, $kind:ident) => {
        impl $crate::node::TypedNode for $ty {
            const KIND: $crate::node::NodeKind = $crate::node::NodeKind::$kind;
        }
    };
}

pub(crate) use typed_node;
