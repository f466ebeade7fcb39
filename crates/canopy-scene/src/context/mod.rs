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

//! The phase contexts handed to nodes during traversal.
//!
//! Each context exposes the device capabilities its phase needs and a public
//! `state` record (see [`crate::state`]).

mod allocator;
mod bounds;
mod events;
mod pipeline;
mod presenter;
mod recorder;
mod renderer;
mod stager;

pub use allocator::{AllocationReport, Allocator};
pub use bounds::BoundingBoxQuery;
pub use events::{EventHandler, InputEvent, Key, MouseButton};
pub use pipeline::PipelineCreator;
pub use presenter::Presenter;
pub use recorder::CommandRecorder;
pub use renderer::{RenderBatches, SceneRenderer};
pub use stager::Stager;

/// A context whose state record can be saved and restored.
pub trait PhaseContext {
    type State: Clone;

    fn state_mut(&mut self) -> &mut Self::State;
}

/// Runs `f` with the state of `ctx`, then restores the state to what it was.
///
/// The state is restored whatever `f` returns.
pub(crate) fn scoped<C, R>(ctx: &mut C, f: impl FnOnce(&mut C) -> R) -> R
where
    C: PhaseContext,
{
    let saved = ctx.state_mut().clone();
    let result = f(ctx);
    *ctx.state_mut() = saved;
    result
}

/// Implements [`PhaseContext`] for a context with a public `state` field.
macro_rules! phase_context {
    ($ctx:ident, $state:ty) => {
        impl crate::context::PhaseContext for $ctx<'_> {
            type State = $state;

            fn state_mut(&mut self) -> &mut Self::State {
                &mut self.state
            }
        }
    };
}

pub(crate) use phase_context;
