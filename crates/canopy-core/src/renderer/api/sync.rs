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

//! Host and queue synchronization primitives.

use crate::renderer::api::CommandBufferId;

define_handle!(
    /// An opaque handle to a fence, signaled by the device and waited on by the host.
    FenceId
);
define_handle!(
    /// An opaque handle to a semaphore, ordering queue operations.
    SemaphoreId
);

/// One batch of work submitted to the queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitInfo<'a> {
    /// Primary command buffers executed in order.
    pub command_buffers: &'a [CommandBufferId],
    /// Semaphores waited on before execution.
    pub wait_semaphores: &'a [SemaphoreId],
    /// Semaphores signaled once execution completes.
    pub signal_semaphores: &'a [SemaphoreId],
}
