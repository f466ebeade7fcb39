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

/// What became of one call to [`redraw`](super::RenderManager::redraw).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameOutcome {
    /// The frame was submitted and presented.
    Presented,
    /// The surface was stale; it was recreated and the frame presented after the resize.
    Recovered,
    /// Nothing was presented. The reason has been logged.
    Dropped,
}

/// Counters maintained by the manager since it was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_presented: u64,
    pub frames_dropped: u64,
    /// Completed resizes, including the ones triggered by recovery.
    pub resizes: u64,
    /// Stale-surface conditions answered with a resize.
    pub recoveries: u64,
}

impl FrameStats {
    pub(crate) fn record(&mut self, outcome: FrameOutcome) {
        match outcome {
            FrameOutcome::Presented | FrameOutcome::Recovered => self.frames_presented += 1,
            FrameOutcome::Dropped => self.frames_dropped += 1,
        }
    }
}
