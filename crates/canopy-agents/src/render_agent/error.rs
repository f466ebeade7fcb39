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

use canopy_core::{DeviceError, ErrorCategory};
use canopy_scene::{Phase, SceneError};
use thiserror::Error;

/// Errors returned by the [`RenderManager`](super::RenderManager).
#[derive(Debug, Error)]
pub enum ManagerError {
    /// A traversal failed. The rest of that pass was skipped.
    #[error("{phase:?} phase failed: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: SceneError,
    },
    /// A device call made by the manager itself failed.
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// The operation needs a completed build.
    #[error("the scene has not been built; call init() first")]
    NotInitialized,
}

impl ManagerError {
    pub(crate) fn phase(phase: Phase) -> impl FnOnce(SceneError) -> ManagerError {
        move |source| ManagerError::Phase { phase, source }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ManagerError::Phase { source, .. } => source.category(),
            ManagerError::Device(err) => err.category(),
            ManagerError::NotInitialized => ErrorCategory::Protocol,
        }
    }

    /// Returns `true` if the surface went stale and a resize would recover.
    pub fn is_out_of_date(&self) -> bool {
        self.category() == ErrorCategory::OutOfDate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_date_through_a_phase() {
        let err = ManagerError::phase(Phase::Present)(SceneError::from(DeviceError::OutOfDate));
        assert!(err.is_out_of_date());
        assert!(err.to_string().starts_with("Present phase failed"));
    }

    #[test]
    fn test_not_initialized_is_a_protocol_error() {
        assert_eq!(ManagerError::NotInitialized.category(), ErrorCategory::Protocol);
        assert!(!ManagerError::NotInitialized.is_out_of_date());
    }
}
