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

//! Errors raised while traversing a scene.

use canopy_core::image::ImageLoadError;
use canopy_core::{DeviceError, ErrorCategory};
use std::path::PathBuf;
use thiserror::Error;

/// An error raised by a node or a phase context.
///
/// Any error aborts the remainder of the current traversal and propagates to
/// the caller of the phase.
#[derive(Debug, Error)]
pub enum SceneError {
    /// A device call failed.
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// A node read a state field that no earlier node wrote.
    #[error("{node} read {missing} before any node wrote it")]
    MissingState {
        /// The reading node.
        node: &'static str,
        /// The missing state field.
        missing: &'static str,
    },
    /// A node was driven through phases out of order.
    #[error("{node}: {message}")]
    Protocol {
        /// The offending node.
        node: &'static str,
        /// What went wrong.
        message: String,
    },
    /// A resource was used before memory was bound to it.
    #[error("{0} is not bound to memory")]
    Unbound(String),
    /// A handle the resource table does not own.
    #[error("{0} is not tracked by the resource table")]
    Untracked(String),
    /// An image file could not be loaded.
    #[error(transparent)]
    ImageLoad(#[from] ImageLoadError),
    /// A shader file could not be read.
    #[error("failed to read shader '{path}': {source}")]
    ShaderIo {
        /// The file.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },
}

impl SceneError {
    pub(crate) fn missing(node: &'static str, missing: &'static str) -> Self {
        SceneError::MissingState { node, missing }
    }

    pub(crate) fn protocol(node: &'static str, message: impl Into<String>) -> Self {
        SceneError::Protocol {
            node,
            message: message.into(),
        }
    }

    /// Classifies the error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            SceneError::Device(err) => err.category(),
            SceneError::MissingState { .. }
            | SceneError::Protocol { .. }
            | SceneError::Unbound(_)
            | SceneError::Untracked(_) => ErrorCategory::Protocol,
            SceneError::ImageLoad(_) | SceneError::ShaderIo { .. } => ErrorCategory::ResourcePolicy,
        }
    }

    /// Returns `true` if the error is the recoverable out-of-date surface condition.
    pub fn is_out_of_date(&self) -> bool {
        matches!(self, SceneError::Device(err) if err.is_out_of_date())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::renderer::ResultCode;

    #[test]
    fn test_missing_state_display() {
        let err = SceneError::missing("DescriptorBinding", "a buffer");
        assert_eq!(
            err.to_string(),
            "DescriptorBinding read a buffer before any node wrote it"
        );
        assert_eq!(err.category(), ErrorCategory::Protocol);
    }

    #[test]
    fn test_device_errors_keep_their_category() {
        let err = SceneError::from(DeviceError::OutOfDate);
        assert!(err.is_out_of_date());
        let err = SceneError::from(DeviceError::api("vkQueueSubmit", ResultCode::DeviceLost));
        assert_eq!(err.category(), ErrorCategory::Api);
        assert!(!err.is_out_of_date());
    }
}
