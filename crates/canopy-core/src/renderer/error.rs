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

//! Error types reported by graphics devices and surfaces.

use crate::renderer::api::{MemoryId, MemoryProperty};
use std::fmt;
use thiserror::Error;

/// A non-success status returned by the underlying graphics API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// A fence or query has not yet completed.
    NotReady,
    /// A wait operation did not complete in the specified time.
    Timeout,
    /// A host memory allocation failed.
    OutOfHostMemory,
    /// A device memory allocation failed.
    OutOfDeviceMemory,
    /// Initialization of an object could not be completed.
    InitializationFailed,
    /// The logical or physical device has been lost.
    DeviceLost,
    /// Mapping of a memory object failed.
    MemoryMapFailed,
    /// A requested format is not supported on this device.
    FormatNotSupported,
    /// A backend-specific code with no portable meaning.
    Unknown(i32),
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultCode::NotReady => write!(f, "NOT_READY"),
            ResultCode::Timeout => write!(f, "TIMEOUT"),
            ResultCode::OutOfHostMemory => write!(f, "ERROR_OUT_OF_HOST_MEMORY"),
            ResultCode::OutOfDeviceMemory => write!(f, "ERROR_OUT_OF_DEVICE_MEMORY"),
            ResultCode::InitializationFailed => write!(f, "ERROR_INITIALIZATION_FAILED"),
            ResultCode::DeviceLost => write!(f, "ERROR_DEVICE_LOST"),
            ResultCode::MemoryMapFailed => write!(f, "ERROR_MEMORY_MAP_FAILED"),
            ResultCode::FormatNotSupported => write!(f, "ERROR_FORMAT_NOT_SUPPORTED"),
            ResultCode::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

/// Coarse classification of every error the engine can raise.
///
/// The orchestrator decides between retry, frame drop and abort from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// An API call returned a failure code.
    Api,
    /// The presentation surface no longer matches the window; recoverable by resizing.
    OutOfDate,
    /// A request the device cannot satisfy, such as a missing memory type.
    ResourcePolicy,
    /// A scene tree that breaks the traversal contract.
    Protocol,
}

/// Errors reported by a [`GraphicsDevice`](crate::renderer::GraphicsDevice) or a
/// [`Surface`](crate::renderer::Surface).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    /// An API call failed with the given code.
    #[error("{call} failed: {code}")]
    Api {
        /// The name of the failing call.
        call: &'static str,
        /// The status it returned.
        code: ResultCode,
    },
    /// The surface has changed and must be recreated before presenting again.
    #[error("surface is out of date")]
    OutOfDate,
    /// No memory type allowed by a resource provides the requested properties.
    #[error("no memory type in {type_bits:#b} provides {required:?}")]
    NoMemoryType {
        /// Bit mask of memory type indices the resource may live in.
        type_bits: u32,
        /// Properties the caller asked for.
        required: MemoryProperty,
    },
    /// A handle that was never created or was already destroyed.
    #[error("invalid handle: {0}")]
    InvalidHandle(String),
    /// A host write to memory that cannot be mapped.
    #[error("memory {0:?} is not host visible")]
    NotHostVisible(MemoryId),
    /// A host write past the end of a memory object.
    #[error("write of {len} bytes at offset {offset} exceeds memory size {size}")]
    OutOfBounds {
        /// Offset of the write.
        offset: u64,
        /// Number of bytes written.
        len: u64,
        /// Size of the memory object.
        size: u64,
    },
    /// A handle that is already bound to memory.
    #[error("{0} is already bound to memory")]
    AlreadyBound(String),
}

impl DeviceError {
    /// Shorthand for an [`DeviceError::Api`] failure.
    pub fn api(call: &'static str, code: ResultCode) -> Self {
        DeviceError::Api { call, code }
    }

    /// Returns `true` for the recoverable presentation failure.
    pub fn is_out_of_date(&self) -> bool {
        matches!(self, DeviceError::OutOfDate)
    }

    /// Classifies the error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            DeviceError::Api { .. } => ErrorCategory::Api,
            DeviceError::OutOfDate => ErrorCategory::OutOfDate,
            DeviceError::NoMemoryType { .. } => ErrorCategory::ResourcePolicy,
            DeviceError::InvalidHandle(_)
            | DeviceError::NotHostVisible(_)
            | DeviceError::OutOfBounds { .. }
            | DeviceError::AlreadyBound(_) => ErrorCategory::Protocol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = DeviceError::api("vkAllocateMemory", ResultCode::OutOfDeviceMemory);
        assert_eq!(
            err.to_string(),
            "vkAllocateMemory failed: ERROR_OUT_OF_DEVICE_MEMORY"
        );
        assert_eq!(err.category(), ErrorCategory::Api);
    }

    #[test]
    fn test_out_of_date_is_recoverable() {
        assert!(DeviceError::OutOfDate.is_out_of_date());
        assert_eq!(DeviceError::OutOfDate.category(), ErrorCategory::OutOfDate);
    }

    #[test]
    fn test_no_memory_type_is_resource_policy() {
        let err = DeviceError::NoMemoryType {
            type_bits: 0b10,
            required: MemoryProperty::HOST_VISIBLE,
        };
        assert_eq!(err.category(), ErrorCategory::ResourcePolicy);
        assert!(err.to_string().contains("0b10"));
    }

    #[test]
    fn test_unknown_code_display() {
        assert_eq!(ResultCode::Unknown(-13).to_string(), "UNKNOWN(-13)");
    }
}
