//! VPP status codes and API error handling.
//!
//! Every VPP reply carries a signed `retval`; zero means success and negative
//! values name a `vnet_api_error_t`. This module converts those codes into
//! Rust's `Result` type and adds the failures that happen before a reply is
//! seen at all (transport loss, deadlines).

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// `retval` codes returned by VPP.
///
/// Codes without a named variant are kept in [`ApiStatus::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiStatus {
    Success,
    Unspecified,
    InvalidSwIfIndex,
    NoSuchFib,
    NoSuchEntry,
    InvalidValue,
    InvalidValue2,
    Unimplemented,
    InvalidSwIfIndex2,
    SyscallError1,
    Other(i32),
}

impl ApiStatus {
    /// Creates an ApiStatus from a raw `retval`.
    pub fn from_raw(retval: i32) -> Self {
        match retval {
            0 => ApiStatus::Success,
            -1 => ApiStatus::Unspecified,
            -2 => ApiStatus::InvalidSwIfIndex,
            -3 => ApiStatus::NoSuchFib,
            -6 => ApiStatus::NoSuchEntry,
            -7 => ApiStatus::InvalidValue,
            -8 => ApiStatus::InvalidValue2,
            -9 => ApiStatus::Unimplemented,
            -10 => ApiStatus::InvalidSwIfIndex2,
            -11 => ApiStatus::SyscallError1,
            other => ApiStatus::Other(other),
        }
    }

    /// Returns the raw `retval`.
    pub fn as_raw(&self) -> i32 {
        match self {
            ApiStatus::Success => 0,
            ApiStatus::Unspecified => -1,
            ApiStatus::InvalidSwIfIndex => -2,
            ApiStatus::NoSuchFib => -3,
            ApiStatus::NoSuchEntry => -6,
            ApiStatus::InvalidValue => -7,
            ApiStatus::InvalidValue2 => -8,
            ApiStatus::Unimplemented => -9,
            ApiStatus::InvalidSwIfIndex2 => -10,
            ApiStatus::SyscallError1 => -11,
            ApiStatus::Other(code) => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == ApiStatus::Success
    }

    /// Converts to a Result, returning Ok(()) for success.
    pub fn into_result(self) -> ApiResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(ApiError::Retval { status: self })
        }
    }
}

impl fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApiStatus::Success => "VNET_API_ERROR_OK",
            ApiStatus::Unspecified => "VNET_API_ERROR_UNSPECIFIED",
            ApiStatus::InvalidSwIfIndex => "VNET_API_ERROR_INVALID_SW_IF_INDEX",
            ApiStatus::NoSuchFib => "VNET_API_ERROR_NO_SUCH_FIB",
            ApiStatus::NoSuchEntry => "VNET_API_ERROR_NO_SUCH_ENTRY",
            ApiStatus::InvalidValue => "VNET_API_ERROR_INVALID_VALUE",
            ApiStatus::InvalidValue2 => "VNET_API_ERROR_INVALID_VALUE_2",
            ApiStatus::Unimplemented => "VNET_API_ERROR_UNIMPLEMENTED",
            ApiStatus::InvalidSwIfIndex2 => "VNET_API_ERROR_INVALID_SW_IF_INDEX_2",
            ApiStatus::SyscallError1 => "VNET_API_ERROR_SYSCALL_ERROR_1",
            ApiStatus::Other(code) => return write!(f, "retval {}", code),
        };
        write!(f, "{} ({})", s, self.as_raw())
    }
}

/// Error type for VPP API operations.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// VPP replied with a nonzero `retval`.
    #[error("VPP rejected request: {status}")]
    Retval { status: ApiStatus },

    /// The connection failed before a reply arrived.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// No reply arrived before the deadline.
    #[error("No reply within {}ms", .after.as_millis())]
    Timeout { after: Duration },

    /// A reply of the wrong message type arrived for a request.
    #[error("Unexpected reply: expected {expected}, got {actual}")]
    UnexpectedReply {
        expected: &'static str,
        actual: &'static str,
    },

    /// The correlation id is already in flight.
    #[error("Context {context} is already pending")]
    DuplicateContext { context: u32 },
}

impl ApiError {
    /// Creates an error from a raw `retval`.
    pub fn from_retval(retval: i32) -> Self {
        ApiError::Retval {
            status: ApiStatus::from_raw(retval),
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        ApiError::Transport {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(after: Duration) -> Self {
        ApiError::Timeout { after }
    }

    /// Returns the VPP status if VPP itself rejected the request.
    pub fn status(&self) -> Option<ApiStatus> {
        match self {
            ApiError::Retval { status } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if VPP processed and rejected the request, as opposed to
    /// the request never being answered.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Retval { .. })
    }

    /// Returns true if resending the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport { .. } | ApiError::Timeout { .. })
    }
}

/// Result type for VPP API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_from_raw() {
        assert_eq!(ApiStatus::from_raw(0), ApiStatus::Success);
        assert_eq!(ApiStatus::from_raw(-2), ApiStatus::InvalidSwIfIndex);
        assert_eq!(ApiStatus::from_raw(-999), ApiStatus::Other(-999));
        assert_eq!(ApiStatus::from_raw(-999).as_raw(), -999);
    }

    #[test]
    fn test_status_into_result() {
        assert!(ApiStatus::Success.into_result().is_ok());
        let err = ApiStatus::NoSuchEntry.into_result().unwrap_err();
        assert_eq!(err.status(), Some(ApiStatus::NoSuchEntry));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(
            ApiStatus::InvalidValue.to_string(),
            "VNET_API_ERROR_INVALID_VALUE (-7)"
        );
        assert_eq!(ApiStatus::Other(-120).to_string(), "retval -120");
    }

    #[test]
    fn test_error_classification() {
        let rejected = ApiError::from_retval(-7);
        assert!(rejected.is_rejection());
        assert!(!rejected.is_retryable());

        let timeout = ApiError::timeout(Duration::from_millis(50));
        assert!(!timeout.is_rejection());
        assert!(timeout.is_retryable());
        assert_eq!(timeout.to_string(), "No reply within 50ms");

        assert!(ApiError::transport("closed").is_retryable());
    }
}
