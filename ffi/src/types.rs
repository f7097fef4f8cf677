//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! JSON crosses the boundary as text: request payloads come in as C strings
//! and decoded responses go out re-serialized. That keeps the C surface to a
//! single result envelope instead of mirroring the JSON value tree.

use std::ffi::CString;
use std::os::raw::c_char;

use sfrest_core::{ApiError, SalesforceClient, Value};

/// Opaque handle to a `SalesforceClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiSfClient {
    pub(crate) inner: SalesforceClient,
}

/// Error codes returned in `FfiSfResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Transport = 1,
    Encode = 2,
    Decode = 3,
    InvalidInput = 4,
    NullArg = 5,
    Panic = 6,
}

/// Result envelope for every operation.
///
/// On success `error_code` is `Ok` and `error_message` is null; `json` holds
/// the decoded response as JSON text, or null for delete. On failure `json`
/// is null and `error_message` is a human-readable C string.
#[repr(C)]
pub struct FfiSfResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub json: *mut c_char,
}

/// Hand a Rust string to C. Interior NULs are dropped rather than failing.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    let s = if s.contains('\0') { s.replace('\0', "") } else { s };
    CString::new(s).unwrap_or_default().into_raw()
}

impl FfiSfResult {
    fn boxed(error_code: FfiErrorCode, error_message: *mut c_char, json: *mut c_char) -> *mut Self {
        Box::into_raw(Box::new(FfiSfResult {
            error_code,
            error_message,
            json,
        }))
    }

    fn error(error_code: FfiErrorCode, msg: String) -> *mut Self {
        Self::boxed(error_code, into_c_string(msg), std::ptr::null_mut())
    }

    /// Build a success result carrying a decoded JSON value.
    pub(crate) fn ok_json(value: Value) -> *mut Self {
        Self::boxed(
            FfiErrorCode::Ok,
            std::ptr::null_mut(),
            into_c_string(value.to_string()),
        )
    }

    /// Build a success result with no payload (delete).
    pub(crate) fn ok_empty() -> *mut Self {
        Self::boxed(FfiErrorCode::Ok, std::ptr::null_mut(), std::ptr::null_mut())
    }

    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let code = match &err {
            ApiError::Transport(_) => FfiErrorCode::Transport,
            ApiError::Encode(_) => FfiErrorCode::Encode,
            ApiError::Decode(_) => FfiErrorCode::Decode,
        };
        Self::error(code, err.to_string())
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::error(FfiErrorCode::NullArg, format!("null argument: {name}"))
    }

    pub(crate) fn invalid_input(msg: String) -> *mut Self {
        Self::error(FfiErrorCode::InvalidInput, msg)
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::error(FfiErrorCode::Panic, msg.to_string())
    }
}
