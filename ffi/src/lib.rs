//! C-ABI wrapper around `sfrest-core`.
//!
//! # Overview
//! Exposes describe, search, create, get, upsert, update and delete through
//! `extern "C"` functions so any language with a C FFI can drive the client.
//! The network round trip happens inside each call.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Request payloads are passed as JSON text and responses come back as
//!   JSON text inside a single `FfiSfResult` envelope.
//! - The C caller owns all returned pointers. Clients go back through
//!   `sf_client_free`; every string the library hands out lives inside an
//!   `FfiSfResult` and is released with it by `sf_free_result`.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use sfrest_core::{ApiError, SalesforceClient, Value};

use types::*;

type Outcome = Result<*mut FfiSfResult, *mut FfiSfResult>;

/// Run `body`, turning an early-return error or a panic into a result.
fn guarded(op: &str, body: impl FnOnce() -> Outcome) -> *mut FfiSfResult {
    catch_unwind(AssertUnwindSafe(body))
        .map(|outcome| outcome.unwrap_or_else(|err| err))
        .unwrap_or_else(|_| FfiSfResult::panic(&format!("panic in {op}")))
}

fn str_arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, *mut FfiSfResult> {
    if ptr.is_null() {
        return Err(FfiSfResult::null_arg(name));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| FfiSfResult::invalid_input(format!("{name} is not valid UTF-8")))
}

fn json_arg(ptr: *const c_char, name: &str) -> Result<Value, *mut FfiSfResult> {
    let text = str_arg(ptr, name)?;
    serde_json::from_str(text)
        .map_err(|e| FfiSfResult::invalid_input(format!("{name} is not valid JSON: {e}")))
}

fn client_arg<'a>(client: *const FfiSfClient) -> Result<&'a FfiSfClient, *mut FfiSfResult> {
    if client.is_null() {
        return Err(FfiSfResult::null_arg("client"));
    }
    Ok(unsafe { &*client })
}

fn respond(result: Result<Value, ApiError>) -> *mut FfiSfResult {
    match result {
        Ok(value) => FfiSfResult::ok_json(value),
        Err(e) => FfiSfResult::from_error(e),
    }
}

/// Borrow a C string for the constructors, which report failure as null.
fn ctor_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client for `https://{instance_host}/services/data/v31/`.
///
/// Returns null if either argument is null or not UTF-8. The caller must
/// free the returned pointer with `sf_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn sf_client_new(
    instance_host: *const c_char,
    bearer_token: *const c_char,
) -> *mut FfiSfClient {
    catch_unwind(|| {
        let (Some(host), Some(token)) = (ctor_arg(instance_host), ctor_arg(bearer_token)) else {
            return std::ptr::null_mut();
        };
        let inner = SalesforceClient::new(host, token);
        Box::into_raw(Box::new(FfiSfClient { inner }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Like `sf_client_new` but with an explicit URL scheme such as `"http"`.
#[unsafe(no_mangle)]
pub extern "C" fn sf_client_new_with_scheme(
    scheme: *const c_char,
    instance_host: *const c_char,
    bearer_token: *const c_char,
) -> *mut FfiSfClient {
    catch_unwind(|| {
        let (Some(scheme), Some(host), Some(token)) =
            (ctor_arg(scheme), ctor_arg(instance_host), ctor_arg(bearer_token))
        else {
            return std::ptr::null_mut();
        };
        let inner = SalesforceClient::builder(host, token).scheme(scheme).build();
        Box::into_raw(Box::new(FfiSfClient { inner }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `sf_client_new*`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn sf_client_free(client: *mut FfiSfClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// List every object type on the instance.
#[unsafe(no_mangle)]
pub extern "C" fn sf_describe(client: *const FfiSfClient) -> *mut FfiSfResult {
    guarded("sf_describe", || {
        let client = client_arg(client)?;
        Ok(respond(client.inner.describe()))
    })
}

/// Run a raw search query.
#[unsafe(no_mangle)]
pub extern "C" fn sf_search(client: *const FfiSfClient, query: *const c_char) -> *mut FfiSfResult {
    guarded("sf_search", || {
        let client = client_arg(client)?;
        let query = str_arg(query, "query")?;
        Ok(respond(client.inner.search(query)))
    })
}

/// Create a record of `object_name` from the JSON text `data`.
#[unsafe(no_mangle)]
pub extern "C" fn sf_create(
    client: *const FfiSfClient,
    object_name: *const c_char,
    data: *const c_char,
) -> *mut FfiSfResult {
    guarded("sf_create", || {
        let client = client_arg(client)?;
        let object_name = str_arg(object_name, "object_name")?;
        let data = json_arg(data, "data")?;
        Ok(respond(client.inner.create(object_name, &data)))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn sf_get(
    client: *const FfiSfClient,
    object_name: *const c_char,
    record_id: *const c_char,
) -> *mut FfiSfResult {
    guarded("sf_get", || {
        let client = client_arg(client)?;
        let object_name = str_arg(object_name, "object_name")?;
        let record_id = str_arg(record_id, "record_id")?;
        Ok(respond(client.inner.get(object_name, record_id)))
    })
}

/// Same request as `sf_update`.
#[unsafe(no_mangle)]
pub extern "C" fn sf_upsert(
    client: *const FfiSfClient,
    object_name: *const c_char,
    record_id: *const c_char,
    data: *const c_char,
) -> *mut FfiSfResult {
    guarded("sf_upsert", || {
        let client = client_arg(client)?;
        let object_name = str_arg(object_name, "object_name")?;
        let record_id = str_arg(record_id, "record_id")?;
        let data = json_arg(data, "data")?;
        Ok(respond(client.inner.upsert(object_name, record_id, &data)))
    })
}

/// PATCH the record with the JSON text `data`.
///
/// The remote API answers a successful PATCH with 204 and no body, which
/// does not decode: that comes back as `Decode` even though the record changed.
#[unsafe(no_mangle)]
pub extern "C" fn sf_update(
    client: *const FfiSfClient,
    object_name: *const c_char,
    record_id: *const c_char,
    data: *const c_char,
) -> *mut FfiSfResult {
    guarded("sf_update", || {
        let client = client_arg(client)?;
        let object_name = str_arg(object_name, "object_name")?;
        let record_id = str_arg(record_id, "record_id")?;
        let data = json_arg(data, "data")?;
        Ok(respond(client.inner.update(object_name, record_id, &data)))
    })
}

/// Delete a record. `json` is always null on success.
#[unsafe(no_mangle)]
pub extern "C" fn sf_delete(
    client: *const FfiSfClient,
    object_name: *const c_char,
    record_id: *const c_char,
) -> *mut FfiSfResult {
    guarded("sf_delete", || {
        let client = client_arg(client)?;
        let object_name = str_arg(object_name, "object_name")?;
        let record_id = str_arg(record_id, "record_id")?;
        Ok(match client.inner.delete(object_name, record_id) {
            Ok(()) => FfiSfResult::ok_empty(),
            Err(e) => FfiSfResult::from_error(e),
        })
    })
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiSfResult` returned by any operation. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn sf_free_result(result: *mut FfiSfResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.json.is_null() {
            drop(unsafe { CString::from_raw(result.json) });
        }
    });
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::net::SocketAddr;

    use mock_server::AppState;

    fn start_server() -> (SocketAddr, AppState) {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();

        let state = AppState::new();
        let server_state = state.clone();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                mock_server::run_with_state(listener, server_state).await
            })
            .unwrap();
        });
        (addr, state)
    }

    fn http_client(addr: SocketAddr) -> *mut FfiSfClient {
        let scheme = CString::new("http").unwrap();
        let host = CString::new(addr.to_string()).unwrap();
        let token = CString::new("test-token").unwrap();
        let client = sf_client_new_with_scheme(scheme.as_ptr(), host.as_ptr(), token.as_ptr());
        assert!(!client.is_null());
        client
    }

    /// Read the JSON payload of a successful result.
    fn json_of(result: *mut FfiSfResult) -> Value {
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert!(r.error_message.is_null());
        let text = unsafe { CStr::from_ptr(r.json) }.to_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn client_new_and_free() {
        let host = CString::new("na1.example.com").unwrap();
        let token = CString::new("tok").unwrap();
        let client = sf_client_new(host.as_ptr(), token.as_ptr());
        assert!(!client.is_null());
        let inner = unsafe { &(*client).inner };
        assert_eq!(inner.base_url(), "https://na1.example.com/services/data/v31/");
        sf_client_free(client);
    }

    #[test]
    fn client_new_null_returns_null() {
        let token = CString::new("tok").unwrap();
        assert!(sf_client_new(std::ptr::null(), token.as_ptr()).is_null());
        let host = CString::new("na1.example.com").unwrap();
        assert!(sf_client_new(host.as_ptr(), std::ptr::null()).is_null());
    }

    #[test]
    fn client_free_null_is_safe() {
        sf_client_free(std::ptr::null_mut());
    }

    #[test]
    fn null_client_returns_null_arg() {
        let result = sf_describe(std::ptr::null());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NullArg);
        assert!(!r.error_message.is_null());
        assert!(r.json.is_null());
        sf_free_result(result);
    }

    #[test]
    fn null_record_id_returns_null_arg() {
        let host = CString::new("na1.example.com").unwrap();
        let token = CString::new("tok").unwrap();
        let client = sf_client_new(host.as_ptr(), token.as_ptr());
        let object = CString::new("Account").unwrap();

        let result = sf_get(client, object.as_ptr(), std::ptr::null());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NullArg);
        let msg = unsafe { CStr::from_ptr(r.error_message) }.to_str().unwrap();
        assert_eq!(msg, "null argument: record_id");

        sf_free_result(result);
        sf_client_free(client);
    }

    #[test]
    fn invalid_json_data_is_rejected_before_sending() {
        let (addr, state) = start_server();
        let client = http_client(addr);
        let object = CString::new("Account").unwrap();
        let data = CString::new("{not json").unwrap();

        let result = sf_create(client, object.as_ptr(), data.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::InvalidInput);
        assert!(state.requests().is_empty());

        sf_free_result(result);
        sf_client_free(client);
    }

    #[test]
    fn lifecycle_against_mock_server() {
        let (addr, _state) = start_server();
        let client = http_client(addr);
        let object = CString::new("Account").unwrap();

        let data = CString::new(r#"{"Name":"Acme"}"#).unwrap();
        let result = sf_create(client, object.as_ptr(), data.as_ptr());
        let created = json_of(result);
        sf_free_result(result);
        assert_eq!(created["success"], true);
        let id = CString::new(created["id"].as_str().unwrap()).unwrap();

        let data = CString::new(r#"{"Name":"Acme Corp"}"#).unwrap();
        let result = sf_update(client, object.as_ptr(), id.as_ptr(), data.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Decode);
        assert!(r.json.is_null());
        sf_free_result(result);

        let result = sf_get(client, object.as_ptr(), id.as_ptr());
        assert_eq!(json_of(result)["Name"], "Acme Corp");
        sf_free_result(result);

        let result = sf_delete(client, object.as_ptr(), id.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert!(r.json.is_null());
        sf_free_result(result);

        sf_client_free(client);
    }

    #[test]
    fn malformed_response_maps_to_decode() {
        let (addr, state) = start_server();
        state.stub("GET", "/services/data/v31/sobjects", 200, "not json");
        let client = http_client(addr);

        let result = sf_describe(client);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Decode);
        assert!(r.json.is_null());

        sf_free_result(result);
        sf_client_free(client);
    }

    #[test]
    fn delete_with_non_utf8_error_page_is_ok() {
        let (addr, state) = start_server();
        state.stub("DELETE", "/services/data/v31/Account/xyz", 500, vec![0xe9, b'r', b'r']);
        let client = http_client(addr);
        let object = CString::new("Account").unwrap();
        let id = CString::new("xyz").unwrap();

        let result = sf_delete(client, object.as_ptr(), id.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert!(r.error_message.is_null());
        assert!(r.json.is_null());

        sf_free_result(result);
        sf_client_free(client);
    }

    #[test]
    fn free_result_null_is_safe() {
        sf_free_result(std::ptr::null_mut());
    }
}
