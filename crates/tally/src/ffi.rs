//! Raw extension boundary for live-object reporting.
//!
//! Shape-compatible with the driver extension this registry backs: a C
//! callback plus an opaque user-data pointer, invoked once per live
//! object. Everything internal goes through the generic visitor on
//! [`crate::Registry::for_each`]; the raw shape exists only here.

use std::ffi::CString;
use std::os::raw::{c_char, c_void};

/// Callback invoked once per live object.
///
/// `type_name` is NUL-terminated and valid only for the duration of the
/// call; callers that need it longer must copy it out.
pub type ReportCallback = unsafe extern "C" fn(
    user_data: *mut c_void,
    identity: u64,
    type_name: *const c_char,
    ref_count: u32,
);

/// Walk every live object in identity order, invoking `report_fn` with
/// `user_data` for each.
///
/// # Safety
///
/// `report_fn` must be safe to call with `user_data`; it must not call
/// back into the registry and must not retain `type_name` beyond the
/// call.
pub unsafe fn report_live_objects_raw(report_fn: ReportCallback, user_data: *mut c_void) {
    crate::report_live_objects(|id, type_name, ref_count| {
        // Interior NULs cannot appear in real type names; an empty string
        // is the safe fallback if one ever does.
        let type_name = CString::new(type_name).unwrap_or_default();
        unsafe { report_fn(user_data, id.as_u64(), type_name.as_ptr(), ref_count) };
    });
}
