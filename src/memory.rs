use crate::keyspace;
use std::os::raw::c_void;

/// Handle stored under the module-typed key. The node graph itself lives in
/// the keyspace registry; the handle only names it.
pub struct SlSetRef {
    pub key: String,
}

#[no_mangle]
pub unsafe extern "C" fn slset_free(value: *mut c_void) {
    if !value.is_null() {
        drop(Box::from_raw(value.cast::<SlSetRef>()));
    }
}

#[no_mangle]
pub unsafe extern "C" fn slset_mem_usage(value: *const c_void) -> usize {
    if value.is_null() {
        return 0;
    }
    let handle = &*value.cast::<SlSetRef>();
    keyspace::with_read(&handle.key, |sl| sl.mem_usage())
}
