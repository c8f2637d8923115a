// ==============================================================================
// ffi.rs - C Interface
// ==============================================================================
// Description: C ABI for embedding database downloads in non-Rust hosts
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-15
// Version: 0.1.0
// ==============================================================================
// Usage (C):
//   GladeDatabase *db = glade_new();
//   if (db && glade_download_database(db, "clinvar", "GRCh38") == 0) { ... }
//   glade_free(db);
// ==============================================================================

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::path::PathBuf;
use tracing::error;

use crate::config::Settings;
use crate::database::DatabaseManager;
use crate::error::Result;

/// Opaque handle owning a manager and the runtime that drives it
pub struct GladeDatabase {
    manager: DatabaseManager,
    runtime: tokio::runtime::Runtime,
}

impl GladeDatabase {
    fn open(settings: Settings) -> Result<Self> {
        Ok(Self {
            manager: DatabaseManager::new(&settings)?,
            runtime: tokio::runtime::Runtime::new()?,
        })
    }
}

fn into_handle(result: Result<GladeDatabase>) -> *mut GladeDatabase {
    match result {
        Ok(db) => Box::into_raw(Box::new(db)),
        Err(e) => {
            error!("Failed to open glade database manager: {}", e);
            std::ptr::null_mut()
        }
    }
}

/// # Safety
/// `ptr` must be null or a valid NUL-terminated string.
unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Open a manager rooted at `$GLADE_HOME` or `~/.glade/databases`.
/// Returns null on failure.
#[no_mangle]
pub extern "C" fn glade_new() -> *mut GladeDatabase {
    into_handle(Settings::from_env().and_then(GladeDatabase::open))
}

/// Open a manager rooted at `base_dir`. Returns null on failure.
///
/// # Safety
/// `base_dir` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn glade_new_with_base_dir(base_dir: *const c_char) -> *mut GladeDatabase {
    let Some(base_dir) = c_str(base_dir) else {
        return std::ptr::null_mut();
    };

    into_handle(GladeDatabase::open(Settings::with_base_dir(PathBuf::from(base_dir))))
}

/// Release a handle from `glade_new*`. Null is ignored.
///
/// # Safety
/// `ptr` must be null or a handle not yet freed.
#[no_mangle]
pub unsafe extern "C" fn glade_free(ptr: *mut GladeDatabase) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr));
    }
}

/// Download one database build. Returns 0 on success, -1 on any failure.
///
/// # Safety
/// `ptr` must be a live handle; the strings must be null or valid
/// NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn glade_download_database(
    ptr: *mut GladeDatabase,
    db_name: *const c_char,
    genome_version: *const c_char,
) -> c_int {
    if ptr.is_null() {
        return -1;
    }

    let (Some(db_name), Some(genome_version)) = (c_str(db_name), c_str(genome_version)) else {
        return -1;
    };

    let db = &*ptr;
    match db
        .runtime
        .block_on(db.manager.download_database(db_name, genome_version))
    {
        Ok(_) => 0,
        Err(e) => {
            error!("Download of {}/{} failed: {}", db_name, genome_version, e);
            -1
        }
    }
}
