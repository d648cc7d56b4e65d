//! Shared-object loader on top of the platform dynamic linker

use libc::c_void;
use std::ffi::{CStr, CString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{Module, ModuleLoader};
use crate::error::LoaderError;
use crate::plugin::ffi::RawGetInterfaceFn;
use crate::plugin::Symbol;

/// Loads backends with `dlopen`
#[derive(Debug, Default, Clone, Copy)]
pub struct DlLoader;

impl DlLoader {
    pub fn new() -> Self {
        Self
    }
}

/// Fetch and clear the dynamic linker's last error
fn last_dl_error() -> String {
    // SAFETY: dlerror returns NULL or a NUL-terminated string owned by libc.
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        return "unknown dynamic linker error".to_string();
    }
    unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
}

impl ModuleLoader for DlLoader {
    fn resolve(&self, path: &Path) -> Result<Box<dyn Module>, LoaderError> {
        if !path.exists() {
            return Err(LoaderError::NotFound(path.to_path_buf()));
        }

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| LoaderError::InvalidPath(path.to_path_buf()))?;

        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        if handle.is_null() {
            return Err(LoaderError::Open {
                path: path.to_path_buf(),
                message: last_dl_error(),
            });
        }

        info!("Loaded module {}", path.display());
        Ok(Box::new(DlModule {
            path: path.to_path_buf(),
            handle,
        }))
    }
}

struct DlModule {
    path: PathBuf,
    handle: *mut c_void,
}

impl Module for DlModule {
    fn path(&self) -> &Path {
        &self.path
    }

    fn look_up(&self, symbol: &str) -> Option<Symbol> {
        let name = CString::new(symbol).ok()?;
        let ptr = unsafe { libc::dlsym(self.handle, name.as_ptr()) };
        if ptr.is_null() {
            debug!("{} not exported by {}: {}", symbol, self.path.display(), last_dl_error());
            return None;
        }

        // SAFETY: factory symbols are exported with the RawGetInterfaceFn signature.
        let factory = unsafe { std::mem::transmute::<*mut c_void, RawGetInterfaceFn>(ptr) };
        Some(Symbol::Raw(factory))
    }
}

impl Drop for DlModule {
    fn drop(&mut self) {
        debug!("Releasing module {}", self.path.display());
        if unsafe { libc::dlclose(self.handle) } != 0 {
            debug!("dlclose failed for {}: {}", self.path.display(), last_dl_error());
        }
    }
}
