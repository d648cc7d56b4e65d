//! C ABI for label backends shipped as shared objects
//!
//! A module exports `splash_label_plugin_get_interface`, returning a pointer to
//! a static [`RawLabelPluginInterface`]. The table stays valid until the module
//! is released, which the facade guarantees happens after every control built
//! from it has been dropped.

use libc::{c_char, c_long, c_void};
use std::cell::Cell;
use std::ffi::CString;
use std::ptr::{self, NonNull};
use tracing::debug;

use super::{LabelControl, LabelPlugin};
use crate::ui::Window;

pub type RawControl = *mut c_void;

/// Signature of the module's factory entry point
pub type RawGetInterfaceFn = unsafe extern "C" fn() -> *const RawLabelPluginInterface;

/// Pixel buffer handed to shared-object backends in place of a window
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawSurface {
    pub pixels: *mut u8,
    pub len: usize,
    pub width: u32,
    pub height: u32,
    /// Bytes per row
    pub stride: u32,
    pub bits_per_pixel: u32,
}

impl RawSurface {
    pub fn empty() -> Self {
        Self {
            pixels: ptr::null_mut(),
            len: 0,
            width: 0,
            height: 0,
            stride: 0,
            bits_per_pixel: 0,
        }
    }
}

#[repr(C)]
pub struct RawLabelPluginInterface {
    pub create_control: unsafe extern "C" fn() -> RawControl,
    pub destroy_control: Option<unsafe extern "C" fn(RawControl)>,
    pub set_text_for_control: unsafe extern "C" fn(RawControl, *const c_char),
    pub show_control: unsafe extern "C" fn(RawControl, *mut RawSurface, c_long, c_long) -> bool,
    pub draw_control: unsafe extern "C" fn(RawControl),
    pub hide_control: unsafe extern "C" fn(RawControl),
    pub is_control_hidden: unsafe extern "C" fn(RawControl) -> bool,
    pub get_width_of_control: unsafe extern "C" fn(RawControl) -> c_long,
    pub get_height_of_control: unsafe extern "C" fn(RawControl) -> c_long,
}

/// [`LabelPlugin`] over an operation table from a shared object
pub struct DynamicPlugin {
    table: NonNull<RawLabelPluginInterface>,
}

impl DynamicPlugin {
    pub fn new(table: NonNull<RawLabelPluginInterface>) -> Self {
        Self { table }
    }
}

impl LabelPlugin for DynamicPlugin {
    fn name(&self) -> &str {
        "shared-object"
    }

    fn create_control(&self) -> Box<dyn LabelControl> {
        // SAFETY: the table outlives this plugin (see module docs).
        let control = unsafe { (self.table.as_ref().create_control)() };
        debug!("Shared-object backend created control {:p}", control);
        Box::new(DynamicControl {
            table: self.table,
            control,
            surface: Box::new(Cell::new(RawSurface::empty())),
            window: None,
        })
    }
}

struct DynamicControl {
    table: NonNull<RawLabelPluginInterface>,
    control: RawControl,
    // Boxed so the backend may keep the pointer it got at show time; the
    // contents are refreshed before every call into the backend.
    surface: Box<Cell<RawSurface>>,
    window: Option<Window>,
}

impl DynamicControl {
    fn table(&self) -> &RawLabelPluginInterface {
        // SAFETY: the table outlives every control created from it.
        unsafe { self.table.as_ref() }
    }

    /// Re-describe the window so the backend never sees a buffer the
    /// surface has since reallocated or dropped.
    fn refresh_surface(&self) -> *mut RawSurface {
        let raw = match &self.window {
            Some(window) => match window.try_borrow_mut() {
                Ok(mut surface) => surface.raw(),
                Err(_) => {
                    debug!("Window busy, hiding its pixels from the backend");
                    RawSurface::empty()
                }
            },
            None => RawSurface::empty(),
        };
        self.surface.set(raw);
        self.surface.as_ptr()
    }
}

/// C strings cannot hold NUL, so the caption ends at the first one.
fn to_c_text(text: &str) -> CString {
    let visible = text.split('\0').next().unwrap_or_default();
    CString::new(visible).unwrap_or_default()
}

impl LabelControl for DynamicControl {
    fn set_text(&mut self, text: &str) {
        let text = to_c_text(text);
        self.refresh_surface();
        unsafe { (self.table().set_text_for_control)(self.control, text.as_ptr()) }
    }

    fn show(&mut self, window: &Window, x: i64, y: i64) -> bool {
        self.window = Some(window.clone());
        let surface = self.refresh_surface();
        unsafe {
            (self.table().show_control)(self.control, surface, x as c_long, y as c_long)
        }
    }

    fn draw(&mut self) {
        self.refresh_surface();
        unsafe { (self.table().draw_control)(self.control) }
    }

    fn hide(&mut self) {
        self.refresh_surface();
        unsafe { (self.table().hide_control)(self.control) }
    }

    fn is_hidden(&self) -> bool {
        self.refresh_surface();
        unsafe { (self.table().is_control_hidden)(self.control) }
    }

    fn width(&self) -> i64 {
        self.refresh_surface();
        unsafe { (self.table().get_width_of_control)(self.control) as i64 }
    }

    fn height(&self) -> i64 {
        self.refresh_surface();
        unsafe { (self.table().get_height_of_control)(self.control) as i64 }
    }
}

impl Drop for DynamicControl {
    fn drop(&mut self) {
        if let Some(destroy) = self.table().destroy_control {
            unsafe { destroy(self.control) }
        }
    }
}
