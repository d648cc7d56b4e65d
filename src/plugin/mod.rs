//! Label backend interface
//!
//! A backend is discovered at bind time and hands out one control per label.
//! Everything the facade does after binding goes through these two traits.

pub mod ffi;
pub mod text;

use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::ui::Window;

/// Operation table exported by a label backend
pub trait LabelPlugin {
    /// Identify the backend in logs
    fn name(&self) -> &str;

    /// Create a new on-screen widget instance
    fn create_control(&self) -> Box<dyn LabelControl>;
}

/// Per-label widget instance created by a [`LabelPlugin`].
///
/// Dropping the control releases it in the backend.
pub trait LabelControl {
    fn set_text(&mut self, text: &str);

    /// Show on `window` at (`x`, `y`); the result is backend-defined
    fn show(&mut self, window: &Window, x: i64, y: i64) -> bool;

    fn draw(&mut self);

    fn hide(&mut self);

    fn is_hidden(&self) -> bool;

    fn width(&self) -> i64;

    fn height(&self) -> i64;
}

/// Factory for backends linked into the binary.
pub type NativeFactory = Rc<dyn Fn() -> Option<Box<dyn LabelPlugin>>>;

/// Entry point found by a symbol lookup
#[derive(Clone)]
pub enum Symbol {
    /// Rust factory registered at compile time
    Native(NativeFactory),
    /// C ABI factory exported by a shared object
    Raw(ffi::RawGetInterfaceFn),
}

impl Symbol {
    /// Call the factory. `None` means the backend handed back no interface.
    pub fn instantiate(&self) -> Option<Box<dyn LabelPlugin>> {
        match self {
            Symbol::Native(factory) => factory(),
            Symbol::Raw(get_interface) => {
                // SAFETY: the symbol was looked up under the factory's well-known
                // name, so it has the RawGetInterfaceFn signature.
                let table = unsafe { get_interface() };
                NonNull::new(table.cast_mut())
                    .map(|table| Box::new(ffi::DynamicPlugin::new(table)) as Box<dyn LabelPlugin>)
            }
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Native(_) => write!(f, "Symbol::Native"),
            Symbol::Raw(ptr) => write!(f, "Symbol::Raw({:p})", *ptr as *const ()),
        }
    }
}
