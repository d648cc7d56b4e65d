//! Drawing surfaces
//!
//! Provides the window abstraction that label backends draw into

pub mod fb;

use anyhow::Result;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use crate::plugin::ffi::RawSurface;

/// 24-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const SPLASH_BLUE: Rgb = Rgb(0, 0, 64);
}

/// Trait for drawing surfaces
pub trait Surface {
    /// Initialize the surface
    fn init(&mut self) -> Result<()>;

    /// Visible width in pixels, 0 when nothing can be drawn
    fn width(&self) -> u32;

    /// Visible height in pixels, 0 when nothing can be drawn
    fn height(&self) -> u32;

    /// Clear the whole surface to a solid color
    fn clear(&mut self, color: Rgb) -> Result<()>;

    /// Set a single pixel; out-of-range coordinates are ignored
    fn put_pixel(&mut self, x: u32, y: u32, color: Rgb);

    /// Fill a rectangle, clipped to the surface
    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgb) {
        let x_end = x.saturating_add(width).min(self.width());
        let y_end = y.saturating_add(height).min(self.height());
        for py in y..y_end {
            for px in x..x_end {
                self.put_pixel(px, py, color);
            }
        }
    }

    /// Flush/present the frame
    fn present(&mut self) -> Result<()>;

    /// Cleanup and restore terminal state
    fn cleanup(&mut self) -> Result<()>;

    /// Describe the pixel buffer for backends behind the C ABI
    fn raw(&mut self) -> RawSurface {
        RawSurface::empty()
    }
}

/// Shared handle to the surface a label is shown on.
pub type Window = Rc<RefCell<dyn Surface>>;

/// Wrap a concrete surface into a [`Window`].
pub fn window<S: Surface + 'static>(surface: S) -> Window {
    Rc::new(RefCell::new(surface))
}

/// Create the surface for the splash
pub fn create_surface(device: &Path) -> Result<Window> {
    // Only the framebuffer exists today; DRM would slot in here first.
    fb::Framebuffer::new(device).map(window)
}
