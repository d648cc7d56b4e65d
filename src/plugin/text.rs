//! Built-in label backend drawing with an 8x8 bitmap font

use std::rc::Rc;
use tracing::debug;

use super::{LabelControl, LabelPlugin, NativeFactory};
use crate::ui::{Rgb, Surface, Window};

/// Simple 8x8 bitmap font for basic text rendering
const FONT_8X8: [[u8; 8]; 128] = include!("font_8x8.rs");

pub const GLYPH_WIDTH: u32 = 8;
pub const GLYPH_HEIGHT: u32 = 8;

/// Label backend that needs nothing but a pixel surface
#[derive(Debug, Default)]
pub struct BitmapTextPlugin;

impl BitmapTextPlugin {
    pub fn new() -> Self {
        Self
    }

    /// Factory for registering this backend with a builtin loader
    pub fn factory() -> NativeFactory {
        Rc::new(|| Some(Box::new(BitmapTextPlugin::new()) as Box<dyn LabelPlugin>))
    }
}

impl LabelPlugin for BitmapTextPlugin {
    fn name(&self) -> &str {
        "bitmap-text"
    }

    fn create_control(&self) -> Box<dyn LabelControl> {
        Box::new(BitmapTextControl::new())
    }
}

/// One label drawn by [`BitmapTextPlugin`]
pub struct BitmapTextControl {
    text: String,
    window: Option<Window>,
    x: u32,
    y: u32,
    hidden: bool,
    foreground: Rgb,
    background: Rgb,
}

impl BitmapTextControl {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            window: None,
            x: 0,
            y: 0,
            hidden: true,
            foreground: Rgb::WHITE,
            background: Rgb::SPLASH_BLUE,
        }
    }

    fn box_size(&self) -> (u32, u32) {
        let chars = self.text.chars().count() as u32;
        if chars == 0 {
            (0, 0)
        } else {
            (chars.saturating_mul(GLYPH_WIDTH), GLYPH_HEIGHT)
        }
    }

    /// Paint the background over the area the label currently occupies
    fn erase(&mut self) {
        if self.hidden {
            return;
        }
        let Some(window) = &self.window else {
            return;
        };
        let (width, height) = self.box_size();
        window
            .borrow_mut()
            .fill_rect(self.x, self.y, width, height, self.background);
    }
}

impl Default for BitmapTextControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw a character at position (x, y)
fn draw_char(surface: &mut dyn Surface, c: char, x: u32, y: u32, color: Rgb) {
    let idx = c as usize;
    if idx >= FONT_8X8.len() {
        return;
    }

    let glyph = FONT_8X8[idx];
    for (row, &byte) in glyph.iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if byte & (1 << col) != 0 {
                surface.put_pixel(x + col, y + row as u32, color);
            }
        }
    }
}

/// Draw a string at position (x, y)
fn draw_string(surface: &mut dyn Surface, s: &str, x: u32, y: u32, color: Rgb) {
    for (i, c) in s.chars().enumerate() {
        let gx = x.saturating_add(i as u32 * GLYPH_WIDTH);
        draw_char(surface, c, gx, y, color);
    }
}

impl LabelControl for BitmapTextControl {
    fn set_text(&mut self, text: &str) {
        // The old caption may be wider than the new one.
        self.erase();
        self.text = text.to_string();
    }

    fn show(&mut self, window: &Window, x: i64, y: i64) -> bool {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            debug!("Refusing to show label at negative position ({}, {})", x, y);
            return false;
        };

        let (width, height) = {
            let surface = window.borrow();
            (surface.width(), surface.height())
        };
        if x >= width || y >= height {
            debug!("Label position ({}, {}) outside {}x{} window", x, y, width, height);
            return false;
        }

        self.erase();
        self.window = Some(window.clone());
        self.x = x;
        self.y = y;
        self.hidden = false;
        self.draw();
        true
    }

    fn draw(&mut self) {
        if self.hidden {
            return;
        }
        let Some(window) = &self.window else {
            return;
        };

        let (width, height) = self.box_size();
        let mut surface = window.borrow_mut();
        surface.fill_rect(self.x, self.y, width, height, self.background);
        draw_string(&mut *surface, &self.text, self.x, self.y, self.foreground);
    }

    fn hide(&mut self) {
        self.erase();
        self.hidden = true;
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn width(&self) -> i64 {
        self.box_size().0 as i64
    }

    fn height(&self) -> i64 {
        self.box_size().1 as i64
    }
}
