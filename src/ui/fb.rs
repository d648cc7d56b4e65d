//! Linux framebuffer surface

use anyhow::{anyhow, Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::{Rgb, Surface};
use crate::plugin::ffi::RawSurface;

/// Linux framebuffer fixed screen info
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FbFixScreeninfo {
    id: [u8; 16],
    smem_start: libc::c_ulong,
    smem_len: u32,
    type_: u32,
    type_aux: u32,
    visual: u32,
    xpanstep: u16,
    ypanstep: u16,
    ywrapstep: u16,
    line_length: u32,
    mmio_start: libc::c_ulong,
    mmio_len: u32,
    accel: u32,
    capabilities: u16,
    reserved: [u16; 2],
}

/// Linux framebuffer variable screen info
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FbVarScreeninfo {
    xres: u32,
    yres: u32,
    xres_virtual: u32,
    yres_virtual: u32,
    xoffset: u32,
    yoffset: u32,
    bits_per_pixel: u32,
    grayscale: u32,
    red: FbBitfield,
    green: FbBitfield,
    blue: FbBitfield,
    transp: FbBitfield,
    nonstd: u32,
    activate: u32,
    height: u32,
    width: u32,
    accel_flags: u32,
    pixclock: u32,
    left_margin: u32,
    right_margin: u32,
    upper_margin: u32,
    lower_margin: u32,
    hsync_len: u32,
    vsync_len: u32,
    sync: u32,
    vmode: u32,
    rotate: u32,
    colorspace: u32,
    reserved: [u32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct FbBitfield {
    offset: u32,
    length: u32,
    msb_right: u32,
}

nix::ioctl_read_bad!(fbioget_vscreeninfo, 0x4600, FbVarScreeninfo);
nix::ioctl_read_bad!(fbioget_fscreeninfo, 0x4602, FbFixScreeninfo);

/// Framebuffer surface implementation
pub struct Framebuffer {
    device: PathBuf,
    fb_file: Option<File>,
    width: u32,
    height: u32,
    bits_per_pixel: u32,
    line_length: u32,
    buffer: Vec<u8>,
    fallback_mode: bool,
}

impl Framebuffer {
    /// Create a framebuffer surface for `device`; nothing is opened until `init`
    pub fn new(device: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            device: device.into(),
            fb_file: None,
            width: 0,
            height: 0,
            bits_per_pixel: 0,
            line_length: 0,
            buffer: Vec::new(),
            fallback_mode: false,
        })
    }

    /// Surface backed only by memory, for offscreen rendering and tests
    pub fn in_memory(width: u32, height: u32, bits_per_pixel: u32) -> Self {
        let line_length = width * (bits_per_pixel / 8);
        Self {
            device: PathBuf::new(),
            fb_file: None,
            width,
            height,
            bits_per_pixel,
            line_length,
            buffer: vec![0u8; (line_length * height) as usize],
            fallback_mode: false,
        }
    }

    /// Whether init fell back to console mode
    pub fn is_fallback(&self) -> bool {
        self.fallback_mode
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Read back a pixel, if the format supports it
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        let offset = self.offset(x, y)?;
        let bytes = (self.bits_per_pixel / 8) as usize;
        let px = self.buffer.get(offset..offset + bytes)?;
        match self.bits_per_pixel {
            32 | 24 => Some(Rgb(px[2], px[1], px[0])),
            16 => {
                let rgb565 = u16::from_le_bytes([px[0], px[1]]);
                Some(Rgb(
                    ((rgb565 >> 8) & 0xF8) as u8,
                    ((rgb565 >> 3) & 0xFC) as u8,
                    ((rgb565 << 3) & 0xF8) as u8,
                ))
            }
            _ => None,
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.line_length + x * (self.bits_per_pixel / 8)) as usize)
    }

    /// Try to open and initialize framebuffer
    fn try_init_fb(&mut self) -> Result<()> {
        let fb_file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.device)
            .with_context(|| format!("Failed to open {}", self.device.display()))?;

        let fd = fb_file.as_raw_fd();

        // SAFETY: both structs are plain repr(C) data matching the kernel layout.
        let mut vinfo: FbVarScreeninfo = unsafe { std::mem::zeroed() };
        unsafe { fbioget_vscreeninfo(fd, &mut vinfo) }
            .map_err(|e| anyhow!("FBIOGET_VSCREENINFO ioctl failed: {e}"))?;

        let mut finfo: FbFixScreeninfo = unsafe { std::mem::zeroed() };
        unsafe { fbioget_fscreeninfo(fd, &mut finfo) }
            .map_err(|e| anyhow!("FBIOGET_FSCREENINFO ioctl failed: {e}"))?;

        self.width = vinfo.xres;
        self.height = vinfo.yres;
        self.bits_per_pixel = vinfo.bits_per_pixel;
        self.line_length = finfo.line_length;

        info!(
            "Framebuffer initialized: {}x{} @ {} bpp, line_length={}",
            self.width, self.height, self.bits_per_pixel, self.line_length
        );

        let buffer_size = (self.line_length * self.height) as usize;
        self.buffer = vec![0u8; buffer_size];

        self.fb_file = Some(fb_file);
        Ok(())
    }

    fn enter_fallback(&mut self) {
        self.fallback_mode = true;
        self.fb_file = None;
        self.width = 0;
        self.height = 0;
        self.buffer.clear();
    }
}

impl Surface for Framebuffer {
    fn init(&mut self) -> Result<()> {
        if self.fb_file.is_none() && self.device.as_os_str().is_empty() {
            debug!("In-memory framebuffer, nothing to open");
            return Ok(());
        }

        match self.try_init_fb() {
            Ok(_) => {
                info!("Framebuffer surface initialized successfully");
                self.fallback_mode = false;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to initialize framebuffer: {:#}. Using fallback mode.", e);
                self.enter_fallback();
                // Don't fail - the splash runs without pixels
                Ok(())
            }
        }
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self, color: Rgb) -> Result<()> {
        if self.fallback_mode {
            return Ok(());
        }

        debug!("Clearing screen to {:?}", color);
        self.fill_rect(0, 0, self.width, self.height, color);
        Ok(())
    }

    fn put_pixel(&mut self, x: u32, y: u32, color: Rgb) {
        let Some(offset) = self.offset(x, y) else {
            return;
        };
        let Rgb(r, g, b) = color;
        let bytes = (self.bits_per_pixel / 8) as usize;
        let Some(px) = self.buffer.get_mut(offset..offset + bytes) else {
            return;
        };

        match self.bits_per_pixel {
            32 => {
                // BGRA
                px[0] = b;
                px[1] = g;
                px[2] = r;
                px[3] = 255;
            }
            24 => {
                px[0] = b;
                px[1] = g;
                px[2] = r;
            }
            16 => {
                // RGB565
                let rgb565 = ((r as u16 & 0xF8) << 8)
                    | ((g as u16 & 0xFC) << 3)
                    | ((b as u16 & 0xF8) >> 3);
                px.copy_from_slice(&rgb565.to_le_bytes());
            }
            _ => {}
        }
    }

    fn present(&mut self) -> Result<()> {
        if self.fallback_mode {
            return Ok(());
        }

        if let Some(ref mut fb_file) = self.fb_file {
            fb_file.seek(SeekFrom::Start(0))?;
            fb_file.write_all(&self.buffer)?;
            fb_file.flush()?;
            debug!("Frame presented");
        }

        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.fallback_mode {
            // Reset terminal
            print!("\x1B[2J\x1B[H");
            std::io::stdout().flush()?;
        }

        info!("Framebuffer surface cleaned up");
        Ok(())
    }

    fn raw(&mut self) -> RawSurface {
        if self.fallback_mode || self.buffer.is_empty() {
            return RawSurface::empty();
        }
        RawSurface {
            pixels: self.buffer.as_mut_ptr(),
            len: self.buffer.len(),
            width: self.width,
            height: self.height,
            stride: self.line_length,
            bits_per_pixel: self.bits_per_pixel,
        }
    }
}
