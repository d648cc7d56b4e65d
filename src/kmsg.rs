//! Early-boot log sinks
//!
//! Before a console is usable the kernel ring buffer or a serial line is the
//! only place diagnostics can go without drawing over the splash.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

pub const KMSG_DEVICE: &str = "/dev/kmsg";

/// Hyper-V and most VMs expose ttyS0; ARM boards ttyAMA0; Xen/KVM consoles hvc0.
pub const SERIAL_DEVICES: [&str; 3] = ["/dev/ttyS0", "/dev/ttyAMA0", "/dev/hvc0"];

/// Candidate sinks in order of preference
pub fn default_sinks() -> Vec<PathBuf> {
    std::iter::once(KMSG_DEVICE)
        .chain(SERIAL_DEVICES)
        .map(PathBuf::from)
        .collect()
}

/// Open the first writable sink among `candidates`
pub fn open_log_sink(candidates: &[PathBuf]) -> io::Result<(PathBuf, File)> {
    let mut last_err: Option<io::Error> = None;
    for dev in candidates {
        match OpenOptions::new().append(true).open(dev) {
            Ok(f) => return Ok((dev.clone(), f)),
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no log sink device found")))
}

/// Whether `path` is the kernel ring buffer
pub fn is_kmsg(path: &Path) -> bool {
    path == Path::new(KMSG_DEVICE)
}
