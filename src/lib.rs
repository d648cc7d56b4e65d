//! Splash Label
//!
//! A single-line text label for boot splash screens. The label does not draw
//! anything itself: on first `show` it discovers a backend module, binds to it
//! and forwards every operation. Without a backend it stays silently hidden.

pub mod config;
pub mod error;
pub mod kmsg;
pub mod label;
pub mod loader;
pub mod plugin;
pub mod ui;

pub use config::{LabelConfig, LoaderKind, SplashConfig};
pub use error::{BindError, LabelError, LoaderError};
pub use label::Label;
