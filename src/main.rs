//! Splash Label demo
//!
//! Boot splash that shows a progress caption through a plugin-backed label.
//! Without a backend the captions go to the console instead.

use anyhow::{Context, Result};
use std::process;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use splash_label::kmsg;
use splash_label::loader;
use splash_label::ui::fb::Framebuffer;
use splash_label::ui::{self, Rgb, Window};
use splash_label::{Label, LabelError, SplashConfig};

const STEPS: [&str; 4] = [
    "Loading...",
    "Mounting filesystems...",
    "Starting services...",
    "Ready",
];
const STEP_DELAY: Duration = Duration::from_millis(500);

/// Main entry point
fn main() {
    let config = SplashConfig::from_env();
    init_logging(&config);

    info!("Splash starting...");
    debug!("Configuration: {:?}", config);

    match run(&config) {
        Ok(()) => {
            info!("Splash exiting cleanly");
            process::exit(0);
        }
        Err(e) => {
            error!("Fatal error: {:#}", e);
            eprintln!("\nFATAL ERROR: {:#}", e);
            process::exit(1);
        }
    }
}

fn init_logging(config: &SplashConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    if config.log_to_kmsg {
        match kmsg::open_log_sink(&kmsg::default_sinks()) {
            Ok((path, file)) => {
                builder
                    .with_ansi(false)
                    .without_time()
                    .with_writer(Mutex::new(file))
                    .init();
                info!("Logging to {}", path.display());
                return;
            }
            Err(e) => eprintln!("No kernel log sink available ({e}), logging to stderr"),
        }
    }

    builder.with_writer(std::io::stderr).init();
}

/// Main splash logic
fn run(config: &SplashConfig) -> Result<()> {
    info!("Initializing surface...");
    let window = ui::create_surface(&config.fb_device).context("Failed to create surface")?;
    window.borrow_mut().init().context("Failed to initialize surface")?;
    window.borrow_mut().clear(Rgb::SPLASH_BLUE)?;

    info!("Using {} module loader", config.loader);
    let mut label = Label::with_loader(config.label.clone(), loader::create_loader(config.loader));

    let mut visible = false;
    for (i, step) in STEPS.iter().enumerate() {
        label.set_text(step);

        // Re-centering also binds the backend on the first pass.
        if i == 0 || visible {
            visible = match show_centered(&mut label, &window) {
                Ok(shown) => shown,
                Err(e) => {
                    warn!("Continuing without label: {}", e);
                    false
                }
            };
        }

        if visible {
            label.draw();
        } else {
            println!("{step}");
        }
        window.borrow_mut().present().context("Failed to present frame")?;

        thread::sleep(STEP_DELAY);
    }

    info!("Cleaning up...");
    label.hide();
    window.borrow_mut().present().context("Failed to present frame")?;
    label.destroy();
    window.borrow_mut().cleanup().context("Failed to cleanup surface")?;

    Ok(())
}

/// Show the label in the middle of the window
fn show_centered(label: &mut Label, window: &Window) -> Result<bool, LabelError> {
    let (width, height) = {
        let surface = window.borrow();
        (surface.width(), surface.height())
    };

    // The size is only known once a backend is bound, so the binding show
    // goes to an offscreen copy of the window.
    if !label.is_bound() {
        let scratch = ui::window(Framebuffer::in_memory(width, height, 32));
        if !label.show(&scratch, 0, 0)? {
            return Ok(false);
        }
        label.hide();
    }

    let x = ((i64::from(width) - label.width()) / 2).max(0);
    let y = ((i64::from(height) - label.height()) / 2).max(0);
    label.show(window, x, y)
}
