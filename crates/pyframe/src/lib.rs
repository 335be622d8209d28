//! pyframe - where is the interpreter right now?
//!
//! Captures the calling thread's interpreter call stack and renders it as
//! text for logs and diagnostics:
//! - [`render_diagnostic()`] - one line per frame, optionally echoed to stdout
//! - [`render_summary()`] - one string per frame, truncated to `keep`
//!
//! Both take a fresh capture, which also refreshes the thread's cache
//! (see [`capture::cached`]).

mod config;
mod render;

pub use pyframe_capture as capture;
pub use pyframe_types::{self as types, CaptureMode, FrameDescriptor, Snapshot};

pub use config::{Config, ConfigError, LOG_ENV, MAX_FRAMES_ENV, init};
pub use render::{
    DEFAULT_KEEP, DEFAULT_VERBOSE, format_diagnostic, format_summary, render_diagnostic,
    render_summary,
};

/// Install a `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `default_filter`. Does nothing if a global
/// subscriber is already set.
pub fn init_logging(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
