//! Text renderings of a captured stack.
//!
//! Both entry points take a fresh capture; there is no way to render stale
//! frames through them.

use std::fmt::Write as _;
use std::io::Write as _;

use pyframe_capture::{CaptureMode, FrameCapture, Interpreter, Snapshot};
use tracing::warn;

use crate::config;

pub const DEFAULT_VERBOSE: i32 = 1;
/// Negative: keep every frame.
pub const DEFAULT_KEEP: i64 = -1;

/// Capture the stack and render one line per frame:
/// `f-<i> <file>:<line>  def <func>() <file>:<first_line>`.
///
/// When `verbose` is non-zero the text is also written to stdout and flushed.
pub fn render_diagnostic<I: Interpreter>(interp: &I, verbose: i32) -> String {
    let text = FrameCapture::with_options(interp, config::capture_options())
        .with_frames(CaptureMode::Fresh, format_diagnostic);
    if verbose != 0 {
        echo(&text);
    }
    text
}

/// Capture the stack and render at most `keep` frames (all of them when
/// `keep` is negative) as `f-<i> <file>:<line>  def <func>()`.
pub fn render_summary<I: Interpreter>(interp: &I, keep: i64) -> Vec<String> {
    FrameCapture::with_options(interp, config::capture_options())
        .with_frames(CaptureMode::Fresh, |frames| format_summary(frames, keep))
}

pub fn format_diagnostic(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for (i, frame) in snapshot.iter().enumerate() {
        let _ = writeln!(
            out,
            "f-{i} {file}:{line}  def {func}() {file}:{first}",
            file = frame.file_name,
            line = frame.line,
            func = frame.func_name,
            first = frame.func_first_line,
        );
    }
    out
}

pub fn format_summary(snapshot: &Snapshot, keep: i64) -> Vec<String> {
    let limit = usize::try_from(keep).unwrap_or(usize::MAX);
    snapshot
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, frame)| {
            format!(
                "f-{i} {}:{}  def {}()",
                frame.file_name, frame.line, frame.func_name
            )
        })
        .collect()
}

fn echo(text: &str) {
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
    {
        warn!(error = %e, "failed to echo frames to stdout");
    }
}
