use std::cell::RefCell;
use std::num::NonZeroUsize;

use pyframe_types::{CaptureMode, FrameDescriptor, Snapshot};
use tracing::debug;

use crate::decode::decode_or_empty;
use crate::interp::{FrameView, FrameVisitor, Interpreter};

thread_local! {
    // Last capture taken on this thread. Only ever touched by its own thread,
    // so cached reads need neither the interpreter lock nor a mutex.
    static FRAMES: RefCell<Snapshot> = const { RefCell::new(Snapshot::new()) };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Stop walking after this many frames. `None` walks to the top.
    pub max_frames: Option<NonZeroUsize>,
}

/// Captures an interpreter's call stack into the calling thread's cache.
#[derive(Debug, Clone)]
pub struct FrameCapture<I> {
    interp: I,
    options: CaptureOptions,
}

impl<I: Interpreter> FrameCapture<I> {
    pub fn new(interp: I) -> Self {
        Self::with_options(interp, CaptureOptions::default())
    }

    pub fn with_options(interp: I, options: CaptureOptions) -> Self {
        Self { interp, options }
    }

    pub fn interpreter(&self) -> &I {
        &self.interp
    }

    pub fn options(&self) -> CaptureOptions {
        self.options
    }

    /// Run `f` over this thread's snapshot, refreshing it first in
    /// [`CaptureMode::Fresh`].
    ///
    /// A fresh capture requested from inside `f` is still walked and handed
    /// to its own callback, but it cannot replace the snapshot `f` is reading,
    /// so the cache keeps the outer capture.
    pub fn with_frames<R>(&self, mode: CaptureMode, f: impl FnOnce(&Snapshot) -> R) -> R {
        if mode == CaptureMode::Fresh
            && let Err(fresh) = store(self.walk())
        {
            return f(&fresh);
        }
        FRAMES.with(|frames| f(&frames.borrow()))
    }

    /// Clone of this thread's snapshot after handling `mode`.
    pub fn frames(&self, mode: CaptureMode) -> Snapshot {
        self.with_frames(mode, Snapshot::clone)
    }

    /// Take a fresh capture, copy it into `out` and report whether any frame
    /// was active.
    pub fn capture_into(&self, out: &mut Snapshot) -> bool {
        self.with_frames(CaptureMode::Fresh, |frames| out.clone_from(frames));
        !out.is_empty()
    }

    // The cache is not borrowed during the walk: name reads can run guest
    // code, and guest code may ask for the stack again.
    fn walk(&self) -> Snapshot {
        let mut walker = Walker {
            out: Snapshot::new(),
            max_frames: self.options.max_frames,
            truncated: false,
        };
        self.interp.visit_current_frame(&mut walker);
        if walker.truncated {
            debug!(
                depth = walker.out.len(),
                "frame walk truncated at max_frames"
            );
        } else {
            debug!(depth = walker.out.len(), "captured interpreter frames");
        }
        walker.out
    }
}

/// Replace this thread's snapshot. Hands `snapshot` back if the cache is
/// borrowed further up the stack.
fn store(snapshot: Snapshot) -> Result<(), Snapshot> {
    FRAMES.with(|frames| match frames.try_borrow_mut() {
        Ok(mut cached) => {
            *cached = snapshot;
            Ok(())
        }
        Err(_) => {
            debug!("snapshot cache busy; nested capture not cached");
            Err(snapshot)
        }
    })
}

/// This thread's last capture, without touching the interpreter.
pub fn cached() -> Snapshot {
    FRAMES.with(|frames| frames.borrow().clone())
}

struct Walker {
    out: Snapshot,
    max_frames: Option<NonZeroUsize>,
    truncated: bool,
}

impl FrameVisitor for Walker {
    fn visit<F: FrameView>(&mut self, innermost: Option<F>) {
        self.out.clear();

        let mut cursor = innermost;
        while let Some(frame) = cursor {
            if let Some(max) = self.max_frames
                && self.out.len() >= max.get()
            {
                self.truncated = true;
                break;
            }

            self.out.push(FrameDescriptor {
                file_name: decode_or_empty(frame.file_name()),
                func_name: decode_or_empty(frame.func_name()),
                func_first_line: frame.first_line(),
                line: frame.line(),
            });
            cursor = frame.back();
        }
    }
}
