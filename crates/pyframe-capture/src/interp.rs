//! The seam between the walker and an embedded interpreter.
//!
//! A backend provides three things: scoped access to the current thread's
//! innermost frame under the interpreter lock, per-frame fields with a parent
//! link, and a classification of name objects so the decoder knows which
//! representation it is looking at.

/// How the interpreter stores a file or function name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameObject<'a> {
    /// Raw byte string. Copied with its explicit length.
    Bytes(&'a [u8]),
    /// Text exposed as its UTF-8 encoding.
    Utf8(&'a [u8]),
    /// Text the interpreter failed to encode.
    Unencodable,
    /// Some other object, identified by its type name.
    Other(&'static str),
}

/// Read access to one frame of the live call chain.
///
/// Views are only handed out while the interpreter lock is held, so a view
/// never outlives the visit it was created for.
pub trait FrameView: Sized {
    /// Line currently executing.
    fn line(&self) -> u32;

    /// First line of the frame's code object.
    fn first_line(&self) -> u32;

    fn file_name(&self) -> NameObject<'_>;

    fn func_name(&self) -> NameObject<'_>;

    /// The calling frame, or `None` at the top of the stack.
    fn back(&self) -> Option<Self>;
}

/// Receives the innermost frame while the interpreter lock is held.
pub trait FrameVisitor {
    fn visit<F: FrameView>(&mut self, innermost: Option<F>);
}

/// An embedded interpreter whose call stack can be walked.
pub trait Interpreter {
    /// Acquire the interpreter lock, pass the calling thread's innermost frame
    /// (or `None` when nothing is executing) to `visitor`, then release the
    /// lock. The lock must be released on every exit path, unwinding included.
    ///
    /// Blocks until the lock is available.
    fn visit_current_frame<V: FrameVisitor>(&self, visitor: &mut V);
}

impl<I: Interpreter + ?Sized> Interpreter for &I {
    fn visit_current_frame<V: FrameVisitor>(&self, visitor: &mut V) {
        (**self).visit_current_frame(visitor);
    }
}
