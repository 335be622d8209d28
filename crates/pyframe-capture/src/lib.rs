//! Interpreter call-stack capture with a per-thread cache.
//!
//! [`FrameCapture`] walks the calling thread's interpreter frames under the
//! interpreter lock and stores the result in thread-local storage. A fresh
//! capture replaces the previous one wholesale; a cached read returns it
//! without touching the interpreter.
//!
//! Backends plug in through [`Interpreter`]. [`sim::SimInterpreter`] is a
//! self-contained backend for tests and demos.

mod capture;
mod decode;
mod error;
mod interp;
pub mod sim;

pub use capture::{CaptureOptions, FrameCapture, cached};
pub use decode::{decode, decode_or_empty};
pub use error::DecodeError;
pub use interp::{FrameView, FrameVisitor, Interpreter, NameObject};
pub use pyframe_types::{CaptureMode, FrameDescriptor, Snapshot};
