//! A minimal in-process interpreter that keeps a real frame chain.
//!
//! Used by tests and the demo binary to exercise the walker without linking
//! an interpreter runtime. Like the real thing it has a single process-wide
//! lock guarding every thread's call stack, and each thread sees only its own
//! frames.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::ReentrantMutex;

use crate::interp::{FrameView, FrameVisitor, Interpreter, NameObject};

/// Storage for a file or function name, in whichever representation the
/// code object was built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameValue {
    Bytes(Vec<u8>),
    /// UTF-8 buffer. Not validated, so tests can hand the decoder garbage.
    Utf8(Vec<u8>),
    Unencodable,
}

impl NameValue {
    pub fn text(s: &str) -> Self {
        Self::Utf8(s.as_bytes().to_vec())
    }

    fn as_object(&self) -> NameObject<'_> {
        match self {
            Self::Bytes(b) => NameObject::Bytes(b),
            Self::Utf8(b) => NameObject::Utf8(b),
            Self::Unencodable => NameObject::Unencodable,
        }
    }
}

/// Static description of a function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeObject {
    pub filename: NameValue,
    pub name: NameValue,
    pub first_line: u32,
}

impl CodeObject {
    pub fn new(filename: &str, name: &str, first_line: u32) -> Self {
        Self {
            filename: NameValue::text(filename),
            name: NameValue::text(name),
            first_line,
        }
    }
}

#[derive(Debug)]
struct SimFrame {
    code: Arc<CodeObject>,
    line: u32,
}

type CallStacks = HashMap<ThreadId, Vec<SimFrame>>;

/// Reference interpreter. Share it across threads behind an `Arc`.
#[derive(Debug, Default)]
pub struct SimInterpreter {
    // Reentrant so a visitor may re-enter the interpreter for reads.
    stacks: ReentrantMutex<RefCell<CallStacks>>,
}

impl SimInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame for `code` at `line`, run `body`, pop the frame.
    ///
    /// The frame is popped even if `body` unwinds.
    pub fn call<R>(&self, code: Arc<CodeObject>, line: u32, body: impl FnOnce() -> R) -> R {
        self.with_stack(|stack| stack.push(SimFrame { code, line }));
        let _pop = PopOnDrop { interp: self };
        body()
    }

    /// Move the calling thread's innermost frame to `line`. No-op when no
    /// frame is active.
    pub fn set_line(&self, line: u32) {
        self.with_stack(|stack| {
            if let Some(top) = stack.last_mut() {
                top.line = line;
            }
        });
    }

    /// Number of frames active on the calling thread.
    pub fn depth(&self) -> usize {
        let guard = self.stacks.lock();
        let stacks = guard.borrow();
        stacks.get(&thread::current().id()).map_or(0, Vec::len)
    }

    fn with_stack<R>(&self, f: impl FnOnce(&mut Vec<SimFrame>) -> R) -> R {
        let guard = self.stacks.lock();
        let mut stacks = guard.borrow_mut();
        let id = thread::current().id();
        let stack = stacks.entry(id).or_default();
        let out = f(stack);
        if stack.is_empty() {
            stacks.remove(&id);
        }
        out
    }
}

impl Interpreter for SimInterpreter {
    fn visit_current_frame<V: FrameVisitor>(&self, visitor: &mut V) {
        let guard = self.stacks.lock();
        let stacks = guard.borrow();
        let innermost = stacks
            .get(&thread::current().id())
            .and_then(|stack| SimFrameView::at(stack, stack.len().checked_sub(1)?));
        visitor.visit(innermost);
    }
}

struct PopOnDrop<'a> {
    interp: &'a SimInterpreter,
}

impl Drop for PopOnDrop<'_> {
    fn drop(&mut self) {
        self.interp.with_stack(|stack| {
            stack.pop();
        });
    }
}

struct SimFrameView<'a> {
    stack: &'a [SimFrame],
    index: usize,
}

impl<'a> SimFrameView<'a> {
    fn at(stack: &'a [SimFrame], index: usize) -> Option<Self> {
        (index < stack.len()).then_some(Self { stack, index })
    }

    fn frame(&self) -> &'a SimFrame {
        &self.stack[self.index]
    }
}

impl FrameView for SimFrameView<'_> {
    fn line(&self) -> u32 {
        self.frame().line
    }

    fn first_line(&self) -> u32 {
        self.frame().code.first_line
    }

    fn file_name(&self) -> NameObject<'_> {
        self.frame().code.filename.as_object()
    }

    fn func_name(&self) -> NameObject<'_> {
        self.frame().code.name.as_object()
    }

    fn back(&self) -> Option<Self> {
        Self::at(self.stack, self.index.checked_sub(1)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn frames_pop_after_call() {
        let interp = SimInterpreter::new();
        let code = Arc::new(CodeObject::new("a.py", "f", 1));
        interp.call(code, 2, || assert_eq!(interp.depth(), 1));
        assert_eq!(interp.depth(), 0);
    }

    #[test]
    fn frames_pop_on_unwind() {
        let interp = SimInterpreter::new();
        let code = Arc::new(CodeObject::new("a.py", "f", 1));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: () = interp.call(code, 2, || panic!("boom"));
        }));
        assert!(result.is_err());
        assert_eq!(interp.depth(), 0);
    }

    #[test]
    fn set_line_moves_innermost_frame() {
        struct TopLine(Option<u32>);
        impl FrameVisitor for TopLine {
            fn visit<F: FrameView>(&mut self, innermost: Option<F>) {
                self.0 = innermost.map(|f| f.line());
            }
        }

        let interp = SimInterpreter::new();
        let code = Arc::new(CodeObject::new("a.py", "f", 1));
        let line = interp.call(code, 2, || {
            interp.set_line(9);
            let mut top = TopLine(None);
            interp.visit_current_frame(&mut top);
            top.0
        });
        assert_eq!(line, Some(9));
    }

    #[test]
    fn other_threads_wait_for_the_walk() {
        struct HoldLock {
            interp: Arc<SimInterpreter>,
            worker: Option<thread::JoinHandle<()>>,
            done: Option<mpsc::Receiver<()>>,
            finished_during_visit: bool,
        }

        impl FrameVisitor for HoldLock {
            fn visit<F: FrameView>(&mut self, _innermost: Option<F>) {
                let (tx, rx) = mpsc::channel();
                let interp = Arc::clone(&self.interp);
                self.worker = Some(thread::spawn(move || {
                    interp.call(Arc::new(CodeObject::new("w.py", "w", 1)), 1, || ());
                    let _ = tx.send(());
                }));
                self.finished_during_visit = rx.recv_timeout(Duration::from_millis(100)).is_ok();
                self.done = Some(rx);
            }
        }

        let interp = Arc::new(SimInterpreter::new());
        let mut visitor = HoldLock {
            interp: Arc::clone(&interp),
            worker: None,
            done: None,
            finished_during_visit: false,
        };
        interp.visit_current_frame(&mut visitor);

        assert!(!visitor.finished_during_visit);
        visitor.done.unwrap().recv().unwrap();
        visitor.worker.unwrap().join().unwrap();
        assert_eq!(interp.depth(), 0);
    }
}
