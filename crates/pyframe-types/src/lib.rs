//! Plain data describing a captured interpreter call stack.
//!
//! These types carry no capture logic so dumps can be built and inspected
//! without linking an interpreter.

use facet::Facet;

/// One level of the interpreted call stack.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct FrameDescriptor {
    /// Source file of the code object. Empty when the name could not be decoded.
    pub file_name: String,
    /// Function or method name. Empty when the name could not be decoded.
    pub func_name: String,
    /// Line on which the function is declared.
    pub func_first_line: u32,
    /// Line currently executing in this frame.
    pub line: u32,
}

impl FrameDescriptor {
    pub fn new(
        file_name: impl Into<String>,
        func_name: impl Into<String>,
        func_first_line: u32,
        line: u32,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            func_name: func_name.into(),
            func_first_line,
            line,
        }
    }
}

/// Every active frame at one instant, innermost first.
#[derive(Facet, Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    frames: Vec<FrameDescriptor>,
}

impl Snapshot {
    pub const fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn from_frames(frames: Vec<FrameDescriptor>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[FrameDescriptor] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Innermost frame, if any.
    pub fn top(&self) -> Option<&FrameDescriptor> {
        self.frames.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrameDescriptor> {
        self.frames.iter()
    }

    pub fn push(&mut self, frame: FrameDescriptor) {
        self.frames.push(frame);
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn into_frames(self) -> Vec<FrameDescriptor> {
        self.frames
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a FrameDescriptor;
    type IntoIter = std::slice::Iter<'a, FrameDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

/// Whether a request walks the live stack or reads the thread's last capture.
#[derive(Facet, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Take the interpreter lock and walk the current frame chain.
    #[default]
    Fresh,
    /// Return the calling thread's previous capture untouched.
    Cached,
}
