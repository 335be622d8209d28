//! CPython backend and the `_pyframe` extension module.
//!
//! ```python
//! import _pyframe
//! _pyframe.print_pyframes()        # echo + return the diagnostic text
//! _pyframe.get_pyframes(keep=5)    # innermost five frames as strings
//! ```

use pyframe::capture::{FrameView, FrameVisitor, Interpreter, NameObject};
use pyo3::exceptions::PyValueError;
use pyo3::intern;
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyString};
use tracing::debug;

/// The CPython interpreter this module is loaded into.
///
/// Frames are read through `sys._getframe`, so only Python frames of the
/// calling thread are visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonInterpreter;

impl Interpreter for PythonInterpreter {
    fn visit_current_frame<V: FrameVisitor>(&self, visitor: &mut V) {
        // The GIL guard lives for the closure and is released on unwind.
        Python::attach(|py| {
            let innermost = current_frame(py);
            visitor.visit(innermost);
        });
    }
}

fn current_frame(py: Python<'_>) -> Option<PyFrame<'_>> {
    let frame = py
        .import("sys")
        .and_then(|sys| sys.getattr(intern!(py, "_getframe")))
        .and_then(|getframe| getframe.call0());
    match frame {
        Ok(frame) => Some(PyFrame::new(frame)),
        // "call stack is not deep enough": nothing is executing.
        Err(e) if e.is_instance_of::<PyValueError>(py) => None,
        Err(e) => {
            debug!(error = %e, "sys._getframe failed");
            None
        }
    }
}

struct PyFrame<'py> {
    frame: Bound<'py, PyAny>,
    filename: Bound<'py, PyAny>,
    name: Bound<'py, PyAny>,
    first_line: u32,
    line: u32,
}

impl<'py> PyFrame<'py> {
    fn new(frame: Bound<'py, PyAny>) -> Self {
        let py = frame.py();
        let none = || py.None().into_bound(py);

        // f_lineno can be None while a frame is being set up.
        let line = frame
            .getattr(intern!(py, "f_lineno"))
            .and_then(|v| v.extract::<Option<u32>>())
            .ok()
            .flatten()
            .unwrap_or(0);

        let code = match frame.getattr(intern!(py, "f_code")) {
            Ok(code) => code,
            Err(e) => {
                debug!(error = %e, "frame without f_code; recording empty names");
                return Self {
                    frame,
                    filename: none(),
                    name: none(),
                    first_line: 0,
                    line,
                };
            }
        };

        let first_line = code
            .getattr(intern!(py, "co_firstlineno"))
            .and_then(|v| v.extract::<u32>())
            .unwrap_or(0);
        let filename = code
            .getattr(intern!(py, "co_filename"))
            .unwrap_or_else(|_| none());
        let name = code
            .getattr(intern!(py, "co_name"))
            .unwrap_or_else(|_| none());

        Self {
            frame,
            filename,
            name,
            first_line,
            line,
        }
    }
}

impl FrameView for PyFrame<'_> {
    fn line(&self) -> u32 {
        self.line
    }

    fn first_line(&self) -> u32 {
        self.first_line
    }

    fn file_name(&self) -> NameObject<'_> {
        name_object(&self.filename)
    }

    fn func_name(&self) -> NameObject<'_> {
        name_object(&self.name)
    }

    fn back(&self) -> Option<Self> {
        let py = self.frame.py();
        let back = self.frame.getattr(intern!(py, "f_back")).ok()?;
        if back.is_none() {
            return None;
        }
        Some(PyFrame::new(back))
    }
}

fn name_object<'a>(obj: &'a Bound<'_, PyAny>) -> NameObject<'a> {
    if let Ok(bytes) = obj.downcast::<PyBytes>() {
        return NameObject::Bytes(bytes.as_bytes());
    }
    if let Ok(text) = obj.downcast::<PyString>() {
        return match text.to_str() {
            Ok(s) => NameObject::Utf8(s.as_bytes()),
            Err(_) => NameObject::Unencodable,
        };
    }
    if obj.is_none() {
        NameObject::Other("NoneType")
    } else {
        NameObject::Other("object")
    }
}

/// Render the calling Python stack, one line per frame, and echo it to
/// stdout unless `verbose` is 0.
#[pyfunction]
#[pyo3(signature = (verbose = 1))]
fn print_pyframes(verbose: i32) -> String {
    pyframe::render_diagnostic(&PythonInterpreter, verbose)
}

/// Innermost `keep` frames of the calling Python stack (all when negative).
#[pyfunction]
#[pyo3(signature = (keep = -1))]
fn get_pyframes(keep: i64) -> Vec<String> {
    pyframe::render_summary(&PythonInterpreter, keep)
}

/// Load `PYFRAME_*` settings and route `tracing` output to stderr.
#[pyfunction]
fn init_logging() -> PyResult<()> {
    let config = pyframe::init().map_err(|e| PyValueError::new_err(e.to_string()))?;
    pyframe::init_logging(&config.log_filter);
    Ok(())
}

#[pymodule]
fn _pyframe(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(print_pyframes, m)?)?;
    m.add_function(wrap_pyfunction!(get_pyframes, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyo3::types::PyDict;

    fn run_with_module<'py>(py: Python<'py>, code: &std::ffi::CStr) -> Bound<'py, PyDict> {
        let module = PyModule::new(py, "_pyframe").unwrap();
        _pyframe(&module).unwrap();
        let globals = PyDict::new(py);
        globals.set_item("pyframe", &module).unwrap();
        py.run(code, Some(&globals), None).unwrap();
        globals
    }

    #[test]
    fn summary_from_python_frames() {
        Python::attach(|py| {
            let globals = run_with_module(
                py,
                c"def inner():\n    return pyframe.get_pyframes(2)\n\ndef outer():\n    return inner()\n\nresult = outer()\n",
            );
            let result: Vec<String> = globals
                .get_item("result")
                .unwrap()
                .unwrap()
                .extract()
                .unwrap();
            assert_eq!(
                result,
                ["f-0 <string>:2  def inner()", "f-1 <string>:5  def outer()"]
            );
        });
    }

    #[test]
    fn diagnostic_from_python_frames() {
        Python::attach(|py| {
            let globals = run_with_module(
                py,
                c"def f():\n    return pyframe.print_pyframes(0)\n\nresult = f()\n",
            );
            let result: String = globals
                .get_item("result")
                .unwrap()
                .unwrap()
                .extract()
                .unwrap();
            let first = result.lines().next().unwrap();
            assert_eq!(first, "f-0 <string>:2  def f() <string>:1");
            assert!(result.ends_with('\n'));
        });
    }

    #[test]
    fn no_python_frames_from_rust() {
        Python::attach(|_py| {
            assert!(pyframe::render_summary(&PythonInterpreter, -1).is_empty());
            assert_eq!(pyframe::render_diagnostic(&PythonInterpreter, 0), "");
        });
    }

    #[test]
    fn name_objects_by_type() {
        Python::attach(|py| {
            let bytes = PyBytes::new(py, b"a\0b").into_any();
            assert_eq!(name_object(&bytes), NameObject::Bytes(b"a\0b"));

            let text = PyString::new(py, "mod.py").into_any();
            assert_eq!(name_object(&text), NameObject::Utf8(b"mod.py"));

            let none = py.None().into_bound(py);
            assert_eq!(name_object(&none), NameObject::Other("NoneType"));
        });
    }

    /// Starts the walk at a fixed Python object instead of `sys._getframe`.
    struct StartAt<'py>(Bound<'py, PyAny>);

    impl Interpreter for StartAt<'_> {
        fn visit_current_frame<V: FrameVisitor>(&self, visitor: &mut V) {
            visitor.visit(Some(PyFrame::new(self.0.clone())));
        }
    }

    #[test]
    fn frame_without_code_keeps_its_callers() {
        Python::attach(|py| {
            let globals = run_with_module(
                py,
                c"class Coded:\n    f_lineno = 3\n    f_back = None\n    def __init__(self, code):\n        self.f_code = code\nclass Bare:\n    f_lineno = 7\n    def __init__(self, back):\n        self.f_back = back\ndef target():\n    pass\nframe = Bare(Coded(target.__code__))\n",
            );
            let frame = globals.get_item("frame").unwrap().unwrap();

            let frames = pyframe::capture::FrameCapture::new(StartAt(frame))
                .frames(pyframe::CaptureMode::Fresh);
            assert_eq!(
                frames.into_frames(),
                vec![
                    pyframe::FrameDescriptor::new("", "", 0, 7),
                    pyframe::FrameDescriptor::new("<string>", "target", 10, 3),
                ]
            );
        });
    }
}
