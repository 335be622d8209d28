use std::error::Error;
use std::fmt;

/// Why a name object could not be turned into a string.
///
/// Never returned by the walk itself: the walk substitutes an empty name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Text object that the interpreter could not encode as UTF-8
    /// (lone surrogates and the like).
    Unencodable,
    /// A UTF-8 buffer handed over by the interpreter that is not valid UTF-8.
    InvalidUtf8 { valid_up_to: usize },
    /// Neither bytes nor text.
    Foreign { type_name: &'static str },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unencodable => write!(f, "text object cannot be encoded as utf-8"),
            Self::InvalidUtf8 { valid_up_to } => {
                write!(f, "invalid utf-8 after {valid_up_to} bytes")
            }
            Self::Foreign { type_name } => {
                write!(f, "expected bytes or text, got {type_name}")
            }
        }
    }
}

impl Error for DecodeError {}
