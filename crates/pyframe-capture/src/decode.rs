use tracing::trace;

use crate::error::DecodeError;
use crate::interp::NameObject;

/// Turn a name object into an owned string.
///
/// Byte strings keep their exact length, NUL bytes included. Sequences that
/// are not UTF-8 become U+FFFD since the result is a `String`.
pub fn decode(obj: NameObject<'_>) -> Result<String, DecodeError> {
    match obj {
        NameObject::Bytes(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        NameObject::Utf8(buf) => match std::str::from_utf8(buf) {
            Ok(s) => Ok(s.to_owned()),
            Err(e) => Err(DecodeError::InvalidUtf8 {
                valid_up_to: e.valid_up_to(),
            }),
        },
        NameObject::Unencodable => Err(DecodeError::Unencodable),
        NameObject::Other(type_name) => Err(DecodeError::Foreign { type_name }),
    }
}

/// Like [`decode`], but yields an empty string on failure.
pub fn decode_or_empty(obj: NameObject<'_>) -> String {
    match decode(obj) {
        Ok(s) => s,
        Err(e) => {
            trace!(error = %e, "name object not decodable; using empty name");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_keep_embedded_nul() {
        let decoded = decode(NameObject::Bytes(b"mod\0ule.py")).unwrap();
        assert_eq!(decoded.len(), 10);
        assert_eq!(decoded, "mod\0ule.py");
    }

    #[test]
    fn bytes_with_invalid_utf8_are_replaced_not_dropped() {
        let decoded = decode(NameObject::Bytes(b"a\xffb")).unwrap();
        assert_eq!(decoded, "a\u{fffd}b");
    }

    #[test]
    fn utf8_text_decodes() {
        let decoded = decode(NameObject::Utf8("módulo.py".as_bytes())).unwrap();
        assert_eq!(decoded, "módulo.py");
    }

    #[test]
    fn malformed_utf8_text_is_an_error() {
        assert_eq!(
            decode(NameObject::Utf8(b"ok\xc3")),
            Err(DecodeError::InvalidUtf8 { valid_up_to: 2 })
        );
    }

    #[test]
    fn failures_degrade_to_empty() {
        assert_eq!(decode_or_empty(NameObject::Unencodable), "");
        assert_eq!(decode_or_empty(NameObject::Other("int")), "");
        assert_eq!(decode_or_empty(NameObject::Utf8(b"\xff")), "");
    }
}
