//! Binary detection and decoding for note bodies.

use memchr::memchr;

use crate::error::MdrError;

const BINARY_SNIFF_BYTES: usize = 8192;

/// Quick binary detection - checks the first 8KB for NULL bytes.
#[must_use]
pub fn is_binary(buffer: &[u8]) -> bool {
    let check_len = buffer.len().min(BINARY_SNIFF_BYTES);
    memchr(0, &buffer[..check_len]).is_some()
}

/// Decode note bytes to text, replacing invalid UTF-8 with U+FFFD.
///
/// # Errors
/// Returns `MdrError::BinaryFile` when binary content is detected.
pub fn decode_note(buffer: Vec<u8>, file_id: &str) -> Result<String, MdrError> {
    if is_binary(&buffer) {
        return Err(MdrError::BinaryFile(file_id.to_string()));
    }
    match String::from_utf8(buffer) {
        Ok(text) => Ok(text),
        Err(err) => Ok(String::from_utf8_lossy(&err.into_bytes()).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nul_in_head_is_binary() {
        assert!(is_binary(b"abc\0def"));
        assert!(!is_binary(b"# Title\n\nbody"));
    }

    #[test]
    fn invalid_utf8_is_replaced() -> Result<(), MdrError> {
        let text = decode_note(vec![b'h', b'i', 0xff], "x.md")?;
        assert_eq!(text, "hi\u{fffd}");
        Ok(())
    }

    #[test]
    fn binary_is_rejected_with_id() {
        let err = decode_note(vec![0, 1, 2], "img.md");
        assert!(matches!(err, Err(MdrError::BinaryFile(id)) if id == "img.md"));
    }
}
