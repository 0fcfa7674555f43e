//! Text decoding for merge inputs

use crate::{Error, Result};

/// Bytes inspected when sniffing for binary content.
const SNIFF_LEN: usize = 8000;

/// Whether `content` looks binary.
///
/// Same heuristic git uses: a NUL byte in the first few kilobytes.
pub fn is_binary(content: &[u8]) -> bool {
    content.iter().take(SNIFF_LEN).any(|&b| b == 0)
}

/// Decode `content` as UTF-8 text.
///
/// `side` names the version in the error message (`"ancestor"`, `"ours"`,
/// `"theirs"`).
pub fn decode_text<'a>(content: &'a [u8], side: &'static str) -> Result<&'a str> {
    if is_binary(content) {
        return Err(Error::Decode {
            side,
            reason: "binary content".to_string(),
        });
    }
    std::str::from_utf8(content).map_err(|e| Error::Decode {
        side,
        reason: e.to_string(),
    })
}
