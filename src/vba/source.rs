//! Module source recovery.
//!
//! A module stream is a performance cache (opaque) followed, at the text
//! offset declared by the dir stream, by an MS-OVBA compressed container
//! holding the source text in the project code page. Recovery slices at
//! the offset, decompresses, decodes, trims NUL padding, and strips the
//! compiler-emitted `Attribute` lines that are not author-authored code.

use super::compression;
use super::dir::VbaModuleInfo;
use crate::common::codepage::codepage_to_encoding;
use crate::common::error::{Error, Result};

/// Recover a module's plaintext source from its raw stream bytes.
///
/// Errors are scoped to this module: the caller records them and moves
/// on to sibling modules.
pub fn extract_source(stream: &[u8], info: &VbaModuleInfo) -> Result<String> {
    let offset = info.text_offset as usize;
    if offset > stream.len() {
        return Err(Error::InvalidFormat(format!(
            "text offset {offset} past end of module stream ({} bytes)",
            stream.len()
        )));
    }

    let raw = compression::decompress(&stream[offset..])?;

    let encoding =
        codepage_to_encoding(info.code_page).ok_or(Error::UnsupportedCodepage(info.code_page))?;
    let (text, _, _) = encoding.decode(&raw);

    Ok(strip_attribute_lines(text.trim_end_matches('\0')))
}

/// Remove every line whose first non-whitespace token is the word
/// `Attribute` (case-insensitive), preserving the line endings of all
/// remaining lines. Idempotent.
pub fn strip_attribute_lines(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for line in LinesWithEndings::new(source) {
        if !is_attribute_line(line) {
            out.push_str(line);
        }
    }
    out
}

fn is_attribute_line(line: &str) -> bool {
    let token = line.trim_start();
    let Some(head) = token.get(..9) else {
        return false;
    };
    // The token must be the whole word: "AttributeFoo" is author code
    head.eq_ignore_ascii_case("attribute")
        && token[9..].chars().next().is_none_or(|c| c.is_whitespace())
}

/// Iterator over lines that keeps each line's own terminator
/// (`\r\n`, `\r`, or `\n`) attached, so reassembly is lossless.
struct LinesWithEndings<'a> {
    rest: &'a str,
}

impl<'a> LinesWithEndings<'a> {
    fn new(source: &'a str) -> Self {
        Self { rest: source }
    }
}

impl<'a> Iterator for LinesWithEndings<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let bytes = self.rest.as_bytes();
        let end = match memchr::memchr2(b'\r', b'\n', bytes) {
            Some(i) if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') => i + 2,
            Some(i) => i + 1,
            None => bytes.len(),
        };
        let (line, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vba::compression::compress_literal;
    use crate::vba::dir::ModuleType;
    use proptest::prelude::*;

    fn module_info(text_offset: u32, code_page: u16) -> VbaModuleInfo {
        VbaModuleInfo {
            module_name: "Module1".to_string(),
            stream_name: "Module1".to_string(),
            code_page,
            text_offset,
            module_type: ModuleType::Standard,
            save_extension: None,
        }
    }

    #[test]
    fn test_extract_at_offset() {
        // Performance cache prefix, then the compressed source container
        let source = b"Attribute VB_Name = \"Module1\"\r\nSub Test()\r\nEnd Sub\r\n";
        let mut stream = vec![0xEEu8; 10];
        stream.extend_from_slice(&compress_literal(source));

        let text = extract_source(&stream, &module_info(10, 1252)).unwrap();
        assert_eq!(text, "Sub Test()\r\nEnd Sub\r\n");
    }

    #[test]
    fn test_extract_trims_nul_padding() {
        let source = b"Sub A()\r\nEnd Sub\r\n\x00\x00\x00";
        let stream = compress_literal(source);
        let text = extract_source(&stream, &module_info(0, 1252)).unwrap();
        assert_eq!(text, "Sub A()\r\nEnd Sub\r\n");
    }

    #[test]
    fn test_extract_offset_past_end() {
        let err = extract_source(&[0u8; 4], &module_info(100, 1252)).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_extract_bad_container() {
        // Offset lands on bytes that are not a compressed container
        let err = extract_source(&[0xFFu8; 8], &module_info(0, 1252)).unwrap_err();
        assert!(matches!(err, Error::Decompression(_)));
    }

    #[test]
    fn test_extract_unsupported_codepage() {
        let stream = compress_literal(b"Sub A()\r\nEnd Sub\r\n");
        let err = extract_source(&stream, &module_info(0, 60001)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedCodepage(60001)));
    }

    #[test]
    fn test_strip_attribute_lines() {
        let source = "Attribute VB_Name = \"M\"\r\n  attribute VB_Base = \"0\"\r\nSub T()\r\nEnd Sub\r\n";
        assert_eq!(strip_attribute_lines(source), "Sub T()\r\nEnd Sub\r\n");
    }

    #[test]
    fn test_strip_keeps_attribute_like_identifiers() {
        let source = "AttributeCount = 1\nDim Attribute2\n";
        assert_eq!(strip_attribute_lines(source), source);
    }

    #[test]
    fn test_strip_mixed_line_endings() {
        let source = "Attribute A = 1\rKeep1\rAttribute B = 2\nKeep2\n";
        assert_eq!(strip_attribute_lines(source), "Keep1\rKeep2\n");
    }

    #[test]
    fn test_strip_line_without_terminator() {
        assert_eq!(strip_attribute_lines("Attribute VB_Name = \"M\""), "");
        assert_eq!(strip_attribute_lines("Sub T()"), "Sub T()");
    }

    #[test]
    fn test_strip_empty() {
        assert_eq!(strip_attribute_lines(""), "");
    }

    proptest! {
        #[test]
        fn prop_strip_is_idempotent(source in "(?s)[A-Za-z0-9 =\"_\r\n\t]{0,200}") {
            let once = strip_attribute_lines(&source);
            let twice = strip_attribute_lines(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
