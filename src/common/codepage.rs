//! Codepage decoding for MBCS string fields.
//!
//! VBA projects store most strings twice: once in the project code page
//! (a legacy single- or multi-byte encoding shared project-wide) and once
//! in UTF-16LE. This module maps Windows codepage identifiers onto
//! `encoding_rs` encodings and decodes both flavors.

use encoding_rs::Encoding;

/// Map a Windows codepage identifier to an `encoding_rs` encoding.
///
/// Covers the codepages that appear in VBA projects in the wild. Returns
/// `None` for identifiers with no corresponding encoding.
#[inline]
pub fn codepage_to_encoding(codepage: u16) -> Option<&'static Encoding> {
    match codepage {
        // Windows codepages
        874 => Some(encoding_rs::WINDOWS_874),   // Thai
        1250 => Some(encoding_rs::WINDOWS_1250), // Central European
        1251 => Some(encoding_rs::WINDOWS_1251), // Cyrillic
        1252 => Some(encoding_rs::WINDOWS_1252), // Western European (most common)
        1253 => Some(encoding_rs::WINDOWS_1253), // Greek
        1254 => Some(encoding_rs::WINDOWS_1254), // Turkish
        1255 => Some(encoding_rs::WINDOWS_1255), // Hebrew
        1256 => Some(encoding_rs::WINDOWS_1256), // Arabic
        1257 => Some(encoding_rs::WINDOWS_1257), // Baltic
        1258 => Some(encoding_rs::WINDOWS_1258), // Vietnamese

        // East Asian codepages
        932 => Some(encoding_rs::SHIFT_JIS), // Japanese
        936 => Some(encoding_rs::GBK),       // Simplified Chinese
        949 => Some(encoding_rs::EUC_KR),    // Korean
        950 => Some(encoding_rs::BIG5),      // Traditional Chinese

        // ISO 8859 series
        28592 => Some(encoding_rs::ISO_8859_2),
        28595 => Some(encoding_rs::ISO_8859_5),
        28597 => Some(encoding_rs::ISO_8859_7),
        28605 => Some(encoding_rs::ISO_8859_15),

        // Macintosh Roman
        10000 => Some(encoding_rs::MACINTOSH),

        // Unicode
        1200 => Some(encoding_rs::UTF_16LE),
        1201 => Some(encoding_rs::UTF_16BE),
        65001 => Some(encoding_rs::UTF_8),

        _ => None,
    }
}

/// Decode an MBCS byte sequence with the project code page, trimming
/// trailing NUL padding.
///
/// Dir-stream string records are advisory metadata, so an unknown code
/// page falls back to Windows-1252 rather than failing the whole parse.
/// Module source extraction takes the strict path through
/// [`codepage_to_encoding`] instead.
pub fn decode_mbcs(bytes: &[u8], codepage: u16) -> String {
    let encoding = codepage_to_encoding(codepage).unwrap_or(encoding_rs::WINDOWS_1252);
    let (text, _, _) = encoding.decode(bytes);
    text.trim_end_matches('\0').to_string()
}

/// Decode UTF-16LE bytes to a String, trimming trailing NUL padding.
///
/// Odd trailing bytes are dropped; invalid surrogates are replaced
/// (lossy), matching how Office itself tolerates damaged name fields.
pub fn decode_utf16le(bytes: &[u8]) -> String {
    if bytes.len() < 2 {
        return String::new();
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();

    String::from_utf16_lossy(&units)
        .trim_end_matches('\0')
        .to_string()
}
