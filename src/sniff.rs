//! Best-effort file extension guessing for arbitrary container streams.
//!
//! Used when exporting streams for inspection: well-known stream names,
//! then magic numbers in the leading bytes, then the embedded-object
//! filename of `Ole10Native`/`Package` streams, then a `.bin` fallback.

use crate::cfb::tree::{ContainerTree, NodeId};

/// Lower-cased stream-name substrings with well-known meanings.
const NAME_HINTS: [(&str, &str); 7] = [
    ("worddocument", ".doc"),
    ("workbook", ".xls"),
    ("powerpoint document", ".ppt"),
    ("pictures", ".wmf"),
    ("summaryinformation", ".property"),
    ("compobj", ".compobj"),
    ("olepres", ".presentation"),
];

/// Minimum stream length before magic numbers are trusted.
const MAGIC_MIN_LEN: usize = 8;

/// Magic numbers matched against the leading stream bytes.
const MAGIC_NUMBERS: [(&[u8], &str); 8] = [
    (b"\xD0\xCF\x11\xE0", ".cfb"),
    (b"\x50\x4B\x03\x04", ".zip"),
    (b"\x89PNG", ".png"),
    (b"\xFF\xD8\xFF", ".jpg"),
    (b"%PDF-", ".pdf"),
    (b"{\\rtf", ".rtf"),
    (b"<ht", ".html"),
    (b"MZ", ".exe"),
];

/// Suggest a file extension (with leading dot) for a stream node.
/// First match wins; storages and empty streams still get name hints.
pub fn suggest_extension(tree: &ContainerTree, id: NodeId) -> String {
    let node = tree.node(id);
    let name = node.name().to_lowercase();

    for (hint, ext) in NAME_HINTS {
        if name.contains(hint) {
            return ext.to_string();
        }
    }

    let data: &[u8] = node.data().map(|b| b.as_ref()).unwrap_or(&[]);
    // Streams shorter than a real header are too ambiguous to sniff:
    // a 2-byte "MZ" stream is not an executable
    if data.len() >= MAGIC_MIN_LEN {
        let head = &data[..data.len().min(16)];
        for (magic, ext) in MAGIC_NUMBERS {
            if head.starts_with(magic) {
                return ext.to_string();
            }
        }
    }

    if name.contains("ole10native") || name.contains("package") {
        if let Some(ext) = embedded_object_extension(data) {
            return ext;
        }
    }

    ".bin".to_string()
}

/// An OLE 1.0 native stream carries the original filename after a 6-byte
/// header, NUL-terminated. Any malformation falls through to the caller's
/// default.
fn embedded_object_extension(data: &[u8]) -> Option<String> {
    let body = data.get(6..)?;
    let end = memchr::memchr(0, body)?;
    let filename = std::str::from_utf8(&body[..end]).ok()?;
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

/// Make a stream name safe to use as a filename: control characters
/// (common as CFB name prefixes) are dropped, path-hostile characters
/// become underscores, and names that sanitize to nothing get a fixed
/// placeholder.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| {
            if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "unnamed_stream".to_string()
    } else {
        trimmed.to_string()
    }
}
