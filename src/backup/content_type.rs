// mongobackup/src/backup/content_type.rs
//! Content-type sniffing from a file's leading bytes.

/// Number of leading bytes considered when classifying content.
pub const SNIFF_LEN: usize = 512;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

struct Signature {
    offset: usize,
    magic: &'static [u8],
    mime: &'static str,
}

const SIGNATURES: &[Signature] = &[
    Signature { offset: 0, magic: b"\x1f\x8b\x08", mime: "application/x-gzip" },
    Signature { offset: 0, magic: b"PK\x03\x04", mime: "application/zip" },
    Signature { offset: 0, magic: b"BZh", mime: "application/x-bzip2" },
    Signature { offset: 0, magic: b"7z\xbc\xaf\x27\x1c", mime: "application/x-7z-compressed" },
    Signature { offset: 0, magic: b"Rar!\x1a\x07\x00", mime: "application/x-rar-compressed" },
    Signature { offset: 0, magic: b"Rar!\x1a\x07\x01\x00", mime: "application/x-rar-compressed" },
    Signature { offset: 0, magic: b"%PDF-", mime: "application/pdf" },
    Signature { offset: 0, magic: b"\x89PNG\r\n\x1a\n", mime: "image/png" },
    Signature { offset: 257, magic: b"ustar", mime: "application/x-tar" },
];

/// Classifies `data` by its first [`SNIFF_LEN`] bytes.
///
/// Known binary signatures win; otherwise UTF-8 text without control bytes is
/// `text/plain`, and anything else is `application/octet-stream`.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let window = &data[..data.len().min(SNIFF_LEN)];

    for sig in SIGNATURES {
        if window
            .get(sig.offset..)
            .is_some_and(|rest| rest.starts_with(sig.magic))
        {
            return sig.mime;
        }
    }

    if looks_like_text(window) { TEXT_PLAIN } else { OCTET_STREAM }
}

fn looks_like_text(window: &[u8]) -> bool {
    let binary_byte = window
        .iter()
        .any(|&b| matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F | 0x7F));
    if binary_byte {
        return false;
    }
    match std::str::from_utf8(window) {
        Ok(_) => true,
        // The window may cut a multi-byte character in half.
        Err(e) => e.error_len().is_none(),
    }
}
