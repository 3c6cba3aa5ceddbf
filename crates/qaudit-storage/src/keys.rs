//! Shared key generation for download links.
//!
//! Key format: `evidence/{evidence_id}/{hash16}/{file_name}`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};

/// RFC 5987 `attr-char`: everything else is percent-encoded in `filename*`.
const ATTR_CHAR_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Length of the hash prefix used as a key segment.
pub const KEY_HASH_PREFIX_LEN: usize = 16;

/// Replace anything outside `[A-Za-z0-9._-]` and drop path components.
pub fn sanitize_filename(filename: &str) -> String {
    const MAX: usize = 255;
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    if base.contains("..") {
        return "invalid_filename".to_string();
    }
    let s: String = base
        .chars()
        .take(MAX)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim().is_empty() {
        "file".to_string()
    } else {
        s
    }
}

/// Generate a non-guessable download key.
///
/// The same inputs always produce the same key; changing any of them (including the
/// timestamp) produces an unrelated hash segment.
pub fn evidence_download_key(
    evidence_id: &str,
    file_name: &str,
    requesting_user: &str,
    timestamp_millis: i64,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(evidence_id.as_bytes());
    hasher.update(b":");
    hasher.update(file_name.as_bytes());
    hasher.update(b":");
    hasher.update(requesting_user.as_bytes());
    hasher.update(b":");
    hasher.update(timestamp_millis.to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());

    format!(
        "evidence/{}/{}/{}",
        sanitize_filename(evidence_id),
        &digest[..KEY_HASH_PREFIX_LEN],
        sanitize_filename(file_name)
    )
}

/// `Content-Disposition` value forcing a download under the original file name.
///
/// Non-ASCII names get an ASCII `filename` fallback plus an RFC 6266
/// `filename*` carrying the UTF-8 name.
pub fn attachment_disposition(file_name: &str) -> String {
    let name: String = file_name.chars().filter(|c| !c.is_control()).collect();
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' => '\'',
            '\\' => '_',
            c if c.is_ascii() => c,
            _ => '_',
        })
        .collect();

    if name.is_ascii() {
        return format!("attachment; filename=\"{}\"", fallback);
    }
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        utf8_percent_encode(&name, ATTR_CHAR_ESCAPES)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_contains_hash_prefix_and_file_name() {
        let key = evidence_download_key("ev-42", "report.pdf", "auditor-1", 1_700_000_000_000);
        let parts: Vec<&str> = key.split('/').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "evidence");
        assert_eq!(parts[1], "ev-42");
        assert_eq!(parts[2].len(), KEY_HASH_PREFIX_LEN);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(parts[3], "report.pdf");
    }

    #[test]
    fn key_is_deterministic_and_timestamp_sensitive() {
        let a = evidence_download_key("ev-1", "a.png", "u", 1);
        let b = evidence_download_key("ev-1", "a.png", "u", 1);
        let c = evidence_download_key("ev-1", "a.png", "u", 2);
        let d = evidence_download_key("ev-1", "a.png", "other", 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("my report (v2).pdf"), "my_report__v2_.pdf");
        assert_eq!(sanitize_filename("dir\\evil..name"), "invalid_filename");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn disposition_quotes_file_name() {
        assert_eq!(
            attachment_disposition("Q3 \"final\".xlsx"),
            "attachment; filename=\"Q3 'final'.xlsx\""
        );
    }

    #[test]
    fn disposition_encodes_non_ascii_names() {
        let value = attachment_disposition("Prüfbericht ä.pdf");
        assert_eq!(
            value,
            "attachment; filename=\"Pr_fbericht _.pdf\"; filename*=UTF-8''Pr%C3%BCfbericht%20%C3%A4.pdf"
        );
        assert!(value.is_ascii());
        assert!(attachment_disposition("招标\n.png").is_ascii());
    }
}
