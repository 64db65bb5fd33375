//! Feedback text normalization and anonymized fingerprints for logs.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize text: decode entities, strip tags, ASCII quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Option<Regex>> = OnceCell::new();
    if let Some(re) = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").ok()) {
        out = re.replace_all(&out, " ").to_string();
    }

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Short SHA-256 fingerprint; feedback text is never logged raw.
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
