//! Free-text URL discovery.
//!
//! Used on anchor display text and on query strings: a much narrower
//! recognizer than the full grammar — it only looks for tokens opening
//! with a known scheme prefix (or `www.`) at a token boundary and hands
//! the token to [`UrlRecord::parse`].

use crate::record::{UrlRecord, flags};

/// A URL discovered inside free text.
#[derive(Clone, Debug)]
pub struct FoundUrl {
    /// Byte offset of the URL's first byte within the scanned text.
    pub offset: usize,
    /// `www.` tokens get an assumed `http://`; mirrored as `SCHEMELESS`.
    pub prefix_added: bool,
    pub record: UrlRecord,
}

const SCHEME_PREFIXES: &[&[u8]] = &[b"http://", b"https://", b"ftp://", b"mailto:"];
const WWW_PREFIX: &[u8] = b"www.";

fn is_boundary(byte: u8) -> bool {
    // '=' and '&' bound URLs embedded in query strings.
    byte.is_ascii_whitespace()
        || matches!(
            byte,
            b'<' | b'>' | b'"' | b'\'' | b'(' | b',' | b';' | b'=' | b'&'
        )
}

fn is_terminator(byte: u8) -> bool {
    byte.is_ascii_whitespace()
        || byte.is_ascii_control()
        || matches!(byte, b'<' | b'>' | b'"' | b'\'')
}

fn starts_with_ignore_ascii_case(text: &[u8], at: usize, prefix: &[u8]) -> bool {
    text.len() >= at + prefix.len() && text[at..at + prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Find the first parseable URL in `text`.
///
/// Candidates that fail the grammar are skipped and the scan continues, so
/// a decorative `http://` with nothing behind it does not mask a later
/// real URL.
pub fn find_url(text: &[u8]) -> Option<FoundUrl> {
    let mut i = 0;
    while i < text.len() {
        if i > 0 && !is_boundary(text[i - 1]) {
            i += 1;
            continue;
        }

        let matched = SCHEME_PREFIXES
            .iter()
            .find(|prefix| starts_with_ignore_ascii_case(text, i, prefix))
            .map(|prefix| (prefix.len(), false))
            .or_else(|| {
                starts_with_ignore_ascii_case(text, i, WWW_PREFIX)
                    .then_some((WWW_PREFIX.len(), true))
            });

        let Some((prefix_len, needs_scheme)) = matched else {
            i += 1;
            continue;
        };

        let mut end = i;
        while end < text.len() && !is_terminator(text[end]) {
            end += 1;
        }
        let mut token = &text[i..end];
        while let Some((&last, rest)) = token.split_last() {
            if matches!(last, b'.' | b',' | b';' | b':' | b'!' | b'?' | b')') {
                token = rest;
            } else {
                break;
            }
        }

        if token.len() > prefix_len {
            let candidate = if needs_scheme {
                let mut with_scheme = Vec::with_capacity(token.len() + 7);
                with_scheme.extend_from_slice(b"http://");
                with_scheme.extend_from_slice(token);
                with_scheme
            } else {
                token.to_vec()
            };

            match UrlRecord::parse(&String::from_utf8_lossy(&candidate)) {
                Ok(mut record) => {
                    if needs_scheme {
                        record.flags |= flags::SCHEMELESS;
                    }
                    return Some(FoundUrl {
                        offset: i,
                        prefix_added: needs_scheme,
                        record,
                    });
                }
                Err(_) => {
                    log::trace!(target: "urls", "candidate at {i} failed to parse, continuing");
                }
            }
        }

        i = end.max(i + 1);
    }
    None
}
