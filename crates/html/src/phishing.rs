//! Display-mismatch ("phishing") detection for anchors.
//!
//! An anchor whose rendered text itself parses as a URL is suspicious
//! when that displayed URL points at a different site than the anchor's
//! actual target. Hostnames are compared case-insensitively after IDN
//! decoding of punycode labels, then at TLD granularity, and finally via
//! the dot-bounded subdomain relation; only when every comparison fails
//! is the target flagged.

use urls::{FoundUrl, UrlRecord, find_url, flags};

/// Outcome of scanning an anchor's displayed text.
pub(crate) struct DisplayedUrl {
    pub record: UrlRecord,
    /// Set when the displayed URL's site is unrelated to the target's.
    pub mismatch: bool,
}

/// Dot-bounded suffix relation between two hostnames, either direction.
///
/// Trailing dots are ignored; the shorter name must be a whole-label
/// suffix of the longer one (`good-bank.com` vs `sub.good-bank.com`
/// holds, `bank.com` vs `evilbank.com` does not).
fn is_subdomain(a: &[u8], b: &[u8]) -> bool {
    let trim = |s: &[u8]| {
        let mut end = s.len();
        while end > 0 && s[end - 1] == b'.' {
            end -= 1;
        }
        end
    };
    let mut p1 = trim(a);
    let mut p2 = trim(b);

    while p1 > 0 && p2 > 0 {
        if !a[p1 - 1].eq_ignore_ascii_case(&b[p2 - 1]) {
            break;
        }
        p1 -= 1;
        p2 -= 1;
    }

    if p2 == 0 {
        p1 > 0 && a[p1 - 1] == b'.'
    } else if p1 == 0 {
        b[p2 - 1] == b'.'
    } else {
        false
    }
}

/// Compare target and displayed hosts the way the detector escalates:
/// host equality, then TLD equality, then the subdomain relation on the
/// full hostnames.
fn sites_unrelated(target: &UrlRecord, displayed: &UrlRecord) -> bool {
    let target_host = target.unicode_host();
    let displayed_host = displayed.unicode_host();
    if displayed_host.eq_ignore_ascii_case(&target_host) {
        return false;
    }

    let target_tld = target.unicode_tld();
    let displayed_tld = displayed.unicode_tld();
    if displayed_tld.eq_ignore_ascii_case(&target_tld) {
        return false;
    }

    !is_subdomain(displayed_host.as_bytes(), target_host.as_bytes())
}

/// Scan an anchor's displayed text for a URL and judge it against the
/// target.
///
/// Text with no parseable URL at (or after) a whitespace-only prefix is
/// "no displayed URL", not a mismatch. On a mismatch the caller flags the
/// target URL `PHISHED`, attaches the displayed URL as `phished_url`, and
/// tags the displayed URL with the mismatched TLD.
pub(crate) fn check_displayed_text(target: &UrlRecord, text: &[u8]) -> Option<DisplayedUrl> {
    let start = text.iter().position(|b| !b.is_ascii_whitespace())?;
    let sub = &text[start..];
    if sub.len() <= 4 {
        return None;
    }

    let FoundUrl {
        offset,
        record: displayed,
        ..
    } = find_url(sub)?;

    // A URL preceded by anything but whitespace is ordinary anchor text.
    if !sub[..offset].iter().all(|b| b.is_ascii_whitespace()) {
        return None;
    }

    let mismatch = sites_unrelated(target, &displayed);
    if mismatch {
        log::debug!(
            target: "html.phishing",
            "displayed {} does not match target {}",
            displayed.host(), target.host()
        );
    }

    Some(DisplayedUrl {
        record: displayed,
        mismatch,
    })
}

/// Apply the mismatch verdict to the pair of records.
pub(crate) fn mark_phished(target: &mut UrlRecord, displayed: &mut UrlRecord) {
    target.flags |= flags::PHISHED;
    displayed.add_tag("phishing", displayed.unicode_tld());
    displayed.flags |= flags::HTML_DISPLAYED;
    target.phished_url = Some(Box::new(displayed.clone()));
}
