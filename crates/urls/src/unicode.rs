//! Unicode collaborator contracts: NFC normalization and IDN decoding.

use unicode_normalization::{UnicodeNormalization, is_nfc};

/// Normalize `text` to NFC.
///
/// Returns the normalized text together with whether normalization changed
/// anything; the change signal is what downstream treats as a generic
/// obfuscation marker.
pub fn nfc_normalize(text: &str) -> (String, bool) {
    if is_nfc(text) {
        return (text.to_string(), false);
    }
    let normalized: String = text.nfc().collect();
    let changed = normalized != text;
    (normalized, changed)
}

/// Decode a punycode (`xn--`) hostname to its Unicode form.
///
/// Conversion failure yields `None`; callers fall back to the ASCII form.
pub fn idna_to_unicode(host: &str) -> Option<String> {
    let (unicode, result) = idna::domain_to_unicode(host);
    match result {
        Ok(()) => Some(unicode),
        Err(_) => {
            log::debug!(target: "urls", "cannot convert {host:?} to IDN");
            None
        }
    }
}
