//! Parsed URL records.

use crate::find_ignore_ascii_case;

/// Flag bits carried by a [`UrlRecord`].
pub mod flags {
    /// No `scheme:` prefix was present; `http://` was assumed.
    pub const SCHEMELESS: u32 = 1 << 0;
    /// Unsafe bytes had to be percent-encoded during extraction.
    pub const OBSCURED: u32 = 1 << 1;
    /// Unicode normalization changed the URL text.
    pub const UNNORMALISED: u32 = 1 << 2;
    /// Anchor target whose displayed text points at a different site.
    pub const PHISHED: u32 = 1 << 3;
    /// URL seen as the rendered text of an HTML anchor.
    pub const HTML_DISPLAYED: u32 = 1 << 4;
    /// URL first seen in a plain-text part.
    pub const FROM_TEXT: u32 = 1 << 5;
    /// Host is an IP literal.
    pub const NUMERIC: u32 = 1 << 6;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
    Ftp,
    Mailto,
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UrlError {
    /// The `url` crate rejected the input.
    Parse,
    /// Parsed, but no usable host component.
    NoHost,
}

/// A marker attached to a URL by an analyzer (for example the phishing
/// detector tags a displayed URL with the mismatched TLD).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlTag {
    pub name: &'static str,
    pub value: String,
}

/// A normalized, decomposed URL with analyzer state.
///
/// `text` is the normalized serialization and is the identity key used by
/// [`crate::UrlTable`]. `count` starts at 1 and grows on idempotent
/// re-insertion.
#[derive(Clone, Debug)]
pub struct UrlRecord {
    text: String,
    host: String,
    tld: String,
    query: Option<String>,
    protocol: Protocol,
    pub flags: u32,
    pub count: u32,
    pub tags: Vec<UrlTag>,
    pub phished_url: Option<Box<UrlRecord>>,
}

impl UrlRecord {
    /// Parse `input` through the generic URL grammar.
    ///
    /// `mailto:` targets take the domain after `@` as their host; other
    /// schemes require a host. Failure means the caller has no URL, not an
    /// error condition to propagate.
    pub fn parse(input: &str) -> Result<UrlRecord, UrlError> {
        let parsed = url::Url::parse(input).map_err(|_| UrlError::Parse)?;

        let protocol = match parsed.scheme() {
            "http" => Protocol::Http,
            "https" => Protocol::Https,
            "ftp" => Protocol::Ftp,
            "mailto" => Protocol::Mailto,
            _ => Protocol::Unknown,
        };

        let mut record_flags = 0;
        let host = match protocol {
            Protocol::Mailto => {
                let path = parsed.path();
                let at = path.rfind('@').ok_or(UrlError::NoHost)?;
                let domain = &path[at + 1..];
                if domain.is_empty() {
                    return Err(UrlError::NoHost);
                }
                domain.to_ascii_lowercase()
            }
            _ => match parsed.host() {
                Some(url::Host::Domain(d)) => d.to_ascii_lowercase(),
                Some(url::Host::Ipv4(_)) | Some(url::Host::Ipv6(_)) => {
                    record_flags |= flags::NUMERIC;
                    parsed.host_str().unwrap_or_default().to_ascii_lowercase()
                }
                None => return Err(UrlError::NoHost),
            },
        };
        if host.is_empty() {
            return Err(UrlError::NoHost);
        }

        let tld = registrable_suffix(&host);

        Ok(UrlRecord {
            text: parsed.as_str().to_string(),
            host,
            tld,
            query: parsed.query().map(str::to_string),
            protocol,
            flags: record_flags,
            count: 1,
            tags: Vec::new(),
            phished_url: None,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Registrable-suffix view of the host (`sub.good-bank.com` →
    /// `good-bank.com`).
    pub fn tld(&self) -> &str {
        &self.tld
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn is_mailto(&self) -> bool {
        self.protocol == Protocol::Mailto
    }

    /// Host after IDN decoding, when the host carries a punycode label;
    /// the ASCII form is kept on conversion failure.
    pub fn unicode_host(&self) -> String {
        decode_idn_if_needed(&self.host)
    }

    /// TLD after IDN decoding, ASCII form on failure.
    pub fn unicode_tld(&self) -> String {
        decode_idn_if_needed(&self.tld)
    }

    pub fn add_tag(&mut self, name: &'static str, value: String) {
        self.tags.push(UrlTag { name, value });
    }
}

fn decode_idn_if_needed(host: &str) -> String {
    if find_ignore_ascii_case(host.as_bytes(), b"xn--").is_some() {
        if let Some(unicode) = crate::idna_to_unicode(host) {
            return unicode;
        }
    }
    host.to_string()
}

/// Last two dot-bounded labels of `host` (the whole host when it has
/// fewer). A public-suffix list is outside this core; this approximation
/// is exact for ordinary second-level registrations.
fn registrable_suffix(host: &str) -> String {
    let trimmed = host.trim_end_matches('.');
    let mut labels = trimmed.rsplitn(3, '.');
    let last = labels.next().unwrap_or(trimmed);
    match labels.next() {
        Some(second) => format!("{second}.{last}"),
        None => last.to_string(),
    }
}
