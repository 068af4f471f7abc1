//! Document parser and tree builder.
//!
//! A single left-to-right state machine over the raw byte stream:
//! classifies tag boundaries, comments, SGML/XML declarations and
//! freeform content, builds the tag tree with balance repair, emits the
//! normalized plain-text buffer, and drives the structural extractors and
//! the phishing detector per closed tag.
//!
//! There is no failure path: malformed structure degrades to document
//! flags and parsing always runs to the end of the buffer. The only
//! admission control is the tag cap; past it the parser keeps scanning
//! and emitting text but materializes no new nodes or extra payloads.

use memchr::memchr;
use urls::{UrlRecord, UrlTable, flags as url_flags, nfc_normalize};

use crate::colors::Color;
use crate::entities::decode_entities_in_place;
use crate::extract;
use crate::phishing;
use crate::tag_parser::parse_tag_span;
use crate::tags::{
    CM_HEAD, CM_INLINE, CM_UNIQUE, FL_BLOCK, FL_CLOSED, FL_CLOSING, FL_IGNORE, TAG_COUNT, TagId,
};
use crate::tree::TagTree;
use crate::types::{
    ExceptionKind, Extra, HtmlTag, ImageRecord, BlockRecord, NodeId, ProcessException, UrlRef,
};

/// Diagnostic flags accumulated over one document.
pub mod doc_flags {
    /// Content before any tag.
    pub const BAD_START: u32 = 1 << 0;
    /// Broken tag or attribute syntax.
    pub const BAD_ELEMENTS: u32 = 1 << 1;
    /// An XML declaration was seen.
    pub const XML: u32 = 1 << 2;
    /// A closing tag had no pairable open tag.
    pub const UNBALANCED: u32 = 1 << 3;
    /// A tag name not in the definition table.
    pub const UNKNOWN_ELEMENTS: u32 = 1 << 4;
    /// A must-appear-once tag appeared again.
    pub const DUPLICATE_ELEMENTS: u32 = 1 << 5;
    /// The tag cap was exceeded; structural tracking stopped.
    pub const TOO_MANY_TAGS: u32 = 1 << 6;
}

/// Hard cap on materialized tags, against tag-bomb inputs.
pub const DEFAULT_MAX_TAGS: usize = 8192;

#[derive(Clone, Copy, Debug)]
pub struct ParserConfig {
    pub max_tags: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            max_tags: DEFAULT_MAX_TAGS,
        }
    }
}

const TAGS_SEEN_WORDS: usize = (TAG_COUNT + 63) / 64;

/// Aggregate parse result for one HTML part.
#[derive(Debug)]
pub struct HtmlDocument {
    pub tree: TagTree,
    pub flags: u32,
    pub bgcolor: Color,
    pub total_tags: usize,
    pub images: Vec<NodeId>,
    pub blocks: Vec<NodeId>,
    config: ParserConfig,
    tags_seen: [u64; TAGS_SEEN_WORDS],
}

impl HtmlDocument {
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    pub fn with_config(config: ParserConfig) -> Self {
        HtmlDocument {
            tree: TagTree::new(),
            flags: 0,
            // White with transparent alpha is the mail-client default.
            bgcolor: Color {
                valid: true,
                r: 255,
                g: 255,
                b: 255,
                alpha: 0,
            },
            total_tags: 0,
            images: Vec::new(),
            blocks: Vec::new(),
            config,
            tags_seen: [0; TAGS_SEEN_WORDS],
        }
    }

    pub fn is_seen(&self, id: TagId) -> bool {
        let at = id as usize;
        self.tags_seen[at / 64] & (1 << (at % 64)) != 0
    }

    fn mark_seen(&mut self, id: TagId) {
        let at = id as usize;
        self.tags_seen[at / 64] |= 1 << (at % 64);
    }

    /// Signature-matching query: was tag `name` seen anywhere?
    pub fn tag_seen(&self, name: &str) -> bool {
        crate::tags::tag_id_by_name(name).is_some_and(|id| self.is_seen(id))
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageRecord> {
        self.images.iter().filter_map(|&n| match &self.tree.tag(n)?.extra {
            Extra::Image(img) => Some(img),
            _ => None,
        })
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BlockRecord> {
        self.blocks.iter().filter_map(|&n| match &self.tree.tag(n)?.extra {
            Extra::Block(block) => Some(block),
            _ => None,
        })
    }
}

impl Default for HtmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize one HTML part without URL/exception tracking.
pub fn process_part(doc: &mut HtmlDocument, input: &[u8]) -> Vec<u8> {
    let mut exceptions = Vec::new();
    let mut urls_tbl = UrlTable::new();
    let mut emails_tbl = UrlTable::new();
    process_part_full(doc, input, &mut exceptions, &mut urls_tbl, &mut emails_tbl)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    TagBegin,
    SgmlTag,
    XmlTag,
    XmlTagEnd,
    CompoundTag,
    CommentTag,
    CommentContent,
    SgmlContent,
    TagEnd,
    ContentIgnore,
    ContentWrite,
    ContentIgnoreSpaces,
}

/// What became of a processed tag.
enum Processed {
    /// Materialized in the arena.
    Node(NodeId),
    /// Not materialized (unknown id or tag cap); handed back for
    /// side-effect-only processing.
    Dropped(HtmlTag),
    /// Closing marker discarded by balance repair.
    Consumed,
}

/// Normalize one HTML part.
///
/// Returns the normalized text; `exceptions` receives newline/URL regions
/// of that text, and extracted URLs land in `urls_tbl`/`emails_tbl` with
/// idempotent count-increment semantics.
pub fn process_part_full(
    doc: &mut HtmlDocument,
    input: &[u8],
    exceptions: &mut Vec<ProcessException>,
    urls_tbl: &mut UrlTable,
    emails_tbl: &mut UrlTable,
) -> Vec<u8> {
    let len = input.len();
    let mut dest: Vec<u8> = Vec::with_capacity(len / 3 * 2);

    let mut state = State::Start;
    let mut i = 0usize;
    let mut c = 0usize; // current text run start
    let mut closing = false;
    let mut need_decode = false;
    let mut save_space = false;
    let mut obrace = 0usize;
    let mut ebrace = 0usize;
    let mut cur_tag: Option<HtmlTag> = None;
    let mut cur_level: NodeId = TagTree::ROOT;
    let mut content_tag: Option<NodeId> = None;
    let mut href_offset: Option<usize> = None;
    let mut cur_url: Option<UrlRef> = None;

    while i < len {
        let t = input[i];

        match state {
            State::Start => {
                if t == b'<' {
                    state = State::TagBegin;
                } else {
                    doc.flags |= doc_flags::BAD_START;
                    state = State::ContentWrite;
                }
            }

            State::TagBegin => match t {
                b'<' => {
                    i += 1;
                    closing = false;
                }
                b'!' => {
                    state = State::SgmlTag;
                    i += 1;
                }
                b'?' => {
                    state = State::XmlTag;
                    doc.flags |= doc_flags::XML;
                    i += 1;
                }
                b'/' => {
                    closing = true;
                    i += 1;
                }
                b'>' => {
                    // Empty tag.
                    doc.flags |= doc_flags::BAD_ELEMENTS;
                    state = State::TagEnd;
                }
                _ => {
                    // A complete tag span runs to the terminating '>'; a
                    // '>' inside a quoted attribute value still ends the
                    // tag here, like the per-byte original.
                    let Some(rel) = memchr(b'>', &input[i..]) else {
                        // Unterminated tag: scanning ends, the fragment
                        // is discarded.
                        state = State::TagBegin;
                        break;
                    };
                    let mut tag = HtmlTag::default();
                    doc.flags |= parse_tag_span(&input[i..i + rel], &mut tag);
                    if closing {
                        tag.flags |= FL_CLOSING;
                        if tag.flags & FL_CLOSED != 0 {
                            // Bad mix of closed and closing.
                            doc.flags |= doc_flags::BAD_ELEMENTS;
                        }
                        closing = false;
                    }
                    cur_tag = Some(tag);
                    i += rel; // at '>'
                    state = State::TagEnd;
                }
            },

            State::SgmlTag => match t {
                b'[' => {
                    state = State::CompoundTag;
                    obrace = 1;
                    ebrace = 0;
                    i += 1;
                }
                b'-' => {
                    state = State::CommentTag;
                    i += 1;
                }
                _ => state = State::SgmlContent,
            },

            State::XmlTag => {
                if t == b'?' {
                    state = State::XmlTagEnd;
                } else if t == b'>' {
                    // Misformed xml tag.
                    doc.flags |= doc_flags::BAD_ELEMENTS;
                    state = State::TagEnd;
                    continue;
                }
                i += 1;
            }

            State::XmlTagEnd => {
                if t == b'>' {
                    state = State::TagEnd;
                } else {
                    doc.flags |= doc_flags::BAD_ELEMENTS;
                    i += 1;
                }
            }

            State::CompoundTag => {
                if t == b'[' {
                    obrace += 1;
                } else if t == b']' {
                    ebrace += 1;
                } else if t == b'>' && obrace == ebrace {
                    state = State::TagEnd;
                    continue;
                }
                i += 1;
            }

            State::CommentTag => {
                if t != b'-' {
                    doc.flags |= doc_flags::BAD_ELEMENTS;
                }
                i += 1;
                ebrace = 0;
                state = State::CommentContent;
            }

            State::CommentContent => {
                if t == b'-' {
                    ebrace += 1;
                } else if t == b'>' && ebrace >= 2 {
                    state = State::TagEnd;
                    continue;
                } else {
                    ebrace = 0;
                }
                i += 1;
            }

            State::SgmlContent => {
                // Doctypes and friends carry nothing we track.
                if t == b'>' {
                    state = State::TagEnd;
                    cur_tag = None;
                    continue;
                }
                i += 1;
            }

            State::ContentIgnore => {
                if t == b'<' {
                    state = State::TagBegin;
                } else {
                    i += 1;
                }
            }

            State::ContentWrite => {
                if t != b'<' {
                    if t == b'&' {
                        need_decode = true;
                    } else if t.is_ascii_whitespace() {
                        save_space = true;
                        if i > c {
                            flush_run(&mut dest, &input[c..i], need_decode);
                            if let Some(node) = content_tag
                                && let Some(tag) = doc.tree.tag_mut(node)
                            {
                                tag.content_length += i - c + 1;
                            }
                        }
                        c = i;
                        state = State::ContentIgnoreSpaces;
                    } else if save_space {
                        // Collapse the pending whitespace run to one space.
                        if !dest.is_empty() && !dest.last().copied().unwrap_or(0).is_ascii_whitespace()
                        {
                            dest.push(b' ');
                        }
                        save_space = false;
                    }
                    i += 1;
                } else {
                    if c != i {
                        flush_run(&mut dest, &input[c..i], need_decode);
                        if let Some(node) = content_tag
                            && let Some(tag) = doc.tree.tag_mut(node)
                        {
                            tag.content_length += i - c;
                        }
                    }
                    content_tag = None;
                    state = State::TagBegin;
                }
            }

            State::ContentIgnoreSpaces => {
                if !t.is_ascii_whitespace() {
                    c = i;
                    state = State::ContentWrite;
                    continue;
                }
                if let Some(node) = content_tag
                    && let Some(tag) = doc.tree.tag_mut(node)
                {
                    tag.content_length += 1;
                }
                i += 1;
            }

            State::TagEnd => {
                match cur_tag.take() {
                    None => state = State::ContentWrite,
                    Some(tag) => {
                        state = handle_tag_end(
                            doc,
                            tag,
                            &mut dest,
                            exceptions,
                            urls_tbl,
                            emails_tbl,
                            &mut cur_level,
                            &mut content_tag,
                            &mut href_offset,
                            &mut cur_url,
                            &mut save_space,
                        );
                        if state == State::ContentWrite {
                            need_decode = false;
                        }
                    }
                }
                i += 1;
                c = i;
            }
        }
    }

    // EOF flushes the pending text run like a tag boundary would.
    if state == State::ContentWrite && c < len {
        flush_run(&mut dest, &input[c..len], need_decode);
    }

    dest
}

fn flush_run(dest: &mut Vec<u8>, run: &[u8], need_decode: bool) {
    if run.is_empty() {
        return;
    }
    if need_decode {
        let at = dest.len();
        dest.extend_from_slice(run);
        let decoded = decode_entities_in_place(&mut dest[at..]);
        dest.truncate(at + decoded);
    } else {
        dest.extend_from_slice(run);
    }
}

/// Force a CRLF into the output unless it already ends a line, and record
/// the region as a newline exception.
fn synth_newline(dest: &mut Vec<u8>, exceptions: &mut Vec<ProcessException>) {
    if !dest.is_empty() && dest.last() != Some(&b'\n') {
        exceptions.push(ProcessException {
            pos: dest.len(),
            len: 2,
            kind: ExceptionKind::Newline,
        });
        dest.extend_from_slice(b"\r\n");
    }
}

/// Insert a parsed tag into the tree (or decline to, past the cap),
/// maintaining the open cursor, balance state and ignore propagation.
///
/// Returns whether subsequent content should be written, plus the tag's
/// fate.
fn process_tag(
    doc: &mut HtmlDocument,
    mut tag: HtmlTag,
    cur_level: &mut NodeId,
    balanced: &mut bool,
) -> (bool, Processed) {
    let max_tags = doc.config.max_tags;
    doc.total_tags += 1;
    if doc.total_tags > max_tags {
        doc.flags |= doc_flags::TOO_MANY_TAGS;
        log::debug!(target: "html.document", "tag cap reached, structural tracking stopped");
    }
    let can_alloc = doc.total_tags <= max_tags;

    let Some(id) = tag.id else {
        return (false, Processed::Dropped(tag));
    };

    if tag.flags & CM_INLINE == 0 {
        // Block-path tag.
        if tag.flags & (FL_CLOSING | FL_CLOSED) != 0 {
            let is_closing = tag.flags & FL_CLOSING != 0;
            if can_alloc {
                let node = doc.tree.alloc_child(*cur_level, tag);
                return match doc.tree.check_balance(node) {
                    Some(level) => {
                        *cur_level = level;
                        *balanced = true;
                        if is_closing {
                            // Pure closing marker, discarded by repair.
                            (true, Processed::Consumed)
                        } else {
                            (true, Processed::Node(node))
                        }
                    }
                    None => {
                        log::debug!(
                            target: "html.document",
                            "unpairable closing tag {:?}", id
                        );
                        doc.flags |= doc_flags::UNBALANCED;
                        *balanced = false;
                        (true, Processed::Node(node))
                    }
                };
            }
            return (true, Processed::Consumed);
        }

        // Opening block-path tag.
        if let Some(parent) = doc.tree.tag(*cur_level) {
            let parent_flags = parent.flags;
            let parent_id = parent.id;
            if parent_flags & FL_IGNORE != 0 {
                tag.flags |= FL_IGNORE;
            }
            if tag.flags & FL_CLOSED == 0
                && parent_flags & FL_BLOCK == 0
                && parent_id == Some(id)
            {
                // Improper nesting of the same un-closed tag, like
                // <a>bla<a>foo: hang the new tag off the grandparent.
                doc.flags |= doc_flags::UNBALANCED;
                *balanced = false;
                let grandparent = doc.tree.parent(*cur_level).unwrap_or(TagTree::ROOT);
                if can_alloc {
                    let node = doc.tree.alloc_child(grandparent, tag);
                    *cur_level = node;
                    return (true, Processed::Node(node));
                }
                return (true, Processed::Dropped(tag));
            }
        }

        let keep_open = tag.flags & FL_CLOSED == 0;
        let hidden = tag.flags & (CM_HEAD | FL_IGNORE) != 0;
        if hidden {
            tag.flags |= FL_IGNORE;
        }
        if can_alloc {
            let node = doc.tree.alloc_child(*cur_level, tag);
            if keep_open {
                *cur_level = node;
            }
            return (!hidden, Processed::Node(node));
        }
        (!hidden, Processed::Dropped(tag))
    } else {
        // Inline tag: keeps a parent chain for color inheritance but is
        // not linked into any child list.
        let parent_flags = doc
            .tree
            .tag(*cur_level)
            .map(|parent| parent.flags)
            .unwrap_or(0);
        let hidden = parent_flags & (CM_HEAD | FL_IGNORE) != 0;
        if hidden {
            tag.flags |= FL_IGNORE;
        }
        if can_alloc {
            let node = doc.tree.alloc_detached(*cur_level, tag);
            return (!hidden, Processed::Node(node));
        }
        (!hidden, Processed::Dropped(tag))
    }
}

fn href_of<'a>(doc: &'a HtmlDocument, processed: &'a Processed) -> Option<&'a [u8]> {
    match processed {
        Processed::Node(node) => doc.tree.tag(*node)?.href(),
        Processed::Dropped(tag) => tag.href(),
        Processed::Consumed => None,
    }
}

/// All tag-close side effects: tree insertion, uniqueness tracking,
/// newline synthesis, URL registration and anchor correlation, image and
/// block extraction. Returns the content state to continue in.
#[allow(clippy::too_many_arguments)]
fn handle_tag_end(
    doc: &mut HtmlDocument,
    tag: HtmlTag,
    dest: &mut Vec<u8>,
    exceptions: &mut Vec<ProcessException>,
    urls_tbl: &mut UrlTable,
    emails_tbl: &mut UrlTable,
    cur_level: &mut NodeId,
    content_tag: &mut Option<NodeId>,
    href_offset: &mut Option<usize>,
    cur_url: &mut Option<UrlRef>,
    save_space: &mut bool,
) -> State {
    let id = tag.id;
    let tag_flags = tag.flags;
    let mut balanced = true;

    let (emit, processed) = process_tag(doc, tag, cur_level, &mut balanced);
    let mut state = if emit {
        State::ContentWrite
    } else {
        State::ContentIgnore
    };

    if let Some(tag_id) = id {
        // A closer is not a second occurrence of a must-appear-once tag.
        if tag_flags & FL_CLOSING == 0
            && tag_flags & CM_UNIQUE != 0
            && doc.is_seen(tag_id)
        {
            doc.flags |= doc_flags::DUPLICATE_ELEMENTS;
        }
        doc.mark_seen(tag_id);
    }

    let node = match &processed {
        Processed::Node(node) => Some(*node),
        _ => None,
    };
    if tag_flags & (FL_CLOSED | FL_CLOSING) == 0 {
        *content_tag = node;
    }

    // Newline synthesis.
    if matches!(id, Some(TagId::Br) | Some(TagId::Hr)) {
        synth_newline(dest, exceptions);
        *save_space = false;
    } else if tag_flags & (FL_CLOSED | FL_CLOSING) != 0
        && matches!(id, Some(TagId::P) | Some(TagId::Tr) | Some(TagId::Div))
        && balanced
    {
        synth_newline(dest, exceptions);
        *save_space = false;
    }

    // Hyperlink targets: anchors, iframes, and link elements.
    if matches!(id, Some(TagId::A) | Some(TagId::Iframe) | Some(TagId::Link)) {
        if tag_flags & FL_CLOSING == 0 {
            let parsed = href_of(doc, &processed).and_then(process_url);
            if let Some(record) = parsed {
                let mailto = record.is_mailto();
                let (index, existed) = if mailto {
                    emails_tbl.lookup_or_insert(record)
                } else {
                    urls_tbl.lookup_or_insert(record)
                };
                let url_ref = UrlRef { mailto, index };
                if !existed {
                    process_query_url(url_ref, urls_tbl, emails_tbl);
                }
                if let Some(node) = node
                    && let Some(tag) = doc.tree.tag_mut(node)
                {
                    tag.extra = Extra::Url(url_ref);
                }
                if id != Some(TagId::Link) {
                    // A repeated URL only bumps the count; its display
                    // text is not re-examined.
                    *cur_url = (!existed).then_some(url_ref);
                    *href_offset = Some(dest.len());
                }
            }
        }

        if id == Some(TagId::A) {
            // Malformed-markup recovery: an unbalanced sibling anchor
            // gets its display text checked when the next one opens.
            if !balanced
                && let Some(node) = node
                && let Some(prev) = doc.tree.prev_sibling(node)
            {
                let prev_url = doc.tree.tag(prev).and_then(|prev_tag| {
                    if prev_tag.id == Some(TagId::A) && prev_tag.flags & FL_CLOSING == 0 {
                        match prev_tag.extra {
                            Extra::Url(url_ref) => Some(url_ref),
                            _ => None,
                        }
                    } else {
                        None
                    }
                });
                if let Some(prev_url) = prev_url
                    && let Some(offset) = *href_offset
                {
                    check_displayed_url(exceptions, urls_tbl, emails_tbl, dest, offset, prev_url);
                }
            }

            if tag_flags & FL_CLOSING != 0 {
                if let (Some(url_ref), Some(offset)) = (*cur_url, *href_offset)
                    && dest.len() > offset
                {
                    check_displayed_url(exceptions, urls_tbl, emails_tbl, dest, offset, url_ref);
                }
                *href_offset = None;
                *cur_url = None;
            }
        }
    }

    if id == Some(TagId::Img) && tag_flags & FL_CLOSING == 0 {
        if let Some(node) = node {
            extract::process_img_tag(doc, node);
        }
    } else if tag_flags & FL_CLOSING == 0 && tag_flags & FL_BLOCK != 0 {
        if let Some(node) = node {
            let visible = extract::process_block_tag(doc, node);
            if !visible {
                if let Some(tag) = doc.tree.tag_mut(node) {
                    tag.flags |= FL_IGNORE;
                }
                state = State::ContentIgnore;
            }
        }
    }

    // A closing tag inside a hidden subtree must not resume emission.
    if state == State::ContentWrite
        && doc
            .tree
            .tag(*cur_level)
            .is_some_and(|open| open.flags & FL_IGNORE != 0)
    {
        state = State::ContentIgnore;
    }

    state
}

/// Prepare a tag's href/src bytes for the URL grammar: trim whitespace,
/// strip embedded CR/LF, percent-encode non-graphic ASCII, default the
/// scheme when no `:` byte is present anywhere in the span, then
/// Unicode-normalize and parse.
fn process_url(raw: &[u8]) -> Option<UrlRecord> {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let start = raw.iter().position(|b| !b.is_ascii_whitespace())?;
    let end = raw.iter().rposition(|b| !b.is_ascii_whitespace())? + 1;
    let trimmed = &raw[start..end];

    // Literal schemeless check: no ':' anywhere. A port-like colon in an
    // odd position therefore suppresses prefixing; documented edge case.
    let no_prefix = memchr(b':', trimmed).is_none();

    let mut buf: Vec<u8> = Vec::with_capacity(trimmed.len() + 8);
    if no_prefix {
        if trimmed.len() > 2 && trimmed[0] == b'/' && trimmed[1] == b'/' {
            buf.extend_from_slice(b"http:");
        } else {
            buf.extend_from_slice(b"http://");
        }
    }

    let mut has_bad_chars = false;
    for &byte in trimmed {
        if byte == b'\r' || byte == b'\n' {
            continue;
        }
        if byte < 0x80 && !byte.is_ascii_graphic() {
            buf.push(b'%');
            buf.push(HEX[usize::from(byte >> 4)]);
            buf.push(HEX[usize::from(byte & 0xf)]);
            has_bad_chars = true;
        } else {
            buf.push(byte);
        }
    }

    let text = String::from_utf8_lossy(&buf);
    let (normalized, changed) = nfc_normalize(&text);

    let mut record = match UrlRecord::parse(&normalized) {
        Ok(record) => record,
        Err(err) => {
            log::debug!(target: "html.document", "url extraction failed: {err:?}");
            return None;
        }
    };
    if changed {
        record.flags |= url_flags::UNNORMALISED;
    }
    if has_bad_chars {
        record.flags |= url_flags::OBSCURED;
    }
    if no_prefix {
        record.flags |= url_flags::SCHEMELESS;
    }
    Some(record)
}

/// Recover a URL embedded in the query string of a just-registered URL
/// and cross-propagate obfuscation flags.
fn process_query_url(target: UrlRef, urls_tbl: &mut UrlTable, emails_tbl: &mut UrlTable) {
    let query = {
        let table = if target.mailto { &*emails_tbl } else { &*urls_tbl };
        let Some(record) = table.get(target.index) else {
            return;
        };
        if record.flags & url_flags::UNNORMALISED != 0 {
            // An unnormalised URL is treated as obscured from here on.
            let table = if target.mailto {
                &mut *emails_tbl
            } else {
                &mut *urls_tbl
            };
            if let Some(record) = table.get_mut(target.index) {
                record.flags |= url_flags::OBSCURED;
            }
        }
        let table = if target.mailto { &*emails_tbl } else { &*urls_tbl };
        table
            .get(target.index)
            .and_then(|record| record.query().map(|q| q.as_bytes().to_vec()))
    };

    let Some(query) = query else { return };
    let Some(found) = urls::find_url(&query) else {
        return;
    };
    let mut inner = found.record;
    log::debug!(
        target: "html.document",
        "found url {} in query", inner.text()
    );
    if found.prefix_added {
        inner.flags |= url_flags::SCHEMELESS;
    }

    let inner_bad = inner.flags
        & (url_flags::UNNORMALISED | url_flags::OBSCURED | url_flags::NUMERIC)
        != 0;
    {
        let table = if target.mailto {
            &mut *emails_tbl
        } else {
            &mut *urls_tbl
        };
        if let Some(record) = table.get_mut(target.index) {
            if inner_bad {
                record.flags |= url_flags::OBSCURED;
            }
            if record.flags & url_flags::OBSCURED != 0 {
                inner.flags |= url_flags::OBSCURED;
            }
        }
    }

    let table = if inner.is_mailto() {
        emails_tbl
    } else {
        urls_tbl
    };
    table.lookup_or_insert(inner);
}

/// Judge an anchor's displayed text against its target and register the
/// displayed URL.
fn check_displayed_url(
    exceptions: &mut Vec<ProcessException>,
    urls_tbl: &mut UrlTable,
    emails_tbl: &mut UrlTable,
    dest: &[u8],
    offset: usize,
    target: UrlRef,
) {
    let target_record = {
        let table = if target.mailto { &*emails_tbl } else { &*urls_tbl };
        match table.get(target.index) {
            Some(record) => record.clone(),
            None => return,
        }
    };

    let Some(mut shown) = phishing::check_displayed_text(&target_record, &dest[offset..]) else {
        return;
    };

    exceptions.push(ProcessException {
        pos: offset,
        len: dest.len() - offset,
        kind: ExceptionKind::Url,
    });

    if shown.mismatch {
        let table = if target.mailto {
            &mut *emails_tbl
        } else {
            &mut *urls_tbl
        };
        if let Some(record) = table.get_mut(target.index) {
            phishing::mark_phished(record, &mut shown.record);
        }
    }

    let table = if shown.record.is_mailto() {
        emails_tbl
    } else {
        urls_tbl
    };
    let (index, existed) = table.lookup_or_insert(shown.record);
    if existed
        && let Some(record) = table.get_mut(index)
        && record.flags & url_flags::FROM_TEXT != 0
    {
        // Same URL seen in a plain-text part: displayed HTML text is
        // corroborating, not primary, evidence.
        record.flags |= url_flags::HTML_DISPLAYED;
        record.flags &= !url_flags::FROM_TEXT;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> (HtmlDocument, String) {
        let mut doc = HtmlDocument::new();
        let text = process_part(&mut doc, input.as_bytes());
        (doc, String::from_utf8_lossy(&text).into_owned())
    }

    #[test]
    fn plain_content_without_tags_sets_bad_start() {
        let (doc, text) = parse("hello world");
        assert!(doc.flags & doc_flags::BAD_START != 0);
        assert_eq!(text, "hello world");
    }

    #[test]
    fn whitespace_collapses_to_single_spaces() {
        let (_, text) = parse("<p>a   b\n\t c</p>");
        assert_eq!(text, "a b c\r\n");
    }

    #[test]
    fn deferred_entity_decoding_applies_to_runs() {
        let (_, text) = parse("<p>a &amp; b</p>");
        assert_eq!(text, "a & b\r\n");
    }

    #[test]
    fn newline_synthesis_on_br_and_closing_blocks() {
        let (_, text) = parse("<p>one<br>two</p>");
        assert_eq!(text, "one\r\ntwo\r\n");

        let (_, text) = parse("<div>a</div><div>b</div>");
        assert_eq!(text, "a\r\nb\r\n");
    }

    #[test]
    fn head_subtree_content_is_ignored() {
        let (_, text) = parse("<html><head><title>skip me</title></head><body>keep</body></html>");
        assert_eq!(text, "keep");
    }

    #[test]
    fn script_and_style_content_is_ignored() {
        let (_, text) = parse("<body>a<script>var x = 1;</script>b<style>p{}</style>c</body>");
        assert_eq!(text, "abc");
    }

    #[test]
    fn comments_and_declarations_produce_no_text() {
        let (doc, text) = parse("<!DOCTYPE html><!-- secret -->(<?xml version=\"1.0\"?>)");
        assert_eq!(text, "()");
        assert!(doc.flags & doc_flags::XML != 0);
    }

    #[test]
    fn compound_sgml_sections_are_skipped() {
        let (_, text) = parse("<![CDATA[ not text ]]>after");
        assert_eq!(text, "after");
    }

    #[test]
    fn unique_tag_duplication_is_flagged() {
        let (doc, _) = parse("<html><title>a</title><title>b</title></html>");
        assert!(doc.flags & doc_flags::DUPLICATE_ELEMENTS != 0);
        assert!(doc.tag_seen("title"));
        assert!(!doc.tag_seen("img"));
    }

    #[test]
    fn unbalanced_close_is_flagged_but_parsing_continues() {
        let (doc, text) = parse("<div>a</table>b</div>");
        assert!(doc.flags & doc_flags::UNBALANCED != 0);
        assert!(text.starts_with("a"));
        assert!(text.contains('b'));
    }

    #[test]
    fn well_formed_nesting_never_flags_unbalanced() {
        let (doc, _) = parse("<html><body><div><p>x</p><ul><li>y</li></ul></div></body></html>");
        assert_eq!(doc.flags & doc_flags::UNBALANCED, 0);
    }

    #[test]
    fn trailing_text_is_flushed_at_eof() {
        let (_, text) = parse("<b>bold</b> tail");
        assert_eq!(text, "bold tail");
    }

    #[test]
    fn unterminated_tag_is_discarded() {
        let (_, text) = parse("<p>keep</p><a href=\"http://x");
        assert_eq!(text, "keep\r\n");
    }

    #[test]
    fn display_none_subtree_emits_no_text() {
        let (doc, text) = parse("<div style=\"display:none\">hidden text</div>visible");
        assert_eq!(text, "visible");
        let block = doc.blocks().next().expect("block record");
        assert!(!block.visible);
    }

    #[test]
    fn display_none_propagates_through_nested_markup() {
        let (_, text) = parse("<div style=\"display:none\">a<p>b</p>c</div><p>keep</p>");
        assert_eq!(text, "keep\r\n");
    }

    #[test]
    fn process_url_defaults_scheme() {
        let url = process_url(b"example.com/page").unwrap();
        assert!(url.flags & url_flags::SCHEMELESS != 0);
        assert_eq!(url.host(), "example.com");

        let url = process_url(b"//example.com/page").unwrap();
        assert!(url.flags & url_flags::SCHEMELESS != 0);
        assert_eq!(url.text(), "http://example.com/page");

        let url = process_url(b"http://example.com/").unwrap();
        assert!(url.flags & url_flags::SCHEMELESS == 0);
    }

    #[test]
    fn process_url_colon_anywhere_suppresses_prefixing() {
        // Any ':' counts as a scheme separator, so this parses as a
        // scheme of "example.com" rather than a host with a port.
        let url = process_url(b"example.com:80/x");
        assert!(url.is_none() || url.unwrap().flags & url_flags::SCHEMELESS == 0);
    }

    #[test]
    fn process_url_encodes_unsafe_bytes_and_strips_newlines() {
        let url = process_url(b"http://example.com/a b").unwrap();
        assert!(url.flags & url_flags::OBSCURED != 0);
        assert!(url.text().contains("a%20b"));

        let url = process_url(b"http://exam\r\nple.com/").unwrap();
        assert_eq!(url.host(), "example.com");
        assert!(url.flags & url_flags::OBSCURED == 0);
    }

    #[test]
    fn anchor_urls_are_registered_with_counts() {
        let mut doc = HtmlDocument::new();
        let mut exceptions = Vec::new();
        let mut urls_tbl = UrlTable::new();
        let mut emails_tbl = UrlTable::new();
        process_part_full(
            &mut doc,
            b"<a href=\"http://x.example/\">one</a>\
              <a href=\"http://x.example/\">two</a>\
              <a href=\"mailto:a@b.example\">mail</a>",
            &mut exceptions,
            &mut urls_tbl,
            &mut emails_tbl,
        );
        assert_eq!(urls_tbl.len(), 1);
        let record = urls_tbl.iter().next().unwrap();
        assert_eq!(record.count, 2);
        assert_eq!(emails_tbl.len(), 1);
        assert!(emails_tbl.iter().next().unwrap().is_mailto());
    }

    #[test]
    fn tag_cap_bounds_tree_growth() {
        let mut input = String::new();
        for _ in 0..5000 {
            input.push_str("<div>x</div>");
        }
        // 10_000 tag occurrences exceed the cap.
        let (doc, _) = parse(&input);
        assert!(doc.flags & doc_flags::TOO_MANY_TAGS != 0);
        assert!(doc.tree.len() - 1 <= DEFAULT_MAX_TAGS);
        assert!(doc.total_tags > DEFAULT_MAX_TAGS);
    }

    #[test]
    fn small_cap_config_is_honored() {
        let mut doc = HtmlDocument::with_config(ParserConfig { max_tags: 4 });
        let text = process_part(&mut doc, b"<div>a</div><div>b</div><div>c</div>");
        assert!(doc.flags & doc_flags::TOO_MANY_TAGS != 0);
        assert!(!text.is_empty());
    }

    #[test]
    fn bad_nesting_of_identical_tags_is_recovered() {
        let (doc, _) = parse("<a href=\"http://a.example/\">one<a href=\"http://b.example/\">two");
        assert!(doc.flags & doc_flags::UNBALANCED != 0);
        // Both anchors end up as siblings of the root, not nested.
        assert_eq!(doc.tree.children(TagTree::ROOT).len(), 2);
    }

    #[test]
    fn images_are_collected_with_dimensions() {
        let (doc, _) = parse(
            "<img src=\"cid:inline@example\" width=10 height=20>\
             <img src=\"http://x.example/p.png\" style=\"width: 100; height: 50\">",
        );
        let images: Vec<_> = doc.images().collect();
        assert_eq!(images.len(), 2);
        assert!(images[0].embedded);
        assert_eq!((images[0].width, images[0].height), (10, 20));
        assert!(!images[1].embedded);
        assert_eq!((images[1].width, images[1].height), (100, 50));
    }

    #[test]
    fn block_colors_resolve_with_inheritance_and_defaults() {
        let (doc, _) = parse(
            "<body bgcolor=\"#101010\"><div color=\"red\"><p>text</p></div></body>",
        );
        for block in doc.blocks() {
            assert!(block.font_color.valid, "font color must always resolve");
            assert!(
                block.background_color.valid,
                "background color must always resolve"
            );
        }
        // The <p> inherits background from <body> through the chain.
        let p_block = doc.blocks().last().unwrap();
        assert_eq!(p_block.background_color.value(), 0x101010);
        assert_eq!(doc.bgcolor.value(), 0x101010);
    }

    #[test]
    fn phishing_example_flags_href_url() {
        let mut doc = HtmlDocument::new();
        let mut exceptions = Vec::new();
        let mut urls_tbl = UrlTable::new();
        let mut emails_tbl = UrlTable::new();
        process_part_full(
            &mut doc,
            b"<a href=\"http://good-bank.com\">http://evil-bank.net</a>",
            &mut exceptions,
            &mut urls_tbl,
            &mut emails_tbl,
        );

        let target = urls_tbl
            .iter()
            .find(|u| u.host() == "good-bank.com")
            .expect("target registered");
        assert!(target.flags & url_flags::PHISHED != 0);
        assert_eq!(
            target.phished_url.as_ref().map(|u| u.host()),
            Some("evil-bank.net")
        );

        let displayed = urls_tbl
            .iter()
            .find(|u| u.host() == "evil-bank.net")
            .expect("displayed registered");
        assert!(displayed.flags & url_flags::HTML_DISPLAYED != 0);
        assert_eq!(displayed.tags[0].name, "phishing");
        assert_eq!(displayed.tags[0].value, "evil-bank.net");

        assert!(
            exceptions
                .iter()
                .any(|e| e.kind == ExceptionKind::Url && e.len > 0),
            "displayed url region must be excepted from tokenization"
        );
    }

    #[test]
    fn subdomain_display_is_not_phishing() {
        let mut doc = HtmlDocument::new();
        let mut exceptions = Vec::new();
        let mut urls_tbl = UrlTable::new();
        let mut emails_tbl = UrlTable::new();
        process_part_full(
            &mut doc,
            b"<a href=\"http://sub.good-bank.com\">http://good-bank.com</a>",
            &mut exceptions,
            &mut urls_tbl,
            &mut emails_tbl,
        );
        for url in urls_tbl.iter() {
            assert!(
                url.flags & url_flags::PHISHED == 0,
                "superdomain display must not flag: {}",
                url.text()
            );
        }
    }

    #[test]
    fn query_urls_are_recovered() {
        let mut doc = HtmlDocument::new();
        let mut exceptions = Vec::new();
        let mut urls_tbl = UrlTable::new();
        let mut emails_tbl = UrlTable::new();
        process_part_full(
            &mut doc,
            b"<a href=\"http://redirect.example/?to=http://target.example/x\">go</a>",
            &mut exceptions,
            &mut urls_tbl,
            &mut emails_tbl,
        );
        assert!(urls_tbl.iter().any(|u| u.host() == "redirect.example"));
        assert!(urls_tbl.iter().any(|u| u.host() == "target.example"));
    }

    #[test]
    fn anchor_text_exception_covers_displayed_region() {
        let mut doc = HtmlDocument::new();
        let mut exceptions = Vec::new();
        let mut urls_tbl = UrlTable::new();
        let mut emails_tbl = UrlTable::new();
        let text = process_part_full(
            &mut doc,
            b"intro <a href=\"http://a.example/\">http://b.example/</a>",
            &mut exceptions,
            &mut urls_tbl,
            &mut emails_tbl,
        );
        let url_ex = exceptions
            .iter()
            .find(|e| e.kind == ExceptionKind::Url)
            .expect("url exception present");
        // The region starts at the anchor's href offset, which precedes
        // the collapsed space emitted before the displayed text.
        let covered = &text[url_ex.pos..url_ex.pos + url_ex.len];
        assert_eq!(covered, b" http://b.example/");
        assert_eq!(url_ex.pos + url_ex.len, text.len());
    }
}
