//! Static tag definitions and content-model flags.
//!
//! The table covers the legacy mail-era element set (W3C plus the
//! proprietary elements that still show up in spam). Lookups are binary
//! searches over two sorted views built once on first use: by
//! (length, case-insensitive name) and by numeric id.

use std::cmp::Ordering;
use std::sync::OnceLock;

/// Content-model flags, shared with per-instance runtime flags in one
/// `u32` bitset per tag.
pub const CM_EMPTY: u32 = 1 << 0;
pub const CM_HTML: u32 = 1 << 1;
pub const CM_HEAD: u32 = 1 << 2;
pub const CM_BLOCK: u32 = 1 << 3;
pub const CM_INLINE: u32 = 1 << 4;
pub const CM_LIST: u32 = 1 << 5;
pub const CM_DEFLIST: u32 = 1 << 6;
pub const CM_TABLE: u32 = 1 << 7;
pub const CM_ROWGRP: u32 = 1 << 8;
pub const CM_ROW: u32 = 1 << 9;
pub const CM_FIELD: u32 = 1 << 10;
pub const CM_OBJECT: u32 = 1 << 11;
pub const CM_PARAM: u32 = 1 << 12;
pub const CM_FRAMES: u32 = 1 << 13;
pub const CM_HEADING: u32 = 1 << 14;
pub const CM_OPT: u32 = 1 << 15;
pub const CM_IMG: u32 = 1 << 16;
pub const CM_MIXED: u32 = 1 << 17;
pub const CM_NO_INDENT: u32 = 1 << 18;
pub const CM_OBSOLETE: u32 = 1 << 19;
pub const CM_OMITST: u32 = 1 << 20;
pub const CM_UNIQUE: u32 = 1 << 21;

/// Runtime flags carried by tag instances.
pub const FL_BLOCK: u32 = 1 << 23;
pub const FL_CLOSING: u32 = 1 << 24;
pub const FL_CLOSED: u32 = 1 << 25;
pub const FL_BROKEN: u32 = 1 << 26;
pub const FL_IGNORE: u32 = 1 << 27;

/// Numeric tag identity; discriminants are dense and monotonic so a
/// per-document "tags seen" bitset can be indexed by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum TagId {
    A,
    Abbr,
    Acronym,
    Address,
    Applet,
    Area,
    B,
    Base,
    Basefont,
    Bdo,
    Big,
    Blockquote,
    Body,
    Br,
    Button,
    Caption,
    Center,
    Cite,
    Code,
    Col,
    Colgroup,
    Dd,
    Del,
    Dfn,
    Dir,
    Div,
    Dl,
    Dt,
    Em,
    Fieldset,
    Font,
    Form,
    Frame,
    Frameset,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Head,
    Hr,
    Html,
    I,
    Iframe,
    Img,
    Input,
    Ins,
    Isindex,
    Kbd,
    Label,
    Legend,
    Li,
    Link,
    Listing,
    Map,
    Menu,
    Meta,
    Noframes,
    Noscript,
    Object,
    Ol,
    Optgroup,
    Option,
    P,
    Param,
    Plaintext,
    Pre,
    Q,
    Rb,
    Rbc,
    Rp,
    Rt,
    Rtc,
    Ruby,
    S,
    Samp,
    Script,
    Select,
    Small,
    Span,
    Strike,
    Strong,
    Style,
    Sub,
    Sup,
    Table,
    Tbody,
    Td,
    Textarea,
    Tfoot,
    Th,
    Thead,
    Title,
    Tr,
    Tt,
    U,
    Ul,
    Var,
    Xmp,
    Nextid,
    Align,
    Bgsound,
    Blink,
    Comment,
    Embed,
    Ilayer,
    Keygen,
    Layer,
    Marquee,
    Multicol,
    Nobr,
    Noembed,
    Nolayer,
    Nosave,
    Server,
    Servlet,
    Spacer,
    Wbr,
}

pub const TAG_COUNT: usize = TAG_DEFS.len();

#[derive(Clone, Copy, Debug)]
pub struct TagDef {
    pub name: &'static str,
    pub id: TagId,
    pub flags: u32,
}

macro_rules! tag_def {
    ($id:ident, $name:literal, $flags:expr) => {
        TagDef {
            name: $name,
            id: TagId::$id,
            flags: $flags,
        }
    };
}

const TAG_DEFS: &[TagDef] = &[
    // W3C defined elements
    tag_def!(A, "a", 0),
    tag_def!(Abbr, "abbr", CM_INLINE),
    tag_def!(Acronym, "acronym", CM_INLINE),
    tag_def!(Address, "address", CM_BLOCK),
    tag_def!(Applet, "applet", CM_OBJECT | CM_IMG | CM_INLINE | CM_PARAM),
    tag_def!(Area, "area", CM_BLOCK | CM_EMPTY),
    tag_def!(B, "b", CM_INLINE | FL_BLOCK),
    tag_def!(Base, "base", CM_HEAD | CM_EMPTY),
    tag_def!(Basefont, "basefont", CM_INLINE | CM_EMPTY),
    tag_def!(Bdo, "bdo", CM_INLINE),
    tag_def!(Big, "big", CM_INLINE),
    tag_def!(Blockquote, "blockquote", CM_BLOCK),
    tag_def!(Body, "body", CM_HTML | CM_OPT | CM_OMITST | CM_UNIQUE | FL_BLOCK),
    tag_def!(Br, "br", CM_INLINE | CM_EMPTY),
    tag_def!(Button, "button", CM_INLINE | FL_BLOCK),
    tag_def!(Caption, "caption", CM_TABLE),
    tag_def!(Center, "center", CM_BLOCK),
    tag_def!(Cite, "cite", CM_INLINE),
    tag_def!(Code, "code", CM_INLINE),
    tag_def!(Col, "col", CM_TABLE | CM_EMPTY),
    tag_def!(Colgroup, "colgroup", CM_TABLE | CM_OPT),
    tag_def!(Dd, "dd", CM_DEFLIST | CM_OPT | CM_NO_INDENT),
    tag_def!(Del, "del", CM_INLINE | CM_BLOCK | CM_MIXED),
    tag_def!(Dfn, "dfn", CM_INLINE),
    tag_def!(Dir, "dir", CM_BLOCK | CM_OBSOLETE),
    tag_def!(Div, "div", CM_BLOCK | FL_BLOCK),
    tag_def!(Dl, "dl", CM_BLOCK | FL_BLOCK),
    tag_def!(Dt, "dt", CM_DEFLIST | CM_OPT | CM_NO_INDENT),
    tag_def!(Em, "em", CM_INLINE),
    tag_def!(Fieldset, "fieldset", CM_BLOCK),
    tag_def!(Font, "font", FL_BLOCK),
    tag_def!(Form, "form", CM_BLOCK),
    tag_def!(Frame, "frame", CM_FRAMES | CM_EMPTY),
    tag_def!(Frameset, "frameset", CM_HTML | CM_FRAMES),
    tag_def!(H1, "h1", CM_BLOCK | CM_HEADING),
    tag_def!(H2, "h2", CM_BLOCK | CM_HEADING),
    tag_def!(H3, "h3", CM_BLOCK | CM_HEADING),
    tag_def!(H4, "h4", CM_BLOCK | CM_HEADING),
    tag_def!(H5, "h5", CM_BLOCK | CM_HEADING),
    tag_def!(H6, "h6", CM_BLOCK | CM_HEADING),
    tag_def!(Head, "head", CM_HTML | CM_OPT | CM_OMITST | CM_UNIQUE),
    tag_def!(Hr, "hr", CM_BLOCK | CM_EMPTY),
    tag_def!(Html, "html", CM_HTML | CM_OPT | CM_OMITST | CM_UNIQUE),
    tag_def!(I, "i", CM_INLINE),
    tag_def!(Iframe, "iframe", 0),
    tag_def!(Img, "img", CM_INLINE | CM_IMG | CM_EMPTY),
    tag_def!(Input, "input", CM_INLINE | CM_IMG | CM_EMPTY),
    tag_def!(Ins, "ins", CM_INLINE | CM_BLOCK | CM_MIXED),
    tag_def!(Isindex, "isindex", CM_BLOCK | CM_EMPTY),
    tag_def!(Kbd, "kbd", CM_INLINE),
    tag_def!(Label, "label", CM_INLINE),
    tag_def!(Legend, "legend", CM_INLINE),
    tag_def!(Li, "li", CM_LIST | CM_OPT | CM_NO_INDENT | FL_BLOCK),
    tag_def!(Link, "link", CM_HEAD | CM_EMPTY),
    tag_def!(Listing, "listing", CM_BLOCK | CM_OBSOLETE),
    tag_def!(Map, "map", CM_INLINE),
    tag_def!(Menu, "menu", CM_BLOCK | CM_OBSOLETE),
    tag_def!(Meta, "meta", CM_HEAD | CM_INLINE | CM_EMPTY),
    tag_def!(Noframes, "noframes", CM_BLOCK | CM_FRAMES),
    tag_def!(Noscript, "noscript", CM_BLOCK | CM_INLINE | CM_MIXED),
    tag_def!(Object, "object", CM_OBJECT | CM_HEAD | CM_IMG | CM_INLINE | CM_PARAM),
    tag_def!(Ol, "ol", CM_BLOCK | FL_BLOCK),
    tag_def!(Optgroup, "optgroup", CM_FIELD | CM_OPT),
    tag_def!(Option, "option", CM_FIELD | CM_OPT),
    tag_def!(P, "p", CM_BLOCK | CM_OPT | FL_BLOCK),
    tag_def!(Param, "param", CM_INLINE | CM_EMPTY),
    tag_def!(Plaintext, "plaintext", CM_BLOCK | CM_OBSOLETE),
    tag_def!(Pre, "pre", CM_BLOCK),
    tag_def!(Q, "q", CM_INLINE),
    tag_def!(Rb, "rb", CM_INLINE),
    tag_def!(Rbc, "rbc", CM_INLINE),
    tag_def!(Rp, "rp", CM_INLINE),
    tag_def!(Rt, "rt", CM_INLINE),
    tag_def!(Rtc, "rtc", CM_INLINE),
    tag_def!(Ruby, "ruby", CM_INLINE),
    tag_def!(S, "s", CM_INLINE),
    tag_def!(Samp, "samp", CM_INLINE),
    tag_def!(Script, "script", CM_HEAD | CM_MIXED),
    tag_def!(Select, "select", CM_INLINE | CM_FIELD),
    tag_def!(Small, "small", CM_INLINE),
    tag_def!(Span, "span", CM_BLOCK | FL_BLOCK),
    tag_def!(Strike, "strike", CM_INLINE),
    tag_def!(Strong, "strong", CM_INLINE),
    tag_def!(Style, "style", CM_HEAD),
    tag_def!(Sub, "sub", CM_INLINE),
    tag_def!(Sup, "sup", CM_INLINE),
    tag_def!(Table, "table", CM_BLOCK | FL_BLOCK),
    tag_def!(Tbody, "tbody", CM_TABLE | CM_ROWGRP | CM_OPT | FL_BLOCK),
    tag_def!(Td, "td", CM_ROW | CM_OPT | CM_NO_INDENT | FL_BLOCK),
    tag_def!(Textarea, "textarea", CM_INLINE | CM_FIELD),
    tag_def!(Tfoot, "tfoot", CM_TABLE | CM_ROWGRP | CM_OPT),
    tag_def!(Th, "th", CM_ROW | CM_OPT | CM_NO_INDENT | FL_BLOCK),
    tag_def!(Thead, "thead", CM_TABLE | CM_ROWGRP | CM_OPT),
    tag_def!(Title, "title", CM_HEAD | CM_UNIQUE),
    tag_def!(Tr, "tr", CM_TABLE | CM_OPT | FL_BLOCK),
    tag_def!(Tt, "tt", CM_INLINE),
    tag_def!(U, "u", CM_INLINE),
    tag_def!(Ul, "ul", CM_BLOCK | FL_BLOCK),
    tag_def!(Var, "var", CM_INLINE),
    tag_def!(Xmp, "xmp", CM_BLOCK | CM_OBSOLETE),
    tag_def!(Nextid, "nextid", CM_HEAD | CM_EMPTY),
    // proprietary elements
    tag_def!(Align, "align", CM_BLOCK),
    tag_def!(Bgsound, "bgsound", CM_HEAD | CM_EMPTY),
    tag_def!(Blink, "blink", CM_INLINE),
    tag_def!(Comment, "comment", CM_INLINE),
    tag_def!(Embed, "embed", CM_INLINE | CM_IMG | CM_EMPTY),
    tag_def!(Ilayer, "ilayer", CM_INLINE),
    tag_def!(Keygen, "keygen", CM_INLINE | CM_EMPTY),
    tag_def!(Layer, "layer", CM_BLOCK),
    tag_def!(Marquee, "marquee", CM_INLINE | CM_OPT),
    tag_def!(Multicol, "multicol", CM_BLOCK),
    tag_def!(Nobr, "nobr", CM_INLINE),
    tag_def!(Noembed, "noembed", CM_INLINE),
    tag_def!(Nolayer, "nolayer", CM_BLOCK | CM_INLINE | CM_MIXED),
    tag_def!(Nosave, "nosave", CM_BLOCK),
    tag_def!(Server, "server", CM_HEAD | CM_MIXED | CM_BLOCK | CM_INLINE),
    tag_def!(Servlet, "servlet", CM_OBJECT | CM_IMG | CM_INLINE | CM_PARAM),
    tag_def!(Spacer, "spacer", CM_INLINE | CM_EMPTY),
    tag_def!(Wbr, "wbr", CM_INLINE | CM_EMPTY),
];

/// Sort key: length first, then case-insensitive lexicographic.
fn name_order(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| {
        a.bytes()
            .map(|c| c.to_ascii_lowercase())
            .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
    })
}

fn key_order(key: &[u8], name: &str) -> Ordering {
    key.len().cmp(&name.len()).then_with(|| {
        key.iter()
            .map(|c| c.to_ascii_lowercase())
            .cmp(name.bytes().map(|c| c.to_ascii_lowercase()))
    })
}

fn defs_by_name() -> &'static [&'static TagDef] {
    static BY_NAME: OnceLock<Vec<&'static TagDef>> = OnceLock::new();
    BY_NAME.get_or_init(|| {
        let mut defs: Vec<&TagDef> = TAG_DEFS.iter().collect();
        defs.sort_by(|a, b| name_order(a.name, b.name));
        defs
    })
}

fn defs_by_id() -> &'static [&'static TagDef] {
    static BY_ID: OnceLock<Vec<&'static TagDef>> = OnceLock::new();
    BY_ID.get_or_init(|| {
        let mut defs: Vec<&TagDef> = TAG_DEFS.iter().collect();
        defs.sort_by_key(|d| d.id);
        defs
    })
}

/// Look a tag up by its raw (case-insensitive) name bytes.
pub fn tag_by_name(name: &[u8]) -> Option<&'static TagDef> {
    let defs = defs_by_name();
    defs.binary_search_by(|d| key_order(name, d.name).reverse())
        .ok()
        .map(|i| defs[i])
}

/// Numeric id for `name`, when the tag is known.
pub fn tag_id_by_name(name: &str) -> Option<TagId> {
    tag_by_name(name.as_bytes()).map(|d| d.id)
}

/// Canonical name for `id`; ids increase monotonically across the table.
pub fn tag_name_by_id(id: TagId) -> &'static str {
    let defs = defs_by_id();
    match defs.binary_search_by_key(&id, |d| d.id) {
        Ok(i) => defs[i].name,
        // Unreachable for a valid TagId; kept total to avoid a panic path.
        Err(_) => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(tag_by_name(b"div").map(|d| d.id), Some(TagId::Div));
        assert_eq!(tag_by_name(b"DIV").map(|d| d.id), Some(TagId::Div));
        assert_eq!(tag_by_name(b"DiV").map(|d| d.id), Some(TagId::Div));
        assert!(tag_by_name(b"notatag").is_none());
        assert!(tag_by_name(b"").is_none());
    }

    #[test]
    fn every_definition_resolves_to_itself() {
        for def in TAG_DEFS {
            let found = tag_by_name(def.name.as_bytes())
                .unwrap_or_else(|| panic!("tag {:?} not found by name", def.name));
            assert_eq!(found.id, def.id, "name {:?} resolved to wrong id", def.name);
            assert_eq!(tag_name_by_id(def.id), def.name);
        }
    }

    #[test]
    fn ids_are_dense_and_monotonic() {
        for (i, def) in defs_by_id().iter().enumerate() {
            assert_eq!(def.id as usize, i);
        }
    }

    #[test]
    fn content_model_flags_match_roles() {
        assert!(tag_by_name(b"img").unwrap().flags & CM_EMPTY != 0);
        assert!(tag_by_name(b"div").unwrap().flags & FL_BLOCK != 0);
        assert!(tag_by_name(b"title").unwrap().flags & CM_UNIQUE != 0);
        assert!(tag_by_name(b"script").unwrap().flags & CM_HEAD != 0);
        assert_eq!(tag_by_name(b"a").unwrap().flags, 0);
    }
}
