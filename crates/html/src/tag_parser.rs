//! Tag content parsing: name and attribute list.
//!
//! The whole tag span (the bytes between `<` and the terminating `>`,
//! with a leading `/` already stripped by the document parser) is
//! available at once, so the state machine runs as a single
//! self-contained pass; a virtual trailing `>` drives the final
//! transitions. Malformed input degrades to the unknown-id sentinel and
//! document flags, never an error.

use crate::document::doc_flags;
use crate::entities::decode_entities;
use crate::tags::{self, FL_BROKEN, FL_CLOSED};
use crate::types::{Component, ComponentKind, HtmlTag};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    Name,
    SpacesAfterName,
    AttrName,
    SpacesBeforeEq,
    Equal,
    SpacesAfterEq,
    StartDquote,
    DqValue,
    EndDquote,
    StartSquote,
    SqValue,
    EndSquote,
    Value,
    SpacesAfterParam,
    IgnoreBadTag,
}

/// Recognize one attribute name against the allowlist and, when
/// recognized, append an empty component for it.
///
/// `src`/`href` always map to the URL slot; `width`/`height`/`style` only
/// on `<img>`; `color`/`style`/`class`/`bgcolor` only on block-flagged
/// tags. Unrecognized names are discarded.
fn parse_component(tag: &mut HtmlTag, raw_name: &[u8]) -> bool {
    let name = decode_entities(raw_name);
    let kind = if name.len() == 3 {
        name.eq_ignore_ascii_case(b"src").then_some(ComponentKind::Href)
    } else if name.len() == 4 {
        name.eq_ignore_ascii_case(b"href")
            .then_some(ComponentKind::Href)
    } else if tag.id == Some(tags::TagId::Img) {
        if name.eq_ignore_ascii_case(b"width") {
            Some(ComponentKind::Width)
        } else if name.eq_ignore_ascii_case(b"height") {
            Some(ComponentKind::Height)
        } else if name.eq_ignore_ascii_case(b"style") {
            Some(ComponentKind::Style)
        } else {
            None
        }
    } else if tag.flags & tags::FL_BLOCK != 0 {
        if name.eq_ignore_ascii_case(b"color") {
            Some(ComponentKind::Color)
        } else if name.eq_ignore_ascii_case(b"style") {
            Some(ComponentKind::Style)
        } else if name.eq_ignore_ascii_case(b"class") {
            Some(ComponentKind::Class)
        } else if name.eq_ignore_ascii_case(b"bgcolor") {
            Some(ComponentKind::Bgcolor)
        } else {
            None
        }
    } else {
        None
    };

    match kind {
        Some(kind) => {
            tag.components.push(Component {
                kind,
                value: Vec::new(),
            });
            true
        }
        None => false,
    }
}

fn store_value(tag: &mut HtmlTag, raw: &[u8]) {
    if let Some(component) = tag.components.last_mut() {
        component.value = decode_entities(raw);
    }
}

/// Parse one tag's span into `tag`; returns document flags to set.
pub(crate) fn parse_tag_span(span: &[u8], tag: &mut HtmlTag) -> u32 {
    let mut flags_out = 0u32;
    let mut state = State::Start;
    let mut name_start = 0usize;
    // Attr-name start while scanning a name, value start while scanning a
    // value; `None` means the current attribute is not materialized.
    let mut save: Option<usize> = None;
    let n = span.len();

    let mut i = 0;
    while i <= n {
        // The terminating '>' participates in the state machine.
        let byte = if i < n { span[i] } else { b'>' };
        let next_is_gt = i + 1 >= n;
        let is_space = byte.is_ascii_whitespace();

        match state {
            State::Start => {
                if !byte.is_ascii_alphabetic() && !is_space {
                    flags_out |= doc_flags::BAD_ELEMENTS;
                    tag.id = None;
                    tag.flags |= FL_BROKEN;
                    state = State::IgnoreBadTag;
                } else if byte.is_ascii_alphabetic() {
                    state = State::Name;
                    name_start = i;
                }
            }

            State::Name => {
                if is_space || byte == b'>' || byte == b'/' {
                    if byte == b'/' {
                        tag.flags |= FL_CLOSED;
                    }
                    if i == name_start {
                        flags_out |= doc_flags::BAD_ELEMENTS;
                        tag.id = None;
                        tag.flags |= FL_BROKEN;
                        state = State::IgnoreBadTag;
                    } else {
                        tag.name = decode_entities(&span[name_start..i]);
                        match tags::tag_by_name(&tag.name) {
                            Some(def) => {
                                tag.id = Some(def.id);
                                tag.flags = def.flags;
                            }
                            None => {
                                flags_out |= doc_flags::UNKNOWN_ELEMENTS;
                                tag.id = None;
                            }
                        }
                        state = State::SpacesAfterName;
                    }
                }
            }

            State::SpacesAfterName => {
                if !is_space {
                    save = Some(i);
                    if byte == b'/' {
                        tag.flags |= FL_CLOSED;
                    } else if byte != b'>' {
                        state = State::AttrName;
                    }
                }
            }

            State::AttrName => match save {
                None => state = State::IgnoreBadTag,
                Some(start) => {
                    let transition = match byte {
                        b'=' => Some(State::Equal),
                        b'/' => {
                            tag.flags |= FL_CLOSED;
                            None
                        }
                        _ if is_space => Some(State::SpacesBeforeEq),
                        _ => {
                            i += 1;
                            continue;
                        }
                    };
                    if let Some(next) = transition {
                        state = next;
                    }
                    if !parse_component(tag, &span[start..i]) {
                        // Unknown attribute: keep scanning, drop the value.
                        save = None;
                    }
                }
            },

            State::SpacesBeforeEq => {
                if byte == b'=' {
                    state = State::Equal;
                } else if !is_space {
                    flags_out |= doc_flags::BAD_ELEMENTS;
                    tag.flags |= FL_BROKEN;
                    state = State::IgnoreBadTag;
                }
            }

            State::Equal => {
                if is_space {
                    state = State::SpacesAfterEq;
                } else if byte == b'"' {
                    state = State::StartDquote;
                } else if byte == b'\'' {
                    state = State::StartSquote;
                } else {
                    if save.is_some() {
                        save = Some(i);
                    }
                    state = State::Value;
                }
            }

            State::SpacesAfterEq => {
                if byte == b'"' {
                    state = State::StartDquote;
                } else if byte == b'\'' {
                    state = State::StartSquote;
                } else if !is_space {
                    if save.is_some() {
                        save = Some(i);
                    }
                    state = State::Value;
                }
            }

            State::StartDquote => {
                if byte == b'"' {
                    // Empty attribute value.
                    state = State::SpacesAfterParam;
                } else {
                    if save.is_some() {
                        save = Some(i);
                    }
                    state = State::DqValue;
                }
            }

            State::StartSquote => {
                if byte == b'\'' {
                    state = State::SpacesAfterParam;
                } else {
                    if save.is_some() {
                        save = Some(i);
                    }
                    state = State::SqValue;
                }
            }

            State::DqValue => {
                if byte == b'"' {
                    if let Some(start) = save.take() {
                        store_value(tag, &span[start..i]);
                    }
                    state = State::EndDquote;
                }
            }

            State::SqValue => {
                if byte == b'\'' {
                    if let Some(start) = save.take() {
                        store_value(tag, &span[start..i]);
                    }
                    state = State::EndSquote;
                }
            }

            State::Value => {
                let mut store = false;
                if byte == b'/' && next_is_gt {
                    tag.flags |= FL_CLOSED;
                    store = true;
                } else if is_space || byte == b'>' {
                    store = true;
                    state = State::SpacesAfterParam;
                }
                if store && let Some(start) = save.take() {
                    store_value(tag, &span[start..i]);
                }
            }

            State::EndDquote | State::EndSquote => {
                if is_space {
                    state = State::SpacesAfterParam;
                } else if byte == b'/' && next_is_gt {
                    tag.flags |= FL_CLOSED;
                }
            }

            State::SpacesAfterParam => {
                if !is_space {
                    if byte == b'/' && next_is_gt {
                        tag.flags |= FL_CLOSED;
                    }
                    state = State::AttrName;
                    save = Some(i);
                }
            }

            State::IgnoreBadTag => {}
        }

        i += 1;
    }

    flags_out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagId;

    fn parse(span: &[u8]) -> (HtmlTag, u32) {
        let mut tag = HtmlTag::default();
        let flags = parse_tag_span(span, &mut tag);
        (tag, flags)
    }

    #[test]
    fn parses_bare_tag_name() {
        let (tag, flags) = parse(b"div");
        assert_eq!(tag.id, Some(TagId::Div));
        assert_eq!(flags, 0);
        assert!(tag.components.is_empty());
    }

    #[test]
    fn parses_quoted_and_bare_attribute_values() {
        let (tag, _) = parse(b"a href=\"http://x.example/\"");
        assert_eq!(tag.id, Some(TagId::A));
        assert_eq!(tag.href(), Some(b"http://x.example/".as_slice()));

        let (tag, _) = parse(b"a href=http://x.example/");
        assert_eq!(tag.href(), Some(b"http://x.example/".as_slice()));

        let (tag, _) = parse(b"a href='http://x.example/'");
        assert_eq!(tag.href(), Some(b"http://x.example/".as_slice()));
    }

    #[test]
    fn entity_decodes_attribute_values() {
        let (tag, _) = parse(b"a href=\"http://x.example/?a=1&amp;b=2\"");
        assert_eq!(tag.href(), Some(b"http://x.example/?a=1&b=2".as_slice()));
    }

    #[test]
    fn unknown_attributes_are_parsed_but_discarded() {
        let (tag, _) = parse(b"a onclick=\"evil()\" href=\"http://x.example/\" data-x=1");
        assert_eq!(tag.components.len(), 1);
        assert_eq!(tag.href(), Some(b"http://x.example/".as_slice()));
    }

    #[test]
    fn attribute_allowlist_depends_on_tag() {
        let (tag, _) = parse(b"img src=pic.png width=10 height=20 style=\"border:0\"");
        assert_eq!(tag.id, Some(TagId::Img));
        assert_eq!(tag.components.len(), 4);

        // width is not recognized outside <img>.
        let (tag, _) = parse(b"div width=10 color=red");
        assert_eq!(tag.components.len(), 1);
        assert_eq!(tag.components[0].kind, ComponentKind::Color);

        // color is not recognized on non-block tags.
        let (tag, _) = parse(b"em color=red");
        assert!(tag.components.is_empty());
    }

    #[test]
    fn non_alpha_tag_start_is_broken() {
        let (tag, flags) = parse(b"1div");
        assert_eq!(tag.id, None);
        assert!(tag.flags & FL_BROKEN != 0);
        assert!(flags & doc_flags::BAD_ELEMENTS != 0);
    }

    #[test]
    fn unknown_tag_sets_unknown_sentinel() {
        let (tag, flags) = parse(b"marquee2 src=x");
        assert_eq!(tag.id, None);
        assert!(flags & doc_flags::UNKNOWN_ELEMENTS != 0);
        // src is still recognized so the machine stays positioned.
        assert_eq!(tag.components.len(), 1);
    }

    #[test]
    fn stray_component_breaks_tag() {
        let (tag, flags) = parse(b"div foo bar=1");
        // "foo bar" puts the machine into spaces-before-eq, then 'b'
        // breaks it.
        assert!(tag.flags & FL_BROKEN != 0);
        assert!(flags & doc_flags::BAD_ELEMENTS != 0);
        assert_eq!(tag.id, Some(TagId::Div));
    }

    #[test]
    fn self_close_after_space_is_detected() {
        let (tag, _) = parse(b"div /");
        assert!(tag.flags & FL_CLOSED != 0);

        let (tag, _) = parse(b"img src=x /");
        assert!(tag.flags & FL_CLOSED != 0);
    }

    #[test]
    fn empty_quoted_value_yields_empty_component() {
        let (tag, _) = parse(b"a href=\"\"");
        assert_eq!(tag.components.len(), 1);
        assert!(tag.components[0].value.is_empty());
        assert_eq!(tag.href(), None);
    }

    #[test]
    fn entity_decoded_tag_name_resolves() {
        // "&#100;iv" decodes to "div".
        let (tag, _) = parse(b"&#100;iv".as_slice());
        // The name state only starts on an alphabetic byte, so this stays
        // unknown: '&' breaks the tag open state.
        assert_eq!(tag.id, None);
        assert!(tag.flags & FL_BROKEN != 0);
    }
}
