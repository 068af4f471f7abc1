//! Per-tag structural extractors: images, blocks, inline style.

use urls::find_ignore_ascii_case;

use crate::colors::{Color, parse_color};
use crate::document::HtmlDocument;
use crate::tags::{FL_BLOCK, TagId};
use crate::types::{BlockRecord, ComponentKind, Extra, ImageRecord, NodeId};

/// Leading unsigned decimal digits of `value` (attribute-style numbers).
fn parse_leading_u32(value: &[u8]) -> Option<u32> {
    let digits = value
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .map(|&b| u32::from(b - b'0'))
        .collect::<Vec<u32>>();
    if digits.is_empty() {
        return None;
    }
    let mut out: u32 = 0;
    for d in digits {
        out = out.saturating_mul(10).saturating_add(d);
    }
    Some(out)
}

/// Best-effort `width`/`height` sniffing inside an inline style value:
/// after the property name, skip spaces/`=`/`:` and take the first
/// numeral; any other byte aborts the attempt.
fn sniff_style_dimension(style: &[u8], key: &[u8]) -> Option<u32> {
    let at = find_ignore_ascii_case(style, key)?;
    let mut p = at + key.len();
    while p < style.len() {
        let byte = style[p];
        if byte.is_ascii_digit() {
            return parse_leading_u32(&style[p..]);
        }
        if !byte.is_ascii_whitespace() && byte != b'=' && byte != b':' {
            return None;
        }
        p += 1;
    }
    None
}

/// Populate the `<img>` record for `node` and append it to the document's
/// image list.
pub(crate) fn process_img_tag(doc: &mut HtmlDocument, node: NodeId) {
    let Some(tag) = doc.tree.tag(node) else {
        return;
    };

    let mut img = ImageRecord::default();
    let mut seen_width = false;
    let mut seen_height = false;

    for comp in &tag.components {
        match comp.kind {
            ComponentKind::Href if !comp.value.is_empty() => {
                img.embedded = comp.value.len() > 4 && comp.value[..4].eq_ignore_ascii_case(b"cid:");
                img.src = Some(String::from_utf8_lossy(&comp.value).into_owned());
            }
            ComponentKind::Width => {
                if let Some(width) = parse_leading_u32(&comp.value) {
                    img.width = width;
                }
                seen_width = true;
            }
            ComponentKind::Height => {
                if let Some(height) = parse_leading_u32(&comp.value) {
                    img.height = height;
                }
                seen_height = true;
            }
            ComponentKind::Style if !comp.value.is_empty() => {
                if !seen_height && let Some(height) = sniff_style_dimension(&comp.value, b"height")
                {
                    img.height = height;
                }
                if !seen_width && let Some(width) = sniff_style_dimension(&comp.value, b"width") {
                    img.width = width;
                }
            }
            _ => {}
        }
    }

    log::debug!(
        target: "html.extract",
        "image src={:?} {}x{} embedded={}",
        img.src, img.width, img.height, img.embedded
    );

    if let Some(tag) = doc.tree.tag_mut(node) {
        tag.extra = Extra::Image(img);
    }
    doc.images.push(node);
}

/// Inline style scanner: recognizes font color, background color and
/// `display: none`.
pub(crate) fn process_style(block: &mut BlockRecord, style: &[u8]) {
    enum State {
        ReadKey,
        ReadColon,
        ReadValue,
        SkipSpaces,
    }

    let len = style.len();
    let mut p = 0usize;
    let mut token_start = 0usize;
    let mut key: Option<(usize, usize)> = None;
    let mut state = State::SkipSpaces;
    let mut next_state = State::ReadKey;

    while p <= len {
        let byte = style.get(p).copied();
        match state {
            State::ReadKey => {
                if byte.is_none() || byte == Some(b':') {
                    key = Some((token_start, p));
                    state = State::SkipSpaces;
                    next_state = State::ReadValue;
                } else if byte.is_some_and(|b| b.is_ascii_whitespace()) {
                    key = Some((token_start, p));
                    state = State::SkipSpaces;
                    next_state = State::ReadColon;
                }
                p += 1;
            }
            State::ReadColon => {
                if byte.is_none() || byte == Some(b':') {
                    state = State::SkipSpaces;
                    next_state = State::ReadValue;
                }
                p += 1;
            }
            State::ReadValue => {
                if byte.is_none() || byte == Some(b';') {
                    if let Some((ks, ke)) = key
                        && ke > ks
                        && p > token_start
                    {
                        let key_bytes = &style[ks..ke];
                        let value = &style[token_start..p];
                        if key_bytes.eq_ignore_ascii_case(b"color")
                            || key_bytes.eq_ignore_ascii_case(b"font-color")
                        {
                            block.font_color = parse_color(value);
                        } else if key_bytes.eq_ignore_ascii_case(b"background-color")
                            || key_bytes.eq_ignore_ascii_case(b"background")
                        {
                            block.background_color = parse_color(value);
                        } else if key_bytes.eq_ignore_ascii_case(b"display")
                            && find_ignore_ascii_case(value, b"none").is_some()
                        {
                            block.visible = false;
                        }
                    }
                    key = None;
                    state = State::SkipSpaces;
                    next_state = State::ReadKey;
                }
                p += 1;
            }
            State::SkipSpaces => {
                if p < len && !style[p].is_ascii_whitespace() {
                    token_start = p;
                    state = std::mem::replace(&mut next_state, State::ReadKey);
                } else {
                    p += 1;
                }
            }
        }
    }
}

/// Build the block record for a block-flagged tag: direct attributes,
/// inline style, then color inheritance along the ancestor chain with the
/// document defaults as the final fallback.
///
/// Returns whether the block is visible.
pub(crate) fn process_block_tag(doc: &mut HtmlDocument, node: NodeId) -> bool {
    let Some(tag) = doc.tree.tag(node) else {
        return true;
    };
    let tag_id = tag.id;

    let mut block = BlockRecord::default();
    for comp in &tag.components {
        if comp.value.is_empty() {
            continue;
        }
        match comp.kind {
            ComponentKind::Color => {
                block.font_color = parse_color(&comp.value);
            }
            ComponentKind::Bgcolor => {
                block.background_color = parse_color(&comp.value);
            }
            ComponentKind::Style => {
                block.style = Some(comp.value.clone());
                process_style(&mut block, &comp.value);
            }
            ComponentKind::Class => {
                block.class = Some(String::from_utf8_lossy(&comp.value).into_owned());
            }
            _ => {}
        }
    }

    if tag_id == Some(TagId::Body) && block.background_color.valid {
        doc.bgcolor = block.background_color;
    }

    if !block.background_color.valid {
        block.background_color = inherit_color(doc, node, |b| b.background_color)
            .unwrap_or(doc.bgcolor);
    }
    if !block.font_color.valid {
        block.font_color = inherit_color(doc, node, |b| b.font_color).unwrap_or(Color::black());
    }

    log::debug!(
        target: "html.extract",
        "block font={:06x} bg={:06x} visible={}",
        block.font_color.value(), block.background_color.value(), block.visible
    );

    let visible = block.visible;
    if let Some(tag) = doc.tree.tag_mut(node) {
        tag.extra = Extra::Block(block);
    }
    doc.blocks.push(node);
    visible
}

/// Nearest block-flagged ancestor carrying a resolved color of the
/// requested kind.
fn inherit_color(
    doc: &HtmlDocument,
    node: NodeId,
    pick: impl Fn(&BlockRecord) -> Color,
) -> Option<Color> {
    for ancestor in doc.tree.ancestors(node) {
        let Some(tag) = doc.tree.tag(ancestor) else {
            continue;
        };
        if tag.flags & FL_BLOCK == 0 {
            continue;
        }
        if let Extra::Block(block) = &tag.extra {
            let color = pick(block);
            if color.valid {
                return Some(color);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_scanner_recognizes_colors_and_display() {
        let mut block = BlockRecord::default();
        process_style(
            &mut block,
            b"color: #ff0000; background-color: white; display: none",
        );
        assert!(block.font_color.valid);
        assert_eq!(block.font_color.r, 255);
        assert!(block.background_color.valid);
        assert_eq!(block.background_color.value(), 0xffffff);
        assert!(!block.visible);
    }

    #[test]
    fn style_scanner_accepts_font_color_and_background_aliases() {
        let mut block = BlockRecord::default();
        process_style(&mut block, b"font-color:blue;background:black");
        assert_eq!(block.font_color.value(), 0x0000ff);
        assert_eq!(block.background_color.value(), 0x000000);
    }

    #[test]
    fn style_scanner_ignores_unknown_properties() {
        let mut block = BlockRecord::default();
        process_style(&mut block, b"margin: 0; padding: 4px 2px; display:block");
        assert!(!block.font_color.valid);
        assert!(!block.background_color.valid);
        assert!(block.visible);
    }

    #[test]
    fn style_scanner_survives_malformed_input() {
        for input in [
            b"".as_slice(),
            b";;;",
            b":::",
            b"color",
            b"color:",
            b":red",
            b"display none",
        ] {
            let mut block = BlockRecord::default();
            process_style(&mut block, input);
        }
    }

    #[test]
    fn sniff_finds_dimensions_in_style_text() {
        assert_eq!(sniff_style_dimension(b"width: 120px", b"width"), Some(120));
        assert_eq!(sniff_style_dimension(b"WIDTH=88", b"width"), Some(88));
        assert_eq!(
            sniff_style_dimension(b"border:0;height : 20", b"height"),
            Some(20)
        );
        assert_eq!(sniff_style_dimension(b"width: auto", b"width"), None);
        assert_eq!(sniff_style_dimension(b"border:0", b"width"), None);
    }

    #[test]
    fn parse_leading_u32_takes_digit_prefix() {
        assert_eq!(parse_leading_u32(b"120px"), Some(120));
        assert_eq!(parse_leading_u32(b"42"), Some(42));
        assert_eq!(parse_leading_u32(b"px"), None);
        assert_eq!(parse_leading_u32(b""), None);
    }
}
